use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Lowering of one scheduled operation failed.
    #[snafu(display("lowering operation `{operation}` failed: {source}"))]
    Operation { operation: String, source: tessel_graph::Error },

    #[snafu(context(false), display("graph error: {source}"))]
    Graph { source: tessel_graph::Error },

    #[snafu(context(false), display("ir error: {source}"))]
    Ir { source: tessel_ir::Error },
}
