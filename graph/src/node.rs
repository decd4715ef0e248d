//! Graph node model: variables and operations.
//!
//! Nodes live in an index-addressed [`Graph`] and reference each other by
//! [`NodeId`], so sharing (an input consumed twice, a diamond dependency)
//! is explicit and needs no lifetime management. The node kind is a tagged
//! enum matched explicitly wherever the graph is walked.

use std::fmt;

use tessel_ir::{DType, GlobalId};

use crate::error::{Error, Result};
use crate::operator::{Operator, OperatorKind};
use crate::shape::Shape;
use crate::view::ViewId;

/// Handle to a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A leaf or bound data node.
///
/// A variable with no `creator` is a graph input; one with a creator is the
/// single output of that operation. Storage binds exactly once.
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    /// Back-edge to the operation that produced this variable.
    pub creator: Option<NodeId>,
    binding: Option<ViewId>,
    /// Module-level constant data backing this variable, if any.
    constant: Option<GlobalId>,
}

impl Variable {
    /// Bind storage. Rebinding is a contract violation.
    pub fn bind(&mut self, view: ViewId) -> Result<()> {
        if self.binding.is_some() {
            return Err(Error::AlreadyBound { name: self.name.clone() });
        }
        self.binding = Some(view);
        Ok(())
    }

    pub fn binding(&self) -> Result<ViewId> {
        self.binding.ok_or_else(|| Error::Unbound { name: self.name.clone() })
    }

    pub fn try_binding(&self) -> Option<ViewId> {
        self.binding
    }

    /// A free variable is a required input of the compiled function.
    pub fn is_free(&self) -> bool {
        self.creator.is_none()
    }

    pub fn constant(&self) -> Option<GlobalId> {
        self.constant
    }
}

/// A named operation consuming the outputs of other nodes.
///
/// The concrete operator is resolved lazily, once the inputs are known,
/// during scheduling-driven resolution; it produces exactly one output
/// variable, and not before it is bound.
#[derive(Debug)]
pub struct Operation {
    pub name: String,
    pub kind: OperatorKind,
    pub inputs: Vec<NodeId>,
    operator: Option<Box<dyn Operator>>,
}

impl Operation {
    pub fn operator(&self) -> Result<&dyn Operator> {
        self.operator.as_deref().ok_or_else(|| Error::OperatorUnresolved { name: self.name.clone() })
    }

    pub fn is_resolved(&self) -> bool {
        self.operator.is_some()
    }
}

/// A graph node, matched explicitly wherever the graph is walked.
#[derive(Debug)]
pub enum Node {
    Variable(Variable),
    Operation(Operation),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Variable(v) => &v.name,
            Node::Operation(o) => &o.name,
        }
    }
}

/// The DAG under construction: nodes in an arena, edges as ids.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free variable (graph input).
    pub fn add_variable(&mut self, name: impl Into<String>, dtype: DType, shape: Shape) -> NodeId {
        self.push(Node::Variable(Variable {
            name: name.into(),
            dtype,
            shape,
            creator: None,
            binding: None,
            constant: None,
        }))
    }

    /// Add the output variable of `creator`. Called by operator factories
    /// at resolution time.
    pub fn add_produced_variable(
        &mut self,
        name: impl Into<String>,
        dtype: DType,
        shape: Shape,
        creator: NodeId,
    ) -> NodeId {
        self.push(Node::Variable(Variable {
            name: name.into(),
            dtype,
            shape,
            creator: Some(creator),
            binding: None,
            constant: None,
        }))
    }

    /// Add a variable backed by module-level constant data.
    pub fn add_constant(&mut self, name: impl Into<String>, dtype: DType, shape: Shape, global: GlobalId) -> NodeId {
        self.push(Node::Variable(Variable {
            name: name.into(),
            dtype,
            shape,
            creator: None,
            binding: None,
            constant: Some(global),
        }))
    }

    /// Add an operation consuming `inputs` (variables, or other operations
    /// meaning "consume that operation's single output").
    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        kind: OperatorKind,
        inputs: Vec<NodeId>,
    ) -> Result<NodeId> {
        for &input in &inputs {
            self.node(input)?;
        }
        Ok(self.push(Node::Operation(Operation { name: name.into(), kind, inputs, operator: None })))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0 as usize).ok_or(Error::UnknownNode { id })
    }

    pub fn variable(&self, id: NodeId) -> Result<&Variable> {
        match self.node(id)? {
            Node::Variable(v) => Ok(v),
            Node::Operation(o) => Err(Error::ExpectedVariable { name: o.name.clone() }),
        }
    }

    pub fn variable_mut(&mut self, id: NodeId) -> Result<&mut Variable> {
        match self.nodes.get_mut(id.0 as usize).ok_or(Error::UnknownNode { id })? {
            Node::Variable(v) => Ok(v),
            Node::Operation(o) => Err(Error::ExpectedVariable { name: o.name.clone() }),
        }
    }

    pub fn operation(&self, id: NodeId) -> Result<&Operation> {
        match self.node(id)? {
            Node::Operation(o) => Ok(o),
            Node::Variable(v) => Err(Error::ExpectedOperation { name: v.name.clone() }),
        }
    }

    /// Bind the resolved operator to an operation, exactly once.
    pub fn bind_operator(&mut self, id: NodeId, operator: Box<dyn Operator>) -> Result<()> {
        let node = self.nodes.get_mut(id.0 as usize).ok_or(Error::UnknownNode { id })?;
        match node {
            Node::Operation(o) => {
                if o.operator.is_some() {
                    return Err(Error::OperatorAlreadyBound { name: o.name.clone() });
                }
                o.operator = Some(operator);
                Ok(())
            }
            Node::Variable(v) => Err(Error::ExpectedOperation { name: v.name.clone() }),
        }
    }

    /// Resolve a node to the variable holding its value: a variable is its
    /// own value, an operation resolves to its operator's output variable
    /// (requiring that operator to be resolved already).
    pub fn output_variable(&self, id: NodeId) -> Result<NodeId> {
        match self.node(id)? {
            Node::Variable(_) => Ok(id),
            Node::Operation(o) => Ok(o.operator()?.output_var()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}
