//! Codegen visitor: assembles one function from a scheduled graph.
//!
//! The assembler drives the whole lowering: schedule, operator resolution,
//! signature construction, storage binding, per-operation lowering with
//! block threading, and finalization. Any error aborts the function; the
//! module never records a partial one.

use std::collections::HashSet;

use tessel_graph::{build_schedule, Graph, LowerCtx, NodeId, Registry, ViewArena};
use tessel_ir::{Builder, FuncId, Function, Module, Param, Ty};

use crate::error::{Error, Result};

pub struct FunctionAssembler<'a> {
    graph: &'a mut Graph,
    registry: &'a Registry,
    module: &'a mut Module,
}

impl<'a> FunctionAssembler<'a> {
    pub fn new(graph: &'a mut Graph, registry: &'a Registry, module: &'a mut Module) -> Self {
        Self { graph, registry, module }
    }

    /// Lower the graph reachable from `outputs` into one function.
    ///
    /// The signature is one parameter per free variable (by value for
    /// size-1 shapes, by pointer otherwise), followed by one pointer
    /// parameter per requested output. Free variables backed by module
    /// constants are bound to their constant data instead of a parameter.
    pub fn codegen_tree(&mut self, name: &str, outputs: &[NodeId]) -> Result<FuncId> {
        if self.module.has_function(name) {
            return Err(tessel_ir::Error::DuplicateFunction { name: name.to_owned() }.into());
        }

        let schedule = build_schedule(self.graph, outputs)?;
        tracing::debug!(function = name, operations = schedule.ops.len(), "assembling function");

        // Resolve every scheduled operation, in order; producers are bound
        // before their consumers ask for them.
        for &op_id in &schedule.ops {
            let operator = self.registry.resolve(self.graph, op_id)?;
            self.graph.bind_operator(op_id, operator)?;
        }

        // Requested outputs, resolved to their output variables.
        let mut output_vars: Vec<NodeId> = Vec::new();
        for &output in outputs {
            let var = self.graph.output_variable(output)?;
            if !output_vars.contains(&var) {
                output_vars.push(var);
            }
        }
        let output_set: HashSet<NodeId> = output_vars.iter().copied().collect();

        // Signature: free variables first (constants excluded), outputs last.
        let mut params: Vec<Param> = Vec::new();
        let mut param_vars: Vec<NodeId> = Vec::new();
        for &var_id in &schedule.free_vars {
            let var = self.graph.variable(var_id)?;
            if var.constant().is_some() {
                continue;
            }
            let ty = if var.shape.size() == 1 { Ty::Scalar(var.dtype) } else { Ty::Ptr(var.dtype) };
            params.push(Param::new(var.name.clone(), ty));
            param_vars.push(var_id);
        }
        for &out_id in &output_vars {
            let var = self.graph.variable(out_id)?;
            params.push(Param::new(var.name.clone(), Ty::Ptr(var.dtype)));
        }

        let mut func = Function::new(name, params);
        let mut arena = ViewArena::new();
        {
            let mut builder = Builder::new(&mut func);
            let entry = builder.create_block("entry");
            builder.position_at_end(entry);

            // Free variables -> parameters. By-value scalars are spilled to
            // a one-element stack slot so every binding is a view.
            for (i, &var_id) in param_vars.iter().enumerate() {
                let param_value = builder.func().param(i)?;
                let (dtype, shape, scalar) = {
                    let var = self.graph.variable(var_id)?;
                    (var.dtype, var.shape.clone(), var.shape.size() == 1)
                };
                let base = if scalar {
                    let slot = builder.stack_alloc(dtype, 1)?;
                    builder.store(slot, param_value)?;
                    slot
                } else {
                    param_value
                };
                let view = arena.create(base, dtype, shape);
                self.graph.variable_mut(var_id)?.bind(view)?;
            }

            // Constant-backed free variables -> module data.
            for &var_id in &schedule.free_vars {
                let (global, dtype, shape) = {
                    let var = self.graph.variable(var_id)?;
                    match var.constant() {
                        Some(global) => (global, var.dtype, var.shape.clone()),
                        None => continue,
                    }
                };
                let base = builder.global_addr(global, dtype)?;
                let view = arena.create(base, dtype, shape);
                self.graph.variable_mut(var_id)?.bind(view)?;
            }

            // Requested outputs -> output parameters.
            for (i, &out_id) in output_vars.iter().enumerate() {
                let param_value = builder.func().param(param_vars.len() + i)?;
                let (dtype, shape) = {
                    let var = self.graph.variable(out_id)?;
                    (var.dtype, var.shape.clone())
                };
                let view = arena.create(param_value, dtype, shape);
                self.graph.variable_mut(out_id)?.bind(view)?;
            }

            // Remaining operation outputs are intermediates: naive
            // per-tensor stack buffers in the entry block.
            for &op_id in &schedule.ops {
                let out_var = self.graph.operation(op_id)?.operator()?.output_var();
                if output_set.contains(&out_var) {
                    continue;
                }
                let (dtype, shape, bound) = {
                    let var = self.graph.variable(out_var)?;
                    (var.dtype, var.shape.clone(), var.try_binding().is_some())
                };
                if bound {
                    continue;
                }
                let slot = builder.stack_alloc(dtype, shape.size())?;
                let view = arena.create(slot, dtype, shape);
                self.graph.variable_mut(out_var)?.bind(view)?;
            }

            // Lower in schedule order, threading each returned block into
            // the next operation.
            let mut previous = entry;
            for &op_id in &schedule.ops {
                let op_name = self.graph.operation(op_id)?.name.clone();
                tracing::trace!(operation = %op_name, "lowering");
                builder.position_at_end(previous);
                let operator = self.graph.operation(op_id)?.operator()?;
                let mut ctx = LowerCtx { graph: self.graph, arena: &mut arena, builder: &mut builder };
                previous = operator
                    .lower(&mut ctx, previous)
                    .map_err(|source| Error::Operation { operation: op_name, source })?;
            }

            builder.position_at_end(previous);
            builder.ret(None)?;
        }

        Ok(self.module.add_function(func)?)
    }
}
