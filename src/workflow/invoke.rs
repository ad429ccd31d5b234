use super::graph::{NodeGraph, NodeHandle, NodeKind, StepKind};
use crate::ast;
use crate::error::{InvocationError, ReferenceError};
use crate::evaluator::Evaluator;
use crate::monitor::{Interrupted, Monitor};
use crate::registry::{Inputs, Operation};
use crate::signature::RETURN_OUTPUT_NAME;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

impl NodeGraph {
    /// Invokes a node, reading its inputs and writing its outputs.
    pub(crate) fn invoke_node(
        &mut self,
        node: NodeHandle,
        monitor: &dyn Monitor,
    ) -> Result<(), InvocationError> {
        match &self.node(node).kind {
            NodeKind::Workflow { steps } => {
                let steps: Vec<NodeHandle> = steps.values().copied().collect();
                self.invoke_workflow(node, &steps, monitor)
            }
            NodeKind::Step(StepKind::Operation { operation }) => {
                let operation = Arc::clone(operation);
                self.invoke_operation(node, operation.as_ref(), monitor)
            }
            NodeKind::Step(StepKind::Expression { evaluator, .. }) => {
                let evaluator = Arc::clone(evaluator);
                self.invoke_expression(node, &evaluator)
            }
            NodeKind::Step(StepKind::SubWorkflow { workflow, .. }) => {
                let workflow = *workflow;
                self.invoke_sub_workflow(node, workflow, monitor)
            }
        }
    }

    fn invoke_workflow(
        &mut self,
        node: NodeHandle,
        steps: &[NodeHandle],
        monitor: &dyn Monitor,
    ) -> Result<(), InvocationError> {
        match steps {
            [] => Ok(()),
            [step] => self.invoke_step(*step, monitor),
            _ => {
                let label = format!("Executing workflow '{}'", self.node(node).id);
                monitor.start(&label, steps.len() as f64);
                for &step in steps {
                    let child = monitor.child(1.0);
                    self.invoke_step(step, child.as_ref())?;
                    child.done();
                }
                monitor.done();
                Ok(())
            }
        }
    }

    fn invoke_step(&mut self, step: NodeHandle, monitor: &dyn Monitor) -> Result<(), InvocationError> {
        let node_id = self.node(step).id.clone();
        if monitor.check_cancelled().is_err() {
            return Err(InvocationError::Interrupted { node_id });
        }
        debug!(node_id = %node_id, "invoking step");
        self.invoke_node(step, monitor)?;
        debug!(node_id = %node_id, "step finished");
        Ok(())
    }

    fn invoke_operation(
        &mut self,
        node: NodeHandle,
        operation: &dyn Operation,
        monitor: &dyn Monitor,
    ) -> Result<(), InvocationError> {
        let inputs = self.input_values(node)?;
        let result = operation.invoke(&inputs, monitor).map_err(|source| {
            let node_id = self.node(node).id.clone();
            if source.is::<Interrupted>() {
                InvocationError::Interrupted { node_id }
            } else {
                InvocationError::Operation { node_id, source }
            }
        })?;
        self.distribute_outputs(node, result)
    }

    fn invoke_expression(
        &mut self,
        node: NodeHandle,
        evaluator: &Evaluator,
    ) -> Result<(), InvocationError> {
        let bindings: IndexMap<String, ast::Value> = self
            .input_values(node)?
            .iter()
            .map(|(name, value)| (name.clone(), ast::Value::from(value)))
            .collect();
        let result = evaluator
            .eval(&bindings)
            .map_err(|source| InvocationError::Expression {
                node_id: self.node(node).id.clone(),
                source,
            })?;
        debug!(node_id = %self.node(node).id, trace = %result.reason, "expression evaluated");
        self.distribute_outputs(node, result.value.to_json())
    }

    fn invoke_sub_workflow(
        &mut self,
        node: NodeHandle,
        workflow: NodeHandle,
        monitor: &dyn Monitor,
    ) -> Result<(), InvocationError> {
        self.invoke_node(workflow, monitor).map_err(|source| {
            let node_id = self.node(node).id.clone();
            debug!(node_id = %node_id, error = %source, "nested workflow failed");
            InvocationError::SubWorkflow {
                node_id,
                source: Box::new(source),
            }
        })?;
        let pairs: Vec<_> = self
            .node(node)
            .outputs
            .iter()
            .filter_map(|(name, &outer)| {
                self.node(workflow)
                    .outputs
                    .get(name)
                    .map(|&inner| (outer, inner))
            })
            .collect();
        for (outer, inner) in pairs {
            let value = self.read(inner)?;
            self.set_value(outer, value);
        }
        Ok(())
    }

    /// Current values of every input of `node`, in declaration order.
    fn input_values(&self, node: NodeHandle) -> Result<Inputs, ReferenceError> {
        self.node(node)
            .inputs
            .iter()
            .map(|(name, &handle)| Ok((name.clone(), self.read(handle)?)))
            .collect()
    }

    /// Assigns a result to the outputs of `node`.
    ///
    /// With named outputs the result must be an object whose keys are output names; otherwise
    /// the whole result goes to the `return` output.
    fn distribute_outputs(&mut self, node: NodeHandle, result: Value) -> Result<(), InvocationError> {
        let slot = self.node(node);
        if slot.outputs.is_empty() {
            return Ok(());
        }
        if !slot.signature.has_named_outputs() {
            if let Some(&handle) = slot.outputs.get(RETURN_OUTPUT_NAME) {
                self.set_value(handle, result);
            }
            return Ok(());
        }

        let fields = match result {
            Value::Object(fields) => fields,
            other => {
                return Err(InvocationError::OutputMismatch {
                    node_id: slot.id.clone(),
                    message: format!("expected an object keyed by output name, got {}", other),
                });
            }
        };
        // Every key is checked before anything is written, so a mismatch leaves the outputs
        // as they were.
        let assignments = fields
            .into_iter()
            .map(|(name, value)| match slot.outputs.get(&name) {
                Some(&handle) => Ok((handle, value)),
                None => Err(InvocationError::OutputMismatch {
                    node_id: slot.id.clone(),
                    message: format!("unknown output '{}'", name),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (handle, value) in assignments {
            self.set_value(handle, value);
        }
        Ok(())
    }
}
