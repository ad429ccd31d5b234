//! Workflows: trees of steps wired together through named connectors.
//!
//! A [`Workflow`] owns an arena holding its own node, every attached step and the nodes of any
//! nested workflows. Steps are defined detached ([`OperationStep`], [`ExpressionStep`],
//! [`SubWorkflowStep`]) and attached with [`Workflow::add_step`]; their source bindings stay
//! pending until [`Workflow::resolve_references`] runs, so steps may refer to siblings that are
//! attached later.
//!
//! # Example
//!
//! ```rust
//! use stepgraph::prelude::*;
//! use serde_json::json;
//!
//! let mut registry = OperationRegistry::new();
//! registry.register_fn(
//!     OperationSignature::new("demo.add").with_input("a").with_input("b"),
//!     |inputs, _| {
//!         let a = inputs["a"].as_f64().unwrap_or_default();
//!         let b = inputs["b"].as_f64().unwrap_or_default();
//!         Ok(json!(a + b))
//!     },
//! );
//!
//! let mut workflow = Workflow::new(OperationSignature::new("demo.flow").with_output("sum"))?;
//! workflow.add_step(
//!     OperationStep::new("demo.add", &registry)?
//!         .with_id("add")
//!         .with_input_value("a", json!(1))
//!         .with_input_value("b", json!(2)),
//! )?;
//! let sum = workflow.output("sum").map(|c| c.handle()).ok_or("no output")?;
//! workflow.set_source_ref(sum, SourceRef::connector("add", "return"));
//! workflow.resolve_references()?;
//!
//! workflow.invoke(&NullMonitor)?;
//! assert_eq!(workflow.output_value("sum")?, json!(3.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::document::SourceRef;
use crate::error::{ConstructionError, ReferenceError, WorkflowError};
use crate::monitor::Monitor;
use crate::signature::OperationSignature;
use indexmap::IndexMap;
use serde_json::Value;

mod graph;
mod invoke;
mod load;
mod serialize;
mod step;
mod view;

pub use graph::{ConnectorHandle, Direction, NodeHandle};
pub use step::{
    BindingSpec, EXPRESSION_STEP_NAME, ExpressionStep, OperationStep, Step, SubWorkflowStep,
};
pub use view::{ConnectorRef, NodeRef, NodeType};

use graph::{NodeGraph, NodeKind, StepKind};

/// A composite node owning an ordered collection of steps.
///
/// The workflow's id is its qualified name. Connector and node handles obtained from a workflow
/// are only meaningful for that workflow.
#[derive(Debug, Clone)]
pub struct Workflow {
    graph: NodeGraph,
    root: NodeHandle,
}

impl Workflow {
    /// Creates an empty workflow with one unbound connector per declared input and output.
    pub fn new(signature: OperationSignature) -> Result<Self, ConstructionError> {
        if signature.qualified_name.is_empty() {
            return Err(ConstructionError::EmptyQualifiedName);
        }
        let mut graph = NodeGraph::default();
        let root = graph.add_node(
            signature.qualified_name.clone(),
            signature,
            NodeKind::Workflow {
                steps: IndexMap::new(),
            },
        );
        Ok(Self { graph, root })
    }

    pub fn id(&self) -> &str {
        &self.graph.node(self.root).id
    }

    pub fn signature(&self) -> &OperationSignature {
        &self.graph.node(self.root).signature
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node_ref(self.root)
    }

    /// Finds a node by id: the workflow itself, one of its steps, or a step's child.
    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        self.graph
            .lookup_node(self.root, id)
            .map(|handle| self.node_ref(handle))
    }

    pub fn node_by_handle(&self, handle: NodeHandle) -> NodeRef<'_> {
        self.node_ref(handle)
    }

    /// Steps in execution order.
    pub fn steps(&self) -> Vec<NodeRef<'_>> {
        self.root().steps()
    }

    pub fn input(&self, name: &str) -> Option<ConnectorRef<'_>> {
        self.root().input(name)
    }

    pub fn output(&self, name: &str) -> Option<ConnectorRef<'_>> {
        self.root().output(name)
    }

    pub fn connector(&self, handle: ConnectorHandle) -> ConnectorRef<'_> {
        ConnectorRef {
            graph: &self.graph,
            handle,
        }
    }

    pub fn input_value(&self, name: &str) -> Result<Value, ReferenceError> {
        self.root_connector(Direction::Input, name)?.value()
    }

    pub fn output_value(&self, name: &str) -> Result<Value, ReferenceError> {
        self.root_connector(Direction::Output, name)?.value()
    }

    /// Sets a literal on one of the workflow's own inputs.
    pub fn set_input_value(&mut self, name: &str, value: Value) -> Result<(), ReferenceError> {
        let handle = self.root_connector(Direction::Input, name)?.handle();
        self.graph.set_value(handle, value);
        Ok(())
    }

    /// Binds a connector to a literal, dropping any source.
    pub fn set_value(&mut self, connector: ConnectorHandle, value: Value) {
        self.graph.set_value(connector, value);
    }

    /// Binds a connector to another connector, dropping any literal.
    ///
    /// Fails without changing anything when `connector` and `source` are the same connector or
    /// when `source` already reads, directly or transitively, from `connector`.
    pub fn set_source(
        &mut self,
        connector: ConnectorHandle,
        source: ConnectorHandle,
    ) -> Result<(), ReferenceError> {
        self.graph.set_source(connector, source)
    }

    /// Stores a reference to be located by the next [`Workflow::resolve_references`].
    pub fn set_source_ref(&mut self, connector: ConnectorHandle, reference: SourceRef) {
        self.graph.set_pending(connector, reference);
    }

    pub fn clear(&mut self, connector: ConnectorHandle) {
        self.graph.clear(connector);
    }

    /// Attaches a step at the end of the execution order and returns its handle.
    ///
    /// The step's declared bindings are applied; source references are left pending.
    pub fn add_step(&mut self, step: impl Into<Step>) -> Result<NodeHandle, ConstructionError> {
        let step = step.into();
        let id = step.id().to_string();
        if id.is_empty() {
            return Err(ConstructionError::EmptyNodeId);
        }
        if self.step_ids().any(|existing| existing == id) {
            return Err(ConstructionError::DuplicateStepId {
                id,
                workflow: self.id().to_string(),
            });
        }

        let (frame, kind) = match step {
            Step::Operation(step) => (
                step.frame,
                StepKind::Operation {
                    operation: step.operation,
                },
            ),
            Step::Expression(mut step) => {
                step.frame.signature.ensure_return_output();
                (
                    step.frame,
                    StepKind::Expression {
                        expression: step.expression,
                        evaluator: step.evaluator,
                    },
                )
            }
            Step::SubWorkflow(step) => {
                let nested = self.graph.graft(step.workflow.graph, step.workflow.root);
                (
                    step.frame,
                    StepKind::SubWorkflow {
                        workflow: nested,
                        resource: step.resource,
                    },
                )
            }
        };

        let handle = self
            .graph
            .add_node(frame.id.clone(), frame.signature, NodeKind::Step(kind));
        self.graph.node_mut(handle).parent = Some(self.root);
        if let NodeKind::Workflow { steps } = &mut self.graph.node_mut(self.root).kind {
            steps.insert(frame.id, handle);
        }

        for (direction, name, binding) in frame.bindings {
            let connector = self.graph.add_connector(handle, &name, direction);
            match binding {
                BindingSpec::Value(value) => self.graph.set_value(connector, value),
                BindingSpec::Source(reference) => self.graph.set_pending(connector, reference),
            }
        }

        self.wire_nested_inputs(handle);
        Ok(handle)
    }

    pub fn add_steps<I, S>(&mut self, steps: I) -> Result<Vec<NodeHandle>, ConstructionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        steps.into_iter().map(|step| self.add_step(step)).collect()
    }

    /// Detaches a step. Its connectors stay in place, so references to them keep working.
    pub fn remove_step(&mut self, id: &str) -> Option<NodeHandle> {
        let removed = match &mut self.graph.node_mut(self.root).kind {
            NodeKind::Workflow { steps } => steps.shift_remove(id),
            NodeKind::Step(_) => None,
        };
        if let Some(handle) = removed {
            self.graph.node_mut(handle).parent = None;
        }
        removed
    }

    /// Locates every pending source reference in the tree and binds it.
    pub fn resolve_references(&mut self) -> Result<(), ReferenceError> {
        self.graph.resolve_node(self.root)
    }

    /// Invokes every step in declaration order. See [`Monitor`] for progress and cancellation.
    pub fn invoke(&mut self, monitor: &dyn Monitor) -> Result<(), WorkflowError> {
        self.graph.invoke_node(self.root, monitor)?;
        Ok(())
    }

    fn step_ids(&self) -> impl Iterator<Item = &str> {
        match &self.graph.node(self.root).kind {
            NodeKind::Workflow { steps } => Some(steps.keys().map(String::as_str)),
            NodeKind::Step(_) => None,
        }
        .into_iter()
        .flatten()
    }

    /// Makes each input of a sub-workflow step's nested workflow read from the step input with
    /// the same name.
    fn wire_nested_inputs(&mut self, step: NodeHandle) {
        let NodeKind::Step(StepKind::SubWorkflow { workflow, .. }) = &self.graph.node(step).kind
        else {
            return;
        };
        let nested = *workflow;
        let pairs: Vec<(ConnectorHandle, ConnectorHandle)> = self
            .graph
            .node(nested)
            .inputs
            .iter()
            .filter_map(|(name, &inner)| {
                self.graph
                    .node(step)
                    .inputs
                    .get(name)
                    .map(|&outer| (inner, outer))
            })
            .collect();
        for (inner, outer) in pairs {
            self.graph.link(inner, outer);
        }
    }

    fn root_connector(
        &self,
        direction: Direction,
        name: &str,
    ) -> Result<ConnectorRef<'_>, ReferenceError> {
        let root = self.root();
        let connector = match direction {
            Direction::Input => root.input(name),
            Direction::Output => root.output(name),
        };
        connector.ok_or_else(|| ReferenceError::UnknownConnector {
            connector: name.to_string(),
            node: self.id().to_string(),
            name: name.to_string(),
        })
    }

    fn node_ref(&self, handle: NodeHandle) -> NodeRef<'_> {
        NodeRef {
            graph: &self.graph,
            handle,
        }
    }
}
