use super::graph::{Binding, ConnectorHandle, Direction, NodeGraph, NodeHandle, NodeKind, StepKind};
use crate::document::SourceRef;
use crate::error::ReferenceError;
use crate::registry::Operation;
use crate::signature::OperationSignature;
use serde_json::Value;
use std::sync::Arc;

/// The kind of a node in a workflow tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Workflow,
    Operation,
    Expression,
    SubWorkflow,
}

/// Read-only view of a node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    pub(crate) graph: &'a NodeGraph,
    pub(crate) handle: NodeHandle,
}

impl<'a> NodeRef<'a> {
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn id(&self) -> &'a str {
        &self.graph.node(self.handle).id
    }

    pub fn signature(&self) -> &'a OperationSignature {
        &self.graph.node(self.handle).signature
    }

    pub fn node_type(&self) -> NodeType {
        match &self.graph.node(self.handle).kind {
            NodeKind::Workflow { .. } => NodeType::Workflow,
            NodeKind::Step(StepKind::Operation { .. }) => NodeType::Operation,
            NodeKind::Step(StepKind::Expression { .. }) => NodeType::Expression,
            NodeKind::Step(StepKind::SubWorkflow { .. }) => NodeType::SubWorkflow,
        }
    }

    /// The workflow that owns this node; `None` for a root workflow.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.graph
            .node(self.handle)
            .parent
            .map(|handle| self.with(handle))
    }

    pub fn root(&self) -> NodeRef<'a> {
        self.with(self.graph.root_of(self.handle))
    }

    /// Searches this node's steps, then their children. Steps never contain other nodes.
    pub fn find_node(&self, id: &str) -> Option<NodeRef<'a>> {
        self.graph
            .find_node(self.handle, id)
            .map(|handle| self.with(handle))
    }

    /// Looks up a connector by name, preferring outputs over inputs.
    pub fn find_connector(&self, name: &str) -> Option<ConnectorRef<'a>> {
        self.graph
            .find_connector(self.handle, name)
            .map(|handle| self.connector(handle))
    }

    pub fn input(&self, name: &str) -> Option<ConnectorRef<'a>> {
        self.graph
            .node(self.handle)
            .inputs
            .get(name)
            .map(|&handle| self.connector(handle))
    }

    pub fn output(&self, name: &str) -> Option<ConnectorRef<'a>> {
        self.graph
            .node(self.handle)
            .outputs
            .get(name)
            .map(|&handle| self.connector(handle))
    }

    pub fn inputs(self) -> impl Iterator<Item = ConnectorRef<'a>> + 'a {
        let graph = self.graph;
        graph
            .node(self.handle)
            .inputs
            .values()
            .map(move |&handle| ConnectorRef { graph, handle })
    }

    pub fn outputs(self) -> impl Iterator<Item = ConnectorRef<'a>> + 'a {
        let graph = self.graph;
        graph
            .node(self.handle)
            .outputs
            .values()
            .map(move |&handle| ConnectorRef { graph, handle })
    }

    /// Steps of a workflow in execution order; empty for steps.
    pub fn steps(&self) -> Vec<NodeRef<'a>> {
        match &self.graph.node(self.handle).kind {
            NodeKind::Workflow { steps } => steps.values().map(|&handle| self.with(handle)).collect(),
            NodeKind::Step(_) => Vec::new(),
        }
    }

    pub fn operation(&self) -> Option<&'a Arc<dyn Operation>> {
        match &self.graph.node(self.handle).kind {
            NodeKind::Step(StepKind::Operation { operation }) => Some(operation),
            _ => None,
        }
    }

    pub fn expression(&self) -> Option<&'a str> {
        match &self.graph.node(self.handle).kind {
            NodeKind::Step(StepKind::Expression { expression, .. }) => Some(expression),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<&'a str> {
        match &self.graph.node(self.handle).kind {
            NodeKind::Step(StepKind::SubWorkflow { resource, .. }) => Some(resource),
            _ => None,
        }
    }

    /// The root of the workflow a sub-workflow step runs.
    pub fn nested_workflow(&self) -> Option<NodeRef<'a>> {
        match &self.graph.node(self.handle).kind {
            NodeKind::Step(StepKind::SubWorkflow { workflow, .. }) => Some(self.with(*workflow)),
            _ => None,
        }
    }

    fn with(&self, handle: NodeHandle) -> NodeRef<'a> {
        NodeRef {
            graph: self.graph,
            handle,
        }
    }

    fn connector(&self, handle: ConnectorHandle) -> ConnectorRef<'a> {
        ConnectorRef {
            graph: self.graph,
            handle,
        }
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("type", &self.node_type())
            .finish()
    }
}

/// Read-only view of a connector.
#[derive(Clone, Copy)]
pub struct ConnectorRef<'a> {
    pub(crate) graph: &'a NodeGraph,
    pub(crate) handle: ConnectorHandle,
}

impl<'a> ConnectorRef<'a> {
    pub fn handle(&self) -> ConnectorHandle {
        self.handle
    }

    pub fn name(&self) -> &'a str {
        &self.graph.connector(self.handle).name
    }

    pub fn direction(&self) -> Direction {
        self.graph.connector(self.handle).direction
    }

    pub fn node(&self) -> NodeRef<'a> {
        NodeRef {
            graph: self.graph,
            handle: self.graph.connector(self.handle).node,
        }
    }

    /// `"<node-id>.<name>"`.
    pub fn label(&self) -> String {
        self.graph.connector_label(self.handle)
    }

    /// The current value, read through the source chain on every call.
    pub fn value(&self) -> Result<Value, ReferenceError> {
        self.graph.read(self.handle)
    }

    /// The literal this connector holds itself, if any.
    pub fn literal(&self) -> Option<&'a Value> {
        match &self.graph.connector(self.handle).binding {
            Binding::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The connector this one reads from, if bound to a source.
    pub fn source(&self) -> Option<ConnectorRef<'a>> {
        match self.graph.connector(self.handle).binding {
            Binding::Source(handle) => Some(ConnectorRef {
                graph: self.graph,
                handle,
            }),
            _ => None,
        }
    }

    /// The reference still waiting for resolution, if any.
    pub fn pending(&self) -> Option<&'a SourceRef> {
        match &self.graph.connector(self.handle).binding {
            Binding::Pending(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.graph.connector(self.handle).binding, Binding::Unbound)
    }
}

impl std::fmt::Debug for ConnectorRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRef")
            .field("connector", &self.label())
            .field("binding", &self.graph.connector(self.handle).binding)
            .finish()
    }
}
