use crate::document::SourceRef;
use crate::error::ReferenceError;
use crate::evaluator::Evaluator;
use crate::registry::Operation;
use crate::signature::OperationSignature;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Index of a node inside its workflow's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

/// Index of a connector inside its workflow's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectorHandle(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// What a connector currently holds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Unbound,
    Value(Value),
    Source(ConnectorHandle),
    /// A reference read from a document or builder, awaiting resolution.
    Pending(SourceRef),
}

#[derive(Debug, Clone)]
pub(crate) struct Connector {
    pub node: NodeHandle,
    pub name: String,
    pub direction: Direction,
    pub binding: Binding,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeSlot {
    pub id: String,
    pub signature: OperationSignature,
    pub inputs: IndexMap<String, ConnectorHandle>,
    pub outputs: IndexMap<String, ConnectorHandle>,
    pub parent: Option<NodeHandle>,
    pub kind: NodeKind,
}

impl NodeSlot {
    pub fn connectors(&self, direction: Direction) -> &IndexMap<String, ConnectorHandle> {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Workflow { steps: IndexMap<String, NodeHandle> },
    Step(StepKind),
}

#[derive(Clone)]
pub(crate) enum StepKind {
    Operation {
        operation: Arc<dyn Operation>,
    },
    Expression {
        expression: String,
        evaluator: Arc<Evaluator>,
    },
    SubWorkflow {
        workflow: NodeHandle,
        resource: String,
    },
}

impl fmt::Debug for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Operation { operation } => f
                .debug_struct("Operation")
                .field("op", &operation.signature().qualified_name)
                .finish(),
            StepKind::Expression { expression, .. } => f
                .debug_struct("Expression")
                .field("expression", expression)
                .finish(),
            StepKind::SubWorkflow { workflow, resource } => f
                .debug_struct("SubWorkflow")
                .field("workflow", workflow)
                .field("resource", resource)
                .finish(),
        }
    }
}

/// Arena owning every node and connector of a workflow tree.
///
/// Parent links and connector sources are plain handles into this arena, so the tree holds no
/// reference cycles. Nodes removed from a workflow stay in the arena as orphans.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeGraph {
    nodes: Vec<NodeSlot>,
    connectors: Vec<Connector>,
}

impl NodeGraph {
    /// Adds a node and one unbound connector per name declared in its signature.
    pub fn add_node(&mut self, id: String, signature: OperationSignature, kind: NodeKind) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        let input_names: Vec<String> = signature.inputs.keys().cloned().collect();
        let output_names: Vec<String> = signature.outputs.keys().cloned().collect();
        self.nodes.push(NodeSlot {
            id,
            signature,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            parent: None,
            kind,
        });
        for name in input_names {
            self.add_connector(handle, &name, Direction::Input);
        }
        for name in output_names {
            self.add_connector(handle, &name, Direction::Output);
        }
        handle
    }

    /// Returns the named connector of `node`, creating it (and extending the node's signature)
    /// when it does not exist yet.
    pub fn add_connector(&mut self, node: NodeHandle, name: &str, direction: Direction) -> ConnectorHandle {
        if let Some(&existing) = self.nodes[node.0].connectors(direction).get(name) {
            return existing;
        }
        let handle = ConnectorHandle(self.connectors.len());
        self.connectors.push(Connector {
            node,
            name: name.to_string(),
            direction,
            binding: Binding::Unbound,
        });
        let slot = &mut self.nodes[node.0];
        let (connectors, declared) = match direction {
            Direction::Input => (&mut slot.inputs, &mut slot.signature.inputs),
            Direction::Output => (&mut slot.outputs, &mut slot.signature.outputs),
        };
        connectors.insert(name.to_string(), handle);
        declared.entry(name.to_string()).or_default();
        handle
    }

    /// Moves every node and connector of `other` into this arena and returns the new handle of
    /// `root`.
    pub fn graft(&mut self, other: NodeGraph, root: NodeHandle) -> NodeHandle {
        let node_offset = self.nodes.len();
        let connector_offset = self.connectors.len();
        let shift_node = move |h: NodeHandle| NodeHandle(h.0 + node_offset);
        let shift_connector = move |h: ConnectorHandle| ConnectorHandle(h.0 + connector_offset);

        for mut slot in other.nodes {
            slot.inputs.values_mut().for_each(|h| *h = shift_connector(*h));
            slot.outputs.values_mut().for_each(|h| *h = shift_connector(*h));
            slot.parent = slot.parent.map(shift_node);
            match &mut slot.kind {
                NodeKind::Workflow { steps } => steps.values_mut().for_each(|h| *h = shift_node(*h)),
                NodeKind::Step(StepKind::SubWorkflow { workflow, .. }) => {
                    *workflow = shift_node(*workflow)
                }
                NodeKind::Step(_) => {}
            }
            self.nodes.push(slot);
        }
        for mut connector in other.connectors {
            connector.node = shift_node(connector.node);
            if let Binding::Source(target) = &mut connector.binding {
                *target = shift_connector(*target);
            }
            self.connectors.push(connector);
        }
        shift_node(root)
    }

    pub fn node(&self, handle: NodeHandle) -> &NodeSlot {
        &self.nodes[handle.0]
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut NodeSlot {
        &mut self.nodes[handle.0]
    }

    pub fn connector(&self, handle: ConnectorHandle) -> &Connector {
        &self.connectors[handle.0]
    }

    /// `"<node-id>.<name>"`, the form used in documents and error messages.
    pub fn connector_label(&self, handle: ConnectorHandle) -> String {
        let connector = self.connector(handle);
        format!("{}.{}", self.node(connector.node).id, connector.name)
    }

    pub fn root_of(&self, mut node: NodeHandle) -> NodeHandle {
        while let Some(parent) = self.node(node).parent {
            node = parent;
        }
        node
    }

    /// Searches the steps of a workflow node, then the children of those steps.
    pub fn find_node(&self, from: NodeHandle, id: &str) -> Option<NodeHandle> {
        let NodeKind::Workflow { steps } = &self.node(from).kind else {
            return None;
        };
        if let Some(&step) = steps.get(id) {
            return Some(step);
        }
        steps.values().find_map(|&step| self.find_node(step, id))
    }

    /// Looks up a connector by name; outputs take precedence over inputs.
    pub fn find_connector(&self, node: NodeHandle, name: &str) -> Option<ConnectorHandle> {
        let slot = self.node(node);
        slot.outputs.get(name).or_else(|| slot.inputs.get(name)).copied()
    }

    /// Finds a node by id anywhere in the tree `scope` belongs to, starting at its root.
    pub fn lookup_node(&self, scope: NodeHandle, id: &str) -> Option<NodeHandle> {
        let root = self.root_of(scope);
        if self.node(root).id == id {
            Some(root)
        } else {
            self.find_node(root, id)
        }
    }

    /// Reads the current value of a connector, following its source chain.
    ///
    /// An unbound connector reads as `null`.
    pub fn read(&self, handle: ConnectorHandle) -> Result<Value, ReferenceError> {
        let mut current = handle;
        loop {
            match &self.connector(current).binding {
                Binding::Unbound => return Ok(Value::Null),
                Binding::Value(value) => return Ok(value.clone()),
                Binding::Source(next) => current = *next,
                Binding::Pending(reference) => {
                    return Err(ReferenceError::Unresolved {
                        connector: self.connector_label(current),
                        reference: reference.to_string(),
                    });
                }
            }
        }
    }

    pub fn set_value(&mut self, handle: ConnectorHandle, value: Value) {
        self.connectors[handle.0].binding = Binding::Value(value);
    }

    pub fn set_pending(&mut self, handle: ConnectorHandle, reference: SourceRef) {
        self.connectors[handle.0].binding = Binding::Pending(reference);
    }

    pub fn clear(&mut self, handle: ConnectorHandle) {
        self.connectors[handle.0].binding = Binding::Unbound;
    }

    /// Binds `handle` to read from `target`.
    ///
    /// Rejects binding a connector to itself and any binding that would close a loop of
    /// sources.
    pub fn set_source(&mut self, handle: ConnectorHandle, target: ConnectorHandle) -> Result<(), ReferenceError> {
        if handle == target {
            return Err(ReferenceError::SelfReference {
                connector: self.connector_label(handle),
            });
        }
        let mut current = target;
        while let Binding::Source(next) = self.connector(current).binding {
            if next == handle {
                return Err(ReferenceError::Cycle {
                    connector: self.connector_label(handle),
                    target: self.connector_label(target),
                });
            }
            current = next;
        }
        self.connectors[handle.0].binding = Binding::Source(target);
        Ok(())
    }

    /// Binds `handle` to `target` without loop checks. Only for targets that cannot read from
    /// `handle`, such as a nested workflow input reading from its enclosing step.
    pub fn link(&mut self, handle: ConnectorHandle, target: ConnectorHandle) {
        self.connectors[handle.0].binding = Binding::Source(target);
    }

    /// Resolves the pending references of a node's outputs and inputs, then those of its
    /// children.
    pub fn resolve_node(&mut self, node: NodeHandle) -> Result<(), ReferenceError> {
        let slot = self.node(node);
        let connectors: Vec<ConnectorHandle> = slot
            .outputs
            .values()
            .chain(slot.inputs.values())
            .copied()
            .collect();
        for connector in connectors {
            self.resolve_connector(connector)?;
        }

        let children: Vec<NodeHandle> = match &self.node(node).kind {
            NodeKind::Workflow { steps } => steps.values().copied().collect(),
            NodeKind::Step(StepKind::SubWorkflow { workflow, .. }) => vec![*workflow],
            NodeKind::Step(_) => Vec::new(),
        };
        for child in children {
            self.resolve_node(child)?;
        }
        Ok(())
    }

    fn resolve_connector(&mut self, handle: ConnectorHandle) -> Result<(), ReferenceError> {
        let Binding::Pending(reference) = &self.connector(handle).binding else {
            return Ok(());
        };
        let reference = reference.clone();
        let target = self.locate(handle, &reference)?;
        trace!(
            connector = %self.connector_label(handle),
            reference = %reference,
            target = %self.connector_label(target),
            "resolved connector reference"
        );
        self.set_source(handle, target)
    }

    /// Finds the connector a reference held by `handle` points at.
    fn locate(&self, handle: ConnectorHandle, reference: &SourceRef) -> Result<ConnectorHandle, ReferenceError> {
        let owner = self.connector(handle).node;
        let label = || self.connector_label(handle);

        match (&reference.node_id, &reference.name) {
            (Some(node_id), Some(name)) => {
                let node = self
                    .lookup_node(owner, node_id)
                    .ok_or_else(|| ReferenceError::UnknownNode {
                        connector: label(),
                        target: reference.to_string(),
                    })?;
                self.find_connector(node, name)
                    .ok_or_else(|| ReferenceError::UnknownConnector {
                        connector: label(),
                        node: node_id.clone(),
                        name: name.clone(),
                    })
            }
            (Some(node_id), None) => {
                let node = self
                    .lookup_node(owner, node_id)
                    .ok_or_else(|| ReferenceError::UnknownNode {
                        connector: label(),
                        target: node_id.clone(),
                    })?;
                let outputs = &self.node(node).outputs;
                match outputs.get_index(0) {
                    Some((_, &output)) if outputs.len() == 1 => Ok(output),
                    _ => Err(ReferenceError::AmbiguousOutput {
                        connector: label(),
                        node: node_id.clone(),
                        count: outputs.len(),
                    }),
                }
            }
            (None, Some(name)) => {
                let mut scope = Some(owner);
                while let Some(node) = scope {
                    let slot = self.node(node);
                    let found = [slot.outputs.get(name), slot.inputs.get(name)]
                        .into_iter()
                        .flatten()
                        .copied()
                        .find(|&candidate| candidate != handle);
                    if let Some(found) = found {
                        return Ok(found);
                    }
                    scope = slot.parent;
                }
                Err(ReferenceError::NotInScope {
                    connector: label(),
                    name: name.clone(),
                })
            }
            (None, None) => Err(ReferenceError::NotInScope {
                connector: label(),
                name: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf_kind() -> NodeKind {
        NodeKind::Workflow {
            steps: IndexMap::new(),
        }
    }

    fn two_step_graph() -> (NodeGraph, NodeHandle, NodeHandle, NodeHandle) {
        let mut graph = NodeGraph::default();
        let root = graph.add_node(
            "wf".to_string(),
            OperationSignature::new("wf").with_input("x").with_output("y"),
            leaf_kind(),
        );
        let mut steps = IndexMap::new();
        for id in ["a", "b"] {
            let step = graph.add_node(
                id.to_string(),
                OperationSignature::new("step").with_input("x").with_output("return"),
                leaf_kind(),
            );
            graph.node_mut(step).parent = Some(root);
            steps.insert(id.to_string(), step);
        }
        let (a, b) = (steps["a"], steps["b"]);
        graph.node_mut(root).kind = NodeKind::Workflow { steps };
        (graph, root, a, b)
    }

    #[test]
    fn reads_follow_sources_dynamically() {
        let (mut graph, root, a, b) = two_step_graph();
        let a_out = graph.node(a).outputs["return"];
        let b_in = graph.node(b).inputs["x"];
        let wf_out = graph.node(root).outputs["y"];

        graph.set_source(b_in, a_out).unwrap();
        graph.set_source(wf_out, b_in).unwrap();
        assert_eq!(graph.read(wf_out).unwrap(), Value::Null);

        graph.set_value(a_out, json!(7));
        assert_eq!(graph.read(wf_out).unwrap(), json!(7));
        graph.set_value(a_out, json!(8));
        assert_eq!(graph.read(wf_out).unwrap(), json!(8));
    }

    #[test]
    fn rejects_self_references_and_cycles() {
        let (mut graph, _, a, b) = two_step_graph();
        let a_in = graph.node(a).inputs["x"];
        let b_in = graph.node(b).inputs["x"];

        assert!(matches!(
            graph.set_source(a_in, a_in),
            Err(ReferenceError::SelfReference { connector }) if connector == "a.x"
        ));
        graph.set_source(a_in, b_in).unwrap();
        assert!(matches!(
            graph.set_source(b_in, a_in),
            Err(ReferenceError::Cycle { .. })
        ));
    }

    #[test]
    fn scope_lookup_skips_the_requesting_connector() {
        let (mut graph, root, a, _) = two_step_graph();
        let a_in = graph.node(a).inputs["x"];
        graph.set_pending(a_in, SourceRef::scope("x"));
        graph.resolve_node(root).unwrap();
        assert_eq!(
            graph.connector(a_in).binding,
            Binding::Source(graph.node(root).inputs["x"])
        );
    }

    #[test]
    fn sole_output_references_require_exactly_one_output() {
        let (mut graph, root, a, b) = two_step_graph();
        let b_in = graph.node(b).inputs["x"];
        graph.set_pending(b_in, SourceRef::sole_output("a"));
        graph.resolve_node(root).unwrap();
        assert_eq!(
            graph.connector(b_in).binding,
            Binding::Source(graph.node(a).outputs["return"])
        );

        graph.add_connector(a, "extra", Direction::Output);
        graph.set_pending(b_in, SourceRef::sole_output("a"));
        assert!(matches!(
            graph.resolve_node(root),
            Err(ReferenceError::AmbiguousOutput { count: 2, .. })
        ));
    }
}
