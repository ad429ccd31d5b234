use super::Workflow;
use super::graph::{Binding, ConnectorHandle, NodeGraph, NodeHandle, NodeKind, StepKind};
use crate::document::{self, ConnectorDocument, StepDocument, WorkflowDocument};
use crate::error::DocumentError;
use crate::signature::Properties;
use indexmap::IndexMap;
use std::path::Path;

impl NodeGraph {
    fn connector_document(&self, handle: ConnectorHandle) -> ConnectorDocument {
        match &self.connector(handle).binding {
            Binding::Unbound => ConnectorDocument::default(),
            Binding::Value(value) => ConnectorDocument::value(value.clone()),
            Binding::Source(target) => ConnectorDocument::source(self.connector_label(*target)),
            Binding::Pending(reference) => ConnectorDocument::source(reference.to_string()),
        }
    }

    fn connector_documents(
        &self,
        connectors: &IndexMap<String, ConnectorHandle>,
    ) -> IndexMap<String, ConnectorDocument> {
        connectors
            .iter()
            .map(|(name, &handle)| (name.clone(), self.connector_document(handle)))
            .collect()
    }

    fn step_document(&self, step: NodeHandle) -> StepDocument {
        let slot = self.node(step);
        let mut document = StepDocument {
            id: Some(slot.id.clone()),
            input: self.connector_documents(&slot.inputs),
            output: self.connector_documents(&slot.outputs),
            ..StepDocument::default()
        };
        match &slot.kind {
            NodeKind::Step(StepKind::Operation { operation }) => {
                document.op = Some(operation.signature().qualified_name.clone());
            }
            NodeKind::Step(StepKind::SubWorkflow { resource, .. }) => {
                document.workflow = Some(resource.clone());
            }
            NodeKind::Step(StepKind::Expression { expression, .. }) => {
                document.expression = Some(expression.clone());
            }
            NodeKind::Workflow { .. } => {}
        }
        document
    }

    pub(crate) fn workflow_document(&self, node: NodeHandle) -> WorkflowDocument {
        let slot = self.node(node);
        let with_properties = |connectors: &IndexMap<String, ConnectorHandle>,
                               declared: &IndexMap<String, Properties>|
         -> IndexMap<String, ConnectorDocument> {
            connectors
                .iter()
                .map(|(name, &handle)| {
                    let properties = declared.get(name).cloned().unwrap_or_default();
                    (
                        name.clone(),
                        self.connector_document(handle).with_properties(properties),
                    )
                })
                .collect()
        };
        let steps = match &slot.kind {
            NodeKind::Workflow { steps } => steps
                .values()
                .map(|&step| self.step_document(step))
                .collect(),
            NodeKind::Step(_) => Vec::new(),
        };
        WorkflowDocument {
            qualified_name: Some(slot.signature.qualified_name.clone()),
            header: slot.signature.header.clone(),
            input: with_properties(&slot.inputs, &slot.signature.inputs),
            output: with_properties(&slot.outputs, &slot.signature.outputs),
            steps,
        }
    }
}

impl Workflow {
    /// Builds the document form: qualified name, header, inputs, outputs and steps in order.
    pub fn to_document(&self) -> WorkflowDocument {
        self.graph.workflow_document(self.root)
    }

    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(&self.to_document()).map_err(|source| DocumentError::Json {
            locator: self.id().to_string(),
            source,
        })
    }

    /// Writes the document form to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        document::write_path(&self.to_document(), path.as_ref())
    }
}
