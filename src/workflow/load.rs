use super::Workflow;
use super::graph::{ConnectorHandle, Direction};
use super::step::{BindingSpec, ExpressionStep, OperationStep, Step, SubWorkflowStep};
use crate::document::{self, ConnectorDocument, SourceRef, StepDocument, WorkflowDocument};
use crate::error::{DocumentError, WorkflowError};
use crate::registry::OperationRegistry;
use crate::signature::{OperationSignature, Properties};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

impl Workflow {
    /// Loads a workflow document from a file.
    ///
    /// Relative `"workflow"` locators of nested steps resolve against the file's directory.
    pub fn load_path(
        path: impl AsRef<Path>,
        registry: &OperationRegistry,
    ) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let document = document::read_path(path)?;
        let workflow = Self::build(&document, registry, path.parent())?;
        info!(
            workflow = %workflow.id(),
            steps = document.steps.len(),
            locator = %path.display(),
            "loaded workflow"
        );
        Ok(workflow)
    }

    /// Loads a workflow document from an open stream.
    ///
    /// Relative nested locators resolve against the current working directory.
    pub fn load_reader<R: Read>(reader: R, registry: &OperationRegistry) -> Result<Self, WorkflowError> {
        let document = document::read_from(reader, "<stream>")?;
        let workflow = Self::build(&document, registry, None)?;
        info!(workflow = %workflow.id(), steps = document.steps.len(), "loaded workflow from stream");
        Ok(workflow)
    }

    pub fn from_json_str(json: &str, registry: &OperationRegistry) -> Result<Self, WorkflowError> {
        Self::load_reader(json.as_bytes(), registry)
    }

    /// Builds and resolves a workflow from an already decoded document.
    pub fn from_document(
        document: &WorkflowDocument,
        registry: &OperationRegistry,
    ) -> Result<Self, WorkflowError> {
        Self::build(document, registry, None)
    }

    /// Builds the frame, then every step, then the workflow's own bindings, and finally runs
    /// one resolution pass over the whole tree.
    fn build(
        document: &WorkflowDocument,
        registry: &OperationRegistry,
        base_dir: Option<&Path>,
    ) -> Result<Self, WorkflowError> {
        let qualified_name = document
            .qualified_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DocumentError::MissingField {
                field: "qualified_name".to_string(),
            })?;

        let declared = |connectors: &IndexMap<String, ConnectorDocument>| -> IndexMap<String, Properties> {
            connectors
                .iter()
                .map(|(name, spec)| (name.clone(), spec.properties.clone()))
                .collect()
        };
        let signature = OperationSignature {
            qualified_name: qualified_name.to_string(),
            header: document.header.clone(),
            inputs: declared(&document.input),
            outputs: declared(&document.output),
        };
        let mut workflow = Workflow::new(signature)?;

        for (index, step_document) in document.steps.iter().enumerate() {
            let step = step_from_document(step_document, index + 1, qualified_name, registry, base_dir)?;
            workflow.add_step(step)?;
        }

        for (direction, connectors) in [
            (Direction::Input, &document.input),
            (Direction::Output, &document.output),
        ] {
            for (name, spec) in connectors {
                let label = format!("{}.{}", qualified_name, name);
                let Some(binding) = binding_from_document(spec, &label)? else {
                    continue;
                };
                let handle = workflow.own_connector(direction, name);
                match binding {
                    BindingSpec::Value(value) => workflow.set_value(handle, value),
                    BindingSpec::Source(reference) => workflow.set_source_ref(handle, reference),
                }
            }
        }

        workflow.resolve_references()?;
        Ok(workflow)
    }

    fn own_connector(&mut self, direction: Direction, name: &str) -> ConnectorHandle {
        self.graph.add_connector(self.root, name, direction)
    }
}

/// Creates the step a document entry describes, trying `op`, `workflow` and `expression` in
/// that order.
fn step_from_document(
    document: &StepDocument,
    position: usize,
    workflow: &str,
    registry: &OperationRegistry,
    base_dir: Option<&Path>,
) -> Result<Step, WorkflowError> {
    let step: Step = if let Some(op) = &document.op {
        OperationStep::new(op, registry)?.into()
    } else if let Some(locator) = &document.workflow {
        let path = document::resolve_locator(base_dir, locator);
        let nested = Workflow::load_path(&path, registry)?;
        SubWorkflowStep::new(nested, locator.clone())?.into()
    } else if let Some(expression) = &document.expression {
        let mut step = ExpressionStep::new(expression.clone())?;
        // Declared names seed the signature before the synthetic output is considered.
        for name in document.output.keys() {
            step = step.with_output(name);
        }
        step.into()
    } else {
        return Err(DocumentError::UnknownStepType {
            position,
            workflow: workflow.to_string(),
        }
        .into());
    };

    let mut step = match &document.id {
        Some(id) => step.with_id(id.clone()),
        None => step,
    };
    for (direction, connectors) in [
        (Direction::Input, &document.input),
        (Direction::Output, &document.output),
    ] {
        for (name, spec) in connectors {
            let label = format!("{}.{}", step.id(), name);
            step = match binding_from_document(spec, &label)? {
                Some(binding) => step.with_binding(direction, name, binding),
                None => step.with_declared(direction, name),
            };
        }
    }
    Ok(step)
}

/// Interprets a connector spec; `None` means the connector is declared but unbound.
fn binding_from_document(
    spec: &ConnectorDocument,
    connector: &str,
) -> Result<Option<BindingSpec>, DocumentError> {
    match (&spec.source, &spec.value) {
        (Some(_), Some(_)) => Err(DocumentError::AmbiguousBinding {
            connector: connector.to_string(),
        }),
        (Some(source), None) => SourceRef::parse(source)
            .map(|reference| Some(BindingSpec::Source(reference)))
            .ok_or_else(|| DocumentError::MalformedSource {
                connector: connector.to_string(),
                reference: source.clone(),
            }),
        (None, Some(value)) => Ok(Some(BindingSpec::Value(value.clone()))),
        (None, None) => Ok(None),
    }
}
