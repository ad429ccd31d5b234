//! Detached step definitions that are attached to a workflow with `Workflow::add_step`.

use super::Workflow;
use super::graph::Direction;
use crate::compiler::compile;
use crate::document::SourceRef;
use crate::error::ConstructionError;
use crate::evaluator::Evaluator;
use crate::registry::{Operation, OperationRegistry};
use crate::signature::OperationSignature;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Qualified name used in the signature of expression steps.
pub const EXPRESSION_STEP_NAME: &str = "ExpressionStep";

/// An initial binding for a step connector.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSpec {
    Value(Value),
    Source(SourceRef),
}

/// Identity, signature and initial bindings shared by every step kind.
#[derive(Debug, Clone)]
pub(crate) struct StepFrame {
    pub id: String,
    pub signature: OperationSignature,
    pub bindings: Vec<(Direction, String, BindingSpec)>,
}

impl StepFrame {
    fn new(prefix: &str, signature: OperationSignature) -> Self {
        Self {
            id: format!("{}_{}", prefix, Uuid::new_v4().simple()),
            signature,
            bindings: Vec::new(),
        }
    }

    fn declare(&mut self, direction: Direction, name: &str) {
        let declared = match direction {
            Direction::Input => &mut self.signature.inputs,
            Direction::Output => &mut self.signature.outputs,
        };
        declared.entry(name.to_string()).or_default();
    }

    fn bind(&mut self, direction: Direction, name: String, binding: BindingSpec) {
        self.declare(direction, &name);
        self.bindings.retain(|(d, n, _)| !(*d == direction && *n == name));
        self.bindings.push((direction, name, binding));
    }
}

// Builder methods common to all step kinds.
macro_rules! step_builder_methods {
    () => {
        pub fn id(&self) -> &str {
            &self.frame.id
        }

        pub fn signature(&self) -> &OperationSignature {
            &self.frame.signature
        }

        /// Replaces the generated step id.
        pub fn with_id(mut self, id: impl Into<String>) -> Self {
            self.frame.id = id.into();
            self
        }

        /// Declares an input connector, extending the signature if needed.
        pub fn with_input(mut self, name: &str) -> Self {
            self.frame.declare(Direction::Input, name);
            self
        }

        /// Declares an output connector, extending the signature if needed.
        pub fn with_output(mut self, name: &str) -> Self {
            self.frame.declare(Direction::Output, name);
            self
        }

        pub fn with_input_binding(mut self, name: impl Into<String>, binding: BindingSpec) -> Self {
            self.frame.bind(Direction::Input, name.into(), binding);
            self
        }

        pub fn with_output_binding(mut self, name: impl Into<String>, binding: BindingSpec) -> Self {
            self.frame.bind(Direction::Output, name.into(), binding);
            self
        }

        pub fn with_input_value(self, name: impl Into<String>, value: Value) -> Self {
            self.with_input_binding(name, BindingSpec::Value(value))
        }

        pub fn with_input_source(self, name: impl Into<String>, source: SourceRef) -> Self {
            self.with_input_binding(name, BindingSpec::Source(source))
        }

        pub fn with_output_value(self, name: impl Into<String>, value: Value) -> Self {
            self.with_output_binding(name, BindingSpec::Value(value))
        }

        pub fn with_output_source(self, name: impl Into<String>, source: SourceRef) -> Self {
            self.with_output_binding(name, BindingSpec::Source(source))
        }
    };
}

/// A step that invokes a registered operation.
#[derive(Clone)]
pub struct OperationStep {
    pub(crate) frame: StepFrame,
    pub(crate) operation: Arc<dyn Operation>,
}

impl OperationStep {
    /// Looks up `name` in `registry`.
    pub fn new(name: &str, registry: &OperationRegistry) -> Result<Self, ConstructionError> {
        Self::from_operation(registry.lookup(name)?)
    }

    pub fn from_operation(operation: Arc<dyn Operation>) -> Result<Self, ConstructionError> {
        let mut signature = operation.signature().clone();
        if signature.qualified_name.is_empty() {
            return Err(ConstructionError::EmptyQualifiedName);
        }
        signature.ensure_return_output();
        Ok(Self {
            frame: StepFrame::new("op_step", signature),
            operation,
        })
    }

    step_builder_methods!();
}

/// A step that evaluates an expression over its input values.
#[derive(Debug, Clone)]
pub struct ExpressionStep {
    pub(crate) frame: StepFrame,
    pub(crate) expression: String,
    pub(crate) evaluator: Arc<Evaluator>,
}

impl ExpressionStep {
    /// Compiles `expression`. Without any declared output the step gets the synthetic
    /// `return` output when it is attached.
    pub fn new(expression: impl Into<String>) -> Result<Self, ConstructionError> {
        let expression = expression.into();
        if expression.trim().is_empty() {
            return Err(ConstructionError::EmptyExpression);
        }
        let compiled = compile(&expression).map_err(|source| ConstructionError::InvalidExpression {
            expression: expression.clone(),
            source,
        })?;
        Ok(Self {
            frame: StepFrame::new(
                "expr_step",
                OperationSignature::new(EXPRESSION_STEP_NAME),
            ),
            expression,
            evaluator: Arc::new(Evaluator::new(compiled)),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    step_builder_methods!();
}

/// A step that runs a nested workflow.
///
/// Once attached, every input of the nested workflow reads from the step input of the same
/// name, and invoking the step copies the nested outputs into the step outputs.
#[derive(Debug, Clone)]
pub struct SubWorkflowStep {
    pub(crate) frame: StepFrame,
    pub(crate) workflow: Workflow,
    pub(crate) resource: String,
}

impl SubWorkflowStep {
    /// `resource` is the locator the nested workflow was loaded from; it is what gets saved.
    pub fn new(workflow: Workflow, resource: impl Into<String>) -> Result<Self, ConstructionError> {
        let resource = resource.into();
        if resource.is_empty() {
            return Err(ConstructionError::EmptyResource);
        }
        Ok(Self {
            frame: StepFrame::new("workflow_step", workflow.signature().clone()),
            workflow,
            resource,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    step_builder_methods!();
}

/// Any step that can be attached to a workflow.
#[derive(Debug, Clone)]
pub enum Step {
    Operation(OperationStep),
    Expression(ExpressionStep),
    SubWorkflow(SubWorkflowStep),
}

impl Step {
    pub fn id(&self) -> &str {
        match self {
            Step::Operation(step) => step.id(),
            Step::Expression(step) => step.id(),
            Step::SubWorkflow(step) => step.id(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.frame_mut().id = id.into();
        self
    }

    pub(crate) fn with_declared(mut self, direction: Direction, name: &str) -> Self {
        self.frame_mut().declare(direction, name);
        self
    }

    pub(crate) fn with_binding(mut self, direction: Direction, name: &str, binding: BindingSpec) -> Self {
        self.frame_mut().bind(direction, name.to_string(), binding);
        self
    }

    fn frame_mut(&mut self) -> &mut StepFrame {
        match self {
            Step::Operation(step) => &mut step.frame,
            Step::Expression(step) => &mut step.frame,
            Step::SubWorkflow(step) => &mut step.frame,
        }
    }
}

impl From<OperationStep> for Step {
    fn from(step: OperationStep) -> Self {
        Step::Operation(step)
    }
}

impl From<ExpressionStep> for Step {
    fn from(step: ExpressionStep) -> Self {
        Step::Expression(step)
    }
}

impl From<SubWorkflowStep> for Step {
    fn from(step: SubWorkflowStep) -> Self {
        Step::SubWorkflow(step)
    }
}

impl std::fmt::Debug for OperationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationStep")
            .field("id", &self.frame.id)
            .field("op", &self.frame.signature.qualified_name)
            .finish()
    }
}
