use crate::ast::Value;
use thiserror::Error;

/// Errors raised while constructing nodes, before any document-level resolution runs.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("A node id must not be empty")]
    EmptyNodeId,

    #[error("A qualified name must not be empty")]
    EmptyQualifiedName,

    #[error("An expression step requires a non-empty expression")]
    EmptyExpression,

    #[error("A workflow step requires a non-empty resource locator")]
    EmptyResource,

    #[error("Operation '{name}' is not registered")]
    OperationNotFound { name: String },

    #[error("Workflow '{workflow}' already contains a step with id '{id}'")]
    DuplicateStepId { id: String, workflow: String },

    #[error("Invalid expression '{expression}': {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: SyntaxError,
    },
}

/// Errors raised while reading or decoding a workflow document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Could not read workflow document '{locator}': {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse workflow document '{locator}': {source}")]
    Json {
        locator: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing mandatory property '{field}' in workflow document")]
    MissingField { field: String },

    #[error("Error decoding '{connector}': \"source\" and \"value\" are mutually exclusive")]
    AmbiguousBinding { connector: String },

    #[error(
        "Error decoding '{connector}': source '{reference}' is neither \"<node-id>.<name>\", \"<node-id>\", nor \".<name>\""
    )]
    MalformedSource { connector: String, reference: String },

    #[error("Unknown type for step #{position} in workflow '{workflow}'")]
    UnknownStepType { position: usize, workflow: String },
}

/// Errors raised while binding a connector to its source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Cannot connect '{connector}' with '{target}' because node '{target}' does not exist")]
    UnknownNode { connector: String, target: String },

    #[error(
        "Cannot connect '{connector}' with '{node}.{name}' because node '{node}' has no input/output named '{name}'"
    )]
    UnknownConnector {
        connector: String,
        node: String,
        name: String,
    },

    #[error("Cannot connect '{connector}' with node '{node}' because it has {count} outputs")]
    AmbiguousOutput {
        connector: String,
        node: String,
        count: usize,
    },

    #[error("Cannot connect '{connector}' with '.{name}' because '{name}' does not exist in any scope")]
    NotInScope { connector: String, name: String },

    #[error("Cannot connect '{connector}' with itself")]
    SelfReference { connector: String },

    #[error("Cannot connect '{connector}' with '{target}' because it would form a cycle")]
    Cycle { connector: String, target: String },

    #[error("Connector '{connector}' holds the unresolved reference '{reference}'")]
    Unresolved { connector: String, reference: String },
}

/// Errors raised while tokenizing or parsing expression source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { found: char, offset: usize },

    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Expected {expected} at offset {offset}, but found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Expression nests deeper than {limit} levels at offset {offset}")]
    TooDeep { limit: usize, offset: usize },
}

/// Errors that can occur while evaluating an expression AST.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Name '{0}' is not bound to any input")]
    UnknownName(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Record has no field named '{0}'")]
    MissingField(String),
}

/// Errors raised while invoking a node.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Operation of node '{node_id}' failed: {source}")]
    Operation {
        node_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Expression of node '{node_id}' failed: {source}")]
    Expression {
        node_id: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Invocation of node '{node_id}' was interrupted")]
    Interrupted { node_id: String },

    #[error("Node '{node_id}' produced unusable outputs: {message}")]
    OutputMismatch { node_id: String, message: String },

    #[error("Nested workflow of node '{node_id}' failed: {source}")]
    SubWorkflow {
        node_id: String,
        #[source]
        source: Box<InvocationError>,
    },

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Any failure of the workflow engine.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

impl InvocationError {
    /// Returns true when the failure was caused by cooperative cancellation, at any depth of
    /// nested workflows.
    pub fn is_interrupted(&self) -> bool {
        match self {
            InvocationError::Interrupted { .. } => true,
            InvocationError::SubWorkflow { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }
}

impl WorkflowError {
    /// Returns true when the failure was caused by cooperative cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WorkflowError::Invocation(error) if error.is_interrupted())
    }
}
