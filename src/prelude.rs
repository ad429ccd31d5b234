//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the stepgraph crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use stepgraph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let registry = OperationRegistry::new();
//! let mut workflow = Workflow::load_path("path/to/workflow.json", &registry)?;
//!
//! let tracker = ProgressTracker::new();
//! workflow.invoke(&tracker)?;
//! for output in workflow.root().outputs() {
//!     println!("{} = {}", output.name(), output.value()?);
//! }
//! # Ok(())
//! # }
//! ```

// Workflow graph
pub use crate::workflow::{
    BindingSpec, ConnectorHandle, ConnectorRef, Direction, ExpressionStep, NodeHandle, NodeRef,
    NodeType, OperationStep, Step, SubWorkflowStep, Workflow,
};

// Documents
pub use crate::document::{ConnectorDocument, SourceRef, StepDocument, WorkflowDocument};

// Operations
pub use crate::registry::{FnOperation, Inputs, Operation, OperationRegistry};
pub use crate::signature::{OperationSignature, Properties, RETURN_OUTPUT_NAME};

// Progress and cancellation
pub use crate::monitor::{CancelHandle, Interrupted, Monitor, NullMonitor, ProgressTracker};

// Expressions
pub use crate::ast::{EvaluationTrace, Expression, Value};
pub use crate::evaluator::{EvaluationResult, Evaluator};
pub use crate::trace::TraceFormatter;

// Error types
pub use crate::error::{
    ConstructionError, DocumentError, EvaluationError, InvocationError, ReferenceError,
    SyntaxError, WorkflowError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
