//! # Stepgraph - Workflow Graph Engine
//!
//! **Stepgraph** wires independently defined processing steps into a directed graph through
//! named input/output connectors, persists that graph as a JSON document, and executes it in
//! declaration order with values pulled lazily through the connector graph.
//!
//! ## Core Workflow
//!
//! 1.  **Register Operations**: Put the callables your documents may reference into an
//!     `OperationRegistry`, each with an `OperationSignature` naming its inputs and outputs.
//! 2.  **Load or Build**: Load a workflow document with `Workflow::load_path` (or build one in
//!     code with `Workflow::new` and the step builders). Loading constructs every step first and
//!     then resolves all `source` references in one pass, so steps may refer forward.
//! 3.  **Invoke**: Set the workflow inputs, call `Workflow::invoke` with a `Monitor`, and read
//!     the outputs. Re-invoking after changing inputs re-reads every connector.
//! 4.  **Save**: `Workflow::save` writes the document form back out; it round-trips.
//!
//! Steps come in three kinds: operation steps call a registered operation, expression steps
//! evaluate a small sandboxed expression over their inputs, and sub-workflow steps run a nested
//! workflow loaded from another document.
//!
//! ## Quick Start
//!
//! ```rust
//! use stepgraph::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let mut registry = OperationRegistry::new();
//!     registry.register_fn(
//!         OperationSignature::new("math.add").with_input("a").with_input("b"),
//!         |inputs, _monitor| {
//!             let a = inputs["a"].as_f64().unwrap_or_default();
//!             let b = inputs["b"].as_f64().unwrap_or_default();
//!             Ok(json!(a + b))
//!         },
//!     );
//!
//!     let document = r#"{
//!         "qualified_name": "demo.workflow",
//!         "input": {"z": {"value": 3}},
//!         "output": {"result": {"source": "scaled.return"}},
//!         "steps": [
//!             {"id": "sum", "op": "math.add",
//!              "input": {"a": {"value": 1}, "b": {"source": ".z"}}},
//!             {"id": "scaled", "expression": "s * 10",
//!              "input": {"s": {"source": "sum"}}}
//!         ]
//!     }"#;
//!
//!     let mut workflow = Workflow::from_json_str(document, &registry)?;
//!     workflow.invoke(&NullMonitor)?;
//!     assert_eq!(workflow.output_value("result")?, json!(40));
//!
//!     workflow.set_input_value("z", json!(5))?;
//!     workflow.invoke(&NullMonitor)?;
//!     assert_eq!(workflow.output_value("result")?, json!(60));
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod compiler;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod monitor;
pub mod prelude;
pub mod registry;
pub mod signature;
pub mod trace;
pub mod workflow;
