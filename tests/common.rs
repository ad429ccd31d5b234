//! Common test utilities: a registry of sample operations and workflow documents.
use anyhow::{anyhow, bail};
use serde_json::{Value, json};
use stepgraph::prelude::*;

fn integer_or_float(inputs: &Inputs, name: &str) -> anyhow::Result<Value> {
    match inputs.get(name) {
        Some(value) if value.is_number() => Ok(value.clone()),
        other => Err(anyhow!("input '{}' must be a number, got {:?}", name, other)),
    }
}

/// Adds two JSON numbers, keeping integers integral.
fn add_numbers(a: &Value, b: &Value) -> Value {
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => json!(a + b),
        _ => json!(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default()),
    }
}

/// Creates the registry used across the integration tests.
///
/// - `add(a, b) -> return`
/// - `scale(x, factor) -> return`
/// - `divmod(a, b) -> quotient, remainder`
/// - `fail() -> return`, always errors
/// - `sleepy(ticks) -> return`, reports one progress unit per tick and honours cancellation
#[allow(dead_code)]
pub fn create_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry
        .register_fn(
            OperationSignature::new("add").with_input("a").with_input("b"),
            |inputs, _| {
                let a = integer_or_float(inputs, "a")?;
                let b = integer_or_float(inputs, "b")?;
                Ok(add_numbers(&a, &b))
            },
        )
        .register_fn(
            OperationSignature::new("scale")
                .with_input("x")
                .with_input("factor"),
            |inputs, _| {
                let x = integer_or_float(inputs, "x")?;
                let factor = integer_or_float(inputs, "factor")?;
                Ok(match (x.as_i64(), factor.as_i64()) {
                    (Some(x), Some(factor)) => json!(x * factor),
                    _ => json!(x.as_f64().unwrap_or_default() * factor.as_f64().unwrap_or_default()),
                })
            },
        )
        .register_fn(
            OperationSignature::new("divmod")
                .with_input("a")
                .with_input("b")
                .with_output("quotient")
                .with_output("remainder"),
            |inputs, _| {
                let a = integer_or_float(inputs, "a")?.as_i64().unwrap_or_default();
                let b = integer_or_float(inputs, "b")?.as_i64().unwrap_or_default();
                if b == 0 {
                    bail!("division by zero");
                }
                Ok(json!({"quotient": a.div_euclid(b), "remainder": a.rem_euclid(b)}))
            },
        )
        .register_fn(OperationSignature::new("fail"), |_, _| bail!("boom"))
        .register_fn(
            OperationSignature::new("sleepy").with_input("ticks"),
            |inputs, monitor| {
                let ticks = inputs.get("ticks").and_then(Value::as_u64).unwrap_or(1);
                monitor.start("sleeping", ticks as f64);
                for _ in 0..ticks {
                    monitor.check_cancelled()?;
                    monitor.progress(1.0);
                }
                monitor.done();
                Ok(json!(ticks))
            },
        );
    registry
}

/// Loads a workflow document with [`create_registry`].
#[allow(dead_code)]
pub fn load(json: &str) -> Workflow {
    Workflow::from_json_str(json, &create_registry()).expect("workflow document should load")
}

/// One operation step adding two literals.
#[allow(dead_code)]
pub const ADD_WORKFLOW_JSON: &str = r#"{
    "qualified_name": "tests.add",
    "output": {"sum": {"source": "step1.return"}},
    "steps": [
        {"id": "step1", "op": "add", "input": {"a": {"value": 1}, "b": {"value": 2}}}
    ]
}"#;

/// An expression step whose second input is found through scope lookup.
#[allow(dead_code)]
pub const SCOPE_WORKFLOW_JSON: &str = r#"{
    "qualified_name": "tests.scope",
    "input": {"z": {"value": 3}},
    "output": {"result": {"source": "calc"}},
    "steps": [
        {"id": "calc", "expression": "x + y",
         "input": {"x": {"value": 2}, "y": {"source": ".z"}}}
    ]
}"#;

/// A chain of three steps exercising named outputs and sole-output references.
#[allow(dead_code)]
pub const CHAIN_WORKFLOW_JSON: &str = r#"{
    "qualified_name": "tests.chain",
    "header": {"description": "divide, then scale the quotient"},
    "input": {
        "dividend": {"value": 17, "data_type": "int"},
        "divisor": {"value": 5}
    },
    "output": {
        "scaled": {"source": "scale_step"},
        "remainder": {"source": "split.remainder"}
    },
    "steps": [
        {"id": "split", "op": "divmod",
         "input": {"a": {"source": ".dividend"}, "b": {"source": ".divisor"}}},
        {"id": "scale_step", "op": "scale",
         "input": {"x": {"source": "split.quotient"}, "factor": {"value": 10}}},
        {"id": "describe", "expression": "{total: q * 10 + r, big: q > 2}",
         "input": {"q": "split.quotient", "r": "split.remainder"},
         "output": {"total": {}, "big": {}}}
    ]
}"#;

/// The nested workflow used by sub-workflow tests: doubles its input `n`.
#[allow(dead_code)]
pub const DOUBLER_WORKFLOW_JSON: &str = r#"{
    "qualified_name": "tests.doubler",
    "input": {"n": {}},
    "output": {"doubled": {"source": "twice"}},
    "steps": [
        {"id": "twice", "op": "scale", "input": {"x": {"source": ".n"}, "factor": {"value": 2}}}
    ]
}"#;

/// A workflow wrapping `doubler.json` from the same directory.
#[allow(dead_code)]
pub const OUTER_WORKFLOW_JSON: &str = r#"{
    "qualified_name": "tests.outer",
    "output": {"result": {"source": "inner.doubled"}},
    "steps": [
        {"id": "inner", "workflow": "doubler.json", "input": {"n": {"value": 10}}}
    ]
}"#;
