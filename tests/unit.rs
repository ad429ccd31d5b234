//! Unit tests for core stepgraph types.
mod common;
use common::*;
use serde_json::json;
use stepgraph::prelude::*;

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(2.5)), "2.5");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
    assert_eq!(format!("{}", Value::Text("hi".to_string())), "'hi'");
    assert_eq!(format!("{}", Value::Null), "null");
    assert_eq!(
        format!(
            "{}",
            Value::List(vec![Value::Number(1.0), Value::Text("a".to_string())])
        ),
        "[1, 'a']"
    );
}

#[test]
fn test_value_json_conversion() {
    let json = json!({"count": 3, "ratio": 0.5, "tags": ["a", null], "ok": false});
    let value = Value::from(&json);

    match &value {
        Value::Record(fields) => {
            assert_eq!(fields["count"], Value::Number(3.0));
            assert_eq!(fields.keys().next().map(String::as_str), Some("count"));
        }
        other => panic!("expected a record, got {other}"),
    }
    assert_eq!(value.to_json(), json);
    assert_eq!(Value::Number(f64::NAN).to_json(), serde_json::Value::Null);
}

#[test]
fn test_source_ref_parsing() {
    assert_eq!(
        SourceRef::parse("step1.return"),
        Some(SourceRef::connector("step1", "return"))
    );
    assert_eq!(SourceRef::parse("step1"), Some(SourceRef::sole_output("step1")));
    assert_eq!(SourceRef::parse(".z"), Some(SourceRef::scope("z")));
    assert_eq!(
        SourceRef::parse("tests.chain.dividend"),
        Some(SourceRef::connector("tests.chain", "dividend"))
    );
    assert_eq!(SourceRef::parse(""), None);
    assert_eq!(SourceRef::parse("."), None);
}

#[test]
fn test_source_ref_display() {
    assert_eq!(SourceRef::connector("a", "b").to_string(), "a.b");
    assert_eq!(SourceRef::sole_output("a").to_string(), "a");
    assert_eq!(SourceRef::scope("b").to_string(), ".b");
}

#[test]
fn test_signature_return_output() {
    let mut signature = OperationSignature::new("op").with_input("a");
    assert!(signature.outputs.is_empty());

    signature.ensure_return_output();
    assert_eq!(
        signature.outputs.keys().collect::<Vec<_>>(),
        vec![RETURN_OUTPUT_NAME]
    );
    assert!(!signature.has_named_outputs());

    let named = OperationSignature::new("op")
        .with_output("quotient")
        .with_output("remainder");
    assert!(named.has_named_outputs());
}

#[test]
fn test_signature_keeps_declaration_order() {
    let signature = OperationSignature::new("op")
        .with_input("z")
        .with_input("a")
        .with_input("z");
    assert_eq!(signature.inputs.keys().collect::<Vec<_>>(), vec!["z", "a"]);
}

#[test]
fn test_registry_lookup() {
    let registry = create_registry();
    assert_eq!(
        registry.names(),
        vec!["add", "divmod", "fail", "scale", "sleepy"]
    );
    assert!(registry.get("add").is_some());

    let error = registry.lookup("missing").unwrap_err();
    assert!(matches!(
        error,
        ConstructionError::OperationNotFound { ref name } if name == "missing"
    ));
    assert_eq!(error.to_string(), "Operation 'missing' is not registered");
}

#[test]
fn test_registered_functions_get_a_return_output() {
    let registry = create_registry();
    let add = registry.get("add").unwrap();
    assert!(!add.signature().has_named_outputs());

    let mut inputs = Inputs::new();
    inputs.insert("a".to_string(), json!(2));
    inputs.insert("b".to_string(), json!(0.5));
    assert_eq!(add.invoke(&inputs, &NullMonitor).unwrap(), json!(2.5));
}

#[test]
fn test_reference_error_messages() {
    let error = ReferenceError::AmbiguousOutput {
        connector: "use.v".to_string(),
        node: "split".to_string(),
        count: 2,
    };
    assert_eq!(
        error.to_string(),
        "Cannot connect 'use.v' with node 'split' because it has 2 outputs"
    );

    let error = ReferenceError::NotInScope {
        connector: "calc.v".to_string(),
        name: "v".to_string(),
    };
    assert!(error.to_string().contains("'.v'"));
}

#[test]
fn test_document_error_messages() {
    let error = DocumentError::UnknownStepType {
        position: 3,
        workflow: "tests.bad".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Unknown type for step #3 in workflow 'tests.bad'"
    );
}

#[test]
fn test_nested_monitors_scale_progress() {
    let tracker = ProgressTracker::new();
    tracker.start("outer", 2.0);

    let child = tracker.child(1.0);
    child.start("middle", 2.0);
    let grandchild = child.child(1.0);
    grandchild.start("leaf", 4.0);
    grandchild.progress(2.0);
    assert_eq!(tracker.worked(), 0.25);

    grandchild.done();
    child.done();
    assert_eq!(tracker.worked(), 1.0);
    assert_eq!(tracker.fraction(), 0.5);
}

#[test]
fn test_cancel_handle_is_shared() {
    let handle = CancelHandle::new();
    let tracker = ProgressTracker::with_cancel_handle(handle.clone());
    assert!(tracker.check_cancelled().is_ok());

    handle.cancel();
    assert!(tracker.is_cancelled());
    assert_eq!(tracker.child(1.0).check_cancelled(), Err(Interrupted));
}

#[test]
fn test_sleepy_operation_reports_progress() {
    let registry = create_registry();
    let sleepy = registry.get("sleepy").unwrap();
    let tracker = ProgressTracker::new();

    let mut inputs = Inputs::new();
    inputs.insert("ticks".to_string(), json!(4));
    assert_eq!(sleepy.invoke(&inputs, &tracker).unwrap(), json!(4));
    assert_eq!(tracker.label(), "sleeping");
    assert_eq!(tracker.fraction(), 1.0);
    assert!(tracker.is_done());

    tracker.cancel_handle().cancel();
    let error = sleepy.invoke(&inputs, &tracker).unwrap_err();
    assert!(error.is::<Interrupted>());
}

#[test]
fn test_interruption_is_seen_through_nested_workflows() {
    let nested = InvocationError::SubWorkflow {
        node_id: "outer".to_string(),
        source: Box::new(InvocationError::SubWorkflow {
            node_id: "middle".to_string(),
            source: Box::new(InvocationError::Interrupted {
                node_id: "leaf".to_string(),
            }),
        }),
    };
    assert!(nested.is_interrupted());
    assert!(WorkflowError::Invocation(nested).is_interrupted());

    let failed = InvocationError::OutputMismatch {
        node_id: "leaf".to_string(),
        message: "unknown output 'x'".to_string(),
    };
    assert!(!failed.is_interrupted());
}
