//! Tests for expression evaluation and the human-readable traces it produces.
use indexmap::IndexMap;
use stepgraph::compiler::compile;
use stepgraph::prelude::*;

fn bindings(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn eval(
    source: &str,
    pairs: &[(&str, Value)],
) -> std::result::Result<EvaluationResult, EvaluationError> {
    let evaluator = Evaluator::new(compile(source).expect("expression should compile"));
    evaluator.eval(&bindings(pairs))
}

fn list(items: &[f64]) -> Value {
    Value::List(items.iter().copied().map(Value::Number).collect())
}

#[test]
fn test_arithmetic() {
    let result = eval("x * 2 + 1", &[("x", Value::Number(4.0))]).unwrap();
    assert_eq!(result.value, Value::Number(9.0));

    assert_eq!(eval("7 / 2", &[]).unwrap().value, Value::Number(3.5));
    assert_eq!(eval("-7 % 3", &[]).unwrap().value, Value::Number(2.0));
}

#[test]
fn test_sum_of_text_and_lists() {
    let result = eval("a + '!'", &[("a", Value::Text("hi".to_string()))]).unwrap();
    assert_eq!(result.value, Value::Text("hi!".to_string()));

    let result = eval("[1] + xs", &[("xs", list(&[2.0]))]).unwrap();
    assert_eq!(result.value, list(&[1.0, 2.0]));
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("'apple' < 'banana'", &[]).unwrap().value, Value::Bool(true));
    assert_eq!(eval("1 == 'a'", &[]).unwrap().value, Value::Bool(false));
    assert_eq!(
        eval("x >= 3", &[("x", Value::Number(3.0))]).unwrap().value,
        Value::Bool(true)
    );
    assert_eq!(eval("true xor true", &[]).unwrap().value, Value::Bool(false));
}

#[test]
fn test_short_circuit_skips_the_right_operand() {
    // `missing` is unbound, so evaluating it would fail.
    let result = eval("x > 1 or missing", &[("x", Value::Number(2.0))]).unwrap();
    assert_eq!(result.value, Value::Bool(true));
    assert_eq!(result.reason, "$x (was 2) > 1");

    let result = eval("x > 5 and missing", &[("x", Value::Number(2.0))]).unwrap();
    assert_eq!(result.value, Value::Bool(false));
}

#[test]
fn test_reason_adds_parentheses_where_needed() {
    let result = eval(
        "not (a and b)",
        &[("a", Value::Bool(true)), ("b", Value::Bool(false))],
    )
    .unwrap();
    assert_eq!(result.value, Value::Bool(true));
    assert_eq!(result.reason, "not ($a (was true) and $b (was false))");

    let result = eval("(x + 1) * 2", &[("x", Value::Number(3.0))]).unwrap();
    assert_eq!(result.reason, "($x (was 3) + 1) * 2");
}

#[test]
fn test_boolean_operators_require_bools() {
    assert!(matches!(
        eval("1 and true", &[]),
        Err(EvaluationError::TypeMismatch { ref operation, .. }) if operation == "and"
    ));
    assert!(matches!(
        eval("not 1", &[]),
        Err(EvaluationError::TypeMismatch { ref operation, .. }) if operation == "not"
    ));
}

#[test]
fn test_type_mismatch_in_arithmetic() {
    assert_eq!(
        eval("1 + true", &[]).unwrap_err(),
        EvaluationError::TypeMismatch {
            operation: "+".to_string(),
            expected: "Number".to_string(),
            found: Value::Bool(true),
        }
    );
}

#[test]
fn test_division_by_zero() {
    let x = [("x", Value::Number(1.0))];
    assert_eq!(eval("x / 0", &x).unwrap_err(), EvaluationError::DivisionByZero);
    assert_eq!(eval("x % 0", &x).unwrap_err(), EvaluationError::DivisionByZero);
}

#[test]
fn test_indexing() {
    let xs = [("xs", list(&[1.0, 2.0, 3.0]))];
    assert_eq!(eval("xs[0]", &xs).unwrap().value, Value::Number(1.0));
    assert_eq!(eval("xs[-1]", &xs).unwrap().value, Value::Number(3.0));
    assert_eq!(
        eval("xs[5]", &xs).unwrap_err(),
        EvaluationError::IndexOutOfBounds { index: 5, len: 3 }
    );
    assert!(matches!(
        eval("xs['a']", &xs),
        Err(EvaluationError::TypeMismatch { .. })
    ));
}

#[test]
fn test_record_access() {
    let mut fields = IndexMap::new();
    fields.insert("a".to_string(), Value::Number(1.0));
    let r = [("r", Value::Record(fields))];

    assert_eq!(eval("r.a", &r).unwrap().value, Value::Number(1.0));
    assert_eq!(eval("r['a']", &r).unwrap().value, Value::Number(1.0));
    assert_eq!(
        eval("r.b", &r).unwrap_err(),
        EvaluationError::MissingField("b".to_string())
    );

    let result = eval("r.a + 1", &r).unwrap();
    assert_eq!(result.reason, "$r (was {a: 1}).a + 1");
}

#[test]
fn test_unknown_name() {
    assert_eq!(
        eval("z + 1", &[]).unwrap_err(),
        EvaluationError::UnknownName("z".to_string())
    );
}

#[test]
fn test_builtin_functions() {
    assert_eq!(eval("min(3, 1, 2)", &[]).unwrap().value, Value::Number(1.0));
    assert_eq!(
        eval("max(xs)", &[("xs", list(&[4.0, 9.0, 2.0]))]).unwrap().value,
        Value::Number(9.0)
    );

    let result = eval("abs(x)", &[("x", Value::Number(-4.0))]).unwrap();
    assert_eq!(result.value, Value::Number(4.0));
    assert_eq!(result.reason, "abs($x (was -4))");

    assert!(matches!(eval("min()", &[]), Err(EvaluationError::TypeMismatch { .. })));
    assert!(matches!(eval("max([])", &[]), Err(EvaluationError::TypeMismatch { .. })));
}

#[test]
fn test_record_construction() {
    let result = eval("{total: q * 10, big: q > 2}", &[("q", Value::Number(3.0))]).unwrap();
    let mut expected = IndexMap::new();
    expected.insert("total".to_string(), Value::Number(30.0));
    expected.insert("big".to_string(), Value::Bool(true));
    assert_eq!(result.value, Value::Record(expected));
}

#[test]
fn test_evaluator_is_reusable() {
    let evaluator = Evaluator::new(compile("x * x").unwrap());
    let first = evaluator.eval(&bindings(&[("x", Value::Number(3.0))])).unwrap();
    let second = evaluator.eval(&bindings(&[("x", Value::Number(5.0))])).unwrap();
    assert_eq!(first.value, Value::Number(9.0));
    assert_eq!(second.value, Value::Number(25.0));
}
