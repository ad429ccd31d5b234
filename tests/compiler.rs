//! Tests for expression compilation: tokenizing, precedence and syntax errors.
use stepgraph::ast::{Expression, Function, Value};
use stepgraph::compiler::{MAX_NESTING_DEPTH, compile};
use stepgraph::error::SyntaxError;

fn input(name: &str) -> Box<Expression> {
    Box::new(Expression::Input(name.to_string()))
}

fn number(n: f64) -> Box<Expression> {
    Box::new(Expression::Literal(Value::Number(n)))
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    assert_eq!(
        compile("1 + 2 * 3").unwrap(),
        Expression::Sum(number(1.0), Box::new(Expression::Multiply(number(2.0), number(3.0))))
    );
}

#[test]
fn test_binary_operators_are_left_associative() {
    assert_eq!(
        compile("a - b - c").unwrap(),
        Expression::Subtract(Box::new(Expression::Subtract(input("a"), input("b"))), input("c"))
    );
}

#[test]
fn test_not_binds_looser_than_comparison() {
    assert_eq!(
        compile("not a == b").unwrap(),
        Expression::Not(Box::new(Expression::Equal(input("a"), input("b"))))
    );
    assert_eq!(
        compile("a and !b").unwrap(),
        Expression::And(input("a"), Box::new(Expression::Not(input("b"))))
    );
}

#[test]
fn test_boolean_operator_precedence() {
    // or < xor < and
    assert_eq!(
        compile("a or b xor c and d").unwrap(),
        Expression::Or(
            input("a"),
            Box::new(Expression::Xor(
                input("b"),
                Box::new(Expression::And(input("c"), input("d")))
            ))
        )
    );
    assert_eq!(compile("a || b").unwrap(), compile("a or b").unwrap());
}

#[test]
fn test_negative_literals_fold() {
    assert_eq!(compile("-3").unwrap(), Expression::Literal(Value::Number(-3.0)));
    assert_eq!(compile("-x").unwrap(), Expression::Negate(input("x")));
}

#[test]
fn test_keyword_literals() {
    assert_eq!(compile("True").unwrap(), Expression::Literal(Value::Bool(true)));
    assert_eq!(compile("false").unwrap(), Expression::Literal(Value::Bool(false)));
    assert_eq!(compile("None").unwrap(), Expression::Literal(Value::Null));
    assert_eq!(
        compile("'it\\'s'").unwrap(),
        Expression::Literal(Value::Text("it's".to_string()))
    );
}

#[test]
fn test_records_and_lists() {
    assert_eq!(
        compile("{total: q, 'key': 1}").unwrap(),
        Expression::Record(vec![
            ("total".to_string(), Expression::Input("q".to_string())),
            ("key".to_string(), Expression::Literal(Value::Number(1.0))),
        ])
    );
    assert_eq!(
        compile("[1, x]").unwrap(),
        Expression::List(vec![
            Expression::Literal(Value::Number(1.0)),
            Expression::Input("x".to_string()),
        ])
    );
    assert_eq!(compile("[]").unwrap(), Expression::List(Vec::new()));
}

#[test]
fn test_member_and_index_access_chain() {
    assert_eq!(
        compile("items[0].name").unwrap(),
        Expression::Member(
            Box::new(Expression::Index(input("items"), number(0.0))),
            "name".to_string()
        )
    );
}

#[test]
fn test_function_calls() {
    assert_eq!(
        compile("max(a, 2)").unwrap(),
        Expression::Call(
            Function::Max,
            vec![Expression::Input("a".to_string()), Expression::Literal(Value::Number(2.0))]
        )
    );
    assert_eq!(
        compile("sqrt(4)"),
        Err(SyntaxError::UnknownFunction("sqrt".to_string()))
    );
}

#[test]
fn test_input_names_in_first_use_order() {
    let expression = compile("b + a * b + min(c)").unwrap();
    let names: Vec<String> = expression.input_names().into_iter().collect();
    assert_eq!(names, ["b", "a", "c"]);
}

#[test]
fn test_missing_operand() {
    assert_eq!(
        compile("1 +"),
        Err(SyntaxError::UnexpectedToken {
            expected: "an operand".to_string(),
            found: "end of expression".to_string(),
            offset: 3,
        })
    );
}

#[test]
fn test_keyword_is_not_an_operand() {
    assert!(matches!(
        compile("and"),
        Err(SyntaxError::UnexpectedToken { ref found, offset: 0, .. }) if found == "'and'"
    ));
}

#[test]
fn test_unbalanced_parentheses() {
    assert!(matches!(
        compile("(1 + 2"),
        Err(SyntaxError::UnexpectedToken { ref expected, .. }) if expected == "')'"
    ));
    assert!(matches!(
        compile("1 + 2)"),
        Err(SyntaxError::UnexpectedToken { ref expected, offset: 5, .. }) if expected == "end of expression"
    ));
}

#[test]
fn test_unexpected_character() {
    assert_eq!(
        compile("a $ b"),
        Err(SyntaxError::UnexpectedCharacter { found: '$', offset: 2 })
    );
}

#[test]
fn test_nesting_depth_is_limited() {
    let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    assert!(matches!(
        compile(&parens),
        Err(SyntaxError::TooDeep { limit: MAX_NESTING_DEPTH, .. })
    ));

    let negations = format!("{}true", "not ".repeat(10_000));
    assert!(matches!(compile(&negations), Err(SyntaxError::TooDeep { .. })));

    let chain = format!("{}1", "1 + ".repeat(10_000));
    assert!(matches!(compile(&chain), Err(SyntaxError::TooDeep { .. })));

    let accesses = format!("r{}", ".a".repeat(10_000));
    assert!(matches!(compile(&accesses), Err(SyntaxError::TooDeep { .. })));
}

#[test]
fn test_moderate_nesting_is_accepted() {
    let parens = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(compile(&parens).unwrap(), Expression::Literal(Value::Number(1.0)));

    let chain = format!("{}1", "1 + ".repeat(100));
    assert_eq!(compile(&chain).unwrap().depth(), 101);
    assert_eq!(compile("1 + 2 * 3").unwrap().depth(), 3);
}
