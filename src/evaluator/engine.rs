use crate::ast::{EvaluationTrace, Expression, Function, Value};
use crate::error::EvaluationError;
use indexmap::IndexMap;
use std::cmp::Ordering;

// This macro generates a match arm for a binary operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, number) => {
        $self.eval_binary($l, $r, $op_str, $op_fn)
    };
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, ordering) => {
        $self.eval_comparison($l, $r, $op_str, $op_fn)
    };
}

/// The core recursive engine for evaluating a single AST against a fixed set of bindings.
pub(super) struct AstEngine<'a> {
    expression: &'a Expression,
    bindings: &'a IndexMap<String, Value>,
}

impl<'a> AstEngine<'a> {
    pub(super) fn new(expression: &'a Expression, bindings: &'a IndexMap<String, Value>) -> Self {
        Self {
            expression,
            bindings,
        }
    }

    /// Evaluates the AST and returns a trace of the execution.
    pub(super) fn evaluate(&self) -> Result<EvaluationTrace, EvaluationError> {
        self.evaluate_recursive(self.expression)
    }

    fn evaluate_recursive(&self, expr: &Expression) -> Result<EvaluationTrace, EvaluationError> {
        match expr {
            // --- Arithmetic Operations ---
            Expression::Sum(l, r) => self.eval_sum(l, r),
            Expression::Subtract(l, r) => eval_op!(self, l, r, "-", |a, b| Ok(a - b), number),
            Expression::Multiply(l, r) => eval_op!(self, l, r, "*", |a, b| Ok(a * b), number),
            Expression::Divide(l, r) => eval_op!(self, l, r, "/", checked(|a, b| a / b), number),
            Expression::Modulo(l, r) => {
                eval_op!(self, l, r, "%", checked(|a: f64, b: f64| a.rem_euclid(b)), number)
            }
            Expression::Negate(v) => {
                let child_trace = self.evaluate_recursive(v)?;
                let outcome = match child_trace.get_outcome() {
                    Value::Number(val) => Value::Number(-val),
                    val => return Err(self.type_mismatch("-", "Number", val)),
                };
                Ok(EvaluationTrace::UnaryOp {
                    op_symbol: "-",
                    child: Box::new(child_trace),
                    outcome,
                })
            }

            // --- Comparison Operations ---
            Expression::GreaterThan(l, r) => eval_op!(self, l, r, ">", Ordering::is_gt, ordering),
            Expression::SmallerThan(l, r) => eval_op!(self, l, r, "<", Ordering::is_lt, ordering),
            Expression::GreaterThanOrEqual(l, r) => {
                eval_op!(self, l, r, ">=", Ordering::is_ge, ordering)
            }
            Expression::SmallerThanOrEqual(l, r) => {
                eval_op!(self, l, r, "<=", Ordering::is_le, ordering)
            }

            // --- Equality ---
            Expression::Equal(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(left_trace.get_outcome() == right_trace.get_outcome());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "==",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::NotEqual(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = Value::Bool(left_trace.get_outcome() != right_trace.get_outcome());
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "!=",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }

            // --- Logical Operations ---
            Expression::And(l, r) => self.eval_short_circuit(l, r, "and", false),
            Expression::Or(l, r) => self.eval_short_circuit(l, r, "or", true),
            Expression::Xor(l, r) => {
                let left_trace = self.evaluate_recursive(l)?;
                let right_trace = self.evaluate_recursive(r)?;
                let outcome = match (left_trace.get_outcome(), right_trace.get_outcome()) {
                    (Value::Bool(lv), Value::Bool(rv)) => Value::Bool(lv ^ rv),
                    (Value::Bool(_), r_val) => return Err(self.type_mismatch("xor", "Bool", r_val)),
                    (l_val, _) => return Err(self.type_mismatch("xor", "Bool", l_val)),
                };
                Ok(EvaluationTrace::BinaryOp {
                    op_symbol: "xor",
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                })
            }
            Expression::Not(v) => {
                let child_trace = self.evaluate_recursive(v)?;
                let outcome = match child_trace.get_outcome() {
                    Value::Bool(b) => Value::Bool(!b),
                    val => return Err(self.type_mismatch("not", "Bool", val)),
                };
                Ok(EvaluationTrace::UnaryOp {
                    op_symbol: "not",
                    child: Box::new(child_trace),
                    outcome,
                })
            }

            // --- Structure ---
            Expression::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate_recursive(item).map(EvaluationTrace::into_outcome))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = Value::List(values);
                Ok(EvaluationTrace::Leaf {
                    source: value.to_string(),
                    value,
                })
            }
            Expression::Record(fields) => {
                let values = fields
                    .iter()
                    .map(|(name, field)| {
                        self.evaluate_recursive(field)
                            .map(|trace| (name.clone(), trace.into_outcome()))
                    })
                    .collect::<Result<IndexMap<_, _>, _>>()?;
                let value = Value::Record(values);
                Ok(EvaluationTrace::Leaf {
                    source: value.to_string(),
                    value,
                })
            }
            Expression::Member(target, field) => {
                let target_trace = self.evaluate_recursive(target)?;
                let outcome = match target_trace.get_outcome() {
                    Value::Record(mut fields) => fields
                        .shift_remove(field)
                        .ok_or_else(|| EvaluationError::MissingField(field.clone()))?,
                    val => return Err(self.type_mismatch(".", "Record", val)),
                };
                Ok(EvaluationTrace::Access {
                    target: Box::new(target_trace),
                    accessor: format!(".{}", field),
                    outcome,
                })
            }
            Expression::Index(target, index) => {
                let target_trace = self.evaluate_recursive(target)?;
                let index_trace = self.evaluate_recursive(index)?;
                let index_value = index_trace.into_outcome();
                let accessor = format!("[{}]", index_value);
                let outcome = self.index(target_trace.get_outcome(), index_value)?;
                Ok(EvaluationTrace::Access {
                    target: Box::new(target_trace),
                    accessor,
                    outcome,
                })
            }
            Expression::Call(function, args) => self.eval_call(*function, args),

            // --- Leaves ---
            Expression::Literal(v) => Ok(EvaluationTrace::Leaf {
                source: v.to_string(),
                value: v.clone(),
            }),
            Expression::Input(name) => {
                let value = self
                    .bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvaluationError::UnknownName(name.clone()))?;
                Ok(EvaluationTrace::Leaf {
                    source: format!("${}", name),
                    value,
                })
            }
        }
    }

    fn eval_binary(
        &self,
        l: &Expression,
        r: &Expression,
        op_symbol: &'static str,
        op_fn: impl Fn(f64, f64) -> Result<f64, EvaluationError>,
    ) -> Result<EvaluationTrace, EvaluationError> {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => Value::Number(op_fn(lv, rv)?),
            (Value::Number(_), r_val) => return Err(self.type_mismatch(op_symbol, "Number", r_val)),
            (l_val, _) => return Err(self.type_mismatch(op_symbol, "Number", l_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn eval_sum(&self, l: &Expression, r: &Expression) -> Result<EvaluationTrace, EvaluationError> {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => Value::Number(lv + rv),
            (Value::Text(lv), Value::Text(rv)) => Value::Text(lv + &rv),
            (Value::List(mut lv), Value::List(rv)) => {
                lv.extend(rv);
                Value::List(lv)
            }
            (Value::Number(_), r_val) => return Err(self.type_mismatch("+", "Number", r_val)),
            (Value::Text(_), r_val) => return Err(self.type_mismatch("+", "Text", r_val)),
            (Value::List(_), r_val) => return Err(self.type_mismatch("+", "List", r_val)),
            (l_val, _) => return Err(self.type_mismatch("+", "Number, Text or List", l_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol: "+",
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn eval_comparison(
        &self,
        l: &Expression,
        r: &Expression,
        op_symbol: &'static str,
        accept: fn(Ordering) -> bool,
    ) -> Result<EvaluationTrace, EvaluationError> {
        let left_trace = self.evaluate_recursive(l)?;
        let right_trace = self.evaluate_recursive(r)?;
        let ordering = match (left_trace.get_outcome(), right_trace.get_outcome()) {
            (Value::Number(lv), Value::Number(rv)) => lv.partial_cmp(&rv),
            (Value::Text(lv), Value::Text(rv)) => Some(lv.cmp(&rv)),
            (Value::Number(_), r_val) => return Err(self.type_mismatch(op_symbol, "Number", r_val)),
            (Value::Text(_), r_val) => return Err(self.type_mismatch(op_symbol, "Text", r_val)),
            (l_val, _) => return Err(self.type_mismatch(op_symbol, "Number or Text", l_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            // NaN compares false against everything.
            outcome: Value::Bool(ordering.is_some_and(accept)),
        })
    }

    fn eval_short_circuit(
        &self,
        l: &Expression,
        r: &Expression,
        op_symbol: &'static str,
        decisive: bool,
    ) -> Result<EvaluationTrace, EvaluationError> {
        let left_trace = self.evaluate_recursive(l)?;
        match left_trace.get_outcome() {
            Value::Bool(lv) if lv == decisive => {
                return Ok(EvaluationTrace::BinaryOp {
                    op_symbol,
                    left: Box::new(left_trace),
                    right: Box::new(EvaluationTrace::NotEvaluated),
                    outcome: Value::Bool(decisive),
                });
            }
            Value::Bool(_) => {}
            l_val => return Err(self.type_mismatch(op_symbol, "Bool", l_val)),
        }
        let right_trace = self.evaluate_recursive(r)?;
        let outcome = match right_trace.get_outcome() {
            Value::Bool(rv) => Value::Bool(rv),
            r_val => return Err(self.type_mismatch(op_symbol, "Bool", r_val)),
        };
        Ok(EvaluationTrace::BinaryOp {
            op_symbol,
            left: Box::new(left_trace),
            right: Box::new(right_trace),
            outcome,
        })
    }

    fn eval_call(
        &self,
        function: Function,
        args: &[Expression],
    ) -> Result<EvaluationTrace, EvaluationError> {
        let traces = args
            .iter()
            .map(|arg| self.evaluate_recursive(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let values: Vec<Value> = traces.iter().map(EvaluationTrace::get_outcome).collect();

        let outcome = match (function, values.as_slice()) {
            (Function::Abs, [Value::Number(n)]) => Value::Number(n.abs()),
            (Function::Abs, [other]) => return Err(self.type_mismatch("abs", "Number", other.clone())),
            (Function::Min | Function::Max, [Value::List(items)]) => {
                self.extremum(function, items)?
            }
            (Function::Min | Function::Max, items) if !items.is_empty() => {
                self.extremum(function, items)?
            }
            _ => {
                return Err(EvaluationError::TypeMismatch {
                    operation: function.name().to_string(),
                    expected: "a valid argument list".to_string(),
                    found: Value::List(values.clone()),
                });
            }
        };
        Ok(EvaluationTrace::Call {
            function: function.name(),
            args: traces,
            outcome,
        })
    }

    fn extremum(&self, function: Function, items: &[Value]) -> Result<Value, EvaluationError> {
        let mut best: Option<f64> = None;
        for item in items {
            let n = match item {
                Value::Number(n) => *n,
                other => return Err(self.type_mismatch(function.name(), "Number", other.clone())),
            };
            best = Some(match (best, function) {
                (None, _) => n,
                (Some(b), Function::Min) => b.min(n),
                (Some(b), _) => b.max(n),
            });
        }
        best.map(Value::Number).ok_or_else(|| EvaluationError::TypeMismatch {
            operation: function.name().to_string(),
            expected: "a non-empty list".to_string(),
            found: Value::List(Vec::new()),
        })
    }

    fn index(&self, target: Value, index: Value) -> Result<Value, EvaluationError> {
        match (target, index) {
            (Value::List(mut items), Value::Number(n)) if n.fract() == 0.0 => {
                let len = items.len();
                let i = n as i64;
                let resolved = if i < 0 { i + len as i64 } else { i };
                if resolved < 0 || resolved as usize >= len {
                    return Err(EvaluationError::IndexOutOfBounds { index: i, len });
                }
                Ok(items.swap_remove(resolved as usize))
            }
            (Value::Record(mut fields), Value::Text(key)) => fields
                .shift_remove(&key)
                .ok_or(EvaluationError::MissingField(key)),
            (Value::List(_), other) => Err(self.type_mismatch("[]", "integral Number", other)),
            (Value::Record(_), other) => Err(self.type_mismatch("[]", "Text", other)),
            (other, _) => Err(self.type_mismatch("[]", "List or Record", other)),
        }
    }

    fn type_mismatch(&self, operation: &str, expected: &str, found: Value) -> EvaluationError {
        EvaluationError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}

/// Wraps a division-like operation so that a zero divisor becomes an error.
fn checked(op: impl Fn(f64, f64) -> f64) -> impl Fn(f64, f64) -> Result<f64, EvaluationError> {
    move |a, b| {
        if b == 0.0 {
            Err(EvaluationError::DivisionByZero)
        } else {
            Ok(op(a, b))
        }
    }
}
