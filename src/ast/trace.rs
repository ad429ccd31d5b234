use super::Value;

/// A record of how an expression was evaluated, including intermediate values.
#[derive(Debug, Clone)]
pub enum EvaluationTrace {
    BinaryOp {
        op_symbol: &'static str,
        left: Box<EvaluationTrace>,
        right: Box<EvaluationTrace>,
        outcome: Value,
    },
    UnaryOp {
        op_symbol: &'static str,
        child: Box<EvaluationTrace>,
        outcome: Value,
    },
    Call {
        function: &'static str,
        args: Vec<EvaluationTrace>,
        outcome: Value,
    },
    Access {
        target: Box<EvaluationTrace>,
        accessor: String,
        outcome: Value,
    },
    Leaf {
        source: String,
        value: Value,
    },
    NotEvaluated,
}

impl EvaluationTrace {
    pub fn get_outcome(&self) -> Value {
        match self {
            EvaluationTrace::BinaryOp { outcome, .. }
            | EvaluationTrace::UnaryOp { outcome, .. }
            | EvaluationTrace::Call { outcome, .. }
            | EvaluationTrace::Access { outcome, .. } => outcome.clone(),
            EvaluationTrace::Leaf { value, .. } => value.clone(),
            EvaluationTrace::NotEvaluated => Value::Null,
        }
    }

    /// Consumes the trace and returns its outcome without cloning.
    pub fn into_outcome(self) -> Value {
        match self {
            EvaluationTrace::BinaryOp { outcome, .. }
            | EvaluationTrace::UnaryOp { outcome, .. }
            | EvaluationTrace::Call { outcome, .. }
            | EvaluationTrace::Access { outcome, .. } => outcome,
            EvaluationTrace::Leaf { value, .. } => value,
            EvaluationTrace::NotEvaluated => Value::Null,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            EvaluationTrace::BinaryOp { op_symbol, .. } => match *op_symbol {
                "or" => 1,
                "xor" => 2,
                "and" => 3,
                "==" | "!=" | ">" | ">=" | "<" | "<=" => 5,
                "+" | "-" => 6,
                "*" | "/" | "%" => 7,
                _ => 0,
            },
            EvaluationTrace::UnaryOp { op_symbol, .. } => match *op_symbol {
                "not" => 4,
                _ => 8,
            },
            EvaluationTrace::Call { .. }
            | EvaluationTrace::Access { .. }
            | EvaluationTrace::Leaf { .. }
            | EvaluationTrace::NotEvaluated => 9,
        }
    }
}
