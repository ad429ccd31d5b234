use crate::ast::EvaluationTrace;
use itertools::Itertools;

/// Formats evaluation traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format an evaluation trace into a human-readable explanation.
    pub fn format_trace(trace: &EvaluationTrace) -> String {
        // Start the recursive formatting with the lowest possible parent precedence.
        Self::format_recursive(trace, 0)
    }

    /// Recursively formats the trace, adding parentheses only when necessary.
    fn format_recursive(trace: &EvaluationTrace, parent_precedence: u8) -> String {
        let current_precedence = trace.precedence();
        let needs_parens = current_precedence < parent_precedence;

        let mut result = String::new();
        if needs_parens {
            result.push('(');
        }

        match trace {
            EvaluationTrace::BinaryOp {
                op_symbol,
                left,
                right,
                ..
            } => {
                let left_str = Self::format_recursive(left, current_precedence);

                // Short-circuited operators only show the side that decided the result.
                if matches!(**right, EvaluationTrace::NotEvaluated) {
                    result.push_str(&left_str);
                } else {
                    // Left-associative: an equal-precedence right operand needs parentheses.
                    let right_str = Self::format_recursive(right, current_precedence + 1);
                    result.push_str(&format!("{} {} {}", left_str, op_symbol, right_str));
                }
            }
            EvaluationTrace::UnaryOp {
                op_symbol, child, ..
            } => {
                let child_str = Self::format_recursive(child, current_precedence);
                if *op_symbol == "-" {
                    result.push_str(&format!("-{}", child_str));
                } else {
                    result.push_str(&format!("{} {}", op_symbol, child_str));
                }
            }
            EvaluationTrace::Call { function, args, .. } => {
                let args_str = args
                    .iter()
                    .map(|arg| Self::format_recursive(arg, 0))
                    .join(", ");
                result.push_str(&format!("{}({})", function, args_str));
            }
            EvaluationTrace::Access {
                target, accessor, ..
            } => {
                let target_str = Self::format_recursive(target, current_precedence);
                result.push_str(&format!("{}{}", target_str, accessor));
            }
            EvaluationTrace::Leaf { source, value } => {
                let formatted_leaf = if source.starts_with('$') {
                    format!("{} (was {})", source, value)
                } else {
                    source.clone()
                };
                result.push_str(&formatted_leaf);
            }
            EvaluationTrace::NotEvaluated => {}
        }

        if needs_parens {
            result.push(')');
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;

    fn leaf(name: &str, value: f64) -> Box<EvaluationTrace> {
        Box::new(EvaluationTrace::Leaf {
            source: format!("${}", name),
            value: Value::Number(value),
        })
    }

    #[test]
    fn parenthesizes_looser_children() {
        let sum = EvaluationTrace::BinaryOp {
            op_symbol: "+",
            left: leaf("a", 1.0),
            right: leaf("b", 2.0),
            outcome: Value::Number(3.0),
        };
        let product = EvaluationTrace::BinaryOp {
            op_symbol: "*",
            left: Box::new(sum),
            right: leaf("c", 4.0),
            outcome: Value::Number(12.0),
        };
        assert_eq!(
            TraceFormatter::format_trace(&product),
            "($a (was 1) + $b (was 2)) * $c (was 4)"
        );
    }

    #[test]
    fn short_circuit_hides_right_side() {
        let trace = EvaluationTrace::BinaryOp {
            op_symbol: "or",
            left: Box::new(EvaluationTrace::Leaf {
                source: "true".to_string(),
                value: Value::Bool(true),
            }),
            right: Box::new(EvaluationTrace::NotEvaluated),
            outcome: Value::Bool(true),
        };
        assert_eq!(TraceFormatter::format_trace(&trace), "true");
    }
}
