use crate::ast::{Expression, Value};
use crate::error::EvaluationError;
use crate::trace::TraceFormatter;
use indexmap::IndexMap;

mod engine;

use engine::AstEngine;

/// The result of an evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// The value the expression produced.
    pub value: Value,
    /// A human-readable explanation of how the value was obtained.
    pub reason: String,
}

/// Evaluates a compiled expression against named input bindings.
///
/// An `Evaluator` is created once per expression step and reused for every invocation; it holds
/// no per-run state.
#[derive(Debug, Clone)]
pub struct Evaluator {
    expression: Expression,
}

impl Evaluator {
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluates the expression.
    ///
    /// # Arguments
    ///
    /// * `bindings`: the values visible to the expression, keyed by input name.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationResult)`: the produced value together with a formatted trace.
    /// * `Err(EvaluationError)`: on a type mismatch, an unbound name, a division by zero or a
    ///   failed member/index access.
    pub fn eval(
        &self,
        bindings: &IndexMap<String, Value>,
    ) -> Result<EvaluationResult, EvaluationError> {
        let trace = AstEngine::new(&self.expression, bindings).evaluate()?;
        let reason = TraceFormatter::format_trace(&trace);
        Ok(EvaluationResult {
            value: trace.into_outcome(),
            reason,
        })
    }
}
