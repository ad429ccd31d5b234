//! Compilation of step expression source text into an [`Expression`] tree.
//!
//! The language is deliberately small: literals, list and record constructors, names bound
//! to step inputs, member access, indexing, arithmetic, comparison, boolean logic and the
//! built-in functions `abs`, `min` and `max`. There is no way to reach anything other than
//! the bindings handed to the evaluator.

use crate::ast::Expression;
use crate::error::SyntaxError;

mod lexer;
mod parsing;

pub use parsing::MAX_NESTING_DEPTH;
use parsing::Parser;

/// Parses expression source text into an AST.
///
/// Trees deeper than [`MAX_NESTING_DEPTH`] are rejected with [`SyntaxError::TooDeep`].
///
/// # Example
///
/// ```rust
/// use stepgraph::compiler::compile;
///
/// let expression = compile("x + y * 2").unwrap();
/// assert_eq!(expression.input_names().len(), 2);
/// ```
pub fn compile(source: &str) -> Result<Expression, SyntaxError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens).parse()
}
