use super::lexer::{Token, TokenKind};
use crate::ast::{Expression, Function, Value};
use crate::error::SyntaxError;

type BinaryConstructor = fn(Box<Expression>, Box<Expression>) -> Expression;

/// Binary operator levels, loosest first. `not` sits between `and` and comparisons.
const OR_LEVEL: &[(&str, BinaryConstructor)] = &[("or", Expression::Or), ("||", Expression::Or)];
const XOR_LEVEL: &[(&str, BinaryConstructor)] = &[("xor", Expression::Xor)];
const AND_LEVEL: &[(&str, BinaryConstructor)] =
    &[("and", Expression::And), ("&&", Expression::And)];
const COMPARISON_LEVEL: &[(&str, BinaryConstructor)] = &[
    ("==", Expression::Equal),
    ("!=", Expression::NotEqual),
    ("<=", Expression::SmallerThanOrEqual),
    (">=", Expression::GreaterThanOrEqual),
    ("<", Expression::SmallerThan),
    (">", Expression::GreaterThan),
];
const ADDITIVE_LEVEL: &[(&str, BinaryConstructor)] =
    &[("+", Expression::Sum), ("-", Expression::Subtract)];
const MULTIPLICATIVE_LEVEL: &[(&str, BinaryConstructor)] = &[
    ("*", Expression::Multiply),
    ("/", Expression::Divide),
    ("%", Expression::Modulo),
];

/// Deepest expression tree the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

const KEYWORDS: &[&str] = &[
    "and", "or", "xor", "not", "true", "false", "True", "False", "null", "None",
];

/// Recursive-descent parser over a token stream produced by the lexer.
pub(super) struct Parser {
    tokens: Vec<Token>,
    position: usize,
    // Recursion depth of the parse functions currently on the stack.
    depth: usize,
}

impl Parser {
    pub(super) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Parses a complete expression and requires that every token is consumed.
    pub(super) fn parse(mut self) -> Result<Expression, SyntaxError> {
        let expression = self.parse_or()?;
        self.check_depth(&expression)?;
        match self.peek() {
            TokenKind::End => Ok(expression),
            _ => Err(self.unexpected("end of expression")),
        }
    }

    fn parse_or(&mut self) -> Result<Expression, SyntaxError> {
        self.nested(|parser| parser.parse_level(OR_LEVEL, Self::parse_xor))
    }

    fn parse_xor(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_level(XOR_LEVEL, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_level(AND_LEVEL, Self::parse_not)
    }

    fn parse_not(&mut self) -> Result<Expression, SyntaxError> {
        if self.eat("not") || self.eat("!") {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expression::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_level(COMPARISON_LEVEL, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_level(ADDITIVE_LEVEL, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_level(MULTIPLICATIVE_LEVEL, Self::parse_unary)
    }

    /// Parses a left-associative chain of the operators in `level`.
    fn parse_level(
        &mut self,
        level: &[(&str, BinaryConstructor)],
        operand: fn(&mut Self) -> Result<Expression, SyntaxError>,
    ) -> Result<Expression, SyntaxError> {
        let mut left = operand(self)?;
        'chain: loop {
            for (op, constructor) in level {
                if self.eat(op) {
                    let right = operand(self)?;
                    left = constructor(Box::new(left), Box::new(right));
                    self.check_depth(&left)?;
                    continue 'chain;
                }
            }
            return Ok(left);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        if self.eat("-") {
            let operand = self.nested(Self::parse_unary)?;
            return Ok(match operand {
                Expression::Literal(Value::Number(n)) => Expression::Literal(Value::Number(-n)),
                other => Expression::Negate(Box::new(other)),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_primary()?;
        loop {
            if self.eat(".") {
                let field = self.expect_name("field name after '.'")?;
                expression = Expression::Member(Box::new(expression), field);
                self.check_depth(&expression)?;
            } else if self.eat("[") {
                let index = self.parse_or()?;
                self.expect("]")?;
                expression = Expression::Index(Box::new(expression), Box::new(index));
                self.check_depth(&expression)?;
            } else {
                return Ok(expression);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expression::Literal(Value::Number(n))),
            TokenKind::Text(s) => Ok(Expression::Literal(Value::Text(s))),
            TokenKind::Ident(name) => match name.as_str() {
                "true" | "True" => Ok(Expression::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expression::Literal(Value::Bool(false))),
                "null" | "None" => Ok(Expression::Literal(Value::Null)),
                keyword if KEYWORDS.contains(&keyword) => Err(SyntaxError::UnexpectedToken {
                    expected: "an operand".to_string(),
                    found: format!("'{}'", keyword),
                    offset: token.offset,
                }),
                _ if self.eat("(") => {
                    let function = Function::from_name(&name)
                        .ok_or_else(|| SyntaxError::UnknownFunction(name.clone()))?;
                    let args = self.parse_sequence(")")?;
                    Ok(Expression::Call(function, args))
                }
                _ => Ok(Expression::Input(name)),
            },
            TokenKind::Symbol("(") => {
                let inner = self.parse_or()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Symbol("[") => Ok(Expression::List(self.parse_sequence("]")?)),
            TokenKind::Symbol("{") => self.parse_record(),
            other => Err(SyntaxError::UnexpectedToken {
                expected: "an operand".to_string(),
                found: other.to_string(),
                offset: token.offset,
            }),
        }
    }

    /// Parses comma-separated expressions up to and including `close`.
    fn parse_sequence(&mut self, close: &str) -> Result<Vec<Expression>, SyntaxError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn parse_record(&mut self) -> Result<Expression, SyntaxError> {
        let mut fields = Vec::new();
        if self.eat("}") {
            return Ok(Expression::Record(fields));
        }
        loop {
            let key = match self.peek() {
                TokenKind::Text(s) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                _ => self.expect_name("record field name")?,
            };
            self.expect(":")?;
            fields.push((key, self.parse_or()?));
            if self.eat("}") {
                return Ok(Expression::Record(fields));
            }
            self.expect(",")?;
        }
    }

    /// Runs `parse` one recursion level deeper, failing once the nesting limit is exceeded.
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expression, SyntaxError>,
    ) -> Result<Expression, SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn check_depth(&self, expression: &Expression) -> Result<(), SyntaxError> {
        if expression.depth() > MAX_NESTING_DEPTH {
            Err(self.too_deep())
        } else {
            Ok(())
        }
    }

    fn too_deep(&self) -> SyntaxError {
        SyntaxError::TooDeep {
            limit: MAX_NESTING_DEPTH,
            offset: self.tokens[self.position.min(self.tokens.len() - 1)].offset,
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.position.min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.position.min(self.tokens.len() - 1)].clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// Consumes the current token if it is the given symbol or keyword.
    fn eat(&mut self, op: &str) -> bool {
        let matched = match self.peek() {
            TokenKind::Symbol(symbol) => *symbol == op,
            TokenKind::Ident(name) => name == op && KEYWORDS.contains(&op),
            _ => false,
        };
        if matched {
            self.advance();
        }
        matched
    }

    fn expect(&mut self, op: &str) -> Result<(), SyntaxError> {
        if self.eat(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = &self.tokens[self.position.min(self.tokens.len() - 1)];
        SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            offset: token.offset,
        }
    }
}
