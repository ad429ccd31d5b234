use crate::error::SyntaxError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Number(f64),
    Text(String),
    Ident(String),
    Symbol(&'static str),
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Text(s) => write!(f, "string '{}'", s),
            TokenKind::Ident(name) => write!(f, "'{}'", name),
            TokenKind::Symbol(symbol) => write!(f, "'{}'", symbol),
            TokenKind::End => write!(f, "end of expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

// Longest symbols first so that "<=" wins over "<".
const SYMBOLS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "(", ")", "[",
    "]", "{", "}", ",", ":", ".",
];

/// Splits expression source text into tokens, always terminated by `TokenKind::End`.
pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() {
            let rest = &source[offset..];
            let len = number_length(rest);
            let literal = &rest[..len];
            let number = literal
                .parse::<f64>()
                .map_err(|_| SyntaxError::UnexpectedCharacter { found: c, offset })?;
            tokens.push(Token {
                kind: TokenKind::Number(number),
                offset,
            });
            while chars.peek().is_some_and(|&(i, _)| i < offset + len) {
                chars.next();
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut name = String::new();
            while let Some(&(_, ch)) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(name),
                offset,
            });
            continue;
        }

        if c == '\'' || c == '"' {
            chars.next();
            let mut text = String::new();
            let mut terminated = false;
            while let Some((_, ch)) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    ch if ch == c => {
                        terminated = true;
                        break;
                    }
                    ch => text.push(ch),
                }
            }
            if !terminated {
                return Err(SyntaxError::UnterminatedString { offset });
            }
            tokens.push(Token {
                kind: TokenKind::Text(text),
                offset,
            });
            continue;
        }

        let rest = &source[offset..];
        let symbol = SYMBOLS
            .iter()
            .find(|symbol| rest.starts_with(**symbol))
            .ok_or(SyntaxError::UnexpectedCharacter { found: c, offset })?;
        for _ in 0..symbol.len() {
            chars.next();
        }
        tokens.push(Token {
            kind: TokenKind::Symbol(symbol),
            offset,
        });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset: source.len(),
    });
    Ok(tokens)
}

/// Length in bytes of the numeric literal at the start of `text`.
fn number_length(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = digits(0);
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end = digits(end + 1);
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = digits(exp);
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn splits_operators_and_operands() {
        assert_eq!(
            kinds("x <= 2.5e1"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Symbol("<="),
                TokenKind::Number(25.0),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn member_access_after_integer_is_not_a_fraction() {
        assert_eq!(
            kinds("1.x"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Symbol("."),
                TokenKind::Ident("x".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn reports_unterminated_strings() {
        assert_eq!(
            tokenize("'abc"),
            Err(SyntaxError::UnterminatedString { offset: 0 })
        );
    }
}
