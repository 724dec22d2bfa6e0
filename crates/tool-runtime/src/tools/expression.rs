//! Arithmetic-only expression evaluator for the calculator's `expression`
//! operation.
//!
//! Grammar:
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```
//! Identifiers, function calls and every other construct are rejected.
//! Division by zero yields 0, matching the calculator's `divide`.

const MAX_LEN: usize = 256;
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("expression longer than {MAX_LEN} characters")]
    TooLong,
    #[error("expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("unexpected character '{found}' at position {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

pub fn evaluate(input: &str) -> Result<f64, ExpressionError> {
    if input.len() > MAX_LEN {
        return Err(ExpressionError::TooLong);
    }
    let chars: Vec<char> = input.chars().collect();
    let mut parser = Parser {
        chars: &chars,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    if parser.peek().is_none() {
        return Err(ExpressionError::Empty);
    }
    let value = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(ExpressionError::Unexpected {
            found,
            pos: parser.pos,
        }),
    }
}

struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.factor()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    value = if divisor == 0.0 { 0.0 } else { value / divisor };
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        let result = self.factor_inner();
        self.depth -= 1;
        result
    }

    fn factor_inner(&mut self) -> Result<f64, ExpressionError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ExpressionError::UnexpectedEnd),
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_ws();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(found) => Err(ExpressionError::Unexpected {
                        found,
                        pos: self.pos,
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(found) => Err(ExpressionError::Unexpected {
                found,
                pos: self.pos,
            }),
        }
    }

    fn number(&mut self) -> Result<f64, ExpressionError> {
        let start = self.pos;
        // Thousands separators ("4,918") are common in model output.
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '_' || c == ',')
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
        cleaned
            .parse::<f64>()
            .map_err(|_| ExpressionError::InvalidNumber(raw))
    }
}
