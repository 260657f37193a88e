use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Whole-expression precheck. Anything outside this alphabet is rejected
/// before tokenization so the input can never reach name resolution or any
/// capability beyond plain arithmetic.
static ALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-*/().^√]+$").expect("valid allowed-charset regex"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("square root of a negative number")]
    NegativeSqrt,
}

/// Evaluate a single arithmetic expression.
///
/// Supported: `+ - * /`, `^` (right-associative power), unary minus,
/// parentheses, and `√` over a numeric literal. Pure; returns the raw `f64`
/// with no rounding or display formatting.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let compact: String = expression
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();

    if !ALLOWED.is_match(&compact) {
        return Err(EvalError::InvalidExpression(
            "disallowed characters".to_string(),
        ));
    }

    let tokens = tokenize(&compact)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;

    if parser.pos != parser.tokens.len() {
        return Err(EvalError::InvalidExpression(
            "trailing input after expression".to_string(),
        ));
    }

    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Sqrt,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '^' => tokens.push(Token::Caret),
            '√' => tokens.push(Token::Sqrt),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    i += 1;
                    let fraction_start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i == fraction_start {
                        return Err(EvalError::InvalidExpression(
                            "number ends with a bare decimal point".to_string(),
                        ));
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| {
                    EvalError::InvalidExpression(format!("malformed number: {literal}"))
                })?;
                tokens.push(Token::Num(value));
                continue;
            }
            '.' => {
                return Err(EvalError::InvalidExpression(
                    "number must start with a digit".to_string(),
                ));
            }
            other => {
                return Err(EvalError::InvalidExpression(format!(
                    "unexpected character: {other}"
                )));
            }
        }
        i += 1;
    }

    if tokens.is_empty() {
        return Err(EvalError::InvalidExpression("empty expression".to_string()));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        if self.peek() == Some(Token::Minus) {
            self.pos += 1;
            return Ok(-self.factor()?);
        }

        self.power()
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;

        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            // Right-associative; the exponent may itself be signed or a power.
            let exponent = self.factor()?;
            return Ok(base.powf(exponent));
        }

        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                if self.advance() != Some(Token::RParen) {
                    return Err(EvalError::InvalidExpression(
                        "missing closing parenthesis".to_string(),
                    ));
                }
                Ok(value)
            }
            Some(Token::Sqrt) => self.sqrt_operand(),
            Some(_) => Err(EvalError::InvalidExpression(
                "operator where a value was expected".to_string(),
            )),
            None => Err(EvalError::InvalidExpression(
                "expression ends where a value was expected".to_string(),
            )),
        }
    }

    /// `√` takes a numeric literal (optionally signed) only; `√(expr)` is
    /// outside the recognized shape and rejected outright.
    fn sqrt_operand(&mut self) -> Result<f64, EvalError> {
        let negative = if self.peek() == Some(Token::Minus) {
            self.pos += 1;
            true
        } else {
            false
        };

        match self.advance() {
            Some(Token::Num(value)) => {
                let operand = if negative { -value } else { value };
                if operand < 0.0 {
                    return Err(EvalError::NegativeSqrt);
                }
                Ok(operand.sqrt())
            }
            _ => Err(EvalError::InvalidExpression(
                "square root requires a numeric operand".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_basic_arithmetic() {
        assert_eq!(evaluate("2+2"), Ok(4.0));
        assert_eq!(evaluate("15 * 23"), Ok(345.0));
        assert_eq!(evaluate("10 - 4 / 2"), Ok(8.0));
        assert_eq!(evaluate("(10 - 4) / 2"), Ok(3.0));
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2^3"), Ok(8.0));
        assert_eq!(evaluate("2^3^2"), Ok(512.0));
        assert_eq!(evaluate("2^-2"), Ok(0.25));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert_eq!(evaluate("-2^2"), Ok(-4.0));
        assert_eq!(evaluate("-3 + 5"), Ok(2.0));
    }

    #[test]
    fn square_root_of_literal() {
        assert_eq!(evaluate("√9"), Ok(3.0));
        assert_eq!(evaluate("√2.25"), Ok(1.5));
    }

    #[test]
    fn square_root_of_negative_is_rejected() {
        assert_eq!(evaluate("√-4"), Err(EvalError::NegativeSqrt));
    }

    #[test]
    fn square_root_of_subexpression_is_rejected() {
        assert!(matches!(
            evaluate("√(4+5)"),
            Err(EvalError::InvalidExpression(_))
        ));
    }

    #[test]
    fn division_by_zero_is_rejected() {
        assert_eq!(evaluate("10/0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn foreign_characters_fail_the_precheck() {
        assert!(matches!(
            evaluate("2;import os"),
            Err(EvalError::InvalidExpression(_))
        ));
        assert!(matches!(
            evaluate("exp(1)"),
            Err(EvalError::InvalidExpression(_))
        ));
        assert!(matches!(
            evaluate(""),
            Err(EvalError::InvalidExpression(_))
        ));
    }

    #[test]
    fn malformed_structure_is_rejected() {
        assert!(matches!(
            evaluate("2++"),
            Err(EvalError::InvalidExpression(_))
        ));
        assert!(matches!(
            evaluate("(2+3"),
            Err(EvalError::InvalidExpression(_))
        ));
        assert!(matches!(
            evaluate("2.3.4"),
            Err(EvalError::InvalidExpression(_))
        ));
    }

    #[test]
    fn evaluation_is_pure_and_repeatable() {
        for _ in 0..3 {
            assert_eq!(evaluate("2+2"), Ok(4.0));
        }
    }
}
