//! Left-to-right arithmetic over generated token chains.
//!
//! Chains are reduced strictly in reading order with no operator precedence,
//! so `2 + 3 × 4` is `20`. Parentheses are not part of the grammar.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::model::Operator;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("expected a number at position {position}")]
    ExpectedNumber { position: usize },

    #[error("expected an operator at position {position}")]
    ExpectedOperator { position: usize },

    #[error("expression ends with an operator")]
    TrailingOperator,

    #[error("unrecognised token {token:?}")]
    UnknownToken { token: String },
}

/// One element of an operand/operator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Number(i64),
    Op(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Op(op) => write!(f, "{op}"),
        }
    }
}

/// Evaluate a chain, reporting malformed input.
///
/// # Errors
///
/// Returns `ExpressionError` when the tokens do not alternate number/operator
/// starting and ending with a number.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn try_evaluate(tokens: &[Token]) -> Result<i64, ExpressionError> {
    let Some((first, rest)) = tokens.split_first() else {
        return Err(ExpressionError::Empty);
    };
    let Token::Number(first) = *first else {
        return Err(ExpressionError::ExpectedNumber { position: 0 });
    };

    let mut result = first as f64;
    let mut position = 1;
    for pair in rest.chunks(2) {
        let op = match pair[0] {
            Token::Op(op) => op,
            Token::Number(_) => return Err(ExpressionError::ExpectedOperator { position }),
        };
        let rhs = match pair.get(1) {
            Some(Token::Number(n)) => *n,
            Some(Token::Op(_)) => {
                return Err(ExpressionError::ExpectedNumber {
                    position: position + 1,
                });
            }
            None => return Err(ExpressionError::TrailingOperator),
        };
        result = op.apply(result, rhs as f64);
        position += 2;
    }

    Ok(result.round_ties_even() as i64)
}

/// Evaluate a chain left to right; malformed input evaluates to 0.
#[must_use]
pub fn evaluate(tokens: &[Token]) -> i64 {
    try_evaluate(tokens).unwrap_or_else(|err| {
        debug!(%err, "malformed expression, falling back to 0");
        0
    })
}

/// A well-formed chain `n0 op1 n1 … opk nk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// Start a chain with its first operand.
    #[must_use]
    pub fn starting_with(first: i64) -> Self {
        Self {
            tokens: vec![Token::Number(first)],
        }
    }

    /// Append `op rhs` to the chain.
    pub fn push(&mut self, op: Operator, rhs: i64) {
        self.tokens.push(Token::Op(op));
        self.tokens.push(Token::Number(rhs));
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Most recently appended operand.
    #[must_use]
    pub fn last_operand(&self) -> i64 {
        self.tokens
            .iter()
            .rev()
            .find_map(|t| match t {
                Token::Number(n) => Some(*n),
                Token::Op(_) => None,
            })
            .unwrap_or(0)
    }

    #[must_use]
    pub fn operator_count(&self) -> usize {
        self.tokens.len() / 2
    }

    /// Left-to-right value of the chain.
    #[must_use]
    pub fn evaluate(&self) -> i64 {
        evaluate(&self.tokens)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Parses the display form produced by `Display`, e.g. `"12 + 3 × 4"`.
impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = Vec::new();
        for raw in s.split_whitespace() {
            let token = if let Some(op) = Operator::from_symbol(raw) {
                Token::Op(op)
            } else {
                raw.parse::<i64>()
                    .map(Token::Number)
                    .map_err(|_| ExpressionError::UnknownToken {
                        token: raw.to_string(),
                    })?
            };
            tokens.push(token);
        }
        try_evaluate(&tokens)?;
        Ok(Self { tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expression {
        s.parse().unwrap()
    }

    #[test]
    fn evaluates_left_to_right_without_precedence() {
        assert_eq!(parse("2 + 3 × 4").evaluate(), 20);
        assert_eq!(parse("10 - 4 ÷ 2").evaluate(), 3);
        assert_eq!(parse("7").evaluate(), 7);
    }

    #[test]
    fn division_uses_floating_point_and_rounds_at_the_end() {
        // 7 ÷ 2 = 3.5, × 3 = 10.5 → ties to even
        assert_eq!(parse("7 ÷ 2 × 3").evaluate(), 10);
        // 10 ÷ 4 = 2.5 → 2, but 10 ÷ 4 × 2 = 5 exactly
        assert_eq!(parse("10 ÷ 4").evaluate(), 2);
        assert_eq!(parse("10 ÷ 4 × 2").evaluate(), 5);
        assert_eq!(parse("11 ÷ 4").evaluate(), 3);
    }

    #[test]
    fn division_by_zero_keeps_running_result() {
        assert_eq!(parse("9 ÷ 0 + 1").evaluate(), 10);
    }

    #[test]
    fn negative_results_are_allowed() {
        assert_eq!(parse("3 - 10 × 2").evaluate(), -14);
    }

    #[test]
    fn malformed_input_falls_back_to_zero() {
        assert_eq!(evaluate(&[]), 0);
        assert_eq!(evaluate(&[Token::Op(Operator::Add)]), 0);
        assert_eq!(
            evaluate(&[Token::Number(4), Token::Op(Operator::Add)]),
            0
        );
        assert_eq!(
            try_evaluate(&[Token::Number(4), Token::Op(Operator::Add)]),
            Err(ExpressionError::TrailingOperator)
        );
        assert_eq!(
            try_evaluate(&[Token::Number(4), Token::Number(5)]),
            Err(ExpressionError::ExpectedOperator { position: 1 })
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let mut expr = Expression::starting_with(12);
        expr.push(Operator::Subtract, 3);
        expr.push(Operator::Multiply, 4);
        assert_eq!(expr.to_string(), "12 - 3 × 4");
        assert_eq!(parse(&expr.to_string()), expr);
        assert_eq!(expr.last_operand(), 4);
        assert_eq!(expr.operator_count(), 2);
    }

    #[test]
    fn parse_accepts_ascii_operators_and_rejects_garbage() {
        assert_eq!(parse("6 * 2 / 3").evaluate(), 4);
        assert!(matches!(
            "2 + two".parse::<Expression>(),
            Err(ExpressionError::UnknownToken { .. })
        ));
        assert!(matches!(
            "2 +".parse::<Expression>(),
            Err(ExpressionError::TrailingOperator)
        ));
    }
}
