// ============================================================
// Layer 3 — Arithmetic Expressions
// ============================================================
// An expression is a whitespace-separated infix token string:
//
//   ( 5 - ( -2 + 3 ) )
//
// Grammar (left-associative, + and - only):
//
//   expr := term ( op term )*
//   term := digit | "(" expr ")"
//
// Besides its value, an expression yields one target per token
// for each diagnostic task. The two intermediate-result targets
// follow the two strategies a left-to-right processor can use:
//
//   cumulative  — keep one running sum and a stack of signs;
//                 every digit is added immediately with the sign
//                 of its enclosing subtractions
//   recursive   — keep a stack of partial results; a bracketed
//                 subexpression is folded into its parent when
//                 it closes

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::domain::task::DiagnosticTask;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("'{0}' is neither a digit, an operator nor a bracket")]
    BadToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Token {
    Digit(i64),
    Plus,
    Minus,
    Open,
    Close,
}

impl Token {
    fn classify(s: &str) -> Result<Self, ExpressionError> {
        match s {
            "+" => Ok(Token::Plus),
            "-" => Ok(Token::Minus),
            "(" => Ok(Token::Open),
            ")" => Ok(Token::Close),
            other => other
                .parse::<i64>()
                .map(Token::Digit)
                .map_err(|_| ExpressionError::BadToken(other.to_string())),
        }
    }

    fn sign(self) -> i64 {
        if self == Token::Minus { -1 } else { 1 }
    }
}

/// A well-formed arithmetic expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    symbols: Vec<String>,
    tokens:  Vec<Token>,
    value:   i64,
}

impl Expression {
    /// Parse a whitespace-separated infix expression.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let symbols: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if symbols.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let tokens = symbols
            .iter()
            .map(|s| Token::classify(s))
            .collect::<Result<Vec<_>, _>>()?;

        let mut parser = Parser { tokens: &tokens, symbols: &symbols, pos: 0 };
        let value = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(ExpressionError::UnexpectedToken {
                token:    symbols[parser.pos].clone(),
                position: parser.pos,
            });
        }

        Ok(Self { symbols, tokens, value })
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// The expression's symbols, in order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Smallest and largest digit used, if any.
    pub fn digit_range(&self) -> Option<(i64, i64)> {
        let digits = self.tokens.iter().filter_map(|t| match t {
            Token::Digit(d) => Some(*d),
            _ => None,
        });
        digits.fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    pub fn compare(&self, other: &Expression) -> Ordering {
        self.value.cmp(&other.value)
    }

    /// One target per token for the given task.
    pub fn targets(&self, task: DiagnosticTask) -> Vec<f32> {
        match task {
            DiagnosticTask::IntermediateLocally => self
                .cumulative_trace()
                .into_iter()
                .map(|(result, _)| result as f32)
                .collect(),
            DiagnosticTask::Subtracting => self
                .cumulative_trace()
                .into_iter()
                .map(|(_, mode)| if mode < 0 { 1.0 } else { 0.0 })
                .collect(),
            DiagnosticTask::IntermediateRecursively => self.recursive_trace(),
            DiagnosticTask::Depth => self.depth_trace().into_iter().map(|d| d as f32).collect(),
            DiagnosticTask::Grammatical => self.grammatical_trace(),
            DiagnosticTask::Minus1Depth => self.minus_depth_trace(1),
            DiagnosticTask::Minus2Depth => self.minus_depth_trace(2),
            DiagnosticTask::Minus3Depth => self.minus_depth_trace(3),
            DiagnosticTask::Minus4Depth => self.minus_depth_trace(4),
        }
    }

    /// (running result, current sign) after every token.
    fn cumulative_trace(&self) -> Vec<(i64, i64)> {
        let mut result = 0i64;
        let mut mode = 1i64;
        let mut stack: Vec<i64> = Vec::new();

        self.tokens
            .iter()
            .map(|token| {
                match *token {
                    Token::Open => stack.push(mode),
                    Token::Close => mode = stack.pop().unwrap_or(1),
                    Token::Plus | Token::Minus => {
                        mode = token.sign() * stack.last().copied().unwrap_or(1)
                    }
                    Token::Digit(d) => result += mode * d,
                }
                (result, mode)
            })
            .collect()
    }

    fn recursive_trace(&self) -> Vec<f32> {
        let mut result = 0i64;
        let mut op = 1i64;
        let mut stack: Vec<(i64, i64)> = Vec::new();

        self.tokens
            .iter()
            .map(|token| {
                match *token {
                    Token::Open => {
                        stack.push((result, op));
                        result = 0;
                        op = 1;
                    }
                    Token::Close => {
                        let (outer, outer_op) = stack.pop().unwrap_or((0, 1));
                        result = outer + outer_op * result;
                    }
                    Token::Plus | Token::Minus => op = token.sign(),
                    Token::Digit(d) => result += op * d,
                }
                result as f32
            })
            .collect()
    }

    fn depth_trace(&self) -> Vec<usize> {
        let mut depth = 0usize;
        self.tokens
            .iter()
            .map(|token| {
                match token {
                    Token::Open => depth += 1,
                    Token::Close => depth = depth.saturating_sub(1),
                    _ => {}
                }
                depth
            })
            .collect()
    }

    fn grammatical_trace(&self) -> Vec<f32> {
        self.tokens
            .iter()
            .zip(self.depth_trace())
            .map(|(token, depth)| {
                let closes = matches!(token, Token::Digit(_) | Token::Close);
                if depth == 0 && closes { 1.0 } else { 0.0 }
            })
            .collect()
    }

    fn minus_depth_trace(&self, n: usize) -> Vec<f32> {
        // one flag per open bracket: was it opened right after a minus?
        let mut open: Vec<bool> = Vec::new();
        let mut previous: Option<Token> = None;

        self.tokens
            .iter()
            .map(|&token| {
                match token {
                    Token::Open => open.push(previous == Some(Token::Minus)),
                    Token::Close => {
                        open.pop();
                    }
                    _ => {}
                }
                previous = Some(token);
                let subtracted = open.iter().filter(|&&negated| negated).count();
                if subtracted >= n { 1.0 } else { 0.0 }
            })
            .collect()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbols.join(" "))
    }
}

impl std::str::FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

struct Parser<'a> {
    tokens:  &'a [Token],
    symbols: &'a [String],
    pos:     usize,
}

impl Parser<'_> {
    fn expr(&mut self) -> Result<i64, ExpressionError> {
        let mut value = self.term()?;
        while let Some(&token) = self.tokens.get(self.pos) {
            if !matches!(token, Token::Plus | Token::Minus) {
                break;
            }
            self.pos += 1;
            value += token.sign() * self.term()?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<i64, ExpressionError> {
        let token = *self.tokens.get(self.pos).ok_or(ExpressionError::UnexpectedEnd)?;
        match token {
            Token::Digit(d) => {
                self.pos += 1;
                Ok(d)
            }
            Token::Open => {
                self.pos += 1;
                let value = self.expr()?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(_) => Err(self.unexpected()),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            token:    self.symbols[self.pos].clone(),
            position: self.pos,
        }
    }
}
