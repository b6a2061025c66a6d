use super::lexer::{Token, TokenKind};
use crate::common::NonEmpty;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("error at position {} ({slice:?}): {kind}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub slice: String,
}

impl ParseError {
    pub(crate) fn at(token: &Token<'_>, kind: ParseErrorKind) -> Self {
        Self {
            kind,
            span: token.span.clone(),
            slice: token.slice.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken {
        found: TokenKind,
        expected: NonEmpty<TokenKind>,
    },
    UnknownInput,
    IntegerTooLarge,
    InvalidDice(String),
    InvalidModifier(String),
    ModifierWithoutDice,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token: found {}, expected ", found)?;
                fmt_expected(expected, f)
            }
            Self::UnknownInput => f.write_str("unrecognized input"),
            Self::IntegerTooLarge => f.write_str("integer literal is too large"),
            Self::InvalidDice(s) => write!(f, "expected 'd' or 'dF' after a roll count, found {:?}", s),
            Self::InvalidModifier(s) => write!(f, "{:?} is not a dice modifier", s),
            Self::ModifierWithoutDice => f.write_str("modifiers can only be applied to dice"),
        }
    }
}

fn fmt_expected(expected: &[TokenKind], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expected {
        [] => Ok(()),
        [a] => f.write_str(a.as_str()),
        [a, b] => write!(f, "{} or {}", a, b),
        [init @ .., last] => {
            for exp in init {
                write!(f, "{}, ", exp)?;
            }
            write!(f, "or {}", last)
        }
    }
}
