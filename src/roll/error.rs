use crate::parse::ast::NodeKind;
use thiserror::Error;

/// A tree the interpreter cannot evaluate. Aborts the current `interpret` call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{kind} node requires {expected} children, found {found}")]
    ChildCount {
        kind: NodeKind,
        expected: usize,
        found: usize,
    },
    #[error("{0} node has no value")]
    MissingValue(NodeKind),
    #[error("{kind} node is missing its {key:?} attribute")]
    MissingAttribute { kind: NodeKind, key: &'static str },
    #[error("{0} has no dice to modify")]
    MissingDice(NodeKind),
    #[error("{0} is not a comparison")]
    NotAComparison(NodeKind),
    #[error("{0} is not a modifier")]
    NotAModifier(NodeKind),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid arguments to {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}
