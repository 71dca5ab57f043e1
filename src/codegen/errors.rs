use thiserror::Error;

use crate::ir::Span;

/// A failure reported by the host builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("no function is open")]
    NoFunction,
    #[error("a function is already open")]
    FunctionOpen,
    #[error("no insertion block is set")]
    NoInsertionPoint,
    #[error("unknown host value {0}")]
    UnknownValue(usize),
    #[error("unknown host block {0}")]
    UnknownBlock(usize),
    #[error("{0}")]
    Rejected(String),
}

/// Lowering of one function failed. Whatever the host built for it is discarded.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("lowering @{function} failed at '{op}': {kind}")]
pub struct LoweringError {
    pub function: String,
    pub op: &'static str,
    pub span: Option<Span>,
    pub kind: LoweringErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoweringErrorKind {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("operand #{index} is used before it is lowered")]
    UnmappedValue { index: usize },
    #[error("has no typed result")]
    MissingResult,
    #[error("successor targets ^bb{0}, which doesn't exist")]
    UnknownBlock(usize),
    #[error("missing or malformed attribute '{0}'")]
    Attribute(&'static str),
    #[error("has no lowering inside a function")]
    NotLowerable,
    #[error("lowering thread panicked")]
    Panicked,
}
