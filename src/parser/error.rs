use thiserror::Error;

use crate::catalog::CatalogError;
use crate::check::constraints::ConstraintViolation;
use crate::ir::{EnumKind, Span, Type};

use super::tokens::LexingError;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(span: Span, kind: ParseErrorKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("invalid token: {0:?}")]
    InvalidToken(LexingError),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unknown type {0:?}")]
    UnknownType(String),
    #[error("{found:?} is not a valid {}", .kind.name())]
    UnknownKeyword { kind: EnumKind, found: String },
    #[error("use of undefined value %{0}")]
    UndefinedValue(String),
    #[error("redefinition of value %{0}")]
    Redefinition(String),
    #[error("%{name} has type {found}, but is used as {expected}")]
    ValueTypeMismatch {
        name: String,
        expected: Type,
        found: Type,
    },
    #[error("reference to undefined block ^{0}")]
    UndefinedBlock(String),
    #[error("redefinition of block ^{0}")]
    DuplicateBlock(String),
    #[error("the entry block takes the function arguments and can't declare its own")]
    EntryBlockArguments,
    #[error("{found} result names given, the operation has {expected} results")]
    ResultCount { expected: usize, found: usize },
    #[error("{found} types given for {expected} values")]
    TypeCount { expected: usize, found: usize },
    #[error("expected {expected}, found {found}")]
    InvalidType { expected: &'static str, found: Type },
    #[error("position {position:?} is out of bounds of {ty}")]
    InvalidPosition { position: Vec<i64>, ty: Type },
    #[error("{0}")]
    InvalidLiteral(String),
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),
}

impl ParseErrorKind {
    /// Stable name of the error kind, used as the diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidToken(_) => "InvalidToken",
            ParseErrorKind::UnexpectedToken { .. } => "UnexpectedToken",
            ParseErrorKind::UnexpectedEof { .. } => "UnexpectedEof",
            ParseErrorKind::Catalog(_) => "UnknownMnemonic",
            ParseErrorKind::UnknownType(_) => "UnknownType",
            ParseErrorKind::UnknownKeyword { .. } => "UnknownKeyword",
            ParseErrorKind::UndefinedValue(_) => "UndefinedValue",
            ParseErrorKind::Redefinition(_) => "Redefinition",
            ParseErrorKind::ValueTypeMismatch { .. } => "ValueTypeMismatch",
            ParseErrorKind::UndefinedBlock(_) => "UndefinedBlock",
            ParseErrorKind::DuplicateBlock(_) => "DuplicateBlock",
            ParseErrorKind::EntryBlockArguments => "EntryBlockArguments",
            ParseErrorKind::ResultCount { .. } => "ResultCount",
            ParseErrorKind::TypeCount { .. } => "TypeCount",
            ParseErrorKind::InvalidType { .. } => "InvalidType",
            ParseErrorKind::InvalidPosition { .. } => "InvalidPosition",
            ParseErrorKind::InvalidLiteral(_) => "InvalidLiteral",
            ParseErrorKind::Constraint(_) => "ConstraintViolation",
        }
    }
}
