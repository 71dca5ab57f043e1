use thiserror::Error;

use crate::ir::{Span, Type};

use super::constraints::{ConstraintViolation, ViolationKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolResolutionError {
    #[error("symbol @{name} is not declared in this module")]
    Unresolved { name: String },
    #[error("symbol @{name} is declared {count} times")]
    Ambiguous { name: String, count: usize },
}

/// A structural rule broken by an already constructed operation.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("'{op}' op {kind}")]
pub struct VerificationError {
    pub op: &'static str,
    pub span: Option<Span>,
    pub kind: VerifyErrorKind,
}

impl From<ConstraintViolation> for VerificationError {
    fn from(value: ConstraintViolation) -> Self {
        Self {
            op: value.op,
            span: None,
            kind: VerifyErrorKind::Constraint(value.kind),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifyErrorKind {
    #[error(transparent)]
    Constraint(#[from] ViolationKind),
    #[error(transparent)]
    Symbol(#[from] SymbolResolutionError),
    #[error("requires the same type for all operands and results")]
    NotSameType,
    #[error("{what} must be {expected}, found {found}")]
    TypeMismatch {
        what: String,
        expected: Type,
        found: Type,
    },
    #[error("expected {expected} successors, found {found}")]
    SuccessorCount { expected: usize, found: usize },
    #[error("successor #{successor} targets ^bb{block}, which doesn't exist")]
    UnknownBlock { successor: usize, block: usize },
    #[error("successor #{successor} targets the entry block")]
    EntryBlockSuccessor { successor: usize },
    #[error("successor #{successor} passes {found} values, the destination takes {expected}")]
    SuccessorOperandCount {
        successor: usize,
        expected: usize,
        found: usize,
    },
    #[error("block ^bb{block} is empty")]
    EmptyBlock { block: usize },
    #[error("block ^bb{block} doesn't end with a terminator")]
    MissingTerminator { block: usize },
    #[error("must be the last operation of its block")]
    TerminatorNotLast,
    #[error("has {found} operands, but may return at most one value")]
    ReturnArity { found: usize },
    #[error("returns {found} values, the function returns {expected}")]
    ReturnCount { expected: usize, found: usize },
    #[error("has {found} results, a call produces at most one")]
    CallResultArity { found: usize },
    #[error("callee @{name} is not a function")]
    CalleeNotFunction { name: String },
    #[error("indirect call needs a function pointer as first operand, found {}", display_type(.found))]
    IndirectCallee { found: Option<Type> },
    #[error("passes {found} arguments, the callee takes {}{expected}", at_least(.variadic))]
    CallArgumentCount {
        expected: usize,
        variadic: bool,
        found: usize,
    },
    #[error("has {found} results, the callee returns {expected}")]
    CallResultCount { expected: usize, found: usize },
    #[error("can't cast {from} to {to}: {reason}")]
    InvalidCast {
        from: Type,
        to: Type,
        reason: &'static str,
    },
    #[error("can't allocate values of type {0}")]
    InvalidAllocation(Type),
    #[error("index #{index} can't step into {ty}")]
    InvalidGepIndex { index: usize, ty: Type },
    #[error("index #{index} selects a struct field and must be a constant in range")]
    StructIndexNotConstant { index: usize },
    #[error("position {position:?} is out of bounds of {ty}")]
    InvalidPosition { position: Vec<i64>, ty: Type },
    #[error("mask element #{index} is {value}, not in [-1, {bound})")]
    ShuffleMaskIndex { index: usize, value: i64, bound: i64 },
    #[error("condition {condition} doesn't fit values of type {ty}")]
    SelectShape { condition: Type, ty: Type },
    #[error("initializer of type {found} doesn't match {expected}")]
    Initializer { expected: Type, found: Type },
    #[error("literal {value} doesn't fit in {ty}")]
    LiteralOutOfRange { value: String, ty: Type },
    #[error("shuffle mask has {0} elements, more than a vector can hold")]
    ShuffleMaskLength(usize),
    #[error("'function_type' must be a function type, found {0}")]
    NotAFunctionType(Type),
    #[error("entry block has {found} arguments, the signature has {expected}")]
    EntryArgumentCount { expected: usize, found: usize },
    #[error("can only appear at module scope")]
    NotAtModuleScope,
    #[error("can't appear at module scope")]
    AtModuleScope,
    #[error("operand #{index} uses a value defined outside the enclosing isolated region")]
    NotIsolated { index: usize },
    #[error("successor #{successor} passes a value defined outside the enclosing isolated region")]
    SuccessorNotIsolated { successor: usize },
}

fn at_least(variadic: &bool) -> &'static str {
    if *variadic { "at least " } else { "" }
}

fn display_type(ty: &Option<Type>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => "nothing".to_string(),
    }
}

impl VerifyErrorKind {
    pub fn mismatch(what: impl Into<String>, expected: &Type, found: &Type) -> Self {
        VerifyErrorKind::TypeMismatch {
            what: what.into(),
            expected: expected.clone(),
            found: found.clone(),
        }
    }
}
