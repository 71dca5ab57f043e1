use thiserror::Error;

/// The catalog itself is inconsistent. Raised while loading, fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("mnemonic {0:?} is registered twice")]
    DuplicateMnemonic(&'static str),
    #[error("opcode of {0:?} is registered twice")]
    DuplicateOpcode(&'static str),
    #[error("{op:?}: only the last {what} may be variadic, found one at index {index}")]
    VariadicNotLast {
        op: &'static str,
        what: &'static str,
        index: usize,
    },
    #[error("{op:?}: declares {count} results, at most one unless variadic")]
    TooManyResults { op: &'static str, count: usize },
    #[error("{op:?}: terminators can't have results")]
    TerminatorWithResults { op: &'static str },
    #[error("{op:?}: only terminators may declare successors")]
    SuccessorsOnNonTerminator { op: &'static str },
    #[error("{op:?}: terminators must declare their successors")]
    TerminatorWithoutSuccessors { op: &'static str },
    #[error("{op:?}: the default assembly format needs fixed operands and one result")]
    DefaultFormatShape { op: &'static str },
    #[error("{op:?} is not registered")]
    MissingOpcode { op: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown operation mnemonic {0:?}")]
    UnknownMnemonic(String),
}
