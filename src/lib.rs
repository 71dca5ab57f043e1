//! The LLVM dialect's operation catalog with its textual form, verifier and
//! lowering into a host IR builder.

use thiserror::Error;

pub mod asm;
pub mod catalog;
pub mod check;
pub mod codegen;
pub mod ir;
pub mod parser;
pub mod session;

/// Any failure of the library, for callers that don't care which stage failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] catalog::DefinitionError),
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Constraint(#[from] check::ConstraintViolation),
    #[error(transparent)]
    Verification(#[from] check::VerificationError),
    #[error(transparent)]
    Symbol(#[from] check::SymbolResolutionError),
    #[error(transparent)]
    Lowering(#[from] codegen::LoweringError),
    #[error(transparent)]
    Config(#[from] session::ConfigError),
}
