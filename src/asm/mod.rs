//! Assembly formats: the text after an operation's mnemonic.
//!
//! Operations without a custom format use the default one in [`default`],
//! derived from their fixed arity. Every other format is a parse/print pair
//! registered in the catalog.

use std::fmt::{self, Write};

use tracing::debug;

use crate::catalog::{AsmFormat, Catalog, OperationSpec};
use crate::ir::{Module, Operation, OperationState};
use crate::parser::{ParseError, Parser};

pub mod call;
pub mod control;
mod default;
pub mod func;
pub mod globals;
pub mod memory;
pub mod printer;
pub mod vector;

pub use printer::{Printer, PrinterConfig};

/// Parses the rest of an operation once its mnemonic has been consumed.
pub fn parse_operation(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    match spec.format {
        AsmFormat::Default => default::parse(parser, spec),
        AsmFormat::Custom { parse, .. } => parse(parser, spec),
    }
}

/// Prints `[%results =] mnemonic <format>`.
pub fn print_operation(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    if !op.results.is_empty() {
        let results = printer.values(&op.results);
        write!(printer, "{results} = ")?;
    }
    printer.write_str(op.name())?;

    let spec = Catalog::builtin().spec(op.opcode);
    match spec.format {
        AsmFormat::Default => default::print(printer, op, spec),
        AsmFormat::Custom { print, .. } => print(printer, op),
    }
}

/// Prints every module level operation on its own line.
pub fn print_module(module: &Module, config: &PrinterConfig) -> String {
    let mut printer = Printer::new(module, config.clone());
    for op in &module.body {
        // Writing into a String can't fail.
        let _ = print_operation(&mut printer, op).and_then(|_| printer.write_str("\n"));
    }
    let text = printer.finish();
    debug!("printed {} bytes", text.len());
    text
}
