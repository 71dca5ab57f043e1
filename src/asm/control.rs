//! Terminators.

use std::fmt::{self, Write};

use itertools::Itertools;

use crate::catalog::OperationSpec;
use crate::ir::{Operation, OperationState, Type};
use crate::parser::{ParseError, Parser, tokens::Token};

use super::Printer;

/// The successor list preceded by `separator`, or nothing when there are none.
fn print_successors(printer: &mut Printer<'_>, op: &Operation, separator: &str) -> String {
    if op.successors.is_empty() {
        return String::new();
    }
    let successors = op.successors.iter().map(|x| printer.successor(x)).join(", ");
    format!("{separator}{successors}")
}

/// Whether the next tokens are `%a, %b =`, the start of the following operation
/// rather than operands.
fn at_result_names(parser: &Parser<'_>) -> bool {
    let mut index = 0;
    while matches!(parser.peek_nth(index), Some(Token::ValueId(_))) {
        match parser.peek_nth(index + 1) {
            Some(Token::Coma) => index += 2,
            Some(Token::Assign) => return true,
            _ => return false,
        }
    }
    false
}

/// `^bb1(%a : T)`
pub fn parse_br(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let successors = parser.parse_successors()?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    Ok(successors.into_iter().fold(state, OperationState::add_successor))
}

pub fn print_br(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let successors = print_successors(printer, op, " ");
    let attributes = printer.attr_dict(op, &[]);
    write!(printer, "{successors}{attributes}")
}

/// `%c, ^bb1, ^bb2(%a : T)`. Any successor count parses, the verifier checks it.
pub fn parse_cond_br(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (condition, span) = parser.parse_value_name()?;
    let condition = parser.resolve(&condition, span, &Type::i1())?;
    let successors = if parser.eat(&Token::Coma) {
        parser.parse_successors()?
    } else {
        Vec::new()
    };
    let mut state = OperationState::new(spec.opcode).add_operands(&[condition]);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    Ok(successors.into_iter().fold(state, OperationState::add_successor))
}

pub fn print_cond_br(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let condition = printer.values(&op.operands);
    let successors = print_successors(printer, op, ", ");
    let attributes = printer.attr_dict(op, &[]);
    write!(printer, " {condition}{successors}{attributes}")
}

/// Nothing, or `%v : T`.
pub fn parse_return(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    if !matches!(parser.peek(), Some(Token::ValueId(_))) || at_result_names(parser) {
        parser.parse_attr_dict(spec, &mut state.attributes)?;
        return Ok(state);
    }
    let names = parser.parse_value_names()?;
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let types = parser.parse_type_list()?;
    let operands = parser.resolve_all(&names, &types)?;
    Ok(state.add_operands(&operands))
}

pub fn print_return(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    if !op.operands.is_empty() {
        let values = printer.values(&op.operands);
        let types = printer.types(&op.operands);
        write!(printer, " {values}")?;
        let attributes = printer.attr_dict(op, &[]);
        return write!(printer, "{attributes} : {types}");
    }
    let attributes = printer.attr_dict(op, &[]);
    printer.write_str(&attributes)
}

pub fn parse_unreachable(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    Ok(state)
}

pub fn print_unreachable(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let attributes = printer.attr_dict(op, &[]);
    printer.write_str(&attributes)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::check::{VerifyErrorKind, verify_module};
    use crate::parser::parse_module;

    const LOOP: &str = "llvm.func @count(%n: i32) -> i32 {
  %0 = llvm.mlir.constant(0 : i32) : i32
  llvm.br ^bb1(%0 : i32)
^bb1(%i: i32):
  %1 = llvm.icmp slt %i, %n : i32
  llvm.cond_br %1, ^bb2, ^bb3
^bb2:
  %2 = llvm.mlir.constant(1 : i32) : i32
  %3 = llvm.add %i, %2 : i32
  llvm.br ^bb1(%3 : i32)
^bb3:
  llvm.return %i : i32
}
";

    #[test]
    fn loop_round_trips() {
        let module = parse_module(LOOP).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), LOOP);
    }

    #[test]
    fn unreachable_ends_a_block() {
        let source = "llvm.func @f() {\n  llvm.unreachable\n}\n";
        let module = parse_module(source).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn cond_br_needs_two_successors() {
        let source = "llvm.func @f(%c: i1) {\n  llvm.cond_br %c, ^bb1\n^bb1:\n  llvm.return\n}\n";
        let module = parse_module(source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert_eq!(err.op, "llvm.cond_br");
        assert!(matches!(
            err.kind,
            VerifyErrorKind::SuccessorCount {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test_case("llvm.func @f(%c: i1) {\n  llvm.cond_br %c\n}\n", 0 ; "no successors")]
    #[test_case("llvm.func @f(%c: i1) {\n  llvm.cond_br %c, ^bb1, ^bb1, ^bb1\n^bb1:\n  llvm.return\n}\n", 3 ; "three successors")]
    fn cond_br_of_any_width_prints_back(source: &str, found: usize) {
        let module = parse_module(source).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
        let err = verify_module(&module).unwrap_err();
        assert_eq!(
            err.kind,
            VerifyErrorKind::SuccessorCount { expected: 2, found }
        );
    }

    #[test]
    fn successor_operands_match_block_arguments() {
        let source = "llvm.func @f(%a: i32) {\n  llvm.br ^bb1\n^bb1(%x: i32):\n  llvm.return\n}\n";
        let module = parse_module(source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert!(matches!(err.kind, VerifyErrorKind::SuccessorOperandCount { .. }));
    }

    #[test]
    fn return_must_match_the_signature() {
        let void = "llvm.func @f(%a: i32) {\n  llvm.return %a : i32\n}\n";
        let err = verify_module(&parse_module(void).unwrap()).unwrap_err();
        assert!(matches!(
            err.kind,
            VerifyErrorKind::ReturnCount {
                expected: 0,
                found: 1
            }
        ));

        let two = "llvm.func @f(%a: i32) -> i32 {\n  llvm.return %a, %a : i32, i32\n}\n";
        let err = verify_module(&parse_module(two).unwrap()).unwrap_err();
        assert_eq!(err.kind, VerifyErrorKind::ReturnArity { found: 2 });
    }

    #[test]
    fn terminator_must_be_last() {
        let source = "llvm.func @f(%a: i32) {\n  llvm.return\n  %0 = llvm.add %a, %a : i32\n}\n";
        let module = parse_module(source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert!(matches!(
            err.kind,
            VerifyErrorKind::TerminatorNotLast | VerifyErrorKind::MissingTerminator { .. }
        ));
    }
}
