//! Module level globals and the constant-like operations.

use std::fmt::{self, Write};

use crate::catalog::OperationSpec;
use crate::ir::{Attribute, EnumAttribute, EnumKind, Linkage, Operation, OperationState};
use crate::parser::{ParseError, Parser, tokens::Token};

use super::Printer;

/// An optional leading linkage keyword, shared with `llvm.func`.
pub(super) fn parse_linkage(
    parser: &mut Parser<'_>,
    state: OperationState,
) -> Result<OperationState, ParseError> {
    match parser.peek() {
        Some(Token::Identifier(keyword)) if Linkage::from_keyword(keyword).is_some() => {
            let linkage = parser.parse_enum_keyword(EnumKind::Linkage)?;
            Ok(state.add_attribute("linkage", linkage))
        }
        _ => Ok(state),
    }
}

pub(super) fn print_linkage(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    match op.enum_attribute::<Linkage>("linkage") {
        Some(linkage) => write!(printer, " {linkage}"),
        None => Ok(()),
    }
}

/// `[linkage] [constant] @name([initializer]) [{attrs}] : T`
pub fn parse_global(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = parse_linkage(parser, OperationState::new(spec.opcode))?;
    if parser.eat_keyword("constant") {
        state = state.add_attribute("constant", Attribute::Unit);
    }
    let name = parser.parse_symbol()?;
    state = state.add_attribute("sym_name", Attribute::String(name));

    parser.expect(Token::LeftParen)?;
    if !parser.at(&Token::RightParen) {
        let value = parser.parse_attribute()?;
        state = state.add_attribute("value", value);
    }
    parser.expect(Token::RightParen)?;
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    Ok(state.add_attribute("global_type", Attribute::Type(ty)))
}

pub fn print_global(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    print_linkage(printer, op)?;
    if op.attribute("constant").is_some() {
        printer.write_str(" constant")?;
    }
    let name = op.symbol_name().unwrap_or_default();
    let value = op
        .attribute("value")
        .map(ToString::to_string)
        .unwrap_or_default();
    let attributes = printer.attr_dict(
        op,
        &["linkage", "constant", "sym_name", "value", "global_type"],
    );
    let ty = op
        .attribute("global_type")
        .map(ToString::to_string)
        .unwrap_or_default();
    write!(printer, " @{name}({value}){attributes} : {ty}")
}

/// `@name : ptr<T>`
pub fn parse_addressof(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let name = parser.parse_symbol()?;
    let mut state =
        OperationState::new(spec.opcode).add_attribute("global_name", Attribute::Symbol(name));
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    Ok(state.add_result(ty))
}

pub fn print_addressof(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let name = op
        .attribute("global_name")
        .map(ToString::to_string)
        .unwrap_or_default();
    let attributes = printer.attr_dict(op, &["global_name"]);
    let ty = op.result().map(|x| printer.ty(x)).unwrap_or_default();
    write!(printer, " {name}{attributes} : {ty}")
}

/// `(literal) : T`
pub fn parse_constant(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    parser.expect(Token::LeftParen)?;
    let value = parser.parse_attribute()?;
    parser.expect(Token::RightParen)?;
    let mut state = OperationState::new(spec.opcode).add_attribute("value", value);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    Ok(state.add_result(ty))
}

pub fn print_constant(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let value = op
        .attribute("value")
        .map(ToString::to_string)
        .unwrap_or_default();
    let attributes = printer.attr_dict(op, &["value"]);
    let ty = op.result().map(|x| printer.ty(x)).unwrap_or_default();
    write!(printer, "({value}){attributes} : {ty}")
}

/// `: T`, used by both `undef` and `null`.
fn parse_typed_nullary(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    Ok(state.add_result(ty))
}

fn print_typed_nullary(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let attributes = printer.attr_dict(op, &[]);
    let ty = op.result().map(|x| printer.ty(x)).unwrap_or_default();
    write!(printer, "{attributes} : {ty}")
}

pub fn parse_undef(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    parse_typed_nullary(parser, spec)
}

pub fn print_undef(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    print_typed_nullary(printer, op)
}

pub fn parse_null(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    parse_typed_nullary(parser, spec)
}

pub fn print_null(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    print_typed_nullary(printer, op)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::check::{SymbolResolutionError, VerifyErrorKind, verify_module};
    use crate::ir::{Attribute, Linkage};
    use crate::parser::{ParseErrorKind, parse_module};

    #[test_case("llvm.global internal constant @g(42 : i32) : i32\n" ; "internal constant")]
    #[test_case("llvm.global @counter() : i64\n" ; "no initializer")]
    #[test_case("llvm.global private constant @msg(\"hi\\n\") : array<3 x i8>\n" ; "string")]
    #[test_case("llvm.global weak_odr @pi(3.14) : f64\n" ; "float")]
    fn globals_round_trip(source: &str) {
        let module = parse_module(source).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn linkage_is_an_enum_attribute() {
        let module = parse_module("llvm.global internal @g(1 : i8) : i8\n").unwrap();
        let global = module.globals().next().unwrap();
        assert_eq!(
            global.enum_attribute::<Linkage>("linkage"),
            Some(Linkage::Internal)
        );
        assert_eq!(global.symbol_name(), Some("g"));
        assert_eq!(global.attribute("value"), Some(&Attribute::int(1, crate::ir::Type::i8())));
    }

    #[test]
    fn initializer_type_must_match() {
        let module = parse_module("llvm.global @g(42 : i32) : i64\n").unwrap();
        let err = verify_module(&module).unwrap_err();
        assert!(matches!(err.kind, VerifyErrorKind::Initializer { .. }));
    }

    const USES: &str = "llvm.global @g(0 : i32) : i32
llvm.func @f() -> ptr<i32> {
  %0 = llvm.mlir.addressof @g : ptr<i32>
  %1 = llvm.mlir.constant(2.5 : f32) : f32
  %2 = llvm.mlir.undef : struct<(i32, f32)>
  %3 = llvm.mlir.null : ptr<i8>
  llvm.return %0 : ptr<i32>
}
";

    #[test]
    fn constant_like_operations_round_trip() {
        let module = parse_module(USES).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), USES);
    }

    #[test]
    fn addressof_resolves_exactly_one_symbol() {
        let missing = USES.replace("@g : ptr<i32>", "@h : ptr<i32>");
        let err = verify_module(&parse_module(&missing).unwrap()).unwrap_err();
        assert_eq!(
            err.kind,
            VerifyErrorKind::Symbol(SymbolResolutionError::Unresolved { name: "h".into() })
        );

        let twice = format!("llvm.global @g(1 : i32) : i32\n{USES}");
        let err = verify_module(&parse_module(&twice).unwrap()).unwrap_err();
        assert_eq!(
            err.kind,
            VerifyErrorKind::Symbol(SymbolResolutionError::Ambiguous {
                name: "g".into(),
                count: 2
            })
        );
    }

    #[test]
    fn addressof_result_is_a_pointer_to_the_global_type() {
        let wrong = USES
            .replace("@g : ptr<i32>", "@g : ptr<i64>")
            .replace("-> ptr<i32>", "-> ptr<i64>")
            .replace("%0 : ptr<i32>", "%0 : ptr<i64>");
        let err = verify_module(&parse_module(&wrong).unwrap()).unwrap_err();
        assert_eq!(err.op, "llvm.mlir.addressof");
        assert!(matches!(err.kind, VerifyErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn null_must_be_a_pointer() {
        let err = parse_module("llvm.func @f() {\n  %0 = llvm.mlir.null : i32\n  llvm.return\n}\n")
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Constraint(_)));
    }
}
