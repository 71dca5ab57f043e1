use std::fmt::{self, Write};

use crate::catalog::OperationSpec;
use crate::ir::{Attribute, Operation, OperationState, Span, Type};
use crate::parser::{ParseError, ParseErrorKind, Parser, tokens::Token};

use super::Printer;

/// The pointee of a `ptr<T>` written after the colon.
pub(super) fn pointee(span: Span, ty: Type) -> Result<Type, ParseError> {
    match ty {
        Type::Ptr(pointee) => Ok(*pointee),
        found => Err(ParseError::new(
            span,
            ParseErrorKind::InvalidType {
                expected: "pointer type",
                found,
            },
        )),
    }
}

/// `%n x T [{attrs}] : I`
pub fn parse_alloca(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (size, span) = parser.parse_value_name()?;
    parser.expect_keyword("x")?;
    let element = parser.parse_type()?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let size_type = parser.parse_type()?;
    let size = parser.resolve(&size, span, &size_type)?;
    Ok(state.add_operands(&[size]).add_result(Type::ptr(element)))
}

pub fn print_alloca(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let size = printer.values(&op.operands);
    let size_type = printer.types(&op.operands);
    let element = match op.result().and_then(|x| printer.module().value_type(x)) {
        Some(ty) => ty.pointee().unwrap_or(ty).to_string(),
        None => String::new(),
    };
    let attributes = printer.attr_dict(op, &[]);
    write!(printer, " {size} x {element}{attributes} : {size_type}")
}

/// `%p [{attrs}] : ptr<T>`
pub fn parse_load(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (addr, addr_span) = parser.parse_value_name()?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let span = parser.span();
    let addr_type = parser.parse_type()?;
    let addr = parser.resolve(&addr, addr_span, &addr_type)?;
    let result = pointee(span, addr_type)?;
    Ok(state.add_operands(&[addr]).add_result(result))
}

pub fn print_load(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let addr = printer.values(&op.operands);
    let addr_type = printer.types(&op.operands);
    let attributes = printer.attr_dict(op, &[]);
    write!(printer, " {addr}{attributes} : {addr_type}")
}

/// `%v, %p [{attrs}] : ptr<T>`
pub fn parse_store(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (value, value_span) = parser.parse_value_name()?;
    parser.expect(Token::Coma)?;
    let (addr, addr_span) = parser.parse_value_name()?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let span = parser.span();
    let addr_type = parser.parse_type()?;
    let addr = parser.resolve(&addr, addr_span, &addr_type)?;
    let value_type = pointee(span, addr_type)?;
    let value = parser.resolve(&value, value_span, &value_type)?;
    Ok(state.add_operands(&[value, addr]))
}

pub fn print_store(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let operands = printer.values(&op.operands);
    let addr_type = op
        .operands
        .get(1)
        .map(|x| printer.ty(*x))
        .unwrap_or_default();
    let attributes = printer.attr_dict(op, &[]);
    write!(printer, " {operands}{attributes} : {addr_type}")
}

/// `[inbounds] %p[%i, %j] [{attrs}] : (P, I, J) -> R`
pub fn parse_gep(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    if parser.eat_keyword("inbounds") {
        state = state.add_attribute("inbounds", Attribute::Unit);
    }
    let mut names = vec![parser.parse_value_name()?];
    parser.expect(Token::LeftSquareBracket)?;
    if !parser.at(&Token::RightSquareBracket) {
        names.extend(parser.parse_value_names()?);
    }
    parser.expect(Token::RightSquareBracket)?;
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    parser.expect(Token::LeftParen)?;
    let types = parser.parse_type_list()?;
    parser.expect(Token::RightParen)?;
    parser.expect(Token::Arrow)?;
    let result = parser.parse_type()?;
    let operands = parser.resolve_all(&names, &types)?;
    Ok(state.add_operands(&operands).add_result(result))
}

pub fn print_gep(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    if op.attribute("inbounds").is_some() {
        printer.write_str(" inbounds")?;
    }
    let (base, indices) = op.operands.split_first().map_or((None, &[][..]), |(b, i)| (Some(*b), i));
    let base = base.map(|x| printer.value(x)).unwrap_or_default();
    let indices = printer.values(indices);
    let types = printer.types(&op.operands);
    let attributes = printer.attr_dict(op, &["inbounds"]);
    let result = op.result().map(|x| printer.ty(x)).unwrap_or_default();
    write!(printer, " {base}[{indices}]{attributes} : ({types}) -> {result}")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::check::verify_module;
    use crate::parser::{ParseErrorKind, parse_module};

    fn wrap(body: &str) -> String {
        format!(
            "llvm.func @f(%n: i64, %p: ptr<i32>, %v: i32, %s: ptr<struct<(i32, f32)>>, %i: i64) {{\n{body}  llvm.return\n}}\n"
        )
    }

    #[test_case("  %0 = llvm.alloca %n x i32 {alignment = 8} : i64\n" ; "alloca")]
    #[test_case("  %0 = llvm.load %p : ptr<i32>\n" ; "load")]
    #[test_case("  %0 = llvm.load %p {alignment = 4, volatile} : ptr<i32>\n" ; "volatile load")]
    #[test_case("  llvm.store %v, %p : ptr<i32>\n" ; "store")]
    #[test_case("  %0 = llvm.getelementptr %p[%i] : (ptr<i32>, i64) -> ptr<i32>\n" ; "gep")]
    #[test_case(
        "  %0 = llvm.mlir.constant(1 : i32) : i32\n  %1 = llvm.getelementptr inbounds %s[%i, %0] : (ptr<struct<(i32, f32)>>, i64, i32) -> ptr<f32>\n" ;
        "struct gep"
    )]
    fn round_trips_and_verifies(body: &str) {
        let source = wrap(body);
        let module = parse_module(&source).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn load_needs_a_pointer_type() {
        let err = parse_module(&wrap("  %0 = llvm.load %v : i32\n")).unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::ValueTypeMismatch { .. } | ParseErrorKind::InvalidType { .. }
        ));
    }

    #[test]
    fn struct_index_must_be_constant() {
        let source = wrap(
            "  %0 = llvm.getelementptr %s[%i, %i] : (ptr<struct<(i32, f32)>>, i64, i64) -> ptr<f32>\n",
        );
        let module = parse_module(&source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert_eq!(err.op, "llvm.getelementptr");
    }
}
