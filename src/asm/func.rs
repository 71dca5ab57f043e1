use std::fmt::{self, Write};

use itertools::Itertools;

use crate::catalog::OperationSpec;
use crate::ir::{Attribute, FunctionType, Operation, OperationState, Region, Type};
use crate::parser::{ParseError, Parser, tokens::Token};

use super::Printer;
use super::globals::{parse_linkage, print_linkage};

/// A definition, `[linkage] @f(%a: A, ...) [-> R] { body }`,
/// or a declaration with bare parameter types and no body.
pub fn parse_func(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = parse_linkage(parser, OperationState::new(spec.opcode))?;
    let name = parser.parse_symbol()?;
    state = state.add_attribute("sym_name", Attribute::String(name));

    let (args, params, variadic) = if matches!(parser.peek_nth(1), Some(Token::ValueId(_))) {
        let (args, variadic) = parse_arguments(parser)?;
        let params = args.iter().map(|x| x.2.clone()).collect();
        (Some(args), params, variadic)
    } else {
        let (params, variadic) = parser.parse_param_types()?;
        (None, params, variadic)
    };
    let result = if parser.eat(&Token::Arrow) {
        parser.parse_type()?
    } else {
        Type::Void
    };

    let signature = FunctionType {
        result,
        params,
        variadic,
    };
    state = state.add_attribute("function_type", Attribute::Type(Type::func(signature)));

    let body = match args {
        Some(args) => parser.parse_function_body(args)?,
        None if parser.at(&Token::LeftBracket) => parser.parse_function_body(Vec::new())?,
        None => Region::default(),
    };
    Ok(state.add_region(body))
}

/// `(%a: A, %b: B[, ...])`
fn parse_arguments(
    parser: &mut Parser<'_>,
) -> Result<(Vec<(String, crate::ir::Span, Type)>, bool), ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut args = Vec::new();
    let mut variadic = false;
    loop {
        if parser.eat(&Token::Ellipsis) {
            variadic = true;
            break;
        }
        let (name, span) = parser.parse_value_name()?;
        parser.expect(Token::Colon)?;
        let ty = parser.parse_type()?;
        args.push((name, span, ty));
        if !parser.eat(&Token::Coma) {
            break;
        }
    }
    parser.expect(Token::RightParen)?;
    Ok((args, variadic))
}

pub fn print_func(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    printer.reset_names();
    print_linkage(printer, op)?;
    let name = op.symbol_name().unwrap_or_default();
    let Some(signature) = op.function_type() else {
        return Err(fmt::Error);
    };

    let body = op.regions.first().filter(|x| !x.is_empty());
    let mut params = match body.and_then(Region::entry) {
        Some(entry) => entry
            .arguments
            .iter()
            .map(|x| format!("{}: {}", printer.value(*x), printer.ty(*x)))
            .collect_vec(),
        None => signature.params.iter().map(ToString::to_string).collect_vec(),
    };
    if signature.variadic {
        params.push("...".to_string());
    }
    write!(printer, " @{name}({})", params.join(", "))?;
    if !signature.returns_void() {
        write!(printer, " -> {}", signature.result)?;
    }

    if let Some(body) = body {
        printer.write_str(" ")?;
        printer.print_region(body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::check::{VerifyErrorKind, verify_module};
    use crate::ir::{Linkage, Type};
    use crate::parser::parse_module;

    #[test_case("llvm.func @puts(ptr<i8>) -> i32\n" ; "declaration")]
    #[test_case("llvm.func @printf(ptr<i8>, ...) -> i32\n" ; "variadic declaration")]
    #[test_case("llvm.func internal @id(%x: i64) -> i64 {\n  llvm.return %x : i64\n}\n" ; "internal definition")]
    fn functions_round_trip(source: &str) {
        let module = parse_module(source).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn signature_comes_from_arguments() {
        let module =
            parse_module("llvm.func weak @f(%a: i32, %p: ptr<f32>) -> f32 {\n  llvm.unreachable\n}\n")
                .unwrap();
        let func = module.function("f").unwrap();
        let signature = func.function_type().unwrap();
        assert_eq!(signature.params, vec![Type::i32(), Type::ptr(Type::f32())]);
        assert_eq!(signature.result, Type::f32());
        assert_eq!(func.enum_attribute::<Linkage>("linkage"), Some(Linkage::Weak));
    }

    #[test]
    fn names_restart_in_every_function() {
        let source = "llvm.func @a() -> i32 {\n  %0 = llvm.mlir.constant(1 : i32) : i32\n  llvm.return %0 : i32\n}\nllvm.func @b() -> i32 {\n  %0 = llvm.mlir.constant(2 : i32) : i32\n  llvm.return %0 : i32\n}\n";
        let module = parse_module(source).unwrap();
        let config = PrinterConfig {
            renumber: true,
            ..PrinterConfig::default()
        };
        assert_eq!(print_module(&module, &config), source);
    }

    #[test]
    fn functions_are_not_nested() {
        let source = "llvm.func @outer() {\n  llvm.func @inner()\n  llvm.return\n}\n";
        let module = parse_module(source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert_eq!(err.kind, VerifyErrorKind::NotAtModuleScope);
    }
}
