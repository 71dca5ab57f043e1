use std::fmt::{self, Write};

use itertools::Itertools;

use crate::catalog::OperationSpec;
use crate::ir::{Attribute, FunctionType, Operation, OperationState, Type};
use crate::parser::{ParseError, Parser, tokens::Token};

use super::Printer;

/// `@f(%a, %b) [{attrs}] : (A, B) -> R` or, calling through a pointer, `%fp(%a) : (A) -> R`.
///
/// The result list may be `()`, a single type, or a parenthesized list.
pub fn parse_call(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    let indirect = match parser.peek() {
        Some(Token::SymbolRef(_)) => {
            let callee = parser.parse_symbol()?;
            state = state.add_attribute("callee", Attribute::Symbol(callee));
            None
        }
        Some(Token::ValueId(_)) => Some(parser.parse_value_name()?),
        _ => return Err(parser.unexpected("callee")),
    };

    parser.expect(Token::LeftParen)?;
    let args = if parser.at(&Token::RightParen) {
        Vec::new()
    } else {
        parser.parse_value_names()?
    };
    parser.expect(Token::RightParen)?;
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let (params, _) = parser.parse_param_types()?;
    parser.expect(Token::Arrow)?;
    let results = if parser.eat(&Token::LeftParen) {
        let results = if parser.at(&Token::RightParen) {
            Vec::new()
        } else {
            parser.parse_type_list()?
        };
        parser.expect(Token::RightParen)?;
        results
    } else {
        vec![parser.parse_type()?]
    };

    let mut operands = Vec::with_capacity(args.len() + 1);
    if let Some((name, span)) = indirect {
        let callee = match parser.defined_value(&name) {
            Some(callee) => callee,
            None => {
                let result = results.first().cloned().unwrap_or(Type::Void);
                let signature = FunctionType::new(result, params.clone());
                parser.resolve(&name, span, &Type::ptr(Type::func(signature)))?
            }
        };
        operands.push(callee);
    }
    operands.extend(parser.resolve_all(&args, &params)?);

    let mut state = state.add_operands(&operands);
    for result in results {
        state = state.add_result(result);
    }
    Ok(state)
}

pub fn print_call(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let (callee, args) = match op.attribute("callee") {
        Some(Attribute::Symbol(name)) => (format!("@{name}"), &op.operands[..]),
        _ => match op.operands.split_first() {
            Some((callee, args)) => (printer.value(*callee), args),
            None => (String::new(), &op.operands[..]),
        },
    };
    let values = printer.values(args);
    let types = printer.types(args);
    let attributes = printer.attr_dict(op, &["callee"]);
    let results = match op.results.as_slice() {
        [result] => printer.ty(*result),
        results => format!("({})", results.iter().map(|x| printer.ty(*x)).join(", ")),
    };
    write!(
        printer,
        " {callee}({values}){attributes} : ({types}) -> {results}"
    )
}
