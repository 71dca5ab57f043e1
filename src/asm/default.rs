//! `%r = llvm.op [enum keywords] %a, %b [{attrs}] : T [to U]`

use std::fmt::{self, Write};

use itertools::Itertools;

use crate::catalog::{AttrKind, OperationSpec, TraitSet, TypeConstraint};
use crate::ir::{Operation, OperationState};
use crate::parser::{ParseError, Parser, tokens::Token};

use super::Printer;

/// Where the result type of a default format operation comes from.
enum ResultType {
    SameAsOperands,
    /// `i1` with the operands' vector shape.
    BoolLike,
    /// Spelled out after `to`.
    Explicit,
}

fn result_type(spec: &OperationSpec) -> ResultType {
    if spec.has_trait(TraitSet::SAME_OPERANDS_AND_RESULT_TYPE) {
        ResultType::SameAsOperands
    } else if spec.results.first().map(|x| x.constraint) == Some(TypeConstraint::BoolLike) {
        ResultType::BoolLike
    } else {
        ResultType::Explicit
    }
}

fn enum_attributes(spec: &OperationSpec) -> impl Iterator<Item = (&'static str, AttrKind)> + '_ {
    spec.attributes
        .iter()
        .filter(|x| matches!(x.kind, AttrKind::Enum(_)))
        .map(|x| (x.name, x.kind))
}

pub(super) fn parse(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let mut state = OperationState::new(spec.opcode);
    for (name, kind) in enum_attributes(spec) {
        if let AttrKind::Enum(kind) = kind {
            let value = parser.parse_enum_keyword(kind)?;
            state = state.add_attribute(name, value);
        }
    }

    let names = parser.parse_value_names()?;
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    let result = match result_type(spec) {
        ResultType::SameAsOperands => ty.clone(),
        ResultType::BoolLike => ty.bool_like(),
        ResultType::Explicit => {
            parser.expect_keyword("to")?;
            parser.parse_type()?
        }
    };

    let operands = parser.resolve_all(&names, &vec![ty; names.len()])?;
    Ok(state.add_operands(&operands).add_result(result))
}

pub(super) fn print(printer: &mut Printer<'_>, op: &Operation, spec: &OperationSpec) -> fmt::Result {
    let enums = enum_attributes(spec).map(|x| x.0).collect_vec();
    for name in &enums {
        if let Some(value) = op.attribute(name) {
            write!(printer, " {value}")?;
        }
    }

    let operands = printer.values(&op.operands);
    let attributes = printer.attr_dict(op, &enums);
    let ty = op
        .operands
        .first()
        .map(|x| printer.ty(*x))
        .unwrap_or_default();
    write!(printer, " {operands}{attributes} : {ty}")?;

    if let (ResultType::Explicit, Some(result)) = (result_type(spec), op.result()) {
        let result = printer.ty(result);
        write!(printer, " to {result}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::parser::parse_module;

    fn wrap(body: &str) -> String {
        format!(
            "llvm.func @f(%a: i32, %b: i32, %x: f32, %y: f32, %v: vector<4 x i32>) {{\n  {body}\n  llvm.return\n}}\n"
        )
    }

    #[test_case("%0 = llvm.add %a, %b : i32" ; "add")]
    #[test_case("%0 = llvm.xor %v, %v : vector<4 x i32>" ; "vector xor")]
    #[test_case("%0 = llvm.fneg %x : f32" ; "fneg")]
    #[test_case("%0 = llvm.fmul %x, %y : f32" ; "fmul")]
    #[test_case("%0 = llvm.icmp slt %a, %b : i32" ; "icmp")]
    #[test_case("%0 = llvm.icmp eq %v, %v : vector<4 x i32>" ; "vector icmp")]
    #[test_case("%0 = llvm.fcmp _true %x, %y : f32" ; "fcmp")]
    #[test_case("%0 = llvm.zext %a : i32 to i64" ; "zext")]
    #[test_case("%0 = llvm.sitofp %a : i32 to f64" ; "sitofp")]
    #[test_case("%0 = llvm.bitcast %v : vector<4 x i32> to vector<2 x i64>" ; "bitcast")]
    fn prints_back_byte_for_byte(line: &str) {
        let source = wrap(line);
        let module = parse_module(&source).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn comparison_result_is_bool_like() {
        let module = parse_module(&wrap("%0 = llvm.icmp ult %v, %v : vector<4 x i32>")).unwrap();
        let func = module.function("f").unwrap();
        let icmp = &func.regions[0].blocks[0].operations[0];
        assert_eq!(
            module.value_type(icmp.results[0]).unwrap().to_string(),
            "vector<4 x i1>"
        );
    }
}
