//! Vector lane and aggregate member access, plus `select`.

use std::fmt::{self, Write};

use itertools::Itertools;

use crate::catalog::OperationSpec;
use crate::ir::{Attribute, Operation, OperationState, Span, Type};
use crate::parser::{ParseError, ParseErrorKind, Parser, tokens::Token};

use super::Printer;

fn element(span: Span, ty: &Type) -> Result<Type, ParseError> {
    match ty {
        Type::Vector(_, element) => Ok(element.as_ref().clone()),
        found => Err(ParseError::new(
            span,
            ParseErrorKind::InvalidType {
                expected: "vector type",
                found: found.clone(),
            },
        )),
    }
}

fn member(span: Span, ty: &Type, position: &[i64]) -> Result<Type, ParseError> {
    let found = if position.is_empty() {
        None
    } else {
        ty.aggregate_member(position)
    };
    found.cloned().ok_or_else(|| {
        ParseError::new(
            span,
            ParseErrorKind::InvalidPosition {
                position: position.to_vec(),
                ty: ty.clone(),
            },
        )
    })
}

fn int_list(op: &Operation, name: &str) -> String {
    op.attribute(name)
        .and_then(Attribute::as_int_array)
        .unwrap_or_default()
        .iter()
        .join(", ")
}

/// `[%i : I]`
fn parse_lane(parser: &mut Parser<'_>) -> Result<(String, Span, Type), ParseError> {
    parser.expect(Token::LeftSquareBracket)?;
    let (name, span) = parser.parse_value_name()?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    parser.expect(Token::RightSquareBracket)?;
    Ok((name, span, ty))
}

/// `%v[%i : I] : V`
pub fn parse_extractelement(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (vector, vector_span) = parser.parse_value_name()?;
    let (position, position_span, position_type) = parse_lane(parser)?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let span = parser.span();
    let ty = parser.parse_type()?;
    let result = element(span, &ty)?;
    let vector = parser.resolve(&vector, vector_span, &ty)?;
    let position = parser.resolve(&position, position_span, &position_type)?;
    Ok(state.add_operands(&[vector, position]).add_result(result))
}

pub fn print_extractelement(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let [vector, position] = op.operands[..] else {
        return Err(fmt::Error);
    };
    let vector_name = printer.value(vector);
    let position_name = printer.value(position);
    let position_type = printer.ty(position);
    let attributes = printer.attr_dict(op, &[]);
    let ty = printer.ty(vector);
    write!(
        printer,
        " {vector_name}[{position_name} : {position_type}]{attributes} : {ty}"
    )
}

/// `%e, %v[%i : I] : V`
pub fn parse_insertelement(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (value, value_span) = parser.parse_value_name()?;
    parser.expect(Token::Coma)?;
    let (vector, vector_span) = parser.parse_value_name()?;
    let (position, position_span, position_type) = parse_lane(parser)?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let span = parser.span();
    let ty = parser.parse_type()?;
    let value_type = element(span, &ty)?;
    let value = parser.resolve(&value, value_span, &value_type)?;
    let vector = parser.resolve(&vector, vector_span, &ty)?;
    let position = parser.resolve(&position, position_span, &position_type)?;
    Ok(state
        .add_operands(&[value, vector, position])
        .add_result(ty))
}

pub fn print_insertelement(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let [value, vector, position] = op.operands[..] else {
        return Err(fmt::Error);
    };
    let value_name = printer.value(value);
    let vector_name = printer.value(vector);
    let position_name = printer.value(position);
    let position_type = printer.ty(position);
    let attributes = printer.attr_dict(op, &[]);
    let ty = printer.ty(vector);
    write!(
        printer,
        " {value_name}, {vector_name}[{position_name} : {position_type}]{attributes} : {ty}"
    )
}

/// `%v1, %v2 [0, 4, -1] : V1, V2`. The result has one lane per mask entry.
pub fn parse_shufflevector(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (v1, v1_span) = parser.parse_value_name()?;
    parser.expect(Token::Coma)?;
    let (v2, v2_span) = parser.parse_value_name()?;
    let mask = parser.parse_int_array()?;
    let mut state =
        OperationState::new(spec.opcode).add_attribute("mask", Attribute::int_array(&mask));
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let span = parser.span();
    let v1_type = parser.parse_type()?;
    parser.expect(Token::Coma)?;
    let v2_type = parser.parse_type()?;
    let result = Type::vector(mask.len() as u32, element(span, &v1_type)?);
    let v1 = parser.resolve(&v1, v1_span, &v1_type)?;
    let v2 = parser.resolve(&v2, v2_span, &v2_type)?;
    Ok(state.add_operands(&[v1, v2]).add_result(result))
}

pub fn print_shufflevector(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let operands = printer.values(&op.operands);
    let mask = int_list(op, "mask");
    let attributes = printer.attr_dict(op, &["mask"]);
    let types = printer.types(&op.operands);
    write!(printer, " {operands} [{mask}]{attributes} : {types}")
}

/// `%agg[0, 1] : T`
pub fn parse_extractvalue(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (container, container_span) = parser.parse_value_name()?;
    let position_span = parser.span();
    let position = parser.parse_int_array()?;
    let mut state = OperationState::new(spec.opcode)
        .add_attribute("position", Attribute::int_array(&position));
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    let result = member(position_span.merge(parser.prev_span()), &ty, &position)?;
    let container = parser.resolve(&container, container_span, &ty)?;
    Ok(state.add_operands(&[container]).add_result(result))
}

pub fn print_extractvalue(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let container = printer.values(&op.operands);
    let position = int_list(op, "position");
    let attributes = printer.attr_dict(op, &["position"]);
    let ty = printer.types(&op.operands);
    write!(printer, " {container}[{position}]{attributes} : {ty}")
}

/// `%x, %agg[0, 1] : T`
pub fn parse_insertvalue(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let (value, value_span) = parser.parse_value_name()?;
    parser.expect(Token::Coma)?;
    let (container, container_span) = parser.parse_value_name()?;
    let position_span = parser.span();
    let position = parser.parse_int_array()?;
    let mut state = OperationState::new(spec.opcode)
        .add_attribute("position", Attribute::int_array(&position));
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let ty = parser.parse_type()?;
    let value_type = member(position_span.merge(parser.prev_span()), &ty, &position)?;
    let value = parser.resolve(&value, value_span, &value_type)?;
    let container = parser.resolve(&container, container_span, &ty)?;
    Ok(state.add_operands(&[value, container]).add_result(ty))
}

pub fn print_insertvalue(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let [value, container] = op.operands[..] else {
        return Err(fmt::Error);
    };
    let value_name = printer.value(value);
    let container_name = printer.value(container);
    let position = int_list(op, "position");
    let attributes = printer.attr_dict(op, &["position"]);
    let ty = printer.ty(container);
    write!(
        printer,
        " {value_name}, {container_name}[{position}]{attributes} : {ty}"
    )
}

/// `%c, %a, %b : C, T`
pub fn parse_select(
    parser: &mut Parser<'_>,
    spec: &OperationSpec,
) -> Result<OperationState, ParseError> {
    let names = parser.parse_value_names()?;
    let mut state = OperationState::new(spec.opcode);
    parser.parse_attr_dict(spec, &mut state.attributes)?;
    parser.expect(Token::Colon)?;
    let condition = parser.parse_type()?;
    parser.expect(Token::Coma)?;
    let ty = parser.parse_type()?;
    let operands = parser.resolve_all(&names, &[condition, ty.clone(), ty.clone()])?;
    Ok(state.add_operands(&operands).add_result(ty))
}

pub fn print_select(printer: &mut Printer<'_>, op: &Operation) -> fmt::Result {
    let operands = printer.values(&op.operands);
    let attributes = printer.attr_dict(op, &[]);
    let condition = op.operands.first().map(|x| printer.ty(*x)).unwrap_or_default();
    let ty = op.result().map(|x| printer.ty(x)).unwrap_or_default();
    write!(printer, " {operands}{attributes} : {condition}, {ty}")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::asm::{PrinterConfig, print_module};
    use crate::check::{VerifyErrorKind, verify_module};
    use crate::parser::{ParseErrorKind, parse_module};

    fn wrap(body: &str) -> String {
        format!(
            "llvm.func @f(%v: vector<4 x f32>, %w: vector<2 x f32>, %i: i32, %x: f32, %s: struct<(i32, array<2 x f64>)>, %c: i1, %m: vector<4 x i1>) {{\n{body}  llvm.return\n}}\n"
        )
    }

    #[test_case("  %0 = llvm.extractelement %v[%i : i32] : vector<4 x f32>\n" ; "extractelement")]
    #[test_case("  %0 = llvm.insertelement %x, %v[%i : i32] : vector<4 x f32>\n" ; "insertelement")]
    #[test_case("  %0 = llvm.shufflevector %v, %v [0, 5, -1] : vector<4 x f32>, vector<4 x f32>\n" ; "shufflevector")]
    #[test_case("  %0 = llvm.extractvalue %s[1, 0] : struct<(i32, array<2 x f64>)>\n" ; "extractvalue")]
    #[test_case("  %0 = llvm.insertvalue %i, %s[0] : struct<(i32, array<2 x f64>)>\n" ; "insertvalue")]
    #[test_case("  %0 = llvm.select %c, %x, %x : i1, f32\n" ; "select")]
    #[test_case("  %0 = llvm.select %m, %v, %v : vector<4 x i1>, vector<4 x f32>\n" ; "vector select")]
    fn round_trips_and_verifies(body: &str) {
        let source = wrap(body);
        let module = parse_module(&source).unwrap();
        verify_module(&module).unwrap();
        assert_eq!(print_module(&module, &PrinterConfig::default()), source);
    }

    #[test]
    fn shuffle_result_has_one_lane_per_mask_entry() {
        let source = wrap("  %0 = llvm.shufflevector %v, %v [0, 1] : vector<4 x f32>, vector<4 x f32>\n");
        let module = parse_module(&source).unwrap();
        let op = &module.function("f").unwrap().regions[0].blocks[0].operations[0];
        assert_eq!(
            module.value_type(op.results[0]).unwrap().to_string(),
            "vector<2 x f32>"
        );
    }

    #[test_case("[0, 8]", 1, 8 ; "past both inputs")]
    #[test_case("[-2]", 0, -2 ; "below undef marker")]
    fn shuffle_mask_bounds(mask: &str, index: usize, value: i64) {
        let source = wrap(&format!(
            "  %0 = llvm.shufflevector %v, %v {mask} : vector<4 x f32>, vector<4 x f32>\n"
        ));
        let module = parse_module(&source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert_eq!(
            err.kind,
            VerifyErrorKind::ShuffleMaskIndex {
                index,
                value,
                bound: 8
            }
        );
    }

    #[test]
    fn shuffle_inputs_share_an_element_type() {
        let source = wrap(
            "  %0 = llvm.shufflevector %v, %m [0] : vector<4 x f32>, vector<4 x i1>\n",
        );
        let module = parse_module(&source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert!(matches!(err.kind, VerifyErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn mixed_length_shuffle_is_fine() {
        let source = wrap(
            "  %0 = llvm.shufflevector %v, %w [0, 5] : vector<4 x f32>, vector<2 x f32>\n",
        );
        verify_module(&parse_module(&source).unwrap()).unwrap();
    }

    #[test_case("  %0 = llvm.extractvalue %s[2] : struct<(i32, array<2 x f64>)>\n" ; "past the fields")]
    #[test_case("  %0 = llvm.extractvalue %s[1, 2] : struct<(i32, array<2 x f64>)>\n" ; "past the array")]
    #[test_case("  %0 = llvm.extractvalue %s[] : struct<(i32, array<2 x f64>)>\n" ; "empty")]
    fn bad_positions(body: &str) {
        let err = parse_module(&wrap(body)).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidPosition { .. }));
    }

    #[test]
    fn select_condition_matches_lanes() {
        let source = wrap(
            "  %0 = llvm.select %m, %w, %w : vector<4 x i1>, vector<2 x f32>\n",
        );
        let module = parse_module(&source).unwrap();
        let err = verify_module(&module).unwrap_err();
        assert!(matches!(err.kind, VerifyErrorKind::SelectShape { .. }));
    }
}
