//! Verifier hooks of individual operations, referenced from the catalog tables.

use crate::catalog::OpCode;
use crate::ir::{Attribute, FunctionType, Operation, Type};

use super::errors::VerifyErrorKind;
use super::verifier::VerifyCtx;

type Result = std::result::Result<(), VerifyErrorKind>;

fn expect_type(what: &str, expected: &Type, found: &Type) -> Result {
    if expected == found {
        Ok(())
    } else {
        Err(VerifyErrorKind::mismatch(what, expected, found))
    }
}

/// Integer literals fit the signed or the unsigned range of their width,
/// finite float literals the range of their format.
fn check_literal(literal: &Attribute) -> Result {
    let fits = match literal {
        Attribute::Integer { value, ty } => match ty.int_width() {
            Some(width) if width < 64 => {
                let min = -(1i128 << (width.max(1) - 1));
                let max = (1i128 << width) - 1;
                (min..=max).contains(&i128::from(*value))
            }
            _ => true,
        },
        Attribute::Float { value, ty } => match ty.scalar_type() {
            Type::Float(kind) => !value.is_finite() || value.abs() <= kind.max_finite(),
            _ => true,
        },
        _ => true,
    };
    match literal {
        Attribute::Integer { value, ty } if !fits => Err(VerifyErrorKind::LiteralOutOfRange {
            value: value.to_string(),
            ty: ty.clone(),
        }),
        Attribute::Float { value, ty } if !fits => Err(VerifyErrorKind::LiteralOutOfRange {
            value: value.to_string(),
            ty: ty.clone(),
        }),
        _ => Ok(()),
    }
}

/// `icmp` and `fcmp`: equal operand types and an `i1` shaped result.
pub fn verify_compare(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let lhs = ctx.operand_type(op, 0);
    expect_type("rhs", lhs, ctx.operand_type(op, 1))?;
    expect_type("result", &lhs.bool_like(), ctx.result_type(op))
}

pub fn verify_cast(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let from = ctx.operand_type(op, 0);
    let to = ctx.result_type(op);
    let invalid = |reason: &'static str| -> Result {
        Err(VerifyErrorKind::InvalidCast {
            from: from.clone(),
            to: to.clone(),
            reason,
        })
    };

    if op.opcode == OpCode::Bitcast {
        if from.is_aggregate() || to.is_aggregate() {
            return invalid("aggregates can't be bitcast");
        }
        if from.scalar_type().is_ptr() || to.scalar_type().is_ptr() {
            let same_shape = from.lanes() == to.lanes();
            return if from.scalar_type().is_ptr() && to.scalar_type().is_ptr() && same_shape {
                Ok(())
            } else {
                invalid("pointers can only be bitcast to pointers of the same shape")
            };
        }
        return match (from.primitive_size_in_bits(), to.primitive_size_in_bits()) {
            (Some(a), Some(b)) if a == b => Ok(()),
            _ => invalid("bit sizes differ"),
        };
    }

    if from.lanes() != to.lanes() {
        return invalid("vector shapes differ");
    }

    match op.opcode {
        OpCode::SExt | OpCode::ZExt if to.int_width() <= from.int_width() => {
            invalid("destination must be wider than the source")
        }
        OpCode::Trunc if to.int_width() >= from.int_width() => {
            invalid("destination must be narrower than the source")
        }
        OpCode::FPExt if to.float_width() <= from.float_width() => {
            invalid("destination must be wider than the source")
        }
        OpCode::FPTrunc if to.float_width() >= from.float_width() => {
            invalid("destination must be narrower than the source")
        }
        _ => Ok(()),
    }
}

pub fn verify_alloca(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let result = ctx.result_type(op);
    match result.pointee() {
        Some(pointee) if pointee.is_first_class() => Ok(()),
        Some(pointee) => Err(VerifyErrorKind::InvalidAllocation(pointee.clone())),
        None => Err(VerifyErrorKind::InvalidAllocation(result.clone())),
    }
}

pub fn verify_load(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let addr = ctx.operand_type(op, 0);
    let pointee = addr.pointee().unwrap_or(addr);
    expect_type("result", pointee, ctx.result_type(op))
}

pub fn verify_store(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let addr = ctx.operand_type(op, 1);
    let pointee = addr.pointee().unwrap_or(addr);
    expect_type("stored value", pointee, ctx.operand_type(op, 0))
}

/// The first index steps over the base pointer, the rest walk into the pointee.
pub fn verify_gep(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let base = ctx.operand_type(op, 0);
    let mut current = base;
    for (position, index) in op.operands.iter().skip(1).enumerate() {
        let index_number = position + 1;
        current = match current {
            Type::Ptr(inner) if position == 0 => inner.as_ref(),
            Type::Array(_, inner) | Type::Vector(_, inner) if position > 0 => inner.as_ref(),
            Type::Struct(fields) if position > 0 => {
                let field = ctx
                    .constant_int(*index)
                    .and_then(|x| usize::try_from(x).ok())
                    .and_then(|x| fields.get(x));
                match field {
                    Some(field) => field,
                    None => {
                        return Err(VerifyErrorKind::StructIndexNotConstant {
                            index: index_number,
                        });
                    }
                }
            }
            other => {
                return Err(VerifyErrorKind::InvalidGepIndex {
                    index: index_number,
                    ty: other.clone(),
                });
            }
        };
    }
    let expected = if op.operands.len() > 1 {
        Type::ptr(current.clone())
    } else {
        base.clone()
    };
    expect_type("result", &expected, ctx.result_type(op))
}

pub fn verify_call(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    if op.results.len() > 1 {
        return Err(VerifyErrorKind::CallResultArity {
            found: op.results.len(),
        });
    }

    let (signature, args): (&FunctionType, _) = match op.attribute("callee") {
        Some(Attribute::Symbol(name)) => {
            let symbol = ctx.symbols.lookup(name)?;
            let Some(signature) = symbol.function_type() else {
                return Err(VerifyErrorKind::CalleeNotFunction { name: name.clone() });
            };
            (signature, &op.operands[..])
        }
        _ => {
            let Some(callee) = op.operands.first() else {
                return Err(VerifyErrorKind::IndirectCallee { found: None });
            };
            let ty = ctx.ty(*callee);
            match ty.pointee() {
                Some(Type::Func(signature)) => (signature.as_ref(), &op.operands[1..]),
                _ => {
                    return Err(VerifyErrorKind::IndirectCallee {
                        found: Some(ty.clone()),
                    });
                }
            }
        }
    };

    let arity_ok = if signature.variadic {
        args.len() >= signature.params.len()
    } else {
        args.len() == signature.params.len()
    };
    if !arity_ok {
        return Err(VerifyErrorKind::CallArgumentCount {
            expected: signature.params.len(),
            variadic: signature.variadic,
            found: args.len(),
        });
    }
    for (index, (param, arg)) in signature.params.iter().zip(args).enumerate() {
        expect_type(&format!("argument #{index}"), param, ctx.ty(*arg))?;
    }

    let expected_results = usize::from(!signature.returns_void());
    if op.results.len() != expected_results {
        return Err(VerifyErrorKind::CallResultCount {
            expected: expected_results,
            found: op.results.len(),
        });
    }
    if let Some(result) = op.result() {
        expect_type("result", &signature.result, ctx.ty(result))?;
    }
    Ok(())
}

pub fn verify_extractelement(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let vector = ctx.operand_type(op, 0);
    let element = vector.element_type().unwrap_or(vector);
    expect_type("result", element, ctx.result_type(op))
}

pub fn verify_insertelement(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let vector = ctx.operand_type(op, 1);
    let element = vector.element_type().unwrap_or(vector);
    expect_type("inserted value", element, ctx.operand_type(op, 0))?;
    expect_type("result", vector, ctx.result_type(op))
}

pub fn verify_shufflevector(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let v1 = ctx.operand_type(op, 0);
    let v2 = ctx.operand_type(op, 1);
    // The first operand is a vector by construction.
    let (Some(n1), Some(element)) = (v1.lanes(), v1.element_type()) else {
        return Ok(());
    };
    let n2 = match v2 {
        Type::Vector(lanes, inner) if inner.as_ref() == element => *lanes,
        Type::Vector(lanes, _) => {
            return Err(VerifyErrorKind::mismatch(
                "second operand",
                &Type::vector(*lanes, element.clone()),
                v2,
            ));
        }
        _ => return Err(VerifyErrorKind::mismatch("second operand", v1, v2)),
    };

    let mask = op
        .attribute("mask")
        .and_then(Attribute::as_int_array)
        .unwrap_or_default();
    let bound = i64::from(n1) + i64::from(n2);
    if let Some((index, value)) = mask
        .iter()
        .enumerate()
        .find(|(_, x)| !(-1..bound).contains(*x))
    {
        return Err(VerifyErrorKind::ShuffleMaskIndex {
            index,
            value: *value,
            bound,
        });
    }

    let expected = Type::vector(mask_lanes(mask.len())?, element.clone());
    expect_type("result", &expected, ctx.result_type(op))
}

/// Lane count of a shuffle result with a mask of `len` elements.
fn mask_lanes(len: usize) -> std::result::Result<u32, VerifyErrorKind> {
    u32::try_from(len).map_err(|_| VerifyErrorKind::ShuffleMaskLength(len))
}

fn position_of(op: &Operation) -> Vec<i64> {
    op.attribute("position")
        .and_then(Attribute::as_int_array)
        .unwrap_or_default()
}

fn member<'t>(container: &'t Type, position: &[i64]) -> std::result::Result<&'t Type, VerifyErrorKind> {
    let found = if position.is_empty() {
        None
    } else {
        container.aggregate_member(position)
    };
    found.ok_or_else(|| VerifyErrorKind::InvalidPosition {
        position: position.to_vec(),
        ty: container.clone(),
    })
}

pub fn verify_extractvalue(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let container = ctx.operand_type(op, 0);
    let member = member(container, &position_of(op))?;
    expect_type("result", member, ctx.result_type(op))
}

pub fn verify_insertvalue(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let container = ctx.operand_type(op, 1);
    let member = member(container, &position_of(op))?;
    expect_type("inserted value", member, ctx.operand_type(op, 0))?;
    expect_type("result", container, ctx.result_type(op))
}

pub fn verify_select(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let condition = ctx.operand_type(op, 0);
    let ty = ctx.operand_type(op, 1);
    expect_type("false value", ty, ctx.operand_type(op, 2))?;
    expect_type("result", ty, ctx.result_type(op))?;
    if let Some(lanes) = condition.lanes() {
        if ty.lanes() != Some(lanes) {
            return Err(VerifyErrorKind::SelectShape {
                condition: condition.clone(),
                ty: ty.clone(),
            });
        }
    }
    Ok(())
}

pub fn verify_return(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    if op.operands.len() > 1 {
        return Err(VerifyErrorKind::ReturnArity {
            found: op.operands.len(),
        });
    }
    let Some(function) = ctx.function else {
        return Ok(());
    };
    let expected = usize::from(!function.returns_void());
    if op.operands.len() != expected {
        return Err(VerifyErrorKind::ReturnCount {
            expected,
            found: op.operands.len(),
        });
    }
    if let Some(value) = op.operands.first() {
        expect_type("returned value", &function.result, ctx.ty(*value))?;
    }
    Ok(())
}

pub fn verify_global(op: &Operation, _ctx: &VerifyCtx<'_>) -> Result {
    let Some(ty) = op.attribute("global_type").and_then(Attribute::as_type) else {
        return Ok(());
    };
    if !ty.is_first_class() {
        return Err(VerifyErrorKind::InvalidAllocation(ty.clone()));
    }
    let Some(value) = op.attribute("value") else {
        return Ok(());
    };
    if let Some(found) = value.literal_type() {
        if found != *ty {
            return Err(VerifyErrorKind::Initializer {
                expected: ty.clone(),
                found,
            });
        }
    }
    check_literal(value)
}

pub fn verify_addressof(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let Some(Attribute::Symbol(name)) = op.attribute("global_name") else {
        return Ok(());
    };
    let symbol = ctx.symbols.lookup(name)?;
    expect_type("result", &symbol.address_type(), ctx.result_type(op))
}

pub fn verify_constant(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let Some(value) = op.attribute("value") else {
        return Ok(());
    };
    let Some(literal) = value.literal_type() else {
        return Ok(());
    };
    expect_type("result", &literal, ctx.result_type(op))?;
    check_literal(value)
}

/// The signature attribute and, for definitions, the entry block arguments.
pub fn verify_func(op: &Operation, ctx: &VerifyCtx<'_>) -> Result {
    let Some(ty) = op.attribute("function_type").and_then(Attribute::as_type) else {
        return Ok(());
    };
    let Type::Func(signature) = ty else {
        return Err(VerifyErrorKind::NotAFunctionType(ty.clone()));
    };
    let Some(entry) = op.regions.first().and_then(|x| x.entry()) else {
        return Ok(());
    };
    if entry.arguments.len() != signature.params.len() {
        return Err(VerifyErrorKind::EntryArgumentCount {
            expected: signature.params.len(),
            found: entry.arguments.len(),
        });
    }
    for (index, (param, arg)) in signature.params.iter().zip(&entry.arguments).enumerate() {
        expect_type(&format!("entry block argument #{index}"), param, ctx.ty(*arg))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_lanes_fit_a_vector() {
        assert_eq!(mask_lanes(4), Ok(4));
        assert_eq!(mask_lanes(u32::MAX as usize), Ok(u32::MAX));
        if usize::BITS > u32::BITS {
            assert_eq!(
                mask_lanes(usize::MAX),
                Err(VerifyErrorKind::ShuffleMaskLength(usize::MAX))
            );
        }
    }
}
