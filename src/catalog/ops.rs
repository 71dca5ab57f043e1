use crate::asm::{call, control, func, globals, memory, vector};
use crate::check::rules;
use crate::ir::EnumKind;

use super::{
    AttrKind, Catalog, DefinitionError, OpCode, OperationSpec, TraitSet, TypeConstraint as C,
};

const PURE: TraitSet = TraitSet::SIDE_EFFECT_FREE;
const SAME: TraitSet = TraitSet::SAME_OPERANDS_AND_RESULT_TYPE;
const COMMUTATIVE: TraitSet = TraitSet::COMMUTATIVE;

pub(super) fn register_all(catalog: &mut Catalog) -> Result<(), DefinitionError> {
    for (opcode, commutative) in [
        (OpCode::Add, true),
        (OpCode::Sub, false),
        (OpCode::Mul, true),
        (OpCode::UDiv, false),
        (OpCode::SDiv, false),
        (OpCode::URem, false),
        (OpCode::SRem, false),
        (OpCode::And, true),
        (OpCode::Or, true),
        (OpCode::Xor, true),
        (OpCode::Shl, false),
        (OpCode::LShr, false),
        (OpCode::AShr, false),
    ] {
        catalog.register(binary(opcode, C::IntLike, commutative))?;
    }

    for (opcode, commutative) in [
        (OpCode::FAdd, true),
        (OpCode::FSub, false),
        (OpCode::FMul, true),
        (OpCode::FDiv, false),
        (OpCode::FRem, false),
    ] {
        catalog.register(binary(opcode, C::FloatLike, commutative))?;
    }

    catalog.register(
        OperationSpec::new(OpCode::FNeg)
            .operand("operand", C::FloatLike)
            .result("res", C::FloatLike)
            .traits(PURE | SAME),
    )?;

    catalog.register(
        OperationSpec::new(OpCode::ICmp)
            .attribute("predicate", AttrKind::Enum(EnumKind::IntPredicate))
            .operand("lhs", C::IntOrPtrLike)
            .operand("rhs", C::IntOrPtrLike)
            .result("res", C::BoolLike)
            .traits(PURE)
            .verifier(rules::verify_compare),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::FCmp)
            .attribute("predicate", AttrKind::Enum(EnumKind::FloatPredicate))
            .operand("lhs", C::FloatLike)
            .operand("rhs", C::FloatLike)
            .result("res", C::BoolLike)
            .traits(PURE)
            .verifier(rules::verify_compare),
    )?;

    for (opcode, from, to) in [
        (OpCode::Bitcast, C::Value, C::Value),
        (OpCode::IntToPtr, C::IntLike, C::PointerLike),
        (OpCode::PtrToInt, C::PointerLike, C::IntLike),
        (OpCode::SExt, C::IntLike, C::IntLike),
        (OpCode::ZExt, C::IntLike, C::IntLike),
        (OpCode::Trunc, C::IntLike, C::IntLike),
        (OpCode::SIToFP, C::IntLike, C::FloatLike),
        (OpCode::UIToFP, C::IntLike, C::FloatLike),
        (OpCode::FPToSI, C::FloatLike, C::IntLike),
        (OpCode::FPToUI, C::FloatLike, C::IntLike),
        (OpCode::FPExt, C::FloatLike, C::FloatLike),
        (OpCode::FPTrunc, C::FloatLike, C::FloatLike),
    ] {
        catalog.register(
            OperationSpec::new(opcode)
                .operand("arg", from)
                .result("res", to)
                .traits(PURE)
                .verifier(rules::verify_cast),
        )?;
    }

    catalog.register(
        OperationSpec::new(OpCode::Alloca)
            .operand("array_size", C::Int)
            .result("res", C::Pointer)
            .optional_attribute("alignment", AttrKind::Integer)
            .custom_format(memory::parse_alloca, memory::print_alloca)
            .verifier(rules::verify_alloca),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Load)
            .operand("addr", C::Pointer)
            .result("res", C::Value)
            .optional_attribute("alignment", AttrKind::Integer)
            .optional_attribute("volatile", AttrKind::Unit)
            .custom_format(memory::parse_load, memory::print_load)
            .verifier(rules::verify_load),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Store)
            .operand("value", C::Value)
            .operand("addr", C::Pointer)
            .optional_attribute("alignment", AttrKind::Integer)
            .optional_attribute("volatile", AttrKind::Unit)
            .custom_format(memory::parse_store, memory::print_store)
            .verifier(rules::verify_store),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::GetElementPtr)
            .operand("base", C::Pointer)
            .variadic_operand("indices", C::IntLike)
            .result("res", C::Pointer)
            .optional_attribute("inbounds", AttrKind::Unit)
            .traits(PURE)
            .custom_format(memory::parse_gep, memory::print_gep)
            .verifier(rules::verify_gep),
    )?;

    // Without a callee the first operand is the function pointer.
    catalog.register(
        OperationSpec::new(OpCode::Call)
            .variadic_operand("args", C::Value)
            .variadic_result("res", C::Value)
            .optional_attribute("callee", AttrKind::Symbol)
            .custom_format(call::parse_call, call::print_call)
            .verifier(rules::verify_call),
    )?;

    catalog.register(
        OperationSpec::new(OpCode::ExtractElement)
            .operand("vector", C::Vector)
            .operand("position", C::Int)
            .result("res", C::Value)
            .traits(PURE)
            .custom_format(vector::parse_extractelement, vector::print_extractelement)
            .verifier(rules::verify_extractelement),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::InsertElement)
            .operand("value", C::Value)
            .operand("vector", C::Vector)
            .operand("position", C::Int)
            .result("res", C::Vector)
            .traits(PURE)
            .custom_format(vector::parse_insertelement, vector::print_insertelement)
            .verifier(rules::verify_insertelement),
    )?;
    // The second operand is left open here, its shape is a verifier rule.
    catalog.register(
        OperationSpec::new(OpCode::ShuffleVector)
            .operand("v1", C::Vector)
            .operand("v2", C::Value)
            .attribute("mask", AttrKind::IntArray)
            .result("res", C::Vector)
            .traits(PURE)
            .custom_format(vector::parse_shufflevector, vector::print_shufflevector)
            .verifier(rules::verify_shufflevector),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::ExtractValue)
            .operand("container", C::Aggregate)
            .attribute("position", AttrKind::IntArray)
            .result("res", C::Value)
            .traits(PURE)
            .custom_format(vector::parse_extractvalue, vector::print_extractvalue)
            .verifier(rules::verify_extractvalue),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::InsertValue)
            .operand("value", C::Value)
            .operand("container", C::Aggregate)
            .attribute("position", AttrKind::IntArray)
            .result("res", C::Aggregate)
            .traits(PURE)
            .custom_format(vector::parse_insertvalue, vector::print_insertvalue)
            .verifier(rules::verify_insertvalue),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Select)
            .operand("condition", C::BoolLike)
            .operand("true_value", C::Value)
            .operand("false_value", C::Value)
            .result("res", C::Value)
            .traits(PURE)
            .custom_format(vector::parse_select, vector::print_select)
            .verifier(rules::verify_select),
    )?;

    catalog.register(
        OperationSpec::new(OpCode::Br)
            .traits(TraitSet::TERMINATOR)
            .successors(1)
            .custom_format(control::parse_br, control::print_br),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::CondBr)
            .operand("condition", C::Bool)
            .traits(TraitSet::TERMINATOR)
            .successors(2)
            .custom_format(control::parse_cond_br, control::print_cond_br),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Return)
            .variadic_operand("args", C::Value)
            .traits(TraitSet::TERMINATOR)
            .successors(0)
            .custom_format(control::parse_return, control::print_return)
            .verifier(rules::verify_return),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Unreachable)
            .traits(TraitSet::TERMINATOR)
            .successors(0)
            .custom_format(control::parse_unreachable, control::print_unreachable),
    )?;

    catalog.register(
        OperationSpec::new(OpCode::Global)
            .attribute("sym_name", AttrKind::String)
            .attribute("global_type", AttrKind::Type)
            .optional_attribute("constant", AttrKind::Unit)
            .optional_attribute("value", AttrKind::Literal)
            .optional_attribute("linkage", AttrKind::Enum(EnumKind::Linkage))
            .custom_format(globals::parse_global, globals::print_global)
            .verifier(rules::verify_global),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::AddressOf)
            .attribute("global_name", AttrKind::Symbol)
            .result("res", C::Pointer)
            .traits(PURE)
            .custom_format(globals::parse_addressof, globals::print_addressof)
            .verifier(rules::verify_addressof),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Constant)
            .attribute("value", AttrKind::Literal)
            .result("res", C::Value)
            .traits(PURE)
            .custom_format(globals::parse_constant, globals::print_constant)
            .verifier(rules::verify_constant),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Undef)
            .result("res", C::Value)
            .traits(PURE)
            .custom_format(globals::parse_undef, globals::print_undef),
    )?;
    catalog.register(
        OperationSpec::new(OpCode::Null)
            .result("res", C::Pointer)
            .traits(PURE)
            .custom_format(globals::parse_null, globals::print_null),
    )?;

    catalog.register(
        OperationSpec::new(OpCode::Func)
            .attribute("sym_name", AttrKind::String)
            .attribute("function_type", AttrKind::Type)
            .optional_attribute("linkage", AttrKind::Enum(EnumKind::Linkage))
            .region("body")
            .traits(TraitSet::ISOLATED_FROM_ABOVE)
            .custom_format(func::parse_func, func::print_func)
            .verifier(rules::verify_func),
    )?;

    Ok(())
}

fn binary(opcode: OpCode, constraint: C, commutative: bool) -> OperationSpec {
    let spec = OperationSpec::new(opcode)
        .operand("lhs", constraint)
        .operand("rhs", constraint)
        .result("res", constraint)
        .traits(PURE | SAME);
    if commutative {
        spec.traits(COMMUTATIVE)
    } else {
        spec
    }
}
