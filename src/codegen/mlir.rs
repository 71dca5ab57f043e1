//! Replays a recorded host module as MLIR `llvm` dialect operations and checks
//! it with MLIR's own verifier.
//!
//! The module is written in MLIR's generic operation form with opaque pointers,
//! so pointee types only survive as `elem_type` properties.

use itertools::Itertools;
use melior::{
    Context,
    dialect::DialectRegistry,
    ir::Module,
    utility::{register_all_dialects, register_all_llvm_translations},
};
use tracing::debug;

use crate::ir::{Attribute, EnumAttribute, Type};

use super::errors::HostError;
use super::host::HostResult;
use super::recording::{InstKind, Instruction, RecordedFunction, RecordingHost};

/// Marks a dynamic index in `rawConstantIndices`.
const DYNAMIC_INDEX: i64 = i32::MIN as i64;

pub fn initialize_mlir() -> Context {
    let context = Context::new();
    context.append_dialect_registry(&{
        let registry = DialectRegistry::new();
        register_all_dialects(&registry);
        registry
    });
    context.load_all_available_dialects();
    register_all_llvm_translations(&context);
    context
}

/// Renders `host` and returns the module as MLIR prints it back.
pub fn to_mlir(host: &RecordingHost) -> HostResult<String> {
    let source = render(host)?;
    debug!("replaying {} bytes of llvm dialect", source.len());
    let context = initialize_mlir();
    let module = Module::parse(&context, &source)
        .ok_or_else(|| HostError::Rejected("MLIR failed to parse the replayed module".into()))?;
    if !module.as_operation().verify() {
        return Err(HostError::Rejected(
            "the replayed module fails MLIR verification".into(),
        ));
    }
    Ok(module.as_operation().to_string())
}

fn mlir_type(ty: &Type) -> String {
    match ty {
        Type::Void => "!llvm.void".to_string(),
        Type::Int(width) => format!("i{width}"),
        Type::Float(kind) => kind.keyword().to_string(),
        Type::Ptr(_) => "!llvm.ptr".to_string(),
        Type::Vector(lanes, inner) => format!("vector<{lanes}x{}>", mlir_type(inner)),
        Type::Array(len, inner) => format!("!llvm.array<{len} x {}>", mlir_type(inner)),
        Type::Struct(fields) => {
            format!("!llvm.struct<({})>", fields.iter().map(mlir_type).join(", "))
        }
        Type::Func(func) => {
            let mut params = func.params.iter().map(mlir_type).collect_vec();
            if func.variadic {
                params.push("...".to_string());
            }
            format!("!llvm.func<{} ({})>", mlir_type(&func.result), params.join(", "))
        }
    }
}

fn mlir_attribute(value: &Attribute) -> HostResult<String> {
    Ok(match value {
        Attribute::Unit => "unit".to_string(),
        Attribute::Bool(value) => value.to_string(),
        Attribute::Integer { value, ty } => format!("{value} : {}", mlir_type(ty)),
        Attribute::Float { value, ty } => {
            // Decimal literals need a dot, anything else goes out as raw bits.
            let decimal = format!("{value:?}");
            if decimal.contains('.') && value.is_finite() {
                format!("{decimal} : {}", mlir_type(ty))
            } else {
                format!("0x{:016X} : {}", value.to_bits(), mlir_type(ty))
            }
        }
        Attribute::String(value) => format!("\"{}\"", value.escape_default()),
        Attribute::Symbol(name) => format!("@{name}"),
        Attribute::Type(ty) => mlir_type(ty),
        other => return Err(HostError::Rejected(format!("no MLIR form for {other}"))),
    })
}

fn i32_array(values: &[i64]) -> String {
    format!("array<i32: {}>", values.iter().join(", "))
}

fn render(host: &RecordingHost) -> HostResult<String> {
    let mut out = String::from("module {\n");
    for global in host.globals() {
        let mut properties = vec![
            format!("global_type = {}", mlir_type(&global.ty)),
            format!("linkage = #llvm.linkage<{}>", global.linkage.keyword()),
            format!("sym_name = \"{}\"", global.name),
        ];
        if global.constant {
            properties.push("constant".to_string());
        }
        if let Some(value) = &global.initializer {
            properties.push(format!("value = {}", mlir_attribute(value)?));
        }
        out.push_str(&format!(
            "  \"llvm.mlir.global\"() <{{{}}}> ({{\n  }}) : () -> ()\n",
            properties.join(", ")
        ));
    }
    for function in host.functions() {
        render_function(host, function, &mut out)?;
    }
    out.push_str("}\n");
    Ok(out)
}

fn render_function(
    host: &RecordingHost,
    function: &RecordedFunction,
    out: &mut String,
) -> HostResult<()> {
    let properties = format!(
        "function_type = {}, linkage = #llvm.linkage<{}>, sym_name = \"{}\"",
        mlir_type(&Type::Func(Box::new(function.signature.clone()))),
        function.linkage.keyword(),
        function.name
    );
    out.push_str(&format!("  \"llvm.func\"() <{{{properties}}}> ({{\n"));
    for (index, block) in function.blocks.iter().enumerate() {
        let arguments = block
            .arguments
            .iter()
            .map(|x| -> HostResult<String> {
                Ok(format!("%v{x}: {}", mlir_type(value_type(host, *x)?)))
            })
            .collect::<HostResult<Vec<_>>>()?;
        out.push_str(&format!("  ^bb{index}({}):\n", arguments.join(", ")));
        for instruction in &block.instructions {
            out.push_str("    ");
            out.push_str(&render_instruction(host, instruction)?);
            out.push('\n');
        }
    }
    out.push_str("  }) : () -> ()\n");
    Ok(())
}

fn value_type(host: &RecordingHost, value: usize) -> HostResult<&Type> {
    host.value_type(value).ok_or(HostError::UnknownValue(value))
}

fn render_instruction(host: &RecordingHost, instruction: &Instruction) -> HostResult<String> {
    let operands = &instruction.operands;
    let operand_types = operands
        .iter()
        .map(|x| value_type(host, *x).map(mlir_type))
        .collect::<HostResult<Vec<_>>>()?;

    let mut name = format!("llvm.{}", instruction.kind.name());
    let mut successors = String::new();
    let mut properties = Vec::new();
    match &instruction.kind {
        InstKind::ICmp(predicate) => {
            properties.push(format!("predicate = {} : i64", predicate.code()))
        }
        InstKind::FCmp(predicate) => {
            properties.push(format!("predicate = {} : i64", predicate.code()))
        }
        InstKind::Alloca { element, alignment } => {
            properties.push(format!("elem_type = {}", mlir_type(element)));
            if let Some(alignment) = alignment {
                properties.push(format!("alignment = {alignment} : i64"));
            }
        }
        InstKind::Load(access) | InstKind::Store(access) => {
            if let Some(alignment) = access.alignment {
                properties.push(format!("alignment = {alignment} : i64"));
            }
            if access.volatile {
                properties.push("volatile_".to_string());
            }
        }
        // inbounds is not carried over.
        InstKind::Gep { element, .. } => {
            properties.push(format!("elem_type = {}", mlir_type(element)));
            let indices = vec![DYNAMIC_INDEX; operands.len().saturating_sub(1)];
            properties.push(format!("rawConstantIndices = {}", i32_array(&indices)));
        }
        InstKind::Call(callee) => {
            if let Some(callee) = callee {
                properties.push(format!("callee = @{callee}"));
            }
            let segments = [operands.len() as i64, 0];
            properties.push(format!("operandSegmentSizes = {}", i32_array(&segments)));
            properties.push("op_bundle_sizes = array<i32>".to_string());
        }
        InstKind::ShuffleVector(mask) => properties.push(format!("mask = {}", i32_array(mask))),
        InstKind::ExtractValue(position) | InstKind::InsertValue(position) => {
            properties.push(format!("position = array<i64: {}>", position.iter().join(", ")))
        }
        InstKind::AddressOf(global) => properties.push(format!("global_name = @{global}")),
        InstKind::Constant(value) => properties.push(format!("value = {}", mlir_attribute(value)?)),
        InstKind::Undef => name = "llvm.mlir.undef".to_string(),
        InstKind::Null => name = "llvm.mlir.zero".to_string(),
        InstKind::Br(block) => successors = format!("[^bb{block}]"),
        InstKind::CondBr {
            then,
            otherwise,
            split,
        } => {
            successors = format!("[^bb{then}, ^bb{otherwise}]");
            let rest = operands.len().saturating_sub(1 + split) as i64;
            properties.push(format!(
                "operandSegmentSizes = {}",
                i32_array(&[1, *split as i64, rest])
            ));
        }
        InstKind::Ret => name = "llvm.return".to_string(),
        _ => {}
    }
    if matches!(instruction.kind, InstKind::AddressOf(_) | InstKind::Constant(_)) {
        name = format!("llvm.mlir.{}", instruction.kind.name());
    }

    let result = match instruction.result {
        Some(result) => mlir_type(value_type(host, result)?),
        None => "()".to_string(),
    };
    let properties = if properties.is_empty() {
        String::new()
    } else {
        format!(" <{{{}}}>", properties.join(", "))
    };
    let assigned = instruction
        .result
        .map(|x| format!("%v{x} = "))
        .unwrap_or_default();
    Ok(format!(
        "{assigned}\"{name}\"({}){successors}{properties} : ({}) -> {result}",
        operands.iter().map(|x| format!("%v{x}")).join(", "),
        operand_types.join(", ")
    ))
}
