use tracing::{debug, info};

use crate::catalog::OpCode;
use crate::ir::{
    Attribute, FloatPredicate, IntPredicate, Linkage, Module, Operation, Region, Type,
};

use super::context::FunctionLoweringCtx;
use super::errors::{HostError, LoweringError, LoweringErrorKind};
use super::host::{
    BinaryOp, CastOp, Callee, FunctionDecl, GlobalDecl, HostBuilder, MemoryAccess,
};

fn binary_op(opcode: OpCode) -> Option<BinaryOp> {
    let op = match opcode {
        OpCode::Add => BinaryOp::Add,
        OpCode::Sub => BinaryOp::Sub,
        OpCode::Mul => BinaryOp::Mul,
        OpCode::UDiv => BinaryOp::UDiv,
        OpCode::SDiv => BinaryOp::SDiv,
        OpCode::URem => BinaryOp::URem,
        OpCode::SRem => BinaryOp::SRem,
        OpCode::And => BinaryOp::And,
        OpCode::Or => BinaryOp::Or,
        OpCode::Xor => BinaryOp::Xor,
        OpCode::Shl => BinaryOp::Shl,
        OpCode::LShr => BinaryOp::LShr,
        OpCode::AShr => BinaryOp::AShr,
        OpCode::FAdd => BinaryOp::FAdd,
        OpCode::FSub => BinaryOp::FSub,
        OpCode::FMul => BinaryOp::FMul,
        OpCode::FDiv => BinaryOp::FDiv,
        OpCode::FRem => BinaryOp::FRem,
        _ => return None,
    };
    Some(op)
}

fn cast_op(opcode: OpCode) -> Option<CastOp> {
    let op = match opcode {
        OpCode::Bitcast => CastOp::Bitcast,
        OpCode::IntToPtr => CastOp::IntToPtr,
        OpCode::PtrToInt => CastOp::PtrToInt,
        OpCode::SExt => CastOp::SExt,
        OpCode::ZExt => CastOp::ZExt,
        OpCode::Trunc => CastOp::Trunc,
        OpCode::SIToFP => CastOp::SIToFP,
        OpCode::UIToFP => CastOp::UIToFP,
        OpCode::FPToSI => CastOp::FPToSI,
        OpCode::FPToUI => CastOp::FPToUI,
        OpCode::FPExt => CastOp::FPExt,
        OpCode::FPTrunc => CastOp::FPTrunc,
        _ => return None,
    };
    Some(op)
}

fn linkage(op: &Operation) -> Linkage {
    op.enum_attribute("linkage").unwrap_or(Linkage::External)
}

/// The declaration of a module scope `llvm.global`.
pub(crate) fn global_decl(op: &Operation) -> Option<GlobalDecl<'_>> {
    Some(GlobalDecl {
        name: op.symbol_name()?,
        ty: op.attribute("global_type")?.as_type()?,
        constant: op.attribute("constant").is_some(),
        linkage: linkage(op),
        initializer: op.attribute("value"),
    })
}

/// The declaration of a module scope `llvm.func`.
pub(crate) fn function_decl(op: &Operation) -> Option<FunctionDecl<'_>> {
    Some(FunctionDecl {
        name: op.symbol_name()?,
        signature: op.function_type()?,
        linkage: linkage(op),
    })
}

/// The body of a function definition, `None` for declarations.
pub(crate) fn function_body(op: &Operation) -> Option<&Region> {
    op.regions.first().filter(|x| !x.is_empty())
}

/// Lowers one function definition into `host`. On failure the partially
/// built function is discarded and the host is left as it was before.
pub(crate) fn lower_function<H: HostBuilder>(
    module: &Module,
    op: &Operation,
    host: &mut H,
) -> Result<(), LoweringError> {
    let name = op.symbol_name().unwrap_or_default();
    let ctx = FunctionLoweringCtx::<H>::new(module, name);
    let Some(decl) = function_decl(op) else {
        return Err(ctx.error(op, LoweringErrorKind::Attribute("function_type")));
    };
    let Some(body) = function_body(op) else {
        return host
            .declare_function(&decl)
            .map_err(|e| ctx.error(op, e));
    };

    info!("lowering function @{}", name);
    host.begin_function(&decl).map_err(|e| ctx.error(op, e))?;
    match lower_body(ctx, op, body, host) {
        Ok(()) => host.finish_function().map_err(|e| LoweringError {
            function: name.to_string(),
            op: op.name(),
            span: op.span,
            kind: e.into(),
        }),
        Err(error) => {
            debug!("discarding @{}: {}", name, error);
            host.discard_function();
            Err(error)
        }
    }
}

fn lower_body<H: HostBuilder>(
    mut ctx: FunctionLoweringCtx<'_, H>,
    func: &Operation,
    body: &Region,
    host: &mut H,
) -> Result<(), LoweringError> {
    // All blocks exist up front so branches can target later ones.
    for block in &body.blocks {
        let types = block
            .arguments
            .iter()
            .map(|x| ctx.ty(*x).cloned().unwrap_or(Type::Void))
            .collect::<Vec<_>>();
        let (target, arguments) = host.append_block(&types).map_err(|e| ctx.error(func, e))?;
        ctx.add_block(target);
        for (source, value) in block.arguments.iter().zip(arguments) {
            ctx.bind(*source, value);
        }
    }

    for (index, block) in body.blocks.iter().enumerate() {
        host.position_at_end(ctx.block(func, index)?);
        for op in &block.operations {
            lower_operation(&mut ctx, host, op)?;
        }
    }
    debug!("lowered {} blocks", body.blocks.len());
    Ok(())
}

fn memory_access(op: &Operation) -> MemoryAccess {
    MemoryAccess {
        alignment: op
            .attribute("alignment")
            .and_then(Attribute::as_int)
            .and_then(|x| u64::try_from(x).ok()),
        volatile: op.attribute("volatile").is_some(),
    }
}

/// Lowers one operation at the host's insertion point.
fn lower_operation<H: HostBuilder>(
    ctx: &mut FunctionLoweringCtx<'_, H>,
    host: &mut H,
    op: &Operation,
) -> Result<(), LoweringError> {
    let fail = |e: HostError| ctx.error(op, e);
    let void = Type::Void;

    let value = if let Some(binary) = binary_op(op.opcode) {
        let lhs = ctx.operand(op, 0)?;
        let rhs = ctx.operand(op, 1)?;
        Some(host.binary(binary, lhs, rhs).map_err(fail)?)
    } else if let Some(cast) = cast_op(op.opcode) {
        let value = ctx.operand(op, 0)?;
        let to = ctx.result_type(op)?;
        Some(host.cast(cast, value, to).map_err(fail)?)
    } else {
        match op.opcode {
            OpCode::FNeg => Some(host.fneg(ctx.operand(op, 0)?).map_err(fail)?),
            OpCode::ICmp => {
                let predicate: IntPredicate = op
                    .enum_attribute("predicate")
                    .ok_or_else(|| ctx.error(op, LoweringErrorKind::Attribute("predicate")))?;
                let lhs = ctx.operand(op, 0)?;
                let rhs = ctx.operand(op, 1)?;
                Some(host.icmp(predicate, lhs, rhs).map_err(fail)?)
            }
            OpCode::FCmp => {
                let predicate: FloatPredicate = op
                    .enum_attribute("predicate")
                    .ok_or_else(|| ctx.error(op, LoweringErrorKind::Attribute("predicate")))?;
                let lhs = ctx.operand(op, 0)?;
                let rhs = ctx.operand(op, 1)?;
                Some(host.fcmp(predicate, lhs, rhs).map_err(fail)?)
            }

            OpCode::Alloca => {
                let size = ctx.operand(op, 0)?;
                let element = ctx
                    .result_type(op)?
                    .pointee()
                    .ok_or_else(|| ctx.error(op, LoweringErrorKind::MissingResult))?;
                let alignment = memory_access(op).alignment;
                Some(host.alloca(element, size, alignment).map_err(fail)?)
            }
            OpCode::Load => {
                let address = ctx.operand(op, 0)?;
                let ty = ctx.result_type(op)?;
                Some(host.load(ty, address, memory_access(op)).map_err(fail)?)
            }
            OpCode::Store => {
                let value = ctx.operand(op, 0)?;
                let address = ctx.operand(op, 1)?;
                host.store(value, address, memory_access(op)).map_err(fail)?;
                None
            }
            OpCode::GetElementPtr => {
                let base = ctx.operand(op, 0)?;
                let indices = ctx.values(op, &op.operands[1..])?;
                let inbounds = op.attribute("inbounds").is_some();
                let result = ctx.result_type(op)?;
                Some(host.gep(base, &indices, inbounds, result).map_err(fail)?)
            }
            OpCode::Call => {
                let (callee, args) = match op.attribute("callee") {
                    Some(Attribute::Symbol(name)) => (Callee::Direct(name.as_str()), &op.operands[..]),
                    _ => (Callee::Indirect(ctx.operand(op, 0)?), &op.operands[1..]),
                };
                let args = ctx.values(op, args)?;
                let result = match op.result() {
                    Some(_) => ctx.result_type(op)?,
                    None => &void,
                };
                host.call(callee, &args, result).map_err(fail)?
            }

            OpCode::ExtractElement => {
                let vector = ctx.operand(op, 0)?;
                let position = ctx.operand(op, 1)?;
                Some(host.extract_element(vector, position).map_err(fail)?)
            }
            OpCode::InsertElement => {
                let value = ctx.operand(op, 0)?;
                let vector = ctx.operand(op, 1)?;
                let position = ctx.operand(op, 2)?;
                Some(host.insert_element(vector, value, position).map_err(fail)?)
            }
            OpCode::ShuffleVector => {
                let v1 = ctx.operand(op, 0)?;
                let v2 = ctx.operand(op, 1)?;
                let mask = ctx.int_array(op, "mask")?;
                Some(host.shuffle_vector(v1, v2, &mask).map_err(fail)?)
            }
            OpCode::ExtractValue => {
                let aggregate = ctx.operand(op, 0)?;
                let position = ctx.int_array(op, "position")?;
                Some(host.extract_value(aggregate, &position).map_err(fail)?)
            }
            OpCode::InsertValue => {
                let value = ctx.operand(op, 0)?;
                let aggregate = ctx.operand(op, 1)?;
                let position = ctx.int_array(op, "position")?;
                Some(host.insert_value(aggregate, value, &position).map_err(fail)?)
            }
            OpCode::Select => {
                let condition = ctx.operand(op, 0)?;
                let true_value = ctx.operand(op, 1)?;
                let false_value = ctx.operand(op, 2)?;
                Some(host.select(condition, true_value, false_value).map_err(fail)?)
            }

            OpCode::AddressOf => {
                let name = match ctx.attribute(op, "global_name")? {
                    Attribute::Symbol(name) => name,
                    _ => return Err(ctx.error(op, LoweringErrorKind::Attribute("global_name"))),
                };
                let ty = ctx.result_type(op)?;
                Some(host.address_of(name, ty).map_err(fail)?)
            }
            OpCode::Constant => {
                let value = ctx.attribute(op, "value")?;
                let ty = ctx.result_type(op)?;
                Some(host.constant(value, ty).map_err(fail)?)
            }
            OpCode::Undef => Some(host.undef(ctx.result_type(op)?).map_err(fail)?),
            OpCode::Null => Some(host.null(ctx.result_type(op)?).map_err(fail)?),

            OpCode::Br => {
                let (block, args) = successor(ctx, op, 0)?;
                host.br((block, args.as_slice())).map_err(fail)?;
                None
            }
            OpCode::CondBr => {
                let condition = ctx.operand(op, 0)?;
                let (then, then_args) = successor(ctx, op, 0)?;
                let (otherwise, otherwise_args) = successor(ctx, op, 1)?;
                host.cond_br(
                    condition,
                    (then, then_args.as_slice()),
                    (otherwise, otherwise_args.as_slice()),
                )
                .map_err(fail)?;
                None
            }
            OpCode::Return => {
                let value = match op.operands.first() {
                    Some(value) => Some(ctx.value(op, *value)?),
                    None => None,
                };
                host.ret(value).map_err(fail)?;
                None
            }
            OpCode::Unreachable => {
                host.unreachable().map_err(fail)?;
                None
            }

            _ => return Err(ctx.error(op, LoweringErrorKind::NotLowerable)),
        }
    };

    if let Some(value) = value {
        ctx.bind_result(op, value);
    }
    Ok(())
}

/// The `index`-th successor's block and the host values of its operand bundle.
fn successor<H: HostBuilder>(
    ctx: &FunctionLoweringCtx<'_, H>,
    op: &Operation,
    index: usize,
) -> Result<(H::Block, Vec<H::Value>), LoweringError> {
    let Some(successor) = op.successors.get(index) else {
        return Err(ctx.error(op, LoweringErrorKind::UnknownBlock(index)));
    };
    let block = ctx.block(op, successor.block)?;
    let args = ctx.values(op, &successor.operands)?;
    Ok((block, args))
}
