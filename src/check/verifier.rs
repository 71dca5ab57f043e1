//! Structural verification of a constructed module.
//!
//! Verification runs once per module and produces a [`VerifiedModule`], the only
//! thing the lowering engine accepts.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::catalog::{Catalog, OpCode, TraitSet};
use crate::ir::{Attribute, Block, FunctionType, Module, Operation, Region, Type, ValueId};

use super::constraints;
use super::errors::{VerificationError, VerifyErrorKind};
use super::symbols::SymbolTable;

/// A module that passed verification. Borrowing the module keeps it from
/// changing while the proof is alive.
#[derive(Debug)]
pub struct VerifiedModule<'m> {
    module: &'m Module,
    symbols: SymbolTable,
}

impl<'m> VerifiedModule<'m> {
    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}

/// What a per operation verifier hook can see.
///
/// Hooks run after the constraint checks, so operand and result counts already
/// match the catalog entry and every value belongs to the module.
pub struct VerifyCtx<'a> {
    pub module: &'a Module,
    pub symbols: &'a SymbolTable,
    /// Signature of the function being verified, if inside one.
    pub function: Option<&'a FunctionType>,
    constants: HashMap<ValueId, i64>,
}

impl<'a> VerifyCtx<'a> {
    fn new(module: &'a Module, symbols: &'a SymbolTable) -> Self {
        Self {
            module,
            symbols,
            function: None,
            constants: HashMap::new(),
        }
    }

    pub fn ty(&self, value: ValueId) -> &'a Type {
        &self.module.values[value].ty
    }

    pub fn operand_type(&self, op: &Operation, index: usize) -> &'a Type {
        self.ty(op.operands[index])
    }

    pub fn result_type(&self, op: &Operation) -> &'a Type {
        self.ty(op.results[0])
    }

    /// The value of an integer defined by `llvm.mlir.constant` in the current function.
    pub fn constant_int(&self, value: ValueId) -> Option<i64> {
        self.constants.get(&value).copied()
    }
}

#[instrument(level = "debug", skip_all)]
pub fn verify_module(module: &Module) -> Result<VerifiedModule<'_>, VerificationError> {
    let symbols = SymbolTable::build(module);
    let catalog = Catalog::builtin();

    for op in &module.body {
        let error = |kind| VerificationError {
            op: op.name(),
            span: op.span,
            kind,
        };
        if !matches!(op.opcode, OpCode::Global | OpCode::Func) {
            return Err(error(VerifyErrorKind::AtModuleScope));
        }
        // Symbol definitions must be unique even when nothing refers to them.
        if let Some(name) = op.symbol_name() {
            symbols.lookup(name).map_err(|e| error(e.into()))?;
        }

        let mut ctx = VerifyCtx::new(module, &symbols);
        if let Some(function) = op.function_type() {
            ctx.function = Some(function);
            ctx.constants = collect_constants(op);
        }
        verify_operation(catalog, op, &ctx)?;
        if let Some(name) = op.symbol_name() {
            debug!("verified {} @{}", op.name(), name);
        }
    }

    Ok(VerifiedModule { module, symbols })
}

fn collect_constants(op: &Operation) -> HashMap<ValueId, i64> {
    let mut constants = HashMap::new();
    op.walk(&mut |op| {
        if op.opcode == OpCode::Constant {
            if let (Some(Attribute::Integer { value, .. }), Some(result)) =
                (op.attribute("value"), op.result())
            {
                constants.insert(result, *value);
            }
        }
    });
    constants
}

fn verify_operation(
    catalog: &Catalog,
    op: &Operation,
    ctx: &VerifyCtx<'_>,
) -> Result<(), VerificationError> {
    let error = |kind| VerificationError {
        op: op.name(),
        span: op.span,
        kind,
    };
    let spec = catalog.spec(op.opcode);

    constraints::check_operation(spec, op, &ctx.module.values)
        .map_err(|violation| error(VerifyErrorKind::Constraint(violation.kind)))?;

    if spec.has_trait(TraitSet::SAME_OPERANDS_AND_RESULT_TYPE) {
        let mut types = op.operands.iter().chain(&op.results).map(|x| ctx.ty(*x));
        if let Some(first) = types.next() {
            if types.any(|x| x != first) {
                return Err(error(VerifyErrorKind::NotSameType));
            }
        }
    }

    if let Some(successors) = spec.successors {
        if op.successors.len() != successors.count {
            return Err(error(VerifyErrorKind::SuccessorCount {
                expected: successors.count,
                found: op.successors.len(),
            }));
        }
    }

    if let Some(verifier) = spec.verifier {
        verifier(op, ctx).map_err(error)?;
    }

    for region in &op.regions {
        verify_region(region, op, ctx).map_err(error)?;
        if spec.has_trait(TraitSet::ISOLATED_FROM_ABOVE) {
            check_isolation(region)?;
        }
        for block in &region.blocks {
            for nested in &block.operations {
                if matches!(nested.opcode, OpCode::Global | OpCode::Func) {
                    return Err(VerificationError {
                        op: nested.name(),
                        span: nested.span,
                        kind: VerifyErrorKind::NotAtModuleScope,
                    });
                }
                verify_operation(catalog, nested, ctx)?;
            }
        }
    }

    Ok(())
}

/// Block structure of a region: terminators and successor targets.
fn verify_region(
    region: &Region,
    parent: &Operation,
    ctx: &VerifyCtx<'_>,
) -> Result<(), VerifyErrorKind> {
    for (index, block) in region.blocks.iter().enumerate() {
        let Some(last) = block.terminator() else {
            return Err(VerifyErrorKind::EmptyBlock { block: index });
        };
        if !is_terminator(last) {
            return Err(VerifyErrorKind::MissingTerminator { block: index });
        }
        for op in &block.operations[..block.operations.len() - 1] {
            if is_terminator(op) {
                return Err(VerifyErrorKind::TerminatorNotLast);
            }
        }
        verify_successors(last, &region.blocks, ctx)?;
    }
    debug!(
        "{} body has {} blocks",
        parent.symbol_name().unwrap_or(parent.name()),
        region.blocks.len()
    );
    Ok(())
}

fn is_terminator(op: &Operation) -> bool {
    Catalog::builtin().spec(op.opcode).is_terminator()
}

fn verify_successors(
    op: &Operation,
    blocks: &[Block],
    ctx: &VerifyCtx<'_>,
) -> Result<(), VerifyErrorKind> {
    for (successor, target) in op.successors.iter().enumerate() {
        if target.block == 0 {
            return Err(VerifyErrorKind::EntryBlockSuccessor { successor });
        }
        let Some(dest) = blocks.get(target.block) else {
            return Err(VerifyErrorKind::UnknownBlock {
                successor,
                block: target.block,
            });
        };
        if dest.arguments.len() != target.operands.len() {
            return Err(VerifyErrorKind::SuccessorOperandCount {
                successor,
                expected: dest.arguments.len(),
                found: target.operands.len(),
            });
        }
        for (index, (arg, passed)) in dest.arguments.iter().zip(&target.operands).enumerate() {
            let Some(found) = ctx.module.value_type(*passed) else {
                return Err(VerifyErrorKind::SuccessorNotIsolated { successor });
            };
            let expected = ctx.ty(*arg);
            if found != expected {
                return Err(VerifyErrorKind::mismatch(
                    format!("successor #{successor} operand #{index}"),
                    expected,
                    found,
                ));
            }
        }
    }
    Ok(())
}

/// Every value used inside the region must be defined inside it.
fn check_isolation(region: &Region) -> Result<(), VerificationError> {
    let mut defined = HashSet::new();
    for block in &region.blocks {
        defined.extend(block.arguments.iter().copied());
        for op in &block.operations {
            op.walk(&mut |op| defined.extend(op.results.iter().copied()));
        }
    }

    let mut result = Ok(());
    for block in &region.blocks {
        for op in &block.operations {
            op.walk(&mut |op| {
                if result.is_err() {
                    return;
                }
                let error = |kind| {
                    Err(VerificationError {
                        op: op.name(),
                        span: op.span,
                        kind,
                    })
                };
                if let Some(index) = op.operands.iter().position(|x| !defined.contains(x)) {
                    result = error(VerifyErrorKind::NotIsolated { index });
                } else if let Some(successor) = op
                    .successors
                    .iter()
                    .position(|x| x.operands.iter().any(|v| !defined.contains(v)))
                {
                    result = error(VerifyErrorKind::SuccessorNotIsolated { successor });
                }
            });
        }
    }
    result
}
