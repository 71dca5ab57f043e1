//! An in-memory host that records every construction call.
//!
//! It backs the `--emit host` output and the lowering tests, and it is what the
//! MLIR replay reads from.

use std::fmt;

use educe::Educe;
use itertools::Itertools;
use tracing::trace;

use crate::ir::{
    Attribute, FloatPredicate, FunctionType, IntPredicate, Linkage, Type,
};

use super::errors::HostError;
use super::host::{
    BinaryOp, CastOp, Callee, FunctionDecl, GlobalDecl, HostBuilder, HostResult, MemoryAccess,
    Target,
};

/// What a recorded instruction does. Operand values live in [`Instruction::operands`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Binary(BinaryOp),
    FNeg,
    ICmp(IntPredicate),
    FCmp(FloatPredicate),
    Cast(CastOp),
    Alloca {
        element: Type,
        alignment: Option<u64>,
    },
    Load(MemoryAccess),
    Store(MemoryAccess),
    Gep {
        element: Type,
        inbounds: bool,
    },
    /// `None` when the callee is the first operand.
    Call(Option<String>),
    ExtractElement,
    InsertElement,
    ShuffleVector(Vec<i64>),
    ExtractValue(Vec<i64>),
    InsertValue(Vec<i64>),
    Select,
    AddressOf(String),
    Constant(Attribute),
    Undef,
    Null,
    /// Operands are the block arguments.
    Br(usize),
    /// The first operand is the condition, then `split` arguments of the first
    /// destination, then the ones of the second.
    CondBr {
        then: usize,
        otherwise: usize,
        split: usize,
    },
    Ret,
    Unreachable,
}

impl InstKind {
    /// The mnemonic the instruction is listed with.
    pub fn name(&self) -> &'static str {
        match self {
            InstKind::Binary(op) => op.name(),
            InstKind::FNeg => "fneg",
            InstKind::ICmp(_) => "icmp",
            InstKind::FCmp(_) => "fcmp",
            InstKind::Cast(op) => op.name(),
            InstKind::Alloca { .. } => "alloca",
            InstKind::Load(_) => "load",
            InstKind::Store(_) => "store",
            InstKind::Gep { .. } => "getelementptr",
            InstKind::Call(_) => "call",
            InstKind::ExtractElement => "extractelement",
            InstKind::InsertElement => "insertelement",
            InstKind::ShuffleVector(_) => "shufflevector",
            InstKind::ExtractValue(_) => "extractvalue",
            InstKind::InsertValue(_) => "insertvalue",
            InstKind::Select => "select",
            InstKind::AddressOf(_) => "addressof",
            InstKind::Constant(_) => "constant",
            InstKind::Undef => "undef",
            InstKind::Null => "null",
            InstKind::Br(_) => "br",
            InstKind::CondBr { .. } => "cond_br",
            InstKind::Ret => "ret",
            InstKind::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstKind,
    pub result: Option<usize>,
    pub operands: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedBlock {
    pub arguments: Vec<usize>,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFunction {
    pub name: String,
    pub signature: FunctionType,
    pub linkage: Linkage,
    /// Empty for declarations.
    pub blocks: Vec<RecordedBlock>,
}

impl RecordedFunction {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|x| &x.instructions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGlobal {
    pub name: String,
    pub ty: Type,
    pub constant: bool,
    pub linkage: Linkage,
    pub initializer: Option<Attribute>,
}

#[derive(Debug)]
struct OpenFunction {
    function: RecordedFunction,
    /// Length of the value table when the function was opened.
    first_value: usize,
    cursor: Option<usize>,
}

/// A host whose values and blocks are plain indices.
#[derive(Educe, Default)]
#[educe(Debug)]
pub struct RecordingHost {
    globals: Vec<RecordedGlobal>,
    functions: Vec<RecordedFunction>,
    open: Option<OpenFunction>,
    #[educe(Debug(ignore))]
    types: Vec<Type>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn globals(&self) -> &[RecordedGlobal] {
        &self.globals
    }

    /// Declarations and finished definitions, in the order they were added.
    pub fn functions(&self) -> &[RecordedFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&RecordedFunction> {
        self.functions.iter().find(|x| x.name == name)
    }

    /// The type of a value produced by this host.
    pub fn value_type(&self, value: usize) -> Option<&Type> {
        self.types.get(value)
    }

    /// How many instructions named `name` all finished functions contain.
    pub fn count(&self, name: &str) -> usize {
        self.functions
            .iter()
            .flat_map(RecordedFunction::instructions)
            .filter(|x| x.kind.name() == name)
            .count()
    }

    fn ty(&self, value: usize) -> HostResult<&Type> {
        self.types.get(value).ok_or(HostError::UnknownValue(value))
    }

    fn element(&self, value: usize) -> HostResult<Type> {
        let ty = self.ty(value)?;
        ty.element_type()
            .cloned()
            .ok_or_else(|| HostError::Rejected(format!("{ty} has no element type")))
    }

    fn new_value(&mut self, ty: Type) -> usize {
        self.types.push(ty);
        self.types.len() - 1
    }

    fn open(&mut self) -> HostResult<&mut OpenFunction> {
        self.open.as_mut().ok_or(HostError::NoFunction)
    }

    fn check_block(&self, block: usize) -> HostResult<()> {
        match &self.open {
            Some(open) if block < open.function.blocks.len() => Ok(()),
            Some(_) => Err(HostError::UnknownBlock(block)),
            None => Err(HostError::NoFunction),
        }
    }

    /// Appends an instruction at the cursor, creating its result when `result` is given.
    fn emit(
        &mut self,
        kind: InstKind,
        operands: Vec<usize>,
        result: Option<Type>,
    ) -> HostResult<Option<usize>> {
        for operand in &operands {
            self.ty(*operand)?;
        }
        let open = self.open()?;
        let cursor = open.cursor.ok_or(HostError::NoInsertionPoint)?;
        if cursor >= open.function.blocks.len() {
            return Err(HostError::NoInsertionPoint);
        }

        let result = result.map(|ty| self.new_value(ty));
        trace!("recorded {} -> {:?}", kind.name(), result);
        let open = self.open()?;
        open.function.blocks[cursor].instructions.push(Instruction {
            kind,
            result,
            operands,
        });
        Ok(result)
    }

    fn emit_value(&mut self, kind: InstKind, operands: Vec<usize>, ty: Type) -> HostResult<usize> {
        self.emit(kind, operands, Some(ty))?
            .ok_or_else(|| HostError::Rejected("instruction has no result".to_string()))
    }
}

impl HostBuilder for RecordingHost {
    type Value = usize;
    type Block = usize;

    fn declare_global(&mut self, global: &GlobalDecl<'_>) -> HostResult<()> {
        self.globals.push(RecordedGlobal {
            name: global.name.to_string(),
            ty: global.ty.clone(),
            constant: global.constant,
            linkage: global.linkage,
            initializer: global.initializer.cloned(),
        });
        Ok(())
    }

    fn declare_function(&mut self, function: &FunctionDecl<'_>) -> HostResult<()> {
        self.functions.push(RecordedFunction {
            name: function.name.to_string(),
            signature: function.signature.clone(),
            linkage: function.linkage,
            blocks: Vec::new(),
        });
        Ok(())
    }

    fn begin_function(&mut self, function: &FunctionDecl<'_>) -> HostResult<()> {
        if self.open.is_some() {
            return Err(HostError::FunctionOpen);
        }
        self.open = Some(OpenFunction {
            function: RecordedFunction {
                name: function.name.to_string(),
                signature: function.signature.clone(),
                linkage: function.linkage,
                blocks: Vec::new(),
            },
            first_value: self.types.len(),
            cursor: None,
        });
        Ok(())
    }

    fn finish_function(&mut self) -> HostResult<()> {
        let open = self.open.take().ok_or(HostError::NoFunction)?;
        self.functions.push(open.function);
        Ok(())
    }

    fn discard_function(&mut self) {
        if let Some(open) = self.open.take() {
            self.types.truncate(open.first_value);
        }
    }

    fn append_block(&mut self, arguments: &[Type]) -> HostResult<(usize, Vec<usize>)> {
        self.open()?;
        let values = arguments
            .iter()
            .map(|ty| self.new_value(ty.clone()))
            .collect_vec();
        let open = self.open()?;
        open.function.blocks.push(RecordedBlock {
            arguments: values.clone(),
            instructions: Vec::new(),
        });
        Ok((open.function.blocks.len() - 1, values))
    }

    fn position_at_end(&mut self, block: usize) {
        if let Some(open) = self.open.as_mut() {
            open.cursor = Some(block);
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: usize, rhs: usize) -> HostResult<usize> {
        let ty = self.ty(lhs)?.clone();
        self.emit_value(InstKind::Binary(op), vec![lhs, rhs], ty)
    }

    fn fneg(&mut self, value: usize) -> HostResult<usize> {
        let ty = self.ty(value)?.clone();
        self.emit_value(InstKind::FNeg, vec![value], ty)
    }

    fn icmp(&mut self, predicate: IntPredicate, lhs: usize, rhs: usize) -> HostResult<usize> {
        let ty = self.ty(lhs)?.bool_like();
        self.emit_value(InstKind::ICmp(predicate), vec![lhs, rhs], ty)
    }

    fn fcmp(&mut self, predicate: FloatPredicate, lhs: usize, rhs: usize) -> HostResult<usize> {
        let ty = self.ty(lhs)?.bool_like();
        self.emit_value(InstKind::FCmp(predicate), vec![lhs, rhs], ty)
    }

    fn cast(&mut self, op: CastOp, value: usize, to: &Type) -> HostResult<usize> {
        self.emit_value(InstKind::Cast(op), vec![value], to.clone())
    }

    fn alloca(&mut self, element: &Type, size: usize, alignment: Option<u64>) -> HostResult<usize> {
        let kind = InstKind::Alloca {
            element: element.clone(),
            alignment,
        };
        self.emit_value(kind, vec![size], Type::ptr(element.clone()))
    }

    fn load(&mut self, ty: &Type, address: usize, access: MemoryAccess) -> HostResult<usize> {
        self.emit_value(InstKind::Load(access), vec![address], ty.clone())
    }

    fn store(&mut self, value: usize, address: usize, access: MemoryAccess) -> HostResult<()> {
        self.emit(InstKind::Store(access), vec![value, address], None)?;
        Ok(())
    }

    fn gep(
        &mut self,
        base: usize,
        indices: &[usize],
        inbounds: bool,
        result: &Type,
    ) -> HostResult<usize> {
        let element = self.ty(base)?.pointee().cloned().unwrap_or(Type::i8());
        let operands = std::iter::once(base).chain(indices.iter().copied()).collect();
        self.emit_value(InstKind::Gep { element, inbounds }, operands, result.clone())
    }

    fn call(
        &mut self,
        callee: Callee<'_, usize>,
        args: &[usize],
        result: &Type,
    ) -> HostResult<Option<usize>> {
        let (kind, mut operands) = match callee {
            Callee::Direct(name) => (InstKind::Call(Some(name.to_string())), Vec::new()),
            Callee::Indirect(pointer) => (InstKind::Call(None), vec![pointer]),
        };
        operands.extend_from_slice(args);
        let result = (*result != Type::Void).then(|| result.clone());
        self.emit(kind, operands, result)
    }

    fn extract_element(&mut self, vector: usize, position: usize) -> HostResult<usize> {
        let ty = self.element(vector)?;
        self.emit_value(InstKind::ExtractElement, vec![vector, position], ty)
    }

    fn insert_element(&mut self, vector: usize, value: usize, position: usize) -> HostResult<usize> {
        let ty = self.ty(vector)?.clone();
        self.emit_value(InstKind::InsertElement, vec![vector, value, position], ty)
    }

    fn shuffle_vector(&mut self, v1: usize, v2: usize, mask: &[i64]) -> HostResult<usize> {
        let lanes = u32::try_from(mask.len())
            .map_err(|_| HostError::Rejected(format!("mask of {} lanes", mask.len())))?;
        let ty = Type::vector(lanes, self.element(v1)?);
        self.emit_value(InstKind::ShuffleVector(mask.to_vec()), vec![v1, v2], ty)
    }

    fn extract_value(&mut self, aggregate: usize, position: &[i64]) -> HostResult<usize> {
        let container = self.ty(aggregate)?;
        let ty = container.aggregate_member(position).cloned().ok_or_else(|| {
            HostError::Rejected(format!("position {position:?} is out of bounds of {container}"))
        })?;
        self.emit_value(InstKind::ExtractValue(position.to_vec()), vec![aggregate], ty)
    }

    fn insert_value(&mut self, aggregate: usize, value: usize, position: &[i64]) -> HostResult<usize> {
        let ty = self.ty(aggregate)?.clone();
        self.emit_value(InstKind::InsertValue(position.to_vec()), vec![aggregate, value], ty)
    }

    fn select(&mut self, condition: usize, true_value: usize, false_value: usize) -> HostResult<usize> {
        let ty = self.ty(true_value)?.clone();
        self.emit_value(InstKind::Select, vec![condition, true_value, false_value], ty)
    }

    fn address_of(&mut self, name: &str, ty: &Type) -> HostResult<usize> {
        self.emit_value(InstKind::AddressOf(name.to_string()), Vec::new(), ty.clone())
    }

    fn constant(&mut self, value: &Attribute, ty: &Type) -> HostResult<usize> {
        self.emit_value(InstKind::Constant(value.clone()), Vec::new(), ty.clone())
    }

    fn undef(&mut self, ty: &Type) -> HostResult<usize> {
        self.emit_value(InstKind::Undef, Vec::new(), ty.clone())
    }

    fn null(&mut self, ty: &Type) -> HostResult<usize> {
        self.emit_value(InstKind::Null, Vec::new(), ty.clone())
    }

    fn br(&mut self, (block, args): Target<'_, usize, usize>) -> HostResult<()> {
        self.check_block(block)?;
        self.emit(InstKind::Br(block), args.to_vec(), None)?;
        Ok(())
    }

    fn cond_br(
        &mut self,
        condition: usize,
        (then, then_args): Target<'_, usize, usize>,
        (otherwise, otherwise_args): Target<'_, usize, usize>,
    ) -> HostResult<()> {
        self.check_block(then)?;
        self.check_block(otherwise)?;
        let operands = std::iter::once(condition)
            .chain(then_args.iter().copied())
            .chain(otherwise_args.iter().copied())
            .collect();
        let kind = InstKind::CondBr {
            then,
            otherwise,
            split: then_args.len(),
        };
        self.emit(kind, operands, None)?;
        Ok(())
    }

    fn ret(&mut self, value: Option<usize>) -> HostResult<()> {
        self.emit(InstKind::Ret, value.into_iter().collect(), None)?;
        Ok(())
    }

    fn unreachable(&mut self) -> HostResult<()> {
        self.emit(InstKind::Unreachable, Vec::new(), None)?;
        Ok(())
    }
}

fn values(values: &[usize]) -> String {
    values.iter().map(|x| format!("v{x}")).join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "v{result} = ")?;
        }
        f.write_str(self.kind.name())?;
        match &self.kind {
            InstKind::ICmp(predicate) => write!(f, " {predicate}")?,
            InstKind::FCmp(predicate) => write!(f, " {predicate}")?,
            InstKind::Call(Some(name)) => write!(f, " @{name}")?,
            InstKind::AddressOf(name) => write!(f, " @{name}")?,
            InstKind::Constant(value) => write!(f, " {value}")?,
            InstKind::Alloca { element, .. } => write!(f, " {element}")?,
            InstKind::Gep { inbounds: true, .. } => f.write_str(" inbounds")?,
            InstKind::Load(access) | InstKind::Store(access) if access.volatile => {
                f.write_str(" volatile")?
            }
            _ => {}
        }

        match &self.kind {
            InstKind::Br(block) => write!(f, " bb{block}({})", values(&self.operands)),
            InstKind::CondBr {
                then,
                otherwise,
                split,
            } => {
                let (condition, rest) = self.operands.split_first().ok_or(fmt::Error)?;
                let (a, b) = rest.split_at((*split).min(rest.len()));
                write!(
                    f,
                    " v{condition}, bb{then}({}), bb{otherwise}({})",
                    values(a),
                    values(b)
                )
            }
            InstKind::ShuffleVector(mask)
            | InstKind::ExtractValue(mask)
            | InstKind::InsertValue(mask) => {
                write!(f, " {} [{}]", values(&self.operands), mask.iter().join(", "))
            }
            _ if self.operands.is_empty() => Ok(()),
            _ => write!(f, " {}", values(&self.operands)),
        }
    }
}

impl RecordingHost {
    /// The listing of one function, as the whole module listing shows it.
    pub fn listing(&self, function: &RecordedFunction) -> String {
        let mut out = String::new();
        // Writing into a String can't fail.
        let _ = self.write_function(&mut out, function);
        out
    }

    fn write_function(&self, f: &mut impl fmt::Write, function: &RecordedFunction) -> fmt::Result {
        let RecordedFunction {
            name,
            signature,
            linkage,
            blocks,
        } = function;
        if function.is_declaration() {
            return writeln!(f, "declare {linkage} @{name}: {signature}");
        }
        writeln!(f, "define {linkage} @{name}: {signature} {{")?;
        for (index, block) in blocks.iter().enumerate() {
            let arguments = block
                .arguments
                .iter()
                .map(|x| format!("v{x}: {}", self.types.get(*x).unwrap_or(&Type::Void)))
                .join(", ");
            writeln!(f, "bb{index}({arguments}):")?;
            for instruction in &block.instructions {
                writeln!(f, "  {instruction}")?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for RecordingHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.globals {
            let kind = if global.constant { "constant" } else { "global" };
            write!(f, "{} {kind} @{}: {}", global.linkage, global.name, global.ty)?;
            if let Some(value) = &global.initializer {
                write!(f, " = {value}")?;
            }
            writeln!(f)?;
        }
        for function in &self.functions {
            self.write_function(f, function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(host: &mut RecordingHost, signature: &FunctionType) {
        host.begin_function(&FunctionDecl {
            name: "f",
            signature,
            linkage: Linkage::External,
        })
        .unwrap();
    }

    #[test]
    fn infers_result_types() {
        let signature = FunctionType::new(Type::Void, vec![Type::vector(4, Type::i32())]);
        let mut host = RecordingHost::new();
        open(&mut host, &signature);
        let (entry, args) = host.append_block(&[Type::vector(4, Type::i32())]).unwrap();
        host.position_at_end(entry);

        let cmp = host.icmp(IntPredicate::Slt, args[0], args[0]).unwrap();
        assert_eq!(host.value_type(cmp), Some(&Type::vector(4, Type::i1())));
        let shuffled = host.shuffle_vector(args[0], args[0], &[0, 1]).unwrap();
        assert_eq!(host.value_type(shuffled), Some(&Type::vector(2, Type::i32())));
        let index = host.constant(&Attribute::int(1, Type::i32()), &Type::i32()).unwrap();
        let lane = host.extract_element(args[0], index).unwrap();
        assert_eq!(host.value_type(lane), Some(&Type::i32()));
        host.ret(None).unwrap();
        host.finish_function().unwrap();

        assert_eq!(host.count("icmp"), 1);
        assert_eq!(host.function("f").unwrap().instructions().count(), 5);
    }

    #[test]
    fn discard_forgets_the_open_function() {
        let signature = FunctionType::new(Type::Void, Vec::new());
        let mut host = RecordingHost::new();
        open(&mut host, &signature);
        let (entry, _) = host.append_block(&[]).unwrap();
        host.position_at_end(entry);
        host.undef(&Type::i32()).unwrap();
        host.discard_function();

        assert!(host.functions().is_empty());
        assert_eq!(host.value_type(0), None);
        assert_eq!(host.finish_function(), Err(HostError::NoFunction));
    }

    #[test]
    fn rejects_calls_outside_a_block() {
        let signature = FunctionType::new(Type::Void, Vec::new());
        let mut host = RecordingHost::new();
        assert_eq!(host.unreachable(), Err(HostError::NoFunction));
        open(&mut host, &signature);
        assert_eq!(host.unreachable(), Err(HostError::NoInsertionPoint));
        assert_eq!(host.begin_function(&FunctionDecl {
            name: "g",
            signature: &signature,
            linkage: Linkage::External,
        }), Err(HostError::FunctionOpen));
        let (entry, _) = host.append_block(&[]).unwrap();
        host.position_at_end(entry);
        assert_eq!(host.br((3, &[])), Err(HostError::UnknownBlock(3)));
    }

    #[test]
    fn listing() {
        let signature = FunctionType::new(Type::i32(), vec![Type::i32(), Type::i32()]);
        let mut host = RecordingHost::new();
        open(&mut host, &signature);
        let (entry, args) = host.append_block(&[Type::i32(), Type::i32()]).unwrap();
        host.position_at_end(entry);
        let sum = host.binary(BinaryOp::Add, args[0], args[1]).unwrap();
        host.ret(Some(sum)).unwrap();
        host.finish_function().unwrap();

        assert_eq!(
            host.to_string(),
            "define external @f: i32 (i32, i32) {\nbb0(v0: i32, v1: i32):\n  v2 = add v0, v1\n  ret v2\n}\n"
        );
    }
}
