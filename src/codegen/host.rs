//! The host IR construction API that lowering drives.
//!
//! The host is an opaque sink: it receives already typed values and builds its
//! own representation. Every value producing call returns exactly one new host
//! value.

use std::fmt;

use crate::ir::{Attribute, FloatPredicate, FunctionType, IntPredicate, Linkage, Type};

use super::errors::HostError;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Bitcast,
    IntToPtr,
    PtrToInt,
    SExt,
    ZExt,
    Trunc,
    SIToFP,
    UIToFP,
    FPToSI,
    FPToUI,
    FPExt,
    FPTrunc,
}

impl CastOp {
    pub fn name(self) -> &'static str {
        match self {
            CastOp::Bitcast => "bitcast",
            CastOp::IntToPtr => "inttoptr",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::SExt => "sext",
            CastOp::ZExt => "zext",
            CastOp::Trunc => "trunc",
            CastOp::SIToFP => "sitofp",
            CastOp::UIToFP => "uitofp",
            CastOp::FPToSI => "fptosi",
            CastOp::FPToUI => "fptoui",
            CastOp::FPExt => "fpext",
            CastOp::FPTrunc => "fptrunc",
        }
    }
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags of a load or store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryAccess {
    pub alignment: Option<u64>,
    pub volatile: bool,
}

#[derive(Debug, Clone)]
pub enum Callee<'a, V> {
    /// A function of the module, by name.
    Direct(&'a str),
    /// A value of function pointer type.
    Indirect(V),
}

#[derive(Debug, Clone)]
pub struct GlobalDecl<'a> {
    pub name: &'a str,
    pub ty: &'a Type,
    pub constant: bool,
    pub linkage: Linkage,
    pub initializer: Option<&'a Attribute>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl<'a> {
    pub name: &'a str,
    pub signature: &'a FunctionType,
    pub linkage: Linkage,
}

/// A destination block and the values passed as its arguments.
pub type Target<'a, B, V> = (B, &'a [V]);

pub trait HostBuilder {
    type Value: Clone + fmt::Debug;
    type Block: Copy + fmt::Debug;

    fn declare_global(&mut self, global: &GlobalDecl<'_>) -> HostResult<()>;
    fn declare_function(&mut self, function: &FunctionDecl<'_>) -> HostResult<()>;

    /// Opens the body of `function`. Construction calls go into it until it is
    /// finished or discarded.
    fn begin_function(&mut self, function: &FunctionDecl<'_>) -> HostResult<()>;
    fn finish_function(&mut self) -> HostResult<()>;
    /// Drops everything built since [`HostBuilder::begin_function`].
    fn discard_function(&mut self);

    /// Appends a block to the open function, returning it and its arguments.
    fn append_block(&mut self, arguments: &[Type]) -> HostResult<(Self::Block, Vec<Self::Value>)>;
    /// Moves the insertion cursor to the end of `block`.
    fn position_at_end(&mut self, block: Self::Block);

    fn binary(&mut self, op: BinaryOp, lhs: Self::Value, rhs: Self::Value) -> HostResult<Self::Value>;
    fn fneg(&mut self, value: Self::Value) -> HostResult<Self::Value>;
    fn icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> HostResult<Self::Value>;
    fn fcmp(
        &mut self,
        predicate: FloatPredicate,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> HostResult<Self::Value>;
    fn cast(&mut self, op: CastOp, value: Self::Value, to: &Type) -> HostResult<Self::Value>;

    fn alloca(
        &mut self,
        element: &Type,
        size: Self::Value,
        alignment: Option<u64>,
    ) -> HostResult<Self::Value>;
    fn load(
        &mut self,
        ty: &Type,
        address: Self::Value,
        access: MemoryAccess,
    ) -> HostResult<Self::Value>;
    fn store(
        &mut self,
        value: Self::Value,
        address: Self::Value,
        access: MemoryAccess,
    ) -> HostResult<()>;
    fn gep(
        &mut self,
        base: Self::Value,
        indices: &[Self::Value],
        inbounds: bool,
        result: &Type,
    ) -> HostResult<Self::Value>;

    /// Returns the call's value, `None` for void callees.
    fn call(
        &mut self,
        callee: Callee<'_, Self::Value>,
        args: &[Self::Value],
        result: &Type,
    ) -> HostResult<Option<Self::Value>>;

    fn extract_element(
        &mut self,
        vector: Self::Value,
        position: Self::Value,
    ) -> HostResult<Self::Value>;
    fn insert_element(
        &mut self,
        vector: Self::Value,
        value: Self::Value,
        position: Self::Value,
    ) -> HostResult<Self::Value>;
    fn shuffle_vector(
        &mut self,
        v1: Self::Value,
        v2: Self::Value,
        mask: &[i64],
    ) -> HostResult<Self::Value>;
    fn extract_value(&mut self, aggregate: Self::Value, position: &[i64])
    -> HostResult<Self::Value>;
    fn insert_value(
        &mut self,
        aggregate: Self::Value,
        value: Self::Value,
        position: &[i64],
    ) -> HostResult<Self::Value>;
    fn select(
        &mut self,
        condition: Self::Value,
        true_value: Self::Value,
        false_value: Self::Value,
    ) -> HostResult<Self::Value>;

    fn address_of(&mut self, name: &str, ty: &Type) -> HostResult<Self::Value>;
    fn constant(&mut self, value: &Attribute, ty: &Type) -> HostResult<Self::Value>;
    /// A value of `ty` with no defined contents.
    fn undef(&mut self, ty: &Type) -> HostResult<Self::Value>;
    fn null(&mut self, ty: &Type) -> HostResult<Self::Value>;

    fn br(&mut self, dest: Target<'_, Self::Block, Self::Value>) -> HostResult<()>;
    fn cond_br(
        &mut self,
        condition: Self::Value,
        then: Target<'_, Self::Block, Self::Value>,
        otherwise: Target<'_, Self::Block, Self::Value>,
    ) -> HostResult<()>;
    fn ret(&mut self, value: Option<Self::Value>) -> HostResult<()>;
    fn unreachable(&mut self) -> HostResult<()>;
}
