/// Every operation kind in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    // Integer arithmetic.
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
    // Float arithmetic.
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    FNeg,
    // Comparisons.
    ICmp,
    FCmp,
    // Casts.
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
    // Memory.
    Alloca,
    Load,
    Store,
    GetElementPtr,
    Call,
    // Vectors and aggregates.
    ExtractElement,
    InsertElement,
    ShuffleVector,
    ExtractValue,
    InsertValue,
    Select,
    // Terminators.
    Br,
    CondBr,
    Return,
    Unreachable,
    // Module scope and pseudo operations.
    Global,
    AddressOf,
    Constant,
    Undef,
    Null,
    Func,
}

impl OpCode {
    pub const ALL: &'static [OpCode] = &[
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::UDiv,
        OpCode::SDiv,
        OpCode::URem,
        OpCode::SRem,
        OpCode::And,
        OpCode::Or,
        OpCode::Xor,
        OpCode::Shl,
        OpCode::LShr,
        OpCode::AShr,
        OpCode::FAdd,
        OpCode::FSub,
        OpCode::FMul,
        OpCode::FDiv,
        OpCode::FRem,
        OpCode::FNeg,
        OpCode::ICmp,
        OpCode::FCmp,
        OpCode::Bitcast,
        OpCode::IntToPtr,
        OpCode::PtrToInt,
        OpCode::SExt,
        OpCode::ZExt,
        OpCode::Trunc,
        OpCode::SIToFP,
        OpCode::UIToFP,
        OpCode::FPToSI,
        OpCode::FPToUI,
        OpCode::FPExt,
        OpCode::FPTrunc,
        OpCode::Alloca,
        OpCode::Load,
        OpCode::Store,
        OpCode::GetElementPtr,
        OpCode::Call,
        OpCode::ExtractElement,
        OpCode::InsertElement,
        OpCode::ShuffleVector,
        OpCode::ExtractValue,
        OpCode::InsertValue,
        OpCode::Select,
        OpCode::Br,
        OpCode::CondBr,
        OpCode::Return,
        OpCode::Unreachable,
        OpCode::Global,
        OpCode::AddressOf,
        OpCode::Constant,
        OpCode::Undef,
        OpCode::Null,
        OpCode::Func,
    ];

    /// The name with the dialect namespace, as reported to consumers.
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Add => "llvm.add",
            OpCode::Sub => "llvm.sub",
            OpCode::Mul => "llvm.mul",
            OpCode::UDiv => "llvm.udiv",
            OpCode::SDiv => "llvm.sdiv",
            OpCode::URem => "llvm.urem",
            OpCode::SRem => "llvm.srem",
            OpCode::And => "llvm.and",
            OpCode::Or => "llvm.or",
            OpCode::Xor => "llvm.xor",
            OpCode::Shl => "llvm.shl",
            OpCode::LShr => "llvm.lshr",
            OpCode::AShr => "llvm.ashr",
            OpCode::FAdd => "llvm.fadd",
            OpCode::FSub => "llvm.fsub",
            OpCode::FMul => "llvm.fmul",
            OpCode::FDiv => "llvm.fdiv",
            OpCode::FRem => "llvm.frem",
            OpCode::FNeg => "llvm.fneg",
            OpCode::ICmp => "llvm.icmp",
            OpCode::FCmp => "llvm.fcmp",
            OpCode::Bitcast => "llvm.bitcast",
            OpCode::IntToPtr => "llvm.inttoptr",
            OpCode::PtrToInt => "llvm.ptrtoint",
            OpCode::SExt => "llvm.sext",
            OpCode::ZExt => "llvm.zext",
            OpCode::Trunc => "llvm.trunc",
            OpCode::SIToFP => "llvm.sitofp",
            OpCode::UIToFP => "llvm.uitofp",
            OpCode::FPToSI => "llvm.fptosi",
            OpCode::FPToUI => "llvm.fptoui",
            OpCode::FPExt => "llvm.fpext",
            OpCode::FPTrunc => "llvm.fptrunc",
            OpCode::Alloca => "llvm.alloca",
            OpCode::Load => "llvm.load",
            OpCode::Store => "llvm.store",
            OpCode::GetElementPtr => "llvm.getelementptr",
            OpCode::Call => "llvm.call",
            OpCode::ExtractElement => "llvm.extractelement",
            OpCode::InsertElement => "llvm.insertelement",
            OpCode::ShuffleVector => "llvm.shufflevector",
            OpCode::ExtractValue => "llvm.extractvalue",
            OpCode::InsertValue => "llvm.insertvalue",
            OpCode::Select => "llvm.select",
            OpCode::Br => "llvm.br",
            OpCode::CondBr => "llvm.cond_br",
            OpCode::Return => "llvm.return",
            OpCode::Unreachable => "llvm.unreachable",
            OpCode::Global => "llvm.global",
            OpCode::AddressOf => "llvm.mlir.addressof",
            OpCode::Constant => "llvm.mlir.constant",
            OpCode::Undef => "llvm.mlir.undef",
            OpCode::Null => "llvm.mlir.null",
            OpCode::Func => "llvm.func",
        }
    }

    /// The name without the namespace, the key of the catalog.
    pub fn mnemonic(self) -> &'static str {
        let name = self.name();
        name.strip_prefix(super::NAMESPACE).unwrap_or(name)
    }
}
