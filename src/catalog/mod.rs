//! The operation catalog: one immutable `OperationSpec` per mnemonic.
//!
//! Specs are plain data plus function pointers for the pieces of behaviour that
//! differ per operation (custom assembly, extra verification). Everything else
//! dispatches on the capability flags.

use std::{collections::HashMap, fmt, sync::OnceLock};

use tracing::debug;

use crate::asm::printer::Printer;
use crate::check::{VerifyCtx, VerifyErrorKind};
use crate::ir::{Attribute, EnumKind, Operation, OperationState, Type};
use crate::parser::{ParseError, Parser};

pub mod errors;
mod opcode;
mod ops;

pub use errors::{CatalogError, DefinitionError};
pub use opcode::OpCode;

/// The dialect namespace every mnemonic is reported with.
pub const NAMESPACE: &str = "llvm.";

pub type ParseFn = fn(&mut Parser<'_>, &OperationSpec) -> Result<OperationState, ParseError>;
pub type PrintFn = fn(&mut Printer<'_>, &Operation) -> fmt::Result;
pub type VerifyFn = fn(&Operation, &VerifyCtx<'_>) -> Result<(), VerifyErrorKind>;

/// A semantic type constraint on an operand or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConstraint {
    /// Any type a value can hold.
    Value,
    Int,
    IntLike,
    FloatLike,
    /// Integers, pointers, or vectors of them.
    IntOrPtrLike,
    Bool,
    BoolLike,
    Pointer,
    PointerLike,
    Vector,
    Aggregate,
}

impl TypeConstraint {
    pub fn matches(self, ty: &Type) -> bool {
        let scalar = ty.scalar_type();
        let vector_ok = match ty {
            Type::Vector(_, inner) => inner.is_int() || inner.is_float() || inner.is_ptr(),
            _ => true,
        };
        vector_ok
            && match self {
                TypeConstraint::Value => ty.is_first_class(),
                TypeConstraint::Int => ty.is_int(),
                TypeConstraint::IntLike => scalar.is_int(),
                TypeConstraint::FloatLike => scalar.is_float(),
                TypeConstraint::IntOrPtrLike => scalar.is_int() || scalar.is_ptr(),
                TypeConstraint::Bool => *ty == Type::i1(),
                TypeConstraint::BoolLike => *scalar == Type::i1(),
                TypeConstraint::Pointer => ty.is_ptr(),
                TypeConstraint::PointerLike => scalar.is_ptr(),
                TypeConstraint::Vector => ty.is_vector(),
                TypeConstraint::Aggregate => ty.is_aggregate(),
            }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeConstraint::Value => "any first class type",
            TypeConstraint::Int => "integer",
            TypeConstraint::IntLike => "integer or vector of integer",
            TypeConstraint::FloatLike => "float or vector of float",
            TypeConstraint::IntOrPtrLike => "integer, pointer, or vector of them",
            TypeConstraint::Bool => "i1",
            TypeConstraint::BoolLike => "i1 or vector of i1",
            TypeConstraint::Pointer => "pointer",
            TypeConstraint::PointerLike => "pointer or vector of pointer",
            TypeConstraint::Vector => "vector",
            TypeConstraint::Aggregate => "struct or array",
        })
    }
}

/// Shape of one operand or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpec {
    pub name: &'static str,
    pub constraint: TypeConstraint,
    /// Matches zero or more values. Only allowed on the last entry.
    pub variadic: bool,
}

pub type OperandSpec = ValueSpec;
pub type ResultSpec = ValueSpec;

/// What kind of attribute value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Unit,
    Integer,
    String,
    Type,
    Symbol,
    IntArray,
    Enum(EnumKind),
    /// Any literal: integer, float, bool or string.
    Literal,
}

impl AttrKind {
    pub fn accepts(self, attribute: &Attribute) -> bool {
        match (self, attribute) {
            (AttrKind::Unit, Attribute::Unit)
            | (AttrKind::Integer, Attribute::Integer { .. })
            | (AttrKind::String, Attribute::String(_))
            | (AttrKind::Type, Attribute::Type(_))
            | (AttrKind::Symbol, Attribute::Symbol(_)) => true,
            (AttrKind::IntArray, attr) => attr.as_int_array().is_some(),
            (AttrKind::Enum(expected), Attribute::Enum { kind, .. }) => expected == *kind,
            (AttrKind::Literal, attr) => attr.literal_type().is_some(),
            _ => false,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrKind::Unit => f.write_str("unit"),
            AttrKind::Integer => f.write_str("integer"),
            AttrKind::String => f.write_str("string"),
            AttrKind::Type => f.write_str("type"),
            AttrKind::Symbol => f.write_str("symbol reference"),
            AttrKind::IntArray => f.write_str("integer array"),
            AttrKind::Enum(kind) => f.write_str(kind.name()),
            AttrKind::Literal => f.write_str("literal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub kind: AttrKind,
    pub required: bool,
}

/// Structural and semantic properties of an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraitSet(u8);

impl TraitSet {
    pub const NONE: TraitSet = TraitSet(0);
    /// Safe to reorder or remove when unused. Informational only.
    pub const SIDE_EFFECT_FREE: TraitSet = TraitSet(1);
    /// Order of the two operands doesn't matter.
    pub const COMMUTATIVE: TraitSet = TraitSet(1 << 1);
    pub const SAME_OPERANDS_AND_RESULT_TYPE: TraitSet = TraitSet(1 << 2);
    pub const TERMINATOR: TraitSet = TraitSet(1 << 3);
    /// Nested regions may only use values defined inside them.
    pub const ISOLATED_FROM_ABOVE: TraitSet = TraitSet(1 << 4);

    pub const fn union(self, other: TraitSet) -> TraitSet {
        TraitSet(self.0 | other.0)
    }

    pub const fn contains(self, other: TraitSet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TraitSet {
    type Output = TraitSet;

    fn bitor(self, rhs: TraitSet) -> TraitSet {
        self.union(rhs)
    }
}

/// How many destination blocks a terminator names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorSpec {
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpec {
    pub name: &'static str,
}

/// The textual form of an operation.
#[derive(Clone, Copy)]
pub enum AsmFormat {
    /// Derived from the fixed arity: `%r = llvm.op [enums] %a, %b [attrs] : T [to U]`.
    Default,
    Custom { parse: ParseFn, print: PrintFn },
}

impl fmt::Debug for AsmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmFormat::Default => f.write_str("Default"),
            AsmFormat::Custom { .. } => f.write_str("Custom"),
        }
    }
}

/// The structural contract of one operation kind.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub opcode: OpCode,
    pub mnemonic: &'static str,
    pub operands: Vec<OperandSpec>,
    pub results: Vec<ResultSpec>,
    pub attributes: Vec<AttributeSpec>,
    pub traits: TraitSet,
    pub successors: Option<SuccessorSpec>,
    pub regions: Vec<RegionSpec>,
    pub format: AsmFormat,
    pub verifier: Option<VerifyFn>,
}

impl OperationSpec {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            mnemonic: opcode.mnemonic(),
            operands: Vec::new(),
            results: Vec::new(),
            attributes: Vec::new(),
            traits: TraitSet::NONE,
            successors: None,
            regions: Vec::new(),
            format: AsmFormat::Default,
            verifier: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    pub fn operand(mut self, name: &'static str, constraint: TypeConstraint) -> Self {
        self.operands.push(ValueSpec {
            name,
            constraint,
            variadic: false,
        });
        self
    }

    pub fn variadic_operand(mut self, name: &'static str, constraint: TypeConstraint) -> Self {
        self.operands.push(ValueSpec {
            name,
            constraint,
            variadic: true,
        });
        self
    }

    pub fn result(mut self, name: &'static str, constraint: TypeConstraint) -> Self {
        self.results.push(ValueSpec {
            name,
            constraint,
            variadic: false,
        });
        self
    }

    pub fn variadic_result(mut self, name: &'static str, constraint: TypeConstraint) -> Self {
        self.results.push(ValueSpec {
            name,
            constraint,
            variadic: true,
        });
        self
    }

    pub fn attribute(mut self, name: &'static str, kind: AttrKind) -> Self {
        self.attributes.push(AttributeSpec {
            name,
            kind,
            required: true,
        });
        self
    }

    pub fn optional_attribute(mut self, name: &'static str, kind: AttrKind) -> Self {
        self.attributes.push(AttributeSpec {
            name,
            kind,
            required: false,
        });
        self
    }

    pub fn traits(mut self, traits: TraitSet) -> Self {
        self.traits = self.traits | traits;
        self
    }

    pub fn successors(mut self, count: usize) -> Self {
        self.successors = Some(SuccessorSpec { count });
        self
    }

    pub fn region(mut self, name: &'static str) -> Self {
        self.regions.push(RegionSpec { name });
        self
    }

    pub fn custom_format(mut self, parse: ParseFn, print: PrintFn) -> Self {
        self.format = AsmFormat::Custom { parse, print };
        self
    }

    pub fn verifier(mut self, verifier: VerifyFn) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn has_trait(&self, traits: TraitSet) -> bool {
        self.traits.contains(traits)
    }

    pub fn is_terminator(&self) -> bool {
        self.has_trait(TraitSet::TERMINATOR)
    }

    pub fn has_result(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn result_is_variadic(&self) -> bool {
        self.results.last().is_some_and(|x| x.variadic)
    }

    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn attribute_spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|x| x.name == name)
    }

    /// Structural sanity of the spec itself.
    fn validate(&self) -> Result<(), DefinitionError> {
        let op = self.name();
        for (what, list) in [("operand", &self.operands), ("result", &self.results)] {
            if let Some(index) = list
                .iter()
                .enumerate()
                .position(|(i, x)| x.variadic && i + 1 != list.len())
            {
                return Err(DefinitionError::VariadicNotLast { op, what, index });
            }
        }
        if self.results.len() > 1 {
            return Err(DefinitionError::TooManyResults {
                op,
                count: self.results.len(),
            });
        }
        if self.is_terminator() {
            if self.has_result() {
                return Err(DefinitionError::TerminatorWithResults { op });
            }
            if self.successors.is_none() {
                return Err(DefinitionError::TerminatorWithoutSuccessors { op });
            }
        } else if self.successors.is_some() {
            return Err(DefinitionError::SuccessorsOnNonTerminator { op });
        }
        if matches!(self.format, AsmFormat::Default)
            && (self.results.len() != 1
                || self.result_is_variadic()
                || self.operands.iter().any(|x| x.variadic))
        {
            return Err(DefinitionError::DefaultFormatShape { op });
        }
        Ok(())
    }
}

/// Mnemonic to spec table. Append only while loading, immutable afterwards.
#[derive(Debug, Default)]
pub struct Catalog {
    specs: Vec<OperationSpec>,
    by_mnemonic: HashMap<&'static str, usize>,
    by_opcode: HashMap<OpCode, usize>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the full catalog, checking every spec and that no opcode is missing.
    pub fn load() -> Result<Self, DefinitionError> {
        let mut catalog = Self::empty();
        ops::register_all(&mut catalog)?;

        if let Some(missing) = OpCode::ALL
            .iter()
            .find(|x| !catalog.by_opcode.contains_key(x))
        {
            return Err(DefinitionError::MissingOpcode { op: missing.name() });
        }

        debug!("loaded operation catalog with {} specs", catalog.len());
        Ok(catalog)
    }

    /// The process wide catalog, loaded on first use.
    ///
    /// A definition error here is a bug in the catalog tables and aborts startup.
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| match Catalog::load() {
            Ok(catalog) => catalog,
            Err(error) => panic!("invalid operation catalog: {error}"),
        })
    }

    pub fn register(&mut self, spec: OperationSpec) -> Result<(), DefinitionError> {
        spec.validate()?;
        if self.by_mnemonic.contains_key(spec.mnemonic) {
            return Err(DefinitionError::DuplicateMnemonic(spec.mnemonic));
        }
        if self.by_opcode.contains_key(&spec.opcode) {
            return Err(DefinitionError::DuplicateOpcode(spec.name()));
        }
        let index = self.specs.len();
        self.by_mnemonic.insert(spec.mnemonic, index);
        self.by_opcode.insert(spec.opcode, index);
        self.specs.push(spec);
        Ok(())
    }

    /// Looks up a spec by bare (`add`) or namespaced (`llvm.add`) mnemonic.
    pub fn lookup(&self, mnemonic: &str) -> Result<&OperationSpec, CatalogError> {
        let bare = mnemonic.strip_prefix(NAMESPACE).unwrap_or(mnemonic);
        self.by_mnemonic
            .get(bare)
            .map(|x| &self.specs[*x])
            .ok_or_else(|| CatalogError::UnknownMnemonic(mnemonic.to_string()))
    }

    pub fn get(&self, opcode: OpCode) -> Option<&OperationSpec> {
        self.by_opcode.get(&opcode).map(|x| &self.specs[*x])
    }

    /// The spec of an opcode.
    ///
    /// Panics if the opcode isn't registered, which `load` rules out for the builtin catalog.
    pub fn spec(&self, opcode: OpCode) -> &OperationSpec {
        &self.specs[self.by_opcode[&opcode]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_total() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), OpCode::ALL.len());
        for opcode in OpCode::ALL {
            assert_eq!(catalog.spec(*opcode).opcode, *opcode);
            assert_eq!(catalog.lookup(opcode.name()).unwrap().opcode, *opcode);
            assert_eq!(catalog.lookup(opcode.mnemonic()).unwrap().opcode, *opcode);
        }
    }

    #[test]
    fn unknown_mnemonic() {
        let err = Catalog::builtin().lookup("llvm.frobnicate").unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownMnemonic("llvm.frobnicate".to_string())
        );
    }

    #[test]
    fn duplicate_registration_is_a_definition_error() {
        let mut catalog = Catalog::empty();
        let spec = || {
            OperationSpec::new(OpCode::Add)
                .operand("lhs", TypeConstraint::IntLike)
                .operand("rhs", TypeConstraint::IntLike)
                .result("res", TypeConstraint::IntLike)
        };
        catalog.register(spec()).unwrap();
        assert_eq!(
            catalog.register(spec()),
            Err(DefinitionError::DuplicateMnemonic("add"))
        );
    }

    #[test]
    fn malformed_specs_are_rejected() {
        let mut catalog = Catalog::empty();

        let variadic_first = OperationSpec::new(OpCode::Call)
            .variadic_operand("args", TypeConstraint::Value)
            .operand("last", TypeConstraint::Value)
            .result("res", TypeConstraint::Value);
        assert!(matches!(
            catalog.register(variadic_first),
            Err(DefinitionError::VariadicNotLast { index: 0, .. })
        ));

        let terminator_with_result = OperationSpec::new(OpCode::Br)
            .traits(TraitSet::TERMINATOR)
            .successors(1)
            .result("res", TypeConstraint::Value);
        assert!(matches!(
            catalog.register(terminator_with_result),
            Err(DefinitionError::TerminatorWithResults { .. })
        ));

        let successors_without_terminator = OperationSpec::new(OpCode::Load)
            .operand("addr", TypeConstraint::Pointer)
            .result("res", TypeConstraint::Value)
            .successors(1);
        assert!(matches!(
            catalog.register(successors_without_terminator),
            Err(DefinitionError::SuccessorsOnNonTerminator { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn commutative_ops() {
        let commutative: Vec<_> = Catalog::builtin()
            .iter()
            .filter(|x| x.has_trait(TraitSet::COMMUTATIVE))
            .map(|x| x.mnemonic)
            .collect();
        assert_eq!(commutative, ["add", "mul", "and", "or", "xor", "fadd", "fmul"]);
    }
}
