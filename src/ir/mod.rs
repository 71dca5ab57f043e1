use std::ops::Range;

use typed_generational_arena::{SmallSlab, SmallSlabIndex};

use crate::catalog::{Catalog, OpCode};
use crate::check::constraints::{self, ConstraintViolation};

pub mod attributes;
pub mod equivalence;
pub mod types;

pub use attributes::{
    Attribute, Attributes, EnumAttribute, EnumKind, FloatPredicate, IntPredicate, Linkage,
};
pub use equivalence::equivalent;
pub use types::{FloatKind, FunctionType, Type};

pub type ValueId = SmallSlabIndex<ValueData>;
pub type Values = SmallSlab<ValueData>;

/// Index of a block within its region.
pub type BlockIndex = usize;

/// A byte range in the source text an operation was parsed from.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn merge(self, other: Span) -> Span {
        Span::new(self.from.min(other.from), self.to.max(other.to))
    }
}

impl From<Span> for Range<usize> {
    fn from(val: Span) -> Self {
        val.from..val.to
    }
}

/// An SSA value: an operation result or a block argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueData {
    pub ty: Type,
    /// The name the value had in the source, used as a printing hint.
    pub name: Option<String>,
}

/// A destination block paired with the values passed as its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Successor {
    pub block: BlockIndex,
    pub operands: Vec<ValueId>,
}

impl Successor {
    pub fn new(block: BlockIndex, operands: Vec<ValueId>) -> Self {
        Self { block, operands }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub arguments: Vec<ValueId>,
    pub operations: Vec<Operation>,
}

impl Block {
    pub fn terminator(&self) -> Option<&Operation> {
        self.operations.last()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Region {
    pub blocks: Vec<Block>,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }
}

/// A constructed operation instance, bound to its catalog entry through `opcode`.
#[derive(Debug, Clone)]
pub struct Operation {
    pub opcode: OpCode,
    pub operands: Vec<ValueId>,
    pub results: Vec<ValueId>,
    pub attributes: Attributes,
    pub successors: Vec<Successor>,
    pub regions: Vec<Region>,
    pub span: Option<Span>,
}

impl Operation {
    /// The namespaced name, e.g. `llvm.add`.
    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    pub fn result(&self) -> Option<ValueId> {
        self.results.first().copied()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn enum_attribute<E: EnumAttribute>(&self, name: &str) -> Option<E> {
        self.attribute(name)?.as_enum()
    }

    /// The `sym_name` of symbol defining operations.
    pub fn symbol_name(&self) -> Option<&str> {
        self.attribute("sym_name")?.as_str()
    }

    /// The signature of a `llvm.func`.
    pub fn function_type(&self) -> Option<&FunctionType> {
        match self.attribute("function_type")?.as_type()? {
            Type::Func(func) => Some(func),
            _ => None,
        }
    }

    /// Calls `f` on this operation and every operation nested in its regions.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Operation)) {
        f(self);
        for region in &self.regions {
            for block in &region.blocks {
                for op in &block.operations {
                    op.walk(f);
                }
            }
        }
    }
}

/// Everything needed to construct an operation, checked against the catalog on creation.
#[derive(Debug, Clone)]
pub struct OperationState {
    pub opcode: OpCode,
    pub operands: Vec<ValueId>,
    pub result_types: Vec<Type>,
    pub attributes: Attributes,
    pub successors: Vec<Successor>,
    pub regions: Vec<Region>,
    pub span: Option<Span>,
}

impl OperationState {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
            result_types: Vec::new(),
            attributes: Attributes::new(),
            successors: Vec::new(),
            regions: Vec::new(),
            span: None,
        }
    }

    pub fn add_operands(mut self, operands: &[ValueId]) -> Self {
        self.operands.extend_from_slice(operands);
        self
    }

    pub fn add_result(mut self, ty: Type) -> Self {
        self.result_types.push(ty);
        self
    }

    pub fn add_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn add_successor(mut self, successor: Successor) -> Self {
        self.successors.push(successor);
        self
    }

    pub fn add_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A module: the value arena plus the module scope operations (globals and functions).
#[derive(Debug, Clone)]
pub struct Module {
    pub values: Values,
    pub body: Vec<Operation>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    pub fn new() -> Self {
        Self {
            values: Values::new(),
            body: Vec::new(),
        }
    }

    /// Allocates a fresh value, used for block arguments.
    pub fn new_value(&mut self, ty: Type, name: Option<String>) -> ValueId {
        self.values.insert(ValueData { ty, name })
    }

    pub fn value_type(&self, value: ValueId) -> Option<&Type> {
        self.values.get(value).map(|x| &x.ty)
    }

    /// Builds an operation, checking its shape against the builtin catalog.
    ///
    /// Result values are allocated in this module's arena.
    pub fn create_operation(
        &mut self,
        state: OperationState,
    ) -> Result<Operation, ConstraintViolation> {
        let spec = Catalog::builtin().spec(state.opcode);
        constraints::check_state(spec, &state, &self.values)?;

        let results = state
            .result_types
            .into_iter()
            .map(|ty| self.values.insert(ValueData { ty, name: None }))
            .collect();

        Ok(Operation {
            opcode: state.opcode,
            operands: state.operands,
            results,
            attributes: state.attributes,
            successors: state.successors,
            regions: state.regions,
            span: state.span,
        })
    }

    /// The module scope `llvm.func` operations.
    pub fn functions(&self) -> impl Iterator<Item = &Operation> {
        self.body.iter().filter(|x| x.opcode == OpCode::Func)
    }

    /// The module scope `llvm.global` operations.
    pub fn globals(&self) -> impl Iterator<Item = &Operation> {
        self.body.iter().filter(|x| x.opcode == OpCode::Global)
    }

    pub fn function(&self, name: &str) -> Option<&Operation> {
        self.functions().find(|x| x.symbol_name() == Some(name))
    }
}
