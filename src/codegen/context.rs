use std::collections::HashMap;

use crate::ir::{Attribute, Module, Operation, Type, ValueId};

use super::errors::{LoweringError, LoweringErrorKind};
use super::host::HostBuilder;

/// State of lowering one function body: the value map and the host blocks.
///
/// The host's insertion cursor is the other half of it, each function owns a
/// context for its whole lowering and nothing else touches either.
pub(crate) struct FunctionLoweringCtx<'a, H: HostBuilder> {
    pub module: &'a Module,
    pub name: &'a str,
    values: HashMap<ValueId, H::Value>,
    blocks: Vec<H::Block>,
}

impl<'a, H: HostBuilder> FunctionLoweringCtx<'a, H> {
    pub fn new(module: &'a Module, name: &'a str) -> Self {
        Self {
            module,
            name,
            values: HashMap::new(),
            blocks: Vec::new(),
        }
    }

    pub fn error(&self, op: &Operation, kind: impl Into<LoweringErrorKind>) -> LoweringError {
        LoweringError {
            function: self.name.to_string(),
            op: op.name(),
            span: op.span,
            kind: kind.into(),
        }
    }

    pub fn add_block(&mut self, block: H::Block) {
        self.blocks.push(block);
    }

    pub fn block(&self, op: &Operation, index: usize) -> Result<H::Block, LoweringError> {
        self.blocks
            .get(index)
            .copied()
            .ok_or_else(|| self.error(op, LoweringErrorKind::UnknownBlock(index)))
    }

    pub fn bind(&mut self, source: ValueId, target: H::Value) {
        self.values.insert(source, target);
    }

    /// Binds the op's single result, if it has one.
    pub fn bind_result(&mut self, op: &Operation, target: H::Value) {
        if let Some(result) = op.result() {
            self.bind(result, target);
        }
    }

    pub fn value(&self, op: &Operation, source: ValueId) -> Result<H::Value, LoweringError> {
        match self.values.get(&source) {
            Some(value) => Ok(value.clone()),
            None => {
                let index = op
                    .operands
                    .iter()
                    .chain(op.successors.iter().flat_map(|x| &x.operands))
                    .position(|x| *x == source)
                    .unwrap_or_default();
                Err(self.error(op, LoweringErrorKind::UnmappedValue { index }))
            }
        }
    }

    pub fn operand(&self, op: &Operation, index: usize) -> Result<H::Value, LoweringError> {
        match op.operands.get(index) {
            Some(source) => self.value(op, *source),
            None => Err(self.error(op, LoweringErrorKind::UnmappedValue { index })),
        }
    }

    pub fn values(
        &self,
        op: &Operation,
        sources: &[ValueId],
    ) -> Result<Vec<H::Value>, LoweringError> {
        sources.iter().map(|x| self.value(op, *x)).collect()
    }

    pub fn ty(&self, value: ValueId) -> Option<&'a Type> {
        self.module.value_type(value)
    }

    pub fn result_type(&self, op: &Operation) -> Result<&'a Type, LoweringError> {
        op.result()
            .and_then(|x| self.ty(x))
            .ok_or_else(|| self.error(op, LoweringErrorKind::MissingResult))
    }

    pub fn attribute<'o>(
        &self,
        op: &'o Operation,
        name: &'static str,
    ) -> Result<&'o Attribute, LoweringError> {
        op.attribute(name)
            .ok_or_else(|| self.error(op, LoweringErrorKind::Attribute(name)))
    }

    pub fn int_array(&self, op: &Operation, name: &'static str) -> Result<Vec<i64>, LoweringError> {
        op.attribute(name)
            .and_then(Attribute::as_int_array)
            .ok_or_else(|| self.error(op, LoweringErrorKind::Attribute(name)))
    }
}
