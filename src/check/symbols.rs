//! Module scope symbol table for `llvm.global` and `llvm.func` declarations.

use std::collections::HashMap;

use crate::catalog::OpCode;
use crate::ir::{FunctionType, Module, Operation, Span, Type};

use super::errors::SymbolResolutionError;

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Global { ty: Type, constant: bool },
    Function(FunctionType),
}

/// One module scope declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Position in the module body.
    pub index: usize,
    pub span: Option<Span>,
}

impl Symbol {
    /// The type of `llvm.mlir.addressof` on this symbol.
    pub fn address_type(&self) -> Type {
        match &self.kind {
            SymbolKind::Global { ty, .. } => Type::ptr(ty.clone()),
            SymbolKind::Function(func) => Type::ptr(Type::func(func.clone())),
        }
    }

    pub fn function_type(&self) -> Option<&FunctionType> {
        match &self.kind {
            SymbolKind::Function(func) => Some(func),
            SymbolKind::Global { .. } => None,
        }
    }
}

/// Declarations keyed by name. Duplicates are kept so lookups can report them.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn build(module: &Module) -> Self {
        let mut table = Self::default();
        for (index, op) in module.body.iter().enumerate() {
            if let Some(symbol) = declaration(op, index) {
                table.insert(symbol);
            }
        }
        table
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols
            .entry(symbol.name.clone())
            .or_default()
            .push(symbol);
    }

    /// Resolves a name to exactly one declaration.
    pub fn lookup(&self, name: &str) -> Result<&Symbol, SymbolResolutionError> {
        match self.symbols.get(name).map(Vec::as_slice) {
            None | Some([]) => Err(SymbolResolutionError::Unresolved {
                name: name.to_string(),
            }),
            Some([symbol]) => Ok(symbol),
            Some(all) => Err(SymbolResolutionError::Ambiguous {
                name: name.to_string(),
                count: all.len(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The declaration a module scope operation introduces, if any.
///
/// Declarations with a malformed type attribute are skipped, the constraint checks report them.
fn declaration(op: &Operation, index: usize) -> Option<Symbol> {
    let name = op.symbol_name()?.to_string();
    let kind = match op.opcode {
        OpCode::Global => SymbolKind::Global {
            ty: op.attribute("global_type")?.as_type()?.clone(),
            constant: op.attribute("constant").is_some(),
        },
        OpCode::Func => SymbolKind::Function(op.function_type()?.clone()),
        _ => return None,
    };
    Some(Symbol {
        name,
        kind,
        index,
        span: op.span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Attribute, OperationState};

    fn global(module: &mut Module, name: &str, ty: Type) {
        let op = module
            .create_operation(
                OperationState::new(OpCode::Global)
                    .add_attribute("sym_name", Attribute::String(name.into()))
                    .add_attribute("global_type", Attribute::Type(ty)),
            )
            .unwrap();
        module.body.push(op);
    }

    #[test]
    fn resolves_by_name() {
        let mut module = Module::new();
        global(&mut module, "a", Type::i32());
        global(&mut module, "b", Type::f64());
        let table = SymbolTable::build(&module);

        let b = table.lookup("b").unwrap();
        assert_eq!(b.index, 1);
        assert_eq!(b.address_type(), Type::ptr(Type::f64()));
        assert_eq!(
            table.lookup("c"),
            Err(SymbolResolutionError::Unresolved { name: "c".into() })
        );
    }

    #[test]
    fn duplicates_are_ambiguous() {
        let mut module = Module::new();
        global(&mut module, "a", Type::i32());
        global(&mut module, "a", Type::i64());
        let table = SymbolTable::build(&module);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup("a"),
            Err(SymbolResolutionError::Ambiguous {
                name: "a".into(),
                count: 2
            })
        );
    }
}
