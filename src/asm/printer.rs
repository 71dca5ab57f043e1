use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ir::{Attribute, Module, Operation, Region, Successor, ValueId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Ignore source names and number every value.
    pub renumber: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            renumber: false,
        }
    }
}

/// Writes a module back to text. Value names are assigned on first mention and
/// are scoped to the enclosing function.
pub struct Printer<'a> {
    module: &'a Module,
    config: PrinterConfig,
    out: String,
    names: HashMap<ValueId, String>,
    used: HashSet<String>,
    next_number: usize,
    depth: usize,
}

impl Write for Printer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}

impl<'a> Printer<'a> {
    pub fn new(module: &'a Module, config: PrinterConfig) -> Self {
        Self {
            module,
            config,
            out: String::new(),
            names: HashMap::new(),
            used: HashSet::new(),
            next_number: 0,
            depth: 0,
        }
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// Forgets all value names, called when entering a new function.
    pub fn reset_names(&mut self) {
        self.names.clear();
        self.used.clear();
        self.next_number = 0;
    }

    /// The `%name` of a value.
    pub fn value(&mut self, id: ValueId) -> String {
        if let Some(name) = self.names.get(&id) {
            return format!("%{name}");
        }
        let hint = match self.module.values.get(id) {
            Some(data) if !self.config.renumber => data.name.clone(),
            _ => None,
        };
        let name = match hint {
            Some(hint) if is_valid_name(&hint) && !self.used.contains(&hint) => hint,
            _ => loop {
                let candidate = self.next_number.to_string();
                self.next_number += 1;
                if !self.used.contains(&candidate) {
                    break candidate;
                }
            },
        };
        self.used.insert(name.clone());
        self.names.insert(id, name.clone());
        format!("%{name}")
    }

    pub fn values(&mut self, ids: &[ValueId]) -> String {
        ids.iter().map(|x| self.value(*x)).join(", ")
    }

    /// The type of a value as text.
    pub fn ty(&self, id: ValueId) -> String {
        match self.module.value_type(id) {
            Some(ty) => ty.to_string(),
            None => "<<unknown value>>".to_string(),
        }
    }

    pub fn types(&self, ids: &[ValueId]) -> String {
        ids.iter().map(|x| self.ty(*x)).join(", ")
    }

    /// `^bbN` or `^bbN(%a, %b : T, U)`.
    pub fn successor(&mut self, successor: &Successor) -> String {
        if successor.operands.is_empty() {
            format!("^bb{}", successor.block)
        } else {
            let values = self.values(&successor.operands);
            let types = self.types(&successor.operands);
            format!("^bb{}({values} : {types})", successor.block)
        }
    }

    /// The attributes not spelled out by the format, as ` {a = 1, flag}`, or nothing.
    pub fn attr_dict(&self, op: &Operation, elided: &[&str]) -> String {
        let entries = op
            .attributes
            .iter()
            .filter(|(name, _)| !elided.contains(&name.as_str()))
            .map(|(name, value)| match value {
                Attribute::Unit => name.clone(),
                value => format!("{name} = {value}"),
            })
            .collect_vec();
        if entries.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", entries.join(", "))
        }
    }

    fn write_indent(&mut self, depth: usize) -> fmt::Result {
        let width = depth * self.config.indent;
        write!(self, "{:width$}", "")
    }

    /// Prints `{`, the blocks, and `}`. The entry block has no label.
    pub fn print_region(&mut self, region: &Region) -> fmt::Result {
        self.write_str("{\n")?;
        for (index, block) in region.blocks.iter().enumerate() {
            if index > 0 {
                self.write_indent(self.depth)?;
                write!(self, "^bb{index}")?;
                if !block.arguments.is_empty() {
                    let arguments = block
                        .arguments
                        .iter()
                        .map(|x| format!("{}: {}", self.value(*x), self.ty(*x)))
                        .join(", ");
                    write!(self, "({arguments})")?;
                }
                self.write_str(":\n")?;
            }
            self.depth += 1;
            for op in &block.operations {
                self.write_indent(self.depth)?;
                super::print_operation(self, op)?;
                self.write_str("\n")?;
            }
            self.depth -= 1;
        }
        self.write_indent(self.depth)?;
        self.write_str("}")
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}
