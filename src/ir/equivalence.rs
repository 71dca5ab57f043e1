//! Structural equality of modules, modulo value renaming.

use std::collections::HashMap;

use super::{Block, Module, Operation, Region, ValueId};

/// Returns whether both modules have the same operations, attributes and types,
/// with values matched one to one regardless of their names or arena slots.
pub fn equivalent(a: &Module, b: &Module) -> bool {
    let mut matcher = Matcher {
        a,
        b,
        forward: HashMap::new(),
        backward: HashMap::new(),
    };
    a.body.len() == b.body.len()
        && a
            .body
            .iter()
            .zip(b.body.iter())
            .all(|(x, y)| matcher.operation(x, y))
}

struct Matcher<'m> {
    a: &'m Module,
    b: &'m Module,
    forward: HashMap<ValueId, ValueId>,
    backward: HashMap<ValueId, ValueId>,
}

impl Matcher<'_> {
    fn value(&mut self, x: ValueId, y: ValueId) -> bool {
        match (self.forward.get(&x), self.backward.get(&y)) {
            (Some(mapped), Some(back)) => *mapped == y && *back == x,
            (None, None) => {
                let same_type = match (self.a.value_type(x), self.b.value_type(y)) {
                    (Some(tx), Some(ty)) => tx == ty,
                    _ => false,
                };
                if same_type {
                    self.forward.insert(x, y);
                    self.backward.insert(y, x);
                }
                same_type
            }
            _ => false,
        }
    }

    fn values(&mut self, xs: &[ValueId], ys: &[ValueId]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.value(*x, *y))
    }

    fn operation(&mut self, x: &Operation, y: &Operation) -> bool {
        x.opcode == y.opcode
            && x.attributes == y.attributes
            && self.values(&x.results, &y.results)
            && self.values(&x.operands, &y.operands)
            && x.successors.len() == y.successors.len()
            && x.successors
                .iter()
                .zip(y.successors.iter())
                .all(|(sx, sy)| sx.block == sy.block && self.values(&sx.operands, &sy.operands))
            && x.regions.len() == y.regions.len()
            && x.regions
                .iter()
                .zip(y.regions.iter())
                .all(|(rx, ry)| self.region(rx, ry))
    }

    fn region(&mut self, x: &Region, y: &Region) -> bool {
        x.blocks.len() == y.blocks.len()
            && x.blocks
                .iter()
                .zip(y.blocks.iter())
                .all(|(bx, by)| self.block(bx, by))
    }

    fn block(&mut self, x: &Block, y: &Block) -> bool {
        self.values(&x.arguments, &y.arguments)
            && x.operations.len() == y.operations.len()
            && x.operations
                .iter()
                .zip(y.operations.iter())
                .all(|(ox, oy)| self.operation(ox, oy))
    }
}
