//! Construction time checks of an operation against its catalog entry.

use thiserror::Error;

use crate::catalog::{AttrKind, OperationSpec, TypeConstraint, ValueSpec};
use crate::ir::{Attribute, Attributes, EnumKind, Operation, OperationState, Type, ValueId, Values};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("'{op}' op {kind}")]
pub struct ConstraintViolation {
    pub op: &'static str,
    pub kind: ViolationKind,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViolationKind {
    #[error("expected {} operands, found {found}", arity(.expected, .variadic))]
    OperandCount {
        expected: usize,
        variadic: bool,
        found: usize,
    },
    #[error("operand #{index} ('{name}') must be {constraint}, found {found}")]
    OperandType {
        index: usize,
        name: &'static str,
        constraint: TypeConstraint,
        found: Type,
    },
    #[error("operand #{index} is not a value of this module")]
    DanglingOperand { index: usize },
    #[error("result #{index} is not a value of this module")]
    DanglingResult { index: usize },
    #[error("expected {} results, found {found}", arity(.expected, .variadic))]
    ResultCount {
        expected: usize,
        variadic: bool,
        found: usize,
    },
    #[error("result #{index} ('{name}') must be {constraint}, found {found}")]
    ResultType {
        index: usize,
        name: &'static str,
        constraint: TypeConstraint,
        found: Type,
    },
    #[error("requires attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("does not accept attribute '{0}'")]
    UnknownAttribute(String),
    #[error("attribute '{name}' must be a {expected} attribute, found {found}")]
    AttributeKind {
        name: &'static str,
        expected: AttrKind,
        found: String,
    },
    #[error("attribute '{name}' has no {} with code {code}", .kind.name())]
    EnumMember {
        name: &'static str,
        kind: EnumKind,
        code: u64,
    },
    #[error("only terminators can have successors, found {0}")]
    UnexpectedSuccessors(usize),
    #[error("expected {expected} regions, found {found}")]
    RegionCount { expected: usize, found: usize },
}

fn arity(expected: &usize, variadic: &bool) -> String {
    if *variadic {
        format!("at least {expected}")
    } else {
        expected.to_string()
    }
}

/// The parts of an operation the constraint engine looks at.
struct Parts<'a> {
    operands: &'a [ValueId],
    result_types: Vec<&'a Type>,
    attributes: &'a Attributes,
    successors: usize,
    regions: usize,
}

/// Checks an `OperationState` before the operation is created.
pub fn check_state(
    spec: &OperationSpec,
    state: &OperationState,
    values: &Values,
) -> Result<(), ConstraintViolation> {
    check(
        spec,
        Parts {
            operands: &state.operands,
            result_types: state.result_types.iter().collect(),
            attributes: &state.attributes,
            successors: state.successors.len(),
            regions: state.regions.len(),
        },
        values,
    )
}

/// Re-checks an already built operation. Operations can be mutated after creation,
/// so the verifier runs this again.
pub fn check_operation(
    spec: &OperationSpec,
    op: &Operation,
    values: &Values,
) -> Result<(), ConstraintViolation> {
    let mut result_types = Vec::with_capacity(op.results.len());
    for (index, result) in op.results.iter().enumerate() {
        match values.get(*result) {
            Some(data) => result_types.push(&data.ty),
            None => {
                return Err(ConstraintViolation {
                    op: spec.name(),
                    kind: ViolationKind::DanglingResult { index },
                });
            }
        }
    }
    check(
        spec,
        Parts {
            operands: &op.operands,
            result_types,
            attributes: &op.attributes,
            successors: op.successors.len(),
            regions: op.regions.len(),
        },
        values,
    )
}

fn check(spec: &OperationSpec, parts: Parts<'_>, values: &Values) -> Result<(), ConstraintViolation> {
    let fail = |kind| ConstraintViolation {
        op: spec.name(),
        kind,
    };

    // Operands.
    check_arity(&spec.operands, parts.operands.len()).map_err(|(expected, variadic)| {
        fail(ViolationKind::OperandCount {
            expected,
            variadic,
            found: parts.operands.len(),
        })
    })?;
    for (index, operand) in parts.operands.iter().enumerate() {
        let operand_spec = spec_at(&spec.operands, index);
        let ty = match values.get(*operand) {
            Some(data) => &data.ty,
            None => return Err(fail(ViolationKind::DanglingOperand { index })),
        };
        if !operand_spec.constraint.matches(ty) {
            return Err(fail(ViolationKind::OperandType {
                index,
                name: operand_spec.name,
                constraint: operand_spec.constraint,
                found: ty.clone(),
            }));
        }
    }

    // Results.
    check_arity(&spec.results, parts.result_types.len()).map_err(|(expected, variadic)| {
        fail(ViolationKind::ResultCount {
            expected,
            variadic,
            found: parts.result_types.len(),
        })
    })?;
    for (index, ty) in parts.result_types.iter().enumerate() {
        let result_spec = spec_at(&spec.results, index);
        if !result_spec.constraint.matches(ty) {
            return Err(fail(ViolationKind::ResultType {
                index,
                name: result_spec.name,
                constraint: result_spec.constraint,
                found: (*ty).clone(),
            }));
        }
    }

    // Attributes.
    for attribute_spec in &spec.attributes {
        match parts.attributes.get(attribute_spec.name) {
            None if attribute_spec.required => {
                return Err(fail(ViolationKind::MissingAttribute(attribute_spec.name)));
            }
            None => {}
            Some(attribute) => check_attribute(attribute_spec.name, attribute_spec.kind, attribute)
                .map_err(fail)?,
        }
    }
    if let Some(unknown) = parts
        .attributes
        .keys()
        .find(|name| spec.attribute_spec(name).is_none())
    {
        return Err(fail(ViolationKind::UnknownAttribute(unknown.clone())));
    }

    if spec.successors.is_none() && parts.successors > 0 {
        return Err(fail(ViolationKind::UnexpectedSuccessors(parts.successors)));
    }
    if parts.regions != spec.regions.len() {
        return Err(fail(ViolationKind::RegionCount {
            expected: spec.regions.len(),
            found: parts.regions,
        }));
    }

    Ok(())
}

/// Ok if `found` values fit the list, otherwise the expected count and whether it is a minimum.
fn check_arity(specs: &[ValueSpec], found: usize) -> Result<(), (usize, bool)> {
    match specs.last() {
        Some(last) if last.variadic => {
            let fixed = specs.len() - 1;
            if found >= fixed { Ok(()) } else { Err((fixed, true)) }
        }
        _ if found == specs.len() => Ok(()),
        _ => Err((specs.len(), false)),
    }
}

/// The spec a value at `index` is checked against. Indices past the end belong to
/// the trailing variadic entry, `check_arity` has already ruled out anything else.
fn spec_at(specs: &[ValueSpec], index: usize) -> &ValueSpec {
    &specs[index.min(specs.len() - 1)]
}

fn check_attribute(
    name: &'static str,
    kind: AttrKind,
    attribute: &Attribute,
) -> Result<(), ViolationKind> {
    if !kind.accepts(attribute) {
        return Err(ViolationKind::AttributeKind {
            name,
            expected: kind,
            found: attribute.to_string(),
        });
    }
    if let (AttrKind::Enum(expected), Attribute::Enum { code, .. }) = (kind, attribute) {
        if !expected.is_member(*code) {
            return Err(ViolationKind::EnumMember {
                name,
                kind: expected,
                code: *code,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OpCode;
    use crate::ir::{IntPredicate, Module};

    #[test]
    fn add_checks_operand_count_and_types() {
        let mut module = Module::new();
        let a = module.new_value(Type::i32(), None);
        let f = module.new_value(Type::f32(), None);

        let err = module
            .create_operation(
                OperationState::new(OpCode::Add)
                    .add_operands(&[a])
                    .add_result(Type::i32()),
            )
            .unwrap_err();
        assert_eq!(err.op, "llvm.add");
        assert!(matches!(
            err.kind,
            ViolationKind::OperandCount {
                expected: 2,
                variadic: false,
                found: 1
            }
        ));

        let err = module
            .create_operation(
                OperationState::new(OpCode::Add)
                    .add_operands(&[a, f])
                    .add_result(Type::i32()),
            )
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ViolationKind::OperandType { index: 1, name: "rhs", .. }
        ));
    }

    #[test]
    fn attributes_are_checked() {
        let mut module = Module::new();
        let a = module.new_value(Type::i32(), None);
        let icmp = || {
            OperationState::new(OpCode::ICmp)
                .add_operands(&[a, a])
                .add_result(Type::i1())
        };

        let err = module.create_operation(icmp()).unwrap_err();
        assert_eq!(err.kind, ViolationKind::MissingAttribute("predicate"));

        let err = module
            .create_operation(icmp().add_attribute(
                "predicate",
                Attribute::Enum {
                    kind: EnumKind::IntPredicate,
                    code: 10,
                },
            ))
            .unwrap_err();
        assert!(matches!(err.kind, ViolationKind::EnumMember { code: 10, .. }));

        let err = module
            .create_operation(
                icmp()
                    .add_attribute("predicate", Attribute::enumeration(IntPredicate::Eq))
                    .add_attribute("fastmath", Attribute::Unit),
            )
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnknownAttribute("fastmath".into()));

        module
            .create_operation(icmp().add_attribute("predicate", Attribute::enumeration(IntPredicate::Eq)))
            .unwrap();
    }

    #[test]
    fn variadic_operands_accept_any_count() {
        let mut module = Module::new();
        let a = module.new_value(Type::i32(), None);
        for count in 0..4 {
            module
                .create_operation(OperationState::new(OpCode::Return).add_operands(&vec![a; count]))
                .unwrap();
        }
    }

    #[test]
    fn successors_only_on_terminators() {
        let mut module = Module::new();
        let p = module.new_value(Type::ptr(Type::i32()), None);
        let err = module
            .create_operation(
                OperationState::new(OpCode::Load)
                    .add_operands(&[p])
                    .add_result(Type::i32())
                    .add_successor(crate::ir::Successor::new(1, vec![])),
            )
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnexpectedSuccessors(1));
    }
}
