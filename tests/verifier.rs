use llvm_ops::catalog::OpCode;
use llvm_ops::check::{SymbolResolutionError, ViolationKind, VerifyErrorKind, verify_module};
use llvm_ops::ir::{
    Attribute, Block, EnumKind, FunctionType, Module, OperationState, Region, Type,
};
use test_case::test_case;

use crate::common::verify;

mod common;

fn kind(source: &str) -> VerifyErrorKind {
    verify(source).unwrap_err().kind
}

#[test]
fn return_must_match_the_signature() {
    let source = "llvm.func @f() -> i32 {\n  llvm.return\n}\n";
    assert_eq!(
        kind(source),
        VerifyErrorKind::ReturnCount {
            expected: 1,
            found: 0
        }
    );

    let source = "llvm.func @f(%x: i64) -> i32 {\n  llvm.return %x : i64\n}\n";
    assert!(matches!(kind(source), VerifyErrorKind::TypeMismatch { .. }));
}

#[test]
fn successor_arguments_must_match_the_block() {
    let source = "llvm.func @f(%x: i32) {\n  llvm.br ^bb1(%x : i32)\n^bb1:\n  llvm.return\n}\n";
    assert_eq!(
        kind(source),
        VerifyErrorKind::SuccessorOperandCount {
            successor: 0,
            expected: 0,
            found: 1
        }
    );
}

#[test_case("" ; "no successors")]
#[test_case(", ^bb1" ; "one successor")]
#[test_case(", ^bb1, ^bb2, ^bb1" ; "three successors")]
fn cond_br_takes_exactly_two_successors(successors: &str) {
    let source = format!(
        "llvm.func @f(%c: i1) {{\n  llvm.cond_br %c{successors}\n^bb1:\n  llvm.return\n^bb2:\n  llvm.return\n}}\n"
    );
    let found = successors.matches('^').count();
    assert_eq!(
        kind(&source),
        VerifyErrorKind::SuccessorCount { expected: 2, found }
    );
}

#[test_case("llvm.global @g(0 : i32) : i32\nllvm.global @g(1 : i32) : i32\n" ; "two globals")]
#[test_case("llvm.global @g(0 : i32) : i32\nllvm.func @g()\n" ; "global and function")]
fn duplicated_symbols_are_ambiguous(source: &str) {
    assert_eq!(
        kind(source),
        VerifyErrorKind::Symbol(SymbolResolutionError::Ambiguous {
            name: "g".into(),
            count: 2
        })
    );
}

#[test]
fn addressof_of_a_function_has_its_type() {
    let source = "llvm.func @callee(i32) -> i32
llvm.func @f() -> ptr<func<i32 (i32)>> {
  %0 = llvm.mlir.addressof @callee : ptr<func<i32 (i32)>>
  llvm.return %0 : ptr<func<i32 (i32)>>
}
";
    verify(source).unwrap();

    let wrong = source.replace("ptr<func<i32 (i32)>>", "ptr<i32>");
    assert!(matches!(kind(&wrong), VerifyErrorKind::TypeMismatch { .. }));
}

#[test]
fn shufflevector_mask_is_bounded_by_both_inputs() {
    let source = "llvm.func @f(%a: vector<2 x i32>, %b: vector<2 x i32>) {
  %0 = llvm.shufflevector %a, %b [0, 3, 4] : vector<2 x i32>, vector<2 x i32>
  llvm.return
}
";
    assert_eq!(
        kind(source),
        VerifyErrorKind::ShuffleMaskIndex {
            index: 2,
            value: 4,
            bound: 4
        }
    );
}

#[test]
fn construction_checks_arity() {
    let mut module = Module::new();
    let a = module.new_value(Type::i32(), None);
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
            found: 1,
            ..
        }
    ));
}

#[test]
fn construction_checks_enum_codes() {
    let mut module = Module::new();
    let a = module.new_value(Type::i32(), None);
    let err = module
        .create_operation(
            OperationState::new(OpCode::ICmp)
                .add_operands(&[a, a])
                .add_result(Type::i1())
                .add_attribute(
                    "predicate",
                    Attribute::Enum {
                        kind: EnumKind::IntPredicate,
                        code: 10,
                    },
                ),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::EnumMember { code: 10, .. }));
}

#[test]
fn built_modules_are_verified_like_parsed_ones() {
    let mut module = Module::new();
    let a = module.new_value(Type::i32(), None);
    let b = module.new_value(Type::i64(), None);
    let add = module
        .create_operation(
            OperationState::new(OpCode::Add)
                .add_operands(&[a, b])
                .add_result(Type::i32()),
        )
        .unwrap();
    let ret = module
        .create_operation(OperationState::new(OpCode::Return))
        .unwrap();
    let signature = FunctionType::new(Type::Void, vec![Type::i32(), Type::i64()]);
    let body = Region {
        blocks: vec![Block {
            arguments: vec![a, b],
            operations: vec![add, ret],
        }],
    };
    let func = module
        .create_operation(
            OperationState::new(OpCode::Func)
                .add_attribute("sym_name", Attribute::String("f".into()))
                .add_attribute("function_type", Attribute::Type(Type::func(signature)))
                .add_region(body),
        )
        .unwrap();
    module.body.push(func);

    let err = verify_module(&module).unwrap_err();
    assert_eq!(err.op, "llvm.add");
    assert_eq!(err.kind, VerifyErrorKind::NotSameType);
}

#[test]
fn unknown_attributes_are_rejected_while_parsing() {
    let source = "llvm.func @f(%p: ptr<i64>) {\n  %0 = llvm.load %p {bogus} : ptr<i64>\n  llvm.return\n}\n";
    let error = llvm_ops::parser::parse_module(source).unwrap_err();
    assert_eq!(
        error.kind,
        llvm_ops::parser::ParseErrorKind::Constraint(llvm_ops::check::ConstraintViolation {
            op: "llvm.load",
            kind: ViolationKind::UnknownAttribute("bogus".into()),
        })
    );
}

#[test]
fn nested_functions_are_not_at_module_scope() {
    let mut module = Module::new();
    let ret = module
        .create_operation(OperationState::new(OpCode::Return))
        .unwrap();
    let signature = Attribute::Type(Type::func(FunctionType::new(Type::Void, vec![])));
    let inner = module
        .create_operation(
            OperationState::new(OpCode::Func)
                .add_attribute("sym_name", Attribute::String("inner".into()))
                .add_attribute("function_type", signature.clone())
                .add_region(Region::default()),
        )
        .unwrap();
    let outer = module
        .create_operation(
            OperationState::new(OpCode::Func)
                .add_attribute("sym_name", Attribute::String("outer".into()))
                .add_attribute("function_type", signature)
                .add_region(Region {
                    blocks: vec![Block {
                        arguments: vec![],
                        operations: vec![inner, ret],
                    }],
                }),
        )
        .unwrap();
    module.body.push(outer);

    let err = verify_module(&module).unwrap_err();
    assert_eq!(err.op, "llvm.func");
    assert_eq!(err.kind, VerifyErrorKind::NotAtModuleScope);
}

const CALLEES: &str = "llvm.global @g(0 : i32) : i32
llvm.func @callee(i32) -> i32
";

#[test_case("%0 = llvm.call @callee(%x) : (i32) -> i32", None ; "matching call")]
#[test_case(
    "%0 = llvm.call @g(%x) : (i32) -> i32",
    Some(VerifyErrorKind::CalleeNotFunction { name: "g".into() }) ;
    "global callee"
)]
#[test_case(
    "%0 = llvm.call @callee(%x, %x) : (i32, i32) -> i32",
    Some(VerifyErrorKind::CallArgumentCount { expected: 1, variadic: false, found: 2 }) ;
    "too many arguments"
)]
#[test_case(
    "%0 = llvm.call %p(%x) : (i32) -> i32",
    Some(VerifyErrorKind::IndirectCallee { found: Some(Type::ptr(Type::i32())) }) ;
    "callee is not a function pointer"
)]
#[test_case(
    "%0 = llvm.call @nope(%x) : (i32) -> i32",
    Some(VerifyErrorKind::Symbol(SymbolResolutionError::Unresolved { name: "nope".into() })) ;
    "undeclared callee"
)]
fn calls_follow_the_callee(line: &str, expected: Option<VerifyErrorKind>) {
    let source = format!(
        "{CALLEES}llvm.func @f(%x: i32, %p: ptr<i32>) {{\n  {line}\n  llvm.return\n}}\n"
    );
    assert_eq!(verify(&source).err().map(|x| x.kind), expected);
}

#[test_case("255 : i8", "i8", true ; "unsigned i8 max")]
#[test_case("-128 : i8", "i8", true ; "signed i8 min")]
#[test_case("300 : i8", "i8", false ; "too wide for i8")]
#[test_case("-129 : i8", "i8", false ; "too negative for i8")]
#[test_case("2 : i1", "i1", false ; "i1 holds one bit")]
#[test_case("65504.0 : f16", "f16", true ; "f16 max")]
#[test_case("70000.0 : f16", "f16", false ; "too large for f16")]
#[test_case("1.0e300 : f32", "f32", false ; "too large for f32")]
#[test_case("1.0e300 : f64", "f64", true ; "fits f64")]
fn literals_fit_their_type(literal: &str, ty: &str, fits: bool) {
    let source = format!(
        "llvm.func @f() {{\n  %0 = llvm.mlir.constant({literal}) : {ty}\n  llvm.return\n}}\n"
    );
    match verify(&source) {
        Ok(_) => assert!(fits, "{literal} was accepted"),
        Err(err) => {
            assert!(!fits, "{literal} was rejected: {err}");
            assert_eq!(err.op, "llvm.mlir.constant");
            assert!(matches!(err.kind, VerifyErrorKind::LiteralOutOfRange { .. }));
        }
    }

    let global = format!("llvm.global @g({literal}) : {ty}\n");
    assert_eq!(verify(&global).is_ok(), fits);
}
