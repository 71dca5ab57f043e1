use llvm_ops::catalog::{Catalog, OpCode, TraitSet};
use llvm_ops::check::verify_module;
use llvm_ops::codegen::recording::InstKind;
use llvm_ops::codegen::{BinaryOp, LoweringErrorKind, RecordingHost, lower_functions_concurrently};
use llvm_ops::ir::{Attribute, Type, equivalent};
use test_case::test_case;

use crate::common::{lower, parse, print, verify};

mod common;

const ADD: &str = "llvm.func @f(%a: i32, %b: i32) -> i32 {
  %0 = llvm.add %a, %b : i32
  llvm.return %0 : i32
}
";

#[test]
fn add_is_one_host_call() {
    let module = verify(ADD).unwrap();
    assert_eq!(print(&module), ADD);

    let host = lower(ADD).unwrap();
    assert_eq!(host.count("add"), 1);
    let f = host.function("f").unwrap();
    let instructions = f.instructions().collect::<Vec<_>>();
    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].kind, InstKind::Binary(BinaryOp::Add));
    assert_eq!(instructions[0].operands, f.blocks[0].arguments);
    assert_eq!(host.value_type(instructions[0].result.unwrap()), Some(&Type::i32()));
    assert_eq!(instructions[1].kind, InstKind::Ret);
}

#[test]
fn swapped_operands_are_a_different_module() {
    let spec = Catalog::builtin().spec(OpCode::Add);
    assert!(spec.has_trait(TraitSet::COMMUTATIVE));
    assert!(spec.has_trait(TraitSet::SAME_OPERANDS_AND_RESULT_TYPE));

    let swapped = ADD.replace("llvm.add %a, %b", "llvm.add %b, %a");
    assert!(!equivalent(&parse(ADD), &verify(&swapped).unwrap()));

    let host = lower(&swapped).unwrap();
    let f = host.function("f").unwrap();
    let add = f.instructions().next().unwrap();
    let (a, b) = (f.blocks[0].arguments[0], f.blocks[0].arguments[1]);
    assert_eq!(add.operands, vec![b, a]);
}

#[test]
fn branches_pass_block_arguments() {
    let host = lower(include_str!("../demos/factorial.mlir")).unwrap();
    let f = host.function("factorial").unwrap();
    assert_eq!(f.blocks.len(), 4);
    assert_eq!(f.blocks[1].arguments.len(), 2);

    let n = f.blocks[0].arguments[0];
    let [constant, br] = f.blocks[0].instructions.as_slice() else {
        panic!("unexpected entry block {:?}", f.blocks[0]);
    };
    assert_eq!(constant.kind, InstKind::Constant(Attribute::int(1, Type::i32())));
    assert_eq!(br.kind, InstKind::Br(1));
    assert_eq!(br.operands, vec![n, constant.result.unwrap()]);

    let cond_br = f.blocks[1].instructions.last().unwrap();
    assert_eq!(
        cond_br.kind,
        InstKind::CondBr {
            then: 2,
            otherwise: 3,
            split: 0
        }
    );
    assert_eq!(cond_br.operands.len(), 1);

    let back_edge = f.blocks[2].instructions.last().unwrap();
    assert_eq!(back_edge.kind, InstKind::Br(1));
    assert_eq!(back_edge.operands.len(), 2);
}

#[test]
fn use_before_lowering_discards_the_function() {
    let source = "llvm.func @ok() {
  llvm.return
}
llvm.func @f(%a: i32) -> i32 {
  llvm.br ^bb2
^bb1:
  %1 = llvm.add %0, %a : i32
  llvm.return %1 : i32
^bb2:
  %0 = llvm.mul %a, %a : i32
  llvm.br ^bb1
}
";
    let module = parse(source);
    let verified = verify_module(&module).unwrap();
    let mut host = RecordingHost::new();
    let error = llvm_ops::codegen::lower_module(&verified, &mut host).unwrap_err();

    assert_eq!(error.function, "f");
    assert_eq!(error.op, "llvm.add");
    assert_eq!(error.kind, LoweringErrorKind::UnmappedValue { index: 0 });
    assert!(host.function("ok").is_some());
    assert!(host.function("f").is_none());
    assert_eq!(host.count("mul"), 0);
}

#[test_case(include_str!("../demos/factorial.mlir"), "mul", 1 ; "factorial")]
#[test_case(include_str!("../demos/vectors.mlir"), "fadd", 2 ; "vectors")]
#[test_case(include_str!("../demos/globals.mlir"), "addressof", 2 ; "globals")]
#[test_case(include_str!("../demos/aggregates.mlir"), "insertvalue", 2 ; "aggregates")]
#[test_case(include_str!("../demos/memory.mlir"), "store", 3 ; "memory")]
fn demos_lower(source: &str, name: &str, count: usize) {
    let host = lower(source).unwrap();
    assert_eq!(host.count(name), count);
}

#[test]
fn globals_are_declared_once() {
    let host = lower(include_str!("../demos/globals.mlir")).unwrap();
    let names = host.globals().iter().map(|x| x.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["msg", "counter"]);
    assert!(host.globals()[0].constant);
    assert!(host.function("puts").unwrap().is_declaration());
    assert_eq!(host.count("call"), 1);
}

#[test_case(1 ; "one job")]
#[test_case(2 ; "two jobs")]
#[test_case(8 ; "more jobs than functions")]
fn concurrent_lowering_matches_sequential(jobs: usize) {
    let source = include_str!("../demos/vectors.mlir");
    let sequential = lower(source).unwrap();

    let module = parse(source);
    let verified = verify_module(&module).unwrap();
    let lowered = lower_functions_concurrently(&verified, jobs, RecordingHost::new);
    let names = lowered.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["dot", "lanes"]);

    for (name, host) in lowered {
        let host = host.unwrap();
        let function = host.function(&name).unwrap();
        let expected = sequential.function(&name).unwrap();
        let kinds = |f: &llvm_ops::codegen::recording::RecordedFunction| {
            f.instructions().map(|x| x.kind.clone()).collect::<Vec<_>>()
        };
        assert_eq!(kinds(function), kinds(expected));
    }
}
