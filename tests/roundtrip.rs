use llvm_ops::ir::equivalent;
use test_case::test_case;

use crate::common::{parse, print, renumbered, verify};

mod common;

#[test_case(include_str!("../demos/factorial.mlir") ; "factorial.mlir")]
#[test_case(include_str!("../demos/vectors.mlir") ; "vectors.mlir")]
#[test_case(include_str!("../demos/globals.mlir") ; "globals.mlir")]
#[test_case(include_str!("../demos/aggregates.mlir") ; "aggregates.mlir")]
#[test_case(include_str!("../demos/memory.mlir") ; "memory.mlir")]
fn demos_print_back_byte_for_byte(source: &str) {
    let module = verify(source).unwrap();
    assert_eq!(print(&module), source);
}

#[test_case(include_str!("../demos/factorial.mlir") ; "factorial.mlir")]
#[test_case(include_str!("../demos/vectors.mlir") ; "vectors.mlir")]
#[test_case(include_str!("../demos/globals.mlir") ; "globals.mlir")]
#[test_case(include_str!("../demos/aggregates.mlir") ; "aggregates.mlir")]
#[test_case(include_str!("../demos/memory.mlir") ; "memory.mlir")]
fn renumbered_output_is_equivalent(source: &str) {
    let module = parse(source);
    let reparsed = parse(&renumbered(&module));
    assert!(equivalent(&module, &reparsed));
    // Printing is stable once names are numbers.
    assert_eq!(renumbered(&reparsed), renumbered(&module));
}

fn body(line: &str) -> String {
    format!(
        "llvm.func @f(%a: i32, %b: i32, %x: f64, %y: f64, %p: ptr<i64>) {{\n  {line}\n  llvm.return\n}}\n"
    )
}

#[test_case("%0 = llvm.add %a, %b : i32" ; "add")]
#[test_case("%0 = llvm.sub %a, %b : i32" ; "sub")]
#[test_case("%0 = llvm.mul %a, %b : i32" ; "mul")]
#[test_case("%0 = llvm.udiv %a, %b : i32" ; "udiv")]
#[test_case("%0 = llvm.sdiv %a, %b : i32" ; "sdiv")]
#[test_case("%0 = llvm.urem %a, %b : i32" ; "urem")]
#[test_case("%0 = llvm.srem %a, %b : i32" ; "srem")]
#[test_case("%0 = llvm.and %a, %b : i32" ; "and")]
#[test_case("%0 = llvm.or %a, %b : i32" ; "or")]
#[test_case("%0 = llvm.xor %a, %b : i32" ; "xor")]
#[test_case("%0 = llvm.shl %a, %b : i32" ; "shl")]
#[test_case("%0 = llvm.lshr %a, %b : i32" ; "lshr")]
#[test_case("%0 = llvm.ashr %a, %b : i32" ; "ashr")]
#[test_case("%0 = llvm.fadd %x, %y : f64" ; "fadd")]
#[test_case("%0 = llvm.fsub %x, %y : f64" ; "fsub")]
#[test_case("%0 = llvm.fmul %x, %y : f64" ; "fmul")]
#[test_case("%0 = llvm.fdiv %x, %y : f64" ; "fdiv")]
#[test_case("%0 = llvm.frem %x, %y : f64" ; "frem")]
#[test_case("%0 = llvm.fneg %x : f64" ; "fneg")]
#[test_case("%0 = llvm.icmp uge %a, %b : i32" ; "icmp")]
#[test_case("%0 = llvm.fcmp une %x, %y : f64" ; "fcmp")]
#[test_case("%0 = llvm.trunc %a : i32 to i8" ; "trunc")]
#[test_case("%0 = llvm.zext %a : i32 to i64" ; "zext")]
#[test_case("%0 = llvm.fptosi %x : f64 to i32" ; "fptosi")]
#[test_case("%0 = llvm.fptoui %x : f64 to i32" ; "fptoui")]
#[test_case("%0 = llvm.uitofp %a : i32 to f32" ; "uitofp")]
#[test_case("%0 = llvm.fptrunc %x : f64 to f32" ; "fptrunc")]
#[test_case("%0 = llvm.ptrtoint %p : ptr<i64> to i64" ; "ptrtoint")]
#[test_case("%0 = llvm.inttoptr %a : i32 to ptr<i8>" ; "inttoptr")]
#[test_case("%0 = llvm.mlir.null : ptr<f64>" ; "null")]
#[test_case("%0 = llvm.mlir.undef : vector<2 x f64>" ; "undef")]
#[test_case("%0 = llvm.mlir.constant(true) : i1" ; "bool constant")]
fn single_operations(line: &str) {
    let source = body(line);
    let module = verify(&source).unwrap();
    assert_eq!(print(&module), source);
}

#[test]
fn forward_references_inside_a_function() {
    let source = "llvm.func @f() -> i32 {
  %0 = llvm.mlir.constant(7 : i32) : i32
  llvm.br ^bb2
^bb1:
  llvm.return %1 : i32
^bb2:
  %1 = llvm.add %0, %0 : i32
  llvm.br ^bb1
}
";
    let module = verify(source).unwrap();
    assert_eq!(print(&module), source);
}
