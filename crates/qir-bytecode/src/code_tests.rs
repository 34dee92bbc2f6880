//! Tests for the code-object builder.

use super::code::CodeObject;
use super::instruction::{CompareKind, Constant, Payload};
use super::opcode::Opcode;

#[test]
fn builder_assigns_offsets() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .constant(Constant::Int(2))
        .simple(Opcode::BinaryAdd)
        .simple(Opcode::ReturnValue)
        .build();

    let offsets: Vec<u32> = code.instructions.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 2, 4, 6]);
    assert_eq!(code.arg_names, vec!["x"]);
    assert_eq!(code.var_names, vec!["x"]);
}

#[test]
fn builder_resolves_labels_to_absolute_offsets() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Bool(true))
        .simple(Opcode::ReturnValue)
        .mark("else")
        .constant(Constant::Bool(false))
        .simple(Opcode::ReturnValue)
        .build();

    assert_eq!(code.instructions[1].payload, Payload::Target(8));
    assert!(code.instructions[4].is_jump_target);
    assert!(!code.instructions[3].is_jump_target);
}

#[test]
fn builder_marks_backward_targets() {
    let code = CodeObject::builder("loop")
        .mark("top")
        .simple(Opcode::Nop)
        .jump(Opcode::JumpAbsolute, "top")
        .build();

    assert!(code.instructions[0].is_jump_target);
    assert_eq!(code.instructions[1].payload, Payload::Target(0));
}

#[test]
fn compare_payload_and_arg_agreement() {
    let code = CodeObject::builder("f")
        .compare(CompareKind::LowerThan)
        .counted(Opcode::CallFunction, 2)
        .build();

    assert_eq!(
        code.instructions[0].payload,
        Payload::Compare(CompareKind::LowerThan)
    );
    assert_eq!(code.instructions[1].arg, Some(2));
    assert_eq!(code.instructions[1].payload, Payload::Count(2));
}

#[test]
fn comprehension_names_are_recognized() {
    for name in ["<listcomp>", "<setcomp>", "<dictcomp>", "<genexpr>"] {
        assert!(CodeObject::builder(name).build().is_comprehension());
    }
    assert!(!CodeObject::builder("get_names").build().is_comprehension());
}
