//! Tests for the instruction reader.

use super::code::CodeObject;
use super::error::ReadError;
use super::instruction::Constant;
use super::opcode::Opcode;
use super::reader::read;

#[test]
fn reads_typed_stream_in_program_order() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .constant(Constant::Int(1))
        .simple(Opcode::BinaryAdd)
        .simple(Opcode::ReturnValue)
        .build();

    let instructions = read(&code).unwrap();
    let opcodes: Vec<Opcode> = instructions.iter().map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            Opcode::LoadFast,
            Opcode::LoadConst,
            Opcode::BinaryAdd,
            Opcode::ReturnValue
        ]
    );
}

#[test]
fn unknown_opcode_is_fatal() {
    let code = CodeObject::builder("f")
        .raw("SETUP_EXCEPT")
        .simple(Opcode::ReturnValue)
        .build();

    assert_eq!(
        read(&code),
        Err(ReadError::UnknownOpcode("SETUP_EXCEPT".to_owned()))
    );
}

#[test]
fn jump_without_target_is_malformed() {
    let code = CodeObject::builder("f").raw("JUMP_ABSOLUTE").build();

    assert!(matches!(
        read(&code),
        Err(ReadError::MalformedPayload {
            opcode: "JUMP_ABSOLUTE",
            offset: 0
        })
    ));
}

#[test]
fn load_const_requires_constant_payload() {
    let code = CodeObject::builder("f").raw("LOAD_CONST").build();

    assert!(matches!(
        read(&code),
        Err(ReadError::MalformedPayload { .. })
    ));
}
