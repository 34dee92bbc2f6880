//! Instruction-stream reader.
//!
//! Adapts a code object's raw producer instructions into typed
//! [`Instruction`]s. The opcode set is closed: unknown opnames are a
//! hard error, never skipped.

use crate::code::CodeObject;
use crate::error::ReadError;
use crate::instruction::{Instruction, Payload};
use crate::opcode::Opcode;

/// Decode a code object's instruction stream, in program order.
pub fn read(code: &CodeObject) -> Result<Vec<Instruction>, ReadError> {
    code.instructions.iter().map(decode).collect()
}

fn decode(raw: &crate::instruction::RawInstruction) -> Result<Instruction, ReadError> {
    let opcode = Opcode::from_opname(&raw.opname)
        .ok_or_else(|| ReadError::UnknownOpcode(raw.opname.clone()))?;

    let instruction = Instruction {
        opcode,
        arg: raw.arg,
        payload: raw.payload.clone(),
        offset: raw.offset,
        is_jump_target: raw.is_jump_target,
        starts_line: raw.starts_line,
    };

    check_payload(&instruction)?;
    Ok(instruction)
}

/// Payload/opcode agreement. A producer handing us a jump without a
/// target (or a `LOAD_CONST` without a constant) indicates a broken
/// stream, which we refuse early rather than during execution.
fn check_payload(instruction: &Instruction) -> Result<(), ReadError> {
    let malformed = || ReadError::MalformedPayload {
        opcode: instruction.opcode.opname(),
        offset: instruction.offset,
    };

    if instruction.opcode.has_target() && !matches!(instruction.payload, Payload::Target(_)) {
        return Err(malformed());
    }

    match instruction.opcode {
        Opcode::LoadConst => match instruction.payload {
            Payload::Const(_) => Ok(()),
            _ => Err(malformed()),
        },
        Opcode::CompareOp => match instruction.payload {
            Payload::Compare(_) => Ok(()),
            _ => Err(malformed()),
        },
        opcode if opcode.loads_name() => match instruction.payload {
            Payload::Name(_) => Ok(()),
            _ => Err(malformed()),
        },
        Opcode::LoadAttr
        | Opcode::StoreName
        | Opcode::StoreFast
        | Opcode::DeleteName
        | Opcode::DeleteFast => match instruction.payload {
            Payload::Name(_) => Ok(()),
            _ => Err(malformed()),
        },
        _ => Ok(()),
    }
}
