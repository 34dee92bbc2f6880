//! Instructions and their payloads.
//!
//! `RawInstruction` is the surface a producer hands us: an opname plus a
//! decoded argument value. `Instruction` is the typed form the rest of
//! the decompiler works with; the reader performs the conversion.

use std::rc::Rc;

use crate::code::CodeObject;
use crate::opcode::Opcode;

/// A constant embedded in a code object.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Constant>),
    /// A nested code object (lambdas, comprehensions).
    Code(Rc<CodeObject>),
}

/// Comparison payloads of `COMPARE_OP` the decompiler understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareKind {
    Equal,
    LowerOrEqual,
    LowerThan,
    GreaterOrEqual,
    GreaterThan,
}

impl CompareKind {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => CompareKind::Equal,
            "<=" => CompareKind::LowerOrEqual,
            "<" => CompareKind::LowerThan,
            ">=" => CompareKind::GreaterOrEqual,
            ">" => CompareKind::GreaterThan,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareKind::Equal => "==",
            CompareKind::LowerOrEqual => "<=",
            CompareKind::LowerThan => "<",
            CompareKind::GreaterOrEqual => ">=",
            CompareKind::GreaterThan => ">",
        }
    }
}

/// The decoded argument value of an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    None,
    Const(Constant),
    Name(String),
    /// Absolute destination offset of a jump, branch or loop delimiter.
    Target(u32),
    /// Operand count for calls, collection constructors and
    /// accumulator depths.
    Count(u32),
    Compare(CompareKind),
}

/// An instruction as handed over by the producer.
#[derive(Clone, Debug, PartialEq)]
pub struct RawInstruction {
    pub opname: String,
    pub arg: Option<u32>,
    pub payload: Payload,
    pub offset: u32,
    pub is_jump_target: bool,
    pub starts_line: Option<u32>,
}

/// A typed instruction, produced by [`crate::reader::read`].
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: Option<u32>,
    pub payload: Payload,
    pub offset: u32,
    pub is_jump_target: bool,
    pub starts_line: Option<u32>,
}

impl Instruction {
    /// Absolute jump destination, if the payload carries one.
    pub fn target(&self) -> Option<u32> {
        match self.payload {
            Payload::Target(offset) => Some(offset),
            _ => None,
        }
    }

    /// Name payload of load/store instructions.
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Operand count; defaults to the raw argument.
    pub fn count(&self) -> u32 {
        match self.payload {
            Payload::Count(n) => n,
            _ => self.arg.unwrap_or(0),
        }
    }

    /// Constant payload of `LOAD_CONST`.
    pub fn constant(&self) -> Option<&Constant> {
        match &self.payload {
            Payload::Const(constant) => Some(constant),
            _ => None,
        }
    }
}
