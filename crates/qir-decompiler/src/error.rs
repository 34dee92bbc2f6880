//! Decompilation failures.

use qir_bytecode::ReadError;
use qir_core::Expression;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecompileError {
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A known instruction shape the decompiler does not handle yet
    /// (function defaults, exotic compare payloads, ...).
    #[error("not yet implemented: {0}")]
    NotYetImplemented(String),

    /// Incompatible operand stacks flowing into a block. Indicates a
    /// control-flow shape outside the structured subset.
    #[error("predecessor stacks disagree at block {block}")]
    PredecessorStacks {
        block: usize,
        stacks: Vec<Vec<Expression>>,
    },

    /// An instruction popped more operands than the stack holds, which
    /// means the stream is malformed.
    #[error("operand stack underflow at `{opcode}` (offset {offset})")]
    StackUnderflow { opcode: &'static str, offset: u32 },

    /// A jump destination that no block claims.
    #[error("jump target {0} is not mapped to a block")]
    UnmappedOffset(u32),

    /// A stream shape the structured-control-flow subset excludes.
    #[error("unsupported instruction shape: {0}")]
    Unsupported(String),
}
