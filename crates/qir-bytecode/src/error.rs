//! Errors raised while decoding an instruction stream.

/// Failure to turn a raw instruction stream into typed instructions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The producer emitted an opcode outside the supported set.
    /// Silently accepting it would corrupt the decompilation, so this
    /// is fatal for the whole stream.
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),

    /// A known opcode arrived with a payload of the wrong kind
    /// (e.g. `LOAD_CONST` without a constant).
    #[error("opcode `{opcode}` at offset {offset} carries a malformed payload")]
    MalformedPayload { opcode: &'static str, offset: u32 },
}
