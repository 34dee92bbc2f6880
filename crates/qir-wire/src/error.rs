//! Wire and orchestration failures.

use qir_core::EvalError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    /// The tree contains a `Native` node (or another opaque payload in
    /// a position that cannot be skipped).
    #[error("expression contains an unserialisable node")]
    NotSerializable,

    /// The message skipped a field (code objects) that is required to
    /// rebuild the expression.
    #[error("message cannot be reconstructed into an expression")]
    NotUnserializable,

    /// Remote evaluation declined; the caller should fall back to
    /// local evaluation.
    #[error("expression is not remotely evaluable")]
    NotRemotelyEvaluable,

    #[error("unknown builtin `{module}.{name}`")]
    UnknownBuiltin { module: String, name: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("codec failure: {0}")]
    Codec(String),
}

/// Failure of the full remote-then-local evaluation path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
