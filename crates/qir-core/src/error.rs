//! Errors of the algebra, the host bridge and the local evaluator.

use qir_bytecode::ReadError;

/// A host value that cannot be represented accurately as a QIR value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// Numbers above `i64::MAX` have no `Number` representation.
    #[error("number {0} cannot be encoded accurately")]
    NotEncodable(serde_json::Number),
}

/// A QIR expression that cannot be turned back into a host value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Only value and structural expressions decode.
    #[error("`{0}` expressions cannot be decoded to a host value")]
    NotDecodable(&'static str),

    /// A `ListCons` tail that does not itself decode to a list.
    #[error("list tail does not decode to a list")]
    MalformedList,

    /// A `TupleCons` key that does not decode to a string.
    #[error("tuple key does not decode to a string")]
    MalformedKey,

    /// A `TupleCons` tail that does not decode to a mapping.
    #[error("tuple tail does not decode to a mapping")]
    MalformedTuple,

    /// Host numbers cannot carry non-finite doubles.
    #[error("non-finite double cannot be decoded")]
    NonFinite,
}

/// Failure of local evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// An operator or conditional was given the wrong expression kind,
    /// or an operation failed on the payloads themselves.
    #[error("type error: {0}")]
    Type(String),

    /// The tree contains a node only the remote evaluator can resolve
    /// (relational operators, database and table references).
    #[error("expression is not locally evaluable")]
    NotLocallyEvaluable,

    #[error("not yet implemented: {0}")]
    NotYetImplemented(&'static str),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failure to build an initial environment from a code object's
/// global names.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingsError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
