//! Wire surface for QIR expressions.
//!
//! `Message` mirrors the expression algebra with one variant per
//! expression variant and one field per serialisable field; opaque
//! payloads (host callables, code objects) are skipped. Messages frame
//! to bytes with postcard. `remote` holds the transport seam and the
//! remote-then-local orchestration.

pub mod message;
pub mod remote;

mod error;

#[cfg(test)]
mod remote_tests;

// Re-export commonly used items at crate root
pub use error::{EvaluateError, WireError};
pub use message::{
    BuiltinResolver, Message, NoBuiltins, decode_wire, encode_wire, from_message, to_message,
};
pub use remote::{RemoteEvaluator, evaluate, evaluate_remotely, local_evaluator};
