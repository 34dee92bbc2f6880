//! QIR expression algebra and local evaluation.
//!
//! This crate contains:
//! - The expression tree (`Expression`, `BinaryOp`, `Database`)
//! - Opaque host callables (`NativeFunction`)
//! - The host-value bridge (`encode`, `decode` over `serde_json::Value`)
//! - Environments and global-binding construction
//! - The call-by-value local evaluator (`Evaluator`, `evaluate`)

pub mod encode;
pub mod environment;
pub mod eval;
pub mod expression;
pub mod native;

mod algebra;
mod error;

#[cfg(test)]
mod encode_tests;
#[cfg(test)]
mod environment_tests;
#[cfg(test)]
mod expression_tests;

// Re-export commonly used items at crate root
pub use encode::{decode, encode};
pub use environment::{Environment, GlobalLookup, bindings_for};
pub use error::{BindingsError, DecodeError, EncodeError, EvalError};
pub use eval::{BytecodeRealizer, Evaluator, evaluate, evaluate_with};
pub use expression::{BinaryOp, Database, Expression};
pub use native::NativeFunction;
