//! Remote-evaluation seam and orchestration.
//!
//! The transport is a byte-level trait; the orchestration tries the
//! remote evaluator first and falls back to local evaluation only when
//! the expression is not remotely evaluable (a `Native` somewhere in
//! the tree). Local evaluation gets the decompiler installed as its
//! bytecode realizer.

use std::rc::Rc;

use qir_bytecode::CodeObject;
use qir_core::{Environment, EvalError, Evaluator, Expression};
use qir_decompiler::decompile;

use crate::error::{EvaluateError, WireError};
use crate::message::{BuiltinResolver, decode_wire, encode_wire, to_message};
use crate::message::from_message;

/// A remote QIR evaluator: consumes a framed message, returns the
/// framed reduction. The only component allowed to block on I/O.
pub trait RemoteEvaluator {
    fn evaluate(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// A local evaluator with the decompiler wired in, so `Bytecode` nodes
/// reduce to their decompiled lambda chains.
pub fn local_evaluator() -> Evaluator {
    Evaluator::new().realizer(Rc::new(|code: &CodeObject| {
        decompile(code).map_err(|error| EvalError::Type(format!("bytecode realisation: {error}")))
    }))
}

/// Evaluate on the remote server. An unserialisable tree declines with
/// `NotRemotelyEvaluable`; transport and codec failures propagate.
pub fn evaluate_remotely(
    expression: &Expression,
    remote: &dyn RemoteEvaluator,
    resolver: &dyn BuiltinResolver,
) -> Result<Expression, WireError> {
    let message = match to_message(expression) {
        Ok(message) => message,
        Err(WireError::NotSerializable) => return Err(WireError::NotRemotelyEvaluable),
        Err(other) => return Err(other),
    };
    let reply = remote
        .evaluate(&encode_wire(&message)?)
        .map_err(WireError::Transport)?;
    from_message(&decode_wire(&reply)?, resolver)
}

/// Full evaluation: remote first, local only after the remote path has
/// declined with `NotRemotelyEvaluable`.
pub fn evaluate(
    expression: &Expression,
    environment: &Environment,
    remote: &dyn RemoteEvaluator,
    resolver: &dyn BuiltinResolver,
) -> Result<Expression, EvaluateError> {
    match evaluate_remotely(expression, remote, resolver) {
        Ok(result) => Ok(result),
        Err(WireError::NotRemotelyEvaluable) => Ok(local_evaluator()
            .evaluate(expression, environment)?),
        Err(other) => Err(other.into()),
    }
}
