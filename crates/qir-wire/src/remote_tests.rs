//! Tests for the remote-then-local orchestration.

use std::cell::Cell;

use qir_core::{Environment, Expression, NativeFunction};

use super::error::WireError;
use super::message::{NoBuiltins, decode_wire, encode_wire};
use super::remote::{RemoteEvaluator, evaluate, evaluate_remotely, local_evaluator};

/// A fake server that echoes a canned reduction and counts calls.
struct FakeServer {
    calls: Cell<u32>,
    reply: Expression,
}

impl FakeServer {
    fn replying(reply: Expression) -> Self {
        Self {
            calls: Cell::new(0),
            reply,
        }
    }
}

impl RemoteEvaluator for FakeServer {
    fn evaluate(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        self.calls.set(self.calls.get() + 1);
        // The request must at least decode.
        decode_wire(message).map_err(|error| error.to_string())?;
        let reply = super::message::to_message(&self.reply).map_err(|error| error.to_string())?;
        encode_wire(&reply).map_err(|error| error.to_string())
    }
}

struct DownServer;

impl RemoteEvaluator for DownServer {
    fn evaluate(&self, _message: &[u8]) -> Result<Vec<u8>, String> {
        Err("connection refused".to_owned())
    }
}

#[test]
fn serialisable_trees_evaluate_remotely() {
    let server = FakeServer::replying(Expression::Number(42));
    let query = Expression::scan(Expression::string("users"));

    let result = evaluate(&query, &Environment::new(), &server, &NoBuiltins).unwrap();
    assert_eq!(result, Expression::Number(42));
    assert_eq!(server.calls.get(), 1);
}

#[test]
fn native_trees_decline_remotely() {
    let native = Expression::apply(
        Expression::Native(NativeFunction::new(Ok)),
        Expression::Number(1),
    );
    let server = FakeServer::replying(Expression::Null);

    assert_eq!(
        evaluate_remotely(&native, &server, &NoBuiltins),
        Err(WireError::NotRemotelyEvaluable)
    );
    // The decline happens before any transport traffic.
    assert_eq!(server.calls.get(), 0);
}

#[test]
fn local_fallback_only_after_remote_declines() {
    // Contains a Native, so the remote path declines and the local
    // evaluator reduces the application.
    let double = NativeFunction::new(|value: serde_json::Value| {
        Ok(serde_json::json!(value.as_i64().unwrap_or(0) * 2))
    });
    let program = Expression::apply(Expression::Native(double), Expression::Number(21));
    let server = FakeServer::replying(Expression::Null);

    let result = evaluate(&program, &Environment::new(), &server, &NoBuiltins).unwrap();
    assert_eq!(result, Expression::Number(42));
    assert_eq!(server.calls.get(), 0);
}

#[test]
fn transport_failures_propagate() {
    let query = Expression::scan(Expression::string("users"));
    let result = evaluate(&query, &Environment::new(), &DownServer, &NoBuiltins);
    assert!(matches!(
        result,
        Err(super::error::EvaluateError::Wire(WireError::Transport(_)))
    ));
}

#[test]
fn local_evaluator_realises_bytecode() {
    use qir_bytecode::{CodeObject, Opcode};

    // λx. x, shipped as a code object and applied to 7.
    let identity = std::rc::Rc::new(
        CodeObject::builder("identity")
            .param("x")
            .named(Opcode::LoadFast, "x")
            .simple(Opcode::ReturnValue)
            .build(),
    );
    let program = Expression::apply(Expression::Bytecode(identity), Expression::Number(7));

    let result = local_evaluator()
        .evaluate(&program, &Environment::new())
        .unwrap();
    assert_eq!(result, Expression::Number(7));
}
