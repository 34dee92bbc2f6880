//! Tests for environment construction from introspected globals.

use indexmap::IndexMap;
use serde_json::{Value, json};

use qir_bytecode::{CodeObject, Opcode};

use super::environment::bindings_for;
use super::expression::Expression;

fn lookup(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
    entries
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}

#[test]
fn resolvable_globals_are_encoded_and_bound() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .named(Opcode::LoadGlobal, "offset")
        .simple(Opcode::BinaryAdd)
        .simple(Opcode::ReturnValue)
        .build();

    let environment = bindings_for(&code, &lookup(&[("offset", json!(10))])).unwrap();
    assert_eq!(environment.get("offset"), Some(&Expression::Number(10)));
}

#[test]
fn unresolvable_globals_stay_free() {
    let code = CodeObject::builder("f")
        .named(Opcode::LoadGlobal, "table")
        .simple(Opcode::ReturnValue)
        .build();

    let environment = bindings_for(&code, &lookup(&[])).unwrap();
    assert!(environment.is_empty());
}

#[test]
fn dotted_globals_bind_under_their_dotted_name() {
    let code = CodeObject::builder("f")
        .named(Opcode::LoadGlobal, "math")
        .named(Opcode::LoadAttr, "pi")
        .simple(Opcode::ReturnValue)
        .build();

    let environment = bindings_for(&code, &lookup(&[("math.pi", json!(3.5))])).unwrap();
    assert_eq!(environment.get("math.pi"), Some(&Expression::Double(3.5)));
}
