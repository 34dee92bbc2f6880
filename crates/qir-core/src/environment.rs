//! Evaluation environments.

use indexmap::IndexMap;
use serde_json::Value;

use qir_bytecode::{CodeObject, global_names};

use crate::encode::encode;
use crate::error::BindingsError;
use crate::expression::Expression;

/// Name-to-expression bindings, threaded through evaluation. Extension
/// happens copy-on-write at lambda entry, never in place.
pub type Environment = IndexMap<String, Expression>;

/// Host-side capability resolving a (possibly dotted) global name to
/// its current value.
pub trait GlobalLookup {
    fn global_value(&self, name: &str) -> Option<Value>;
}

impl GlobalLookup for IndexMap<String, Value> {
    fn global_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Build the initial environment for a code object: every global name
/// it references that the lookup can resolve is encoded and bound.
/// Unresolvable names stay free.
pub fn bindings_for(
    code: &CodeObject,
    lookup: &dyn GlobalLookup,
) -> Result<Environment, BindingsError> {
    let mut environment = Environment::new();
    for name in global_names(code)? {
        if let Some(value) = lookup.global_value(&name) {
            environment.insert(name, encode(&value)?);
        }
    }
    Ok(environment)
}
