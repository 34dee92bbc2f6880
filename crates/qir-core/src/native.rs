//! Opaque host callables.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::EvalError;

/// A host function wrapped for use inside a QIR tree.
///
/// The callable works on host values; the evaluator decodes the QIR
/// argument before the call and encodes the result after it. Anything
/// wrapped here is unserialisable, which poisons the enclosing subtree
/// for remote evaluation.
#[derive(Clone)]
pub struct NativeFunction {
    function: Rc<dyn Fn(Value) -> Result<Value, EvalError>>,
}

impl NativeFunction {
    pub fn new(function: impl Fn(Value) -> Result<Value, EvalError> + 'static) -> Self {
        Self {
            function: Rc::new(function),
        }
    }

    pub fn call(&self, argument: Value) -> Result<Value, EvalError> {
        (self.function)(argument)
    }
}

/// Identity of the underlying callable. Two wrappers are equal only if
/// they share the same host function.
impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.function, &other.function)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFunction(<host>)")
    }
}
