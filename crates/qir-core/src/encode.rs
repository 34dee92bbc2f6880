//! Host-value bridge.
//!
//! `encode` maps a host value (`serde_json::Value`) into a QIR value
//! tree; `decode` is its left inverse on the value/structural subset.

use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::expression::Expression;

/// Encode a host value as a QIR value tree.
///
/// Mappings fold right-associated: the first array element is the
/// outermost list head, the first object key the outermost tuple key.
pub fn encode(value: &Value) -> Result<Expression, EncodeError> {
    match value {
        Value::Null => Ok(Expression::Null),
        Value::Bool(b) => Ok(Expression::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Expression::Number(i))
            } else if n.is_u64() {
                Err(EncodeError::NotEncodable(n.clone()))
            } else {
                // serde_json numbers are i64, u64 or finite f64.
                Ok(Expression::Double(n.as_f64().expect("finite float")))
            }
        }
        Value::String(s) => Ok(Expression::String(s.clone())),
        Value::Array(items) => {
            let mut expression = Expression::ListNil;
            for item in items.iter().rev() {
                expression = Expression::cons(encode(item)?, expression);
            }
            Ok(expression)
        }
        Value::Object(entries) => {
            let mut expression = Expression::TupleNil;
            for (key, item) in entries.iter().rev() {
                expression = Expression::tuple_cons(
                    Expression::String(key.clone()),
                    encode(item)?,
                    expression,
                );
            }
            Ok(expression)
        }
    }
}

/// Decode a QIR value/structural tree back into a host value.
///
/// Tuple decoding inserts head keys first, so the first occurrence of a
/// key is authoritative over duplicates deeper in the tail.
pub fn decode(expression: &Expression) -> Result<Value, DecodeError> {
    match expression {
        Expression::Null => Ok(Value::Null),
        Expression::Boolean(b) => Ok(Value::Bool(*b)),
        Expression::Number(n) => Ok(Value::from(*n)),
        Expression::Double(d) => {
            serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .ok_or(DecodeError::NonFinite)
        }
        Expression::String(s) => Ok(Value::String(s.clone())),
        Expression::ListNil => Ok(Value::Array(Vec::new())),
        Expression::ListCons(head, tail) => {
            let head = decode(head)?;
            match decode(tail)? {
                Value::Array(rest) => {
                    let mut items = Vec::with_capacity(rest.len() + 1);
                    items.push(head);
                    items.extend(rest);
                    Ok(Value::Array(items))
                }
                _ => Err(DecodeError::MalformedList),
            }
        }
        Expression::TupleNil => Ok(Value::Object(Map::new())),
        Expression::TupleCons { key, value, tail } => {
            let key = match decode(key)? {
                Value::String(key) => key,
                _ => return Err(DecodeError::MalformedKey),
            };
            let value = decode(value)?;
            match decode(tail)? {
                Value::Object(rest) => {
                    let mut entries = Map::new();
                    entries.insert(key, value);
                    for (k, v) in rest {
                        entries.entry(k).or_insert(v);
                    }
                    Ok(Value::Object(entries))
                }
                _ => Err(DecodeError::MalformedTuple),
            }
        }
        other => Err(DecodeError::NotDecodable(other.variant_name())),
    }
}
