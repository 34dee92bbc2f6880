//! Tests for the host-value bridge.

use serde_json::json;

use super::encode::{decode, encode};
use super::error::{DecodeError, EncodeError};
use super::expression::Expression;

#[test]
fn scalars_encode_to_value_variants() {
    assert_eq!(encode(&json!(null)).unwrap(), Expression::Null);
    assert_eq!(encode(&json!(true)).unwrap(), Expression::Boolean(true));
    assert_eq!(encode(&json!(42)).unwrap(), Expression::Number(42));
    assert_eq!(encode(&json!(2.5)).unwrap(), Expression::Double(2.5));
    assert_eq!(
        encode(&json!("users")).unwrap(),
        Expression::String("users".to_owned())
    );
}

#[test]
fn arrays_fold_head_first() {
    let encoded = encode(&json!([1, 2])).unwrap();
    assert_eq!(
        encoded,
        Expression::cons(
            Expression::Number(1),
            Expression::cons(Expression::Number(2), Expression::ListNil)
        )
    );
}

#[test]
fn objects_fold_first_key_outermost() {
    let encoded = encode(&json!({"a": 1, "b": 2})).unwrap();
    assert_eq!(
        encoded,
        Expression::tuple_cons(
            Expression::string("a"),
            Expression::Number(1),
            Expression::tuple_cons(
                Expression::string("b"),
                Expression::Number(2),
                Expression::TupleNil
            )
        )
    );
}

#[test]
fn round_trip_on_the_encodable_set() {
    let values = [
        json!(null),
        json!(false),
        json!(-7),
        json!(3.25),
        json!("text"),
        json!([1, [2, "x"], {"k": null}]),
        json!({"a": 1, "b": 2}),
        json!({}),
        json!([]),
    ];
    for value in values {
        assert_eq!(decode(&encode(&value).unwrap()).unwrap(), value);
    }
}

#[test]
fn encode_after_decode_is_identity_on_value_trees() {
    let trees = [
        Expression::Number(3),
        Expression::list([Expression::Boolean(true), Expression::Null]),
        Expression::tuple_cons(
            Expression::string("a"),
            Expression::Number(1),
            Expression::tuple_cons(
                Expression::string("b"),
                Expression::list([Expression::string("x")]),
                Expression::TupleNil,
            ),
        ),
    ];
    for tree in trees {
        assert_eq!(encode(&decode(&tree).unwrap()).unwrap(), tree);
    }
}

#[test]
fn oversized_integers_are_not_encodable() {
    let value = json!(u64::MAX);
    assert!(matches!(
        encode(&value),
        Err(EncodeError::NotEncodable(_))
    ));
}

#[test]
fn head_key_is_authoritative_over_the_tail() {
    let tree = Expression::tuple_cons(
        Expression::string("k"),
        Expression::Number(1),
        Expression::tuple_cons(
            Expression::string("k"),
            Expression::Number(2),
            Expression::TupleNil,
        ),
    );
    assert_eq!(decode(&tree).unwrap(), json!({"k": 1}));
}

#[test]
fn non_value_nodes_are_not_decodable() {
    let lambda = Expression::lambda("x", Expression::ident("x"));
    assert_eq!(decode(&lambda), Err(DecodeError::NotDecodable("Lambda")));

    let scan = Expression::scan(Expression::string("users"));
    assert_eq!(decode(&scan), Err(DecodeError::NotDecodable("Scan")));
}

#[test]
fn malformed_structures_are_rejected() {
    let bad_tail = Expression::cons(Expression::Number(1), Expression::Number(2));
    assert_eq!(decode(&bad_tail), Err(DecodeError::MalformedList));

    let bad_key = Expression::tuple_cons(
        Expression::Number(1),
        Expression::Number(2),
        Expression::TupleNil,
    );
    assert_eq!(decode(&bad_key), Err(DecodeError::MalformedKey));
}
