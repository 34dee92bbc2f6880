//! Tests for the expression tree helpers.

use super::expression::{BinaryOp, Expression};
use super::native::NativeFunction;

#[test]
fn list_folds_right_associated() {
    let list = Expression::list([Expression::Number(1), Expression::Number(2)]);
    assert_eq!(
        list,
        Expression::cons(
            Expression::Number(1),
            Expression::cons(Expression::Number(2), Expression::ListNil)
        )
    );
}

#[test]
fn substitute_replaces_free_occurrences() {
    let body = Expression::binary(
        BinaryOp::Plus,
        Expression::ident("x"),
        Expression::ident("y"),
    );
    let result = body.substitute("x", &Expression::Number(3));
    assert_eq!(
        result,
        Expression::binary(BinaryOp::Plus, Expression::Number(3), Expression::ident("y"))
    );
}

#[test]
fn substitute_respects_shadowing() {
    // λx. x + y: substituting x must not reach under the binder.
    let shadowed = Expression::lambda(
        "x",
        Expression::binary(
            BinaryOp::Plus,
            Expression::ident("x"),
            Expression::ident("y"),
        ),
    );
    let result = shadowed.substitute("x", &Expression::Number(3));
    assert_eq!(result, shadowed);

    let inner = shadowed.substitute("y", &Expression::Number(7));
    assert_eq!(
        inner,
        Expression::lambda(
            "x",
            Expression::binary(
                BinaryOp::Plus,
                Expression::ident("x"),
                Expression::Number(7)
            ),
        )
    );
}

#[test]
fn native_poisons_enclosing_trees() {
    let native = Expression::Native(NativeFunction::new(Ok));
    assert!(native.contains_native());

    let wrapped = Expression::apply(
        Expression::lambda("x", Expression::ident("x")),
        Expression::cons(native, Expression::ListNil),
    );
    assert!(wrapped.contains_native());

    let clean = Expression::filter(
        Expression::lambda("u", Expression::Boolean(true)),
        Expression::scan(Expression::string("users")),
    );
    assert!(!clean.contains_native());
}

#[test]
fn native_equality_is_by_identity() {
    let f = NativeFunction::new(Ok);
    let g = NativeFunction::new(Ok);
    assert_eq!(f.clone(), f);
    assert_ne!(f, g);
}

#[test]
fn display_is_compact() {
    let expression = Expression::lambda(
        "x",
        Expression::binary(
            BinaryOp::Plus,
            Expression::ident("x"),
            Expression::Number(2),
        ),
    );
    assert_eq!(
        expression.to_string(),
        "Lambda(Identifier(\"x\"), Plus(Identifier(\"x\"), Number(2)))"
    );
}

#[test]
fn variant_names_match_wire_names() {
    assert_eq!(Expression::ListNil.variant_name(), "ListNil");
    assert_eq!(
        Expression::binary(
            BinaryOp::LowerThan,
            Expression::Number(1),
            Expression::Number(2)
        )
        .variant_name(),
        "LowerThan"
    );
    assert_eq!(Expression::Fixed.variant_name(), "Fixed");
}
