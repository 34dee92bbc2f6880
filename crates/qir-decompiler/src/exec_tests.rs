//! Tests for the symbolic executor.

use qir_bytecode::{CodeObject, CompareKind, Constant, Opcode, read};
use qir_core::{BinaryOp, Expression};

use super::error::DecompileError;
use super::exec::execute;
use super::graph::{Graph, Mode};
use super::order::sort;

fn executed(code: &CodeObject) -> Graph {
    try_executed(code).unwrap()
}

fn try_executed(code: &CodeObject) -> Result<Graph, DecompileError> {
    let instructions = read(code).unwrap();
    let mut graph = Graph::build(&instructions, Mode::Function, None)?;
    sort(&mut graph);
    execute(&mut graph, &[])?;
    Ok(graph)
}

#[test]
fn loads_and_operators_build_expressions() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .constant(Constant::Int(2))
        .simple(Opcode::BinaryAdd)
        .named(Opcode::StoreFast, "y")
        .named(Opcode::LoadFast, "y")
        .constant(Constant::Int(3))
        .simple(Opcode::BinaryMultiply)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    let block = &graph.blocks[0];
    assert_eq!(
        block.bindings,
        vec![(
            "y".to_owned(),
            Expression::binary(BinaryOp::Plus, Expression::ident("x"), Expression::Number(2)),
        )]
    );
    assert_eq!(
        block.returns,
        Some(Expression::binary(
            BinaryOp::Star,
            Expression::ident("y"),
            Expression::Number(3),
        ))
    );
    assert!(block.stack.is_empty());
}

#[test]
fn attribute_and_subscript_become_tuple_destructors() {
    let code = CodeObject::builder("f")
        .param("u")
        .named(Opcode::LoadFast, "u")
        .named(Opcode::LoadAttr, "age")
        .named(Opcode::LoadFast, "u")
        .constant(Constant::Str("name".to_owned()))
        .simple(Opcode::BinarySubscr)
        .simple(Opcode::BinaryAdd)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].returns,
        Some(Expression::binary(
            BinaryOp::Plus,
            Expression::attr(Expression::ident("u"), "age"),
            Expression::attr(Expression::ident("u"), "name"),
        ))
    );
}

#[test]
fn store_subscr_rebinds_named_containers() {
    let code = CodeObject::builder("f")
        .param("d")
        .constant(Constant::Int(1))
        .named(Opcode::LoadFast, "d")
        .constant(Constant::Str("k".to_owned()))
        .simple(Opcode::StoreSubscr)
        .constant(Constant::None)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].bindings,
        vec![(
            "d".to_owned(),
            Expression::tuple_cons(
                Expression::string("k"),
                Expression::Number(1),
                Expression::ident("d"),
            ),
        )]
    );
}

#[test]
fn delete_subscr_binds_the_key_to_null() {
    let code = CodeObject::builder("f")
        .param("d")
        .named(Opcode::LoadFast, "d")
        .constant(Constant::Str("k".to_owned()))
        .simple(Opcode::DeleteSubscr)
        .constant(Constant::None)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].bindings,
        vec![(
            "d".to_owned(),
            Expression::tuple_cons(
                Expression::string("k"),
                Expression::Null,
                Expression::ident("d"),
            ),
        )]
    );
}

#[test]
fn collection_constructors_fold_right() {
    let code = CodeObject::builder("f")
        .constant(Constant::Int(1))
        .constant(Constant::Int(2))
        .counted(Opcode::BuildList, 2)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].returns,
        Some(Expression::list([
            Expression::Number(1),
            Expression::Number(2)
        ]))
    );
}

#[test]
fn build_map_keeps_the_first_pair_outermost() {
    let code = CodeObject::builder("f")
        .constant(Constant::Str("a".to_owned()))
        .constant(Constant::Int(1))
        .constant(Constant::Str("b".to_owned()))
        .constant(Constant::Int(2))
        .counted(Opcode::BuildMap, 2)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].returns,
        Some(Expression::tuple_cons(
            Expression::string("a"),
            Expression::Number(1),
            Expression::tuple_cons(
                Expression::string("b"),
                Expression::Number(2),
                Expression::TupleNil,
            ),
        ))
    );
}

#[test]
fn build_string_concatenates() {
    let code = CodeObject::builder("f")
        .constant(Constant::Str("ab".to_owned()))
        .constant(Constant::Str("cd".to_owned()))
        .counted(Opcode::BuildString, 2)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(graph.blocks[0].returns, Some(Expression::string("abcd")));
}

#[test]
fn calls_curry_left_to_right() {
    let code = CodeObject::builder("f")
        .named(Opcode::LoadGlobal, "g")
        .constant(Constant::Int(1))
        .constant(Constant::Int(2))
        .counted(Opcode::CallFunction, 2)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    assert_eq!(
        graph.blocks[0].returns,
        Some(Expression::apply(
            Expression::apply(Expression::ident("g"), Expression::Number(1)),
            Expression::Number(2),
        ))
    );
}

#[test]
fn branch_successors_agree_on_popped_stacks() {
    let code = CodeObject::builder("f")
        .param("x")
        .var("z")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Int(1))
        .named(Opcode::StoreFast, "z")
        .jump(Opcode::JumpForward, "merge")
        .mark("else")
        .constant(Constant::Int(2))
        .named(Opcode::StoreFast, "z")
        .mark("merge")
        .named(Opcode::LoadFast, "z")
        .simple(Opcode::ReturnValue)
        .build();

    let graph = executed(&code);
    // Both arms bind z and leave an empty stack, so the merge block
    // reconciles and returns the free identifier.
    let merge = graph.block_mapping[&code.instructions[7].offset];
    assert_eq!(graph.blocks[merge].returns, Some(Expression::ident("z")));
    assert!(graph.blocks[merge].stack.is_empty());
}

#[test]
fn value_merging_branches_are_rejected() {
    // A ternary flowing different values into one block is outside the
    // structured subset.
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Int(1))
        .jump(Opcode::JumpForward, "merge")
        .mark("else")
        .constant(Constant::Int(2))
        .mark("merge")
        .simple(Opcode::ReturnValue)
        .build();

    assert!(matches!(
        try_executed(&code),
        Err(DecompileError::PredecessorStacks { .. })
    ));
}

#[test]
fn stack_underflow_is_reported() {
    let code = CodeObject::builder("f").simple(Opcode::PopTop).build();
    assert!(matches!(
        try_executed(&code),
        Err(DecompileError::StackUnderflow {
            opcode: "POP_TOP",
            offset: 0,
        })
    ));
}

#[test]
fn make_function_with_defaults_is_not_yet_implemented() {
    let listcomp = std::rc::Rc::new(CodeObject::builder("<listcomp>").param(".0").build());
    let code = CodeObject::builder("f")
        .constant(Constant::Int(1))
        .constant(Constant::Code(listcomp))
        .constant(Constant::Str("f.<locals>.<listcomp>".to_owned()))
        .counted(Opcode::MakeFunction, 1)
        .simple(Opcode::ReturnValue)
        .build();

    assert!(matches!(
        try_executed(&code),
        Err(DecompileError::NotYetImplemented(_))
    ));
}

#[test]
fn exotic_compare_payloads_have_no_kind() {
    assert_eq!(CompareKind::from_symbol("!="), None);
    assert_eq!(CompareKind::from_symbol("in"), None);
    assert_eq!(CompareKind::from_symbol("<"), Some(CompareKind::LowerThan));
}
