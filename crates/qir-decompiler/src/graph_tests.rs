//! Tests for CFG construction.

use qir_bytecode::{CodeObject, CompareKind, Constant, Opcode, read};

use super::graph::{BlockKind, Graph, Mode};

fn build(code: &CodeObject, mode: Mode) -> Graph {
    let instructions = read(code).unwrap();
    Graph::build(&instructions, mode, None).unwrap()
}

#[test]
fn straight_line_code_is_one_block() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .constant(Constant::Int(2))
        .simple(Opcode::BinaryAdd)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    assert_eq!(graph.blocks.len(), 1);
    assert!(matches!(graph.blocks[0].kind, BlockKind::Linear));
    assert!(graph.blocks[0].reached_return);
    assert_eq!(graph.blocks[0].next, None);
}

#[test]
fn branches_split_blocks_and_resolve_targets() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .constant(Constant::Int(10))
        .compare(CompareKind::LowerThan)
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Bool(true))
        .simple(Opcode::ReturnValue)
        .mark("else")
        .constant(Constant::Bool(false))
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    assert_eq!(graph.blocks.len(), 4);
    assert!(matches!(graph.blocks[0].kind, BlockKind::Linear));
    assert!(matches!(graph.blocks[1].kind, BlockKind::Branch { .. }));

    // Fallthrough and jump edges of the branch.
    assert_eq!(graph.blocks[1].next, Some(2));
    assert_eq!(graph.blocks[1].next_jumped, Some(3));

    // Both arms return, so neither has a successor.
    assert_eq!(graph.blocks[2].next, None);
    assert_eq!(graph.blocks[3].next, None);
}

#[test]
fn every_offset_is_mapped_to_exactly_one_block() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Int(1))
        .simple(Opcode::ReturnValue)
        .mark("else")
        .constant(Constant::Int(2))
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    for instruction in &code.instructions {
        assert!(
            graph.block_mapping.contains_key(&instruction.offset),
            "offset {} unmapped",
            instruction.offset
        );
    }
}

#[test]
fn instructions_after_a_return_are_suppressed_but_mapped() {
    let code = CodeObject::builder("f")
        .constant(Constant::Bool(true))
        .simple(Opcode::ReturnValue)
        .constant(Constant::Str("unreachable".to_owned()))
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    assert_eq!(graph.blocks.len(), 1);
    // Only the instructions up to the first return are kept.
    assert_eq!(graph.blocks[0].instructions.len(), 2);
    // The suppressed ones still resolve through the mapping.
    assert_eq!(graph.block_mapping[&4], 0);
    assert_eq!(graph.block_mapping[&6], 0);
}

#[test]
fn while_loops_swallow_their_body() {
    let code = CodeObject::builder("f")
        .param("x")
        .var("y")
        .jump(Opcode::SetupLoop, "after")
        .mark("cond")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "popblock")
        .named(Opcode::LoadFast, "y")
        .named(Opcode::StoreFast, "y")
        .jump(Opcode::JumpAbsolute, "cond")
        .mark("popblock")
        .simple(Opcode::PopBlock)
        .mark("after")
        .constant(Constant::Int(1))
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    assert_eq!(graph.blocks.len(), 2);
    let data = graph.blocks[0].loop_data().expect("while loop block");
    assert!(matches!(graph.blocks[0].kind, BlockKind::WhileLoop(_)));
    // Body holds everything between SETUP_LOOP and the loop end.
    let opnames: Vec<&str> = data.body.iter().map(|i| i.opcode.opname()).collect();
    assert_eq!(
        opnames,
        vec![
            "LOAD_FAST",
            "POP_JUMP_IF_FALSE",
            "LOAD_FAST",
            "STORE_FAST",
            "JUMP_ABSOLUTE",
            "POP_BLOCK"
        ]
    );
    assert_eq!(graph.blocks[0].next, Some(1));
}

#[test]
fn for_iter_opens_a_for_loop_in_function_mode() {
    let code = CodeObject::builder("f")
        .param("x")
        .var("z")
        .jump(Opcode::SetupLoop, "after")
        .named(Opcode::LoadFast, "x")
        .simple(Opcode::GetIter)
        .mark("loop")
        .jump(Opcode::ForIter, "cleanup")
        .named(Opcode::StoreFast, "z")
        .jump(Opcode::JumpAbsolute, "loop")
        .mark("cleanup")
        .simple(Opcode::PopBlock)
        .mark("after")
        .constant(Constant::None)
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    // Prelude, composite loop, POP_BLOCK, epilogue.
    assert_eq!(graph.blocks.len(), 4);
    assert!(matches!(graph.blocks[1].kind, BlockKind::ForLoop(_)));
    let data = graph.blocks[1].loop_data().unwrap();
    assert_eq!(data.body[0].opcode, Opcode::ForIter);
    assert_eq!(data.body.len(), 3);
}

#[test]
fn comprehension_mode_switches_the_loop_kind() {
    let code = CodeObject::builder("<listcomp>")
        .param(".0")
        .var("u")
        .counted(Opcode::BuildList, 0)
        .named(Opcode::LoadFast, ".0")
        .mark("loop")
        .jump(Opcode::ForIter, "end")
        .named(Opcode::StoreFast, "u")
        .named(Opcode::LoadFast, "u")
        .counted(Opcode::ListAppend, 2)
        .jump(Opcode::JumpAbsolute, "loop")
        .mark("end")
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Comprehension);
    assert!(
        graph
            .blocks
            .iter()
            .any(|b| matches!(b.kind, BlockKind::ComprehensionLoop(_)))
    );
}

#[test]
fn predecessors_mirror_forward_edges() {
    let code = CodeObject::builder("f")
        .param("x")
        .named(Opcode::LoadFast, "x")
        .jump(Opcode::PopJumpIfFalse, "else")
        .constant(Constant::Int(1))
        .simple(Opcode::ReturnValue)
        .mark("else")
        .constant(Constant::Int(2))
        .simple(Opcode::ReturnValue)
        .build();

    let graph = build(&code, Mode::Function);
    for block in &graph.blocks {
        for (successor, flow) in block.successors() {
            assert!(
                graph.blocks[successor]
                    .predecessors
                    .contains(&(block.id, flow))
            );
        }
    }
}
