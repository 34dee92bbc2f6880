//! Expression lowering.
//!
//! Blocks fold in reverse topological order, each assigning itself a
//! single expression built from its successors' expressions. Bindings
//! become `Application(Lambda(name, inner), value)` wrappers; branches
//! become conditionals; composite loops become fixed-point recursions
//! (or, for comprehensions, pass their already-rewritten stack
//! through).

use qir_core::Expression;

use crate::error::DecompileError;
use crate::exec::iteration_variable;
use crate::graph::{BlockId, BlockKind, Graph, LoopData};

/// Assign every reachable block its expression. The graph must have
/// been executed first.
pub(crate) fn express(graph: &mut Graph) -> Result<(), DecompileError> {
    for index in (0..graph.ordering.len()).rev() {
        let id = graph.ordering[index];
        if graph.blocks[id].expression.is_some() {
            // Placeholders carry their expression from construction.
            continue;
        }
        let expression = lower(graph, id)?;
        graph.blocks[id].expression = Some(expression);
    }
    Ok(())
}

fn successor_expression(graph: &Graph, id: Option<BlockId>) -> Expression {
    id.and_then(|id| graph.blocks[id].expression.clone())
        .unwrap_or(Expression::Null)
}

fn lower(graph: &mut Graph, id: BlockId) -> Result<Expression, DecompileError> {
    match &graph.blocks[id].kind {
        BlockKind::Linear => {
            let block = &graph.blocks[id];
            let base = match &block.returns {
                Some(value) => value.clone(),
                None => successor_expression(graph, block.next),
            };
            // Innermost wrapper first: the last binding is closest to
            // the base expression and sees every earlier one.
            let mut expression = base;
            for (name, value) in block.bindings.iter().rev() {
                expression = Expression::apply(
                    Expression::lambda(name.clone(), expression),
                    value.clone(),
                );
            }
            Ok(expression)
        }

        BlockKind::Jump { .. } => Ok(successor_expression(graph, graph.blocks[id].next)),

        BlockKind::Branch { instruction } => {
            let block = &graph.blocks[id];
            let condition = block
                .stack
                .last()
                .cloned()
                .ok_or(DecompileError::StackUnderflow {
                    opcode: instruction.opcode.opname(),
                    offset: instruction.offset,
                })?;
            let fallthrough = successor_expression(graph, block.next);
            let jumped = successor_expression(graph, block.next_jumped);
            let (on_true, on_false) = if instruction.opcode.fallthrough_on_true() {
                (fallthrough, jumped)
            } else {
                (jumped, fallthrough)
            };
            Ok(Expression::conditional(condition, on_true, on_false))
        }

        // The enclosing composite block materialises the loop
        // scaffolding; the iteration block is just its body chain.
        BlockKind::ForIter { .. } => Ok(successor_expression(graph, graph.blocks[id].next)),

        // The comprehension rewrote the surrounding stack during
        // execution; nothing is emitted here.
        BlockKind::ComprehensionLoop(_) => {
            Ok(successor_expression(graph, graph.blocks[id].next))
        }

        BlockKind::WhileLoop(_) => {
            let after = successor_expression(graph, graph.blocks[id].next);
            let entry = lower_inner(graph, id)?;
            Ok(while_expression(entry, after))
        }

        BlockKind::ForLoop(_) => {
            let after = successor_expression(graph, graph.blocks[id].next);
            let body = lower_inner(graph, id)?;
            let block = &graph.blocks[id];
            let data = block.loop_data().expect("for loop data");
            let offset = data.header.as_ref().expect("for loop header").offset;
            let iterator = data.iterator.clone().expect("for loop iterator");
            Ok(for_expression(offset, body, iterator, after))
        }

        BlockKind::Placeholder => unreachable!("placeholders are pre-assigned"),
    }
}

/// Lower a composite block's inner graph and return its entry
/// expression.
fn lower_inner(graph: &mut Graph, id: BlockId) -> Result<Expression, DecompileError> {
    let mut block = std::mem::take(&mut graph.blocks[id]);
    let result = (|| -> Result<Expression, DecompileError> {
        let data: &mut LoopData = block.loop_data_mut().expect("composite block");
        let inner = data.inner.as_mut().expect("executed composite block");
        express(&mut inner.graph)?;
        Ok(inner.graph.blocks[inner.entry]
            .expression
            .clone()
            .unwrap_or(Expression::Null))
    })();
    graph.blocks[id] = block;
    result
}

/// `while` lowering: the loop entry becomes the body of a thunked
/// fixed-point recursion, invoked once to start, with `on_after`
/// bound to the continuation after the loop.
fn while_expression(entry: Expression, after: Expression) -> Expression {
    Expression::apply(
        Expression::lambda(
            "on_after",
            Expression::apply(
                Expression::apply(
                    Expression::Fixed,
                    Expression::lambda("on_loop", Expression::lambda("_", entry)),
                ),
                Expression::Null,
            ),
        ),
        Expression::lambda("_", after),
    )
}

/// `for` lowering: a fixed-point recursion destructuring the iterator
/// list. Each step binds the iteration variable to the head and makes
/// `on_loop` recurse on the tail; exhaustion invokes `on_after`.
fn for_expression(
    offset: u32,
    body: Expression,
    iterator: Expression,
    after: Expression,
) -> Expression {
    let cv = iteration_variable(offset);
    let rec = format!("rec_{offset}");
    let lst = format!("lst_{offset}");
    let tail = format!("tl_{offset}");

    let on_cons = Expression::lambda(
        cv,
        Expression::lambda(
            tail.clone(),
            Expression::apply(
                Expression::lambda("on_loop", body),
                Expression::lambda(
                    "_",
                    Expression::apply(Expression::ident(rec.clone()), Expression::ident(tail)),
                ),
            ),
        ),
    );

    let step = Expression::lambda(
        rec,
        Expression::lambda(
            lst.clone(),
            Expression::list_destr(
                Expression::ident(lst),
                Expression::apply(Expression::ident("on_after"), Expression::Null),
                on_cons,
            ),
        ),
    );

    Expression::apply(
        Expression::lambda(
            "on_after",
            Expression::apply(Expression::apply(Expression::Fixed, step), iterator),
        ),
        Expression::lambda("_", after),
    )
}
