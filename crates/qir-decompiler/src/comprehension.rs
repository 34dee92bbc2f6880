//! Comprehension-to-relational rewriting.
//!
//! Instead of compiling a comprehension loop into a recursive
//! expression, the body is walked from the iteration block to the
//! block that grows the accumulator (or yields, for generators). The
//! bindings met along the way form an abstract environment substituted
//! into the element and into every branch condition; the conditions
//! conjoin into a `Filter`, and the element becomes the `Project`
//! format over the iterator.

use std::collections::HashSet;

use qir_core::{BinaryOp, Expression};

use crate::error::DecompileError;
use crate::graph::{BlockId, BlockKind, Graph};

/// Rewrite an executed comprehension body into a `Project`/`Filter`
/// pipeline over `iterator`. Returns the pipeline and whether the
/// element came from a yield (generator form).
pub(crate) fn rewrite(
    graph: &Graph,
    entry: BlockId,
    iterator: Expression,
    variable: &str,
) -> Result<(Expression, bool), DecompileError> {
    let mut environment: Vec<(String, Expression)> = Vec::new();
    let mut conditions: Vec<Expression> = Vec::new();
    let mut visited: HashSet<BlockId> = HashSet::new();

    let mut current = graph.blocks[entry]
        .next
        .ok_or_else(|| DecompileError::Unsupported("empty comprehension body".to_owned()))?;

    loop {
        if !visited.insert(current) {
            return Err(DecompileError::Unsupported(
                "cyclic comprehension body".to_owned(),
            ));
        }
        let block = &graph.blocks[current];

        match &block.kind {
            BlockKind::Linear => {
                for (name, value) in &block.bindings {
                    let value = substitute_all(value, &environment);
                    environment.push((name.clone(), value));
                }
                if let Some(element) = &block.appended {
                    let element = substitute_all(element, &environment);
                    return Ok((
                        pipeline(element, conditions, iterator, variable),
                        block.yielded,
                    ));
                }
                current = block.next.ok_or_else(|| {
                    DecompileError::Unsupported("comprehension body without append".to_owned())
                })?;
            }

            BlockKind::Jump { .. } => {
                current = block.next.ok_or_else(|| {
                    DecompileError::Unsupported("comprehension body without append".to_owned())
                })?;
            }

            BlockKind::Branch { instruction } => {
                let condition = block.stack.last().ok_or(DecompileError::StackUnderflow {
                    opcode: instruction.opcode.opname(),
                    offset: instruction.offset,
                })?;
                let condition = substitute_all(condition, &environment);

                let fallthrough = block.next;
                let jumped = block.next_jumped;
                let follow_fallthrough = match (fallthrough, jumped) {
                    (Some(next), _) if leads_to_append(graph, next) => true,
                    (_, Some(next)) if leads_to_append(graph, next) => false,
                    _ => {
                        return Err(DecompileError::Unsupported(
                            "comprehension body without append".to_owned(),
                        ));
                    }
                };

                // Negate when the taken path disagrees with the branch
                // polarity.
                let positive = instruction.opcode.fallthrough_on_true() == follow_fallthrough;
                conditions.push(if positive {
                    condition
                } else {
                    Expression::not(condition)
                });

                current = if follow_fallthrough {
                    fallthrough.expect("checked above")
                } else {
                    jumped.expect("checked above")
                };
            }

            BlockKind::Placeholder => {
                return Err(DecompileError::Unsupported(
                    "comprehension body without append".to_owned(),
                ));
            }

            _ => {
                return Err(DecompileError::Unsupported(
                    "nested loop in a comprehension body".to_owned(),
                ));
            }
        }
    }
}

fn substitute_all(expression: &Expression, environment: &[(String, Expression)]) -> Expression {
    let mut result = expression.clone();
    for (name, value) in environment {
        result = result.substitute(name, value);
    }
    result
}

/// Whether a path from `id` reaches a block that grows the accumulator.
fn leads_to_append(graph: &Graph, id: BlockId) -> bool {
    let mut visited = HashSet::new();
    let mut pending = vec![id];
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let block = &graph.blocks[id];
        if block.appended.is_some() {
            return true;
        }
        pending.extend(block.successors().into_iter().map(|(succ, _)| succ));
    }
    false
}

fn pipeline(
    element: Expression,
    conditions: Vec<Expression>,
    iterator: Expression,
    variable: &str,
) -> Expression {
    let input = match conjoin(conditions) {
        Some(condition) => Expression::filter(Expression::lambda(variable, condition), iterator),
        None => iterator,
    };
    Expression::project(Expression::lambda(variable, element), input)
}

fn conjoin(conditions: Vec<Expression>) -> Option<Expression> {
    let mut conditions = conditions.into_iter();
    let first = conditions.next()?;
    Some(conditions.fold(first, |left, right| {
        Expression::binary(BinaryOp::And, left, right)
    }))
}
