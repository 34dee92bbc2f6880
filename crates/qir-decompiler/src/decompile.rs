//! The decompilation pipeline.

use qir_bytecode::{CodeObject, read};
use qir_core::Expression;

use crate::error::DecompileError;
use crate::exec::execute;
use crate::express::express;
use crate::graph::{Graph, Mode};
use crate::order::sort;

/// Lift a code object into a QIR expression: one `Lambda` per formal
/// parameter (the first parameter outermost) around the lowered body.
pub fn decompile(code: &CodeObject) -> Result<Expression, DecompileError> {
    decompile_code(code)
}

/// Shared entry point, also used for code constants decompiled inline
/// by `MAKE_FUNCTION`/`MAKE_CLOSURE`.
pub(crate) fn decompile_code(code: &CodeObject) -> Result<Expression, DecompileError> {
    let instructions = read(code)?;
    let mode = if code.is_comprehension() {
        Mode::Comprehension
    } else {
        Mode::Function
    };

    let mut graph = Graph::build(&instructions, mode, None)?;
    sort(&mut graph);
    execute(&mut graph, &[])?;
    express(&mut graph)?;

    let mut expression = graph
        .blocks
        .get(graph.entry())
        .and_then(|block| block.expression.clone())
        .unwrap_or(Expression::Null);

    for name in code.arg_names.iter().rev() {
        expression = Expression::lambda(name.clone(), expression);
    }
    Ok(expression)
}
