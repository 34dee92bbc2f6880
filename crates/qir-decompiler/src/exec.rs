//! Symbolic execution of blocks over a QIR operand stack.
//!
//! Blocks run in topological order. Each block reconciles its initial
//! stack from its predecessors' final stacks, then interprets its
//! instructions over QIR expressions instead of runtime values:
//! name loads become identifiers, stores become bindings, operators
//! become operator nodes. Composite loop blocks run a full inner
//! decompilation of their recorded body.

use qir_bytecode::{BinaryKind, CompareKind, Constant, Instruction, Opcode, Payload};
use qir_core::{BinaryOp, Expression};

use crate::comprehension;
use crate::error::DecompileError;
use crate::graph::{BlockId, BlockKind, FlowKind, Graph, InnerCfg, LoopData, Mode};
use crate::order::sort;

/// Run every block of an already-sorted graph.
pub(crate) fn execute(graph: &mut Graph, starting_stack: &[Expression]) -> Result<(), DecompileError> {
    for id in graph.ordering.clone() {
        if matches!(graph.blocks[id].kind, BlockKind::Placeholder) {
            continue;
        }

        let initial = reconcile(graph, id, starting_stack)?;
        let mut block = std::mem::take(&mut graph.blocks[id]);

        match &mut block.kind {
            BlockKind::Linear => {
                let outcome = run_linear(&block.instructions, initial, graph.mode)?;
                block.stack = outcome.stack;
                block.bindings = outcome.bindings;
                block.returns = outcome.returns;
                block.appended = outcome.appended;
                block.yielded = outcome.yielded;
            }

            // Jumps transfer the stack untouched. Branches leave the
            // condition on top; the pop is accounted for by each
            // successor's reconciliation.
            BlockKind::Jump { .. } | BlockKind::Branch { .. } => {
                block.stack = initial;
            }

            BlockKind::ForIter { instruction } => {
                let mut stack = initial;
                stack.push(Expression::ident(iteration_variable(instruction.offset)));
                block.stack = stack;
            }

            BlockKind::WhileLoop(data) => {
                block.stack = run_loop(data, Flavor::While, initial, graph.mode)?;
            }
            BlockKind::ForLoop(data) => {
                block.stack = run_loop(data, Flavor::For, initial, graph.mode)?;
            }
            BlockKind::ComprehensionLoop(data) => {
                block.stack = run_loop(data, Flavor::Comprehension, initial, graph.mode)?;
            }

            BlockKind::Placeholder => unreachable!("skipped above"),
        }

        graph.blocks[id] = block;
    }
    Ok(())
}

/// The per-iteration variable synthesised for a `FOR_ITER` offset.
pub(crate) fn iteration_variable(offset: u32) -> String {
    format!("cv_{offset}")
}

/// Compute a block's initial stack from its predecessors.
///
/// Every contribution must agree element-wise; a disagreement means
/// the control flow is outside the structured subset.
fn reconcile(
    graph: &Graph,
    id: BlockId,
    starting_stack: &[Expression],
) -> Result<Vec<Expression>, DecompileError> {
    let block = &graph.blocks[id];
    if block.predecessors.is_empty() {
        return Ok(if id == graph.entry() {
            starting_stack.to_vec()
        } else {
            Vec::new()
        });
    }

    let mut contributions: Vec<Vec<Expression>> = Vec::new();
    for &(pred_id, flow) in &block.predecessors {
        let pred = &graph.blocks[pred_id];
        let mut stack = pred.stack.clone();
        match &pred.kind {
            BlockKind::Branch { instruction } => {
                let pops = instruction.opcode.pops_unconditionally()
                    || (instruction.opcode.pops_on_fallthrough() && flow == FlowKind::Normal);
                if pops {
                    stack.pop();
                }
            }
            // Exhausted iteration: both the iteration variable and the
            // iterator disappear. The yielded edge keeps the full stack.
            BlockKind::ForIter { .. } if flow == FlowKind::Jump => {
                stack.pop();
                stack.pop();
            }
            _ => {}
        }
        contributions.push(stack);
    }

    let first = contributions[0].clone();
    if contributions.iter().any(|stack| *stack != first) {
        return Err(DecompileError::PredecessorStacks {
            block: id,
            stacks: contributions,
        });
    }
    Ok(first)
}

// ---------------------------------------------------------------------------
// Straight-line interpretation

struct LinearOutcome {
    stack: Vec<Expression>,
    bindings: Vec<(String, Expression)>,
    returns: Option<Expression>,
    appended: Option<Expression>,
    yielded: bool,
}

struct Machine {
    stack: Vec<Expression>,
    bindings: Vec<(String, Expression)>,
    returns: Option<Expression>,
    appended: Option<Expression>,
    yielded: bool,
    /// `LOAD_CLOSURE` cells awaiting their `BUILD_TUPLE`; both are
    /// invisible to the QIR operand stack.
    pending_cells: u32,
    mode: Mode,
}

impl Machine {
    fn pop(&mut self, instruction: &Instruction) -> Result<Expression, DecompileError> {
        self.stack.pop().ok_or(DecompileError::StackUnderflow {
            opcode: instruction.opcode.opname(),
            offset: instruction.offset,
        })
    }

    fn pop_many(
        &mut self,
        count: usize,
        instruction: &Instruction,
    ) -> Result<Vec<Expression>, DecompileError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.pop(instruction)?);
        }
        values.reverse();
        Ok(values)
    }

    fn slot(
        &mut self,
        depth: usize,
        instruction: &Instruction,
    ) -> Result<&mut Expression, DecompileError> {
        let len = self.stack.len();
        if depth == 0 || depth > len {
            return Err(DecompileError::StackUnderflow {
                opcode: instruction.opcode.opname(),
                offset: instruction.offset,
            });
        }
        Ok(&mut self.stack[len - depth])
    }
}

fn binary_op(kind: BinaryKind) -> BinaryOp {
    match kind {
        BinaryKind::Add => BinaryOp::Plus,
        BinaryKind::Subtract => BinaryOp::Minus,
        BinaryKind::Multiply => BinaryOp::Star,
        BinaryKind::TrueDivide => BinaryOp::Div,
        BinaryKind::Modulo => BinaryOp::Mod,
        BinaryKind::Power => BinaryOp::Power,
    }
}

fn compare_op(kind: CompareKind) -> BinaryOp {
    match kind {
        CompareKind::Equal => BinaryOp::Equal,
        CompareKind::LowerOrEqual => BinaryOp::LowerOrEqual,
        CompareKind::LowerThan => BinaryOp::LowerThan,
        CompareKind::GreaterOrEqual => BinaryOp::GreaterOrEqual,
        CompareKind::GreaterThan => BinaryOp::GreaterThan,
    }
}

/// Encode a code-object constant as a QIR value tree.
pub(crate) fn encode_constant(constant: &Constant) -> Expression {
    match constant {
        Constant::None => Expression::Null,
        Constant::Bool(b) => Expression::Boolean(*b),
        Constant::Int(i) => Expression::Number(*i),
        Constant::Float(f) => Expression::Double(*f),
        Constant::Str(s) => Expression::String(s.clone()),
        Constant::Tuple(items) => Expression::list(items.iter().map(encode_constant)),
        Constant::Code(code) => Expression::Bytecode(code.clone()),
    }
}

fn run_linear(
    instructions: &[Instruction],
    stack: Vec<Expression>,
    mode: Mode,
) -> Result<LinearOutcome, DecompileError> {
    let mut machine = Machine {
        stack,
        bindings: Vec::new(),
        returns: None,
        appended: None,
        yielded: false,
        pending_cells: 0,
        mode,
    };

    for instruction in instructions {
        step(&mut machine, instruction)?;
    }

    Ok(LinearOutcome {
        stack: machine.stack,
        bindings: machine.bindings,
        returns: machine.returns,
        appended: machine.appended,
        yielded: machine.yielded,
    })
}

fn step(machine: &mut Machine, instruction: &Instruction) -> Result<(), DecompileError> {
    use Opcode::*;

    match instruction.opcode {
        // Loop scaffolding and iterator coercion have no symbolic effect.
        Nop | PopBlock | SetupLoop | GetIter | AfterLoop => {}

        PopTop => {
            machine.pop(instruction)?;
        }
        RotTwo => {
            let top = machine.pop(instruction)?;
            let below = machine.pop(instruction)?;
            machine.stack.push(top);
            machine.stack.push(below);
        }
        RotThree => {
            let top = machine.pop(instruction)?;
            let second = machine.pop(instruction)?;
            let third = machine.pop(instruction)?;
            machine.stack.push(top);
            machine.stack.push(third);
            machine.stack.push(second);
        }
        DupTop => {
            let top = machine.pop(instruction)?;
            machine.stack.push(top.clone());
            machine.stack.push(top);
        }
        DupTopTwo => {
            let top = machine.pop(instruction)?;
            let below = machine.pop(instruction)?;
            machine.stack.push(below.clone());
            machine.stack.push(top.clone());
            machine.stack.push(below);
            machine.stack.push(top);
        }

        BinaryAdd | BinarySubtract | BinaryMultiply | BinaryTrueDivide | BinaryModulo
        | BinaryPower | InplaceAdd | InplaceSubtract | InplaceMultiply | InplaceTrueDivide
        | InplaceModulo | InplacePower => {
            let kind = instruction.opcode.binary_kind().expect("binary opcode");
            let right = machine.pop(instruction)?;
            let left = machine.pop(instruction)?;
            machine
                .stack
                .push(Expression::binary(binary_op(kind), left, right));
        }

        CompareOp => {
            let Payload::Compare(kind) = &instruction.payload else {
                return Err(DecompileError::NotYetImplemented(format!(
                    "COMPARE_OP payload at offset {}",
                    instruction.offset
                )));
            };
            let right = machine.pop(instruction)?;
            let left = machine.pop(instruction)?;
            machine
                .stack
                .push(Expression::binary(compare_op(*kind), left, right));
        }

        BinarySubscr => {
            let key = machine.pop(instruction)?;
            let container = machine.pop(instruction)?;
            machine.stack.push(Expression::tuple_destr(container, key));
        }
        StoreSubscr => {
            let key = machine.pop(instruction)?;
            let container = machine.pop(instruction)?;
            let value = machine.pop(instruction)?;
            store_container(machine, container, Expression::tuple_cons, key, value);
        }
        DeleteSubscr => {
            let key = machine.pop(instruction)?;
            let container = machine.pop(instruction)?;
            store_container(machine, container, Expression::tuple_cons, key, Expression::Null);
        }

        ReturnValue => {
            let value = machine.pop(instruction)?;
            // A comprehension pipeline replaces a generator body's
            // trailing `return None`.
            if machine.mode == Mode::Comprehension
                && value == Expression::Null
                && !machine.stack.is_empty()
            {
                machine.returns = Some(machine.pop(instruction)?);
            } else {
                machine.returns = Some(value);
            }
        }
        YieldValue => {
            let value = machine.pop(instruction)?;
            machine.returns = Some(value.clone());
            machine.appended = Some(value);
            machine.yielded = true;
            // The sent-back value the producer leaves on the stack.
            machine.stack.push(Expression::Null);
        }

        ListAppend | SetAdd => {
            let value = machine.pop(instruction)?;
            let slot = machine.slot(instruction.count() as usize, instruction)?;
            let old = slot.clone();
            *slot = Expression::cons(value.clone(), old);
            machine.appended = Some(value);
        }
        MapAdd => {
            let key = machine.pop(instruction)?;
            let value = machine.pop(instruction)?;
            let slot = machine.slot(instruction.count() as usize, instruction)?;
            let old = slot.clone();
            *slot = Expression::tuple_cons(key.clone(), value.clone(), old);
            machine.appended = Some(Expression::tuple_cons(key, value, Expression::TupleNil));
        }

        LoadConst => {
            let constant = instruction.constant().expect("checked by the reader");
            machine.stack.push(encode_constant(constant));
        }
        LoadName | LoadGlobal | LoadFast | LoadDeref => {
            let name = instruction.name().expect("checked by the reader");
            machine.stack.push(Expression::ident(name));
        }
        LoadClosure => {
            machine.pending_cells += 1;
        }
        LoadAttr => {
            let name = instruction.name().expect("checked by the reader");
            let container = machine.pop(instruction)?;
            machine.stack.push(Expression::attr(container, name));
        }

        StoreName | StoreFast => {
            let name = instruction.name().expect("checked by the reader");
            let value = machine.pop(instruction)?;
            machine.bindings.push((name.to_owned(), value));
        }
        DeleteName | DeleteFast => {
            let name = instruction.name().expect("checked by the reader");
            machine.bindings.push((name.to_owned(), Expression::Null));
        }

        CallFunction => {
            let count = instruction.count() as usize;
            let arguments = machine.pop_many(count, instruction)?;
            let function = machine.pop(instruction)?;
            machine.stack.push(apply_call(function, arguments));
        }

        BuildTuple if machine.pending_cells > 0 && machine.pending_cells == instruction.count() => {
            // The closure-cell tuple; cells never touched the stack.
            machine.pending_cells = 0;
        }
        BuildTuple | BuildList | BuildSet => {
            let values = machine.pop_many(instruction.count() as usize, instruction)?;
            machine.stack.push(Expression::list(values));
        }
        BuildMap => {
            let count = instruction.count() as usize;
            let mut entries = machine.pop_many(2 * count, instruction)?;
            let mut tuple = Expression::TupleNil;
            while let (Some(value), Some(key)) = (entries.pop(), entries.pop()) {
                tuple = Expression::tuple_cons(key, value, tuple);
            }
            machine.stack.push(tuple);
        }
        BuildString => {
            let parts = machine.pop_many(instruction.count() as usize, instruction)?;
            let mut joined = std::string::String::new();
            for part in parts {
                match part {
                    Expression::String(s) => joined.push_str(&s),
                    other => {
                        return Err(DecompileError::NotYetImplemented(format!(
                            "BUILD_STRING over {}",
                            other.variant_name()
                        )));
                    }
                }
            }
            machine.stack.push(Expression::String(joined));
        }

        MakeFunction | MakeClosure => {
            if instruction.arg.unwrap_or(0) != 0 {
                return Err(DecompileError::NotYetImplemented(
                    "MAKE_FUNCTION with defaults or annotations".to_owned(),
                ));
            }
            let _qualified_name = machine.pop(instruction)?;
            let function = machine.pop(instruction)?;
            match function {
                Expression::Bytecode(code) => {
                    machine.stack.push(crate::decompile::decompile_code(&code)?);
                }
                other => {
                    return Err(DecompileError::Unsupported(format!(
                        "MAKE_FUNCTION over {}",
                        other.variant_name()
                    )));
                }
            }
        }

        BreakLoop | ContinueLoop => {
            return Err(DecompileError::Unsupported(format!(
                "{} outside of a loop body",
                instruction.opcode.opname()
            )));
        }

        ForIter | JumpForward | JumpAbsolute | PopJumpIfTrue | PopJumpIfFalse
        | JumpIfTrueOrPop | JumpIfFalseOrPop => {
            unreachable!("control-flow opcodes form their own blocks")
        }
    }
    Ok(())
}

/// `container[key] = value` / `del container[key]` as functional
/// updates. Named containers are rebound; anonymous ones leave the
/// updated tuple on the stack.
fn store_container(
    machine: &mut Machine,
    container: Expression,
    build: fn(Expression, Expression, Expression) -> Expression,
    key: Expression,
    value: Expression,
) {
    match container {
        Expression::Identifier(name) => {
            let updated = build(key, value, Expression::ident(name.clone()));
            machine.bindings.push((name, updated));
        }
        container => {
            machine.stack.push(build(key, value, container));
        }
    }
}

/// Curried call. Applications to a literal lambda β-reduce at
/// decompile time (this is what splices comprehension pipelines over
/// their iterator); anything else builds the application chain, the
/// leftmost argument innermost.
fn apply_call(function: Expression, arguments: Vec<Expression>) -> Expression {
    let mut result = function;
    for argument in arguments {
        result = match result {
            Expression::Lambda { parameter, body } => body.substitute(&parameter, &argument),
            other => Expression::apply(other, argument),
        };
    }
    result
}

// ---------------------------------------------------------------------------
// Composite loops

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flavor {
    While,
    For,
    Comprehension,
}

/// Decompile a composite block's body with an inner graph, rewiring
/// loop edges onto placeholder blocks, and return the block's final
/// surrounding stack.
fn run_loop(
    data: &mut LoopData,
    flavor: Flavor,
    initial: Vec<Expression>,
    mode: Mode,
) -> Result<Vec<Expression>, DecompileError> {
    let starting = initial.clone();
    let mut surrounding = initial;

    let iterator = match flavor {
        Flavor::While => None,
        Flavor::For | Flavor::Comprehension => {
            Some(surrounding.pop().ok_or(DecompileError::StackUnderflow {
                opcode: Opcode::ForIter.opname(),
                offset: data.header.as_ref().map_or(0, |h| h.offset),
            })?)
        }
    };

    // Body stream: breaks become jumps to a synthetic sentinel at the
    // loop end, which the exit edges also target.
    let mut body = data.body.clone();
    for instruction in &mut body {
        if instruction.opcode == Opcode::BreakLoop {
            instruction.opcode = Opcode::JumpAbsolute;
            instruction.payload = Payload::Target(data.end);
        }
    }
    body.push(Instruction {
        opcode: Opcode::AfterLoop,
        arg: None,
        payload: Payload::None,
        offset: data.end,
        is_jump_target: true,
        starts_line: None,
    });

    let header = data
        .header
        .as_ref()
        .filter(|instruction| instruction.opcode == Opcode::ForIter)
        .map(|instruction| instruction.offset);

    let mut inner = Graph::build(&body, mode, header)?;
    let entry = inner.entry();

    // Loop exit: the sentinel block carries the on_after call.
    let sentinel = *inner
        .block_mapping
        .get(&data.end)
        .ok_or(DecompileError::UnmappedOffset(data.end))?;
    inner.blocks[sentinel].kind = BlockKind::Placeholder;
    inner.blocks[sentinel].expression = Some(Expression::apply(
        Expression::ident("on_after"),
        Expression::Null,
    ));
    inner.blocks[sentinel].next = None;
    inner.blocks[sentinel].next_jumped = None;

    // Loop re-entry: back edges retarget onto the on_loop call.
    let mut on_loop: Option<BlockId> = None;
    rewire_back_edges(&mut inner, entry, &mut on_loop);

    inner.rebuild_predecessors();
    sort(&mut inner);
    execute(&mut inner, &starting)?;

    if flavor == Flavor::Comprehension {
        let iterator_expression = iterator.clone().expect("comprehension iterator");
        let cv = iteration_variable(header.expect("comprehension header"));
        let (pipeline, via_yield) =
            comprehension::rewrite(&inner, entry, iterator_expression, &cv)?;
        if via_yield {
            surrounding.push(pipeline);
        } else {
            // Replace the growing accumulator below the iterator.
            let slot = surrounding.last_mut().ok_or(DecompileError::StackUnderflow {
                opcode: Opcode::ForIter.opname(),
                offset: data.end,
            })?;
            *slot = pipeline;
        }
    }

    data.inner = Some(Box::new(InnerCfg { graph: inner, entry }));
    data.iterator = iterator;
    Ok(surrounding)
}

/// Retarget every edge pointing at the inner entry onto a (lazily
/// created) on_loop placeholder.
fn rewire_back_edges(inner: &mut Graph, entry: BlockId, on_loop: &mut Option<BlockId>) {
    for id in 0..inner.blocks.len() {
        if inner.blocks[id].next == Some(entry) {
            let target = ensure_on_loop(inner, on_loop);
            inner.blocks[id].next = Some(target);
        }
        if inner.blocks[id].next_jumped == Some(entry) {
            let target = ensure_on_loop(inner, on_loop);
            inner.blocks[id].next_jumped = Some(target);
        }
    }
}

fn ensure_on_loop(inner: &mut Graph, on_loop: &mut Option<BlockId>) -> BlockId {
    if let Some(id) = *on_loop {
        return id;
    }
    let id = inner.append_placeholder(Expression::apply(
        Expression::ident("on_loop"),
        Expression::Null,
    ));
    *on_loop = Some(id);
    id
}
