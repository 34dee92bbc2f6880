//! Code objects and the test/producer-side builder.

use std::collections::HashMap;

use crate::instruction::{CompareKind, Constant, Payload, RawInstruction};
use crate::opcode::Opcode;

/// A compiled function: its name, its name tables and its raw
/// instruction stream in program order.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeObject {
    /// Declared name. Comprehension code objects carry the dialect's
    /// reserved names (`<listcomp>`, `<setcomp>`, `<dictcomp>`,
    /// `<genexpr>`), which switch the decompiler into comprehension
    /// mode.
    pub name: String,
    /// Formal parameters, in declaration order.
    pub arg_names: Vec<String>,
    /// Names bound in the local scope (parameters included).
    pub var_names: Vec<String>,
    /// Names closed over from enclosing scopes.
    pub free_names: Vec<String>,
    pub instructions: Vec<RawInstruction>,
}

impl CodeObject {
    pub fn builder(name: impl Into<String>) -> CodeBuilder {
        CodeBuilder::new(name)
    }

    pub fn arg_count(&self) -> usize {
        self.arg_names.len()
    }

    /// Names referenced in the local scope (parameters and locals).
    pub fn local_names(&self) -> &[String] {
        &self.var_names
    }

    /// Names closed over from enclosing scopes.
    pub fn free_names(&self) -> &[String] {
        &self.free_names
    }

    pub fn is_comprehension(&self) -> bool {
        matches!(
            self.name.as_str(),
            "<listcomp>" | "<setcomp>" | "<dictcomp>" | "<genexpr>"
        )
    }
}

enum Operand {
    None,
    Const(Constant),
    Name(String),
    Label(String),
    Count(u32),
    Compare(CompareKind),
}

/// Assembles a [`CodeObject`] the way a producer would: instructions
/// are two offset units wide, labels resolve to absolute offsets, and
/// `is_jump_target` is derived from the resolved targets.
pub struct CodeBuilder {
    name: String,
    arg_names: Vec<String>,
    var_names: Vec<String>,
    free_names: Vec<String>,
    ops: Vec<(String, Operand)>,
    labels: HashMap<String, usize>,
}

impl CodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_names: Vec::new(),
            var_names: Vec::new(),
            free_names: Vec::new(),
            ops: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Declare a formal parameter (also registered as a local).
    pub fn param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.arg_names.push(name.clone());
        self.var_names.push(name);
        self
    }

    /// Declare a non-parameter local.
    pub fn var(mut self, name: impl Into<String>) -> Self {
        self.var_names.push(name.into());
        self
    }

    /// Declare a free (closed-over) name.
    pub fn free(mut self, name: impl Into<String>) -> Self {
        self.free_names.push(name.into());
        self
    }

    /// Attach a label to the next emitted instruction.
    pub fn mark(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into(), self.ops.len());
        self
    }

    /// Emit an operand-less instruction.
    pub fn simple(mut self, opcode: Opcode) -> Self {
        self.ops.push((opcode.opname().to_owned(), Operand::None));
        self
    }

    /// Emit a name-carrying instruction.
    pub fn named(mut self, opcode: Opcode, name: impl Into<String>) -> Self {
        self.ops
            .push((opcode.opname().to_owned(), Operand::Name(name.into())));
        self
    }

    /// Emit `LOAD_CONST`.
    pub fn constant(mut self, value: Constant) -> Self {
        self.ops
            .push((Opcode::LoadConst.opname().to_owned(), Operand::Const(value)));
        self
    }

    /// Emit a count-carrying instruction (calls, constructors,
    /// accumulator depths).
    pub fn counted(mut self, opcode: Opcode, count: u32) -> Self {
        self.ops
            .push((opcode.opname().to_owned(), Operand::Count(count)));
        self
    }

    /// Emit `COMPARE_OP`.
    pub fn compare(mut self, kind: CompareKind) -> Self {
        self.ops
            .push((Opcode::CompareOp.opname().to_owned(), Operand::Compare(kind)));
        self
    }

    /// Emit a jump/branch/loop-delimiter instruction targeting a label.
    pub fn jump(mut self, opcode: Opcode, label: impl Into<String>) -> Self {
        self.ops
            .push((opcode.opname().to_owned(), Operand::Label(label.into())));
        self
    }

    /// Emit an instruction by raw opname, for streams that exercise the
    /// reader's rejection path.
    pub fn raw(mut self, opname: impl Into<String>) -> Self {
        self.ops.push((opname.into(), Operand::None));
        self
    }

    pub fn build(self) -> CodeObject {
        let offset_of = |index: usize| (index as u32) * 2;

        let mut instructions: Vec<RawInstruction> = Vec::with_capacity(self.ops.len());
        let mut targets: Vec<u32> = Vec::new();

        for (index, (opname, operand)) in self.ops.into_iter().enumerate() {
            let (arg, payload) = match operand {
                Operand::None => (None, Payload::None),
                Operand::Const(value) => (None, Payload::Const(value)),
                Operand::Name(name) => (None, Payload::Name(name)),
                Operand::Count(count) => (Some(count), Payload::Count(count)),
                Operand::Compare(kind) => (None, Payload::Compare(kind)),
                Operand::Label(label) => {
                    let target = self
                        .labels
                        .get(&label)
                        .copied()
                        .map(offset_of)
                        .unwrap_or_else(|| panic!("unresolved label `{label}`"));
                    targets.push(target);
                    (Some(target), Payload::Target(target))
                }
            };

            instructions.push(RawInstruction {
                opname,
                arg,
                payload,
                offset: offset_of(index),
                is_jump_target: false,
                starts_line: None,
            });
        }

        for instruction in &mut instructions {
            if targets.contains(&instruction.offset) {
                instruction.is_jump_target = true;
            }
        }

        CodeObject {
            name: self.name,
            arg_names: self.arg_names,
            var_names: self.var_names,
            free_names: self.free_names,
            instructions,
        }
    }
}
