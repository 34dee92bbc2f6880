//! The closed opcode set understood by the decompiler.
//!
//! The set is deliberately closed: anything a producer emits outside of
//! it must be rejected by the reader rather than skipped, because every
//! opcode affects the symbolic operand stack.

/// An opcode of the source dialect's stack machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack shuffling
    Nop,
    PopTop,
    RotTwo,
    RotThree,
    DupTop,
    DupTopTwo,

    // Arithmetic, in plain and in-place form (both behave identically
    // on the symbolic stack)
    BinaryAdd,
    BinarySubtract,
    BinaryMultiply,
    BinaryTrueDivide,
    BinaryModulo,
    BinaryPower,
    InplaceAdd,
    InplaceSubtract,
    InplaceMultiply,
    InplaceTrueDivide,
    InplaceModulo,
    InplacePower,

    CompareOp,

    // Subscripting
    BinarySubscr,
    StoreSubscr,
    DeleteSubscr,

    // Function exit
    ReturnValue,
    YieldValue,

    // Comprehension accumulators
    ListAppend,
    SetAdd,
    MapAdd,

    PopBlock,

    // Loads
    LoadConst,
    LoadName,
    LoadGlobal,
    LoadFast,
    LoadDeref,
    LoadClosure,
    LoadAttr,

    // Stores
    StoreName,
    StoreFast,
    DeleteName,
    DeleteFast,

    CallFunction,

    // Collection constructors
    BuildTuple,
    BuildList,
    BuildSet,
    BuildMap,
    BuildString,

    MakeFunction,
    MakeClosure,

    // Control flow
    SetupLoop,
    GetIter,
    ForIter,
    JumpForward,
    JumpAbsolute,
    ContinueLoop,
    BreakLoop,
    PopJumpIfTrue,
    PopJumpIfFalse,
    JumpIfTrueOrPop,
    JumpIfFalseOrPop,

    /// Synthetic sentinel appended to a loop body's instruction stream
    /// to give `BREAK_LOOP` and loop-exit edges a concrete target. Never
    /// produced by a real producer.
    AfterLoop,
}

/// The algebraic operation behind a `BINARY_*`/`INPLACE_*` opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Subtract,
    Multiply,
    TrueDivide,
    Modulo,
    Power,
}

impl Opcode {
    /// Resolve a producer opname. Returns `None` for anything outside
    /// the closed set.
    pub fn from_opname(opname: &str) -> Option<Self> {
        use Opcode::*;
        Some(match opname {
            "NOP" => Nop,
            "POP_TOP" => PopTop,
            "ROT_TWO" => RotTwo,
            "ROT_THREE" => RotThree,
            "DUP_TOP" => DupTop,
            "DUP_TOP_TWO" => DupTopTwo,
            "BINARY_ADD" => BinaryAdd,
            "BINARY_SUBTRACT" => BinarySubtract,
            "BINARY_MULTIPLY" => BinaryMultiply,
            "BINARY_TRUE_DIVIDE" => BinaryTrueDivide,
            "BINARY_MODULO" => BinaryModulo,
            "BINARY_POWER" => BinaryPower,
            "INPLACE_ADD" => InplaceAdd,
            "INPLACE_SUBTRACT" => InplaceSubtract,
            "INPLACE_MULTIPLY" => InplaceMultiply,
            "INPLACE_TRUE_DIVIDE" => InplaceTrueDivide,
            "INPLACE_MODULO" => InplaceModulo,
            "INPLACE_POWER" => InplacePower,
            "COMPARE_OP" => CompareOp,
            "BINARY_SUBSCR" => BinarySubscr,
            "STORE_SUBSCR" => StoreSubscr,
            "DELETE_SUBSCR" => DeleteSubscr,
            "RETURN_VALUE" => ReturnValue,
            "YIELD_VALUE" => YieldValue,
            "LIST_APPEND" => ListAppend,
            "SET_ADD" => SetAdd,
            "MAP_ADD" => MapAdd,
            "POP_BLOCK" => PopBlock,
            "LOAD_CONST" => LoadConst,
            "LOAD_NAME" => LoadName,
            "LOAD_GLOBAL" => LoadGlobal,
            "LOAD_FAST" => LoadFast,
            "LOAD_DEREF" => LoadDeref,
            "LOAD_CLOSURE" => LoadClosure,
            "LOAD_ATTR" => LoadAttr,
            "STORE_NAME" => StoreName,
            "STORE_FAST" => StoreFast,
            "DELETE_NAME" => DeleteName,
            "DELETE_FAST" => DeleteFast,
            "CALL_FUNCTION" => CallFunction,
            "BUILD_TUPLE" => BuildTuple,
            "BUILD_LIST" => BuildList,
            "BUILD_SET" => BuildSet,
            "BUILD_MAP" => BuildMap,
            "BUILD_STRING" => BuildString,
            "MAKE_FUNCTION" => MakeFunction,
            "MAKE_CLOSURE" => MakeClosure,
            "SETUP_LOOP" => SetupLoop,
            "GET_ITER" => GetIter,
            "FOR_ITER" => ForIter,
            "JUMP_FORWARD" => JumpForward,
            "JUMP_ABSOLUTE" => JumpAbsolute,
            "CONTINUE_LOOP" => ContinueLoop,
            "BREAK_LOOP" => BreakLoop,
            "POP_JUMP_IF_TRUE" => PopJumpIfTrue,
            "POP_JUMP_IF_FALSE" => PopJumpIfFalse,
            "JUMP_IF_TRUE_OR_POP" => JumpIfTrueOrPop,
            "JUMP_IF_FALSE_OR_POP" => JumpIfFalseOrPop,
            "AFTER_LOOP" => AfterLoop,
            _ => return None,
        })
    }

    /// The producer-side opname.
    pub fn opname(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "NOP",
            PopTop => "POP_TOP",
            RotTwo => "ROT_TWO",
            RotThree => "ROT_THREE",
            DupTop => "DUP_TOP",
            DupTopTwo => "DUP_TOP_TWO",
            BinaryAdd => "BINARY_ADD",
            BinarySubtract => "BINARY_SUBTRACT",
            BinaryMultiply => "BINARY_MULTIPLY",
            BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
            BinaryModulo => "BINARY_MODULO",
            BinaryPower => "BINARY_POWER",
            InplaceAdd => "INPLACE_ADD",
            InplaceSubtract => "INPLACE_SUBTRACT",
            InplaceMultiply => "INPLACE_MULTIPLY",
            InplaceTrueDivide => "INPLACE_TRUE_DIVIDE",
            InplaceModulo => "INPLACE_MODULO",
            InplacePower => "INPLACE_POWER",
            CompareOp => "COMPARE_OP",
            BinarySubscr => "BINARY_SUBSCR",
            StoreSubscr => "STORE_SUBSCR",
            DeleteSubscr => "DELETE_SUBSCR",
            ReturnValue => "RETURN_VALUE",
            YieldValue => "YIELD_VALUE",
            ListAppend => "LIST_APPEND",
            SetAdd => "SET_ADD",
            MapAdd => "MAP_ADD",
            PopBlock => "POP_BLOCK",
            LoadConst => "LOAD_CONST",
            LoadName => "LOAD_NAME",
            LoadGlobal => "LOAD_GLOBAL",
            LoadFast => "LOAD_FAST",
            LoadDeref => "LOAD_DEREF",
            LoadClosure => "LOAD_CLOSURE",
            LoadAttr => "LOAD_ATTR",
            StoreName => "STORE_NAME",
            StoreFast => "STORE_FAST",
            DeleteName => "DELETE_NAME",
            DeleteFast => "DELETE_FAST",
            CallFunction => "CALL_FUNCTION",
            BuildTuple => "BUILD_TUPLE",
            BuildList => "BUILD_LIST",
            BuildSet => "BUILD_SET",
            BuildMap => "BUILD_MAP",
            BuildString => "BUILD_STRING",
            MakeFunction => "MAKE_FUNCTION",
            MakeClosure => "MAKE_CLOSURE",
            SetupLoop => "SETUP_LOOP",
            GetIter => "GET_ITER",
            ForIter => "FOR_ITER",
            JumpForward => "JUMP_FORWARD",
            JumpAbsolute => "JUMP_ABSOLUTE",
            ContinueLoop => "CONTINUE_LOOP",
            BreakLoop => "BREAK_LOOP",
            PopJumpIfTrue => "POP_JUMP_IF_TRUE",
            PopJumpIfFalse => "POP_JUMP_IF_FALSE",
            JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
            JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
            AfterLoop => "AFTER_LOOP",
        }
    }

    /// Unconditional control transfer.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::JumpForward | Opcode::JumpAbsolute | Opcode::ContinueLoop
        )
    }

    /// Conditional two-way control transfer. `FOR_ITER` is handled
    /// separately by the graph builder, so it is not included here.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::PopJumpIfTrue
                | Opcode::PopJumpIfFalse
                | Opcode::JumpIfTrueOrPop
                | Opcode::JumpIfFalseOrPop
        )
    }

    /// Branch opcodes that pop the condition on both outcomes.
    pub fn pops_unconditionally(self) -> bool {
        matches!(self, Opcode::PopJumpIfTrue | Opcode::PopJumpIfFalse)
    }

    /// Branch opcodes that pop only on the fallthrough edge.
    pub fn pops_on_fallthrough(self) -> bool {
        matches!(self, Opcode::JumpIfTrueOrPop | Opcode::JumpIfFalseOrPop)
    }

    /// Whether the fallthrough edge is taken when the condition is true.
    /// Meaningful only for branch opcodes.
    pub fn fallthrough_on_true(self) -> bool {
        matches!(self, Opcode::PopJumpIfFalse | Opcode::JumpIfFalseOrPop)
    }

    /// Whether the opcode carries an absolute jump target in its payload.
    pub fn has_target(self) -> bool {
        self.is_jump() || self.is_branch() || matches!(self, Opcode::ForIter | Opcode::SetupLoop)
    }

    /// Name-loading opcodes that push an identifier (`LOAD_CLOSURE` is
    /// excluded: closure cells are opaque to the symbolic stack).
    pub fn loads_name(self) -> bool {
        matches!(
            self,
            Opcode::LoadName | Opcode::LoadGlobal | Opcode::LoadFast | Opcode::LoadDeref
        )
    }

    /// The algebraic operation of a `BINARY_*`/`INPLACE_*` opcode.
    pub fn binary_kind(self) -> Option<BinaryKind> {
        use Opcode::*;
        Some(match self {
            BinaryAdd | InplaceAdd => BinaryKind::Add,
            BinarySubtract | InplaceSubtract => BinaryKind::Subtract,
            BinaryMultiply | InplaceMultiply => BinaryKind::Multiply,
            BinaryTrueDivide | InplaceTrueDivide => BinaryKind::TrueDivide,
            BinaryModulo | InplaceModulo => BinaryKind::Modulo,
            BinaryPower | InplacePower => BinaryKind::Power,
            _ => return None,
        })
    }
}
