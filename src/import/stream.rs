//! stream.rs
//! In-memory model of the external low-level instruction stream.
//!
//! The producing compiler is an external collaborator; this module only
//! fixes the shape of what it hands us. Values are identified by opaque
//! assigned ids (the importer keys its lookaside maps on them), operand
//! kinds are an enum with payload rather than runtime type inspection, and
//! the instruction set is closed: anything outside it is carried as
//! [`InstrKind::Other`] so the importer can fail naming it.

use serde::{Deserialize, Serialize};

/// Opaque identity of one value in the stream, assigned by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// An instruction operand: a reference to an earlier value, or an inline
/// constant of either numeric kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Value(ValueId),
    FloatConst(f64),
    IntConst(i64),
}

impl From<ValueId> for Operand {
    fn from(id: ValueId) -> Self {
        Operand::Value(id)
    }
}

impl From<f64> for Operand {
    fn from(c: f64) -> Self {
        Operand::FloatConst(c)
    }
}

impl From<i64> for Operand {
    fn from(c: i64) -> Self {
        Operand::IntConst(c)
    }
}

/// Comparison predicate, shared by float and integer compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Predicate {
    pub fn name(self) -> &'static str {
        match self {
            Predicate::Eq => "equal",
            Predicate::Ne => "not-equal",
            Predicate::Lt => "less-than",
            Predicate::Le => "less-or-equal",
            Predicate::Gt => "greater-than",
            Predicate::Ge => "greater-or-equal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatBinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    /// Read the value a pointer currently designates.
    Load { ptr: Operand },
    /// Pointer arithmetic: `base` plus a constant element index. The
    /// importer only accepts the input or output vector as `base`.
    ElementOffset { base: Operand, index: usize },
    /// Write `value` through `ptr` (an output-vector element).
    Store { value: Operand, ptr: Operand },
    FloatBinary {
        op: FloatBinOp,
        left: Operand,
        right: Operand,
    },
    FloatNeg { value: Operand },
    Call { callee: String, args: Vec<Operand> },
    FloatCompare {
        pred: Predicate,
        left: Operand,
        right: Operand,
    },
    IntCompare {
        pred: Predicate,
        left: Operand,
        right: Operand,
    },
    /// The bit-widen / logical-or pattern that folds comparison outcomes
    /// into the stream's return value.
    BoolCombine { operands: Vec<Operand> },
    /// Ternary conditional; `float` tells whether the selected values are
    /// floating (the only case with a graph effect).
    Select {
        cond: Operand,
        if_true: Operand,
        if_false: Operand,
        float: bool,
    },
    /// Control flow for the error-code early-return path; no graph effect.
    Branch,
    Return,
    /// Anything the importer does not support, by name.
    Other { name: String },
}

impl InstrKind {
    /// Every operand position, for uniform scans (constant interning).
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            InstrKind::Load { ptr } => vec![ptr],
            InstrKind::ElementOffset { base, .. } => vec![base],
            InstrKind::Store { value, ptr } => vec![value, ptr],
            InstrKind::FloatBinary { left, right, .. } => vec![left, right],
            InstrKind::FloatNeg { value } => vec![value],
            InstrKind::Call { args, .. } => args.iter().collect(),
            InstrKind::FloatCompare { left, right, .. }
            | InstrKind::IntCompare { left, right, .. } => vec![left, right],
            InstrKind::BoolCombine { operands } => operands.iter().collect(),
            InstrKind::Select {
                cond,
                if_true,
                if_false,
                ..
            } => vec![cond, if_true, if_false],
            InstrKind::Branch | InstrKind::Return | InstrKind::Other { .. } => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub result: ValueId,
    pub kind: InstrKind,
}

/// One function of the stream, under the fixed calling convention
/// `(len_input, input_ptr, len_output, output_ptr)`; the length arguments
/// are unused by the importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionStream {
    pub function_name: String,
    pub n_dynamic: usize,
    pub n_independent: usize,
    pub n_dependent: usize,
    pub args: [ValueId; 4],
    pub instrs: Vec<Instr>,
}

impl FunctionStream {
    pub fn input_ptr(&self) -> ValueId {
        self.args[1]
    }

    pub fn output_ptr(&self) -> ValueId {
        self.args[3]
    }
}

/// Append-style constructor for streams; allocates a fresh [`ValueId`] per
/// instruction, the way the producer's value numbering does.
pub struct StreamBuilder {
    stream: FunctionStream,
    next_value: u32,
}

impl StreamBuilder {
    pub fn new(
        function_name: impl Into<String>,
        n_dynamic: usize,
        n_independent: usize,
        n_dependent: usize,
    ) -> Self {
        Self {
            stream: FunctionStream {
                function_name: function_name.into(),
                n_dynamic,
                n_independent,
                n_dependent,
                args: [ValueId(0), ValueId(1), ValueId(2), ValueId(3)],
                instrs: Vec::new(),
            },
            next_value: 4,
        }
    }

    pub fn input_ptr(&self) -> ValueId {
        self.stream.input_ptr()
    }

    pub fn output_ptr(&self) -> ValueId {
        self.stream.output_ptr()
    }

    fn push(&mut self, kind: InstrKind) -> ValueId {
        let result = ValueId(self.next_value);
        self.next_value += 1;
        self.stream.instrs.push(Instr { result, kind });
        result
    }

    pub fn load(&mut self, ptr: impl Into<Operand>) -> ValueId {
        self.push(InstrKind::Load { ptr: ptr.into() })
    }

    pub fn element_offset(&mut self, base: impl Into<Operand>, index: usize) -> ValueId {
        self.push(InstrKind::ElementOffset {
            base: base.into(),
            index,
        })
    }

    pub fn store(&mut self, value: impl Into<Operand>, ptr: impl Into<Operand>) -> ValueId {
        self.push(InstrKind::Store {
            value: value.into(),
            ptr: ptr.into(),
        })
    }

    pub fn float_binary(
        &mut self,
        op: FloatBinOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> ValueId {
        self.push(InstrKind::FloatBinary {
            op,
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn float_neg(&mut self, value: impl Into<Operand>) -> ValueId {
        self.push(InstrKind::FloatNeg {
            value: value.into(),
        })
    }

    pub fn call(&mut self, callee: impl Into<String>, args: Vec<Operand>) -> ValueId {
        self.push(InstrKind::Call {
            callee: callee.into(),
            args,
        })
    }

    pub fn float_compare(
        &mut self,
        pred: Predicate,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> ValueId {
        self.push(InstrKind::FloatCompare {
            pred,
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn int_compare(
        &mut self,
        pred: Predicate,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> ValueId {
        self.push(InstrKind::IntCompare {
            pred,
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn bool_combine(&mut self, operands: Vec<Operand>) -> ValueId {
        self.push(InstrKind::BoolCombine { operands })
    }

    pub fn select(
        &mut self,
        cond: impl Into<Operand>,
        if_true: impl Into<Operand>,
        if_false: impl Into<Operand>,
        float: bool,
    ) -> ValueId {
        self.push(InstrKind::Select {
            cond: cond.into(),
            if_true: if_true.into(),
            if_false: if_false.into(),
            float,
        })
    }

    pub fn branch(&mut self) -> ValueId {
        self.push(InstrKind::Branch)
    }

    pub fn ret(&mut self) -> ValueId {
        self.push(InstrKind::Return)
    }

    pub fn other(&mut self, name: impl Into<String>) -> ValueId {
        self.push(InstrKind::Other { name: name.into() })
    }

    pub fn finish(self) -> FunctionStream {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_fresh_ids() {
        let mut b = StreamBuilder::new("f", 0, 1, 1);
        let x = b.load(b.input_ptr());
        let n = b.float_neg(x);
        let s = b.finish();
        assert_ne!(x, n);
        assert_eq!(s.instrs.len(), 2);
        assert_eq!(s.instrs[0].result, x);
        // Argument ids are reserved before any instruction result.
        assert!(x.0 > s.output_ptr().0);
    }

    #[test]
    fn test_operand_scan_covers_all_positions() {
        let kind = InstrKind::Select {
            cond: Operand::Value(ValueId(9)),
            if_true: Operand::FloatConst(1.0),
            if_false: Operand::FloatConst(2.0),
            float: true,
        };
        assert_eq!(kind.operands().len(), 3);
        assert!(InstrKind::Return.operands().is_empty());
    }
}
