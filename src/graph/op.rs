//! op.rs
//! The closed operator set of the graph and its fixed numeric encoding.

use serde::{Deserialize, Serialize};

/// One elementary operation in the recorded function.
///
/// The numeric codes are part of the textual interchange format and are
/// frozen; new operators may only be appended at the end of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    Add = 0,
    Mul = 1,
    Sub = 2,
    Div = 3,
    Neg = 4,
    Pow = 5,
    Azmul = 6,
    /// Call to an externally registered non-differentiable function.
    /// First argument is an index into `discrete_name_vec`, not a node.
    Discrete = 7,
    Abs = 8,
    Acos = 9,
    Acosh = 10,
    Asin = 11,
    Asinh = 12,
    Atan = 13,
    Atanh = 14,
    Cos = 15,
    Cosh = 16,
    Erf = 17,
    Erfc = 18,
    Exp = 19,
    Expm1 = 20,
    Log = 21,
    Log1p = 22,
    Sign = 23,
    Sin = 24,
    Sinh = 25,
    Sqrt = 26,
    Tan = 27,
    Tanh = 28,
    /// Comparison records assert the outcome observed when the graph was
    /// built. They produce no node; consumers re-check them at evaluation
    /// time and count outcome drift.
    CompEq = 29,
    CompLe = 30,
    CompLt = 31,
    CompNe = 32,
    /// Conditional expressions select between two nodes based on a live
    /// comparison; the branch is data flow, not an elided control path.
    CexpEq = 33,
    CexpLe = 34,
    CexpLt = 35,
}

/// Table in code order; `ALL[i] as u8 == i` holds for every entry.
pub const ALL: [OpCode; 36] = [
    OpCode::Add,
    OpCode::Mul,
    OpCode::Sub,
    OpCode::Div,
    OpCode::Neg,
    OpCode::Pow,
    OpCode::Azmul,
    OpCode::Discrete,
    OpCode::Abs,
    OpCode::Acos,
    OpCode::Acosh,
    OpCode::Asin,
    OpCode::Asinh,
    OpCode::Atan,
    OpCode::Atanh,
    OpCode::Cos,
    OpCode::Cosh,
    OpCode::Erf,
    OpCode::Erfc,
    OpCode::Exp,
    OpCode::Expm1,
    OpCode::Log,
    OpCode::Log1p,
    OpCode::Sign,
    OpCode::Sin,
    OpCode::Sinh,
    OpCode::Sqrt,
    OpCode::Tan,
    OpCode::Tanh,
    OpCode::CompEq,
    OpCode::CompLe,
    OpCode::CompLt,
    OpCode::CompNe,
    OpCode::CexpEq,
    OpCode::CexpLe,
    OpCode::CexpLt,
];

impl OpCode {
    /// Canonical name, as written in the textual interchange format.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Add => "add",
            OpCode::Mul => "mul",
            OpCode::Sub => "sub",
            OpCode::Div => "div",
            OpCode::Neg => "neg",
            OpCode::Pow => "pow",
            OpCode::Azmul => "azmul",
            OpCode::Discrete => "discrete",
            OpCode::Abs => "abs",
            OpCode::Acos => "acos",
            OpCode::Acosh => "acosh",
            OpCode::Asin => "asin",
            OpCode::Asinh => "asinh",
            OpCode::Atan => "atan",
            OpCode::Atanh => "atanh",
            OpCode::Cos => "cos",
            OpCode::Cosh => "cosh",
            OpCode::Erf => "erf",
            OpCode::Erfc => "erfc",
            OpCode::Exp => "exp",
            OpCode::Expm1 => "expm1",
            OpCode::Log => "log",
            OpCode::Log1p => "log1p",
            OpCode::Sign => "sign",
            OpCode::Sin => "sin",
            OpCode::Sinh => "sinh",
            OpCode::Sqrt => "sqrt",
            OpCode::Tan => "tan",
            OpCode::Tanh => "tanh",
            OpCode::CompEq => "comp_eq",
            OpCode::CompLe => "comp_le",
            OpCode::CompLt => "comp_lt",
            OpCode::CompNe => "comp_ne",
            OpCode::CexpEq => "cexp_eq",
            OpCode::CexpLe => "cexp_le",
            OpCode::CexpLt => "cexp_lt",
        }
    }

    /// Looks up an opcode by its numeric interchange code.
    pub fn from_code(code: usize) -> Option<OpCode> {
        ALL.get(code).copied()
    }

    /// Looks up an opcode by its canonical name.
    pub fn from_name(name: &str) -> Option<OpCode> {
        ALL.iter().copied().find(|op| op.name() == name)
    }

    pub fn code(self) -> usize {
        self as u8 as usize
    }

    /// Number of graph nodes this operator produces (0 or 1).
    /// Pure comparison records exist only for their drift-check side effect.
    pub fn n_result(self) -> usize {
        match self {
            OpCode::CompEq | OpCode::CompLe | OpCode::CompLt | OpCode::CompNe => 0,
            _ => 1,
        }
    }

    /// Fixed argument count of this operator.
    pub fn n_arg(self) -> usize {
        match self {
            OpCode::Neg
            | OpCode::Abs
            | OpCode::Acos
            | OpCode::Acosh
            | OpCode::Asin
            | OpCode::Asinh
            | OpCode::Atan
            | OpCode::Atanh
            | OpCode::Cos
            | OpCode::Cosh
            | OpCode::Erf
            | OpCode::Erfc
            | OpCode::Exp
            | OpCode::Expm1
            | OpCode::Log
            | OpCode::Log1p
            | OpCode::Sign
            | OpCode::Sin
            | OpCode::Sinh
            | OpCode::Sqrt
            | OpCode::Tan
            | OpCode::Tanh => 1,
            OpCode::Add
            | OpCode::Mul
            | OpCode::Sub
            | OpCode::Div
            | OpCode::Pow
            | OpCode::Azmul
            | OpCode::Discrete
            | OpCode::CompEq
            | OpCode::CompLe
            | OpCode::CompLt
            | OpCode::CompNe => 2,
            OpCode::CexpEq | OpCode::CexpLe | OpCode::CexpLt => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_code_table_is_dense() {
        for (i, &op) in ALL.iter().enumerate() {
            assert_eq!(op.code(), i);
            assert_eq!(OpCode::from_code(i), Some(op));
        }
        assert_eq!(OpCode::from_code(ALL.len()), None);
    }

    #[test]
    fn test_mul_code_is_pinned() {
        // The interchange format example fixes mul = 1.
        assert_eq!(OpCode::Mul.code(), 1);
        assert_eq!(OpCode::from_name("mul"), Some(OpCode::Mul));
    }

    #[rstest]
    #[case(OpCode::Add, "add", 2, 1)]
    #[case(OpCode::Neg, "neg", 1, 1)]
    #[case(OpCode::Pow, "pow", 2, 1)]
    #[case(OpCode::Azmul, "azmul", 2, 1)]
    #[case(OpCode::Discrete, "discrete", 2, 1)]
    #[case(OpCode::Sqrt, "sqrt", 1, 1)]
    #[case(OpCode::CompEq, "comp_eq", 2, 0)]
    #[case(OpCode::CompNe, "comp_ne", 2, 0)]
    #[case(OpCode::CexpLt, "cexp_lt", 4, 1)]
    fn test_op_tables(
        #[case] op: OpCode,
        #[case] name: &str,
        #[case] n_arg: usize,
        #[case] n_result: usize,
    ) {
        assert_eq!(op.name(), name);
        assert_eq!(op.n_arg(), n_arg);
        assert_eq!(op.n_result(), n_result);
        assert_eq!(OpCode::from_name(name), Some(op));
    }

    #[test]
    fn test_names_are_unique() {
        for &a in ALL.iter() {
            assert_eq!(OpCode::from_name(a.name()), Some(a));
        }
    }
}
