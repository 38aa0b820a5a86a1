//! csrc.rs
//! Generates a standalone C99 translation unit for the zero-order forward
//! sweep of a graph.
//!
//! The generated function follows a fixed external contract:
//!
//! ```c
//! int adg_forward_zero_<name>(
//!     size_t call_id, size_t nx, const double* x,
//!     size_t ny, double* y, size_t* compare_change);
//! ```
//!
//! It returns 1 when `nx` disagrees with the graph, 2 when `ny` does, and
//! 0 otherwise. Comparison records compile to drift checks on the caller's
//! counter; conditional expressions compile to ternaries and leave the
//! counter alone. Discrete functions become `extern` declarations the
//! linking application must satisfy.

use crate::graph::{Graph, OpCode};
use std::fmt::Write;

/// Symbol prefix of every generated entry point.
pub const FORWARD_ZERO_PREFIX: &str = "adg_forward_zero_";

/// Symbol prefix of the extern declaration emitted per discrete function.
pub const DISCRETE_PREFIX: &str = "adg_discrete_";

/// Generates the C source for `graph`. The output is a complete
/// translation unit; compiling and loading it is the caller's concern.
pub fn to_csrc(graph: &Graph) -> String {
    let name = if graph.function_name().is_empty() {
        "unnamed"
    } else {
        graph.function_name()
    };
    let n_input = graph.n_dynamic() + graph.n_independent();
    let n_output = graph.dependent_vec().len();

    let uses_azmul = (0..graph.n_operator()).any(|i| graph.operator(i).0 == OpCode::Azmul);
    let uses_sign = (0..graph.n_operator()).any(|i| graph.operator(i).0 == OpCode::Sign);

    let mut out = String::new();
    let _ = writeln!(out, "/* {}{} */", FORWARD_ZERO_PREFIX, name);
    out.push_str("#include <math.h>\n");
    out.push_str("#include <stddef.h>\n\n");

    if uses_azmul {
        out.push_str("static double azmul(double x, double y)\n");
        out.push_str("{\n\tif( x == 0.0 ) return 0.0;\n\treturn x * y;\n}\n\n");
    }
    if uses_sign {
        out.push_str("static double sign(double x)\n");
        out.push_str(
            "{\n\tif( x > 0.0 ) return 1.0;\n\tif( x < 0.0 ) return -1.0;\n\treturn 0.0;\n}\n\n",
        );
    }
    for dname in graph.discrete_name_vec() {
        let _ = writeln!(out, "extern double {}{}(double x);", DISCRETE_PREFIX, dname);
    }
    if !graph.discrete_name_vec().is_empty() {
        out.push('\n');
    }

    let _ = writeln!(out, "int {}{}(", FORWARD_ZERO_PREFIX, name);
    out.push_str("\tsize_t        call_id,\n");
    out.push_str("\tsize_t        nx,\n");
    out.push_str("\tconst double* x,\n");
    out.push_str("\tsize_t        ny,\n");
    out.push_str("\tdouble*       y,\n");
    out.push_str("\tsize_t*       compare_change)\n");
    out.push_str("{\n");
    out.push_str("\t(void)call_id;\n");
    let _ = writeln!(out, "\tif( nx != {} ) return 1;", n_input);
    let _ = writeln!(out, "\tif( ny != {} ) return 2;", n_output);

    // slot 0 is the unused node-number sentinel
    let _ = writeln!(out, "\tdouble v[{}];", 1 + graph.n_node());

    // dynamic parameters and independent variables
    for i in 0..n_input {
        let _ = writeln!(out, "\tv[{}] = x[{}];", 1 + i, i);
    }
    // constants, first-occurrence order
    for (i, c) in graph.constant_vec().iter().enumerate() {
        let _ = writeln!(out, "\tv[{}] = {:?};", graph.start_constant() + i, c);
    }

    // operator tape
    let mut result = graph.start_operator();
    for i in 0..graph.n_operator() {
        let (code, arg) = graph.operator(i);
        match code {
            OpCode::Add => binary(&mut out, result, arg, "+"),
            OpCode::Sub => binary(&mut out, result, arg, "-"),
            OpCode::Mul => binary(&mut out, result, arg, "*"),
            OpCode::Div => binary(&mut out, result, arg, "/"),
            OpCode::Neg => {
                let _ = writeln!(out, "\tv[{}] = - v[{}];", result, arg[0]);
            }
            OpCode::Pow => {
                let _ = writeln!(out, "\tv[{}] = pow(v[{}], v[{}]);", result, arg[0], arg[1]);
            }
            OpCode::Azmul => {
                let _ = writeln!(out, "\tv[{}] = azmul(v[{}], v[{}]);", result, arg[0], arg[1]);
            }
            OpCode::Discrete => {
                let dname = &graph.discrete_name_vec()[arg[0]];
                let _ = writeln!(
                    out,
                    "\tv[{}] = {}{}(v[{}]);",
                    result, DISCRETE_PREFIX, dname, arg[1]
                );
            }
            OpCode::Abs => unary(&mut out, result, arg, "fabs"),
            OpCode::Sign => unary(&mut out, result, arg, "sign"),
            OpCode::Acos
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
            | OpCode::Sin
            | OpCode::Sinh
            | OpCode::Sqrt
            | OpCode::Tan
            | OpCode::Tanh => unary(&mut out, result, arg, code.name()),
            OpCode::CompEq => compare(&mut out, arg, "=="),
            OpCode::CompLe => compare(&mut out, arg, "<="),
            OpCode::CompLt => compare(&mut out, arg, "<"),
            OpCode::CompNe => compare(&mut out, arg, "!="),
            OpCode::CexpEq => conditional(&mut out, result, arg, "=="),
            OpCode::CexpLe => conditional(&mut out, result, arg, "<="),
            OpCode::CexpLt => conditional(&mut out, result, arg, "<"),
        }
        result += code.n_result();
    }

    // dependent values, slot order
    for (slot, node) in graph.dependent_vec().iter().enumerate() {
        let _ = writeln!(out, "\ty[{}] = v[{}];", slot, node);
    }
    out.push_str("\treturn 0;\n}\n");
    out
}

fn binary(out: &mut String, result: usize, arg: &[usize], op: &str) {
    let _ = writeln!(out, "\tv[{}] = v[{}] {} v[{}];", result, arg[0], op, arg[1]);
}

fn unary(out: &mut String, result: usize, arg: &[usize], f: &str) {
    let _ = writeln!(out, "\tv[{}] = {}(v[{}]);", result, f, arg[0]);
}

fn compare(out: &mut String, arg: &[usize], op: &str) {
    let _ = writeln!(
        out,
        "\tif( !(v[{}] {} v[{}]) ) ++(*compare_change);",
        arg[0], op, arg[1]
    );
}

fn conditional(out: &mut String, result: usize, arg: &[usize], op: &str) {
    let _ = writeln!(
        out,
        "\tv[{}] = v[{}] {} v[{}] ? v[{}] : v[{}];",
        result, arg[0], op, arg[1], arg[2], arg[3]
    );
}
