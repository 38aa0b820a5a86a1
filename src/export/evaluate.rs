//! evaluate.rs
//! Reference evaluator for a recorded graph: the in-process form of the
//! behavioral contract the generated C source must satisfy.
//!
//! Evaluation is a single forward walk of the operator tape. The value
//! table is indexed by node number (slot 0 is the unused sentinel), filled
//! with the dynamic parameters and independent variables from `x`, then the
//! constants, then one slot per value-producing operator. Comparison
//! records re-check the outcome observed when the graph was built and bump
//! the caller-owned counter on drift; conditional expressions select
//! between data values and never touch the counter.

use crate::graph::{Graph, OpCode};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("input length {found} does not match graph ({expected})")]
    InputLength { found: usize, expected: usize },
    #[error("output length {found} does not match graph ({expected})")]
    OutputLength { found: usize, expected: usize },
    #[error("discrete function {0} is not registered")]
    UnknownDiscrete(String),
}

/// Resolves discrete-function names to callable addresses at evaluation
/// time. Names are opaque to the graph itself.
#[derive(Default)]
pub struct DiscreteRegistry {
    map: HashMap<String, fn(f64) -> f64>,
}

impl DiscreteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: fn(f64) -> f64) {
        self.map.insert(name.into(), f);
    }

    fn get(&self, name: &str) -> Option<fn(f64) -> f64> {
        self.map.get(name).copied()
    }
}

/// Zero-order forward evaluation. `x` holds the dynamic parameters
/// followed by the independent variables; `y` receives the dependent
/// values in slot order. `compare_change` is owned and reset by the
/// caller; a nonzero count after the call means a comparison recorded at
/// build time now resolves differently and the graph's control-flow
/// assumption may be stale.
pub fn forward_zero(
    graph: &Graph,
    x: &[f64],
    y: &mut [f64],
    registry: &DiscreteRegistry,
    compare_change: &mut usize,
) -> Result<(), EvalError> {
    let n_input = graph.n_dynamic() + graph.n_independent();
    if x.len() != n_input {
        return Err(EvalError::InputLength {
            found: x.len(),
            expected: n_input,
        });
    }
    if y.len() != graph.dependent_vec().len() {
        return Err(EvalError::OutputLength {
            found: y.len(),
            expected: graph.dependent_vec().len(),
        });
    }

    let mut v = vec![0.0_f64; 1 + graph.n_node()];
    for (i, &xi) in x.iter().enumerate() {
        v[1 + i] = xi;
    }
    for (i, &c) in graph.constant_vec().iter().enumerate() {
        v[graph.start_constant() + i] = c;
    }

    let mut result = graph.start_operator();
    for i in 0..graph.n_operator() {
        let (code, arg) = graph.operator(i);
        let value = match code {
            OpCode::Add => v[arg[0]] + v[arg[1]],
            OpCode::Sub => v[arg[0]] - v[arg[1]],
            OpCode::Mul => v[arg[0]] * v[arg[1]],
            OpCode::Div => v[arg[0]] / v[arg[1]],
            OpCode::Neg => -v[arg[0]],
            OpCode::Pow => v[arg[0]].powf(v[arg[1]]),
            // zero times anything is zero, even inf or nan
            OpCode::Azmul => {
                if v[arg[0]] == 0.0 {
                    0.0
                } else {
                    v[arg[0]] * v[arg[1]]
                }
            }
            OpCode::Discrete => {
                let name = &graph.discrete_name_vec()[arg[0]];
                let f = registry
                    .get(name)
                    .ok_or_else(|| EvalError::UnknownDiscrete(name.clone()))?;
                f(v[arg[1]])
            }
            OpCode::Abs => v[arg[0]].abs(),
            OpCode::Acos => v[arg[0]].acos(),
            OpCode::Acosh => v[arg[0]].acosh(),
            OpCode::Asin => v[arg[0]].asin(),
            OpCode::Asinh => v[arg[0]].asinh(),
            OpCode::Atan => v[arg[0]].atan(),
            OpCode::Atanh => v[arg[0]].atanh(),
            OpCode::Cos => v[arg[0]].cos(),
            OpCode::Cosh => v[arg[0]].cosh(),
            OpCode::Erf => erf(v[arg[0]]),
            OpCode::Erfc => 1.0 - erf(v[arg[0]]),
            OpCode::Exp => v[arg[0]].exp(),
            OpCode::Expm1 => v[arg[0]].exp_m1(),
            OpCode::Log => v[arg[0]].ln(),
            OpCode::Log1p => v[arg[0]].ln_1p(),
            OpCode::Sign => sign(v[arg[0]]),
            OpCode::Sin => v[arg[0]].sin(),
            OpCode::Sinh => v[arg[0]].sinh(),
            OpCode::Sqrt => v[arg[0]].sqrt(),
            OpCode::Tan => v[arg[0]].tan(),
            OpCode::Tanh => v[arg[0]].tanh(),
            OpCode::CompEq => {
                if !(v[arg[0]] == v[arg[1]]) {
                    *compare_change += 1;
                }
                continue;
            }
            OpCode::CompLe => {
                if !(v[arg[0]] <= v[arg[1]]) {
                    *compare_change += 1;
                }
                continue;
            }
            OpCode::CompLt => {
                if !(v[arg[0]] < v[arg[1]]) {
                    *compare_change += 1;
                }
                continue;
            }
            OpCode::CompNe => {
                if !(v[arg[0]] != v[arg[1]]) {
                    *compare_change += 1;
                }
                continue;
            }
            OpCode::CexpEq => {
                if v[arg[0]] == v[arg[1]] {
                    v[arg[2]]
                } else {
                    v[arg[3]]
                }
            }
            OpCode::CexpLe => {
                if v[arg[0]] <= v[arg[1]] {
                    v[arg[2]]
                } else {
                    v[arg[3]]
                }
            }
            OpCode::CexpLt => {
                if v[arg[0]] < v[arg[1]] {
                    v[arg[2]]
                } else {
                    v[arg[3]]
                }
            }
        };
        v[result] = value;
        result += 1;
    }

    for (slot, &node) in graph.dependent_vec().iter().enumerate() {
        y[slot] = v[node];
    }
    Ok(())
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Error function, Abramowitz & Stegun 7.1.26 rational approximation
/// (max absolute error about 1.5e-7; the generated C source uses the
/// libm implementation instead).
fn erf(x: f64) -> f64 {
    let sgn = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sgn * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn eval1(graph: &Graph, x: &[f64]) -> (f64, usize) {
        let mut y = vec![0.0; graph.dependent_vec().len()];
        let mut change = 0;
        forward_zero(graph, x, &mut y, &DiscreteRegistry::new(), &mut change).unwrap();
        (y[0], change)
    }

    #[test]
    fn test_arithmetic_chain() {
        // f(x0, x1) = (x0 + x1) * 2.0 - x0 / x1
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_constant(2.0);
        g.push_operator(OpCode::Add, &[1, 2]); // node 4
        g.push_operator(OpCode::Mul, &[4, 3]); // node 5
        g.push_operator(OpCode::Div, &[1, 2]); // node 6
        g.push_operator(OpCode::Sub, &[5, 6]); // node 7
        g.push_dependent(7);

        let (y, change) = eval1(&g, &[3.0, 4.0]);
        assert_eq!(y, (3.0 + 4.0) * 2.0 - 3.0 / 4.0);
        assert_eq!(change, 0);
    }

    #[test]
    fn test_unary_math() {
        let mut g = Graph::new();
        g.set_n_independent(1);
        g.push_operator(OpCode::Sqrt, &[1]); // node 2
        g.push_operator(OpCode::Log, &[2]); // node 3
        g.push_dependent(3);
        let (y, _) = eval1(&g, &[4.0]);
        assert!((y - 4.0_f64.sqrt().ln()).abs() < 1e-15);
    }

    #[test]
    fn test_erf_accuracy() {
        // Spot values; the approximation is good to ~1.5e-7.
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(0.5) - 0.5204998778).abs() < 1e-6);
        assert!((erf(-0.5) + 0.5204998778).abs() < 1e-6);
        assert!((erf(2.0) - 0.9953222650).abs() < 1e-6);
    }

    #[test]
    fn test_azmul_zero_protects_against_inf() {
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_operator(OpCode::Azmul, &[1, 2]);
        g.push_dependent(3);
        let (y, _) = eval1(&g, &[0.0, f64::INFINITY]);
        assert_eq!(y, 0.0);
        let (y, _) = eval1(&g, &[2.0, 3.0]);
        assert_eq!(y, 6.0);
    }

    #[test]
    fn test_sign_cases() {
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.5), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }

    #[test]
    fn test_compare_change_detection() {
        // Recorded: x0 < x1 held at build time.
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_operator(OpCode::CompLt, &[1, 2]);
        g.push_operator(OpCode::Add, &[1, 2]); // node 3
        g.push_dependent(3);

        // Original relative ordering: no drift.
        let (_, change) = eval1(&g, &[1.0, 2.0]);
        assert_eq!(change, 0);

        // Flipped ordering: exactly one drift event.
        let (y, change) = eval1(&g, &[2.0, 1.0]);
        assert_eq!(change, 1);
        // Values are still produced; drift is a signal, not a failure.
        assert_eq!(y, 3.0);
    }

    #[test]
    fn test_conditional_expression_does_not_count_drift() {
        // cexp_le(x0, x1, x0, x1): min-like select, baked into data flow.
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_operator(OpCode::CexpLe, &[1, 2, 1, 2]);
        g.push_dependent(3);

        let (y, change) = eval1(&g, &[5.0, 2.0]);
        assert_eq!(y, 2.0);
        assert_eq!(change, 0);
        let (y, change) = eval1(&g, &[1.0, 2.0]);
        assert_eq!(y, 1.0);
        assert_eq!(change, 0);
    }

    #[test]
    fn test_discrete_dispatch() {
        let mut g = Graph::new();
        g.set_n_independent(1);
        g.push_discrete_name("unit_step");
        g.push_operator(OpCode::Discrete, &[0, 1]);
        g.push_dependent(2);

        fn unit_step(x: f64) -> f64 {
            if x >= 0.0 {
                1.0
            } else {
                0.0
            }
        }
        let mut registry = DiscreteRegistry::new();
        registry.register("unit_step", unit_step);

        let mut y = [0.0];
        let mut change = 0;
        forward_zero(&g, &[-3.0], &mut y, &registry, &mut change).unwrap();
        assert_eq!(y[0], 0.0);

        // Unregistered name is an error, not a silent zero.
        let err = forward_zero(&g, &[-3.0], &mut y, &DiscreteRegistry::new(), &mut change)
            .unwrap_err();
        assert_eq!(err, EvalError::UnknownDiscrete("unit_step".into()));
    }

    #[test]
    fn test_length_checks() {
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_operator(OpCode::Add, &[1, 2]);
        g.push_dependent(3);

        let mut y = [0.0];
        let mut change = 0;
        let err =
            forward_zero(&g, &[1.0], &mut y, &DiscreteRegistry::new(), &mut change).unwrap_err();
        assert_eq!(
            err,
            EvalError::InputLength {
                found: 1,
                expected: 2
            }
        );

        let mut y2: [f64; 0] = [];
        let err = forward_zero(
            &g,
            &[1.0, 2.0],
            &mut y2,
            &DiscreteRegistry::new(),
            &mut change,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EvalError::OutputLength {
                found: 0,
                expected: 1
            }
        );
    }

    #[test]
    fn test_imported_stream_evaluates_end_to_end() {
        // f(x0, x1) = sqrt(x0 * 2.0 + x1), through the importer.
        use crate::import::{from_stream, FloatBinOp, StreamBuilder};
        let mut b = StreamBuilder::new("f", 0, 2, 1);
        let p0 = b.input_ptr();
        let x0 = b.load(p0);
        let p1 = b.element_offset(p0, 1);
        let x1 = b.load(p1);
        let m = b.float_binary(FloatBinOp::Mul, x0, 2.0);
        let a = b.float_binary(FloatBinOp::Add, m, x1);
        let s = b.call("sqrt", vec![a.into()]);
        let out = b.output_ptr();
        b.store(s, out);
        b.ret();

        let g = from_stream(&b.finish()).unwrap();
        let (y, change) = eval1(&g, &[4.0, 1.0]);
        assert_eq!(y, 3.0);
        assert_eq!(change, 0);
    }

    #[test]
    fn test_dynamic_parameters_come_first() {
        // f(p; x) = p * x with one dynamic parameter.
        let mut g = Graph::new();
        g.set_n_dynamic(1);
        g.set_n_independent(1);
        g.push_operator(OpCode::Mul, &[1, 2]);
        g.push_dependent(3);
        let (y, _) = eval1(&g, &[10.0, 0.5]);
        assert_eq!(y, 5.0);
    }
}
