//! writer.rs
//! Encodes a [`Graph`] into the textual interchange format.
//!
//! The writer is the mirror image of the reader: same fixed key order, same
//! length-prefixed arrays, and the optional keys (`function_name`,
//! `discrete_name_vec`) are emitted only when non-empty. Floats use
//! shortest-round-trip formatting so decode(encode(g)) == g for finite
//! values.

use crate::graph::Graph;
use std::fmt::Write;

/// Encodes `graph` as a single interchange object.
pub fn to_text(graph: &Graph) -> String {
    let mut out = String::new();
    out.push('{');

    if !graph.function_name().is_empty() {
        let _ = write!(out, "\"function_name\":{},", quote(graph.function_name()));
    }
    let _ = write!(out, "\"n_dynamic\":{},", graph.n_dynamic());
    let _ = write!(out, "\"n_independent\":{},", graph.n_independent());

    let _ = write!(out, "\"string_vec\":[{},[", graph.string_vec().len());
    for (i, s) in graph.string_vec().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(s));
    }
    out.push_str("]],");

    let _ = write!(out, "\"constant_vec\":[{},[", graph.n_constant());
    for (i, c) in graph.constant_vec().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{:?}", c);
    }
    out.push_str("]],");

    if !graph.discrete_name_vec().is_empty() {
        let _ = write!(
            out,
            "\"discrete_name_vec\":[{},[",
            graph.discrete_name_vec().len()
        );
        for (i, s) in graph.discrete_name_vec().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&quote(s));
        }
        out.push_str("]],");
    }

    let _ = write!(out, "\"operator_vec\":[{},[", graph.n_operator());
    for i in 0..graph.n_operator() {
        if i > 0 {
            out.push(',');
        }
        let (code, args) = graph.operator(i);
        let _ = write!(out, "[{},{},[{},[", code.code(), code.n_result(), args.len());
        for (j, a) in args.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}", a);
        }
        // trailing canonical name: redundant integrity check for readers
        let _ = write!(out, "]],{}]", quote(code.name()));
    }
    out.push_str("]],");

    let _ = write!(out, "\"dependent_vec\":[{},[", graph.dependent_vec().len());
    for (i, d) in graph.dependent_vec().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", d);
    }
    out.push_str("]]}");
    out
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OpCode;
    use crate::text::from_text;

    fn mul_graph() -> Graph {
        let mut g = Graph::new();
        g.set_n_independent(2);
        g.push_string("x");
        g.push_string("y");
        g.push_constant(-2.0);
        g.push_operator(OpCode::Mul, &[1, 2]);
        g.push_dependent(3);
        g
    }

    #[test]
    fn test_writer_matches_reference_text() {
        let expected = concat!(
            "{\"n_dynamic\":0,\"n_independent\":2,",
            "\"string_vec\":[2,[\"x\",\"y\"]],",
            "\"constant_vec\":[1,[-2.0]],",
            "\"operator_vec\":[1,[1,1,[2,[1,2]],\"mul\"]],",
            "\"dependent_vec\":[1,[3]]}"
        );
        assert_eq!(to_text(&mul_graph()), expected);
    }

    #[test]
    fn test_round_trip_equality() {
        let g = mul_graph();
        let back = from_text(&to_text(&g)).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn test_round_trip_with_optional_keys() {
        let mut g = Graph::new();
        g.set_function_name("wave");
        g.set_n_dynamic(1);
        g.set_n_independent(1);
        g.push_string("p");
        g.push_string("x");
        g.push_constant(0.5);
        g.push_discrete_name("unit_step");
        g.push_operator(OpCode::Discrete, &[0, 2]);
        g.push_operator(OpCode::CompLe, &[2, 4]);
        g.push_operator(OpCode::CexpLt, &[1, 2, 3, 4]);
        g.push_dependent(5);
        let back = from_text(&to_text(&g)).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn test_float_formatting_round_trips() {
        let mut g = mul_graph();
        g.push_constant(0.1);
        g.push_constant(1.0 / 3.0);
        g.push_constant(1e300);
        g.push_constant(5.0);
        let back = from_text(&to_text(&g)).unwrap();
        assert_eq!(g.constant_vec(), back.constant_vec());
    }
}
