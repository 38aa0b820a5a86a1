//! reader.rs
//! Parses the textual interchange format into a [`Graph`].
//!
//! Key order is fixed. Two keys are optional but position-fixed:
//! `function_name` (first, when present) and `discrete_name_vec`
//! (immediately after `constant_vec`, when present). Every array is
//! length-prefixed `[ N, [ elem... ] ]`; a mismatch between N and the
//! element list is a format error, never silently recovered.

use super::token::{Token, Tokenizer};
use super::FormatError;
use crate::graph::{Graph, OpCode};
use smallvec::SmallVec;

/// Decodes `text` into a fresh graph.
pub fn from_text(text: &str) -> Result<Graph, FormatError> {
    let mut t = Tokenizer::new(text);
    let mut graph = Graph::new();
    graph.initialize();

    expect(&mut t, Token::LBrace)?;

    // function_name is optional; when present it is the first key.
    let mut key = read_key(&mut t)?;
    if key == "function_name" {
        graph.set_function_name(read_string(&mut t)?);
        expect(&mut t, Token::Comma)?;
        key = read_key(&mut t)?;
    }

    require_key("n_dynamic", &key)?;
    let n_dynamic = read_uint(&mut t)?;
    graph.set_n_dynamic(n_dynamic);
    expect(&mut t, Token::Comma)?;

    require_key("n_independent", &read_key(&mut t)?)?;
    graph.set_n_independent(read_uint(&mut t)?);
    expect(&mut t, Token::Comma)?;

    require_key("string_vec", &read_key(&mut t)?)?;
    read_counted(&mut t, |t| {
        let s = read_string(t)?;
        graph.push_string(s);
        Ok(())
    })?;
    expect(&mut t, Token::Comma)?;

    require_key("constant_vec", &read_key(&mut t)?)?;
    read_counted(&mut t, |t| {
        let c = read_float(t)?;
        graph.push_constant(c);
        Ok(())
    })?;
    expect(&mut t, Token::Comma)?;

    // discrete_name_vec is optional; when present it follows constant_vec.
    key = read_key(&mut t)?;
    if key == "discrete_name_vec" {
        read_counted(&mut t, |t| {
            let s = read_string(t)?;
            graph.push_discrete_name(s);
            Ok(())
        })?;
        expect(&mut t, Token::Comma)?;
        key = read_key(&mut t)?;
    }

    require_key("operator_vec", &key)?;
    read_counted(&mut t, |t| read_operator(t, &mut graph))?;
    expect(&mut t, Token::Comma)?;

    require_key("dependent_vec", &read_key(&mut t)?)?;
    read_counted(&mut t, |t| {
        let d = read_uint(t)?;
        graph.push_dependent(d);
        Ok(())
    })?;

    expect(&mut t, Token::RBrace)?;
    if !t.at_end() {
        return Err(FormatError::TrailingInput);
    }
    Ok(graph)
}

/// One operator entry: `[ code, n_result, [ n_arg, [ arg... ] ], "name" ]`.
/// The trailing name is a redundant integrity check against the numeric
/// code; a mismatch indicates format corruption.
fn read_operator(t: &mut Tokenizer, graph: &mut Graph) -> Result<(), FormatError> {
    expect(t, Token::LBracket)?;
    let code = read_uint(t)?;
    expect(t, Token::Comma)?;
    let n_result = read_uint(t)?;
    expect(t, Token::Comma)?;

    let mut args: SmallVec<[usize; 4]> = SmallVec::new();
    read_counted(t, |t| {
        args.push(read_uint(t)?);
        Ok(())
    })?;
    expect(t, Token::Comma)?;
    let name = read_string(t)?;
    expect(t, Token::RBracket)?;

    let op = OpCode::from_code(code).ok_or(FormatError::UnknownOpCode(code))?;
    if name != op.name() {
        return Err(FormatError::OpNameMismatch {
            code,
            name,
            canonical: op.name(),
        });
    }
    if n_result != op.n_result() {
        return Err(FormatError::OpResultMismatch {
            name: op.name(),
            found: n_result,
            expected: op.n_result(),
        });
    }
    graph.push_operator(op, &args);
    Ok(())
}

/// Reads a length-prefixed array `[ N, [ ... ] ]`, calling `elem` exactly N
/// times. Too few elements trips the element parser on ']'; too many trips
/// the closing-bracket check on ','.
fn read_counted<F>(t: &mut Tokenizer, mut elem: F) -> Result<(), FormatError>
where
    F: FnMut(&mut Tokenizer) -> Result<(), FormatError>,
{
    expect(t, Token::LBracket)?;
    let n = read_uint(t)?;
    expect(t, Token::Comma)?;
    expect(t, Token::LBracket)?;
    for i in 0..n {
        if i > 0 {
            expect(t, Token::Comma)?;
        }
        elem(t)?;
    }
    expect(t, Token::RBracket)?;
    expect(t, Token::RBracket)?;
    Ok(())
}

fn read_key(t: &mut Tokenizer) -> Result<String, FormatError> {
    let key = read_string(t)?;
    expect(t, Token::Colon)?;
    Ok(key)
}

fn require_key(expected: &str, found: &str) -> Result<(), FormatError> {
    if expected == found {
        Ok(())
    } else {
        Err(FormatError::WrongKey {
            expected: expected.into(),
            found: found.into(),
        })
    }
}

fn read_string(t: &mut Tokenizer) -> Result<String, FormatError> {
    match t.next_token()? {
        Token::Str(s) => Ok(s),
        other => Err(FormatError::Unexpected {
            expected: "string".into(),
            found: other.describe(),
        }),
    }
}

/// Counts and node indices must be non-negative integers; `-2` or `2.5`
/// in these positions is a format error.
fn read_uint(t: &mut Tokenizer) -> Result<usize, FormatError> {
    match t.next_token()? {
        Token::UInt(u) => Ok(u),
        other => Err(FormatError::ExpectedUint(other.describe())),
    }
}

/// Constants accept either numeric form; `2` and `2.0` denote the same value.
fn read_float(t: &mut Tokenizer) -> Result<f64, FormatError> {
    match t.next_token()? {
        Token::Float(f) => Ok(f),
        Token::UInt(u) => Ok(u as f64),
        other => Err(FormatError::Unexpected {
            expected: "number".into(),
            found: other.describe(),
        }),
    }
}

fn expect(t: &mut Tokenizer, want: Token) -> Result<(), FormatError> {
    let got = t.next_token()?;
    if got == want {
        Ok(())
    } else {
        Err(FormatError::Unexpected {
            expected: want.describe(),
            found: got.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // End-to-end reference text: two independents, one constant, one
    // (unreferenced) multiply, and the constant itself as the dependent.
    const EXAMPLE: &str = concat!(
        "{\"n_dynamic\":0,\"n_independent\":2,",
        "\"string_vec\":[2,[\"x\",\"y\"]],",
        "\"constant_vec\":[1,[-2.0]],",
        "\"operator_vec\":[1,[1,1,[2,[1,2]],\"mul\"]],",
        "\"dependent_vec\":[1,[3]]}"
    );

    #[test]
    fn test_decode_example() {
        let g = from_text(EXAMPLE).unwrap();
        assert_eq!(g.n_dynamic(), 0);
        assert_eq!(g.n_independent(), 2);
        assert_eq!(g.string_vec(), &["x".to_string(), "y".to_string()]);
        assert_eq!(g.constant_vec(), &[-2.0]);
        assert_eq!(g.n_operator(), 1);
        let (code, args) = g.operator(0);
        assert_eq!(code, OpCode::Mul);
        // The operator multiplies the two independent nodes (1, 2); its
        // result node 4 is never referenced.
        assert_eq!(args, &[1, 2]);
        assert_eq!(g.dependent_vec(), &[3]);
        assert_eq!(g.start_constant(), 3);
    }

    #[test]
    fn test_optional_keys() {
        let text = concat!(
            "{\"function_name\":\"f\",\"n_dynamic\":1,\"n_independent\":1,",
            "\"string_vec\":[0,[]],\"constant_vec\":[0,[]],",
            "\"discrete_name_vec\":[1,[\"unit_step\"]],",
            "\"operator_vec\":[1,[7,1,[2,[0,2]],\"discrete\"]],",
            "\"dependent_vec\":[1,[3]]}"
        );
        let g = from_text(text).unwrap();
        assert_eq!(g.function_name(), "f");
        assert_eq!(g.discrete_name_vec(), &["unit_step".to_string()]);
        let (code, args) = g.operator(0);
        assert_eq!(code, OpCode::Discrete);
        assert_eq!(args, &[0, 2]);
    }

    #[test]
    fn test_opcode_name_mismatch_is_rejected() {
        let text = EXAMPLE.replace("\"mul\"", "\"add\"");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::OpNameMismatch { code: 1, .. }));
    }

    #[test]
    fn test_count_shorter_than_array_is_rejected() {
        // Count says 1 but two constants are present.
        let text = EXAMPLE.replace("[1,[-2.0]]", "[1,[-2.0,3.0]]");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::Unexpected { .. }));
    }

    #[test]
    fn test_count_longer_than_array_is_rejected() {
        let text = EXAMPLE.replace("[1,[-2.0]]", "[2,[-2.0]]");
        assert!(from_text(&text).is_err());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let text = EXAMPLE.replace("\"dependent_vec\":[1,", "\"dependent_vec\":[-1,");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::ExpectedUint(_)));
    }

    #[test]
    fn test_fractional_node_index_is_rejected() {
        let text = EXAMPLE.replace("\"dependent_vec\":[1,[3]]", "\"dependent_vec\":[1,[3.5]]");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::ExpectedUint(_)));
    }

    #[test]
    fn test_wrong_key_order_is_rejected() {
        let text = EXAMPLE.replace("\"n_dynamic\"", "\"n_dependent\"");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::WrongKey { .. }));
    }

    #[test]
    fn test_unknown_opcode_is_rejected() {
        let text = EXAMPLE.replace("[1,[1,1,[2,[1,2]],\"mul\"]]", "[1,[99,1,[2,[1,2]],\"mul\"]]");
        assert_eq!(from_text(&text).unwrap_err(), FormatError::UnknownOpCode(99));
    }

    #[test]
    fn test_n_result_mismatch_is_rejected() {
        let text = EXAMPLE.replace("[1,1,[2,[1,2]],\"mul\"]", "[1,0,[2,[1,2]],\"mul\"]");
        let err = from_text(&text).unwrap_err();
        assert!(matches!(err, FormatError::OpResultMismatch { .. }));
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        let text = format!("{} x", EXAMPLE);
        assert_eq!(from_text(&text).unwrap_err(), FormatError::TrailingInput);
    }
}
