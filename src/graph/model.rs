//! model.rs
//! The central graph artifact: a write-once, columnar record of a scalar
//! function as numbered value nodes plus an ordered operator tape.
//!
//! Node numbering is global, monotonic and 1-based; 0 is the "no node"
//! sentinel:
//!
//! ```text
//! 1 .. n_dynamic                              dynamic-parameter nodes
//! n_dynamic+1 .. n_dynamic+n_independent      independent-variable nodes
//! .. + n_constant                             constant nodes (first-occurrence order)
//! thereafter                                  one node per value-producing operator
//! ```
//!
//! The model is a plain, invariant-agnostic container: it is built once by
//! either the textual reader or the importer (which own all validation),
//! then treated as immutable by every exporter.

use super::op::OpCode;
use serde::{Deserialize, Serialize};

/// One entry in the operator tape. Arguments live in the graph's single
/// flat `operator_arg` sequence; the record only stores a range into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Op {
    pub code: OpCode,
    arg_start: u32,
    n_arg: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    function_name: String,
    n_dynamic: usize,
    n_independent: usize,
    string_vec: Vec<String>,
    constant_vec: Vec<f64>,
    discrete_name_vec: Vec<String>,
    operator_vec: Vec<Op>,
    // Flat argument storage (CSR-style), shared by all operator records.
    operator_arg: Vec<usize>,
    dependent_vec: Vec<usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every sequence to empty. Callers must reset before reuse so
    /// no stale state survives a failed build.
    pub fn initialize(&mut self) {
        *self = Self::default();
    }

    // --- Append-only mutators ---

    pub fn set_function_name(&mut self, name: impl Into<String>) {
        self.function_name = name.into();
    }

    pub fn set_n_dynamic(&mut self, n: usize) {
        self.n_dynamic = n;
    }

    pub fn set_n_independent(&mut self, n: usize) {
        self.n_independent = n;
    }

    pub fn push_string(&mut self, s: impl Into<String>) {
        self.string_vec.push(s.into());
    }

    pub fn push_constant(&mut self, c: f64) {
        self.constant_vec.push(c);
    }

    /// Appends a discrete-function name and returns its new index.
    pub fn push_discrete_name(&mut self, name: impl Into<String>) -> usize {
        self.discrete_name_vec.push(name.into());
        self.discrete_name_vec.len() - 1
    }

    /// Appends an operator record, copying its arguments into the flat
    /// argument sequence.
    pub fn push_operator(&mut self, code: OpCode, args: &[usize]) {
        let arg_start = self.operator_arg.len() as u32;
        self.operator_arg.extend_from_slice(args);
        self.operator_vec.push(Op {
            code,
            arg_start,
            n_arg: args.len() as u32,
        });
    }

    pub fn push_dependent(&mut self, node: usize) {
        self.dependent_vec.push(node);
    }

    // --- Getters ---

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn n_dynamic(&self) -> usize {
        self.n_dynamic
    }

    pub fn n_independent(&self) -> usize {
        self.n_independent
    }

    pub fn string_vec(&self) -> &[String] {
        &self.string_vec
    }

    pub fn constant_vec(&self) -> &[f64] {
        &self.constant_vec
    }

    pub fn n_constant(&self) -> usize {
        self.constant_vec.len()
    }

    pub fn discrete_name_vec(&self) -> &[String] {
        &self.discrete_name_vec
    }

    /// Index of `name` in the discrete-name table; first exact match wins.
    pub fn discrete_name_index(&self, name: &str) -> Option<usize> {
        self.discrete_name_vec.iter().position(|n| n == name)
    }

    pub fn n_operator(&self) -> usize {
        self.operator_vec.len()
    }

    #[inline(always)]
    pub fn operator(&self, i: usize) -> (OpCode, &[usize]) {
        let op = self.operator_vec[i];
        let start = op.arg_start as usize;
        (op.code, &self.operator_arg[start..start + op.n_arg as usize])
    }

    pub fn dependent_vec(&self) -> &[usize] {
        &self.dependent_vec
    }

    // --- Node-range helpers ---

    /// Node index of the first constant (1-based numbering).
    pub fn start_constant(&self) -> usize {
        1 + self.n_dynamic + self.n_independent
    }

    /// Node index of the first operator result.
    pub fn start_operator(&self) -> usize {
        self.start_constant() + self.constant_vec.len()
    }

    /// Total number of value-producing nodes (inputs, constants and
    /// operator results; comparison records contribute nothing).
    pub fn n_node(&self) -> usize {
        let op_results: usize = self
            .operator_vec
            .iter()
            .map(|op| op.code.n_result())
            .sum();
        self.n_dynamic + self.n_independent + self.constant_vec.len() + op_results
    }
}
