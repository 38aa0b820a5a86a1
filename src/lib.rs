//! adgraph_core: the intermediate-representation layer of an algorithmic
//! differentiation toolchain.
//!
//! The crate centers on one artifact, [`graph::Graph`]: a columnar record
//! of a scalar function as 1-based value nodes plus an ordered operator
//! tape. Around it sit three surfaces:
//!
//! - `text`: a length-prefixed textual interchange codec
//!   ([`text::from_text`], [`text::to_text`]),
//! - `import`: a two-pass translator from an external low-level
//!   instruction stream ([`import::from_stream`]),
//! - `export`: a C source generator ([`export::to_csrc`]) and the
//!   in-process reference evaluator ([`export::forward_zero`]) that
//!   defines the generated code's behavior, including compare-change
//!   drift detection.

pub mod export;
pub mod graph;
pub mod import;
pub mod text;

// Re-export the artifact itself at the crate root.
pub use graph::{Graph, OpCode};
