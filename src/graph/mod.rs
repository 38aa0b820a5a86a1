//! Defines the core data structures for the recorded-function graph.
pub mod model;
pub mod op;

// Re-export key types for convenient access
pub use model::{Graph, Op};
pub use op::OpCode;
