//! Exporters: generated C source plus the in-process reference evaluator
//! that defines the generated code's behavior.
pub mod csrc;
pub mod evaluate;

// Re-export key types for convenient access
pub use csrc::{to_csrc, DISCRETE_PREFIX, FORWARD_ZERO_PREFIX};
pub use evaluate::{forward_zero, DiscreteRegistry, EvalError};
