//! Low-level-IR importer: consumes one function of the external
//! instruction stream and recovers the high-level graph from it.
pub mod stream;
pub mod translate;

// Re-export key types for convenient access
pub use stream::{FloatBinOp, FunctionStream, Instr, InstrKind, Operand, Predicate, StreamBuilder, ValueId};
pub use translate::{from_stream, ImportError};
