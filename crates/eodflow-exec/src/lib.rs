#![forbid(unsafe_code)]
//! eodflow-exec: worker pools, the linear stage chain, the terminal sink, and
//! the batch orchestrator.
//!
//! One bounded pool per stage plus one for the sink. Records move between
//! pools by value; output rows come back through a write-once slot arena, so
//! no lock guards the output table.

pub mod chain;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod runtime;
pub mod sink;

pub use error::ExecError;
pub use pool::CancelToken;
pub use runtime::{write_manifest, Engine, RunOutput};
