#![forbid(unsafe_code)]
//! eodflow-operators: stage bodies for the EOD chain.
//!
//! Design intent:
//! - Stages are pure and synchronous; the exec crate owns the threads.
//! - A stage touches only the record it was handed, so it is safe to run on
//!   many records concurrently.
//! - New stages plug in through `Registry::register`.

pub mod registry;
pub mod traits;

pub mod average;
pub mod benefit;
pub mod bonus;
pub mod parse;

pub use registry::Registry;
pub use traits::{Stage, StageError};
