//! Stage trait + common error type.
//!
//! The exec runtime wraps each stage in a worker pool and calls `transform`
//! once per record. On `Err` the record skips the rest of the chain and goes
//! straight to the terminal sink with the error text.

use std::num::ParseIntError;

use eodflow_core::prelude::{Record, WorkerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("invalid integer \"{value}\" in column \"{column}\": {source}")]
    Field {
        column: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Trait that all stages must implement.
///
/// Invariants:
/// - `transform` reads and writes only `record`; no cross-record state.
/// - A stage that claims an audit column marks it with `worker` when (and only
///   when) its rule fires.
pub trait Stage: Send + Sync + 'static {
    /// Human-readable stage name (stable; used in logs and error records).
    fn name(&self) -> &'static str;

    fn transform(&self, worker: WorkerId, record: &mut Record) -> Result<(), StageError>;
}
