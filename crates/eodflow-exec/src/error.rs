use thiserror::Error;

use eodflow_planner::{PlanError, ReconcileError};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Config(#[from] eodflow_core::error::Error),

    #[error("operator registry: {0}")]
    Registry(String),

    #[error("failed to spawn worker for pool '{pool}': {source}")]
    Spawn {
        pool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("deadline exceeded after {waited_ms} ms with {pending} records still in flight")]
    DeadlineExceeded { pending: usize, waited_ms: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] eodflow_io::Error),

    #[error("manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}
