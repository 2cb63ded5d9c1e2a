//! Run manifest for audit.
//!
//! The engine emits a manifest after a successful batch; the CLI can persist it
//! as JSON next to the output table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Records dispatched (one per input body row).
    pub records: usize,
    /// Records finalized with an error written into an audit column.
    pub failed: usize,
    /// Output rows synthesized for identities missing from the template.
    pub synthesized: usize,
    /// Output body rows after reconciliation.
    pub output_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the stage chain used.
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub inputs_digest: Option<Hash256>,
    pub outputs_digest: Option<Hash256>,

    pub stats: RunStats,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            inputs_digest: None,
            outputs_digest: None,
            stats: RunStats::default(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn with_inputs(mut self, digest: Hash256) -> Self {
        self.inputs_digest = Some(digest);
        self
    }

    pub fn finish(mut self, finished_ms: u64, stats: RunStats, outputs_digest: Option<Hash256>) -> Self {
        self.finished_ms = finished_ms;
        self.stats = stats;
        self.outputs_digest = outputs_digest;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}
