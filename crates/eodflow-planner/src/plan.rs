//! The stage chain as data.
//!
//! A `StagePlan` is an ordered list of stage descriptors. The exec crate turns
//! each `op` key into a concrete stage through the operator registry and wires
//! them into a strictly linear chain. There is no branching: a record leaves
//! stage `k` either into stage `k + 1` or into the terminal sink.

use eodflow_core::hash::{hash_serde, Hash256};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Bonus distribution runs on a fixed-size pool regardless of host size.
pub const BONUS_PARALLELISM: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Operator registry key (e.g. "parse", "average").
    pub op: String,
    /// Pinned worker count; `None` defers to `EngineConfig`.
    #[serde(default)]
    pub parallelism: Option<usize>,
}

impl StageSpec {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            parallelism: None,
        }
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = Some(n);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub stages: Vec<StageSpec>,
    /// Worker count for the terminal sink pool.
    #[serde(default)]
    pub sink_parallelism: Option<usize>,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}

impl StagePlan {
    /// parse → average → benefit → bonus.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                StageSpec::new("parse"),
                StageSpec::new("average"),
                StageSpec::new("benefit"),
                StageSpec::new("bonus").with_parallelism(BONUS_PARALLELISM),
            ],
            sink_parallelism: None,
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let first = self.stages.first().ok_or(PlanError::Empty)?;
        if first.op != "parse" {
            return Err(PlanError::ParseNotFirst(first.op.clone()));
        }
        if self.stages.iter().skip(1).any(|s| s.op == "parse") {
            return Err(PlanError::DuplicateParse);
        }
        if let Some(s) = self.stages.iter().find(|s| s.parallelism == Some(0)) {
            return Err(PlanError::ZeroParallelism { op: s.op.clone() });
        }
        if self.sink_parallelism == Some(0) {
            return Err(PlanError::ZeroParallelism { op: "sink".into() });
        }
        Ok(())
    }

    /// Stable digest for manifests.
    pub fn hash(&self) -> Result<Hash256, PlanError> {
        hash_serde(self).map_err(|e| PlanError::Hash(e.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.op.as_str())
    }
}
