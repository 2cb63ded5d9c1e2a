//! Minimal YAML → `StagePlan` parser for *linear* stage chains.
//!
//! Example:
//! ```yaml
//! config:
//!   deadline_ms: 60000
//!   min_parallelism: 4
//! stages:
//!   - op: parse
//!   - op: average
//!   - op: benefit
//!   - op: bonus
//!     parallelism: 8
//! sink:
//!   parallelism: 4
//! ```

use serde::{Deserialize, Serialize};

use eodflow_core::config::EngineConfig;

use crate::error::PlanError;
use crate::plan::{StagePlan, StageSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub config: Option<PipelineConfig>,
    pub stages: Vec<StageSpec>,
    #[serde(default)]
    pub sink: Option<SinkDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkDef {
    #[serde(default)]
    pub parallelism: Option<usize>,
}

/// Engine overrides carried by a pipeline file. Unset fields leave the
/// environment/default value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parallelism: Option<usize>,
    pub min_parallelism: Option<usize>,
    pub queue_factor: Option<usize>,
    /// `0` disables the deadline.
    pub deadline_ms: Option<u64>,
}

impl PipelineConfig {
    pub fn apply(&self, cfg: &mut EngineConfig) {
        if let Some(n) = self.parallelism {
            cfg.parallelism = Some(n);
        }
        if let Some(n) = self.min_parallelism {
            cfg.min_parallelism = n;
        }
        if let Some(n) = self.queue_factor {
            cfg.queue_factor = n;
        }
        if let Some(ms) = self.deadline_ms {
            cfg.deadline_ms = if ms == 0 { None } else { Some(ms) };
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    pub plan: StagePlan,
    pub config: PipelineConfig,
}

/// Parse and validate a YAML stage chain.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline, PlanError> {
    let doc: Pipeline = serde_yaml::from_str(yaml_src)?;
    let plan = StagePlan {
        stages: doc.stages,
        sink_parallelism: doc.sink.and_then(|s| s.parallelism),
    };
    plan.validate()?;
    Ok(ParsedPipeline {
        plan,
        config: doc.config.unwrap_or_default(),
    })
}
