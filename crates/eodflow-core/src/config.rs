//! Engine configuration that downstream crates can serialize/deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker count for stages that do not pin their own parallelism.
    /// `None` means "host parallelism, floored at `min_parallelism`".
    pub parallelism: Option<usize>,

    /// Lower bound applied to host-derived parallelism so low-core hosts still
    /// run stages concurrently.
    pub min_parallelism: usize,

    /// Queue capacity per pool is `queue_factor * workers`.
    pub queue_factor: usize,

    /// Hard deadline for one batch. `None` waits forever.
    pub deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: None,
            min_parallelism: 4,
            queue_factor: 3,
            deadline_ms: Some(10 * 60 * 1000),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EODFLOW_PARALLELISM`: fixed worker count per stage
    /// - `EODFLOW_MIN_PARALLELISM`: floor for host-derived worker counts
    /// - `EODFLOW_QUEUE_FACTOR`: queue capacity multiplier
    /// - `EODFLOW_DEADLINE_MS`: batch deadline in ms (`0` disables)
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("EODFLOW_PARALLELISM") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.parallelism = Some(v);
            }
        }

        if let Ok(s) = std::env::var("EODFLOW_MIN_PARALLELISM") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.min_parallelism = v;
            }
        }

        if let Ok(s) = std::env::var("EODFLOW_QUEUE_FACTOR") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.queue_factor = v;
            }
        }

        if let Ok(s) = std::env::var("EODFLOW_DEADLINE_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.deadline_ms = if v == 0 { None } else { Some(v) };
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallelism == Some(0) {
            return Err(Error::Config("parallelism must be at least 1".into()));
        }
        if self.queue_factor == 0 {
            return Err(Error::Config("queue_factor must be at least 1".into()));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Resolve the worker count for a stage. An explicit per-stage value wins,
    /// then the engine-wide setting, then host parallelism with the floor.
    pub fn workers_for(&self, pinned: Option<usize>) -> usize {
        pinned
            .or(self.parallelism)
            .unwrap_or_else(|| optimum_parallelism(self.min_parallelism))
            .max(1)
    }
}

/// Host parallelism, never below `floor`.
pub fn optimum_parallelism(floor: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_parallelism_wins() {
        let cfg = EngineConfig {
            parallelism: Some(2),
            ..Default::default()
        };
        assert_eq!(cfg.workers_for(Some(8)), 8);
        assert_eq!(cfg.workers_for(None), 2);
    }

    #[test]
    fn host_parallelism_respects_floor() {
        let cfg = EngineConfig {
            min_parallelism: 64,
            ..Default::default()
        };
        assert!(cfg.workers_for(None) >= 64);
    }

    #[test]
    fn zero_values_are_rejected() {
        let cfg = EngineConfig {
            parallelism: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = EngineConfig {
            queue_factor: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn default_has_deadline() {
        assert_eq!(
            EngineConfig::default().deadline(),
            Some(Duration::from_secs(600))
        );
    }
}
