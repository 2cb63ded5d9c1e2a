#![forbid(unsafe_code)]
//! eodflow: end-of-day balance batch.
//!
//! Facade over the workspace crates:
//! - `eodflow_core`: tables, records, config, manifests
//! - `eodflow_io`: semicolon-separated table files
//! - `eodflow_operators`: stage bodies and the registry
//! - `eodflow_planner`: stage plans, YAML, reconciliation
//! - `eodflow_exec`: pools, chain, sink, orchestrator

pub use eodflow_core;
pub use eodflow_exec;
pub use eodflow_io;
pub use eodflow_operators;
pub use eodflow_planner;

pub use eodflow_core::config::EngineConfig;
pub use eodflow_exec::{Engine, ExecError, RunOutput};
