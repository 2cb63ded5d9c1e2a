#![forbid(unsafe_code)]
//! eodflow-planner: everything that happens before the first record is
//! dispatched.
//!
//! - `plan`: the ordered stage chain as data (`StagePlan`).
//! - `dsl::yaml`: YAML → `StagePlan` + config overrides.
//! - `index` / `reconcile`: header validation, identity index, and output-row
//!   synthesis. This runs single-threaded so that every record's output slot
//!   exists and is uniquely owned before any worker touches it.

pub mod dsl;
pub mod error;
pub mod index;
pub mod plan;
pub mod reconcile;

pub use dsl::yaml::{parse_yaml_pipeline, ParsedPipeline, PipelineConfig};
pub use error::{PlanError, ReconcileError, TableKind};
pub use index::IdentityIndex;
pub use plan::{StagePlan, StageSpec};
pub use reconcile::{reconcile, Reconciled};
