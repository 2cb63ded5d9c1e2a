#![forbid(unsafe_code)]
//! eodflow-core: shared types for the end-of-day batch engine.
//!
//! - `schema`: fixed input/output table layouts and header validation.
//! - `record`: the per-row work item that travels through the stage chain.
//! - `config`: engine configuration (env + serde).
//! - `manifest`/`hash`: run provenance.
//!
//! No threads and no file IO live here.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod table;

/// Crate version, stamped into run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
