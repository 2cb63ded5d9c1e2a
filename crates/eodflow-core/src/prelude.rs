//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{SlotId, WorkerId};
pub use crate::manifest::{ManifestId, RunManifest, RunStats};
pub use crate::record::{AuditSlot, Record, RecordError};
pub use crate::schema::{InputColumn, OutputColumn};
pub use crate::table::{Row, Table};
