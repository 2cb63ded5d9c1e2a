#![forbid(unsafe_code)]
//! eodflow-io: read and write the EOD tables.
//!
//! Both tables are semicolon-separated text with a header row. Readers return
//! raw rows (header first) and leave validation to the reconciler. Writers
//! replace the target file atomically so a failed run never leaves a
//! half-written table behind.

pub mod error;
pub mod readers;
pub mod writers;

pub use error::{Error, Result};
pub use readers::csv::{read_table, read_template, CsvReader};
pub use writers::csv::{write_table, CsvWriter};

/// Field delimiter used by both tables.
pub const DELIMITER: u8 = b';';
