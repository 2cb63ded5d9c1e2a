use std::fmt;

use eodflow_core::schema::HeaderError;
use thiserror::Error;

/// Which of the two tables a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Input,
    Output,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Input => f.write_str("input"),
            TableKind::Output => f.write_str("output"),
        }
    }
}

/// Batch-fatal validation errors. Raised before any worker starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("invalid input rows provided: table is empty")]
    EmptyInput,

    #[error("invalid output rows provided: table is empty")]
    EmptyTemplate,

    #[error("failed to validate {table} header: {source}")]
    Header {
        table: TableKind,
        #[source]
        source: HeaderError,
    },

    #[error("{table} row {row} has {found} columns, expected {expected}")]
    RowWidth {
        table: TableKind,
        /// 1-based line number including the header.
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("duplicate identity \"{id}\" in {table} row {row}")]
    DuplicateIdentity {
        table: TableKind,
        id: String,
        /// 1-based line number including the header.
        row: usize,
    },
}

/// Errors while building a stage plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("pipeline yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("stage plan is empty")]
    Empty,

    #[error("first stage must be 'parse', got '{0}'")]
    ParseNotFirst(String),

    #[error("stage 'parse' appears more than once")]
    DuplicateParse,

    #[error("stage '{op}' has parallelism 0")]
    ZeroParallelism { op: String },

    #[error("plan hashing: {0}")]
    Hash(String),
}
