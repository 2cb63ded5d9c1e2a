//! Minimal string table: one header row plus body rows.
//!
//! Files are read as raw rows (first row = header); the engine splits them into
//! a `Table` once and hands the raw form back at the end.

use serde::{Deserialize, Serialize};

pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: Row,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(header: Row, rows: Vec<Row>) -> Self {
        Self { header, rows }
    }

    /// Split raw rows into header + body. Returns `None` for an empty input.
    pub fn from_raw(mut raw: Vec<Row>) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let rows = raw.split_off(1);
        let header = raw.pop()?;
        Some(Self { header, rows })
    }

    /// Raw form: header first, then body rows in order.
    pub fn into_raw(self) -> Vec<Row> {
        let mut raw = Vec::with_capacity(self.rows.len() + 1);
        raw.push(self.header);
        raw.extend(self.rows);
        raw
    }

    /// Number of body rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
