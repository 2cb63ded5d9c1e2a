//! The per-row work item that travels through the stage chain.
//!
//! A `Record` is created once per input row at dispatch time and is owned by
//! exactly one stage at a time; forwarding moves it into the next queue. It
//! owns the output row for its slot while in flight and carries no handle to
//! the completion tracker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{SlotId, WorkerId};
use crate::schema::{InputColumn, OutputColumn};
use crate::table::Row;

/// Audit columns in stage order. The order decides which column receives
/// the error text of a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditSlot {
    Stage1,
    Stage2a,
    Stage2b,
    Stage3,
}

impl AuditSlot {
    pub const ALL: [AuditSlot; 4] = [
        AuditSlot::Stage1,
        AuditSlot::Stage2a,
        AuditSlot::Stage2b,
        AuditSlot::Stage3,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Output column that stores this marker.
    pub const fn column(self) -> OutputColumn {
        match self {
            AuditSlot::Stage1 => OutputColumn::Stage1Worker,
            AuditSlot::Stage2a => OutputColumn::Stage2aWorker,
            AuditSlot::Stage2b => OutputColumn::Stage2bWorker,
            AuditSlot::Stage3 => OutputColumn::Stage3Worker,
        }
    }
}

/// Per-record failure, surfaced as data in the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Name of the stage that rejected the record.
    pub stage: String,
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 0-based position among the input body rows.
    pub index: usize,
    /// Identity key (`id` column).
    pub id: String,
    input: Row,
    slot: SlotId,
    output: Row,

    pub balance: i64,
    pub previous_balance: i64,
    pub average_balance: i64,
    pub free_transfer: i64,

    markers: [Option<WorkerId>; 4],
    error: Option<RecordError>,
}

impl Record {
    pub fn new(index: usize, input: Row, slot: SlotId, output: Row) -> Self {
        let id = input
            .get(InputColumn::Id.index())
            .cloned()
            .unwrap_or_default();
        Self {
            index,
            id,
            input,
            slot,
            output,
            balance: 0,
            previous_balance: 0,
            average_balance: 0,
            free_transfer: 0,
            markers: [None; 4],
            error: None,
        }
    }

    /// Raw input cell; missing cells read as empty.
    pub fn input_field(&self, col: InputColumn) -> &str {
        self.input
            .get(col.index())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn mark(&mut self, slot: AuditSlot, worker: WorkerId) {
        self.markers[slot.index()] = Some(worker);
    }

    pub fn marker(&self, slot: AuditSlot) -> Option<WorkerId> {
        self.markers[slot.index()]
    }

    /// First audit slot, in stage order, that no stage has marked yet.
    pub fn first_unmarked(&self) -> Option<AuditSlot> {
        AuditSlot::ALL
            .into_iter()
            .find(|slot| self.markers[slot.index()].is_none())
    }

    pub fn fail(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.error = Some(RecordError {
            stage: stage.into(),
            message: message.into(),
        });
    }

    pub fn error(&self) -> Option<&RecordError> {
        self.error.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Give up the record, returning its slot and output row.
    pub fn into_output(self) -> (SlotId, Row) {
        (self.slot, self.output)
    }
}
