//! Terminal sink: the last stop for every record.
//!
//! The sink renders a record's numbers (or its error text) into the output
//! row the record carried, parks the row in a write-once slot of the
//! `SlotArena`, and ticks the `Completion` counter down. It is the only
//! place that can complete a record, and it does so exactly once because it
//! consumes the record.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::{bounded, select, Receiver, Sender};

use eodflow_core::prelude::{AuditSlot, OutputColumn, Record, Row, SlotId};

use crate::pool::{CancelToken, Deadline};

/// Write-once output cells, one per output body row.
pub struct SlotArena {
    cells: Vec<OnceLock<Row>>,
}

impl SlotArena {
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store `row` in `slot`. Hands the row back if the slot is out of range
    /// or already written.
    pub fn store(&self, slot: SlotId, row: Row) -> Result<(), Row> {
        match self.cells.get(slot.get()) {
            Some(cell) => cell.set(row),
            None => Err(row),
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&Row> {
        self.cells.get(slot.get()).and_then(OnceLock::get)
    }

    /// Cells in slot order; `None` for slots nobody wrote.
    pub fn into_rows(self) -> impl Iterator<Item = Option<Row>> {
        self.cells.into_iter().map(OnceLock::into_inner)
    }
}

/// Outcome of waiting for the batch to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Done,
    Cancelled { pending: usize },
    DeadlineExceeded { pending: usize },
}

/// Count of records not yet finalized. Reaching zero fires a one-shot
/// channel the orchestrator selects on together with cancellation and the
/// deadline.
pub struct Completion {
    pending: AtomicUsize,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Completion {
    pub fn new(pending: usize) -> Self {
        let (done_tx, done_rx) = bounded(1);
        if pending == 0 {
            let _ = done_tx.try_send(());
        }
        Self {
            pending: AtomicUsize::new(pending),
            done_tx,
            done_rx,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Mark one record finished. Returns `false` if the count was already
    /// zero, which means some record completed twice.
    pub fn done_one(&self) -> bool {
        let prev = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => {
                let _ = self.done_tx.try_send(());
                true
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }

    pub fn wait(&self, cancel: &CancelToken, deadline: Deadline) -> WaitOutcome {
        if self.pending() == 0 {
            return WaitOutcome::Done;
        }
        let deadline_rx = deadline.receiver();
        select! {
            recv(self.done_rx) -> _ => WaitOutcome::Done,
            recv(cancel.receiver()) -> _ => WaitOutcome::Cancelled { pending: self.pending() },
            recv(deadline_rx) -> _ => WaitOutcome::DeadlineExceeded { pending: self.pending() },
        }
    }
}

pub struct TerminalSink {
    arena: Arc<SlotArena>,
    completion: Arc<Completion>,
    failed: AtomicUsize,
    rejected: AtomicUsize,
}

impl TerminalSink {
    pub fn new(arena: Arc<SlotArena>, completion: Arc<Completion>) -> Self {
        Self {
            arena,
            completion,
            failed: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        }
    }

    pub fn finalize(&self, record: Record) {
        if record.is_failed() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let (slot, row) = render(record);
        if self.arena.store(slot, row).is_err() {
            #[cfg(feature = "tracing")]
            tracing::error!(%slot, "output slot written twice or out of range");
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        if !self.completion.done_one() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records finalized with an error.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Finalizations that broke the one-record-one-slot rule.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Render the final output row of `record`.
///
/// Success writes the working fields and all four audit markers (`0` for a
/// stage that did not fire). Failure writes only the error text, into the
/// first audit column still unmarked, or the stage-3 column when all four
/// are marked.
pub fn render(record: Record) -> (SlotId, Row) {
    let mut cells: Vec<(OutputColumn, String)> = Vec::with_capacity(7);
    match record.error() {
        Some(err) => {
            let slot = record.first_unmarked().unwrap_or(AuditSlot::Stage3);
            cells.push((slot.column(), err.to_string()));
        }
        None => {
            cells.push((OutputColumn::Balance, record.balance.to_string()));
            cells.push((
                OutputColumn::AverageBalance,
                record.average_balance.to_string(),
            ));
            cells.push((OutputColumn::FreeTransfer, record.free_transfer.to_string()));
            for slot in AuditSlot::ALL {
                let marker = record.marker(slot).map_or(0, |w| w.get());
                cells.push((slot.column(), marker.to_string()));
            }
        }
    }

    let (slot, mut row) = record.into_output();
    for (col, value) in cells {
        if let Some(cell) = row.get_mut(col.index()) {
            *cell = value;
        }
    }
    (slot, row)
}
