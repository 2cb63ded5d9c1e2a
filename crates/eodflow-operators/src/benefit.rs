//! Balance-tier benefits (stage 2).
//!
//! - balance in `[lower, upper]`: free transfers set to `free_transfers`
//!   (marks stage 2a);
//! - balance above `upper`: balance raised by `boost` (marks stage 2b);
//! - otherwise nothing changes and neither column is marked.

use eodflow_core::id::WorkerId;
use eodflow_core::record::{AuditSlot, Record};

use crate::traits::{Stage, StageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Benefit {
    pub lower: i64,
    pub upper: i64,
    pub free_transfers: i64,
    pub boost: i64,
}

impl Default for Benefit {
    fn default() -> Self {
        Self {
            lower: 100,
            upper: 150,
            free_transfers: 5,
            boost: 25,
        }
    }
}

impl Stage for Benefit {
    fn name(&self) -> &'static str {
        "benefit"
    }

    fn transform(&self, worker: WorkerId, record: &mut Record) -> Result<(), StageError> {
        if (self.lower..=self.upper).contains(&record.balance) {
            record.free_transfer = self.free_transfers;
            record.mark(AuditSlot::Stage2a, worker);
        } else if record.balance > self.upper {
            record.balance = record
                .balance
                .checked_add(self.boost)
                .ok_or(StageError::Overflow("benefit"))?;
            record.mark(AuditSlot::Stage2b, worker);
        }
        Ok(())
    }
}
