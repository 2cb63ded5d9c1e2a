//! Bonus for the first `cutoff` rows of the input (stage 3).

use eodflow_core::id::WorkerId;
use eodflow_core::record::{AuditSlot, Record};

use crate::traits::{Stage, StageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bonus {
    /// Records whose dispatch index is below this get the bonus.
    pub cutoff: usize,
    pub amount: i64,
}

impl Default for Bonus {
    fn default() -> Self {
        Self {
            cutoff: 100,
            amount: 10,
        }
    }
}

impl Stage for Bonus {
    fn name(&self) -> &'static str {
        "bonus"
    }

    fn transform(&self, worker: WorkerId, record: &mut Record) -> Result<(), StageError> {
        if record.index < self.cutoff {
            record.balance = record
                .balance
                .checked_add(self.amount)
                .ok_or(StageError::Overflow("bonus"))?;
            record.mark(AuditSlot::Stage3, worker);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eodflow_core::id::SlotId;

    fn record(index: usize, balance: i64) -> Record {
        let mut r = Record::new(index, vec!["1".into()], SlotId::new(0), vec![]);
        r.balance = balance;
        r
    }

    #[test]
    fn first_hundred_get_bonus() {
        let mut r = record(99, 200);
        Bonus::default().transform(WorkerId::new(1), &mut r).unwrap();
        assert_eq!(r.balance, 210);
        assert_eq!(r.marker(AuditSlot::Stage3), Some(WorkerId::new(1)));
    }

    #[test]
    fn index_hundred_is_outside() {
        let mut r = record(100, 200);
        Bonus::default().transform(WorkerId::new(1), &mut r).unwrap();
        assert_eq!(r.balance, 200);
        assert_eq!(r.marker(AuditSlot::Stage3), None);
    }

    #[test]
    fn custom_cutoff() {
        let bonus = Bonus {
            cutoff: 1,
            amount: 3,
        };
        let mut r = record(0, 0);
        bonus.transform(WorkerId::new(1), &mut r).unwrap();
        assert_eq!(r.balance, 3);
    }
}
