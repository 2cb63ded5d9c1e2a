//! Average of previous and current balance (stage 1).

use eodflow_core::id::WorkerId;
use eodflow_core::record::{AuditSlot, Record};

use crate::traits::{Stage, StageError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Average;

impl Stage for Average {
    fn name(&self) -> &'static str {
        "average"
    }

    fn transform(&self, worker: WorkerId, record: &mut Record) -> Result<(), StageError> {
        let sum = record
            .previous_balance
            .checked_add(record.balance)
            .ok_or(StageError::Overflow("average"))?;
        // Integer division truncates toward zero.
        record.average_balance = sum / 2;
        record.mark(AuditSlot::Stage1, worker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eodflow_core::id::SlotId;

    fn record(balance: i64, previous: i64) -> Record {
        let mut r = Record::new(0, vec!["1".into()], SlotId::new(0), vec![]);
        r.balance = balance;
        r.previous_balance = previous;
        r
    }

    #[test]
    fn averages_with_integer_division() {
        let mut r = record(99, 200);
        Average.transform(WorkerId::new(4), &mut r).unwrap();
        assert_eq!(r.average_balance, 149);
        assert_eq!(r.marker(AuditSlot::Stage1), Some(WorkerId::new(4)));
        // balance itself is not changed
        assert_eq!(r.balance, 99);
    }

    #[test]
    fn negative_sums_truncate_toward_zero() {
        let mut r = record(-3, 0);
        Average.transform(WorkerId::new(1), &mut r).unwrap();
        assert_eq!(r.average_balance, -1);
    }

    #[test]
    fn overflow_is_a_record_error() {
        let mut r = record(i64::MAX, 1);
        assert!(matches!(
            Average.transform(WorkerId::new(1), &mut r),
            Err(StageError::Overflow("average"))
        ));
        assert_eq!(r.marker(AuditSlot::Stage1), None);
    }
}
