//! Parse the numeric input columns into the record's working fields.
//!
//! Columns are parsed in a fixed order: balance, previous balance, free
//! transfer, average balance. The first failure rejects the record and
//! leaves its working fields untouched.

use eodflow_core::id::WorkerId;
use eodflow_core::record::Record;
use eodflow_core::schema::InputColumn;

use crate::traits::{Stage, StageError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Parse;

impl Stage for Parse {
    fn name(&self) -> &'static str {
        "parse"
    }

    fn transform(&self, _worker: WorkerId, record: &mut Record) -> Result<(), StageError> {
        let balance = field(record, InputColumn::Balance)?;
        let previous_balance = field(record, InputColumn::PreviousBalance)?;
        let free_transfer = field(record, InputColumn::FreeTransfer)?;
        let average_balance = field(record, InputColumn::AverageBalance)?;

        record.balance = balance;
        record.previous_balance = previous_balance;
        record.free_transfer = free_transfer;
        record.average_balance = average_balance;
        Ok(())
    }
}

fn field(record: &Record, col: InputColumn) -> Result<i64, StageError> {
    let raw = record.input_field(col);
    raw.parse::<i64>().map_err(|source| StageError::Field {
        column: col.header(),
        value: raw.to_string(),
        source,
    })
}
