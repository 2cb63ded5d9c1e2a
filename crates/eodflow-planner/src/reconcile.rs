//! Align input rows with the output template by identity key.
//!
//! Steps (single-threaded, before any dispatch):
//! 1. reject empty tables;
//! 2. validate both headers and every body row's width;
//! 3. index template rows by `id`;
//! 4. append a synthesized output row for each input identity the template
//!    lacks, in input order, and register it.
//!
//! Afterwards every input identity maps to exactly one output slot, which is
//! what lets the engine write rows back without locking.

use eodflow_core::id::SlotId;
use eodflow_core::schema::{
    self, InputColumn, OutputColumn, INPUT_WIDTH, OUTPUT_WIDTH,
};
use eodflow_core::table::{Row, Table};

use crate::error::{ReconcileError, TableKind};
use crate::index::IdentityIndex;

/// Result of reconciliation: everything the engine needs to dispatch.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub index: IdentityIndex,
    pub input: Table,
    /// Template rows in their original order, then synthesized rows.
    pub output: Table,
    /// Number of rows appended for identities absent from the template.
    pub synthesized: usize,
}

impl Reconciled {
    /// Output slot for an input row. Always `Some` for rows of `self.input`.
    pub fn slot_for(&self, input_row: &[String]) -> Option<SlotId> {
        input_row
            .get(InputColumn::Id.index())
            .and_then(|id| self.index.get(id))
    }
}

pub fn reconcile(input: Vec<Row>, template: Vec<Row>) -> Result<Reconciled, ReconcileError> {
    let input = Table::from_raw(input).ok_or(ReconcileError::EmptyInput)?;
    let mut output = Table::from_raw(template).ok_or(ReconcileError::EmptyTemplate)?;

    schema::validate_input_header(&input.header).map_err(|source| ReconcileError::Header {
        table: TableKind::Input,
        source,
    })?;
    schema::validate_output_header(&output.header).map_err(|source| ReconcileError::Header {
        table: TableKind::Output,
        source,
    })?;

    check_widths(TableKind::Input, &input.rows, INPUT_WIDTH)?;
    check_widths(TableKind::Output, &output.rows, OUTPUT_WIDTH)?;

    let mut index = IdentityIndex::with_capacity(input.num_rows().max(output.num_rows()));
    for (i, row) in output.rows.iter().enumerate() {
        let id = &row[OutputColumn::Id.index()];
        if !index.insert(id, SlotId::new(i)) {
            return Err(ReconcileError::DuplicateIdentity {
                table: TableKind::Output,
                id: id.clone(),
                row: i + 2,
            });
        }
    }

    let template_len = output.num_rows();
    let mut seen = IdentityIndex::with_capacity(input.num_rows());
    for (i, row) in input.rows.iter().enumerate() {
        let id = &row[InputColumn::Id.index()];
        if !seen.insert(id, SlotId::new(i)) {
            return Err(ReconcileError::DuplicateIdentity {
                table: TableKind::Input,
                id: id.clone(),
                row: i + 2,
            });
        }
        if index.contains(id) {
            continue;
        }
        let slot = SlotId::new(output.num_rows());
        output.rows.push(synthesize(row));
        index.insert(id, slot);
    }
    let synthesized = output.num_rows() - template_len;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        input_rows = input.num_rows(),
        template_rows = template_len,
        synthesized,
        "reconciled output table"
    );

    Ok(Reconciled {
        index,
        input,
        output,
        synthesized,
    })
}

/// Output row for an identity the template does not know yet. Fields present
/// in the input are copied; computed and audit columns stay blank.
fn synthesize(input: &[String]) -> Row {
    let mut row = vec![String::new(); OUTPUT_WIDTH];
    let copies = [
        (InputColumn::Id, OutputColumn::Id),
        (InputColumn::Name, OutputColumn::Name),
        (InputColumn::Age, OutputColumn::Age),
        (InputColumn::Balance, OutputColumn::Balance),
        (InputColumn::PreviousBalance, OutputColumn::PreviousBalance),
        (InputColumn::FreeTransfer, OutputColumn::FreeTransfer),
    ];
    for (from, to) in copies {
        row[to.index()] = input[from.index()].clone();
    }
    row
}

fn check_widths(table: TableKind, rows: &[Row], expected: usize) -> Result<(), ReconcileError> {
    for (i, row) in rows.iter().enumerate() {
        if row.len() != expected {
            return Err(ReconcileError::RowWidth {
                table,
                row: i + 2,
                expected,
                found: row.len(),
            });
        }
    }
    Ok(())
}
