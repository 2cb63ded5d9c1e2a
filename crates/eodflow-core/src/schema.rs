//! Fixed table layouts for the EOD input and output files.
//!
//! Column positions are addressed through the `InputColumn`/`OutputColumn`
//! enums rather than bare indices; header text must match exactly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Columns of the input ("before EOD") table, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputColumn {
    Id,
    Name,
    Age,
    Balance,
    PreviousBalance,
    AverageBalance,
    FreeTransfer,
}

impl InputColumn {
    pub const ALL: [InputColumn; 7] = [
        InputColumn::Id,
        InputColumn::Name,
        InputColumn::Age,
        InputColumn::Balance,
        InputColumn::PreviousBalance,
        InputColumn::AverageBalance,
        InputColumn::FreeTransfer,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn header(self) -> &'static str {
        match self {
            InputColumn::Id => "id",
            InputColumn::Name => "Nama",
            InputColumn::Age => "Age",
            InputColumn::Balance => "Balanced",
            InputColumn::PreviousBalance => "Previous Balanced",
            InputColumn::AverageBalance => "Average Balanced",
            InputColumn::FreeTransfer => "Free Transfer",
        }
    }
}

/// Columns of the output ("after EOD") table, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputColumn {
    Id,
    Name,
    Age,
    Balance,
    Stage2bWorker,
    Stage3Worker,
    PreviousBalance,
    AverageBalance,
    Stage1Worker,
    FreeTransfer,
    Stage2aWorker,
}

impl OutputColumn {
    pub const ALL: [OutputColumn; 11] = [
        OutputColumn::Id,
        OutputColumn::Name,
        OutputColumn::Age,
        OutputColumn::Balance,
        OutputColumn::Stage2bWorker,
        OutputColumn::Stage3Worker,
        OutputColumn::PreviousBalance,
        OutputColumn::AverageBalance,
        OutputColumn::Stage1Worker,
        OutputColumn::FreeTransfer,
        OutputColumn::Stage2aWorker,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn header(self) -> &'static str {
        match self {
            OutputColumn::Id => "id",
            OutputColumn::Name => "Nama",
            OutputColumn::Age => "Age",
            OutputColumn::Balance => "Balanced",
            OutputColumn::Stage2bWorker => "No 2b Thread-No",
            OutputColumn::Stage3Worker => "No 3 Thread-No",
            OutputColumn::PreviousBalance => "Previous Balanced",
            OutputColumn::AverageBalance => "Average Balanced",
            OutputColumn::Stage1Worker => "No 1 Thread-No",
            OutputColumn::FreeTransfer => "Free Transfer",
            OutputColumn::Stage2aWorker => "No 2a Thread-No",
        }
    }
}

pub const INPUT_WIDTH: usize = InputColumn::ALL.len();
pub const OUTPUT_WIDTH: usize = OutputColumn::ALL.len();

/// Input header row as owned strings.
pub fn input_header() -> Vec<String> {
    InputColumn::ALL.iter().map(|c| c.header().to_string()).collect()
}

/// Output header row as owned strings.
pub fn output_header() -> Vec<String> {
    OutputColumn::ALL.iter().map(|c| c.header().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("expected column \"{expected}\" at index {index}, found \"{found}\"")]
    ColumnName {
        index: usize,
        expected: &'static str,
        found: String,
    },
}

/// Check `columns` against an expected header: same count, same names, same order.
pub fn validate_header(expected: &[&'static str], columns: &[String]) -> Result<(), HeaderError> {
    if columns.len() != expected.len() {
        return Err(HeaderError::ColumnCount {
            expected: expected.len(),
            found: columns.len(),
        });
    }
    for (index, (want, got)) in expected.iter().zip(columns).enumerate() {
        if got != want {
            return Err(HeaderError::ColumnName {
                index,
                expected: want,
                found: got.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_input_header(columns: &[String]) -> Result<(), HeaderError> {
    let expected: Vec<&'static str> = InputColumn::ALL.iter().map(|c| c.header()).collect();
    validate_header(&expected, columns)
}

pub fn validate_output_header(columns: &[String]) -> Result<(), HeaderError> {
    let expected: Vec<&'static str> = OutputColumn::ALL.iter().map(|c| c.header()).collect();
    validate_header(&expected, columns)
}
