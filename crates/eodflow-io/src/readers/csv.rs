//! Semicolon-delimited reader producing raw rows.
//!
//! Every record must have the same number of fields as the first one (the
//! reader is not flexible), so ragged files fail here rather than later.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use eodflow_core::schema::output_header;
use eodflow_core::table::Row;

use crate::error::{Error, Result};
use crate::DELIMITER;

pub struct CsvReader<R: Read> {
    inner: csv::Reader<R>,
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let inner = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(false)
            .from_reader(reader);
        Self { inner }
    }

    /// Read every record, header included, as owned strings.
    pub fn read_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for rec in self.inner.records() {
            let rec = rec?;
            rows.push(rec.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }
}

/// Read a whole table from `path`.
pub fn read_table(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    CsvReader::from_reader(file)
        .read_all()
        .map_err(|e| match e {
            Error::Csv(source) => Error::Read {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
}

/// Read the output template. A missing file is an empty template: just the
/// output header.
pub fn read_template(path: &Path) -> Result<Vec<Row>> {
    match read_table(path) {
        Err(Error::Open { source, .. }) if source.kind() == ErrorKind::NotFound => {
            Ok(vec![output_header()])
        }
        other => other,
    }
}
