//! Semicolon-delimited writer.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use eodflow_core::table::Row;

use crate::error::{Error, Result};
use crate::DELIMITER;

pub struct CsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        let inner = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(writer);
        Self { inner }
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.inner.write_record(row)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

/// Write `rows` to `path`, replacing any existing file only once the whole
/// table has been written and synced.
pub fn write_table(path: &Path, rows: &[Row]) -> Result<()> {
    let tmp = temp_path(path);
    let persist = |source| Error::Persist {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(&tmp).map_err(persist)?;
    let mut writer = CsvWriter::to_writer(file);
    let written = writer
        .write_rows(rows)
        .and_then(|_| writer.into_inner())
        .and_then(|f| f.sync_all().map_err(Error::Io));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        persist(e)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::csv::read_table;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn writes_semicolons_and_quotes_when_needed() {
        let mut w = CsvWriter::to_writer(Vec::new());
        w.write_rows(&[row(&["id", "Nama"]), row(&["1", "a;b"])])
            .unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "id;Nama\n1;\"a;b\"\n");
    }

    #[test]
    fn write_table_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("After Eod.csv");
        fs::write(&path, "old").unwrap();

        let rows = vec![row(&["id", "x"]), row(&["1", "2"])];
        write_table(&path, &rows).unwrap();

        assert_eq!(read_table(&path).unwrap(), rows);
        assert!(!dir.path().join("After Eod.csv.tmp").exists());
    }

    #[test]
    fn unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");
        let err = write_table(&path, &[row(&["a"])]).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
    }
}
