//! CSV sink for tidy tables
//!
//! Missing aggregates are written as empty fields and times as `YYYY-MM-DD HH:MM:SS`.

use log::info;
use regiomean_core::tidy::TidyTable;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Error writing a table
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Could not create {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Write a table as CSV, header first
pub fn write_csv<W: Write>(table: &TidyTable, writer: W) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.columns())?;
    for record in table.records() {
        writer.write_record(record.iter().map(|(_, value)| value.to_string()))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write a table to a CSV file, replacing any existing file
pub fn write_csv_file(table: &TidyTable, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    info!("Saving CSV to: {}", path.display());
    let file = File::create(path).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv(table, file)
}
