use crate::error::{PacingError, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(TableFormat::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(TableFormat::Json),
            _ => Err(PacingError::InvalidConfig(format!(
                "Cannot infer table format from '{}'; expected a .csv or .json file",
                path.display()
            ))),
        }
    }
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_json<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

/// Loads a table, picking the format from the file extension.
pub fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv(path),
        TableFormat::Json => read_json(path),
    }
}

/// Writes the rows to a temporary file next to `path` and persists it over the
/// target. On any failure the temporary file is removed and the previous table
/// is left untouched.
pub fn replace_table<T: Serialize>(path: &Path, rows: &[T], format: TableFormat) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staging = NamedTempFile::new_in(dir)?;
    match format {
        TableFormat::Csv => write_csv(&mut staging, rows)?,
        TableFormat::Json => write_json(&mut staging, rows)?,
    }

    staging.persist(path).map_err(|e| PacingError::IoError(e.error))?;
    debug!("Replaced table {} with {} rows", path.display(), rows.len());
    Ok(())
}
