//! CSV table loader.
//!
//! RULE: Only the loader touches input files. Stages receive RawTables.
//! An absent file is an empty table, never an error.

use crate::{
    error::PipelineResult,
    table::{RawTable, TableSet},
};
use std::path::Path;

pub const SERVICE_DATA_FILE: &str = "service_data.csv";
pub const EMPLOYEES_FILE: &str = "employees.csv";
pub const SERVICE_TYPE_FILE: &str = "service_type.csv";
pub const CHANNEL_FILE: &str = "channel.csv";
pub const FAULT_TYPE_FILE: &str = "fault_type.csv";
pub const LOCATION_FILE: &str = "location.csv";

/// Read one CSV file. Every cell is trimmed; short rows are padded.
pub fn read_table(path: &Path) -> PipelineResult<RawTable> {
    if !path.exists() {
        log::debug!("loader: {} not found, using empty table", path.display());
        return Ok(RawTable::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        if row.len() < columns.len() {
            row.resize(columns.len(), String::new());
        }
        rows.push(row);
    }

    log::debug!("loader: {} row(s) from {}", rows.len(), path.display());
    Ok(RawTable::new(columns, rows))
}

/// Load the six pipeline inputs from `data_dir`.
pub fn load_tables(data_dir: impl AsRef<Path>) -> PipelineResult<TableSet> {
    let dir = data_dir.as_ref();
    Ok(TableSet {
        service_data: read_table(&dir.join(SERVICE_DATA_FILE))?,
        employees: read_table(&dir.join(EMPLOYEES_FILE))?,
        service_type: read_table(&dir.join(SERVICE_TYPE_FILE))?,
        channel: read_table(&dir.join(CHANNEL_FILE))?,
        fault_type: read_table(&dir.join(FAULT_TYPE_FILE))?,
        location: read_table(&dir.join(LOCATION_FILE))?,
    })
}
