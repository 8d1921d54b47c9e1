//! Flat tabular exports of roster records.

mod projection;

pub use projection::{column_label, project, ExportRow, ExportScope, KNOWN_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export requires at least one column")]
    EmptyColumns,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("export buffer could not be finalized: {0}")]
    Buffer(String),
}

/// Serializes rows as CSV with a header of column labels.
pub fn write_csv(rows: &[ExportRow], columns: &[String]) -> Result<String, ExportError> {
    if columns.is_empty() {
        return Err(ExportError::EmptyColumns);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|column| column_label(column)))?;
    for row in rows {
        writer.write_record(row.values())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ExportError::Buffer(err.to_string()))
}
