//! Error types for export formatting

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// Exporting an empty row set is refused
    #[error("No data to export")]
    NoData,

    #[error("Unknown export format: {name}")]
    UnknownFormat { name: String },

    #[error("CSV formatting failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export buffer is not valid UTF-8")]
    InvalidUtf8,
}

pub type ExportResult<T> = Result<T, ExportError>;
