//! Typed errors callers need to branch on.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("cannot count {days} days back from {end}; lower report.default_days")]
    RangeTooLong { end: NaiveDate, days: u32 },

    /// A newer load finished first; this result must not be shown.
    #[error("report load superseded by a newer request")]
    Superseded,

    #[error("report load cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Tidak ada data untuk diekspor")]
    NothingToExport,

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF export failed: {0}")]
    Pdf(String),

    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}
