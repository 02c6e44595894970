pub mod assets;
pub mod browse;
pub mod chart;
pub mod report;
pub mod setup;
pub mod stock;
pub mod transactions;
pub mod ui;

use crate::core::error::ExportError;
use crate::core::export::write_file;
use crate::core::{Dashboard, DateRange, ReportSession};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

/// Shown when the primary data of a view cannot be loaded.
pub const LOAD_FAILED: &str = "Gagal memuat data. Cek koneksi internet dan konfigurasi backend.";
/// Shown when the items of a single transaction cannot be loaded.
pub const DETAIL_FAILED: &str = "Gagal memuat detail transaksi.";

/// Loads a session behind a spinner and reports failures to the user.
pub async fn load_session(dashboard: &Dashboard, range: DateRange) -> Result<Arc<ReportSession>> {
    let pb = ui::new_spinner("Memuat data...");
    let result = dashboard.load(range).await;
    pb.finish_and_clear();
    result.map_err(|e| {
        error!(error = %e, "Report load failed");
        ui::print_error(LOAD_FAILED);
        e.context(LOAD_FAILED)
    })
}

/// Writes an export file. An empty export is reported as a notice and is
/// not an error.
pub fn save_export(
    dir: &Path,
    filename: &str,
    bytes: Result<Vec<u8>, ExportError>,
) -> Result<Option<PathBuf>> {
    match bytes.and_then(|b| write_file(dir, filename, &b)) {
        Ok(path) => {
            println!("Tersimpan: {}", path.display());
            Ok(Some(path))
        }
        Err(ExportError::NothingToExport) => {
            ui::print_notice(&ExportError::NothingToExport.to_string());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to export {filename}")),
    }
}
