use super::{DETAIL_FAILED, load_session, save_export, ui};
use crate::core::Dashboard;
use crate::core::config::AppConfig;
use crate::core::export::{to_csv, transaction_csv_name};
use crate::core::records::{LineItem, Transaction};
use crate::core::report::DateRange;
use crate::core::session::{ReportSession, TransactionFilter};
use crate::core::tables::{items_table, short_id, transactions_table};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub search: Option<String>,
    pub cashier: Option<String>,
    pub expand: Vec<String>,
    pub csv: Option<String>,
    pub out_dir: Option<PathBuf>,
}

pub(crate) fn print_cashiers(session: &ReportSession) {
    if session.cashiers().is_empty() {
        return;
    }
    let names: Vec<&str> = session.cashiers().iter().map(String::as_str).collect();
    ui::print_notice(&format!("Kasir: {}", names.join(", ")));
}

pub(crate) fn print_transactions(visible: &[Transaction], total: usize) {
    ui::print_table(&transactions_table(visible), "Tidak ada transaksi");
    ui::print_notice(&format!("{} dari {} transaksi", visible.len(), total));
}

/// Prints the items of one transaction. A failure only affects this
/// transaction.
pub(crate) async fn show_items(dashboard: &Dashboard, transaction_id: &str) -> Option<Vec<LineItem>> {
    match dashboard.expand(transaction_id).await {
        Ok(lines) => {
            let mut table = items_table(&lines);
            table.title = format!("Detail Produk {}", short_id(transaction_id));
            ui::print_table(&table, "Tidak ada item");
            Some(lines)
        }
        Err(e) => {
            warn!(transaction = %transaction_id, error = %e, "Failed to load transaction detail");
            ui::print_error(DETAIL_FAILED);
            None
        }
    }
}

pub(crate) async fn export_items(
    dashboard: &Dashboard,
    transaction_id: &str,
    dir: &Path,
) -> Result<Option<PathBuf>> {
    let lines = dashboard
        .expand(transaction_id)
        .await
        .context(DETAIL_FAILED)?;
    save_export(
        dir,
        &transaction_csv_name(transaction_id),
        to_csv(&items_table(&lines)),
    )
}

/// Transaction history with search, cashier filter and item detail.
pub async fn run(
    config: &AppConfig,
    dashboard: &Dashboard,
    range: DateRange,
    options: &TransactionOptions,
) -> Result<()> {
    let session = load_session(dashboard, range).await?;
    print_cashiers(&session);

    let filter = TransactionFilter {
        query: options.search.clone(),
        cashier: options.cashier.clone(),
    };
    let visible = dashboard.filter_transactions(&session, &filter).await;
    print_transactions(&visible, session.transactions().len());

    for id in &options.expand {
        if session.transaction(id).is_none() {
            ui::print_notice(&format!("Transaksi {id} tidak ada di periode ini"));
        }
        show_items(dashboard, id).await;
    }

    if let Some(id) = &options.csv {
        let out_dir = options
            .out_dir
            .clone()
            .unwrap_or_else(|| config.export_dir());
        export_items(dashboard, id, &out_dir).await?;
    }
    Ok(())
}
