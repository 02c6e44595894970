use super::{LOAD_FAILED, save_export, ui};
use crate::core::DataGateway;
use crate::core::config::AppConfig;
use crate::core::export::{product_csv_name, stock_csv_name, to_csv};
use crate::core::inventory::{StockFilter, StockStatus, categories, summary_line};
use crate::core::tables::{product_detail_table, stock_export_table, stock_table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::error;

#[derive(Debug, Clone, Default)]
pub struct StockOptions {
    pub filter: StockFilter,
    pub csv: bool,
    /// Show a single product instead of the list.
    pub product: Option<String>,
    pub out_dir: Option<PathBuf>,
}

/// Inventory view. `today` names the CSV export.
pub async fn run(
    config: &AppConfig,
    gateway: &dyn DataGateway,
    options: &StockOptions,
    today: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner("Memuat data produk...");
    let result = gateway.fetch_inventory().await;
    pb.finish_and_clear();
    let products = result.map_err(|e| {
        error!(error = %e, "Inventory load failed");
        ui::print_error(LOAD_FAILED);
        e.context(LOAD_FAILED)
    })?;
    let out_dir = options
        .out_dir
        .clone()
        .unwrap_or_else(|| config.export_dir());

    if let Some(id) = &options.product {
        let product = products
            .iter()
            .find(|p| p.id == *id)
            .with_context(|| format!("Produk {id} tidak ditemukan"))?;
        let detail = product_detail_table(product);
        ui::print_table(&detail, "");
        ui::print_notice(&format!(
            "Status: {}",
            StockStatus::classify(product.stock_level)
        ));
        if options.csv {
            save_export(
                &out_dir,
                &product_csv_name(product.name.as_deref()),
                to_csv(&detail),
            )?;
        }
        return Ok(());
    }

    let all_categories = categories(&products);
    if !all_categories.is_empty() {
        let names: Vec<&str> = all_categories.iter().map(String::as_str).collect();
        ui::print_notice(&format!("Kategori: {}", names.join(", ")));
    }

    let visible = options.filter.apply(&products);
    ui::print_table(&stock_table(&visible), "Tidak ada produk");
    ui::print_notice(&summary_line(visible.len(), products.len()));

    if options.csv {
        save_export(
            &out_dir,
            &stock_csv_name(today),
            to_csv(&stock_export_table(&visible)),
        )?;
    }
    Ok(())
}
