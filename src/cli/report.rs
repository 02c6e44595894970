use super::{chart, load_session, save_export, ui};
use crate::core::Dashboard;
use crate::core::config::AppConfig;
use crate::core::currency::format_rupiah;
use crate::core::export::{owner_workbook_name, report_pdf_name, to_pdf, to_xlsx};
use crate::core::report::{DateRange, ReportTotals};
use crate::core::tables::{daily_report_table, expense_table, product_table};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub excel: bool,
    pub pdf: bool,
    pub out_dir: Option<PathBuf>,
}

fn print_cards(totals: &ReportTotals) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pemasukan Kotor"),
        ui::header_cell("Total Pengeluaran"),
        ui::header_cell("Laba Bersih"),
        ui::header_cell("Transaksi"),
    ]);
    table.add_row(vec![
        Cell::new(format_rupiah(totals.income)).set_alignment(CellAlignment::Right),
        Cell::new(format!("-{}", format_rupiah(totals.expense)))
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right),
        ui::net_cell(totals.net()),
        Cell::new(totals.transaction_count).set_alignment(CellAlignment::Right),
    ]);
    println!("{table}");
}

/// Owner dashboard for `range`, optionally exported to XLSX and PDF.
pub async fn run(
    config: &AppConfig,
    dashboard: &Dashboard,
    range: DateRange,
    options: &ReportOptions,
) -> Result<()> {
    let session = load_session(dashboard, range).await?;

    println!(
        "\n{} {}",
        ui::style_text(&config.store_name, ui::StyleType::Title),
        ui::style_text(
            &format!("{} s/d {}", range.start(), range.end()),
            ui::StyleType::Subtle
        )
    );
    print_cards(&session.ledger().totals());

    let daily = daily_report_table(session.ledger());
    ui::print_table(&daily, "Tidak ada data");
    chart::print_chart(session.ledger());

    let products = product_table(session.products());
    ui::print_table(&products, "Belum ada menu terjual");
    let expenses = expense_table(&session.expenses_newest_first());
    ui::print_table(&expenses, "Tidak ada belanja");

    let out_dir = options
        .out_dir
        .clone()
        .unwrap_or_else(|| config.export_dir());
    if options.excel {
        save_export(
            &out_dir,
            &owner_workbook_name(range.start()),
            to_xlsx(&[&daily, &expenses, &products]),
        )?;
    }
    if options.pdf {
        let title = format!("Laporan Keuangan - {}", config.store_name);
        let subtitle = format!("Periode: {} s/d {}", range.start(), range.end());
        save_export(
            &out_dir,
            &report_pdf_name(range.start(), range.end()),
            to_pdf(&title, &subtitle, &daily),
        )?;
    }
    Ok(())
}
