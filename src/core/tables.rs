//! Tabular views shared by the terminal renderer and every exporter.
//!
//! Exports serialize these tables as-is; nothing is re-aggregated on the way
//! out.

use crate::core::currency::{Amount, format_rupiah};
use crate::core::inventory::StockStatus;
use crate::core::records::{Expense, LineItem, Product, Transaction};
use crate::core::report::{DailyLedger, ProductStats};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Amount(Amount),
    /// Money leaving the business, rendered with a leading minus.
    Outflow(Amount),
    Number(i64),
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Human-facing rendering.
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Amount(a) => format_rupiah(*a),
            CellValue::Outflow(a) => format!("-{}", format_rupiah(*a)),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Machine-facing rendering used by CSV.
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Amount(a) | CellValue::Outflow(a) => a.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            CellValue::Amount(a) | CellValue::Outflow(a) | CellValue::Number(a) => Some(*a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Summary row shown under the body; not part of CSV output.
    pub footer: Option<Vec<CellValue>>,
}

impl TableData {
    fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            footer: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `DD/MM`, the compact date the dashboard lists use.
pub fn day_month(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// Abbreviates long identifiers to `first8...last4`.
pub fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 12 {
        return id.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Daily report, newest day first.
pub fn daily_report_table(ledger: &DailyLedger) -> TableData {
    let mut table = TableData::new(
        "Laporan Harian",
        &["Hari", "Tanggal", "Pemasukan", "Pengeluaran", "Laba Bersih", "Catatan"],
    );
    table.rows = ledger
        .descending()
        .map(|day| {
            vec![
                CellValue::text(day.day_name),
                CellValue::text(day.date.to_string()),
                CellValue::Amount(day.income_total),
                CellValue::Outflow(day.expense_total),
                CellValue::Amount(day.net()),
                CellValue::text(day.notes_joined()),
            ]
        })
        .collect();
    let totals = ledger.totals();
    table.footer = Some(vec![
        CellValue::text("Total"),
        CellValue::text(""),
        CellValue::Amount(totals.income),
        CellValue::Outflow(totals.expense),
        CellValue::Amount(totals.net()),
        CellValue::text(""),
    ]);
    table
}

/// Expense detail; pass expenses already sorted newest first.
pub fn expense_table(expenses: &[&Expense]) -> TableData {
    let mut table = TableData::new("Rincian Belanja", &["Tanggal", "Keterangan", "Nominal"]);
    table.rows = expenses
        .iter()
        .map(|e| {
            vec![
                CellValue::text(day_month(e.date)),
                CellValue::text(e.label().unwrap_or("-")),
                CellValue::Outflow(e.nominal_amount),
            ]
        })
        .collect();
    table
}

pub fn product_table(stats: &ProductStats) -> TableData {
    let mut table = TableData::new("Menu Terjual", &["Menu", "Terjual", "Total"]);
    table.rows = stats
        .ranked()
        .into_iter()
        .map(|s| {
            vec![
                CellValue::text(s.product_name.clone()),
                CellValue::Number(s.total_quantity),
                CellValue::Amount(s.total_revenue),
            ]
        })
        .collect();
    table
}

pub fn transactions_table(transactions: &[Transaction]) -> TableData {
    let mut table = TableData::new("Transaksi", &["Tanggal", "Waktu", "ID", "Kasir", "Total"]);
    table.rows = transactions
        .iter()
        .map(|t| {
            vec![
                CellValue::text(day_month(t.date)),
                CellValue::text(t.time.clone().unwrap_or_default()),
                CellValue::text(short_id(&t.id)),
                CellValue::text(t.cashier_id.clone().unwrap_or_else(|| "-".to_string())),
                CellValue::Amount(t.gross_total),
            ]
        })
        .collect();
    table
}

/// Line items of one transaction with a total footer.
pub fn items_table(lines: &[LineItem]) -> TableData {
    let mut table = TableData::new(
        "Detail Produk",
        &["No", "Produk", "Qty", "Harga", "Subtotal", "Stok"],
    );
    table.rows = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            vec![
                CellValue::Number(idx as i64 + 1),
                CellValue::text(line.product_name()),
                CellValue::Number(line.item.quantity),
                CellValue::Amount(line.item.unit_price_at_time),
                CellValue::Amount(line.item.subtotal()),
                line.stock_level()
                    .map_or(CellValue::Empty, CellValue::Number),
            ]
        })
        .collect();
    let total = lines
        .iter()
        .fold(0, |acc: Amount, l| acc.saturating_add(l.item.subtotal()));
    table.footer = Some(vec![
        CellValue::text("Total"),
        CellValue::text(""),
        CellValue::text(""),
        CellValue::text(""),
        CellValue::Amount(total),
        CellValue::text(""),
    ]);
    table
}

/// Stock view as shown on screen.
pub fn stock_table(products: &[&Product]) -> TableData {
    let mut table = TableData::new(
        "Stok Produk",
        &["No", "Nama", "Kategori", "Harga", "Stok", "Status"],
    );
    table.rows = products
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            vec![
                CellValue::Number(idx as i64 + 1),
                CellValue::text(p.display_name()),
                CellValue::text(p.category.clone().unwrap_or_else(|| "-".to_string())),
                CellValue::Amount(p.unit_price),
                p.stock_level.map_or(CellValue::Empty, CellValue::Number),
                CellValue::text(StockStatus::classify(p.stock_level).label()),
            ]
        })
        .collect();
    table
}

/// Stock list in the layout of the CSV download.
pub fn stock_export_table(products: &[&Product]) -> TableData {
    let mut table = TableData::new("Stok Produk", &["ID", "Nama", "Kategori", "Harga", "Stok"]);
    table.rows = products
        .iter()
        .map(|p| {
            vec![
                CellValue::text(p.id.clone()),
                CellValue::text(p.name.clone().unwrap_or_default()),
                CellValue::text(p.category.clone().unwrap_or_default()),
                CellValue::Amount(p.unit_price),
                p.stock_level.map_or(CellValue::Empty, CellValue::Number),
            ]
        })
        .collect();
    table
}

/// One product as field/value pairs.
pub fn product_detail_table(product: &Product) -> TableData {
    let mut table = TableData::new("Produk", &["Field", "Value"]);
    table.rows = vec![
        vec![CellValue::text("ID"), CellValue::text(product.id.clone())],
        vec![
            CellValue::text("Nama"),
            CellValue::text(product.name.clone().unwrap_or_default()),
        ],
        vec![
            CellValue::text("Kategori"),
            CellValue::text(product.category.clone().unwrap_or_default()),
        ],
        vec![CellValue::text("Harga"), CellValue::Amount(product.unit_price)],
        vec![
            CellValue::text("Stok"),
            product.stock_level.map_or(CellValue::Empty, CellValue::Number),
        ],
    ];
    table
}
