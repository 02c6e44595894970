//! Terminal stand-in for the dashboard's net income and cash flow charts.

use super::ui::{StyleType, style_text};
use crate::core::currency::{Amount, format_rupiah};
use crate::core::report::{DailyLedger, ReportTotals};
use crate::core::tables::day_month;
use console::style;

const BAR_WIDTH: usize = 40;

#[derive(Debug, PartialEq, Eq)]
pub struct Bar {
    pub label: String,
    pub net: Amount,
    pub width: usize,
}

/// One bar per day, oldest first, scaled so the largest |net| spans
/// `max_width`. A non-zero net always gets at least one cell.
pub fn net_bars(ledger: &DailyLedger, max_width: usize) -> Vec<Bar> {
    let max_abs = ledger
        .ascending()
        .map(|day| day.net().unsigned_abs())
        .max()
        .unwrap_or(0);
    ledger
        .ascending()
        .map(|day| {
            let net = day.net();
            let width = if max_abs == 0 || net == 0 {
                0
            } else {
                let scaled =
                    (net.unsigned_abs() as u128 * max_width as u128 / max_abs as u128) as usize;
                scaled.max(1)
            };
            Bar {
                label: format!("{} {}", day_month(day.date), day.day_name),
                net,
                width,
            }
        })
        .collect()
}

/// Income and expense as whole percentages of total cash flow.
pub fn cash_flow_share(totals: &ReportTotals) -> Option<(u64, u64)> {
    let income = totals.income.max(0) as u128;
    let expense = totals.expense.max(0) as u128;
    let total = income + expense;
    if total == 0 {
        return None;
    }
    let income_pct = ((income * 100 + total / 2) / total) as u64;
    Some((income_pct, 100 - income_pct))
}

pub fn print_chart(ledger: &DailyLedger) {
    println!("\n{}", style_text("Grafik Laba Bersih", StyleType::Title));
    for bar in net_bars(ledger, BAR_WIDTH) {
        let blocks = "█".repeat(bar.width);
        let blocks = if bar.net < 0 {
            style(blocks).red().to_string()
        } else {
            style(blocks).green().to_string()
        };
        println!("{:<14} {} {}", bar.label, blocks, format_rupiah(bar.net));
    }

    if let Some((income, expense)) = cash_flow_share(&ledger.totals()) {
        println!(
            "\n{} Pemasukan {income}% | Pengeluaran {expense}%",
            style_text("Arus Kas:", StyleType::TotalLabel),
        );
    }
}
