//! Daily financial aggregation.
//!
//! Turns a flat snapshot of transactions, expenses and line items into a
//! calendar-complete per-day report and a product sales ranking. Everything
//! here is rebuilt from scratch on every load; nothing is mutated in place.

use crate::core::currency::{Amount, format_rupiah};
use crate::core::error::ReportError;
use crate::core::records::{Expense, LineItem, Transaction};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Daily meal-cost offset charged on every trading day except Sunday.
pub const MEAL_CUT: Amount = 10_000;
pub const MEAL_CUT_NOTE: &str = "Potongan Makan (10k)";

/// An inclusive range of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `end`.
    pub fn ending_at(end: NaiveDate, days: u32) -> Result<Self, ReportError> {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or(ReportError::RangeTooLong { end, days })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn num_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// Indonesian weekday name.
pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub day_name: &'static str,
    pub income_total: Amount,
    pub expense_total: Amount,
    pub transaction_count: usize,
    pub notes: Vec<String>,
}

impl DailyReport {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            day_name: day_name(date.weekday()),
            income_total: 0,
            expense_total: 0,
            transaction_count: 0,
            notes: Vec::new(),
        }
    }

    /// Income minus expense. Negative on loss days.
    pub fn net(&self) -> Amount {
        self.income_total.saturating_sub(self.expense_total)
    }

    pub fn notes_joined(&self) -> String {
        self.notes.join("; ")
    }

    fn takes_meal_cut(&self) -> bool {
        self.income_total > 0 && self.date.weekday() != Weekday::Sun
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub income: Amount,
    pub expense: Amount,
    pub transaction_count: usize,
}

impl ReportTotals {
    pub fn net(&self) -> Amount {
        self.income.saturating_sub(self.expense)
    }
}

/// One report per day of a range, keyed by date.
///
/// Both the table ordering (newest first) and the chart ordering (oldest
/// first) are views over this one structure.
#[derive(Debug, Clone)]
pub struct DailyLedger {
    range: DateRange,
    days: BTreeMap<NaiveDate, DailyReport>,
}

impl DailyLedger {
    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyReport> {
        self.days.get(&date)
    }

    pub fn ascending(&self) -> impl Iterator<Item = &DailyReport> {
        self.days.values()
    }

    pub fn descending(&self) -> impl Iterator<Item = &DailyReport> {
        self.days.values().rev()
    }

    pub fn totals(&self) -> ReportTotals {
        self.days
            .values()
            .fold(ReportTotals::default(), |mut acc, day| {
                acc.income = acc.income.saturating_add(day.income_total);
                acc.expense = acc.expense.saturating_add(day.expense_total);
                acc.transaction_count += day.transaction_count;
                acc
            })
    }
}

/// Builds the calendar-complete daily report for `range`.
///
/// Records dated outside the range are ignored. Sums saturate at the
/// `Amount` bounds instead of overflowing.
pub fn build_daily_reports(
    range: DateRange,
    transactions: &[Transaction],
    expenses: &[Expense],
) -> DailyLedger {
    let mut days: BTreeMap<NaiveDate, DailyReport> = range
        .days()
        .map(|date| (date, DailyReport::empty(date)))
        .collect();

    for trx in transactions {
        if let Some(day) = days.get_mut(&trx.date) {
            day.income_total = day.income_total.saturating_add(trx.gross_total);
            day.transaction_count += 1;
        } else {
            debug!(id = %trx.id, date = %trx.date, "Transaction outside report range");
        }
    }

    for expense in expenses {
        let Some(day) = days.get_mut(&expense.date) else {
            debug!(date = %expense.date, "Expense outside report range");
            continue;
        };
        day.expense_total = day.expense_total.saturating_add(expense.nominal_amount);
        if let Some(label) = expense.label() {
            day.notes
                .push(format!("{label} ({})", format_rupiah(expense.nominal_amount)));
        }
    }

    for day in days.values_mut() {
        if day.takes_meal_cut() {
            day.expense_total = day.expense_total.saturating_add(MEAL_CUT);
            day.notes.push(MEAL_CUT_NOTE.to_string());
        }
    }

    DailyLedger { range, days }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStat {
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Amount,
}

/// Per-product sales totals in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ProductStats {
    stats: Vec<ProductStat>,
    index: HashMap<String, usize>,
}

impl ProductStats {
    pub fn get(&self, product_name: &str) -> Option<&ProductStat> {
        self.index.get(product_name).map(|&i| &self.stats[i])
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Best sellers first. Equal quantities keep first-seen order.
    pub fn ranked(&self) -> Vec<&ProductStat> {
        let mut ranked: Vec<&ProductStat> = self.stats.iter().collect();
        ranked.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
        ranked
    }

    fn add(&mut self, line: &LineItem) {
        let name = line.product_name();
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.stats.push(ProductStat {
                    product_name: name.to_string(),
                    total_quantity: 0,
                    total_revenue: 0,
                });
                self.index.insert(name.to_string(), self.stats.len() - 1);
                self.stats.len() - 1
            }
        };
        let stat = &mut self.stats[idx];
        stat.total_quantity = stat.total_quantity.saturating_add(line.item.quantity);
        stat.total_revenue = stat.total_revenue.saturating_add(line.item.subtotal());
    }
}

pub fn build_product_stats<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> ProductStats {
    let mut stats = ProductStats::default();
    for line in items {
        stats.add(line);
    }
    stats
}
