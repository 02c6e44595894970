//! Report sessions and the dashboard that loads them.
//!
//! A [`ReportSession`] is an immutable snapshot for one date range. The
//! [`Dashboard`] owns the gateway, the session-scoped item cache, and the
//! request generation that keeps a slow, older load from replacing the result
//! of a newer one.

use crate::core::cache::Cache;
use crate::core::error::ReportError;
use crate::core::gateway::DataGateway;
use crate::core::records::{Expense, LineItem, Product, Transaction, TransactionItem};
use crate::core::report::{
    DailyLedger, DateRange, ProductStats, build_daily_reports, build_product_stats,
};
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resolved line items keyed by transaction id.
pub type ItemCache = Cache<String, Vec<LineItem>>;

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub query: Option<String>,
    pub cashier: Option<String>,
}

impl TransactionFilter {
    /// `lines` are the cached items of `trx`, if it has been expanded or
    /// eagerly loaded.
    pub fn matches(&self, trx: &Transaction, lines: Option<&[LineItem]>) -> bool {
        if let Some(cashier) = self.cashier.as_deref().filter(|c| !c.is_empty()) {
            if trx.cashier_id.as_deref() != Some(cashier) {
                return false;
            }
        }
        let query = self.query.as_deref().unwrap_or("").to_lowercase();
        if query.is_empty() {
            return true;
        }
        let in_meta = trx.id.to_lowercase().contains(&query)
            || trx
                .cashier_id
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&query));
        in_meta
            || lines.unwrap_or_default().iter().any(|line| {
                line.product
                    .as_ref()
                    .and_then(|p| p.name.as_deref())
                    .is_some_and(|name| name.to_lowercase().contains(&query))
            })
    }
}

#[derive(Debug)]
pub struct ReportSession {
    range: DateRange,
    transactions: Vec<Transaction>,
    expenses: Vec<Expense>,
    cashiers: BTreeSet<String>,
    ledger: DailyLedger,
    products: ProductStats,
}

impl ReportSession {
    pub fn build(
        range: DateRange,
        transactions: Vec<Transaction>,
        expenses: Vec<Expense>,
        lines: &[LineItem],
    ) -> Self {
        let cashiers = transactions
            .iter()
            .filter_map(|t| t.cashier_id.clone())
            .filter(|c| !c.is_empty())
            .collect();
        let ledger = build_daily_reports(range, &transactions, &expenses);
        let products = build_product_stats(lines);
        Self {
            range,
            transactions,
            expenses,
            cashiers,
            ledger,
            products,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Transactions in backend order (newest date first).
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Expenses sorted by date, newest first.
    pub fn expenses_newest_first(&self) -> Vec<&Expense> {
        let mut sorted: Vec<&Expense> = self.expenses.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    pub fn cashiers(&self) -> &BTreeSet<String> {
        &self.cashiers
    }

    pub fn ledger(&self) -> &DailyLedger {
        &self.ledger
    }

    pub fn products(&self) -> &ProductStats {
        &self.products
    }

    pub fn filter_transactions(
        &self,
        filter: &TransactionFilter,
        items: &HashMap<String, Vec<LineItem>>,
    ) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| filter.matches(t, items.get(&t.id).map(Vec::as_slice)))
            .collect()
    }
}

struct Snapshot {
    transactions: Vec<Transaction>,
    expenses: Vec<Expense>,
    lines: Vec<LineItem>,
    by_transaction: HashMap<String, Vec<LineItem>>,
}

pub struct Dashboard {
    gateway: Arc<dyn DataGateway>,
    items: ItemCache,
    generation: AtomicU64,
    inflight: Mutex<Option<CancellationToken>>,
    current: Mutex<Option<Arc<ReportSession>>>,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            items: ItemCache::new(),
            generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    pub fn item_cache(&self) -> &ItemCache {
        &self.items
    }

    pub async fn current(&self) -> Option<Arc<ReportSession>> {
        self.current.lock().await.clone()
    }

    /// Loads a fresh session for `range`.
    ///
    /// Any load still in flight is cancelled. The item cache is swapped for
    /// the new session's items only once the load commits, so a failed or
    /// cancelled load leaves the previous session intact. Fails with
    /// [`ReportError::Cancelled`] or [`ReportError::Superseded`] when a newer
    /// load took over.
    pub async fn load(&self, range: DateRange) -> Result<Arc<ReportSession>> {
        let token = CancellationToken::new();
        if let Some(previous) = self.inflight.lock().await.replace(token.clone()) {
            debug!("Cancelling in-flight report load");
            previous.cancel();
        }

        let generation = {
            let _current = self.current.lock().await;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!(
            generation,
            start = %range.start(),
            end = %range.end(),
            "Loading report"
        );

        let snapshot = tokio::select! {
            _ = token.cancelled() => return Err(ReportError::Cancelled.into()),
            snapshot = fetch_snapshot(self.gateway.as_ref(), range) => snapshot?,
        };

        let mut current = self.current.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            warn!(generation, "Discarding stale report load");
            return Err(ReportError::Superseded.into());
        }
        self.items.clear().await;
        self.items.extend(snapshot.by_transaction).await;
        let session = Arc::new(ReportSession::build(
            range,
            snapshot.transactions,
            snapshot.expenses,
            &snapshot.lines,
        ));
        *current = Some(Arc::clone(&session));
        info!(
            generation,
            transactions = session.transactions().len(),
            "Report loaded"
        );
        Ok(session)
    }

    /// Items of one transaction, fetched on first use and cached for the
    /// rest of the session.
    pub async fn expand(&self, transaction_id: &str) -> Result<Vec<LineItem>> {
        let key = transaction_id.to_string();
        if let Some(lines) = self.items.get(&key).await {
            return Ok(lines);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let items = self
            .gateway
            .fetch_items(std::slice::from_ref(&key))
            .await
            .with_context(|| format!("Failed to load items for transaction {transaction_id}"))?;
        let lines = enrich(self.gateway.as_ref(), items).await;

        // Checked under the session lock so a load cannot commit in between.
        let _current = self.current.lock().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.items.put(key, lines.clone()).await;
        }
        Ok(lines)
    }

    pub async fn filter_transactions(
        &self,
        session: &ReportSession,
        filter: &TransactionFilter,
    ) -> Vec<Transaction> {
        let items = self.items.snapshot().await;
        session
            .filter_transactions(filter, &items)
            .into_iter()
            .cloned()
            .collect()
    }
}

async fn fetch_snapshot(gateway: &dyn DataGateway, range: DateRange) -> Result<Snapshot> {
    let (transactions, expenses) = futures::try_join!(
        async {
            gateway
                .fetch_transactions(&range)
                .await
                .context("Failed to load transactions")
        },
        async {
            gateway
                .fetch_expenses(&range)
                .await
                .context("Failed to load expenses")
        },
    )?;

    let transaction_ids: Vec<String> = transactions.iter().map(|t| t.id.clone()).collect();
    let items = if transaction_ids.is_empty() {
        Vec::new()
    } else {
        gateway
            .fetch_items(&transaction_ids)
            .await
            .context("Failed to load transaction items")?
    };
    let lines = enrich(gateway, items).await;

    let mut by_transaction: HashMap<String, Vec<LineItem>> = transaction_ids
        .into_iter()
        .map(|id| (id, Vec::new()))
        .collect();
    for line in &lines {
        by_transaction
            .entry(line.item.transaction_id.clone())
            .or_default()
            .push(line.clone());
    }

    Ok(Snapshot {
        transactions,
        expenses,
        lines,
        by_transaction,
    })
}

/// Attaches products to items. A failed product lookup leaves every item
/// unresolved instead of failing.
async fn enrich(gateway: &dyn DataGateway, items: Vec<TransactionItem>) -> Vec<LineItem> {
    let mut product_ids: Vec<String> = items.iter().filter_map(|i| i.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();

    let mut products: HashMap<String, Product> = HashMap::new();
    if !product_ids.is_empty() {
        match gateway.fetch_products(&product_ids).await {
            Ok(found) => products = found.into_iter().map(|p| (p.id.clone(), p)).collect(),
            Err(e) => warn!(error = %e, "Failed to load products, showing items as unknown"),
        }
    }

    items
        .into_iter()
        .map(|item| {
            let product = item
                .product_id
                .as_ref()
                .and_then(|id| products.get(id))
                .cloned();
            LineItem { item, product }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::mock::MockGateway;
    use crate::core::records::UNKNOWN_MENU;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trx(id: &str, on: NaiveDate, gross: i64, cashier: Option<&str>) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: on,
            time: Some("10:15:00".to_string()),
            gross_total: gross,
            cashier_id: cashier.map(str::to_string),
            is_expense: false,
        }
    }

    fn item(id: &str, trx_id: &str, product_id: Option<&str>, qty: i64, price: i64) -> TransactionItem {
        TransactionItem {
            id: id.to_string(),
            transaction_id: trx_id.to_string(),
            product_id: product_id.map(str::to_string),
            quantity: qty,
            unit_price_at_time: price,
        }
    }

    fn product(id: &str, name: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: Some(name.to_string()),
            category: None,
            unit_price: 0,
            stock_level: Some(stock),
            updated_at: None,
        }
    }

    fn gateway() -> MockGateway {
        MockGateway {
            transactions: vec![
                trx("trx-aaa", date(2024, 1, 1), 16_000, Some("kasir1")),
                trx("trx-bbb", date(2024, 1, 2), 9_000, Some("kasir2")),
                trx("trx-ccc", date(2024, 1, 2), 0, None),
            ],
            items: vec![
                item("i1", "trx-aaa", Some("p1"), 2, 8_000),
                item("i2", "trx-bbb", Some("p2"), 3, 3_000),
            ],
            products: vec![product("p1", "Indomie Goreng", 12), product("p2", "Es Teh", 3)],
            expenses: vec![Expense {
                date: date(2024, 1, 2),
                nominal_amount: 5_000,
                note: None,
                item_name: Some("Gas".to_string()),
            }],
            ..Default::default()
        }
    }

    fn range() -> DateRange {
        DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap()
    }

    #[tokio::test]
    async fn load_builds_full_session() {
        let dashboard = Dashboard::new(Arc::new(gateway()));
        let session = dashboard.load(range()).await.unwrap();

        assert_eq!(session.transactions().len(), 3);
        assert_eq!(session.ledger().len(), 3);
        let totals = session.ledger().totals();
        assert_eq!(totals.income, 25_000);
        // Jan 1 (Mon) and Jan 2 (Tue) have income.
        assert_eq!(totals.expense, 5_000 + 20_000);
        assert_eq!(totals.transaction_count, 3);

        let cashiers: Vec<_> = session.cashiers().iter().cloned().collect();
        assert_eq!(cashiers, vec!["kasir1", "kasir2"]);

        let ranked = session.products().ranked();
        assert_eq!(ranked[0].product_name, "Es Teh");
        assert_eq!(ranked[1].product_name, "Indomie Goreng");

        // Every loaded transaction has a cache entry, empty ones included.
        assert_eq!(dashboard.item_cache().len().await, 3);
        assert!(dashboard.current().await.is_some());
    }

    #[tokio::test]
    async fn primary_fetch_failure_aborts_load() {
        let mut gw = gateway();
        gw.fail_expenses = true;
        let dashboard = Dashboard::new(Arc::new(gw));

        let err = dashboard.load(range()).await.unwrap_err();
        assert!(err.to_string().contains("expenses"));
        assert!(dashboard.current().await.is_none());

        let mut gw = gateway();
        gw.fail_transactions = true;
        let dashboard = Dashboard::new(Arc::new(gw));
        assert!(dashboard.load(range()).await.is_err());
    }

    #[tokio::test]
    async fn product_failure_degrades_to_unknown_menu() {
        let mut gw = gateway();
        gw.fail_products = true;
        let gw = Arc::new(gw);
        let dashboard = Dashboard::new(gw.clone());

        let session = dashboard.load(range()).await.unwrap();
        assert_eq!(gw.product_calls(), 1);
        let ranked = session.products().ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].product_name, UNKNOWN_MENU);
        assert_eq!(ranked[0].total_quantity, 5);
        assert_eq!(session.transactions().len(), 3);
    }

    #[tokio::test]
    async fn item_fetch_failure_aborts_load() {
        let mut gw = gateway();
        gw.fail_items = true;
        let gw = Arc::new(gw);
        let dashboard = Dashboard::new(gw.clone());

        let err = dashboard.load(range()).await.unwrap_err();
        assert!(err.to_string().contains("transaction items"));
        assert_eq!(gw.item_calls(), 1);
        assert!(dashboard.current().await.is_none());
        assert!(dashboard.item_cache().is_empty().await);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_items() {
        let gw = Arc::new(gateway());
        let dashboard = Dashboard::new(gw.clone());
        let session = dashboard.load(range()).await.unwrap();

        let broken_start = date(2023, 12, 1);
        gw.failing_starts.lock().unwrap().insert(broken_start);
        let broken = DateRange::new(broken_start, date(2024, 1, 3)).unwrap();
        assert!(dashboard.load(broken).await.is_err());

        let current = dashboard.current().await.unwrap();
        assert!(Arc::ptr_eq(&current, &session));
        assert_eq!(dashboard.item_cache().len().await, 3);

        let by_product = TransactionFilter {
            query: Some("es teh".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = dashboard
            .filter_transactions(&current, &by_product)
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["trx-bbb"]);

        dashboard.expand("trx-aaa").await.unwrap();
        assert_eq!(gw.item_calls(), 1);
    }

    #[tokio::test]
    async fn expand_uses_cache_after_load() {
        let gw = Arc::new(gateway());
        let dashboard = Dashboard::new(gw.clone());
        dashboard.load(range()).await.unwrap();
        assert_eq!(gw.item_calls(), 1);

        let lines = dashboard.expand("trx-aaa").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name(), "Indomie Goreng");
        assert_eq!(lines[0].stock_level(), Some(12));

        let empty = dashboard.expand("trx-ccc").await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(gw.item_calls(), 1);
    }

    #[tokio::test]
    async fn expand_fetches_once_for_unknown_transaction() {
        let gw = Arc::new(gateway());
        let dashboard = Dashboard::new(gw.clone());

        let lines = dashboard.expand("trx-bbb").await.unwrap();
        assert_eq!(lines[0].product_name(), "Es Teh");
        dashboard.expand("trx-bbb").await.unwrap();
        assert_eq!(gw.item_calls(), 1);
    }

    #[tokio::test]
    async fn new_load_clears_item_cache() {
        let gw = Arc::new(gateway());
        let dashboard = Dashboard::new(gw.clone());
        dashboard.expand("trx-bbb").await.unwrap();
        assert_eq!(dashboard.item_cache().len().await, 1);

        let jan1 = DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        dashboard.load(jan1).await.unwrap();
        assert!(!dashboard.item_cache().contains(&"trx-bbb".to_string()).await);
        assert!(dashboard.item_cache().contains(&"trx-aaa".to_string()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_load_cancels_slower_older_one() {
        let gw = gateway();
        let slow_start = date(2023, 12, 1);
        gw.delays
            .lock()
            .unwrap()
            .insert(slow_start, Duration::from_secs(5));
        let dashboard = Dashboard::new(Arc::new(gw));

        let slow = DateRange::new(slow_start, date(2024, 1, 3)).unwrap();
        let (older, newer) = tokio::join!(dashboard.load(slow), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.load(range()).await
        });

        let err = older.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Cancelled)
        ));
        assert_eq!(newer.unwrap().range(), range());
        assert_eq!(dashboard.current().await.unwrap().range(), range());
    }

    #[tokio::test]
    async fn filters_by_cashier_and_query() {
        let dashboard = Dashboard::new(Arc::new(gateway()));
        let session = dashboard.load(range()).await.unwrap();

        let by_cashier = TransactionFilter {
            cashier: Some("kasir2".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = dashboard
            .filter_transactions(&session, &by_cashier)
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["trx-bbb"]);

        let by_product = TransactionFilter {
            query: Some("INDOMIE".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = dashboard
            .filter_transactions(&session, &by_product)
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["trx-aaa"]);

        let by_id = TransactionFilter {
            query: Some("ccc".to_string()),
            cashier: Some("kasir1".to_string()),
        };
        assert!(dashboard.filter_transactions(&session, &by_id).await.is_empty());
    }
}
