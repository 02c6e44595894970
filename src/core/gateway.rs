//! Remote data gateway abstraction.

use crate::core::records::{Expense, Product, Transaction, TransactionItem};
use crate::core::report::DateRange;
use anyhow::Result;
use async_trait::async_trait;

/// Read access to the four backend collections.
///
/// Range filters are inclusive on both ends; id filters are set membership.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Sales (non-expense) transactions in `range`, newest date first.
    async fn fetch_transactions(&self, range: &DateRange) -> Result<Vec<Transaction>>;

    async fn fetch_items(&self, transaction_ids: &[String]) -> Result<Vec<TransactionItem>>;

    /// Products by id, projected to id, name and stock.
    async fn fetch_products(&self, product_ids: &[String]) -> Result<Vec<Product>>;

    /// Every product with category and price, ordered by name.
    async fn fetch_inventory(&self) -> Result<Vec<Product>>;

    async fn fetch_expenses(&self, range: &DateRange) -> Result<Vec<Expense>>;
}
