//! Typed records as they come out of the backend.
//!
//! Every defaulting rule (missing numbers become zero, absent labels become
//! `None`) is applied once when a row is ingested, so the rest of the crate
//! never has to second-guess a field.

use crate::core::currency::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display name used when a line item's product cannot be resolved.
pub const UNKNOWN_MENU: &str = "Menu Tak Dikenal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub gross_total: Amount,
    pub cashier_id: Option<String>,
    #[serde(default)]
    pub is_expense: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: Option<String>,
    pub quantity: i64,
    /// Unit price snapshot taken at sale time.
    pub unit_price_at_time: Amount,
}

impl TransactionItem {
    pub fn subtotal(&self) -> Amount {
        self.unit_price_at_time.saturating_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit_price: Amount,
    pub stock_level: Option<i64>,
    pub updated_at: Option<String>,
}

impl Product {
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or("-")
    }

    /// The name, unless it is missing or blank.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub date: NaiveDate,
    pub nominal_amount: Amount,
    pub note: Option<String>,
    pub item_name: Option<String>,
}

impl Expense {
    /// The note if present, otherwise the item name.
    pub fn label(&self) -> Option<&str> {
        self.note
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.item_name.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A line item together with the product it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: TransactionItem,
    pub product: Option<Product>,
}

impl LineItem {
    pub fn product_name(&self) -> &str {
        self.product
            .as_ref()
            .and_then(Product::name)
            .unwrap_or(UNKNOWN_MENU)
    }

    pub fn stock_level(&self) -> Option<i64> {
        self.product.as_ref().and_then(|p| p.stock_level)
    }
}
