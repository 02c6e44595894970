//! Stock classification and the product list filters of the stock view.

use crate::core::records::Product;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

/// Highest stock level still reported as running low.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    /// Out of stock.
    Habis,
    /// Running low.
    Menipis,
    /// Enough stock.
    Aman,
}

impl StockStatus {
    /// Unknown stock counts as zero.
    pub fn classify(stock: Option<i64>) -> Self {
        match stock.unwrap_or(0) {
            s if s <= 0 => StockStatus::Habis,
            s if s <= LOW_STOCK_THRESHOLD => StockStatus::Menipis,
            _ => StockStatus::Aman,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::Habis => "Habis",
            StockStatus::Menipis => "Menipis",
            StockStatus::Aman => "Aman",
        }
    }
}

impl Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSort {
    NameAsc,
    StockAsc,
    StockDesc,
    PriceAsc,
    PriceDesc,
}

impl FromStr for StockSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name_asc" => Ok(StockSort::NameAsc),
            "stock_asc" => Ok(StockSort::StockAsc),
            "stock_desc" => Ok(StockSort::StockDesc),
            "price_asc" => Ok(StockSort::PriceAsc),
            "price_desc" => Ok(StockSort::PriceDesc),
            _ => Err(anyhow::anyhow!("Invalid sort option: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub sort: Option<StockSort>,
}

impl StockFilter {
    fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if product.category.as_deref() != Some(category) {
                return false;
            }
        }
        let query = self
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .unwrap_or_default();
        if query.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {}",
            product.name.as_deref().unwrap_or(""),
            product.category.as_deref().unwrap_or("")
        );
        haystack.to_lowercase().contains(&query)
    }

    /// Returns the visible products. Without a sort option the input order
    /// is kept.
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut visible: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        let stock = |p: &Product| p.stock_level.unwrap_or(0);
        match self.sort {
            Some(StockSort::NameAsc) => visible
                .sort_by_cached_key(|p| p.name.as_deref().unwrap_or("").to_lowercase()),
            Some(StockSort::StockAsc) => visible.sort_by_key(|p| stock(p)),
            Some(StockSort::StockDesc) => visible.sort_by_key(|p| std::cmp::Reverse(stock(p))),
            Some(StockSort::PriceAsc) => visible.sort_by_key(|p| p.unit_price),
            Some(StockSort::PriceDesc) => visible.sort_by_key(|p| std::cmp::Reverse(p.unit_price)),
            None => {}
        }
        visible
    }
}

/// Distinct non-empty categories, sorted.
pub fn categories(products: &[Product]) -> BTreeSet<String> {
    products
        .iter()
        .filter_map(|p| p.category.clone())
        .filter(|c| !c.is_empty())
        .collect()
}

pub fn summary_line(visible: usize, total: usize) -> String {
    if visible == 0 {
        return "0 produk ditampilkan".to_string();
    }
    format!("{visible} produk ditampilkan (total produk: {total})")
}
