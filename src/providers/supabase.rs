//! PostgREST (Supabase) implementation of [`DataGateway`].

use super::util::{in_list, with_retry};
use crate::core::gateway::DataGateway;
use crate::core::records::{Expense, Product, Transaction, TransactionItem};
use crate::core::report::DateRange;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

/// Upper bound on ids per `in.(...)` filter, keeping URLs short.
const ID_CHUNK: usize = 100;

pub struct SupabaseGateway {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseGateway {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("warmindo/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<R>> {
        let endpoint = format!("{}/rest/v1/{}", self.base_url, table);
        let url = reqwest::Url::parse_with_params(&endpoint, params)
            .with_context(|| format!("Invalid backend URL: {endpoint}"))?;
        debug!("Requesting {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(url.clone())
                    .header("apikey", &self.api_key)
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?
                    .error_for_status()
            },
            3,
            500,
        )
        .await
        .with_context(|| format!("Request for {table} failed"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for {table}"))?;

        serde_json::from_str(&response_text).with_context(|| {
            format!("Failed to parse {table} response. Response: '{response_text}'")
        })
    }

    async fn select_in<R: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        column: &str,
        ids: &[String],
    ) -> Result<Vec<R>> {
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let params = [
                ("select", select.to_string()),
                (column, in_list(chunk)),
            ];
            rows.extend(self.select::<R>(table, &params).await?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl DataGateway for SupabaseGateway {
    async fn fetch_transactions(&self, range: &DateRange) -> Result<Vec<Transaction>> {
        let params = [
            ("select", "id,tanggal,waktu,total_gross,cashier_id".to_string()),
            ("tanggal", format!("gte.{}", range.start())),
            ("tanggal", format!("lte.{}", range.end())),
            ("is_expense", "eq.false".to_string()),
            ("order", "tanggal.desc".to_string()),
        ];
        let rows: Vec<TransactionRow> = self.select("transactions", &params).await?;
        Ok(rows.into_iter().filter_map(TransactionRow::into_record).collect())
    }

    async fn fetch_items(&self, transaction_ids: &[String]) -> Result<Vec<TransactionItem>> {
        let rows: Vec<ItemRow> = self
            .select_in(
                "transaction_items",
                "id,transaction_id,product_id,qty,price_at_time",
                "transaction_id",
                transaction_ids,
            )
            .await?;
        Ok(rows.into_iter().map(ItemRow::into_record).collect())
    }

    async fn fetch_products(&self, product_ids: &[String]) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .select_in("products", "id,name,stock", "id", product_ids)
            .await?;
        Ok(rows.into_iter().map(ProductRow::into_record).collect())
    }

    async fn fetch_inventory(&self) -> Result<Vec<Product>> {
        let params = [
            ("select", "id,name,category,price,stock,updated_at".to_string()),
            ("order", "name.asc".to_string()),
        ];
        let rows: Vec<ProductRow> = self.select("products", &params).await?;
        Ok(rows.into_iter().map(ProductRow::into_record).collect())
    }

    async fn fetch_expenses(&self, range: &DateRange) -> Result<Vec<Expense>> {
        let params = [
            ("select", "*".to_string()),
            ("tanggal", format!("gte.{}", range.start())),
            ("tanggal", format!("lte.{}", range.end())),
        ];
        let rows: Vec<ExpenseRow> = self.select("expenses", &params).await?;
        Ok(rows.into_iter().filter_map(ExpenseRow::into_record).collect())
    }
}

// Wire rows. Numbers may arrive as numbers, numeric strings or null.

#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(default, deserialize_with = "lenient_id")]
    id: String,
    tanggal: Option<String>,
    waktu: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_gross: i64,
    #[serde(default, deserialize_with = "lenient_opt_id")]
    cashier_id: Option<String>,
    #[serde(default)]
    is_expense: Option<bool>,
}

impl TransactionRow {
    fn into_record(self) -> Option<Transaction> {
        let Some(date) = parse_date(self.tanggal.as_deref()) else {
            warn!(id = %self.id, tanggal = ?self.tanggal, "Dropping transaction with invalid date");
            return None;
        };
        Some(Transaction {
            id: self.id,
            date,
            time: self.waktu,
            gross_total: self.total_gross,
            cashier_id: self.cashier_id.filter(|c| !c.is_empty()),
            is_expense: self.is_expense.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    #[serde(default, deserialize_with = "lenient_id")]
    id: String,
    #[serde(default, deserialize_with = "lenient_id")]
    transaction_id: String,
    #[serde(default, deserialize_with = "lenient_opt_id")]
    product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    qty: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    price_at_time: i64,
}

impl ItemRow {
    fn into_record(self) -> TransactionItem {
        TransactionItem {
            id: self.id,
            transaction_id: self.transaction_id,
            product_id: self.product_id,
            quantity: self.qty,
            unit_price_at_time: self.price_at_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default, deserialize_with = "lenient_id")]
    id: String,
    name: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    price: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    stock: Option<i64>,
    updated_at: Option<String>,
}

impl ProductRow {
    fn into_record(self) -> Product {
        Product {
            id: self.id,
            name: self.name.filter(|n| !n.trim().is_empty()),
            category: self.category.filter(|c| !c.is_empty()),
            unit_price: self.price,
            stock_level: self.stock,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    tanggal: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    nominal: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    amount: i64,
    note: Option<String>,
    item_name: Option<String>,
}

impl ExpenseRow {
    fn into_record(self) -> Option<Expense> {
        let Some(date) = parse_date(self.tanggal.as_deref()) else {
            warn!(tanggal = ?self.tanggal, "Dropping expense with invalid date");
            return None;
        };
        // `amount` is the legacy column name.
        let nominal_amount = if self.nominal != 0 {
            self.nominal
        } else {
            self.amount
        };
        Some(Expense {
            date,
            nominal_amount,
            note: self.note,
            item_name: self.item_name,
        })
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64).unwrap_or(0))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64))
}

fn lenient_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_id(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "test-key";

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_transactions_sends_range_filters() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transactions"))
            .and(header("apikey", KEY))
            .and(header("authorization", "Bearer test-key"))
            .and(query_param("tanggal", "gte.2024-01-01"))
            .and(query_param("tanggal", "lte.2024-01-03"))
            .and(query_param("is_expense", "eq.false"))
            .and(query_param("order", "tanggal.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"id": "t2", "tanggal": "2024-01-02", "waktu": "09:00:00", "total_gross": "15000", "cashier_id": "kasir1"},
                    {"id": 7, "tanggal": "2024-01-01", "waktu": null, "total_gross": null, "cashier_id": ""},
                    {"id": "bad", "tanggal": "kemarin", "total_gross": 1000}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let trxs = gateway.fetch_transactions(&range()).await.unwrap();

        assert_eq!(trxs.len(), 2);
        assert_eq!(trxs[0].id, "t2");
        assert_eq!(trxs[0].gross_total, 15_000);
        assert_eq!(trxs[0].cashier_id.as_deref(), Some("kasir1"));
        assert_eq!(trxs[1].id, "7");
        assert_eq!(trxs[1].gross_total, 0);
        assert!(trxs[1].cashier_id.is_none());
        assert!(trxs[1].time.is_none());
    }

    #[tokio::test]
    async fn test_fetch_items_coerces_numbers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transaction_items"))
            .and(query_param("transaction_id", "in.(t1,t2)"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"id": 1, "transaction_id": "t1", "product_id": 10, "qty": "2", "price_at_time": 8000.0},
                    {"id": 2, "transaction_id": "t2", "product_id": null, "qty": null, "price_at_time": "abc"}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let items = gateway
            .fetch_items(&["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();

        assert_eq!(items[0].product_id.as_deref(), Some("10"));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price_at_time, 8_000);
        assert!(items[1].product_id.is_none());
        assert_eq!(items[1].quantity, 0);
        assert_eq!(items[1].unit_price_at_time, 0);
    }

    #[tokio::test]
    async fn test_fetch_products_in_chunks() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("select", "id,name,stock"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"id": "p1", "name": "Es Teh", "stock": null}]"#),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let ids: Vec<String> = (0..150).map(|i| format!("p{i}")).collect();
        let products = gateway.fetch_products(&ids).await.unwrap();

        assert_eq!(products.len(), 2);
        assert!(products[0].stock_level.is_none());
        assert_eq!(products[0].unit_price, 0);
    }

    #[tokio::test]
    async fn test_fetch_expenses_falls_back_to_amount() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/expenses"))
            .and(query_param("select", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"tanggal": "2024-01-02", "nominal": 12000, "note": "Telur"},
                    {"tanggal": "2024-01-03", "amount": "7000", "item_name": "Gas"},
                    {"tanggal": null, "nominal": 1}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let expenses = gateway.fetch_expenses(&range()).await.unwrap();

        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0].nominal_amount, 12_000);
        assert_eq!(expenses[0].label(), Some("Telur"));
        assert_eq!(expenses[1].nominal_amount, 7_000);
        assert_eq!(expenses[1].label(), Some("Gas"));
    }

    #[tokio::test]
    async fn test_fetch_inventory_orders_by_name() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "name.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id": "p1", "name": "Es Teh", "category": "Minuman", "price": "3000", "stock": 12, "updated_at": "2024-01-01T00:00:00Z"}]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let products = gateway.fetch_inventory().await.unwrap();
        assert_eq!(products[0].unit_price, 3_000);
        assert_eq!(products[0].stock_level, Some(12));
        assert_eq!(products[0].category.as_deref(), Some("Minuman"));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/expenses"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let err = gateway.fetch_expenses(&range()).await.unwrap_err();
        assert!(err.to_string().contains("expenses"));
    }

    #[tokio::test]
    async fn test_oversized_totals_still_aggregate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"id": "t1", "tanggal": "2024-01-01", "total_gross": 1e19},
                    {"id": "t2", "tanggal": "2024-01-01", "total_gross": "9300000000000000000"}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let trxs = gateway.fetch_transactions(&range()).await.unwrap();
        assert!(trxs.iter().all(|t| t.gross_total == i64::MAX));

        let ledger = crate::core::report::build_daily_reports(range(), &trxs, &[]);
        let day = ledger
            .get(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(day.income_total, i64::MAX);
        assert_eq!(day.transaction_count, 2);
        assert_eq!(ledger.totals().income, i64::MAX);
    }

    #[tokio::test]
    async fn test_blank_product_name_is_missing() {
        use crate::core::records::{LineItem, TransactionItem, UNKNOWN_MENU};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id": "p1", "name": "", "stock": 3}, {"id": "p2", "name": "   ", "stock": 1}]"#,
            ))
            .mount(&mock_server)
            .await;

        let gateway = SupabaseGateway::new(&mock_server.uri(), KEY).unwrap();
        let products = gateway
            .fetch_products(&["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();
        assert!(products.iter().all(|p| p.name.is_none()));
        assert_eq!(products[0].display_name(), "-");

        let lines: Vec<LineItem> = products
            .into_iter()
            .map(|product| LineItem {
                item: TransactionItem {
                    id: format!("i-{}", product.id),
                    transaction_id: "t1".to_string(),
                    product_id: Some(product.id.clone()),
                    quantity: 1,
                    unit_price_at_time: 8_000,
                },
                product: Some(product),
            })
            .collect();
        let stats = crate::core::report::build_product_stats(&lines);
        let buckets: Vec<_> = stats
            .ranked()
            .iter()
            .map(|s| s.product_name.clone())
            .collect();
        assert_eq!(buckets, vec![UNKNOWN_MENU.to_string()]);
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(
            parse_date(Some("2024-01-05T10:00:00+07:00")),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(parse_date(Some("05/01/2024")), None);
        assert_eq!(parse_date(None), None);
    }
}
