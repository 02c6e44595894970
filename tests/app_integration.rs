use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::info;
use warmindo::cli::assets::AssetAction;
use warmindo::cli::report::ReportOptions;
use warmindo::cli::stock::StockOptions;
use warmindo::cli::transactions::TransactionOptions;
use warmindo::core::inventory::{StockFilter, StockSort};
use warmindo::{AppCommand, RangeArgs};

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const API_KEY: &str = "anon-test-key";

    const TRANSACTIONS: &str = r#"[
        {"id": "trx-0002", "tanggal": "2024-01-02", "waktu": "12:10:00", "total_gross": 24000, "cashier_id": "kasir2"},
        {"id": "trx-0001", "tanggal": "2024-01-01", "waktu": "08:00:00", "total_gross": "50000", "cashier_id": "kasir1"}
    ]"#;

    const ITEMS: &str = r#"[
        {"id": 1, "transaction_id": "trx-0001", "product_id": "p1", "qty": 2, "price_at_time": 8000},
        {"id": 2, "transaction_id": "trx-0001", "product_id": "p2", "qty": 4, "price_at_time": 8500},
        {"id": 3, "transaction_id": "trx-0002", "product_id": "p1", "qty": 3, "price_at_time": 8000}
    ]"#;

    const PRODUCTS: &str = r#"[
        {"id": "p1", "name": "Indomie Goreng", "stock": 12},
        {"id": "p2", "name": "Es Teh Manis", "stock": null}
    ]"#;

    const INVENTORY: &str = r#"[
        {"id": "p2", "name": "Es Teh Manis", "category": "Minuman", "price": 3000, "stock": null, "updated_at": null},
        {"id": "p1", "name": "Indomie Goreng", "category": "Makanan", "price": "8000", "stock": 12, "updated_at": "2024-01-01T00:00:00Z"},
        {"id": "p3", "name": "Kopi Hitam", "category": "Minuman", "price": 4000, "stock": 7, "updated_at": null}
    ]"#;

    const EXPENSES: &str = r#"[
        {"tanggal": "2024-01-01", "nominal": 40000, "note": "Belanja sayur"},
        {"tanggal": "2024-01-03", "amount": 15000, "item_name": "Gas"}
    ]"#;

    async fn mount(server: &MockServer, table: &str, response: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{table}")))
            .and(header("apikey", API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_string(response.to_string()))
            .mount(server)
            .await;
    }

    pub async fn create_backend() -> MockServer {
        let server = MockServer::start().await;
        mount(&server, "transactions", TRANSACTIONS).await;
        mount(&server, "transaction_items", ITEMS).await;
        mount(&server, "expenses", EXPENSES).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("select", "id,name,stock"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCTS))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "name.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INVENTORY))
            .mount(&server)
            .await;
        server
    }

    pub async fn create_failing_backend() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        server
    }

    pub async fn create_asset_origin() -> MockServer {
        let server = MockServer::start().await;
        for (asset, body) in [("/index.html", "<h1>Warmindo</h1>"), ("/owner.html", "<h1>Owner</h1>")] {
            Mock::given(method("GET"))
                .and(path(asset))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }
        server
    }
}

fn write_config(dir: &Path, backend_uri: &str, extra: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
backend:
  base_url: "{backend_uri}"
  api_key: "{key}"
store_name: "Warmindo Uji"
data_path: "{data}"
export_dir: "{exports}"
{extra}
"#,
        key = test_utils::API_KEY,
        data = dir.join("data").display(),
        exports = dir.join("exports").display(),
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

fn first_week() -> RangeArgs {
    RangeArgs {
        start: NaiveDate::from_ymd_opt(2024, 1, 1),
        end: NaiveDate::from_ymd_opt(2024, 1, 7),
    }
}

#[test_log::test(tokio::test)]
async fn test_report_flow_with_exports() {
    let backend = test_utils::create_backend().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &backend.uri(), "");

    let result = warmindo::run_command(
        AppCommand::Report {
            range: first_week(),
            options: ReportOptions {
                excel: true,
                pdf: true,
                out_dir: None,
            },
        },
        Some(&config_path),
    )
    .await;
    assert!(
        result.is_ok(),
        "Report command failed with: {:?}",
        result.err()
    );

    let exports = dir.path().join("exports");
    let xlsx = fs::read(exports.join("Laporan_Owner_2024-01-01.xlsx")).unwrap();
    assert_eq!(&xlsx[..2], b"PK");
    let pdf = fs::read(exports.join("Laporan_Keuangan_2024-01-01_2024-01-07.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test_log::test(tokio::test)]
async fn test_transactions_flow_exports_items() {
    let backend = test_utils::create_backend().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &backend.uri(), "");

    let result = warmindo::run_command(
        AppCommand::Transactions {
            range: first_week(),
            options: TransactionOptions {
                search: Some("es teh".to_string()),
                cashier: Some("kasir1".to_string()),
                expand: vec!["trx-0001".to_string()],
                csv: Some("trx-0001".to_string()),
                out_dir: None,
            },
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Transactions failed with: {:?}", result.err());

    let csv = fs::read_to_string(dir.path().join("exports").join("transaksi_trx-0001.csv")).unwrap();
    info!(%csv, "Exported transaction");
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].contains("\"Indomie Goreng\""));
    assert!(rows[2].contains("\"Es Teh Manis\",\"4\",\"8500\",\"34000\",\"\""));
}

#[test_log::test(tokio::test)]
async fn test_stock_flow_exports_visible_list() {
    let backend = test_utils::create_backend().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &backend.uri(), "");

    let result = warmindo::run_command(
        AppCommand::Stock(StockOptions {
            filter: StockFilter {
                query: None,
                category: Some("Minuman".to_string()),
                sort: Some(StockSort::PriceDesc),
            },
            csv: true,
            product: None,
            out_dir: None,
        }),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Stock failed with: {:?}", result.err());

    let exported: Vec<_> = fs::read_dir(dir.path().join("exports"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(exported.len(), 1);
    let name = exported[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("stok_produk_"), "unexpected file {name}");

    let csv = fs::read_to_string(&exported[0]).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "\"ID\",\"Nama\",\"Kategori\",\"Harga\",\"Stok\"");
    assert_eq!(rows[1], "\"p3\",\"Kopi Hitam\",\"Minuman\",\"4000\",\"7\"");
    assert_eq!(rows[2], "\"p2\",\"Es Teh Manis\",\"Minuman\",\"3000\",\"\"");
}

#[test_log::test(tokio::test)]
async fn test_backend_failure_is_fatal() {
    let backend = test_utils::create_failing_backend().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &backend.uri(), "");

    let result = warmindo::run_command(
        AppCommand::Report {
            range: first_week(),
            options: ReportOptions::default(),
        },
        Some(&config_path),
    )
    .await;

    let err = result.expect_err("Report should fail when the backend is down");
    assert_eq!(
        err.to_string(),
        "Gagal memuat data. Cek koneksi internet dan konfigurasi backend."
    );
    assert!(!dir.path().join("exports").exists());
}

#[test_log::test(tokio::test)]
async fn test_asset_cache_flow() {
    let origin = test_utils::create_asset_origin().await;
    let dir = tempfile::TempDir::new().unwrap();
    let assets = |version: &str| {
        format!(
            "assets:\n  cache_name: \"{version}\"\n  base_url: \"{}\"\n  urls: [\"/index.html\", \"/missing.js\"]\n",
            origin.uri()
        )
    };

    let v1 = write_config(dir.path(), "http://localhost:9", &assets("warmindo-dipo-v1"));
    warmindo::run_command(AppCommand::Assets(AssetAction::Install), Some(&v1))
        .await
        .unwrap();

    let out = dir.path().join("index.html");
    warmindo::run_command(
        AppCommand::Assets(AssetAction::Get {
            path: "/index.html".to_string(),
            out: Some(out.clone()),
        }),
        Some(&v1),
    )
    .await
    .unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "<h1>Warmindo</h1>");

    let v2 = write_config(dir.path(), "http://localhost:9", &assets("warmindo-dipo-v2"));
    warmindo::run_command(AppCommand::Assets(AssetAction::Install), Some(&v2))
        .await
        .unwrap();
    warmindo::run_command(AppCommand::Assets(AssetAction::Prune), Some(&v2))
        .await
        .unwrap();

    let store = warmindo::store::AssetStore::open(&dir.path().join("data").join("assets")).unwrap();
    assert_eq!(store.versions().unwrap(), vec!["warmindo-dipo-v2".to_string()]);
}
