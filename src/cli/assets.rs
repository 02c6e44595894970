use super::ui;
use crate::core::config::AppConfig;
use crate::store::{AssetSource, AssetStore};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum AssetAction {
    /// Pre-cache every configured asset into the current version.
    Install,
    /// Print (or save) one asset, cache first.
    Get { path: String, out: Option<PathBuf> },
    /// Drop every cache version except the current one.
    Prune,
}

pub async fn run(config: &AppConfig, action: &AssetAction) -> Result<()> {
    let store = AssetStore::open(&config.data_dir()?.join("assets"))?;
    let base_url = || {
        config
            .assets
            .base_url
            .as_deref()
            .context("assets.base_url is not configured")
    };

    match action {
        AssetAction::Install => {
            let cache = store.cache(&config.assets.cache_name, base_url()?)?;
            let report = cache.install(&config.assets.urls).await?;
            println!(
                "{} aset disimpan ke {}",
                report.stored.len(),
                ui::style_text(cache.version(), ui::StyleType::TotalLabel)
            );
            for path in &report.failed {
                ui::print_error(&format!("Gagal menyimpan {path}"));
            }
        }
        AssetAction::Get { path, out } => {
            let cache = store.cache(&config.assets.cache_name, base_url()?)?;
            let (body, source) = cache.get(path).await?;
            let origin = match source {
                AssetSource::Cache => "cache",
                AssetSource::Network => "jaringan",
            };
            match out {
                Some(out) => {
                    std::fs::write(out, &body)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    println!("{} ({origin})", out.display());
                }
                None => {
                    std::io::stdout()
                        .write_all(&body)
                        .context("Failed to write asset to stdout")?;
                    eprintln!("{}", ui::style_text(&format!("({origin})"), ui::StyleType::Subtle));
                }
            }
        }
        AssetAction::Prune => {
            let removed = store.prune(&config.assets.cache_name)?;
            if removed.is_empty() {
                ui::print_notice("Tidak ada cache lama");
            }
            for version in removed {
                println!("Dihapus: {version}");
            }
        }
    }
    Ok(())
}
