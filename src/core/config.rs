use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable consulted when `backend.api_key` is not set.
pub const API_KEY_ENV: &str = "WARMINDO_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`.
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl BackendConfig {
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(API_KEY_ENV).with_context(|| {
            format!("No backend api_key configured and {API_KEY_ENV} is not set")
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_days")]
    pub default_days: u32,
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,
}

fn default_days() -> u32 {
    30
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            default_days: default_days(),
            search_debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetsConfig {
    /// Versioned cache name. Bump it to roll out a new asset set.
    pub cache_name: String,
    pub base_url: Option<String>,
    pub urls: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        AssetsConfig {
            cache_name: "warmindo-dipo-v1".to_string(),
            base_url: None,
            urls: [
                "/",
                "/index.html",
                "/kasir.html",
                "/owner.html",
                "/history.html",
                "/css/style.css",
                "/js/config.js",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

fn default_store_name() -> String {
    "Warmindo Diponegoro".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default = "default_store_name")]
    pub store_name: String,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    pub data_path: Option<String>,
    pub export_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("id", "warmindo", "warmindo")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Where exports land unless a command overrides it.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
