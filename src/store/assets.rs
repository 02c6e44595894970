//! Versioned on-disk cache of the dashboard's static assets.
//!
//! Every cache version lives in its own fjall partition. A manifest
//! partition remembers which versions were ever opened so that old ones can
//! be pruned once a new version takes over.

use crate::providers::util::with_retry;
use anyhow::{Context, Result, bail};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use futures::future::join_all;
use std::path::Path;
use tracing::{debug, info, warn};

const MANIFEST: &str = "manifest";
const VERSIONS_KEY: &str = "versions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Network,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub stored: Vec<String>,
    pub failed: Vec<String>,
}

/// Handle on the asset keyspace.
#[derive(Clone)]
pub struct AssetStore {
    keyspace: Keyspace,
    manifest: PartitionHandle,
}

impl AssetStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let keyspace = Config::new(dir)
            .open()
            .with_context(|| format!("Failed to open asset store at {}", dir.display()))?;
        let manifest = keyspace
            .open_partition(MANIFEST, PartitionCreateOptions::default())
            .context("Failed to open asset manifest")?;
        Ok(Self { keyspace, manifest })
    }

    /// Opens (creating if needed) the cache for version `cache_name`.
    pub fn cache(&self, cache_name: &str, base_url: &str) -> Result<AssetCache> {
        let version = partition_name(cache_name)?;
        let partition = self
            .keyspace
            .open_partition(&version, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open asset cache {version}"))?;
        self.record_version(&version)?;
        Ok(AssetCache {
            store: self.clone(),
            partition,
            version,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Every version recorded in the manifest, oldest first.
    pub fn versions(&self) -> Result<Vec<String>> {
        match self.manifest.get(VERSIONS_KEY)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).context("Corrupt asset manifest")
            }
            None => Ok(Vec::new()),
        }
    }

    fn write_versions(&self, versions: &[String]) -> Result<()> {
        self.manifest
            .insert(VERSIONS_KEY, serde_json::to_vec(versions)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn record_version(&self, version: &str) -> Result<()> {
        let mut versions = self.versions()?;
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
            self.write_versions(&versions)?;
        }
        Ok(())
    }

    /// Deletes every recorded version except `current`. Returns the deleted
    /// version names.
    pub fn prune(&self, current: &str) -> Result<Vec<String>> {
        let current = partition_name(current)?;
        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for version in self.versions()? {
            if version == current {
                kept.push(version);
                continue;
            }
            let handle = self
                .keyspace
                .open_partition(&version, PartitionCreateOptions::default())?;
            self.keyspace
                .delete_partition(handle)
                .with_context(|| format!("Failed to delete asset cache {version}"))?;
            info!(version = %version, "Deleted old asset cache");
            removed.push(version);
        }
        self.write_versions(&kept)?;
        Ok(removed)
    }
}

/// One cache version, keyed by asset path.
pub struct AssetCache {
    store: AssetStore,
    partition: PartitionHandle,
    version: String,
    base_url: String,
    client: reqwest::Client,
}

impl AssetCache {
    pub fn version(&self) -> &str {
        &self.version
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        debug!("Requesting {}", url);
        let response = with_retry(
            || async { self.client.get(&url).send().await?.error_for_status() },
            1,
            200,
        )
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;
        Ok(body.to_vec())
    }

    /// Fetches and stores every path. A path that cannot be fetched is
    /// skipped; the rest are still stored.
    pub async fn install(&self, paths: &[String]) -> Result<InstallReport> {
        let downloads = paths
            .iter()
            .map(|path| async move { (path.clone(), self.download(path).await) });
        let results = join_all(downloads).await;

        let mut report = InstallReport::default();
        for (path, result) in results {
            match result {
                Ok(body) => {
                    self.partition
                        .insert(path.as_str(), body)
                        .with_context(|| format!("Failed to store asset {path}"))?;
                    report.stored.push(path);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Could not pre-cache asset");
                    report.failed.push(path);
                }
            }
        }
        self.store.keyspace.persist(PersistMode::SyncAll)?;
        info!(
            version = %self.version,
            stored = report.stored.len(),
            failed = report.failed.len(),
            "Asset cache installed"
        );
        Ok(report)
    }

    pub fn cached(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.partition.get(path)?.map(|bytes| bytes.to_vec()))
    }

    /// Cache first, then network. Network responses are not stored.
    pub async fn get(&self, path: &str) -> Result<(Vec<u8>, AssetSource)> {
        if let Some(body) = self.cached(path)? {
            debug!("Asset cache HIT for {}", path);
            return Ok((body, AssetSource::Cache));
        }
        debug!("Asset cache MISS for {}", path);
        let body = self
            .download(path)
            .await
            .with_context(|| format!("Asset {path} is neither cached nor reachable"))?;
        Ok((body, AssetSource::Network))
    }
}

/// Partition names allow `[A-Za-z0-9_.#$-]` only.
fn partition_name(cache_name: &str) -> Result<String> {
    let name: String = cache_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '#' | '$') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name == MANIFEST {
        bail!("Invalid asset cache name: '{cache_name}'");
    }
    Ok(name)
}
