use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub listing: ListingConfig,
}

/// The local document store: a directory of rule files, consumed
/// read-only and never cached.
#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// Path to the JSON source registry. Loaded fail-soft: a missing or
    /// malformed registry degrades to zero remote sources.
    #[serde(default = "default_sources_path")]
    pub sources: PathBuf,
    /// Per-request timeout for remote fetches.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            sources: default_sources_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sources_path() -> PathBuf {
    PathBuf::from("data/sources.json")
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// SQLite file backing the shared cache store.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Time-to-live for cached remote fetches.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/cache.sqlite")
}

/// 12 hours, matching the default remote-fetch cadence.
fn default_ttl_secs() -> u64 {
    60 * 60 * 12
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }

    if config.listing.page_size == 0 {
        anyhow::bail!("listing.page_size must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[local]\nroot = \"data/rules/manual\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.local.include_globs, vec!["*.md"]);
        assert_eq!(config.cache.ttl_secs, 43200);
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.listing.page_size, 20);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[local]\nroot = \"r\"\n\n[remote]\ntimeout_secs = 0"
        )
        .unwrap();

        assert!(load_config(file.path()).is_err());
    }
}
