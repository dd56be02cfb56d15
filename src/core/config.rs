use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_seconds() -> u64 {
    15
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Display currency all valuations are converted to.
    pub currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Attempts per fetch before a rate-limited ticker is abandoned.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff sleep is this many seconds times the attempt number.
    #[serde(default = "default_backoff_base_seconds")]
    pub backoff_base_seconds: u64,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "navtrack", "navtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "navtrack", "navtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Directory holding one CSV price series per provider ticker.
    pub fn prices_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("prices"))
    }

    /// Directory backing the cross-request key-value cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("cache"))
    }

    pub fn transactions_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("transactions.json"))
    }

    pub fn dividends_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("dividends.json"))
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "AUD"
data_path: "/tmp/navtrack-test"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
max_retries: 5
backoff_base_seconds: 1
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "AUD");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_seconds, 1);
        assert_eq!(config.yahoo_base_url(), "http://example.com/yahoo");
        assert_eq!(
            config.prices_dir().unwrap(),
            PathBuf::from("/tmp/navtrack-test/prices")
        );
        assert_eq!(
            config.transactions_path().unwrap(),
            PathBuf::from("/tmp/navtrack-test/transactions.json")
        );
    }

    #[test]
    fn test_config_defaults() {
        let yaml_str = r#"
currency: "USD"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base_seconds, 15);
        assert_eq!(
            config.yahoo_base_url(),
            "https://query1.finance.yahoo.com"
        );
    }
}
