//! Configuration management for Shelfwise services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The CDL vendor cutoff date is deliberately NOT part of the process
//! config: it is mutable at runtime through the admin endpoint, so it lives
//! behind [`CutoffProvider`], which re-reads its backing file on an explicit
//! `reload()` instead of being captured once at startup.

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::errors::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Report configuration
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Sublibrary code identifying the Shanghai campus in order rows
    #[serde(default = "default_campus_code")]
    pub campus_code: String,

    /// Order-type code used by the Shanghai report's material filter
    #[serde(default = "default_material_code")]
    pub material_code: String,

    /// Path of the JSON file holding the mutable CDL vendor cutoff date
    #[serde(default = "default_cutoff_path")]
    pub cutoff_path: PathBuf,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "shelfwise".to_string() }
fn default_campus_code() -> String { "XS".to_string() }
fn default_material_code() -> String { "MN".to_string() }
fn default_cutoff_path() -> PathBuf { PathBuf::from("config/cdl_cutoff.json") }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/shelfwise".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            report: ReportConfig {
                campus_code: default_campus_code(),
                material_code: default_material_code(),
                cutoff_path: default_cutoff_path(),
            },
        }
    }
}

/// On-disk shape of the cutoff file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CutoffFile {
    cdl_vendor_cutoff: NaiveDate,
}

/// Provider for the CDL vendor cutoff date.
///
/// The cutoff scopes the `avg_cdl_scan_days` threshold and the overview
/// aggregates. It can be changed at runtime through the admin endpoint, so
/// every consumer reads it through this provider rather than caching it.
#[derive(Debug)]
pub struct CutoffProvider {
    path: PathBuf,
    current: RwLock<NaiveDate>,
}

impl CutoffProvider {
    /// Fallback cutoff used when the backing file does not exist yet
    pub fn default_cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid date")
    }

    /// Load the provider from its backing file, creating the default when
    /// the file is missing
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let date = Self::read_file(&path).await?.unwrap_or_else(Self::default_cutoff);
        Ok(Self {
            path,
            current: RwLock::new(date),
        })
    }

    async fn read_file(path: &Path) -> Result<Option<NaiveDate>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let parsed: CutoffFile = serde_json::from_slice(&bytes)?;
                Ok(Some(parsed.cdl_vendor_cutoff))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Configuration {
                message: format!("failed to read cutoff file: {}", e),
            }),
        }
    }

    /// The current cutoff date
    pub async fn get(&self) -> NaiveDate {
        *self.current.read().await
    }

    /// Re-read the backing file; missing file keeps the current value
    pub async fn reload(&self) -> Result<NaiveDate> {
        if let Some(date) = Self::read_file(&self.path).await? {
            *self.current.write().await = date;
        }
        Ok(*self.current.read().await)
    }

    /// Persist a new cutoff date and make it visible to readers
    pub async fn set(&self, date: NaiveDate) -> Result<()> {
        let body = serde_json::to_vec_pretty(&CutoffFile {
            cdl_vendor_cutoff: date,
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        *self.current.write().await = date;
        tracing::info!(cutoff = %date, "CDL vendor cutoff updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.report.campus_code, "XS");
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/shelfwise");
    }

    #[tokio::test]
    async fn test_cutoff_defaults_when_file_missing() {
        let provider = CutoffProvider::load("/nonexistent/cdl_cutoff.json")
            .await
            .unwrap();
        assert_eq!(provider.get().await, CutoffProvider::default_cutoff());
    }

    #[tokio::test]
    async fn test_cutoff_set_and_reload() {
        let dir = std::env::temp_dir().join("shelfwise-cutoff-test");
        let path = dir.join("cdl_cutoff.json");
        let _ = tokio::fs::remove_file(&path).await;

        let provider = CutoffProvider::load(&path).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
        provider.set(date).await.unwrap();
        assert_eq!(provider.get().await, date);

        // A second provider sees the persisted value
        let reread = CutoffProvider::load(&path).await.unwrap();
        assert_eq!(reread.get().await, date);

        // reload() picks up external edits
        let newer = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        tokio::fs::write(
            &path,
            serde_json::to_vec(&CutoffFile {
                cdl_vendor_cutoff: newer,
            })
            .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(provider.reload().await.unwrap(), newer);
    }
}
