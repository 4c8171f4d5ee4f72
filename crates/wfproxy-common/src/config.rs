//! ---
//! wfp_section: "01-core-functionality"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "TOML configuration for the proxy runtime."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Largest frame body accepted unless configured otherwise (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

fn default_library_address() -> String {
    "127.0.0.1".to_owned()
}

fn default_library_port() -> u16 {
    7933
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the proxy runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "WFPROXY_CONFIG";

    /// Load configuration from disk, respecting the `WFPROXY_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.proxy.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the workflow library listens and how the proxy talks to it.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_library_address")]
    pub library_address: String,
    #[serde(default = "default_library_port")]
    pub library_port: u16,
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            library_address: default_library_address(),
            library_port: default_library_port(),
            request_timeout: default_request_timeout(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.library_address.trim().is_empty() {
            return Err(anyhow!("proxy.library_address must not be empty"));
        }
        if self.library_port == 0 {
            return Err(anyhow!("proxy.library_port must be non-zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("proxy.request_timeout must be at least one second"));
        }
        if self.max_frame_size == 0 || self.max_frame_size > u32::MAX as usize {
            return Err(anyhow!(
                "proxy.max_frame_size must be between 1 and {} bytes",
                u32::MAX
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.proxy.library_address, "127.0.0.1");
        assert_eq!(config.proxy.library_port, 7933);
        assert_eq!(config.proxy.request_timeout, Duration::from_secs(30));
        assert_eq!(config.proxy.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = r#"
            [proxy]
            library_address = "10.0.0.5"
            library_port = 9000
            request_timeout = 5
            max_frame_size = 4096

            [logging]
            directory = "/tmp/wfproxy"
            format = "pretty"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.proxy.library_address, "10.0.0.5");
        assert_eq!(config.proxy.library_port, 9000);
        assert_eq!(config.proxy.request_timeout, Duration::from_secs(5));
        assert_eq!(config.proxy.max_frame_size, 4096);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!("[proxy]\nlibrary_port = 0".parse::<AppConfig>().is_err());
        assert!("[proxy]\nlibrary_address = \" \"".parse::<AppConfig>().is_err());
        assert!("[proxy]\nrequest_timeout = 0".parse::<AppConfig>().is_err());
        assert!("[proxy]\nmax_frame_size = 0".parse::<AppConfig>().is_err());
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("proxy.toml");
        let mut file = fs::File::create(&present).unwrap();
        writeln!(file, "[proxy]\nlibrary_port = 7000").unwrap();

        let missing = dir.path().join("missing.toml");
        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.proxy.library_port, 7000);
    }

    #[test]
    fn load_reports_inspected_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere.toml");
        let err = AppConfig::load(&[&missing]).unwrap_err();
        assert!(err.to_string().contains("nowhere.toml"));
    }
}
