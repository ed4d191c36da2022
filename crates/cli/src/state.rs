use std::time::Duration;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use common::gateway::{GatewayRegistry, RegistryError, DEFAULT_GATEWAYS};
use common::loader::{
    FailoverPolicy, FetchError, HttpFetcher, DEFAULT_FAILOVER_MARKERS, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY,
};
use common::metadata::MetadataDecoder;

pub const APP_NAME: &str = "ballot";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway base URLs, most dedicated first
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,
    /// Automatic failovers per load (defaults to one per remaining gateway)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
    /// Pause before failing over after a content-class error
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Timeout for HEAD accessibility checks
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// HEAD-check each gateway before fetching
    #[serde(default)]
    pub precheck: bool,
    /// Error message fragments that mark a failure as gateway-specific
    #[serde(default = "default_failover_markers")]
    pub failover_markers: Vec<String>,
    /// Backend URL prefixes that may wrap metadata data URIs
    #[serde(default)]
    pub metadata_hosts: Vec<String>,
}

fn default_gateways() -> Vec<String> {
    DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_failover_markers() -> Vec<String> {
    DEFAULT_FAILOVER_MARKERS.iter().map(|m| m.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateways: default_gateways(),
            max_retries: None,
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            precheck: false,
            failover_markers: default_failover_markers(),
            metadata_hosts: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn registry(&self) -> Result<GatewayRegistry, RegistryError> {
        GatewayRegistry::new(&self.gateways)
    }

    pub fn policy(&self) -> FailoverPolicy {
        FailoverPolicy::default()
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_precheck(self.precheck)
            .with_markers(&self.failover_markers)
    }

    pub fn fetcher(&self) -> Result<HttpFetcher, FetchError> {
        HttpFetcher::with_timeouts(
            Duration::from_millis(self.request_timeout_ms),
            Duration::from_millis(self.probe_timeout_ms),
        )
    }

    pub fn decoder(&self) -> MetadataDecoder {
        MetadataDecoder::new(self.metadata_hosts.iter().cloned())
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the ballot directory (~/.ballot)
    pub ballot_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the ballot directory path (custom or default ~/.ballot)
    pub fn ballot_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Write a new config file, refusing to overwrite an existing one
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let ballot_dir = Self::ballot_dir(custom_path)?;
        let config_path = ballot_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        // fail before touching disk if the gateway list is unusable
        config.registry()?;

        fs::create_dir_all(&ballot_dir)?;
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            ballot_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the ballot directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let ballot_dir = Self::ballot_dir(custom_path)?;
        let config_path = ballot_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            ballot_dir,
            config_path,
            config,
        })
    }

    /// Load state, falling back to defaults when nothing was initialized
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) => {
                let ballot_dir = Self::ballot_dir(custom_path)?;
                tracing::debug!(
                    dir = %ballot_dir.display(),
                    "no config found, using defaults"
                );
                Ok(Self {
                    config_path: ballot_dir.join(CONFIG_FILE_NAME),
                    ballot_dir,
                    config: AppConfig::default(),
                })
            }
            other => other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ballot config not initialized. Run 'ballot init' first")]
    NotInitialized,

    #[error("ballot config already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("invalid gateway list: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
