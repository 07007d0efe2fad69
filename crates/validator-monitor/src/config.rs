//! Monitor configuration.
//!
//! Settings are read from a YAML file. Every section has defaults, so an
//! empty file yields a working (if quiet) configuration. When the requested
//! file does not exist, the `-example` sibling (`config.yaml` →
//! `config-example.yaml`) is used instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Placeholder in [`ApiConfig::endpoint`] replaced with the validator address.
pub const VALIDATOR_ADDRESS_PLACEHOLDER: &str = "{validator_address}";

/// Placeholder in link templates replaced with the validator address.
pub const ADDRESS_PLACEHOLDER: &str = "{address}";

/// Placeholder in [`ReportConfig::output_file`] replaced with the cycle start time.
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Upper bound for every timing setting, in seconds (one week).
pub const MAX_DURATION_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Seconds to `Duration`, clamped to `0..=MAX_DURATION_SECS`.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DURATION_SECS)).unwrap_or(Duration::ZERO)
}

fn check_seconds(name: &str, secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && (0.0..=MAX_DURATION_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be between 0 and {MAX_DURATION_SECS} seconds, got {secs}"
        )))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

/// Top level monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Concurrent account evaluations per cycle (1 = sequential)
    pub threads: usize,
    /// CSV file listing the validators to monitor
    pub accounts_file: PathBuf,
    /// Attestation success rate (percent) below which an alert is raised
    pub attestation_success_threshold: f64,
    pub proxy: ProxyConfig,
    pub requests: RequestsConfig,
    pub api: ApiConfig,
    pub explorer: ExplorerConfig,
    pub links: LinksConfig,
    pub report: ReportConfig,
    pub cycle: CycleConfig,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            accounts_file: PathBuf::from("user_data/accounts.csv"),
            attestation_success_threshold: 90.0,
            proxy: ProxyConfig::default(),
            requests: RequestsConfig::default(),
            api: ApiConfig::default(),
            explorer: ExplorerConfig::default(),
            links: LinksConfig::default(),
            report: ReportConfig::default(),
            cycle: CycleConfig::default(),
        }
    }
}

/// Proxy settings for outbound requests.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub mobile_proxy: Option<MobileProxyConfig>,
}

impl ProxyConfig {
    /// Proxy URL to use, if the proxy is enabled and filled in.
    pub fn url(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.mobile_proxy
            .as_ref()
            .filter(|proxy| !proxy.is_placeholder())
            .map(MobileProxyConfig::url)
    }
}

/// Credentials for a mobile proxy endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MobileProxyConfig {
    #[serde(default = "default_proxy_scheme")]
    pub scheme: String,
    pub address: String,
    pub port: u16,
    pub login: String,
    pub password: String,
}

fn default_proxy_scheme() -> String {
    "http".to_string()
}

impl MobileProxyConfig {
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}",
            self.scheme, self.login, self.password, self.address, self.port
        )
    }

    /// The example config ships `log:pass@ip`; treat that as "no proxy".
    pub fn is_placeholder(&self) -> bool {
        self.address.trim().is_empty()
            || (self.address == "ip" && self.login == "log" && self.password == "pass")
    }
}

/// HTTP client behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestsConfig {
    /// Per-request timeout in seconds
    pub timeout: f64,
    /// Attempts per data-source call (including the first one)
    pub retries: u32,
    /// Pause after every request, in seconds
    pub delay_between_requests: f64,
    /// Lower bound of the random pause between attempts, in seconds
    pub backoff_min: f64,
    /// Upper bound of the random pause between attempts, in seconds
    pub backoff_max: f64,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            timeout: 30.0,
            retries: 3,
            delay_between_requests: 0.0,
            backoff_min: 1.0,
            backoff_max: 5.0,
        }
    }
}

impl RequestsConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout)
    }

    pub fn delay_between_requests(&self) -> Duration {
        seconds(self.delay_between_requests)
    }

    pub fn backoff_min(&self) -> Duration {
        seconds(self.backoff_min)
    }

    pub fn backoff_max(&self) -> Duration {
        seconds(self.backoff_max)
    }
}

/// Dashboard API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Validator endpoint, relative to `base_url`
    pub endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashtec.xyz/api".to_string(),
            endpoint: "/validators/{validator_address}".to_string(),
        }
    }
}

/// Public explorer used for the network height.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            url: "https://api.testnet.aztecscan.xyz/v1/temporary-api-key/l2/ui/blocks-for-table"
                .to_string(),
        }
    }
}

/// Reference links attached to alerts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinksConfig {
    pub dashboard: String,
    pub explorer: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            dashboard: "https://dashtec.xyz/validators/{address}".to_string(),
            explorer: "https://sepolia.etherscan.io/address/{address}".to_string(),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_file: "user_data/reports/{timestamp}.csv".to_string(),
        }
    }
}

/// Continuous monitoring behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Keep cycling; when false a single pass is made
    pub enabled: bool,
    /// Pause between cycles (0 = none)
    pub sleep_minutes: f64,
    /// Stop after this many cycles (0 = unbounded)
    pub max_cycles: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sleep_minutes: 15.0,
            max_cycles: 0,
        }
    }
}

impl CycleConfig {
    pub fn sleep(&self) -> Duration {
        seconds(self.sleep_minutes * 60.0)
    }
}

/// Telegram notification settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_api_token: String,
    pub chat_id: String,
    pub thread_id: Option<i64>,
}

/// Log file location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("log"),
            file_name: "main.log".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to its `-example` sibling.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = if path.exists() {
            path.to_path_buf()
        } else {
            let example = example_path(path);
            if !example.exists() {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                });
            }
            warn!(
                requested = %path.display(),
                fallback = %example.display(),
                "Config file not found, using example config"
            );
            example
        };

        let content = std::fs::read_to_string(&source).map_err(|e| ConfigError::Read {
            path: source.clone(),
            source: e,
        })?;

        let settings = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { source: err, .. } => ConfigError::Parse {
                path: source.clone(),
                source: err,
            },
            other => other,
        })?;

        info!(path = %source.display(), "Loaded configuration");
        Ok(settings)
    }

    /// Parse and validate settings from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null; treat it as all defaults.
        let mut settings: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: PathBuf::new(),
                source: e,
            })?
        };
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    fn normalize(&mut self) {
        if self.monitoring.threads == 0 {
            self.monitoring.threads = 1;
        }
    }

    /// Check value ranges and cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let monitoring = &self.monitoring;

        if !(0.0..=100.0).contains(&monitoring.attestation_success_threshold) {
            return Err(ConfigError::Invalid(format!(
                "attestation_success_threshold must be within 0..=100, got {}",
                monitoring.attestation_success_threshold
            )));
        }

        let requests = &monitoring.requests;
        check_seconds("requests.timeout", requests.timeout)?;
        if requests.timeout <= 0.0 {
            return Err(ConfigError::Invalid(
                "requests.timeout must be a positive number of seconds".to_string(),
            ));
        }
        if requests.retries == 0 {
            return Err(ConfigError::Invalid(
                "requests.retries must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("requests.delay_between_requests", requests.delay_between_requests),
            ("requests.backoff_min", requests.backoff_min),
            ("requests.backoff_max", requests.backoff_max),
        ] {
            check_seconds(name, value)?;
        }
        if requests.backoff_min > requests.backoff_max {
            return Err(ConfigError::Invalid(format!(
                "requests.backoff_min ({}) is greater than requests.backoff_max ({})",
                requests.backoff_min, requests.backoff_max
            )));
        }

        if !monitoring.api.endpoint.contains(VALIDATOR_ADDRESS_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "api.endpoint must contain {VALIDATOR_ADDRESS_PLACEHOLDER}"
            )));
        }

        if monitoring.report.output_file.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "report.output_file must not be empty".to_string(),
            ));
        }

        let sleep = monitoring.cycle.sleep_minutes;
        let max_minutes = MAX_DURATION_SECS / 60.0;
        if !(sleep.is_finite() && (0.0..=max_minutes).contains(&sleep)) {
            return Err(ConfigError::Invalid(format!(
                "cycle.sleep_minutes must be between 0 and {max_minutes}, got {sleep}"
            )));
        }

        if self.telegram.enabled
            && (self.telegram.bot_api_token.trim().is_empty()
                || self.telegram.chat_id.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "telegram is enabled but bot_api_token or chat_id is empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// `user_data/config.yaml` → `user_data/config-example.yaml`.
fn example_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "config".into(), |s| s.to_string_lossy());
    let name = match path.extension() {
        Some(ext) => format!("{stem}-example.{}", ext.to_string_lossy()),
        None => format!("{stem}-example"),
    };
    path.with_file_name(name)
}
