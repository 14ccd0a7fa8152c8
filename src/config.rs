// Configuration management for the execution bot

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
pub const BINANCE_FUTURES_TESTNET_URL: &str = "https://testnet.binancefuture.com";

pub const API_KEY_ENV: &str = "BINANCE_API_KEY";
pub const API_SECRET_ENV: &str = "BINANCE_API_SECRET";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Paper,
    Binance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_mode")]
    pub mode: GatewayMode,
    #[serde(default = "default_true")]
    pub testnet: bool,
    /// Overrides the production/testnet default when set
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_mark_price")]
    pub mark_price: f64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: f64,
    #[serde(default)]
    pub volatility: f64, // random-walk step as a fraction of price, 0 = static mark
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwapConfig {
    #[serde(default = "default_twap_interval")]
    pub default_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub twap: TwapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_mode() -> GatewayMode { GatewayMode::Paper }
fn default_true() -> bool { true }
fn default_recv_window() -> u64 { 60_000 }
fn default_mark_price() -> f64 { 45_000.0 }
fn default_slippage_bps() -> f64 { 2.0 }
fn default_monitor_interval() -> u64 { 60 }
fn default_tick_size() -> f64 { 0.01 }
fn default_twap_interval() -> u64 { 5 }
fn default_log_level() -> String { "info".to_string() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            testnet: true,
            rest_url: None,
            recv_window_ms: default_recv_window(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            mark_price: default_mark_price(),
            slippage_bps: default_slippage_bps(),
            volatility: 0.0,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: default_monitor_interval(),
            tick_size: default_tick_size(),
            max_cycles: None,
        }
    }
}

impl Default for TwapConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: default_twap_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            paper: PaperConfig::default(),
            grid: GridConfig::default(),
            twap: TwapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// REST endpoint after applying the testnet switch and any override
    pub fn effective_rest_url(&self) -> String {
        match &self.rest_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.testnet => BINANCE_FUTURES_TESTNET_URL.to_string(),
            None => BINANCE_FUTURES_URL.to_string(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl GridConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Credentials from the environment win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.gateway.api_key = key;
            }
        }
        if let Ok(secret) = std::env::var(API_SECRET_ENV) {
            if !secret.is_empty() {
                self.gateway.api_secret = secret;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.recv_window_ms == 0 || self.gateway.recv_window_ms > 60_000 {
            return Err(ConfigError::Validation(
                "recv_window_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.gateway.mode == GatewayMode::Binance && !self.gateway.has_credentials() {
            return Err(ConfigError::Validation(format!(
                "binance mode needs api_key and api_secret (or {} / {})",
                API_KEY_ENV, API_SECRET_ENV
            )));
        }

        if self.paper.mark_price <= 0.0 {
            return Err(ConfigError::Validation("paper.mark_price must be positive".to_string()));
        }

        if self.paper.slippage_bps < 0.0 {
            return Err(ConfigError::Validation("paper.slippage_bps must be non-negative".to_string()));
        }

        if !(0.0..1.0).contains(&self.paper.volatility) {
            return Err(ConfigError::Validation("paper.volatility must be in [0, 1)".to_string()));
        }

        if self.grid.monitor_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "grid.monitor_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.grid.tick_size <= 0.0 {
            return Err(ConfigError::Validation("grid.tick_size must be positive".to_string()));
        }

        if self.grid.max_cycles == Some(0) {
            return Err(ConfigError::Validation(
                "grid.max_cycles must be greater than 0 when set".to_string(),
            ));
        }

        if self.twap.default_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "twap.default_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.mode, GatewayMode::Paper);
        assert_eq!(config.grid.tick_size, 0.01);
        assert_eq!(config.gateway.recv_window_ms, 60_000);
    }

    #[test]
    fn test_effective_rest_url() {
        let mut gateway = GatewayConfig::default();
        assert_eq!(gateway.effective_rest_url(), BINANCE_FUTURES_TESTNET_URL);

        gateway.testnet = false;
        assert_eq!(gateway.effective_rest_url(), BINANCE_FUTURES_URL);

        gateway.rest_url = Some("http://127.0.0.1:8080/".to_string());
        assert_eq!(gateway.effective_rest_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_binance_mode_requires_credentials() {
        let mut config = Config::default();
        config.gateway.mode = GatewayMode::Binance;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.gateway.api_key = "key".to_string();
        config.gateway.api_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_tick_size_rejected() {
        let mut config = Config::default();
        config.grid.tick_size = 0.0;
        assert!(config.validate().is_err());
    }
}
