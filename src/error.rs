//! Error handling for the execution bot
//!
//! Two layers: `GatewayError` is what the exchange (or its simulator) hands
//! back for a single request, and `TradingError` is what aborts an operation
//! before it starts. Gateway errors are recoverable per order; the engines log
//! and count them instead of propagating.

use serde::Serialize;
use std::io;
use thiserror::Error;

/// Failure reported by an order gateway for one request.
///
/// `code` carries the exchange error code when the exchange produced one.
/// Transport, timeout and decoding failures have no code.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{} - {message}", code_label(.code))]
pub struct GatewayError {
    pub code: Option<i64>,
    pub message: String,
}

fn code_label(code: &Option<i64>) -> String {
    match code {
        Some(code) => format!("Code {}", code),
        None => "UNKNOWN".to_string(),
    }
}

impl GatewayError {
    /// Binance: "Too many requests"
    pub const RATE_LIMIT_CODE: i64 = -1003;

    /// Error returned by the exchange itself
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error raised before or after the exchange answered (network, decoding)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code == Some(Self::RATE_LIMIT_CODE)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            GatewayError::transport(format!("invalid response body: {}", err))
        } else {
            GatewayError::transport(err.to_string())
        }
    }
}

/// Errors that stop an operation before (or instead of) trading
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String),

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("No grid orders were placed successfully for {0}")]
    NoOrdersPlaced(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: exec-bot init\n\
                    2. Edit config.toml\n\
                    3. Try again",
                    path
                )
            }
            TradingError::InvalidParameter(param, reason) => {
                format!(
                    "Invalid parameter '{}': {}\n\n\
                    💡 Symbols look like BTCUSDT, sides are BUY or SELL,\n\
                    quantities, prices and counts must be positive",
                    param, reason
                )
            }
            TradingError::NoOrdersPlaced(symbol) => {
                format!(
                    "Every grid order for {} was rejected\n\n\
                    💡 Check:\n\
                    - Prices respect the symbol's tick size\n\
                    - Quantity meets the minimum lot size\n\
                    - The account has enough margin",
                    symbol
                )
            }
            TradingError::Gateway(err) if err.is_rate_limited() => {
                format!(
                    "API rate limit exceeded: {}\n\n\
                    💡 Please wait before retrying",
                    err
                )
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::InvalidParameter(_, _) => "validation",
            TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_) => "config",
            TradingError::Gateway(_) => "gateway",
            TradingError::NoOrdersPlaced(_) => "trading",
            TradingError::Io(_) => "io",
            TradingError::Internal(_) => "internal",
        }
    }
}

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TradingError::ConfigNotFound(err.to_string()),
            _ => TradingError::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Internal(format!("JSON error: {}", err))
    }
}

impl From<crate::config::ConfigError> for TradingError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileNotFound(path) => TradingError::ConfigNotFound(path),
            ConfigError::FileRead(msg) | ConfigError::FileWrite(msg) => TradingError::Io(msg),
            ConfigError::Parse(msg) | ConfigError::Serialize(msg) => TradingError::ConfigParse(msg),
            ConfigError::Validation(msg) => TradingError::ConfigValidation(msg),
        }
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;

/// Helper macro for parameter errors
#[macro_export]
macro_rules! invalid_param {
    ($param:expr, $($reason:tt)+) => {
        $crate::error::TradingError::InvalidParameter($param.to_string(), format!($($reason)+))
    };
}
