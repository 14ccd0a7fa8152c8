//! Parameter validation for engine inputs
//!
//! Every check runs before the first gateway call so a bad parameter never
//! leaves orders behind on the exchange.

use crate::core::types::OrderSide;
use crate::error::TradingResult;
use crate::invalid_param;

/// Quote assets a futures symbol may end with
pub const VALID_QUOTES: [&str; 5] = ["USDT", "BUSD", "USD", "BTC", "ETH"];

pub const MIN_SYMBOL_LEN: usize = 6;

/// Symbol must be uppercase, at least 6 characters, and end in a known quote
pub fn validate_symbol(symbol: &str) -> TradingResult<()> {
    if symbol.len() < MIN_SYMBOL_LEN {
        return Err(invalid_param!(
            "symbol",
            "'{}' is shorter than {} characters",
            symbol,
            MIN_SYMBOL_LEN
        ));
    }

    if !symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(invalid_param!("symbol", "'{}' must be uppercase alphanumeric", symbol));
    }

    if !VALID_QUOTES.iter().any(|quote| symbol.ends_with(quote)) {
        return Err(invalid_param!(
            "symbol",
            "'{}' must end with one of {}",
            symbol,
            VALID_QUOTES.join("/")
        ));
    }

    Ok(())
}

/// Parse a BUY/SELL side, case-insensitive
pub fn parse_side(side: &str) -> TradingResult<OrderSide> {
    match side.to_ascii_uppercase().as_str() {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        _ => Err(invalid_param!("side", "'{}' must be BUY or SELL", side)),
    }
}

pub fn validate_quantity(name: &str, quantity: f64) -> TradingResult<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(invalid_param!(name, "quantity must be a positive number, got {}", quantity));
    }
    Ok(())
}

pub fn validate_price(name: &str, price: f64) -> TradingResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(invalid_param!(name, "price must be a positive number, got {}", price));
    }
    Ok(())
}

pub fn validate_positive_count(name: &str, value: u64) -> TradingResult<()> {
    if value == 0 {
        return Err(invalid_param!(name, "must be a positive integer"));
    }
    Ok(())
}
