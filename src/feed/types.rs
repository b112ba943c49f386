//! Price feed types

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Epoch values at or above this are treated as milliseconds
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Identifier of a tradable instrument (e.g., "AAPL")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from any string-like value
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Borrow the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single price observation for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol the tick belongs to
    pub symbol: Symbol,
    /// Observed price, always positive
    pub price: Decimal,
    /// Time the price was observed at the source
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(symbol: impl Into<Symbol>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }

    /// Decode a stream payload into a tick for `symbol`
    ///
    /// The payload's own `symbol` field (if any) is ignored: the connection
    /// a payload arrived on decides which symbol it belongs to.
    pub fn from_payload(symbol: &Symbol, payload: &str) -> Result<Self, MalformedTickError> {
        let raw: TickPayload = serde_json::from_str(payload)?;

        if raw.price <= Decimal::ZERO {
            return Err(MalformedTickError::NonPositivePrice(raw.price));
        }

        let timestamp = parse_timestamp(&raw.timestamp)?;

        Ok(Self {
            symbol: symbol.clone(),
            price: raw.price,
            timestamp,
        })
    }
}

/// Wire format of a streamed price update
#[derive(Debug, Deserialize)]
struct TickPayload {
    price: Decimal,
    timestamp: serde_json::Value,
}

/// Reasons a stream payload could not be turned into a tick
#[derive(Debug, Error)]
pub enum MalformedTickError {
    /// Payload is not valid JSON or misses required fields
    #[error("Invalid tick payload: {0}")]
    Json(#[from] serde_json::Error),
    /// Price is zero or negative
    #[error("Non-positive price: {0}")]
    NonPositivePrice(Decimal),
    /// Timestamp is neither ISO-8601 nor an epoch value
    #[error("Unrecognised timestamp: {0}")]
    Timestamp(String),
}

fn parse_timestamp(value: &serde_json::Value) -> Result<DateTime<Utc>, MalformedTickError> {
    match value {
        serde_json::Value::String(s) => parse_timestamp_str(s.trim()),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(from_epoch)
            .ok_or_else(|| MalformedTickError::Timestamp(n.to_string())),
        other => Err(MalformedTickError::Timestamp(other.to_string())),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, MalformedTickError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    // Naive ISO-8601 without offset, as produced by many servers
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    s.parse::<i64>()
        .ok()
        .and_then(from_epoch)
        .ok_or_else(|| MalformedTickError::Timestamp(s.to_string()))
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}
