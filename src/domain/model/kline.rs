// src/domain/model/kline.rs
// Market value objects: candles, symbols and candle intervals

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{MarketDataError, MarketDataResult, TradingError, TradingResult};

/// A single OHLCV candle. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KlineFields")]
pub struct Kline {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    close_time: i64,
}

#[derive(Deserialize)]
struct KlineFields {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    close_time: i64,
}

impl TryFrom<KlineFields> for Kline {
    type Error = MarketDataError;

    fn try_from(fields: KlineFields) -> Result<Self, Self::Error> {
        Kline::new(
            fields.open,
            fields.high,
            fields.low,
            fields.close,
            fields.volume,
            fields.close_time,
        )
    }
}

impl Kline {
    /// `close_time` is epoch milliseconds.
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> MarketDataResult<Self> {
        for (field, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MarketDataError::InvalidKline(format!(
                    "{} must be a positive number, got {}",
                    field, value
                )));
            }
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(MarketDataError::InvalidKline(format!(
                "volume must be a non-negative number, got {}",
                volume
            )));
        }

        if close_time <= 0 || DateTime::<Utc>::from_timestamp_millis(close_time).is_none() {
            return Err(MarketDataError::InvalidKline(format!(
                "invalid close time {}",
                close_time
            )));
        }

        if high < open.max(close) || high < low {
            return Err(MarketDataError::InvalidKline(format!(
                "high {} is below open/close/low",
                high
            )));
        }

        if low > open.min(close) {
            return Err(MarketDataError::InvalidKline(format!(
                "low {} is above open/close",
                low
            )));
        }

        Ok(Self {
            open,
            high,
            low,
            close,
            volume,
            close_time,
        })
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Close time in epoch milliseconds.
    pub fn close_time(&self) -> i64 {
        self.close_time
    }

    pub fn close_time_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.close_time).unwrap_or_default()
    }
}

/// Validated ticker symbol such as "BTCBRL".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(value: impl AsRef<str>) -> TradingResult<Self> {
        let normalized = value.as_ref().trim().to_uppercase();

        if normalized.is_empty() {
            return Err(TradingError::InvalidConfiguration(
                "symbol cannot be empty".to_string(),
            ));
        }

        if normalized.len() < 3 || normalized.len() > 20 {
            return Err(TradingError::InvalidConfiguration(format!(
                "symbol {} must be between 3 and 20 characters",
                normalized
            )));
        }

        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TradingError::InvalidConfiguration(format!(
                "symbol {} must be alphanumeric",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = TradingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candle intervals accepted by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    Minutes1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,
    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,
    Days1,
    Days3,
    Weeks1,
    Months1,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 15] = [
        KlineInterval::Minutes1,
        KlineInterval::Minutes3,
        KlineInterval::Minutes5,
        KlineInterval::Minutes15,
        KlineInterval::Minutes30,
        KlineInterval::Hours1,
        KlineInterval::Hours2,
        KlineInterval::Hours4,
        KlineInterval::Hours6,
        KlineInterval::Hours8,
        KlineInterval::Hours12,
        KlineInterval::Days1,
        KlineInterval::Days3,
        KlineInterval::Weeks1,
        KlineInterval::Months1,
    ];

    pub fn from_seconds(seconds: u64) -> MarketDataResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|interval| interval.as_seconds() == seconds)
            .ok_or(MarketDataError::UnsupportedInterval(seconds))
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|interval| interval.as_str() == value)
    }

    pub fn as_seconds(&self) -> u64 {
        match self {
            KlineInterval::Minutes1 => 60,
            KlineInterval::Minutes3 => 180,
            KlineInterval::Minutes5 => 300,
            KlineInterval::Minutes15 => 900,
            KlineInterval::Minutes30 => 1_800,
            KlineInterval::Hours1 => 3_600,
            KlineInterval::Hours2 => 7_200,
            KlineInterval::Hours4 => 14_400,
            KlineInterval::Hours6 => 21_600,
            KlineInterval::Hours8 => 28_800,
            KlineInterval::Hours12 => 43_200,
            KlineInterval::Days1 => 86_400,
            KlineInterval::Days3 => 259_200,
            KlineInterval::Weeks1 => 604_800,
            KlineInterval::Months1 => 2_592_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::Minutes1 => "1m",
            KlineInterval::Minutes3 => "3m",
            KlineInterval::Minutes5 => "5m",
            KlineInterval::Minutes15 => "15m",
            KlineInterval::Minutes30 => "30m",
            KlineInterval::Hours1 => "1h",
            KlineInterval::Hours2 => "2h",
            KlineInterval::Hours4 => "4h",
            KlineInterval::Hours6 => "6h",
            KlineInterval::Hours8 => "8h",
            KlineInterval::Hours12 => "12h",
            KlineInterval::Days1 => "1d",
            KlineInterval::Days3 => "3d",
            KlineInterval::Weeks1 => "1w",
            KlineInterval::Months1 => "1M",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
