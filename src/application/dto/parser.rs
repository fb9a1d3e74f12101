// src/application/dto/parser.rs
// Parsers for exchange payloads

use super::KlineResponse;
use crate::domain::errors::{ExchangeError, ExchangeResult, MarketDataResult};
use crate::domain::model::Kline;

/// Parse the body of a klines REST response (an array of arrays).
pub fn parse_klines_body(body: &str) -> ExchangeResult<Vec<KlineResponse>> {
    let raw: Vec<Vec<serde_json::Value>> =
        serde_json::from_str(body).map_err(|e| ExchangeError::Parse(e.to_string()))?;

    raw.iter()
        .map(|kline_data| KlineResponse::from_raw_data(kline_data))
        .collect()
}

impl KlineResponse {
    pub fn from_raw_data(data: &[serde_json::Value]) -> ExchangeResult<Self> {
        if data.len() < 11 {
            return Err(ExchangeError::Parse(format!(
                "Invalid data length: expected 11 elements, got {}",
                data.len()
            )));
        }

        let parse_timestamp = |value: &serde_json::Value, field: &str| -> ExchangeResult<chrono::DateTime<chrono::Utc>> {
            value
                .as_i64()
                .ok_or_else(|| ExchangeError::Parse(format!("Invalid {} format", field)))
                .and_then(|ts| {
                    chrono::DateTime::from_timestamp_millis(ts).ok_or_else(|| {
                        ExchangeError::Parse(format!("Invalid timestamp for {}: {}", field, ts))
                    })
                })
        };

        let parse_float = |value: &serde_json::Value, field: &str| -> ExchangeResult<f64> {
            value
                .as_str()
                .ok_or_else(|| ExchangeError::Parse(format!("Invalid {} format", field)))
                .and_then(|s| {
                    s.parse()
                        .map_err(|e| ExchangeError::Parse(format!("Invalid {} value {}: {}", field, s, e)))
                })
        };

        Ok(Self {
            open_time: parse_timestamp(&data[0], "open_time")?,
            open_price: parse_float(&data[1], "open_price")?,
            high_price: parse_float(&data[2], "high_price")?,
            low_price: parse_float(&data[3], "low_price")?,
            close_price: parse_float(&data[4], "close_price")?,
            volume: parse_float(&data[5], "volume")?,
            close_time: parse_timestamp(&data[6], "close_time")?,
            quote_asset_volume: parse_float(&data[7], "quote_asset_volume")?,
            number_of_trades: data[8]
                .as_u64()
                .ok_or_else(|| ExchangeError::Parse("Invalid number_of_trades format".to_string()))?,
            taker_buy_base_volume: parse_float(&data[9], "taker_buy_base_volume")?,
            taker_buy_quote_volume: parse_float(&data[10], "taker_buy_quote_volume")?,
        })
    }

    pub fn to_kline(&self) -> MarketDataResult<Kline> {
        Kline::new(
            self.open_price,
            self.high_price,
            self.low_price,
            self.close_price,
            self.volume,
            self.close_time.timestamp_millis(),
        )
    }
}
