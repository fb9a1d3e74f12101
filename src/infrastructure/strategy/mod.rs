// src/infrastructure/strategy/mod.rs
// Strategy implementations and the factory that builds them from configuration

pub mod breakout;
pub mod moving_average;
pub mod rsi;

use std::sync::Arc;

pub use breakout::BreakoutStrategy;
pub use moving_average::MovingAverageStrategy;
pub use rsi::RsiStrategy;

use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::service::TradingStrategy;

fn window_param(params: &serde_json::Value, key: &str) -> TradingResult<usize> {
    let value = params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| TradingError::InvalidConfiguration(format!("missing numeric parameter {}", key)))?;

    if value < 1.0 || value.fract() != 0.0 {
        return Err(TradingError::InvalidConfiguration(format!(
            "parameter {} must be a positive integer, got {}",
            key, value
        )));
    }
    Ok(value as usize)
}

fn float_param(params: &serde_json::Value, key: &str, default: f64) -> TradingResult<f64> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            TradingError::InvalidConfiguration(format!("parameter {} must be a number", key))
        }),
    }
}

/// Build a strategy from its configured name and JSON parameters.
pub fn build_strategy(
    name: &str,
    params: &serde_json::Value,
) -> TradingResult<Arc<dyn TradingStrategy>> {
    match name {
        "MovingAverage" => {
            let fast = window_param(params, "FastWindow")?;
            let slow = window_param(params, "SlowWindow")?;
            let spread = float_param(params, "MinimumSpread", 0.0)?;
            Ok(Arc::new(MovingAverageStrategy::with_minimum_spread(fast, slow, spread)?))
        }
        "Breakout" => {
            let lookback = window_param(params, "Lookback")?;
            Ok(Arc::new(BreakoutStrategy::new(lookback)?))
        }
        "RSI" => {
            let period = match params.get("Period") {
                Some(_) => window_param(params, "Period")?,
                None => 14,
            };
            let oversold = float_param(params, "OversoldThreshold", 30.0)?;
            let overbought = float_param(params, "OverboughtThreshold", 70.0)?;
            Ok(Arc::new(RsiStrategy::new(period, oversold, overbought)?))
        }
        other => Err(TradingError::InvalidConfiguration(format!(
            "unknown strategy: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_moving_average_from_float_params() {
        let strategy =
            build_strategy("MovingAverage", &json!({"FastWindow": 7.0, "SlowWindow": 40.0})).unwrap();
        assert_eq!(strategy.name(), "MovingAverage");
        assert_eq!(strategy.parameters()["SlowWindow"], json!(40));
    }

    #[test]
    fn builds_breakout_and_rsi() {
        assert_eq!(build_strategy("Breakout", &json!({"Lookback": 20})).unwrap().name(), "Breakout");
        let rsi = build_strategy("RSI", &json!({})).unwrap();
        assert_eq!(rsi.parameters()["Period"], json!(14));
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(build_strategy("MovingAverage", &json!({"FastWindow": 40, "SlowWindow": 7})).is_err());
        assert!(build_strategy("MovingAverage", &json!({"FastWindow": 2.5, "SlowWindow": 7})).is_err());
        assert!(build_strategy("MovingAverage", &json!({"SlowWindow": 7})).is_err());
        assert!(build_strategy("RSI", &json!({"OversoldThreshold": 80, "OverboughtThreshold": 20})).is_err());
        assert!(build_strategy("Martingale", &json!({})).is_err());
    }
}
