// src/infrastructure/strategy/rsi.rs
// Relative strength index strategy

use serde_json::json;
use ta::indicators::RelativeStrengthIndex;
use ta::Next;

use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::model::{Kline, TradingDecision};
use crate::domain::service::{StrategyAnalysis, TradingStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct RsiStrategy {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiStrategy {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> TradingResult<Self> {
        if period == 0 {
            return Err(TradingError::InvalidConfiguration(
                "RSI period must be positive".to_string(),
            ));
        }
        if !(oversold > 0.0 && oversold < 100.0) || !(overbought > 0.0 && overbought < 100.0) {
            return Err(TradingError::InvalidConfiguration(format!(
                "RSI thresholds must be between 0 and 100, got {} / {}",
                oversold, overbought
            )));
        }
        if oversold >= overbought {
            return Err(TradingError::InvalidConfiguration(format!(
                "oversold threshold ({}) must be below overbought threshold ({})",
                oversold, overbought
            )));
        }

        Ok(Self {
            period,
            oversold,
            overbought,
        })
    }

    // Default strategy with common parameters
    pub fn standard() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl TradingStrategy for RsiStrategy {
    fn name(&self) -> &str {
        "RSI"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "Period": self.period,
            "OversoldThreshold": self.oversold,
            "OverboughtThreshold": self.overbought,
        })
    }

    fn analyze(&self, window: &[Kline]) -> StrategyAnalysis {
        let required = self.period + 1;
        if window.len() < required {
            return StrategyAnalysis::hold(format!(
                "insufficient_data: need {} candles, got {}",
                required,
                window.len()
            ));
        }

        // Fresh indicator per call keeps the strategy stateless
        let mut indicator = match RelativeStrengthIndex::new(self.period) {
            Ok(indicator) => indicator,
            Err(e) => return StrategyAnalysis::hold(format!("indicator_error: {:?}", e)),
        };

        let mut rsi = 50.0;
        for kline in window {
            rsi = indicator.next(kline.close());
        }

        let analysis = if rsi < self.oversold {
            StrategyAnalysis::new(TradingDecision::Buy, "rsi_oversold")
        } else if rsi > self.overbought {
            StrategyAnalysis::new(TradingDecision::Sell, "rsi_overbought")
        } else {
            StrategyAnalysis::hold("rsi_neutral")
        };

        analysis.with_indicator("rsi", rsi)
    }
}
