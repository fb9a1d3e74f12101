// src/infrastructure/strategy/breakout.rs
// Channel breakout strategy

use serde_json::json;

use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::model::{Kline, TradingDecision};
use crate::domain::service::{StrategyAnalysis, TradingStrategy};

/// Buys when the latest close breaks above the highest high of the previous
/// `lookback` candles and sells when it breaks below their lowest low.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutStrategy {
    lookback: usize,
}

impl BreakoutStrategy {
    pub fn new(lookback: usize) -> TradingResult<Self> {
        if lookback == 0 {
            return Err(TradingError::InvalidConfiguration(
                "breakout lookback must be positive".to_string(),
            ));
        }
        Ok(Self { lookback })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

impl TradingStrategy for BreakoutStrategy {
    fn name(&self) -> &str {
        "Breakout"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "Lookback": self.lookback })
    }

    fn analyze(&self, window: &[Kline]) -> StrategyAnalysis {
        let required = self.lookback + 1;
        if window.len() < required {
            return StrategyAnalysis::hold(format!(
                "insufficient_data: need {} candles, got {}",
                required,
                window.len()
            ));
        }

        let last = window.len() - 1;
        let channel = &window[last - self.lookback..last];
        let highest = channel.iter().map(|k| k.high()).fold(f64::MIN, f64::max);
        let lowest = channel.iter().map(|k| k.low()).fold(f64::MAX, f64::min);
        let close = window[last].close();

        let analysis = if close > highest {
            StrategyAnalysis::new(TradingDecision::Buy, "close_above_channel_high")
        } else if close < lowest {
            StrategyAnalysis::new(TradingDecision::Sell, "close_below_channel_low")
        } else {
            StrategyAnalysis::hold("inside_channel")
        };

        analysis
            .with_indicator("channel_high", highest)
            .with_indicator("channel_low", lowest)
            .with_indicator("close", close)
    }
}
