// src/infrastructure/strategy/moving_average.rs
// Simple moving average crossover strategy

use serde_json::json;

use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::model::{Kline, TradingDecision};
use crate::domain::service::{StrategyAnalysis, TradingStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageStrategy {
    fast_window: usize,
    slow_window: usize,
    minimum_spread_percent: f64,
}

impl MovingAverageStrategy {
    pub fn new(fast_window: usize, slow_window: usize) -> TradingResult<Self> {
        Self::with_minimum_spread(fast_window, slow_window, 0.0)
    }

    pub fn with_minimum_spread(
        fast_window: usize,
        slow_window: usize,
        minimum_spread_percent: f64,
    ) -> TradingResult<Self> {
        if fast_window == 0 || slow_window == 0 {
            return Err(TradingError::InvalidConfiguration(
                "moving average windows must be positive".to_string(),
            ));
        }
        if fast_window >= slow_window {
            return Err(TradingError::InvalidConfiguration(format!(
                "fast window ({}) must be smaller than slow window ({})",
                fast_window, slow_window
            )));
        }
        if !(0.0..=100.0).contains(&minimum_spread_percent) {
            return Err(TradingError::InvalidConfiguration(format!(
                "minimum spread must be between 0 and 100, got {}",
                minimum_spread_percent
            )));
        }

        Ok(Self {
            fast_window,
            slow_window,
            minimum_spread_percent,
        })
    }

    pub fn fast_window(&self) -> usize {
        self.fast_window
    }

    pub fn slow_window(&self) -> usize {
        self.slow_window
    }

    fn required_candles(&self) -> usize {
        self.fast_window.max(self.slow_window)
    }
}

/// Mean close of the trailing `period` candles. Caller guarantees `window.len() >= period`.
fn simple_moving_average(window: &[Kline], period: usize) -> f64 {
    let start = window.len() - period;
    window[start..].iter().map(|k| k.close()).sum::<f64>() / period as f64
}

impl TradingStrategy for MovingAverageStrategy {
    fn name(&self) -> &str {
        "MovingAverage"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "FastWindow": self.fast_window,
            "SlowWindow": self.slow_window,
            "MinimumSpread": self.minimum_spread_percent,
        })
    }

    fn analyze(&self, window: &[Kline]) -> StrategyAnalysis {
        let required = self.required_candles();
        if window.len() < required {
            return StrategyAnalysis::hold(format!(
                "insufficient_data: need {} candles, got {}",
                required,
                window.len()
            ));
        }

        let fast = simple_moving_average(window, self.fast_window);
        let slow = simple_moving_average(window, self.slow_window);

        if window.len() == required {
            return StrategyAnalysis::hold("no_previous_window")
                .with_indicator("fast_ma", fast)
                .with_indicator("slow_ma", slow);
        }

        let previous = &window[..window.len() - 1];
        let previous_fast = simple_moving_average(previous, self.fast_window);
        let previous_slow = simple_moving_average(previous, self.slow_window);

        // Equal averages never count as a cross
        let decision = if previous_fast <= previous_slow && fast > slow {
            TradingDecision::Buy
        } else if previous_fast >= previous_slow && fast < slow {
            TradingDecision::Sell
        } else {
            TradingDecision::Hold
        };

        let spread = if slow != 0.0 {
            (fast - slow).abs() / slow * 100.0
        } else {
            0.0
        };

        let analysis = match decision {
            TradingDecision::Hold => StrategyAnalysis::hold("no_crossover"),
            _ if spread < self.minimum_spread_percent => StrategyAnalysis::hold(format!(
                "crossover_below_minimum_spread: {:.4}% < {:.4}%",
                spread, self.minimum_spread_percent
            )),
            TradingDecision::Buy => StrategyAnalysis::new(decision, "fast_crossed_above_slow"),
            TradingDecision::Sell => StrategyAnalysis::new(decision, "fast_crossed_below_slow"),
        };

        analysis
            .with_indicator("fast_ma", fast)
            .with_indicator("slow_ma", slow)
            .with_indicator("spread_percent", spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(closes: &[f64]) -> Vec<Kline> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                Kline::new(*close, close + 0.5, close - 0.5, *close, 100.0, 1_000 + i as i64).unwrap()
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_windows() {
        assert!(MovingAverageStrategy::new(0, 5).is_err());
        assert!(MovingAverageStrategy::new(5, 5).is_err());
        assert!(MovingAverageStrategy::new(7, 3).is_err());
        assert!(MovingAverageStrategy::with_minimum_spread(3, 5, 101.0).is_err());
    }

    #[test]
    fn holds_on_insufficient_data() {
        let strategy = MovingAverageStrategy::new(3, 5).unwrap();
        let analysis = strategy.analyze(&candles(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(analysis.decision, TradingDecision::Hold);
        assert!(analysis.reason.starts_with("insufficient_data"));
        assert_eq!(strategy.decide(&[]), TradingDecision::Hold);
    }

    #[test]
    fn holds_with_exactly_the_minimum_window() {
        let strategy = MovingAverageStrategy::new(3, 5).unwrap();
        let analysis = strategy.analyze(&candles(&[10.0, 10.0, 10.0, 10.0, 20.0]));
        assert_eq!(analysis.decision, TradingDecision::Hold);
        assert_eq!(analysis.reason, "no_previous_window");
    }

    #[test]
    fn buys_when_fast_crosses_above_slow() {
        let strategy = MovingAverageStrategy::new(2, 4).unwrap();
        // previous: fast 10 == slow 10, current: fast 15 > slow 12.5
        let window = candles(&[10.0, 10.0, 10.0, 10.0, 20.0]);
        assert_eq!(strategy.decide(&window), TradingDecision::Buy);
    }

    #[test]
    fn sells_when_fast_crosses_below_slow() {
        let strategy = MovingAverageStrategy::new(2, 4).unwrap();
        let window = candles(&[10.0, 10.0, 10.0, 10.0, 2.0]);
        assert_eq!(strategy.decide(&window), TradingDecision::Sell);
    }

    #[test]
    fn equal_averages_do_not_cross() {
        let strategy = MovingAverageStrategy::new(2, 4).unwrap();
        let window = candles(&[10.0, 10.0, 10.0, 10.0, 10.0]);
        assert_eq!(strategy.decide(&window), TradingDecision::Hold);
    }

    #[test]
    fn steady_trend_holds() {
        let strategy = MovingAverageStrategy::new(3, 5).unwrap();
        let closes: Vec<f64> = (0..20).map(|i| 800.0 + 0.5 * i as f64).collect();
        assert_eq!(strategy.decide(&candles(&closes)), TradingDecision::Hold);
    }

    #[test]
    fn minimum_spread_filters_weak_crossovers() {
        let strategy = MovingAverageStrategy::with_minimum_spread(2, 4, 50.0).unwrap();
        let analysis = strategy.analyze(&candles(&[10.0, 10.0, 10.0, 10.0, 20.0]));
        assert_eq!(analysis.decision, TradingDecision::Hold);
        assert!(analysis.reason.starts_with("crossover_below_minimum_spread"));
    }

    #[test]
    fn decision_is_deterministic() {
        let strategy = MovingAverageStrategy::new(3, 5).unwrap();
        let window = candles(&[5.0, 4.0, 6.0, 3.0, 7.0, 2.0, 8.0]);
        assert_eq!(strategy.analyze(&window), strategy.analyze(&window));
    }
}
