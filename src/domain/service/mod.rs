// src/domain/service/mod.rs
// Domain service interfaces

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::{ExchangeResult, PublishResult};
use crate::domain::model::{
    Kline, KlineInterval, OrderConfirmation, OrderSide, Symbol, TradingDecision, TradingEvent,
};

/// Outcome of running a strategy over a candle window.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAnalysis {
    pub decision: TradingDecision,
    pub reason: String,
    pub indicators: BTreeMap<String, f64>,
}

impl StrategyAnalysis {
    pub fn new(decision: TradingDecision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            indicators: BTreeMap::new(),
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(TradingDecision::Hold, reason)
    }

    pub fn with_indicator(mut self, name: &str, value: f64) -> Self {
        self.indicators.insert(name.to_string(), value);
        self
    }
}

/// A trading strategy is a pure function of its candle window.
///
/// Implementations must not keep mutable state between calls, so the live
/// loop and the backtest replay reach identical decisions on identical data.
pub trait TradingStrategy: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn parameters(&self) -> serde_json::Value;

    fn analyze(&self, window: &[Kline]) -> StrategyAnalysis;

    fn decide(&self, window: &[Kline]) -> TradingDecision {
        self.analyze(window).decision
    }
}

/// Places market orders on an exchange
#[async_trait]
pub trait OrderGateway {
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: f64,
    ) -> ExchangeResult<OrderConfirmation>;
}

/// Supplies candles from an exchange
#[async_trait]
pub trait KlineProvider {
    /// The `limit` most recent candles, oldest first.
    async fn get_recent_klines(
        &self,
        symbol: &Symbol,
        interval: KlineInterval,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>>;

    /// Candles closing within `[start, end]`, oldest first, at most `limit`.
    async fn get_klines_between(
        &self,
        symbol: &Symbol,
        interval: KlineInterval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>>;
}

/// Fire-and-forget notification of position events
#[async_trait]
pub trait TradingEventPublisher {
    async fn publish(&self, event: &TradingEvent) -> PublishResult<()>;
}
