// src/application/service/mod.rs
// Application services: market data sources, execution contexts and the replay engine

pub mod backtest_context;
pub mod backtest_engine;
pub mod live_context;
pub mod market_data;
pub mod trading_cycle;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::errors::{MarketDataResult, TradingResult};
use crate::domain::model::{Kline, Symbol, TradingBot, TradingDecision, TradingDecisionLog};

pub use backtest_context::BacktestTradingExecutionContext;
pub use backtest_engine::{BacktestConfig, BacktestEngine};
pub use live_context::LiveTradingExecutionContext;
pub use market_data::{HistoricalMarketDataSource, LiveMarketDataSource};
pub use trading_cycle::{run_trading_cycle, TickReport};

/// A bot shared between triggers. Holding the lock is the exclusive right to
/// change the bot's position.
pub type SharedTradingBot = Arc<Mutex<TradingBot>>;

pub fn share_bot(bot: TradingBot) -> SharedTradingBot {
    Arc::new(Mutex::new(bot))
}

/// Source of candle windows and of the current time
#[async_trait]
pub trait MarketDataSource {
    /// Candle window ending at the current time, oldest first.
    async fn get_market_data(&self, symbol: &Symbol, interval_seconds: u64) -> MarketDataResult<Vec<Kline>>;

    fn get_current_time(&self) -> DateTime<Utc>;
}

/// Applies trading decisions, either against an exchange or a simulated ledger
#[async_trait]
pub trait TradingExecutionContext {
    /// Apply `decision` to `bot`. A buy while positioned fails with
    /// `AlreadyPositioned`, a sell while idle with `NotPositioned`; any failure
    /// leaves the bot exactly as it was.
    async fn execute_trade(
        &self,
        decision: TradingDecision,
        bot: &SharedTradingBot,
        current_price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()>;

    async fn on_decision_made(&self, log: &TradingDecisionLog) -> TradingResult<()>;

    fn should_continue(&self) -> bool;

    fn stop(&self);
}
