// src/domain/model/mod.rs
// Core domain models

pub mod backtest;
pub mod decision;
pub mod event;
pub mod kline;
pub mod trading_bot;

pub use backtest::{BacktestResult, BacktestTrade, CapitalPoint, DecisionCounts};
pub use decision::{OrderConfirmation, OrderSide, TradingDecision, TradingDecisionLog};
pub use event::TradingEvent;
pub use kline::{Kline, KlineInterval, Symbol};
pub use trading_bot::{BotStatus, PositionState, TradingBot, TradingBotConfig, TradingBotId};
