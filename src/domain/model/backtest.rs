// src/domain/model/backtest.rs
// Records produced by a backtest run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A simulated round trip, recorded when a sell closes the open trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub quantity: f64,
    pub fees: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalPoint {
    pub timestamp: DateTime<Utc>,
    pub capital: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub buy: u64,
    pub sell: u64,
    pub hold: u64,
}

/// Terminal artifact of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: Uuid,
    pub strategy_name: String,
    pub symbol: String,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_pnl: f64,
    pub roi: f64,
    pub win_rate: f64,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub max_drawdown: f64,
    pub total_fees: f64,
    pub decision_counts: DecisionCounts,
    pub candles_processed: u64,
    /// Entry price of a position still open when the data ran out.
    pub open_position: Option<f64>,
    pub trades: Vec<BacktestTrade>,
    pub capital_history: Vec<CapitalPoint>,
    pub created_at: DateTime<Utc>,
}
