// src/application/dto/mod.rs
// Data transfer objects exchanged with the surrounding layers

pub mod parser;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::model::TradingBot;

/// JSON representation of a trading bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingBotDto {
    pub id: String,
    pub symbol: String,
    pub quantity: f64,
    pub strategy: String,
    pub strategy_params: serde_json::Value,
    pub status: String,
    pub is_positioned: bool,
    pub entry_price: Option<f64>,
    pub actual_quantity_held: f64,
    pub interval_seconds: u64,
    pub initial_capital: f64,
    pub trade_amount: f64,
    pub currency: String,
    pub trading_fees: f64,
    pub minimum_profit_threshold: f64,
    pub stop_loss: Option<f64>,
    pub use_fixed_quantity: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&TradingBot> for TradingBotDto {
    fn from(bot: &TradingBot) -> Self {
        let config = bot.config();
        Self {
            id: bot.id().to_string(),
            symbol: bot.symbol().to_string(),
            quantity: config.base_quantity,
            strategy: bot.strategy().name().to_string(),
            strategy_params: bot.strategy().parameters(),
            status: bot.status().to_string(),
            is_positioned: bot.is_positioned(),
            entry_price: bot.entry_price(),
            actual_quantity_held: bot.actual_quantity_held(),
            interval_seconds: config.interval_seconds,
            initial_capital: config.initial_capital,
            trade_amount: config.trade_amount,
            currency: config.currency.clone(),
            trading_fees: config.trading_fees_percent,
            minimum_profit_threshold: config.minimum_profit_threshold_percent,
            stop_loss: config.stop_loss_percent,
            use_fixed_quantity: config.use_fixed_quantity,
            created_at: bot.created_at(),
        }
    }
}

/// Input of the create-bot use case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTradingBotInput {
    pub symbol: String,
    pub strategy: String,
    pub strategy_params: serde_json::Value,
    pub quantity: f64,
    pub interval_seconds: u64,
    pub initial_capital: f64,
    pub trade_amount: f64,
    pub currency: String,
    pub trading_fees: f64,
    pub minimum_profit_threshold: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    pub use_fixed_quantity: bool,
}

/// Candle as returned by the exchange REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineResponse {
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}
