// src/domain/model/event.rs
// Position events published after live fills

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trading_bot::TradingBotId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradingEvent {
    PositionOpened {
        bot_id: TradingBotId,
        symbol: String,
        price: f64,
        quantity: f64,
        total_value: f64,
        strategy: String,
        trading_fees: f64,
        currency: String,
        timestamp: DateTime<Utc>,
    },
    PositionClosed {
        bot_id: TradingBotId,
        symbol: String,
        price: f64,
        quantity: f64,
        total_value: f64,
        strategy: String,
        trading_fees: f64,
        currency: String,
        entry_price: f64,
        profit_loss: f64,
        profit_loss_percent: f64,
        timestamp: DateTime<Utc>,
    },
}

impl TradingEvent {
    pub fn routing_key(&self) -> &'static str {
        match self {
            TradingEvent::PositionOpened { .. } => "trading.buy_executed",
            TradingEvent::PositionClosed { .. } => "trading.sell_executed",
        }
    }

    pub fn bot_id(&self) -> TradingBotId {
        match self {
            TradingEvent::PositionOpened { bot_id, .. } | TradingEvent::PositionClosed { bot_id, .. } => {
                *bot_id
            }
        }
    }
}
