// src/domain/model/decision.rs
// Trading decisions, decision logs and order placement records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trading_bot::TradingBotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingDecision {
    Buy,
    Sell,
    Hold,
}

impl TradingDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingDecision::Buy => "BUY",
            TradingDecision::Sell => "SELL",
            TradingDecision::Hold => "HOLD",
        }
    }
}

impl fmt::Display for TradingDecision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one evaluation tick. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDecisionLog {
    pub bot_id: TradingBotId,
    pub decision: TradingDecision,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub reasoning: String,
}

impl TradingDecisionLog {
    pub fn new(
        bot_id: TradingBotId,
        decision: TradingDecision,
        price: f64,
        timestamp: DateTime<Utc>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            bot_id,
            decision,
            price,
            timestamp,
            reasoning: reasoning.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Confirmation returned by the exchange for a placed market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub status: String,
}
