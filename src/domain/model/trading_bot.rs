// src/domain/model/trading_bot.rs
// TradingBot aggregate: lifecycle, position state and quantity bookkeeping

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decision::TradingDecision;
use super::kline::{KlineInterval, Symbol};
use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::service::TradingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradingBotId(Uuid);

impl TradingBotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn parse(value: &str) -> TradingResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| TradingError::InvalidConfiguration(format!("invalid bot id {}: {}", value, e)))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TradingBotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradingBotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status. Independent of the position state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotStatus {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BotStatus::Created => write!(f, "created"),
            BotStatus::Running => write!(f, "running"),
            BotStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Entry price and held quantity only exist while positioned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    Idle,
    Positioned { entry_price: f64, quantity_held: f64 },
}

/// Configuration fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingBotConfig {
    pub symbol: Symbol,
    pub base_quantity: f64,
    pub interval_seconds: u64,
    pub trade_amount: f64,
    pub currency: String,
    pub trading_fees_percent: f64,
    pub minimum_profit_threshold_percent: f64,
    pub use_fixed_quantity: bool,
    pub initial_capital: f64,
    #[serde(default)]
    pub stop_loss_percent: Option<f64>,
}

impl TradingBotConfig {
    pub fn validate(&self) -> TradingResult<()> {
        let invalid = |msg: String| Err(TradingError::InvalidConfiguration(msg));

        if !self.base_quantity.is_finite() || self.base_quantity < 0.0 {
            return invalid(format!("base quantity must be non-negative, got {}", self.base_quantity));
        }
        if self.use_fixed_quantity && self.base_quantity <= 0.0 {
            return invalid("fixed quantity mode requires a positive base quantity".to_string());
        }
        if !self.trade_amount.is_finite() || self.trade_amount <= 0.0 {
            return invalid(format!("trade amount must be positive, got {}", self.trade_amount));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return invalid(format!("initial capital must be positive, got {}", self.initial_capital));
        }
        if !(0.0..100.0).contains(&self.trading_fees_percent) {
            return invalid(format!(
                "trading fees must be in [0, 100), got {}",
                self.trading_fees_percent
            ));
        }
        if !self.minimum_profit_threshold_percent.is_finite()
            || self.minimum_profit_threshold_percent < 0.0
        {
            return invalid(format!(
                "minimum profit threshold must be non-negative, got {}",
                self.minimum_profit_threshold_percent
            ));
        }
        if let Some(stop_loss) = self.stop_loss_percent {
            if !(stop_loss > 0.0 && stop_loss <= 100.0) {
                return invalid(format!("stop loss must be in (0, 100], got {}", stop_loss));
            }
        }
        if self.currency.trim().is_empty() {
            return invalid("currency cannot be empty".to_string());
        }
        KlineInterval::from_seconds(self.interval_seconds)
            .map_err(|e| TradingError::InvalidConfiguration(e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TradingBot {
    id: TradingBotId,
    config: TradingBotConfig,
    strategy: Arc<dyn TradingStrategy>,
    status: BotStatus,
    position: PositionState,
    created_at: DateTime<Utc>,
}

impl TradingBot {
    pub fn new(config: TradingBotConfig, strategy: Arc<dyn TradingStrategy>) -> TradingResult<Self> {
        config.validate()?;

        Ok(Self {
            id: TradingBotId::new(),
            config,
            strategy,
            status: BotStatus::Created,
            position: PositionState::Idle,
            created_at: Utc::now(),
        })
    }

    /// Rebuild a bot from persisted state.
    ///
    /// A positioned bot may carry a zero held quantity (rows written before
    /// fee bookkeeping existed); selling falls back to the nominal quantity.
    pub fn restore(
        id: TradingBotId,
        config: TradingBotConfig,
        strategy: Arc<dyn TradingStrategy>,
        status: BotStatus,
        entry_price: Option<f64>,
        quantity_held: f64,
        created_at: DateTime<Utc>,
    ) -> TradingResult<Self> {
        config.validate()?;

        let position = match entry_price {
            Some(price) if price > 0.0 => PositionState::Positioned {
                entry_price: price,
                quantity_held: quantity_held.max(0.0),
            },
            _ => {
                if quantity_held != 0.0 {
                    log::warn!(
                        "Bot {} restored idle with stale held quantity {}, discarding it",
                        id,
                        quantity_held
                    );
                }
                PositionState::Idle
            }
        };

        Ok(Self {
            id,
            config,
            strategy,
            status,
            position,
            created_at,
        })
    }

    pub fn id(&self) -> TradingBotId {
        self.id
    }

    pub fn config(&self) -> &TradingBotConfig {
        &self.config
    }

    pub fn symbol(&self) -> &Symbol {
        &self.config.symbol
    }

    pub fn strategy(&self) -> &Arc<dyn TradingStrategy> {
        &self.strategy
    }

    pub fn status(&self) -> BotStatus {
        self.status
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_positioned(&self) -> bool {
        matches!(self.position, PositionState::Positioned { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self.position {
            PositionState::Positioned { entry_price, .. } => Some(entry_price),
            PositionState::Idle => None,
        }
    }

    /// Fee-adjusted quantity acquired by the open position, zero while idle.
    pub fn actual_quantity_held(&self) -> f64 {
        match self.position {
            PositionState::Positioned { quantity_held, .. } => quantity_held,
            PositionState::Idle => 0.0,
        }
    }

    pub fn start(&mut self) -> TradingResult<()> {
        match self.status {
            BotStatus::Created | BotStatus::Stopped => {
                self.status = BotStatus::Running;
                Ok(())
            }
            BotStatus::Running => Err(TradingError::InvalidStatus {
                from: self.status.to_string(),
                to: BotStatus::Running.to_string(),
            }),
        }
    }

    pub fn stop(&mut self) -> TradingResult<()> {
        if self.status != BotStatus::Running {
            return Err(TradingError::InvalidStatus {
                from: self.status.to_string(),
                to: BotStatus::Stopped.to_string(),
            });
        }
        self.status = BotStatus::Stopped;
        Ok(())
    }

    /// Idle -> Positioned. Records the entry price and the fee-adjusted quantity.
    pub fn enter_position(&mut self, entry_price: f64, quantity_held: f64) -> TradingResult<()> {
        if self.is_positioned() {
            return Err(TradingError::AlreadyPositioned);
        }
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(TradingError::InvalidConfiguration(format!(
                "entry price must be positive, got {}",
                entry_price
            )));
        }
        if !quantity_held.is_finite() || quantity_held < 0.0 {
            return Err(TradingError::InvalidConfiguration(format!(
                "held quantity must be non-negative, got {}",
                quantity_held
            )));
        }

        self.position = PositionState::Positioned {
            entry_price,
            quantity_held,
        };
        Ok(())
    }

    /// Positioned -> Idle. Clears entry price and held quantity.
    pub fn exit_position(&mut self) -> TradingResult<()> {
        if !self.is_positioned() {
            return Err(TradingError::NotPositioned);
        }
        self.position = PositionState::Idle;
        Ok(())
    }

    fn fee_factor(&self) -> f64 {
        1.0 - self.config.trading_fees_percent / 100.0
    }

    /// Quantity submitted with a buy order at `price`.
    pub fn nominal_quantity(&self, price: f64) -> f64 {
        if self.config.use_fixed_quantity {
            self.config.base_quantity
        } else if price > 0.0 {
            self.config.trade_amount / price
        } else {
            0.0
        }
    }

    /// Quantity actually retained after a buy at `price`.
    pub fn fee_adjusted_quantity(&self, price: f64) -> f64 {
        self.nominal_quantity(price) * self.fee_factor()
    }

    /// Currency value committed by a buy at `price`.
    pub fn trade_value(&self, price: f64) -> f64 {
        if self.config.use_fixed_quantity {
            self.config.base_quantity * price
        } else {
            self.config.trade_amount
        }
    }

    /// Held quantity when a real fill was recorded, otherwise the fee-adjusted
    /// nominal quantity at the entry price.
    pub fn calculate_quantity_for_sell(&self) -> f64 {
        let held = self.actual_quantity_held();
        if held > 0.0 {
            return held;
        }

        let reference_price = self.entry_price().unwrap_or(0.0);
        if self.config.use_fixed_quantity || reference_price <= 0.0 {
            self.config.base_quantity * self.fee_factor()
        } else {
            self.fee_adjusted_quantity(reference_price)
        }
    }

    pub fn unrealized_profit_percent(&self, current_price: f64) -> Option<f64> {
        self.entry_price()
            .map(|entry| (current_price - entry) / entry * 100.0)
    }

    /// Apply the bot's risk gates to a strategy decision.
    ///
    /// Returns the decision to act on and, when it was overridden, the reason.
    pub fn review_decision(
        &self,
        decision: TradingDecision,
        current_price: f64,
    ) -> (TradingDecision, Option<String>) {
        let profit = match self.unrealized_profit_percent(current_price) {
            Some(profit) => profit,
            None => return (decision, None),
        };

        if let Some(stop_loss) = self.config.stop_loss_percent {
            if profit <= -stop_loss {
                return (
                    TradingDecision::Sell,
                    Some(format!("stop_loss_triggered: {:.2}% <= -{:.2}%", profit, stop_loss)),
                );
            }
        }

        if decision == TradingDecision::Sell
            && profit < self.config.minimum_profit_threshold_percent
        {
            return (
                TradingDecision::Hold,
                Some(format!(
                    "insufficient_profit: {:.2}% < {:.2}%",
                    profit, self.config.minimum_profit_threshold_percent
                )),
            );
        }

        (decision, None)
    }
}
