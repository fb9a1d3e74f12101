// src/application/service/live_context.rs
// Execution against a real exchange

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{SharedTradingBot, TradingExecutionContext};
use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::model::{OrderSide, TradingBot, TradingDecision, TradingDecisionLog, TradingEvent};
use crate::domain::repository::{TradingBotRepository, TradingDecisionLogRepository};
use crate::domain::service::{OrderGateway, TradingEventPublisher};

pub struct LiveTradingExecutionContext {
    order_gateway: Arc<dyn OrderGateway + Send + Sync>,
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
    decision_log_repository: Arc<dyn TradingDecisionLogRepository + Send + Sync>,
    event_publisher: Arc<dyn TradingEventPublisher + Send + Sync>,
    request_timeout: Duration,
    running: AtomicBool,
}

impl LiveTradingExecutionContext {
    pub fn new(
        order_gateway: Arc<dyn OrderGateway + Send + Sync>,
        bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
        decision_log_repository: Arc<dyn TradingDecisionLogRepository + Send + Sync>,
        event_publisher: Arc<dyn TradingEventPublisher + Send + Sync>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            order_gateway,
            bot_repository,
            decision_log_repository,
            event_publisher,
            request_timeout,
            running: AtomicBool::new(true),
        }
    }

    async fn bounded<T, E, F>(&self, operation: &str, future: F) -> TradingResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<TradingError>,
    {
        match tokio::time::timeout(self.request_timeout, future).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(TradingError::Timeout(format!(
                "{} exceeded {:?}",
                operation, self.request_timeout
            ))),
        }
    }

    /// Persist `updated` and only then make it the bot's state.
    async fn commit(&self, bot: &mut TradingBot, updated: TradingBot) -> TradingResult<()> {
        self.bounded("bot persistence", self.bot_repository.update(&updated))
            .await?;
        *bot = updated;
        Ok(())
    }

    async fn publish(&self, event: TradingEvent) {
        match tokio::time::timeout(self.request_timeout, self.event_publisher.publish(&event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to publish {}: {}", event.routing_key(), e),
            Err(_) => log::warn!("Publishing {} timed out", event.routing_key()),
        }
    }

    async fn open_position(
        &self,
        bot: &mut TradingBot,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        if bot.is_positioned() {
            return Err(TradingError::AlreadyPositioned);
        }

        let quantity = bot.nominal_quantity(price);
        if quantity <= 0.0 {
            return Err(TradingError::InvalidConfiguration(format!(
                "computed buy quantity {} for price {}",
                quantity, price
            )));
        }

        let confirmation = self
            .bounded(
                "buy order placement",
                self.order_gateway.place_market_order(bot.symbol(), OrderSide::Buy, quantity),
            )
            .await
            .map_err(|e| {
                log::error!("Buy order for {} failed: {}", bot.symbol(), e);
                e
            })?;

        let quantity_held = bot.fee_adjusted_quantity(price);
        let mut updated = bot.clone();
        updated.enter_position(price, quantity_held)?;
        if let Err(e) = self.commit(bot, updated).await {
            log::error!(
                "Order {} filled but bot {} could not be persisted: {}",
                confirmation.order_id,
                bot.id(),
                e
            );
            return Err(e);
        }

        log::info!(
            "Bot {} opened position: {} {:.8} @ {:.2} (held after fees {:.8}, order {})",
            bot.id(),
            bot.symbol(),
            quantity,
            price,
            quantity_held,
            confirmation.order_id
        );

        let config = bot.config();
        self.publish(TradingEvent::PositionOpened {
            bot_id: bot.id(),
            symbol: bot.symbol().to_string(),
            price,
            quantity,
            total_value: bot.trade_value(price),
            strategy: bot.strategy().name().to_string(),
            trading_fees: config.trading_fees_percent,
            currency: config.currency.clone(),
            timestamp,
        })
        .await;

        Ok(())
    }

    async fn close_position(
        &self,
        bot: &mut TradingBot,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        let entry_price = bot.entry_price().ok_or(TradingError::NotPositioned)?;
        let quantity = bot.calculate_quantity_for_sell();
        let profit_percent = (price - entry_price) / entry_price * 100.0;

        log::info!(
            "Bot {} selling {:.8} {} @ {:.2}, entry {:.2}, profit {:.2}%",
            bot.id(),
            quantity,
            bot.symbol(),
            price,
            entry_price,
            profit_percent
        );

        let confirmation = self
            .bounded(
                "sell order placement",
                self.order_gateway.place_market_order(bot.symbol(), OrderSide::Sell, quantity),
            )
            .await
            .map_err(|e| {
                log::error!("Sell order for {} failed: {}", bot.symbol(), e);
                e
            })?;

        let mut updated = bot.clone();
        updated.exit_position()?;
        if let Err(e) = self.commit(bot, updated).await {
            log::error!(
                "Order {} filled but bot {} could not be persisted: {}",
                confirmation.order_id,
                bot.id(),
                e
            );
            return Err(e);
        }

        log::info!(
            "Bot {} closed position on {} (order {})",
            bot.id(),
            bot.symbol(),
            confirmation.order_id
        );

        let config = bot.config();
        self.publish(TradingEvent::PositionClosed {
            bot_id: bot.id(),
            symbol: bot.symbol().to_string(),
            price,
            quantity,
            total_value: price * quantity,
            strategy: bot.strategy().name().to_string(),
            trading_fees: config.trading_fees_percent,
            currency: config.currency.clone(),
            entry_price,
            profit_loss: (price - entry_price) * quantity,
            profit_loss_percent: profit_percent,
            timestamp,
        })
        .await;

        Ok(())
    }
}

#[async_trait]
impl TradingExecutionContext for LiveTradingExecutionContext {
    async fn execute_trade(
        &self,
        decision: TradingDecision,
        bot: &SharedTradingBot,
        current_price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        if decision == TradingDecision::Hold {
            log::debug!("Holding at {:.2}", current_price);
            return Ok(());
        }

        // The guard is held from the state check through the commit
        let mut guard = bot.lock().await;
        match decision {
            TradingDecision::Buy => self.open_position(&mut guard, current_price, timestamp).await,
            TradingDecision::Sell => self.close_position(&mut guard, current_price, timestamp).await,
            TradingDecision::Hold => Ok(()),
        }
    }

    async fn on_decision_made(&self, decision_log: &TradingDecisionLog) -> TradingResult<()> {
        let result = self
            .bounded("decision log persistence", self.decision_log_repository.save(decision_log))
            .await;
        if let Err(e) = &result {
            log::warn!("Failed to save decision log for bot {}: {}", decision_log.bot_id, e);
        }
        result
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
