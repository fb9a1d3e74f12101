// src/application/usecase/live_trading_usecase.rs
// Interval-driven live trading loop for a single bot

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::application::service::{
    run_trading_cycle, MarketDataSource, SharedTradingBot, TickReport, TradingExecutionContext,
};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::model::{BotStatus, TradingDecision};
use crate::domain::repository::TradingBotRepository;

pub struct LiveTradingUseCase {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
    market_data: Arc<dyn MarketDataSource + Send + Sync>,
    context: Arc<dyn TradingExecutionContext + Send + Sync>,
}

impl LiveTradingUseCase {
    pub fn new(
        bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
        market_data: Arc<dyn MarketDataSource + Send + Sync>,
        context: Arc<dyn TradingExecutionContext + Send + Sync>,
    ) -> Self {
        Self {
            bot_repository,
            market_data,
            context,
        }
    }

    /// Run one evaluation tick. State conflicts are reported as `Ok(None)`.
    pub async fn tick(&self, bot: &SharedTradingBot) -> AppResult<Option<TickReport>> {
        match run_trading_cycle(bot, self.market_data.as_ref(), self.context.as_ref()).await {
            Ok(report) => Ok(Some(report)),
            Err(AppError::Trading(e)) if e.is_state_conflict() => {
                log::debug!("Tick skipped: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Evaluate immediately, then once per bot interval, until the bot is no
    /// longer running or the execution context is stopped.
    pub async fn run(&self, bot: SharedTradingBot) -> AppResult<()> {
        let (bot_id, interval_seconds) = {
            let guard = bot.lock().await;
            (guard.id(), guard.config().interval_seconds)
        };

        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Live loop for bot {} started ({}s interval)", bot_id, interval_seconds);

        loop {
            ticker.tick().await;

            if !self.context.should_continue() {
                log::info!("Execution context stopped, leaving loop for bot {}", bot_id);
                break;
            }

            match self.bot_repository.get_by_id(bot_id).await {
                Ok(stored) if stored.status() == BotStatus::Running => {}
                Ok(stored) => {
                    log::info!("Bot {} is {}, leaving loop", bot_id, stored.status());
                    break;
                }
                Err(e) => {
                    log::warn!("Could not load bot {}: {}, retrying next interval", bot_id, e);
                    continue;
                }
            }

            match self.tick(&bot).await {
                Ok(Some(report)) if report.decision != TradingDecision::Hold => {
                    log::info!("Bot {} executed {} @ {:.2}", bot_id, report.decision, report.price);
                }
                Ok(Some(report)) => {
                    log::debug!("Bot {} holding: {}", bot_id, report.reason);
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Trading cycle for bot {} failed: {}", bot_id, e);
                }
            }
        }

        Ok(())
    }
}
