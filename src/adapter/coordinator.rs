// src/adapter/coordinator.rs
// Owns the live loops of running bots

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::application::service::{
    share_bot, LiveTradingExecutionContext, MarketDataSource, SharedTradingBot, TradingExecutionContext,
};
use crate::application::usecase::{LiveTradingUseCase, StartTradingBotUseCase};
use crate::domain::errors::{AppResult, RepositoryError};
use crate::domain::model::{BotStatus, TradingBot, TradingBotId};
use crate::domain::repository::{TradingBotRepository, TradingDecisionLogRepository};
use crate::domain::service::{OrderGateway, TradingEventPublisher};

struct RunningBot {
    bot: SharedTradingBot,
    context: Arc<LiveTradingExecutionContext>,
    handle: JoinHandle<()>,
}

pub struct TradingCoordinator {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
    decision_log_repository: Arc<dyn TradingDecisionLogRepository + Send + Sync>,
    order_gateway: Arc<dyn OrderGateway + Send + Sync>,
    market_data: Arc<dyn MarketDataSource + Send + Sync>,
    event_publisher: Arc<dyn TradingEventPublisher + Send + Sync>,
    request_timeout: Duration,
    running: Mutex<HashMap<TradingBotId, RunningBot>>,
}

impl TradingCoordinator {
    pub fn new(
        bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
        decision_log_repository: Arc<dyn TradingDecisionLogRepository + Send + Sync>,
        order_gateway: Arc<dyn OrderGateway + Send + Sync>,
        market_data: Arc<dyn MarketDataSource + Send + Sync>,
        event_publisher: Arc<dyn TradingEventPublisher + Send + Sync>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            bot_repository,
            decision_log_repository,
            order_gateway,
            market_data,
            event_publisher,
            request_timeout,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Mark a bot running and spawn its loop.
    pub async fn start_bot(&self, id: TradingBotId) -> AppResult<SharedTradingBot> {
        let bot = StartTradingBotUseCase::new(self.bot_repository.clone())
            .execute(id)
            .await?;
        let (shared, _) = self.spawn(bot).await;
        Ok(shared)
    }

    /// Spawn loops for bots persisted as running, e.g. after a restart.
    /// Bots that already have a live loop are left alone; returns how many
    /// loops were spawned.
    pub async fn resume_running_bots(&self) -> AppResult<usize> {
        let bots = self.bot_repository.get_all_by_status(BotStatus::Running).await?;
        let mut spawned = 0;
        for bot in bots {
            if self.spawn(bot).await.1 {
                spawned += 1;
            }
        }
        log::info!("Resumed {} running bots", spawned);
        Ok(spawned)
    }

    /// One loop per bot id: an id with a live loop gets its existing shared
    /// bot back and nothing is spawned.
    async fn spawn(&self, bot: TradingBot) -> (SharedTradingBot, bool) {
        let id = bot.id();
        let mut running = self.running.lock().await;

        if let Some(existing) = running.get(&id) {
            if !existing.handle.is_finished() {
                log::debug!("Bot {} already has a live loop", id);
                return (existing.bot.clone(), false);
            }
        }
        if let Some(previous) = running.remove(&id) {
            previous.context.stop();
            let _guard = previous.bot.lock().await;
            previous.handle.abort();
        }

        let shared = share_bot(bot);
        let context = Arc::new(LiveTradingExecutionContext::new(
            self.order_gateway.clone(),
            self.bot_repository.clone(),
            self.decision_log_repository.clone(),
            self.event_publisher.clone(),
            self.request_timeout,
        ));
        let use_case = LiveTradingUseCase::new(
            self.bot_repository.clone(),
            self.market_data.clone(),
            context.clone(),
        );

        let loop_bot = shared.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = use_case.run(loop_bot).await {
                log::error!("Live loop for bot {} ended with error: {}", id, e);
            }
        });

        running.insert(
            id,
            RunningBot {
                bot: shared.clone(),
                context,
                handle,
            },
        );

        log::info!("Trading coordinator started bot {}", id);
        (shared, true)
    }

    /// Stop a bot's loop and persist it as stopped.
    pub async fn stop_bot(&self, id: TradingBotId) -> AppResult<()> {
        let entry = self
            .running
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("no live loop for bot {}", id)))?;

        entry.context.stop();

        // With the bot locked no trade can be in flight, so aborting is safe
        let mut bot = entry.bot.lock().await;
        entry.handle.abort();
        bot.stop()?;
        self.bot_repository.update(&bot).await?;

        log::info!("Trading coordinator stopped bot {}", id);
        Ok(())
    }

    pub async fn running_bots(&self) -> Vec<TradingBotId> {
        let mut ids: Vec<TradingBotId> = self.running.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn shutdown(&self) {
        for id in self.running_bots().await {
            if let Err(e) = self.stop_bot(id).await {
                log::error!("Failed to stop bot {}: {}", id, e);
            }
        }
        log::info!("Trading coordinator stopped");
    }
}
