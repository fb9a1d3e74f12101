// src/domain/repository/mod.rs
// Repository interfaces for domain entities

use async_trait::async_trait;

use crate::domain::errors::RepositoryResult;
use crate::domain::model::{BotStatus, TradingBot, TradingBotId, TradingDecisionLog};

/// Persistence for trading bots
#[async_trait]
pub trait TradingBotRepository {
    async fn save(&self, bot: &TradingBot) -> RepositoryResult<()>;
    async fn update(&self, bot: &TradingBot) -> RepositoryResult<()>;
    async fn get_by_id(&self, id: TradingBotId) -> RepositoryResult<TradingBot>;
    async fn get_all_by_status(&self, status: BotStatus) -> RepositoryResult<Vec<TradingBot>>;
}

/// Persistence for per-tick decision logs
#[async_trait]
pub trait TradingDecisionLogRepository {
    async fn save(&self, log: &TradingDecisionLog) -> RepositoryResult<()>;

    /// Most recent logs first, at most `limit` entries.
    async fn get_by_bot_id(
        &self,
        bot_id: TradingBotId,
        limit: usize,
    ) -> RepositoryResult<Vec<TradingDecisionLog>>;
}
