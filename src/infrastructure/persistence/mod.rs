// src/infrastructure/persistence/mod.rs
// In-memory repositories

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::model::{BotStatus, TradingBot, TradingBotId, TradingDecisionLog};
use crate::domain::repository::{TradingBotRepository, TradingDecisionLogRepository};

#[derive(Default)]
pub struct InMemoryTradingBotRepository {
    bots: RwLock<HashMap<TradingBotId, TradingBot>>,
}

impl InMemoryTradingBotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradingBotRepository for InMemoryTradingBotRepository {
    async fn save(&self, bot: &TradingBot) -> RepositoryResult<()> {
        let mut bots = self.bots.write().await;
        if bots.contains_key(&bot.id()) {
            return Err(RepositoryError::Storage(format!("bot {} already exists", bot.id())));
        }
        bots.insert(bot.id(), bot.clone());
        Ok(())
    }

    async fn update(&self, bot: &TradingBot) -> RepositoryResult<()> {
        let mut bots = self.bots.write().await;
        match bots.get_mut(&bot.id()) {
            Some(stored) => {
                *stored = bot.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("bot {}", bot.id()))),
        }
    }

    async fn get_by_id(&self, id: TradingBotId) -> RepositoryResult<TradingBot> {
        self.bots
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("bot {}", id)))
    }

    async fn get_all_by_status(&self, status: BotStatus) -> RepositoryResult<Vec<TradingBot>> {
        let mut bots: Vec<TradingBot> = self
            .bots
            .read()
            .await
            .values()
            .filter(|bot| bot.status() == status)
            .cloned()
            .collect();
        bots.sort_by_key(|bot| (bot.created_at(), bot.id()));
        Ok(bots)
    }
}

#[derive(Default)]
pub struct InMemoryTradingDecisionLogRepository {
    logs: RwLock<Vec<TradingDecisionLog>>,
}

impl InMemoryTradingDecisionLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl TradingDecisionLogRepository for InMemoryTradingDecisionLogRepository {
    async fn save(&self, entry: &TradingDecisionLog) -> RepositoryResult<()> {
        self.logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn get_by_bot_id(
        &self,
        bot_id: TradingBotId,
        limit: usize,
    ) -> RepositoryResult<Vec<TradingDecisionLog>> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| entry.bot_id == bot_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TradingDecision;
    use chrono::{DateTime, Utc};

    #[tokio::test]
    async fn decision_logs_are_returned_newest_first() {
        let repository = InMemoryTradingDecisionLogRepository::new();
        let bot_id = TradingBotId::new();
        let other = TradingBotId::new();

        for i in 0..5 {
            let at = DateTime::<Utc>::from_timestamp(1_640_995_200 + i * 60, 0).unwrap();
            repository
                .save(&TradingDecisionLog::new(bot_id, TradingDecision::Hold, i as f64, at, "tick"))
                .await
                .unwrap();
        }
        repository
            .save(&TradingDecisionLog::new(other, TradingDecision::Buy, 1.0, Utc::now(), "tick"))
            .await
            .unwrap();

        let latest = repository.get_by_bot_id(bot_id, 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].price, 4.0);
        assert_eq!(latest[1].price, 3.0);
        assert_eq!(repository.len().await, 6);
    }
}
