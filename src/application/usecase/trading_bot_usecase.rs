// src/application/usecase/trading_bot_usecase.rs
// Bot lifecycle use cases: create, start, stop, list

use std::sync::Arc;

use crate::application::dto::{CreateTradingBotInput, TradingBotDto};
use crate::domain::errors::AppResult;
use crate::domain::model::{BotStatus, Symbol, TradingBot, TradingBotConfig, TradingBotId};
use crate::domain::repository::TradingBotRepository;
use crate::infrastructure::strategy::build_strategy;

pub struct CreateTradingBotUseCase {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
}

impl CreateTradingBotUseCase {
    pub fn new(bot_repository: Arc<dyn TradingBotRepository + Send + Sync>) -> Self {
        Self { bot_repository }
    }

    /// Validate the input, build the strategy and persist a new idle bot.
    /// Invalid strategy parameters or symbols fail here, before any loop starts.
    pub async fn execute(&self, input: CreateTradingBotInput) -> AppResult<TradingBotDto> {
        let symbol = Symbol::new(&input.symbol)?;
        let strategy = build_strategy(&input.strategy, &input.strategy_params)?;

        let config = TradingBotConfig {
            symbol,
            base_quantity: input.quantity,
            interval_seconds: input.interval_seconds,
            trade_amount: input.trade_amount,
            currency: input.currency,
            trading_fees_percent: input.trading_fees,
            minimum_profit_threshold_percent: input.minimum_profit_threshold,
            use_fixed_quantity: input.use_fixed_quantity,
            initial_capital: input.initial_capital,
            stop_loss_percent: input.stop_loss,
        };

        let bot = TradingBot::new(config, strategy)?;
        self.bot_repository.save(&bot).await?;

        log::info!(
            "Created bot {} for {} using {}",
            bot.id(),
            bot.symbol(),
            bot.strategy().name()
        );
        Ok(TradingBotDto::from(&bot))
    }
}

pub struct StartTradingBotUseCase {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
}

impl StartTradingBotUseCase {
    pub fn new(bot_repository: Arc<dyn TradingBotRepository + Send + Sync>) -> Self {
        Self { bot_repository }
    }

    /// Mark the bot running and return it, ready to be handed to a live loop.
    pub async fn execute(&self, id: TradingBotId) -> AppResult<TradingBot> {
        let mut bot = self.bot_repository.get_by_id(id).await?;
        bot.start()?;
        self.bot_repository.update(&bot).await?;
        log::info!("Bot {} started", id);
        Ok(bot)
    }
}

pub struct StopTradingBotUseCase {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
}

impl StopTradingBotUseCase {
    pub fn new(bot_repository: Arc<dyn TradingBotRepository + Send + Sync>) -> Self {
        Self { bot_repository }
    }

    pub async fn execute(&self, id: TradingBotId) -> AppResult<TradingBot> {
        let mut bot = self.bot_repository.get_by_id(id).await?;
        bot.stop()?;
        self.bot_repository.update(&bot).await?;
        log::info!("Bot {} stopped", id);
        Ok(bot)
    }
}

pub struct ListTradingBotsUseCase {
    bot_repository: Arc<dyn TradingBotRepository + Send + Sync>,
}

impl ListTradingBotsUseCase {
    pub fn new(bot_repository: Arc<dyn TradingBotRepository + Send + Sync>) -> Self {
        Self { bot_repository }
    }

    pub async fn execute(&self, status: BotStatus) -> AppResult<Vec<TradingBotDto>> {
        let bots = self.bot_repository.get_all_by_status(status).await?;
        Ok(bots.iter().map(TradingBotDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{AppError, TradingError};
    use crate::infrastructure::persistence::InMemoryTradingBotRepository;
    use serde_json::json;

    fn input() -> CreateTradingBotInput {
        CreateTradingBotInput {
            symbol: "btcbrl".to_string(),
            strategy: "MovingAverage".to_string(),
            strategy_params: json!({"FastWindow": 7, "SlowWindow": 40}),
            quantity: 0.001,
            interval_seconds: 3_600,
            initial_capital: 1_000.0,
            trade_amount: 100.0,
            currency: "BRL".to_string(),
            trading_fees: 0.1,
            minimum_profit_threshold: 0.5,
            stop_loss: None,
            use_fixed_quantity: true,
        }
    }

    #[tokio::test]
    async fn create_start_stop_lifecycle() {
        let repository = Arc::new(InMemoryTradingBotRepository::new());
        let created = CreateTradingBotUseCase::new(repository.clone())
            .execute(input())
            .await
            .unwrap();
        assert_eq!(created.symbol, "BTCBRL");
        assert_eq!(created.status, "created");
        assert!(!created.is_positioned);

        let id = TradingBotId::parse(&created.id).unwrap();
        let started = StartTradingBotUseCase::new(repository.clone()).execute(id).await.unwrap();
        assert_eq!(started.status(), BotStatus::Running);

        let running = ListTradingBotsUseCase::new(repository.clone())
            .execute(BotStatus::Running)
            .await
            .unwrap();
        assert_eq!(running.len(), 1);

        StopTradingBotUseCase::new(repository.clone()).execute(id).await.unwrap();
        let err = StopTradingBotUseCase::new(repository.clone()).execute(id).await.unwrap_err();
        assert!(matches!(err, AppError::Trading(TradingError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_saving() {
        let repository = Arc::new(InMemoryTradingBotRepository::new());
        let use_case = CreateTradingBotUseCase::new(repository.clone());

        let mut bad_strategy = input();
        bad_strategy.strategy_params = json!({"FastWindow": 40, "SlowWindow": 7});
        assert!(use_case.execute(bad_strategy).await.is_err());

        let mut bad_symbol = input();
        bad_symbol.symbol = "B$".to_string();
        assert!(use_case.execute(bad_symbol).await.is_err());

        let mut bad_amount = input();
        bad_amount.trade_amount = -1.0;
        assert!(use_case.execute(bad_amount).await.is_err());

        assert!(repository.get_all_by_status(BotStatus::Created).await.unwrap().is_empty());
    }
}
