// src/main.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::signal::ctrl_c;

use position_trader::adapter::TradingCoordinator;
use position_trader::application::dto::CreateTradingBotInput;
use position_trader::application::service::{BacktestEngine, LiveMarketDataSource};
use position_trader::application::usecase::{BacktestInput, BacktestTradingBotUseCase, CreateTradingBotUseCase};
use position_trader::config::{Config, RunMode};
use position_trader::domain::errors::{AppError, AppResult};
use position_trader::domain::model::{BacktestResult, Kline, Symbol, TradingBotId};
use position_trader::infrastructure::exchange::BinanceExchange;
use position_trader::infrastructure::messaging::LogEventPublisher;
use position_trader::infrastructure::persistence::{
    InMemoryTradingBotRepository, InMemoryTradingDecisionLogRepository,
};
use position_trader::infrastructure::strategy::build_strategy;

const DEFAULT_BACKTEST_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration, from a file when one is given
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting position_trader v{}", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Mode: {:?}, exchange: {}, symbol: {}, strategy: {}",
        config.mode,
        config.exchange.name,
        config.bot.symbol,
        config.bot.strategy
    );

    match config.mode {
        RunMode::Backtest => run_backtest(&config).await,
        RunMode::Live => run_live(&config).await,
    }
}

fn create_exchange(config: &Config) -> Arc<BinanceExchange> {
    Arc::new(BinanceExchange::new(
        config.exchange.api_key.clone(),
        config.exchange.api_secret.clone(),
        config.exchange.testnet,
    ))
}

fn parse_date(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| AppError::Config(format!("Invalid date {}: {}", value, e)))
}

async fn run_backtest(config: &Config) -> AppResult<()> {
    let result: BacktestResult = match &config.backtest.kline_file {
        Some(path) => {
            log::info!("Replaying candles from {}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            let klines: Vec<Kline> = serde_json::from_str(&contents)?;

            let symbol = Symbol::new(&config.bot.symbol)?;
            let strategy = build_strategy(&config.bot.strategy, &config.bot.strategy_params)?;
            let engine = BacktestEngine::new(config.backtest_config())?;
            engine.run_strategy(symbol, strategy, klines).await?
        }
        None => {
            let end_date = match &config.backtest.end_date {
                Some(value) => parse_date(value)?,
                None => Utc::now(),
            };
            let start_date = match &config.backtest.start_date {
                Some(value) => parse_date(value)?,
                None => end_date - chrono::Duration::days(DEFAULT_BACKTEST_DAYS),
            };
            log::info!("Fetching history from {} to {}", start_date, end_date);

            let use_case = BacktestTradingBotUseCase::new(create_exchange(config));
            use_case
                .execute(BacktestInput {
                    symbol: config.bot.symbol.clone(),
                    strategy: config.bot.strategy.clone(),
                    strategy_params: config.bot.strategy_params.clone(),
                    start_date,
                    end_date,
                    config: config.backtest_config(),
                })
                .await?
        }
    };

    let report = serde_json::to_string_pretty(&result)?;
    match &config.backtest.report_file {
        Some(path) => {
            tokio::fs::write(path, &report).await?;
            log::info!("Backtest report written to {}", path);
        }
        None => println!("{}", report),
    }

    Ok(())
}

async fn run_live(config: &Config) -> AppResult<()> {
    let timeout = Duration::from_secs(config.exchange.request_timeout_secs);
    let exchange = create_exchange(config);

    let bot_repository = Arc::new(InMemoryTradingBotRepository::new());
    let decision_log_repository = Arc::new(InMemoryTradingDecisionLogRepository::new());
    let market_data = Arc::new(LiveMarketDataSource::new(exchange.clone(), timeout));

    let coordinator = TradingCoordinator::new(
        bot_repository.clone(),
        decision_log_repository,
        exchange,
        market_data,
        Arc::new(LogEventPublisher),
        timeout,
    );

    let created = CreateTradingBotUseCase::new(bot_repository)
        .execute(CreateTradingBotInput {
            symbol: config.bot.symbol.clone(),
            strategy: config.bot.strategy.clone(),
            strategy_params: config.bot.strategy_params.clone(),
            quantity: config.bot.base_quantity,
            interval_seconds: config.bot.interval_seconds,
            initial_capital: config.bot.initial_capital,
            trade_amount: config.bot.trade_amount,
            currency: config.bot.currency.clone(),
            trading_fees: config.bot.trading_fees_percent,
            minimum_profit_threshold: config.bot.minimum_profit_threshold_percent,
            stop_loss: config.bot.stop_loss_percent,
            use_fixed_quantity: config.bot.use_fixed_quantity,
        })
        .await?;

    let bot_id = TradingBotId::parse(&created.id)?;
    coordinator.start_bot(bot_id).await?;
    log::info!("Bot {} running, press Ctrl+C to stop", bot_id);

    // Wait for termination signal
    if let Err(e) = ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
    }
    log::info!("Shutting down...");

    coordinator.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}
