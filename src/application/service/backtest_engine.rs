// src/application/service/backtest_engine.rs
// Deterministic replay of a strategy over historical candles

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::backtest_context::BacktestTradingExecutionContext;
use super::market_data::HistoricalMarketDataSource;
use super::trading_cycle::run_trading_cycle;
use super::{share_bot, TradingExecutionContext};
use crate::domain::errors::{AppError, AppResult, MarketDataError};
use crate::domain::model::{BacktestResult, Kline, Symbol, TradingBot, TradingBotConfig, TradingDecision};
use crate::domain::service::TradingStrategy;

fn default_window_size() -> usize {
    100
}

/// Parameters of a backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub trade_amount: f64,
    pub currency: String,
    pub trading_fees_percent: f64,
    pub minimum_profit_threshold_percent: f64,
    pub interval_seconds: u64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub base_quantity: f64,
    #[serde(default)]
    pub use_fixed_quantity: bool,
    #[serde(default)]
    pub stop_loss_percent: Option<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000.0,
            trade_amount: 100.0,
            currency: "USDT".to_string(),
            trading_fees_percent: 0.1,
            minimum_profit_threshold_percent: 0.0,
            interval_seconds: 3_600,
            window_size: default_window_size(),
            base_quantity: 0.0,
            use_fixed_quantity: false,
            stop_loss_percent: None,
        }
    }
}

impl BacktestConfig {
    /// Bot configuration equivalent to this run's parameters.
    pub fn bot_config(&self, symbol: Symbol) -> TradingBotConfig {
        TradingBotConfig {
            symbol,
            base_quantity: self.base_quantity,
            interval_seconds: self.interval_seconds,
            trade_amount: self.trade_amount,
            currency: self.currency.clone(),
            trading_fees_percent: self.trading_fees_percent,
            minimum_profit_threshold_percent: self.minimum_profit_threshold_percent,
            use_fixed_quantity: self.use_fixed_quantity,
            initial_capital: self.initial_capital,
            stop_loss_percent: self.stop_loss_percent,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.window_size == 0 {
            return Err(AppError::Config("backtest window size must be positive".to_string()));
        }
        // Placeholder symbol: only the numeric fields are checked here
        let symbol = Symbol::new("BTCUSDT")?;
        self.bot_config(symbol).validate()?;
        Ok(())
    }
}

pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Build a fresh bot from the engine configuration and replay `strategy`.
    pub async fn run_strategy(
        &self,
        symbol: Symbol,
        strategy: Arc<dyn TradingStrategy>,
        historical_data: Vec<Kline>,
    ) -> AppResult<BacktestResult> {
        let bot = TradingBot::new(self.config.bot_config(symbol), strategy)?;
        self.run(bot, historical_data).await
    }

    /// Replay the bot's strategy over `historical_data`, oldest candle first.
    pub async fn run(&self, bot: TradingBot, historical_data: Vec<Kline>) -> AppResult<BacktestResult> {
        let (start_date, end_date) = match (historical_data.first(), historical_data.last()) {
            (Some(first), Some(last)) => (first.close_time_utc(), last.close_time_utc()),
            _ => return Err(AppError::Backtest("no historical data to replay".to_string())),
        };
        if historical_data
            .windows(2)
            .any(|pair| pair[1].close_time() < pair[0].close_time())
        {
            return Err(AppError::Backtest("historical data is not in chronological order".to_string()));
        }
        if bot.is_positioned() {
            return Err(AppError::Backtest("bot must start the backtest without an open position".to_string()));
        }

        let symbol = bot.symbol().clone();
        let context = BacktestTradingExecutionContext::new(
            symbol.clone(),
            bot.strategy().as_ref(),
            bot.config().currency.clone(),
            bot.config().initial_capital,
        );
        let source = HistoricalMarketDataSource::new(historical_data, self.config.window_size);
        let strategy_name = bot.strategy().name().to_string();
        let bot = share_bot(bot);

        log::info!(
            "Starting backtest of {} on {} over {} candles ({} to {})",
            strategy_name,
            symbol,
            source.len(),
            start_date,
            end_date
        );

        let mut processed: u64 = 0;
        while source.has_more_data() && context.should_continue() {
            match run_trading_cycle(&bot, &source, &context).await {
                Ok(report) => {
                    if report.decision != TradingDecision::Hold {
                        log::debug!("{} {} @ {:.2}", report.timestamp, report.decision, report.price);
                    }
                }
                Err(AppError::Trading(e)) if e.is_state_conflict() => {
                    log::debug!("Skipping tick at candle {}: {}", source.cursor(), e);
                }
                Err(AppError::MarketData(MarketDataError::NoMoreData)) => break,
                Err(e) => {
                    log::error!("Backtest aborted at candle {}: {}", source.cursor(), e);
                    return Err(AppError::Backtest(format!(
                        "failed at candle {}: {}",
                        source.cursor(),
                        e
                    )));
                }
            }
            processed += 1;
            source.advance_to_next();
        }

        let result = context.get_result(start_date, end_date, processed).await;

        log::info!(
            "Backtest finished: {} trades, win rate {:.2}%, ROI {:.2}%, max drawdown {:.2}%",
            result.total_trades,
            result.win_rate,
            result.roi,
            result.max_drawdown
        );

        Ok(result)
    }
}
