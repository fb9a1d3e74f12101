// src/application/usecase/backtest_usecase.rs
// Backtest a strategy over exchange history for a date range

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::application::service::{BacktestConfig, BacktestEngine};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::model::{BacktestResult, Kline, KlineInterval, Symbol};
use crate::domain::service::KlineProvider;
use crate::infrastructure::strategy::build_strategy;

/// Maximum candles the exchange returns per request
pub const HISTORY_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestInput {
    pub symbol: String,
    pub strategy: String,
    pub strategy_params: serde_json::Value,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub config: BacktestConfig,
}

pub struct BacktestTradingBotUseCase {
    kline_provider: Arc<dyn KlineProvider + Send + Sync>,
}

impl BacktestTradingBotUseCase {
    pub fn new(kline_provider: Arc<dyn KlineProvider + Send + Sync>) -> Self {
        Self { kline_provider }
    }

    pub async fn execute(&self, input: BacktestInput) -> AppResult<BacktestResult> {
        if input.start_date >= input.end_date {
            return Err(AppError::Backtest(format!(
                "start date {} must be before end date {}",
                input.start_date, input.end_date
            )));
        }

        let symbol = Symbol::new(&input.symbol)?;
        let strategy = build_strategy(&input.strategy, &input.strategy_params)?;
        let interval = KlineInterval::from_seconds(input.config.interval_seconds)?;
        let engine = BacktestEngine::new(input.config)?;

        let history = self
            .fetch_history(&symbol, interval, input.start_date, input.end_date)
            .await?;
        if history.is_empty() {
            return Err(AppError::Backtest(format!(
                "no candles for {} between {} and {}",
                symbol, input.start_date, input.end_date
            )));
        }

        engine.run_strategy(symbol, strategy, history).await
    }

    /// Page through the exchange history, oldest first, without duplicates.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: KlineInterval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Kline>> {
        let mut history: Vec<Kline> = Vec::new();
        let mut cursor = start;

        while cursor < end {
            let page = self
                .kline_provider
                .get_klines_between(symbol, interval, cursor, end, HISTORY_PAGE_SIZE)
                .await?;
            let page_len = page.len();

            let mut last_close = None;
            for kline in page {
                let newer = history
                    .last()
                    .map_or(true, |last| kline.close_time() > last.close_time());
                if newer {
                    last_close = Some(kline.close_time_utc());
                    history.push(kline);
                }
            }

            log::debug!("Fetched {} candles for {} (total {})", page_len, symbol, history.len());

            match last_close {
                Some(close) if page_len == HISTORY_PAGE_SIZE => {
                    cursor = close + Duration::milliseconds(1);
                }
                _ => break,
            }
        }

        Ok(history)
    }
}
