// src/application/service/trading_cycle.rs
// One evaluation tick, shared by the live loop and the backtest replay

use chrono::{DateTime, Utc};

use super::{MarketDataSource, SharedTradingBot, TradingExecutionContext};
use crate::domain::errors::{AppResult, MarketDataError};
use crate::domain::model::{TradingDecision, TradingDecisionLog};

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub decision: TradingDecision,
    pub reason: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fetch the window, decide, review against the bot's risk gates, log the
/// decision and execute it.
///
/// Decision-log failures are reported and swallowed. Execution failures,
/// including state conflicts, are returned to the caller.
pub async fn run_trading_cycle(
    bot: &SharedTradingBot,
    data_source: &(dyn MarketDataSource + Send + Sync),
    context: &(dyn TradingExecutionContext + Send + Sync),
) -> AppResult<TickReport> {
    let (bot_id, symbol, interval_seconds, strategy) = {
        let guard = bot.lock().await;
        (
            guard.id(),
            guard.symbol().clone(),
            guard.config().interval_seconds,
            guard.strategy().clone(),
        )
    };

    let window = data_source.get_market_data(&symbol, interval_seconds).await?;
    let price = window.last().ok_or(MarketDataError::Empty)?.close();

    let analysis = strategy.analyze(&window);
    let (decision, override_reason) = bot.lock().await.review_decision(analysis.decision, price);

    let mut reason = override_reason.unwrap_or(analysis.reason);
    if !analysis.indicators.is_empty() {
        let indicators = analysis
            .indicators
            .iter()
            .map(|(name, value)| format!("{}={:.4}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        reason = format!("{} [{}]", reason, indicators);
    }

    let timestamp = data_source.get_current_time();
    let decision_log = TradingDecisionLog::new(bot_id, decision, price, timestamp, reason.clone());
    if let Err(e) = context.on_decision_made(&decision_log).await {
        log::warn!("Decision log for bot {} not recorded: {}", bot_id, e);
    }

    context.execute_trade(decision, bot, price, timestamp).await?;

    Ok(TickReport {
        decision,
        reason,
        price,
        timestamp,
    })
}
