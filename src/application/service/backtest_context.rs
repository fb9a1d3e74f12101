// src/application/service/backtest_context.rs
// Simulated execution against an in-memory ledger

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{SharedTradingBot, TradingExecutionContext};
use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::model::{
    BacktestResult, BacktestTrade, CapitalPoint, DecisionCounts, Symbol, TradingDecision,
    TradingDecisionLog,
};
use crate::domain::service::TradingStrategy;

#[derive(Debug, Clone, Copy)]
struct OpenTrade {
    entry_price: f64,
    entry_time: DateTime<Utc>,
    quantity: f64,
    trade_value: f64,
    entry_fees: f64,
}

#[derive(Debug)]
struct Ledger {
    capital: f64,
    high_water_mark: f64,
    max_drawdown: f64,
    current_trade: Option<OpenTrade>,
    trades: Vec<BacktestTrade>,
    winning_trades: u64,
    losing_trades: u64,
    total_fees: f64,
    decision_counts: DecisionCounts,
    capital_history: Vec<CapitalPoint>,
}

impl Ledger {
    fn push_point(&mut self, timestamp: DateTime<Utc>) {
        self.capital_history.push(CapitalPoint {
            timestamp,
            capital: self.capital,
        });
    }

    /// Only closed trades move the high-water mark or the drawdown.
    fn update_drawdown(&mut self) {
        if self.capital > self.high_water_mark {
            self.high_water_mark = self.capital;
        } else if self.high_water_mark > 0.0 {
            let drawdown = ((self.high_water_mark - self.capital) / self.high_water_mark * 100.0)
                .clamp(0.0, 100.0);
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }
}

/// Execution context for backtests. Never touches the network or a database.
pub struct BacktestTradingExecutionContext {
    symbol: Symbol,
    strategy_name: String,
    strategy_parameters: String,
    currency: String,
    initial_capital: f64,
    ledger: Mutex<Ledger>,
    running: AtomicBool,
}

impl BacktestTradingExecutionContext {
    pub fn new(
        symbol: Symbol,
        strategy: &dyn TradingStrategy,
        currency: impl Into<String>,
        initial_capital: f64,
    ) -> Self {
        Self {
            symbol,
            strategy_name: strategy.name().to_string(),
            strategy_parameters: strategy.parameters().to_string(),
            currency: currency.into(),
            initial_capital,
            ledger: Mutex::new(Ledger {
                capital: initial_capital,
                high_water_mark: initial_capital,
                max_drawdown: 0.0,
                current_trade: None,
                trades: Vec::new(),
                winning_trades: 0,
                losing_trades: 0,
                total_fees: 0.0,
                decision_counts: DecisionCounts::default(),
                capital_history: Vec::new(),
            }),
            running: AtomicBool::new(true),
        }
    }

    pub async fn current_capital(&self) -> f64 {
        self.ledger.lock().await.capital
    }

    pub async fn max_drawdown(&self) -> f64 {
        self.ledger.lock().await.max_drawdown
    }

    async fn open_trade(
        &self,
        bot: &SharedTradingBot,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        let mut bot = bot.lock().await;
        if bot.is_positioned() {
            return Err(TradingError::AlreadyPositioned);
        }

        let trade_value = bot.trade_value(price);
        let fees = trade_value * bot.config().trading_fees_percent / 100.0;
        let quantity = bot.fee_adjusted_quantity(price);

        bot.enter_position(price, quantity)?;

        let mut ledger = self.ledger.lock().await;
        ledger.current_trade = Some(OpenTrade {
            entry_price: price,
            entry_time: timestamp,
            quantity,
            trade_value,
            entry_fees: fees,
        });
        ledger.capital -= fees;
        ledger.total_fees += fees;
        ledger.push_point(timestamp);

        log::debug!(
            "[backtest] BUY {} {:.8} @ {:.2}, fees {:.4}, capital {:.2}",
            self.symbol,
            quantity,
            price,
            fees,
            ledger.capital
        );
        Ok(())
    }

    async fn close_trade(
        &self,
        bot: &SharedTradingBot,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        let mut bot = bot.lock().await;
        if !bot.is_positioned() {
            return Err(TradingError::NotPositioned);
        }

        let mut ledger = self.ledger.lock().await;
        let open = ledger.current_trade.ok_or(TradingError::NoOpenTrade)?;

        bot.exit_position()?;

        let exit_fees = bot.trade_value(price) * bot.config().trading_fees_percent / 100.0;
        let pnl_percent = (price - open.entry_price) / open.entry_price * 100.0;
        let pnl = open.trade_value * pnl_percent / 100.0 - exit_fees;

        ledger.current_trade = None;
        ledger.trades.push(BacktestTrade {
            entry_price: open.entry_price,
            exit_price: price,
            entry_time: open.entry_time,
            exit_time: timestamp,
            quantity: open.quantity,
            fees: open.entry_fees + exit_fees,
            pnl,
            pnl_percent,
        });
        if pnl > 0.0 {
            ledger.winning_trades += 1;
        } else {
            ledger.losing_trades += 1;
        }
        ledger.capital += pnl;
        ledger.total_fees += exit_fees;
        ledger.update_drawdown();
        ledger.push_point(timestamp);

        log::debug!(
            "[backtest] SELL {} @ {:.2} (entry {:.2}), pnl {:.4} ({:.2}%), capital {:.2}",
            self.symbol,
            price,
            open.entry_price,
            pnl,
            pnl_percent,
            ledger.capital
        );
        Ok(())
    }

    /// Finalize metrics for the replayed range.
    pub async fn get_result(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        candles_processed: u64,
    ) -> BacktestResult {
        let ledger = self.ledger.lock().await;

        let total_trades = ledger.trades.len() as u64;
        let win_rate = if total_trades > 0 {
            ledger.winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let roi = (ledger.capital - self.initial_capital) / self.initial_capital * 100.0;

        // Same inputs always produce the same id
        let fingerprint = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.strategy_name,
            self.strategy_parameters,
            self.symbol,
            self.currency,
            self.initial_capital,
            start_date.timestamp_millis(),
            end_date.timestamp_millis()
        );

        BacktestResult {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, fingerprint.as_bytes()),
            strategy_name: self.strategy_name.clone(),
            symbol: self.symbol.to_string(),
            currency: self.currency.clone(),
            start_date,
            end_date,
            initial_capital: self.initial_capital,
            final_capital: ledger.capital,
            total_pnl: ledger.capital - self.initial_capital,
            roi,
            win_rate,
            total_trades,
            winning_trades: ledger.winning_trades,
            losing_trades: ledger.losing_trades,
            max_drawdown: ledger.max_drawdown,
            total_fees: ledger.total_fees,
            decision_counts: ledger.decision_counts,
            candles_processed,
            open_position: ledger.current_trade.map(|t| t.entry_price),
            trades: ledger.trades.clone(),
            capital_history: ledger.capital_history.clone(),
            created_at: end_date,
        }
    }
}

#[async_trait]
impl TradingExecutionContext for BacktestTradingExecutionContext {
    async fn execute_trade(
        &self,
        decision: TradingDecision,
        bot: &SharedTradingBot,
        current_price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradingResult<()> {
        match decision {
            TradingDecision::Buy => self.open_trade(bot, current_price, timestamp).await,
            TradingDecision::Sell => self.close_trade(bot, current_price, timestamp).await,
            TradingDecision::Hold => Ok(()),
        }
    }

    async fn on_decision_made(&self, decision_log: &TradingDecisionLog) -> TradingResult<()> {
        let mut ledger = self.ledger.lock().await;
        match decision_log.decision {
            TradingDecision::Buy => ledger.decision_counts.buy += 1,
            TradingDecision::Sell => ledger.decision_counts.sell += 1,
            TradingDecision::Hold => ledger.decision_counts.hold += 1,
        }
        Ok(())
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::service::share_bot;
    use crate::domain::model::{Kline, TradingBot, TradingBotConfig};
    use crate::domain::service::StrategyAnalysis;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Idle;

    impl TradingStrategy for Idle {
        fn name(&self) -> &str {
            "Idle"
        }

        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({})
        }

        fn analyze(&self, _window: &[Kline]) -> StrategyAnalysis {
            StrategyAnalysis::hold("idle")
        }
    }

    fn bot() -> SharedTradingBot {
        let config = TradingBotConfig {
            symbol: Symbol::new("BTCBRL").unwrap(),
            base_quantity: 0.0,
            interval_seconds: 3_600,
            trade_amount: 100.0,
            currency: "BRL".to_string(),
            trading_fees_percent: 0.1,
            minimum_profit_threshold_percent: 0.0,
            use_fixed_quantity: false,
            initial_capital: 1_000.0,
            stop_loss_percent: None,
        };
        share_bot(TradingBot::new(config, Arc::new(Idle)).unwrap())
    }

    fn context() -> BacktestTradingExecutionContext {
        BacktestTradingExecutionContext::new(Symbol::new("BTCBRL").unwrap(), &Idle, "BRL", 1_000.0)
    }

    fn at(hour: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_640_995_200 + hour * 3_600, 0).unwrap()
    }

    #[tokio::test]
    async fn buy_deducts_fees_and_positions_bot() {
        let ctx = context();
        let bot = bot();
        ctx.execute_trade(TradingDecision::Buy, &bot, 800.0, at(0)).await.unwrap();

        let guard = bot.lock().await;
        assert_eq!(guard.entry_price(), Some(800.0));
        assert!((guard.actual_quantity_held() - 0.125 * 0.999).abs() < 1e-12);
        drop(guard);
        assert!((ctx.current_capital().await - 999.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn round_trip_records_trade() {
        let ctx = context();
        let bot = bot();
        ctx.execute_trade(TradingDecision::Buy, &bot, 800.0, at(0)).await.unwrap();
        ctx.execute_trade(TradingDecision::Sell, &bot, 880.0, at(1)).await.unwrap();

        let result = ctx.get_result(at(0), at(1), 2).await;
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.winning_trades, 1);
        let trade = &result.trades[0];
        // 10% of 100 minus 0.1 exit fee
        assert!((trade.pnl - 9.9).abs() < 1e-9);
        assert!((result.final_capital - (1_000.0 - 0.1 + 9.9)).abs() < 1e-9);
        assert!((result.win_rate - 100.0).abs() < f64::EPSILON);
        assert!(!bot.lock().await.is_positioned());
    }

    #[tokio::test]
    async fn entry_fees_are_not_drawdown() {
        let ctx = context();
        let bot = bot();
        for i in 0..5 {
            ctx.execute_trade(TradingDecision::Buy, &bot, 800.0, at(2 * i)).await.unwrap();
            assert_eq!(ctx.max_drawdown().await, 0.0);
            ctx.execute_trade(TradingDecision::Sell, &bot, 880.0, at(2 * i + 1)).await.unwrap();
        }

        let result = ctx.get_result(at(0), at(9), 10).await;
        assert_eq!(result.winning_trades, 5);
        assert_eq!(result.max_drawdown, 0.0);
        assert_eq!(result.capital_history.len(), 10);
    }

    #[tokio::test]
    async fn inconsistent_decisions_fail_without_side_effects() {
        let ctx = context();
        let bot = bot();
        assert_eq!(
            ctx.execute_trade(TradingDecision::Sell, &bot, 800.0, at(0)).await,
            Err(TradingError::NotPositioned)
        );
        ctx.execute_trade(TradingDecision::Buy, &bot, 800.0, at(0)).await.unwrap();
        let capital = ctx.current_capital().await;
        assert_eq!(
            ctx.execute_trade(TradingDecision::Buy, &bot, 900.0, at(1)).await,
            Err(TradingError::AlreadyPositioned)
        );
        assert_eq!(ctx.current_capital().await, capital);
        assert_eq!(bot.lock().await.entry_price(), Some(800.0));
    }

    #[tokio::test]
    async fn hold_changes_nothing() {
        let ctx = context();
        let bot = bot();
        ctx.execute_trade(TradingDecision::Hold, &bot, 800.0, at(0)).await.unwrap();
        assert!(!bot.lock().await.is_positioned());
        assert_eq!(ctx.current_capital().await, 1_000.0);
    }

    #[tokio::test]
    async fn drawdown_is_monotonic_and_bounded() {
        let ctx = context();
        let bot = bot();
        let mut previous = 0.0;
        for i in 0..20 {
            let entry = 1_000.0;
            ctx.execute_trade(TradingDecision::Buy, &bot, entry, at(2 * i)).await.unwrap();
            ctx.execute_trade(TradingDecision::Sell, &bot, entry * 0.5, at(2 * i + 1)).await.unwrap();
            let drawdown = ctx.max_drawdown().await;
            assert!(drawdown >= previous);
            assert!(drawdown <= 100.0);
            previous = drawdown;
        }
        let result = ctx.get_result(at(0), at(40), 40).await;
        assert_eq!(result.losing_trades, 20);
        assert!(result.max_drawdown > 0.0);
    }

    #[tokio::test]
    async fn stop_is_permanent() {
        let ctx = context();
        assert!(ctx.should_continue());
        ctx.stop();
        assert!(!ctx.should_continue());
    }

    #[tokio::test]
    async fn decisions_are_tallied() {
        let ctx = context();
        let bot_id = bot().lock().await.id();
        for decision in [TradingDecision::Hold, TradingDecision::Buy, TradingDecision::Hold] {
            let entry = TradingDecisionLog::new(bot_id, decision, 1.0, at(0), "test");
            ctx.on_decision_made(&entry).await.unwrap();
        }
        let result = ctx.get_result(at(0), at(0), 3).await;
        assert_eq!(result.decision_counts, DecisionCounts { buy: 1, sell: 0, hold: 2 });
    }
}
