#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use position_trader::application::service::MarketDataSource;
use position_trader::domain::errors::{
    ExchangeError, ExchangeResult, MarketDataError, MarketDataResult, PublishError, PublishResult,
    RepositoryError, RepositoryResult,
};
use position_trader::domain::model::{
    BotStatus, Kline, OrderConfirmation, OrderSide, Symbol, TradingBot, TradingBotConfig,
    TradingBotId, TradingDecision, TradingEvent,
};
use position_trader::domain::repository::TradingBotRepository;
use position_trader::domain::service::{OrderGateway, StrategyAnalysis, TradingEventPublisher, TradingStrategy};
use position_trader::infrastructure::persistence::InMemoryTradingBotRepository;

pub const FIRST_CLOSE_MS: i64 = 1_640_995_200_000;
pub const HOUR_MS: i64 = 3_600_000;

pub fn candles(closes: &[f64]) -> Vec<Kline> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| Kline::new(*c, c + 0.5, c - 0.5, *c, 100.0, FIRST_CLOSE_MS + i as i64 * HOUR_MS).unwrap())
        .collect()
}

/// A slow uptrend followed by a dip and a bounce. With MA(3, 5) the only
/// crossovers are a buy at index 45 (close 830) and a sell at index 46
/// (close 834).
pub fn whipsaw_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 800.0 + 0.5 * i as f64).collect();
    closes.extend([833.0, 831.0, 830.0, 835.0, 831.0, 830.0, 834.0]);
    closes
}

pub fn bot_config(use_fixed_quantity: bool) -> TradingBotConfig {
    TradingBotConfig {
        symbol: Symbol::new("BTCUSDT").unwrap(),
        base_quantity: 0.001,
        interval_seconds: 3_600,
        trade_amount: 100.0,
        currency: "USDT".to_string(),
        trading_fees_percent: 0.1,
        minimum_profit_threshold_percent: 0.0,
        use_fixed_quantity,
        initial_capital: 1_000.0,
        stop_loss_percent: None,
    }
}

/// Emits the same decision for every window.
#[derive(Debug)]
pub struct ConstantStrategy(pub TradingDecision);

impl TradingStrategy for ConstantStrategy {
    fn name(&self) -> &str {
        "Constant"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "Decision": self.0.as_str() })
    }

    fn analyze(&self, _window: &[Kline]) -> StrategyAnalysis {
        StrategyAnalysis::new(self.0, "constant")
    }
}

pub fn constant_bot(decision: TradingDecision, use_fixed_quantity: bool) -> TradingBot {
    TradingBot::new(bot_config(use_fixed_quantity), Arc::new(ConstantStrategy(decision))).unwrap()
}

/// Order gateway that records every order and can be made slow or failing.
#[derive(Default)]
pub struct FakeOrderGateway {
    pub delay: Duration,
    pub fail: AtomicBool,
    pub orders: Mutex<Vec<(OrderSide, f64)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn orders(&self) -> Vec<(OrderSide, f64)> {
        self.orders.lock().unwrap().clone()
    }

    pub fn count(&self, side: OrderSide) -> usize {
        self.orders().iter().filter(|(s, _)| *s == side).count()
    }
}

#[async_trait]
impl OrderGateway for FakeOrderGateway {
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: f64,
    ) -> ExchangeResult<OrderConfirmation> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ExchangeError::Order("insufficient balance".to_string()));
        }

        let mut orders = self.orders.lock().unwrap();
        orders.push((side, quantity));
        Ok(OrderConfirmation {
            order_id: orders.len().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            status: "FILLED".to_string(),
        })
    }
}

/// In-memory bot repository whose updates can be made to fail.
#[derive(Default)]
pub struct FlakyBotRepository {
    pub inner: InMemoryTradingBotRepository,
    pub fail_updates: AtomicBool,
}

impl FlakyBotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradingBotRepository for FlakyBotRepository {
    async fn save(&self, bot: &TradingBot) -> RepositoryResult<()> {
        self.inner.save(bot).await
    }

    async fn update(&self, bot: &TradingBot) -> RepositoryResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("database unavailable".to_string()));
        }
        self.inner.update(bot).await
    }

    async fn get_by_id(&self, id: TradingBotId) -> RepositoryResult<TradingBot> {
        self.inner.get_by_id(id).await
    }

    async fn get_all_by_status(&self, status: BotStatus) -> RepositoryResult<Vec<TradingBot>> {
        self.inner.get_all_by_status(status).await
    }
}

/// Publisher that keeps events in memory, or rejects them.
#[derive(Default)]
pub struct RecordingPublisher {
    pub reject: bool,
    pub events: Mutex<Vec<TradingEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<TradingEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradingEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &TradingEvent) -> PublishResult<()> {
        if self.reject {
            return Err(PublishError::ChannelClosed("subscriber gone".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Market data that steps one candle forward on every request, so the nth
/// call sees the window ending at candle n.
pub struct SteppingMarketData {
    klines: Vec<Kline>,
    window_size: usize,
    pub calls: AtomicUsize,
}

impl SteppingMarketData {
    pub fn new(klines: Vec<Kline>, window_size: usize) -> Self {
        Self {
            klines,
            window_size,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn position(&self) -> usize {
        self.calls().saturating_sub(1).min(self.klines.len().saturating_sub(1))
    }
}

#[async_trait]
impl MarketDataSource for SteppingMarketData {
    async fn get_market_data(&self, _symbol: &Symbol, _interval_seconds: u64) -> MarketDataResult<Vec<Kline>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.klines.is_empty() {
            return Err(MarketDataError::Empty);
        }
        let end = index.min(self.klines.len() - 1);
        let start = (end + 1).saturating_sub(self.window_size);
        Ok(self.klines[start..=end].to_vec())
    }

    fn get_current_time(&self) -> DateTime<Utc> {
        self.klines
            .get(self.position())
            .map(|k| k.close_time_utc())
            .unwrap_or_else(Utc::now)
    }
}
