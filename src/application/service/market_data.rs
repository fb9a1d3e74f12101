// src/application/service/market_data.rs
// Live and historical market data sources

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::MarketDataSource;
use crate::domain::errors::{MarketDataError, MarketDataResult};
use crate::domain::model::{Kline, KlineInterval, Symbol};
use crate::domain::service::KlineProvider;

pub const DEFAULT_LIVE_WINDOW: usize = 100;

/// Fetches the most recent candles from the exchange on every call.
pub struct LiveMarketDataSource {
    provider: Arc<dyn KlineProvider + Send + Sync>,
    window_size: usize,
    request_timeout: Duration,
}

impl LiveMarketDataSource {
    pub fn new(provider: Arc<dyn KlineProvider + Send + Sync>, request_timeout: Duration) -> Self {
        Self {
            provider,
            window_size: DEFAULT_LIVE_WINDOW,
            request_timeout,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }
}

#[async_trait]
impl MarketDataSource for LiveMarketDataSource {
    async fn get_market_data(&self, symbol: &Symbol, interval_seconds: u64) -> MarketDataResult<Vec<Kline>> {
        let interval = KlineInterval::from_seconds(interval_seconds)?;

        let klines = tokio::time::timeout(
            self.request_timeout,
            self.provider.get_recent_klines(symbol, interval, self.window_size),
        )
        .await
        .map_err(|_| {
            MarketDataError::Timeout(format!(
                "klines for {} {} after {:?}",
                symbol, interval, self.request_timeout
            ))
        })??;

        log::debug!("Fetched {} {} klines for {}", klines.len(), interval, symbol);
        Ok(klines)
    }

    fn get_current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Walks a fixed candle series. Time is the close time of the candle under
/// the cursor, so replays do not depend on the wall clock.
pub struct HistoricalMarketDataSource {
    klines: Arc<Vec<Kline>>,
    cursor: AtomicUsize,
    window_size: usize,
}

impl HistoricalMarketDataSource {
    pub fn new(klines: Vec<Kline>, window_size: usize) -> Self {
        Self::from_shared(Arc::new(klines), window_size)
    }

    pub fn from_shared(klines: Arc<Vec<Kline>>, window_size: usize) -> Self {
        Self {
            klines,
            cursor: AtomicUsize::new(0),
            window_size: window_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.klines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.klines.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn has_more_data(&self) -> bool {
        self.cursor() < self.klines.len()
    }

    /// Move to the next candle. Returns false once the series is exhausted.
    pub fn advance_to_next(&self) -> bool {
        let len = self.klines.len();
        let next = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cursor| {
                Some(if cursor < len { cursor + 1 } else { cursor })
            })
            .map(|previous| if previous < len { previous + 1 } else { previous })
            .unwrap_or(len);
        next < len
    }

    pub fn current_kline(&self) -> Option<&Kline> {
        self.klines.get(self.cursor())
    }
}

#[async_trait]
impl MarketDataSource for HistoricalMarketDataSource {
    async fn get_market_data(&self, _symbol: &Symbol, _interval_seconds: u64) -> MarketDataResult<Vec<Kline>> {
        let cursor = self.cursor();
        if cursor >= self.klines.len() {
            return Err(MarketDataError::NoMoreData);
        }

        let start = (cursor + 1).saturating_sub(self.window_size);
        Ok(self.klines[start..=cursor].to_vec())
    }

    fn get_current_time(&self) -> DateTime<Utc> {
        self.klines
            .get(self.cursor())
            .or_else(|| self.klines.last())
            .map(|k| k.close_time_utc())
            .unwrap_or_default()
    }
}
