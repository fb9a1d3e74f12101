// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Trading error: {0}")]
    Trading(#[from] TradingError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backtest error: {0}")]
    Backtest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Order error: {0}")]
    Order(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("No more historical data")]
    NoMoreData,

    #[error("Unsupported interval: {0} seconds")]
    UnsupportedInterval(u64),

    #[error("Invalid kline: {0}")]
    InvalidKline(String),

    #[error("Market data window is empty")]
    Empty,

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("Bot already has an open position")]
    AlreadyPositioned,

    #[error("Bot has no open position")]
    NotPositioned,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatus { from: String, to: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No open simulated trade")]
    NoOpenTrade,
}

impl TradingError {
    /// Conflicts between a decision and the current position state.
    /// These are expected during normal operation and mean "skip this tick".
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, TradingError::AlreadyPositioned | TradingError::NotPositioned)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for TradingError {
    fn from(error: RepositoryError) -> Self {
        TradingError::Persistence(error.to_string())
    }
}

impl From<ExchangeError> for TradingError {
    fn from(error: ExchangeError) -> Self {
        TradingError::OrderRejected(error.to_string())
    }
}

impl From<ExchangeError> for MarketDataError {
    fn from(error: ExchangeError) -> Self {
        MarketDataError::Exchange(error.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type MarketDataResult<T> = Result<T, MarketDataError>;
pub type TradingResult<T> = Result<T, TradingError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
pub type PublishResult<T> = Result<T, PublishError>;
