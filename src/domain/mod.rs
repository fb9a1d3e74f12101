// src/domain/mod.rs
pub mod errors;
pub mod model;
pub mod repository;
pub mod service;

// Re-export common types for convenience
pub use errors::{
    AppError, AppResult, ExchangeError, ExchangeResult, MarketDataError, MarketDataResult,
    PublishError, PublishResult, RepositoryError, RepositoryResult, TradingError, TradingResult,
};
