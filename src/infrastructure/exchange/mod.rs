// src/infrastructure/exchange/mod.rs
pub mod binance;

pub use binance::BinanceExchange;
