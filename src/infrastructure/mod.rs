// src/infrastructure/mod.rs
pub mod exchange;
pub mod messaging;
pub mod persistence;
pub mod strategy;
