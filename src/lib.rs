// src/lib.rs
// Main library module declarations

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod adapter;
pub mod config;