// Core modules
pub mod analytics;
pub mod backtest;
pub mod config;
pub mod engine;
pub mod execution;
pub mod models;
pub mod risk;
pub mod strategy;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::{Engine, StatusSnapshot, TickError, TickOutcome};
pub use models::*;
pub use strategy::Strategy;
