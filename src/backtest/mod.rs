pub mod runner;
pub mod synthetic;

pub use runner::{BacktestResult, Backtester};
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
