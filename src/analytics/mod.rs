// Trade performance tracking
pub mod performance;

pub use performance::{PerformanceStats, PerformanceTracker, TradeRecord};
