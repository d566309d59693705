// Market data and order execution providers
pub mod http;
pub mod paper;
pub mod replay;

pub use http::HttpMarketClient;
pub use paper::PaperExecutor;
pub use replay::ReplayFeed;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExecutionResult, PriceSample, Side};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("no more market data")]
    Exhausted,
    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Source of price samples for the tick loop
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_price(&self) -> Result<PriceSample, ProviderError>;
}

/// Order submission for a single side
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    async fn execute(&self, side: Side) -> Result<ExecutionResult, ProviderError>;
}

/// Reject prices that are not usable as a sample
pub(crate) fn validate_price(price: f64) -> Result<f64, ProviderError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(ProviderError::InvalidResponse(format!(
            "price must be positive, got {}",
            price
        )))
    }
}
