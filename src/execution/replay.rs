use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{validate_price, MarketDataProvider, ProviderError};
use crate::models::PriceSample;

/// Serves recorded samples in order, one per fetch
pub struct ReplayFeed {
    samples: Mutex<VecDeque<PriceSample>>,
}

impl ReplayFeed {
    pub fn new(samples: Vec<PriceSample>) -> Self {
        Self {
            samples: Mutex::new(samples.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// First and last timestamps still queued
    pub fn period(&self) -> Option<(i64, i64)> {
        let samples = self.samples.lock().ok()?;
        Some((samples.front()?.timestamp, samples.back()?.timestamp))
    }
}

/// Parse `timestamp,price` rows
pub fn parse_csv(raw: &str) -> anyhow::Result<Vec<PriceSample>> {
    let mut samples = Vec::new();

    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(',').map(str::trim);
        let (ts, price) = match (fields.next(), fields.next()) {
            (Some(ts), Some(price)) => (ts, price),
            _ => anyhow::bail!("line {}: expected timestamp,price", line_no + 1),
        };

        let timestamp = match ts.parse::<i64>() {
            Ok(t) => t,
            // Header row
            Err(_) if line_no == 0 => continue,
            Err(e) => anyhow::bail!("line {}: bad timestamp {:?}: {}", line_no + 1, ts, e),
        };
        let price: f64 = price
            .parse()
            .map_err(|e| anyhow::anyhow!("line {}: bad price {:?}: {}", line_no + 1, price, e))?;
        let price = validate_price(price).map_err(|e| anyhow::anyhow!("line {}: {}", line_no + 1, e))?;

        samples.push(PriceSample { timestamp, price });
    }

    Ok(samples)
}

#[async_trait]
impl MarketDataProvider for ReplayFeed {
    async fn fetch_price(&self) -> Result<PriceSample, ProviderError> {
        let mut samples = self
            .samples
            .lock()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        samples.pop_front().ok_or(ProviderError::Exhausted)
    }
}
