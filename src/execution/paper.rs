use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use super::{ExecutionProvider, ProviderError};
use crate::models::{ExecutionResult, Side};

/// Simulated fills for paper trading and backtests
///
/// Each order returns a profit drawn uniformly from `[-1, 1)`, reproducible for a given seed.
pub struct PaperExecutor {
    rng: Mutex<StdRng>,
}

impl PaperExecutor {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl ExecutionProvider for PaperExecutor {
    async fn execute(&self, side: Side) -> Result<ExecutionResult, ProviderError> {
        let profit = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|e| ProviderError::Rejected(e.to_string()))?;
            rng.gen_range(-1.0..1.0)
        };

        tracing::debug!(side = %side, profit, "Paper fill");
        Ok(ExecutionResult { profit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profit_in_range() {
        let executor = PaperExecutor::new(7);
        for _ in 0..100 {
            let result = executor.execute(Side::Long).await.unwrap();
            assert!((-1.0..1.0).contains(&result.profit));
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_fills() {
        let a = PaperExecutor::new(42);
        let b = PaperExecutor::new(42);

        for side in [Side::Long, Side::Short, Side::Long] {
            let ra = a.execute(side).await.unwrap();
            let rb = b.execute(side).await.unwrap();
            assert_eq!(ra, rb);
        }
    }
}
