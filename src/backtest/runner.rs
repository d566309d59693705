use serde::Serialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{Engine, TickError, TickOutcome};
use crate::execution::{ExecutionProvider, ProviderError, ReplayFeed};
use crate::models::PriceSample;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BacktestResult {
    pub trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub period_start: i64,
    pub period_end: i64,
    pub final_balance: f64,
    pub open_positions: usize,
    /// Circuit breaker tripped before the data ran out
    pub paused: bool,
}

/// Replays recorded samples through the live tick protocol
///
/// The interval bucket comes from each sample's timestamp, so a replay
/// trades at the same boundaries the live loop would have.
pub struct Backtester {
    config: AppConfig,
    executor: Arc<dyn ExecutionProvider>,
}

impl Backtester {
    pub fn new(config: AppConfig, executor: Arc<dyn ExecutionProvider>) -> Self {
        Self { config, executor }
    }

    pub async fn run(&self, samples: Vec<PriceSample>) -> anyhow::Result<BacktestResult> {
        let (period_start, period_end) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => anyhow::bail!("No data loaded"),
        };

        tracing::info!(
            samples = samples.len(),
            period_start,
            period_end,
            "Starting backtest"
        );

        let feed = Arc::new(ReplayFeed::new(samples));
        let engine = Engine::from_config(&self.config, feed, self.executor.clone());

        let mut paused = false;
        loop {
            match engine.tick().await {
                Ok(TickOutcome::Paused) => {
                    paused = true;
                    break;
                }
                Ok(_) => {}
                Err(TickError::Fetch(ProviderError::Exhausted)) => break,
                Err(e) => tracing::warn!("Backtest tick failed: {}", e),
            }
        }

        let status = engine.status();
        let result = BacktestResult {
            trades: status.performance.total_trades,
            win_rate: status.performance.win_rate,
            total_pnl: status.performance.total_pnl,
            period_start,
            period_end,
            final_balance: status.risk.balance,
            open_positions: status.risk.open_positions,
            paused,
        };

        tracing::info!(
            "Backtest complete: {} trades, win rate {:.1}%, P&L: {:.4}",
            result.trades,
            result.win_rate,
            result.total_pnl
        );

        Ok(result)
    }

    pub async fn run_csv(&self, path: &std::path::Path) -> anyhow::Result<BacktestResult> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let samples = crate::execution::replay::parse_csv(&raw)?;
        self.run(samples).await
    }
}
