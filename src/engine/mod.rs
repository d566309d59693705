// Tick scheduler: data ingestion, exit checks, signal evaluation and execution
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::analytics::{PerformanceStats, PerformanceTracker, TradeRecord};
use crate::config::AppConfig;
use crate::execution::{ExecutionProvider, MarketDataProvider, ProviderError};
use crate::models::{PriceSample, Side};
use crate::risk::{
    CircuitBreaker, CircuitState, ExitReport, PendingPosition, Position, RiskManager, RiskMetrics,
    RiskRejection,
};
use crate::strategy::momentum::MomentumStrategy;
use crate::strategy::Strategy;

#[derive(Debug, Error)]
pub enum TickError {
    #[error("price fetch failed: {0}")]
    Fetch(#[source] ProviderError),
    #[error("execution failed: {0}")]
    Execution(#[source] ProviderError),
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Circuit breaker is open; nothing was fetched
    Paused,
    /// Another tick was still running
    Skipped,
    /// Sample ingested, still inside the current trade interval
    Ingested,
    /// Interval boundary reached but the window gave no direction
    NoSignal,
    /// Signal present but the account cannot afford a single unit
    Unsized { side: Side },
    Rejected(RiskRejection),
    Traded(TradeReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeReport {
    pub position: Position,
    pub profit: f64,
    /// This result opened the circuit breaker
    pub tripped: bool,
}

/// Timing and reporting knobs for the scheduler
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    pub trade_interval_secs: i64,
    pub request_timeout: Duration,
    pub snapshot_every_trades: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(15),
            trade_interval_secs: 300,
            request_timeout: Duration::from_secs(10),
            snapshot_every_trades: 10,
        }
    }
}

impl EngineSettings {
    /// Interval and snapshot period are at least 1
    fn normalized(self) -> Self {
        Self {
            trade_interval_secs: self.trade_interval_secs.max(1),
            snapshot_every_trades: self.snapshot_every_trades.max(1),
            ..self
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            trade_interval_secs: config.trade_interval_secs as i64,
            request_timeout: config.request_timeout(),
            snapshot_every_trades: config.snapshot_every_trades,
        }
        .normalized()
    }
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub circuit: CircuitState,
    pub risk: RiskMetrics,
    pub performance: PerformanceStats,
    pub last_price: Option<f64>,
}

struct EngineState {
    strategy: Box<dyn Strategy>,
    risk: RiskManager,
    circuit: CircuitBreaker,
    performance: PerformanceTracker,
    current_interval: Option<i64>,
    last_price: Option<f64>,
}

/// Single-flight trading loop over injected data and execution providers
///
/// The state mutex is only held between awaits, so `status` never waits on I/O.
pub struct Engine {
    feed: Arc<dyn MarketDataProvider>,
    executor: Arc<dyn ExecutionProvider>,
    settings: EngineSettings,
    state: Mutex<EngineState>,
    tick_guard: tokio::sync::Mutex<()>,
}

impl Engine {
    pub fn new(
        feed: Arc<dyn MarketDataProvider>,
        executor: Arc<dyn ExecutionProvider>,
        strategy: Box<dyn Strategy>,
        risk: RiskManager,
        circuit: CircuitBreaker,
        settings: EngineSettings,
    ) -> Self {
        let performance = PerformanceTracker::new(risk.account().balance);
        Self {
            feed,
            executor,
            settings: settings.normalized(),
            state: Mutex::new(EngineState {
                strategy,
                risk,
                circuit,
                performance,
                current_interval: None,
                last_price: None,
            }),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Wire the momentum strategy and risk limits from configuration
    pub fn from_config(
        config: &AppConfig,
        feed: Arc<dyn MarketDataProvider>,
        executor: Arc<dyn ExecutionProvider>,
    ) -> Self {
        Self::new(
            feed,
            executor,
            Box::new(MomentumStrategy::new(
                config.window_capacity,
                config.velocity_threshold,
            )),
            RiskManager::new(config.risk.clone(), config.initial_balance),
            CircuitBreaker::new(config.max_consecutive_losses),
            EngineSettings::from(config),
        )
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // Critical sections never leave state half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let limit = self.settings.request_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ProviderError::Timeout(limit))?
    }

    /// Run one cycle of the trading protocol
    ///
    /// Returns `Skipped` if a previous tick is still in flight. Errors leave
    /// risk and circuit state exactly as they were at the failure point.
    pub async fn tick(&self) -> Result<TickOutcome, TickError> {
        let _guard = match self.tick_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Previous tick still running, skipping");
                return Ok(TickOutcome::Skipped);
            }
        };

        let paused = self.state().circuit.is_paused();
        if paused {
            return Ok(TickOutcome::Paused);
        }

        let sample = self
            .with_timeout(self.feed.fetch_price())
            .await
            .map_err(TickError::Fetch)?;

        let pending = match self.ingest(sample) {
            Ok(pending) => pending,
            Err(outcome) => return Ok(outcome),
        };

        let result = self
            .with_timeout(self.executor.execute(pending.side))
            .await
            .map_err(TickError::Execution)?;

        Ok(TickOutcome::Traded(self.settle(pending, result.profit)))
    }

    /// Synchronous part of the tick up to the execution call
    ///
    /// `Err` carries a terminal outcome for this tick; `Ok` is an approved entry.
    fn ingest(&self, sample: PriceSample) -> Result<PendingPosition, TickOutcome> {
        let mut state = self.state();

        state.strategy.update(sample);

        if state.last_price.is_some() {
            let report = state.risk.check_exits(sample.price);
            log_exits(&report, sample.price);
        }
        state.last_price = Some(sample.price);

        let interval = sample.timestamp.div_euclid(self.settings.trade_interval_secs);
        if state.current_interval == Some(interval) {
            return Err(TickOutcome::Ingested);
        }
        state.current_interval = Some(interval);

        let signal = state.strategy.evaluate();
        tracing::debug!(
            interval,
            price = sample.price,
            samples = state.strategy.sample_count(),
            signal = ?signal,
            "Interval boundary"
        );

        let side = match signal.side() {
            Some(side) => side,
            None => return Err(TickOutcome::NoSignal),
        };

        let quantity = state.risk.calculate_position_size(sample.price);
        if quantity <= 0.0 {
            tracing::info!(
                side = %side,
                price = sample.price,
                balance = state.risk.account().balance,
                "Position size is zero, skipping trade"
            );
            return Err(TickOutcome::Unsized { side });
        }

        state
            .risk
            .evaluate_entry(side, sample.price, quantity, sample.timestamp)
            .map_err(|rejection| {
                tracing::warn!(side = %side, price = sample.price, "Risk rejected entry: {}", rejection);
                TickOutcome::Rejected(rejection)
            })
    }

    /// Commit a confirmed fill and feed the result to the breaker and the tracker
    fn settle(&self, pending: PendingPosition, profit: f64) -> TradeReport {
        let mut state = self.state();

        let position = state.risk.commit(pending);
        let tripped = state.circuit.record_result(profit);

        tracing::info!(
            id = position.id,
            side = %position.side,
            entry = position.entry_price,
            quantity = position.quantity,
            stop_loss = position.stop_loss,
            take_profit = position.take_profit,
            profit,
            "Trade executed"
        );
        if tripped {
            tracing::warn!(
                losses = state.circuit.consecutive_losses,
                "Circuit breaker triggered, pausing agent"
            );
        }

        // Exit implied by the reported profit
        let per_unit = profit / position.quantity;
        let exit = match position.side {
            Side::Long => position.entry_price + per_unit,
            Side::Short => position.entry_price - per_unit,
        };
        state.performance.record_trade(
            position.entry_price,
            exit,
            position.side,
            position.quantity,
            position.timestamp,
        );

        let trade_count = state.performance.trade_count();
        if trade_count % self.settings.snapshot_every_trades == 0 {
            let stats = state.performance.stats();
            tracing::info!(
                trades = stats.total_trades,
                win_rate = stats.win_rate,
                total_pnl = stats.total_pnl,
                sharpe = stats.sharpe_ratio,
                "Performance snapshot"
            );
        }

        TradeReport {
            position,
            profit,
            tripped,
        }
    }

    /// Tick on a fixed period until `shutdown` resolves
    ///
    /// Failed ticks are logged and never stop the loop.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            "Engine starting (tick every {:?}, trade interval {}s)",
            self.settings.tick_interval,
            self.settings.trade_interval_secs
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Engine stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::Traded(report)) => {
                            tracing::debug!(id = report.position.id, "Tick completed with trade");
                        }
                        Ok(outcome) => tracing::trace!(?outcome, "Tick completed"),
                        Err(e) => tracing::error!("Tick failed: {}", e),
                    }
                }
            }
        }
    }

    /// Clear a tripped circuit breaker so trading resumes on the next tick
    pub fn resume(&self) {
        let mut state = self.state();
        state.circuit.reset();
        tracing::info!("Circuit breaker reset, trading resumed");
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.state();
        StatusSnapshot {
            circuit: state.circuit.state(),
            risk: state.risk.metrics(),
            performance: state.performance.stats(),
            last_price: state.last_price,
        }
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.state().risk.open_positions().cloned().collect()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.state().performance.trades().to_vec()
    }
}

fn log_exits(report: &ExitReport, price: f64) {
    if !report.stop_loss.is_empty() {
        tracing::warn!(price, positions = ?report.stop_loss, "Stop-loss hit");
    }
    if !report.take_profit.is_empty() {
        tracing::info!(price, positions = ?report.take_profit, "Take-profit hit");
    }
}
