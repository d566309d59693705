use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::Side;

/// Unique, monotonically increasing position identifier
pub type PositionId = u64;

/// Static risk limits, fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_per_trade_pct: f64, // % of balance committed per trade
    pub max_drawdown_pct: f64,   // block new entries above this drawdown
    pub max_position_size: f64,  // max notional in currency units
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_leverage: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 2.0,
            max_drawdown_pct: 10.0,
            max_position_size: 1000.0,
            stop_loss_pct: 2.0,
            take_profit_pct: 5.0,
            max_leverage: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskConfigError {
    #[error("risk.{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("risk.{field} must be below 100, got {value}")]
    PercentTooLarge { field: &'static str, value: f64 },
}

impl RiskConfig {
    /// Check that every limit is a positive, finite number
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        let fields = [
            ("risk_per_trade_pct", self.risk_per_trade_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
            ("max_position_size", self.max_position_size),
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("max_leverage", self.max_leverage),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(RiskConfigError::NotPositive { field, value });
            }
        }
        for (field, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
        ] {
            if value >= 100.0 {
                return Err(RiskConfigError::PercentTooLarge { field, value });
            }
        }
        Ok(())
    }
}

/// Why a trade was not opened. Not a failure; the caller skips the trade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskRejection {
    #[error("quantity {0} is not positive")]
    ZeroQuantity(f64),
    #[error("notional {notional:.2} exceeds max position size {limit:.2}")]
    NotionalExceeded { notional: f64, limit: f64 },
    #[error("drawdown {drawdown_pct:.2}% exceeds limit {limit_pct:.2}%")]
    DrawdownExceeded { drawdown_pct: f64, limit_pct: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub entry_price: f64,
    pub quantity: f64,
    pub side: Side,
    pub timestamp: i64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// A validated entry that has not been committed to the ledger yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPosition {
    pub entry_price: f64,
    pub quantity: f64,
    pub side: Side,
    pub timestamp: i64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl PendingPosition {
    pub fn notional(&self) -> f64 {
        self.entry_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_price: f64,
    pub reason: ExitReason,
    pub pnl: f64,
}

/// Positions closed by a single exit check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitReport {
    /// Closed at their stop-loss level
    pub stop_loss: Vec<PositionId>,
    /// Closed at their take-profit level
    pub take_profit: Vec<PositionId>,
    pub closed: Vec<ClosedPosition>,
}

impl ExitReport {
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }
}

/// Account ledger owned by the risk manager
#[derive(Debug, Clone, PartialEq)]
pub struct AccountState {
    pub balance: f64,
    /// High-water mark of the balance; never decreases
    pub drawdown_peak: f64,
    pub current_drawdown_pct: f64,
    pub open_positions: BTreeMap<PositionId, Position>,
    pub next_position_id: PositionId,
}

impl AccountState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            drawdown_peak: initial_balance,
            current_drawdown_pct: 0.0,
            open_positions: BTreeMap::new(),
            next_position_id: 1,
        }
    }

    /// Apply realized P&L and refresh the drawdown figures
    pub fn apply_pnl(&mut self, pnl: f64) {
        self.balance += pnl;
        self.update_drawdown();
    }

    fn update_drawdown(&mut self) {
        if self.balance > self.drawdown_peak {
            self.drawdown_peak = self.balance;
        }
        self.current_drawdown_pct = if self.drawdown_peak > 0.0 {
            ((self.drawdown_peak - self.balance) / self.drawdown_peak * 100.0).max(0.0)
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub balance: f64,
    pub drawdown_pct: f64,
    pub open_positions: usize,
    pub peak: f64,
}

/// Position sizing, entry validation and exit tracking against `RiskConfig`
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    account: AccountState,
}

impl RiskManager {
    pub fn new(config: RiskConfig, initial_balance: f64) -> Self {
        Self::with_account(config, AccountState::new(initial_balance))
    }

    /// Build a manager around an existing ledger
    pub fn with_account(config: RiskConfig, account: AccountState) -> Self {
        Self { config, account }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.account.open_positions.values()
    }

    /// Whole units affordable under the per-trade risk budget and the size cap
    ///
    /// Returns 0 when nothing can be bought; callers treat that as "do not trade".
    pub fn calculate_position_size(&self, entry_price: f64) -> f64 {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return 0.0;
        }
        let risk_amount = self.account.balance * self.config.risk_per_trade_pct / 100.0;
        let budget = risk_amount.min(self.config.max_position_size);
        let quantity = (budget / entry_price).floor();

        if quantity.is_finite() && quantity > 0.0 {
            quantity
        } else {
            0.0
        }
    }

    /// Validate an entry and derive its stop/target levels without storing it
    pub fn evaluate_entry(
        &self,
        side: Side,
        entry_price: f64,
        quantity: f64,
        timestamp: i64,
    ) -> Result<PendingPosition, RiskRejection> {
        if quantity <= 0.0 || quantity.is_nan() {
            return Err(RiskRejection::ZeroQuantity(quantity));
        }

        let notional = quantity * entry_price;
        if notional > self.config.max_position_size {
            return Err(RiskRejection::NotionalExceeded {
                notional,
                limit: self.config.max_position_size,
            });
        }

        if self.account.current_drawdown_pct > self.config.max_drawdown_pct {
            return Err(RiskRejection::DrawdownExceeded {
                drawdown_pct: self.account.current_drawdown_pct,
                limit_pct: self.config.max_drawdown_pct,
            });
        }

        let sl = self.config.stop_loss_pct / 100.0;
        let tp = self.config.take_profit_pct / 100.0;
        let (stop_loss, take_profit) = match side {
            Side::Long => (entry_price * (1.0 - sl), entry_price * (1.0 + tp)),
            Side::Short => (entry_price * (1.0 + sl), entry_price * (1.0 - tp)),
        };

        Ok(PendingPosition {
            entry_price,
            quantity,
            side,
            timestamp,
            stop_loss,
            take_profit,
        })
    }

    /// Store a validated entry as an open position
    pub fn commit(&mut self, pending: PendingPosition) -> Position {
        let id = self.account.next_position_id;
        self.account.next_position_id += 1;

        let position = Position {
            id,
            entry_price: pending.entry_price,
            quantity: pending.quantity,
            side: pending.side,
            timestamp: pending.timestamp,
            stop_loss: pending.stop_loss,
            take_profit: pending.take_profit,
        };
        self.account.open_positions.insert(id, position.clone());

        tracing::debug!(
            id,
            side = %position.side,
            entry = position.entry_price,
            quantity = position.quantity,
            stop_loss = position.stop_loss,
            take_profit = position.take_profit,
            "Opened position"
        );

        position
    }

    /// Validate and open in one step
    pub fn create_position(
        &mut self,
        side: Side,
        entry_price: f64,
        quantity: f64,
        timestamp: i64,
    ) -> Result<Position, RiskRejection> {
        let pending = self.evaluate_entry(side, entry_price, quantity, timestamp)?;
        Ok(self.commit(pending))
    }

    /// Close every open position whose stop-loss or take-profit was reached
    ///
    /// Stop-loss is checked before take-profit. Positions exit at their level price.
    pub fn check_exits(&mut self, current_price: f64) -> ExitReport {
        let hits: Vec<(PositionId, ExitReason, f64)> = self
            .account
            .open_positions
            .values()
            .filter_map(|pos| {
                let (hit_sl, hit_tp) = match pos.side {
                    Side::Long => (
                        current_price <= pos.stop_loss,
                        current_price >= pos.take_profit,
                    ),
                    Side::Short => (
                        current_price >= pos.stop_loss,
                        current_price <= pos.take_profit,
                    ),
                };
                if hit_sl {
                    Some((pos.id, ExitReason::StopLoss, pos.stop_loss))
                } else if hit_tp {
                    Some((pos.id, ExitReason::TakeProfit, pos.take_profit))
                } else {
                    None
                }
            })
            .collect();

        let mut report = ExitReport::default();
        for (id, reason, exit_price) in hits {
            if let Some(closed) = self.close_position(id, exit_price, reason) {
                match reason {
                    ExitReason::StopLoss => report.stop_loss.push(id),
                    ExitReason::TakeProfit => report.take_profit.push(id),
                }
                report.closed.push(closed);
            }
        }
        report
    }

    /// Realize P&L for a position and drop it from the open set
    pub fn close_position(
        &mut self,
        id: PositionId,
        exit_price: f64,
        reason: ExitReason,
    ) -> Option<ClosedPosition> {
        let position = self.account.open_positions.remove(&id)?;

        let pnl = match position.side {
            Side::Long => (exit_price - position.entry_price) * position.quantity,
            Side::Short => (position.entry_price - exit_price) * position.quantity,
        };
        self.account.apply_pnl(pnl);

        tracing::info!(
            id,
            side = %position.side,
            exit = exit_price,
            reason = ?reason,
            pnl,
            "Closed position"
        );

        Some(ClosedPosition {
            position,
            exit_price,
            reason,
            pnl,
        })
    }

    pub fn metrics(&self) -> RiskMetrics {
        RiskMetrics {
            balance: self.account.balance,
            drawdown_pct: self.account.current_drawdown_pct,
            open_positions: self.account.open_positions.len(),
            peak: self.account.drawdown_peak,
        }
    }
}
