use serde::{Deserialize, Serialize};

use crate::models::Side;

/// Record of a single executed trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub entry: f64,
    pub exit: f64,
    pub side: Side,
    pub quantity: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub timestamp: i64,
    pub duration_secs: i64, // time since the previous trade
}

/// Aggregate statistics over all recorded trades
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub win_rate: f64, // percent
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
}

/// Running trade ledger used for periodic snapshots and status reporting
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    trades: Vec<TradeRecord>,
    start_balance: f64,
    current_balance: f64,
}

impl PerformanceTracker {
    pub fn new(start_balance: f64) -> Self {
        Self {
            trades: Vec::new(),
            start_balance,
            current_balance: start_balance,
        }
    }

    pub fn record_trade(
        &mut self,
        entry: f64,
        exit: f64,
        side: Side,
        quantity: f64,
        timestamp: i64,
    ) -> &TradeRecord {
        let pnl = match side {
            Side::Long => (exit - entry) * quantity,
            Side::Short => (entry - exit) * quantity,
        };
        let notional = entry * quantity;
        let pnl_pct = if notional != 0.0 {
            pnl / notional * 100.0
        } else {
            0.0
        };
        let duration_secs = self
            .trades
            .last()
            .map(|prev| timestamp - prev.timestamp)
            .unwrap_or(0);

        self.current_balance += pnl;
        self.trades.push(TradeRecord {
            entry,
            exit,
            side,
            quantity,
            pnl,
            pnl_pct,
            timestamp,
            duration_secs,
        });

        // Just pushed
        &self.trades[self.trades.len() - 1]
    }

    pub fn stats(&self) -> PerformanceStats {
        if self.trades.is_empty() {
            return PerformanceStats::default();
        }

        let total_trades = self.trades.len();
        let wins: Vec<f64> = self
            .trades
            .iter()
            .filter(|t| t.pnl > 0.0)
            .map(|t| t.pnl)
            .collect();
        let losses: Vec<f64> = self
            .trades
            .iter()
            .filter(|t| t.pnl < 0.0)
            .map(|t| t.pnl)
            .collect();

        let sum_wins: f64 = wins.iter().sum();
        let sum_losses: f64 = losses.iter().sum::<f64>().abs();

        let profit_factor = if sum_losses > 0.0 {
            sum_wins / sum_losses
        } else {
            sum_wins
        };

        // Per-trade return Sharpe, annualized over 252 periods
        let returns: Vec<f64> = self.trades.iter().map(|t| t.pnl_pct).collect();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let std_dev = variance.sqrt();
        let sharpe_ratio = if std_dev > 0.0 {
            mean / std_dev * 252.0_f64.sqrt()
        } else {
            0.0
        };

        let total_pnl = self.current_balance - self.start_balance;
        let total_return_pct = if self.start_balance != 0.0 {
            total_pnl / self.start_balance * 100.0
        } else {
            0.0
        };

        PerformanceStats {
            total_trades,
            win_rate: wins.len() as f64 / total_trades as f64 * 100.0,
            profit_factor,
            avg_win: if wins.is_empty() {
                0.0
            } else {
                sum_wins / wins.len() as f64
            },
            avg_loss: if losses.is_empty() {
                0.0
            } else {
                sum_losses / losses.len() as f64
            },
            total_pnl,
            total_return_pct,
            sharpe_ratio,
        }
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn balance(&self) -> f64 {
        self.current_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_zero() {
        let tracker = PerformanceTracker::new(1000.0);
        assert_eq!(tracker.stats(), PerformanceStats::default());
        assert_eq!(tracker.balance(), 1000.0);
    }

    #[test]
    fn test_record_long_and_short() {
        let mut tracker = PerformanceTracker::new(1000.0);

        let long = tracker.record_trade(100.0, 110.0, Side::Long, 2.0, 60).clone();
        assert_eq!(long.pnl, 20.0);
        assert!((long.pnl_pct - 10.0).abs() < 1e-9);
        assert_eq!(long.duration_secs, 0);

        let short = tracker.record_trade(100.0, 110.0, Side::Short, 1.0, 360).clone();
        assert_eq!(short.pnl, -10.0);
        assert_eq!(short.duration_secs, 300);

        assert_eq!(tracker.balance(), 1010.0);
        assert_eq!(tracker.trade_count(), 2);
    }

    #[test]
    fn test_stats() {
        let mut tracker = PerformanceTracker::new(1000.0);
        tracker.record_trade(100.0, 110.0, Side::Long, 1.0, 0); // +10
        tracker.record_trade(100.0, 130.0, Side::Long, 1.0, 300); // +30
        tracker.record_trade(100.0, 90.0, Side::Long, 2.0, 600); // -20

        let stats = tracker.stats();
        assert_eq!(stats.total_trades, 3);
        assert!((stats.win_rate - 66.666).abs() < 0.01);
        assert_eq!(stats.profit_factor, 2.0);
        assert_eq!(stats.avg_win, 20.0);
        assert_eq!(stats.avg_loss, 20.0);
        assert_eq!(stats.total_pnl, 20.0);
        assert!((stats.total_return_pct - 2.0).abs() < 1e-9);
        assert!(stats.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_profit_factor_without_losses() {
        let mut tracker = PerformanceTracker::new(1000.0);
        tracker.record_trade(100.0, 105.0, Side::Long, 1.0, 0);

        let stats = tracker.stats();
        assert_eq!(stats.profit_factor, 5.0);
        assert_eq!(stats.sharpe_ratio, 0.0); // single trade, no dispersion
    }
}
