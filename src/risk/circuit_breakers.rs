use serde::{Deserialize, Serialize};

/// Default number of consecutive losing trades before trading is paused
pub const DEFAULT_MAX_CONSECUTIVE_LOSSES: u32 = 3;

/// Consecutive-loss latch guarding the trading loop
///
/// Once tripped it stays paused until `reset` is called from outside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreaker {
    pub max_consecutive_losses: u32,
    pub consecutive_losses: u32,
    pub paused: bool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONSECUTIVE_LOSSES)
    }
}

/// Read-only view of the breaker for status reporting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CircuitState {
    pub consecutive_losses: u32,
    pub paused: bool,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_losses: u32) -> Self {
        Self {
            max_consecutive_losses: max_consecutive_losses.max(1),
            consecutive_losses: 0,
            paused: false,
        }
    }

    /// Apply one trade result. Returns true if this result tripped the breaker.
    pub fn record_result(&mut self, profit: f64) -> bool {
        if profit < 0.0 {
            self.consecutive_losses += 1;
            if !self.paused && self.consecutive_losses >= self.max_consecutive_losses {
                self.paused = true;
                return true;
            }
        } else {
            self.consecutive_losses = 0;
        }
        false
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Clear the pause and the loss streak
    pub fn reset(&mut self) {
        self.consecutive_losses = 0;
        self.paused = false;
    }

    pub fn state(&self) -> CircuitState {
        CircuitState {
            consecutive_losses: self.consecutive_losses,
            paused: self.paused,
        }
    }
}
