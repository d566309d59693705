// Trading strategy module
pub mod momentum;

use crate::models::{PriceSample, Signal};

/// Base trait for signal generators driven by the tick loop
pub trait Strategy: Send + Sync {
    /// Feed one new price sample
    fn update(&mut self, sample: PriceSample);

    /// Derive a signal from the samples seen so far
    ///
    /// Must not mutate state: the same window always yields the same signal.
    fn evaluate(&self) -> Signal;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Number of samples currently held
    fn sample_count(&self) -> usize;
}
