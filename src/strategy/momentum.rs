use super::Strategy;
use crate::models::{PriceSample, Signal};
use std::collections::VecDeque;

/// Default window: 40 samples, roughly 10 minutes at a 15s cadence
pub const DEFAULT_WINDOW_CAPACITY: usize = 40;

/// Default velocity threshold in price units per sample
pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 0.1;

/// Velocity-based momentum detector
///
/// Keeps a bounded FIFO window of price samples and compares the average
/// per-sample change across the whole window against an absolute threshold.
/// The signal only becomes meaningful after many ticks of history.
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    window: VecDeque<PriceSample>,
    capacity: usize,
    threshold: f64,
}

impl MomentumStrategy {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
            threshold,
        }
    }

    /// Average price change per sample between the oldest and newest sample
    ///
    /// Returns None with fewer than 2 samples.
    pub fn velocity(&self) -> Option<f64> {
        if self.window.len() < 2 {
            return None;
        }
        let first = self.window.front()?.price;
        let last = self.window.back()?.price;
        Some((last - first) / (self.window.len() - 1) as f64)
    }

    pub fn samples(&self) -> impl Iterator<Item = &PriceSample> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY, DEFAULT_VELOCITY_THRESHOLD)
    }
}

impl Strategy for MomentumStrategy {
    fn update(&mut self, sample: PriceSample) {
        self.window.push_back(sample);

        // Remove oldest if exceeds capacity
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    fn evaluate(&self) -> Signal {
        match self.velocity() {
            Some(v) if v > self.threshold => Signal::Long,
            Some(v) if v < -self.threshold => Signal::Short,
            _ => Signal::None,
        }
    }

    fn name(&self) -> &str {
        "MomentumStrategy"
    }

    fn sample_count(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(strategy: &mut MomentumStrategy, prices: &[f64]) {
        for (i, &price) in prices.iter().enumerate() {
            strategy.update(PriceSample::new(i as i64 * 15, price));
        }
    }

    #[test]
    fn test_empty_and_single_sample_yield_none() {
        let mut strategy = MomentumStrategy::default();
        assert_eq!(strategy.evaluate(), Signal::None);

        strategy.update(PriceSample::new(0, 100.0));
        assert_eq!(strategy.evaluate(), Signal::None);
        assert_eq!(strategy.velocity(), None);
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut strategy = MomentumStrategy::default();

        for i in 0..100 {
            strategy.update(PriceSample::new(i, 100.0 + i as f64));
            assert!(strategy.len() <= DEFAULT_WINDOW_CAPACITY);
        }

        // Should have the last 40 samples in arrival order: 60..=99
        let prices: Vec<f64> = strategy.samples().map(|s| s.price).collect();
        assert_eq!(prices.len(), 40);
        assert_eq!(prices[0], 160.0);
        assert_eq!(prices[39], 199.0);
        assert!(prices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_flat_prices_yield_none() {
        let mut strategy = MomentumStrategy::default();
        feed(&mut strategy, &[100.0; 40]);

        assert_eq!(strategy.velocity(), Some(0.0));
        assert_eq!(strategy.evaluate(), Signal::None);
    }

    #[test]
    fn test_rising_prices_yield_long() {
        let mut strategy = MomentumStrategy::default();
        let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64 * 2.0 / 9.0).collect();
        feed(&mut strategy, &prices);

        let velocity = strategy.velocity().unwrap();
        assert!((velocity - 0.2222).abs() < 1e-3);
        assert_eq!(strategy.evaluate(), Signal::Long);
    }

    #[test]
    fn test_falling_prices_yield_short() {
        let mut strategy = MomentumStrategy::default();
        feed(&mut strategy, &[105.0, 104.0, 103.0, 102.0]);

        assert_eq!(strategy.evaluate(), Signal::Short);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut strategy = MomentumStrategy::new(40, 1.0);
        feed(&mut strategy, &[100.0, 101.0, 102.0]);

        // velocity == threshold exactly
        assert_eq!(strategy.evaluate(), Signal::None);
    }

    #[test]
    fn test_uses_whole_window_not_last_interval() {
        let mut strategy = MomentumStrategy::default();
        // Sharp drop at the end, but net rise across the window
        feed(&mut strategy, &[100.0, 103.0, 106.0, 109.0, 104.0]);

        assert_eq!(strategy.velocity(), Some(1.0));
        assert_eq!(strategy.evaluate(), Signal::Long);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let mut strategy = MomentumStrategy::default();
        feed(&mut strategy, &[100.0, 101.0, 102.0]);

        let first = strategy.evaluate();
        let second = strategy.evaluate();
        assert_eq!(first, second);
        assert_eq!(strategy.len(), 3);
    }

    #[test]
    fn test_strategy_name() {
        let strategy = MomentumStrategy::default();
        assert_eq!(strategy.name(), "MomentumStrategy");
        assert_eq!(strategy.sample_count(), 0);
    }
}
