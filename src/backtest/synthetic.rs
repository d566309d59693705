use crate::models::PriceSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Start of every generated series (aligned to a 5-minute boundary)
const START_TIMESTAMP: i64 = 1_700_000_100;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady climb, +0.1% per sample with light noise
    Uptrend,
    /// Steady decline, -0.1% per sample with light noise
    Downtrend,
    /// Mean-reverting chop around the base price
    Sideways,
    /// ±2% random moves per sample
    Volatile,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 4] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
    ];
}

/// Generates synthetic price samples for backtesting
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 150.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_samples` samples spaced `interval_secs` apart
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_samples: usize,
        interval_secs: i64,
    ) -> Vec<PriceSample> {
        let mut samples = Vec::with_capacity(num_samples);
        let mut price = self.base_price;
        let floor = self.base_price * 0.5;

        for i in 0..num_samples {
            let change = match scenario {
                MarketScenario::Uptrend => price * (0.001 + self.rng.gen_range(-0.0005..0.0005)),
                MarketScenario::Downtrend => price * (-0.001 + self.rng.gen_range(-0.0005..0.0005)),
                MarketScenario::Sideways => {
                    // 10% pull to mean + ±0.5% noise
                    (self.base_price - price) * 0.1 + price * self.rng.gen_range(-0.005..0.005)
                }
                MarketScenario::Volatile => price * self.rng.gen_range(-0.02..0.02),
            };
            price = (price + change).max(floor);

            samples.push(PriceSample {
                timestamp: START_TIMESTAMP + i as i64 * interval_secs,
                price,
            });
        }

        samples
    }
}
