use serde::{Deserialize, Serialize};
use std::fmt;

/// Single price observation from the market feed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceSample {
    pub timestamp: i64, // unix seconds
    pub price: f64,
}

impl PriceSample {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Directional recommendation derived from the price window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Long,
    Short,
    None,
}

impl Signal {
    /// Side to trade for this signal, if any
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
            Signal::None => None,
        }
    }
}

/// Side of a position or order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Outcome reported by the execution provider for one order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub profit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_side() {
        assert_eq!(Signal::Long.side(), Some(Side::Long));
        assert_eq!(Signal::Short.side(), Some(Side::Short));
        assert_eq!(Signal::None.side(), None);
    }

    #[test]
    fn test_side_serializes_uppercase() {
        let json = serde_json::to_string(&Side::Short).unwrap();
        assert_eq!(json, "\"SHORT\"");
        assert_eq!(Side::Long.to_string(), "LONG");
    }
}
