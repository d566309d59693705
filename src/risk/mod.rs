// Risk management module
pub mod circuit_breakers;
pub mod manager;

pub use circuit_breakers::{CircuitBreaker, CircuitState};
pub use manager::{
    AccountState, ClosedPosition, ExitReason, ExitReport, PendingPosition, Position, PositionId,
    RiskConfig, RiskConfigError, RiskManager, RiskMetrics, RiskRejection,
};
