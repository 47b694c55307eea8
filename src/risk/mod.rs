//! Liquidation risk evaluation.
//!
//! - Distance-to-liquidation and severity tiering (pure)
//! - Liquidation price estimation for cross positions without one
//! - Per-position alert cooldowns

mod cooldown;
mod liquidation;

pub use cooldown::{CooldownKey, CooldownTracker};
pub use liquidation::{
    Assessment, ExclusionReason, RiskAssessment, RiskCalculator, Severity, SeverityBasis, Side,
};
