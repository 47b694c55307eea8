//! Liquidation distance calculation and severity tiering.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;
use crate::exchange::PositionRecord;

/// Which distance metric the subscriber threshold is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBasis {
    /// Threshold is a percentage of the liquidation price
    #[default]
    Percent,
    /// Threshold is an absolute USD distance
    Dollar,
}

impl SeverityBasis {
    /// Highest threshold the registry accepts for this basis.
    pub fn max_threshold(&self, max_percent: Decimal) -> Option<Decimal> {
        match self {
            SeverityBasis::Percent => Some(max_percent),
            SeverityBasis::Dollar => None,
        }
    }
}

impl fmt::Display for SeverityBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityBasis::Percent => write!(f, "percent"),
            SeverityBasis::Dollar => write!(f, "dollar"),
        }
    }
}

/// Proximity of a position to liquidation relative to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Beyond twice the threshold
    Safe,
    /// Between the threshold and twice the threshold
    Warning,
    /// At or inside the threshold
    Critical,
}

impl Severity {
    /// Tier a distance metric against a threshold.
    pub fn classify(metric: Decimal, threshold: Decimal) -> Self {
        if metric <= threshold {
            Severity::Critical
        } else if metric <= threshold * dec!(2) {
            Severity::Warning
        } else {
            Severity::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Safe => "SAFE",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

/// Risk metrics for one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub side: Side,
    pub current_price: Decimal,
    pub liquidation_price: Decimal,
    /// True when the liquidation price was synthesized from leverage
    pub liquidation_estimated: bool,
    /// Negative when the position is already past its liquidation price
    pub distance_price: Decimal,
    pub distance_percent: Decimal,
    pub distance_dollar: Decimal,
    pub severity: Severity,
}

/// Why a position was left out of risk evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExclusionReason {
    /// Zero size: settled or degenerate data
    Flat,
    /// Effective liquidation price is not positive (e.g. a 1x long)
    NoLiquidationPrice,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Flat => write!(f, "flat position"),
            ExclusionReason::NoLiquidationPrice => write!(f, "no liquidation price"),
        }
    }
}

/// Outcome of assessing one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Assessment {
    Assessed(RiskAssessment),
    Excluded(ExclusionReason),
}

impl Assessment {
    /// The risk metrics, if the position was evaluated.
    pub fn risk(&self) -> Option<&RiskAssessment> {
        match self {
            Assessment::Assessed(risk) => Some(risk),
            Assessment::Excluded(_) => None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.risk().is_some_and(|r| r.severity == Severity::Critical)
    }
}

/// Turns raw position records into risk assessments.
///
/// Pure: no I/O, no clock, no shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCalculator {
    basis: SeverityBasis,
}

impl RiskCalculator {
    /// Create a calculator tiering on the given basis.
    pub fn new(basis: SeverityBasis) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> SeverityBasis {
        self.basis
    }

    /// Assess one position against the owner's alert threshold.
    ///
    /// Fails with `MalformedPosition` when a required field is missing or the
    /// arithmetic cannot be carried out; the caller skips only this record.
    pub fn assess(
        &self,
        position: &PositionRecord,
        threshold: Decimal,
    ) -> Result<Assessment, RiskError> {
        let instrument = position.instrument.as_str();
        if instrument.is_empty() {
            return Err(RiskError::malformed(instrument, "missing instrument"));
        }

        let size = position
            .size
            .ok_or_else(|| RiskError::malformed(instrument, "missing size"))?;
        if size.is_zero() {
            return Ok(Assessment::Excluded(ExclusionReason::Flat));
        }

        let side = if size > Decimal::ZERO {
            Side::Long
        } else {
            Side::Short
        };
        let abs_size = size.abs();

        let position_value = position
            .position_value
            .ok_or_else(|| RiskError::malformed(instrument, "missing position value"))?;
        let current_price = position_value
            .abs()
            .checked_div(abs_size)
            .ok_or_else(|| RiskError::malformed(instrument, "current price overflow"))?;

        let (liquidation_price, liquidation_estimated) = match position.liquidation_price {
            Some(price) => (price, false),
            None => (Self::synthesize_for(position, side)?, true),
        };

        if liquidation_price <= Decimal::ZERO {
            return Ok(Assessment::Excluded(ExclusionReason::NoLiquidationPrice));
        }

        let distance_price = match side {
            Side::Long => current_price - liquidation_price,
            Side::Short => liquidation_price - current_price,
        };

        let distance_percent = distance_price
            .checked_div(liquidation_price)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .ok_or_else(|| RiskError::malformed(instrument, "distance percent overflow"))?;

        let distance_dollar = distance_price
            .checked_mul(abs_size)
            .ok_or_else(|| RiskError::malformed(instrument, "distance dollar overflow"))?;

        let metric = match self.basis {
            SeverityBasis::Percent => distance_percent,
            SeverityBasis::Dollar => distance_dollar,
        };

        Ok(Assessment::Assessed(RiskAssessment {
            side,
            current_price,
            liquidation_price,
            liquidation_estimated,
            distance_price,
            distance_percent,
            distance_dollar,
            severity: Severity::classify(metric, threshold),
        }))
    }

    /// Estimate a liquidation price from entry price and leverage.
    ///
    /// Isolated-style approximation: long = entry * (1 - 1/lev),
    /// short = entry * (1 + 1/lev). The venue's real cross-margin price
    /// depends on account equity, which is not modeled.
    pub fn synthesize_liquidation_price(
        entry_price: Decimal,
        leverage: Decimal,
        side: Side,
    ) -> Option<Decimal> {
        if leverage <= Decimal::ZERO {
            return None;
        }
        let inverse = Decimal::ONE.checked_div(leverage)?;
        let factor = match side {
            Side::Long => Decimal::ONE - inverse,
            Side::Short => Decimal::ONE + inverse,
        };
        entry_price.checked_mul(factor)
    }

    fn synthesize_for(position: &PositionRecord, side: Side) -> Result<Decimal, RiskError> {
        let instrument = position.instrument.as_str();
        let entry_price = position.entry_price.ok_or_else(|| {
            RiskError::malformed(instrument, "missing entry price for liquidation estimate")
        })?;
        let leverage = position.leverage.ok_or_else(|| {
            RiskError::malformed(instrument, "missing leverage for liquidation estimate")
        })?;

        Self::synthesize_liquidation_price(entry_price, leverage.value, side).ok_or_else(|| {
            RiskError::malformed(
                instrument,
                format!("cannot estimate liquidation price at leverage {}", leverage.value),
            )
        })
    }
}
