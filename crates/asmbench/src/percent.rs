//! Percentage change of a measurement against its baseline.
//!
//! Two denominators are in use and both are kept by name:
//!
//! - [`PercentageFormula::RelativeToBaseline`]: `(value - baseline) / baseline * 100`
//! - [`PercentageFormula::RelativeToMeasurement`]: `(value - baseline) / value * 100`
//!
//! A measurement of zero always yields a change of zero, whatever the
//! baseline. Display values are truncated toward zero to one decimal digit and
//! carry an explicit sign.

use std::fmt;

use asmbench_config::FormulaConfig;

use crate::error::{BenchError, Result};

/// Percentage-change formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PercentageFormula {
    /// Change expressed as a fraction of the baseline.
    #[default]
    RelativeToBaseline,

    /// Change expressed as a fraction of the measurement itself.
    RelativeToMeasurement,
}

impl PercentageFormula {
    fn divisor(self, value: u64, baseline: u64) -> u64 {
        match self {
            PercentageFormula::RelativeToBaseline => baseline,
            PercentageFormula::RelativeToMeasurement => value,
        }
    }

    /// Exact percentage change.
    ///
    /// # Examples
    ///
    /// ```
    /// use asmbench::PercentageFormula;
    ///
    /// let by_baseline = PercentageFormula::RelativeToBaseline;
    /// let by_value = PercentageFormula::RelativeToMeasurement;
    ///
    /// assert_eq!(by_baseline.change(40, 80).unwrap(), -50.0);
    /// assert_eq!(by_value.change(40, 80).unwrap(), -100.0);
    /// assert_eq!(by_baseline.change(0, 80).unwrap(), 0.0);
    /// ```
    ///
    /// # Errors
    ///
    /// [`BenchError::ZeroDivisor`] when a nonzero value is compared against a
    /// zero baseline under [`PercentageFormula::RelativeToBaseline`].
    pub fn change(self, value: u64, baseline: u64) -> Result<f64> {
        if value == 0 {
            return Ok(0.0);
        }
        let divisor = self.nonzero_divisor(value, baseline)?;
        Ok((value as f64 - baseline as f64) / divisor as f64 * 100.0)
    }

    /// Percentage change truncated to one decimal digit.
    ///
    /// Computed in integer tenths of a percent, so no float rounding can push
    /// a value across a digit boundary.
    ///
    /// ```
    /// use asmbench::PercentageFormula;
    ///
    /// let change = PercentageFormula::RelativeToBaseline.truncated(108, 81).unwrap();
    /// // 33.333...% truncates to 33.3%
    /// assert_eq!(change.to_string(), "+33.3%");
    /// ```
    pub fn truncated(self, value: u64, baseline: u64) -> Result<PercentChange> {
        if value == 0 {
            return Ok(PercentChange::ZERO);
        }
        let divisor = self.nonzero_divisor(value, baseline)?;
        let diff = i128::from(value) - i128::from(baseline);
        // Integer division truncates toward zero.
        let tenths = diff * 1000 / i128::from(divisor);
        Ok(PercentChange::from_tenths(
            tenths.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
        ))
    }

    fn nonzero_divisor(self, value: u64, baseline: u64) -> Result<u64> {
        match self.divisor(value, baseline) {
            0 => Err(BenchError::ZeroDivisor {
                formula: self,
                value,
                baseline,
            }),
            d => Ok(d),
        }
    }
}

impl From<FormulaConfig> for PercentageFormula {
    fn from(config: FormulaConfig) -> Self {
        match config {
            FormulaConfig::RelativeToBaseline => PercentageFormula::RelativeToBaseline,
            FormulaConfig::RelativeToMeasurement => PercentageFormula::RelativeToMeasurement,
        }
    }
}

impl fmt::Display for PercentageFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentageFormula::RelativeToBaseline => write!(f, "relative-to-baseline"),
            PercentageFormula::RelativeToMeasurement => write!(f, "relative-to-measurement"),
        }
    }
}

/// A truncated percentage change, stored in tenths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PercentChange {
    tenths: i64,
}

impl PercentChange {
    pub const ZERO: PercentChange = PercentChange { tenths: 0 };

    pub fn from_tenths(tenths: i64) -> Self {
        Self { tenths }
    }

    pub fn tenths(&self) -> i64 {
        self.tenths
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.tenths < 0 { '-' } else { '+' };
        let abs = self.tenths.unsigned_abs();
        write!(f, "{}{}.{}%", sign, abs / 10, abs % 10)
    }
}
