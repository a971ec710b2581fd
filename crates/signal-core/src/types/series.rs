//! Price series and the derived series aligned with them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Error, Result};

/// An ordered, immutable price history for one asset, indexed by tick.
///
/// Values are shared behind an `Arc` so independent backtests over the same
/// asset never copy the history.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    values: Arc<[f64]>,
}

impl PriceSeries {
    /// Create a new price series.
    pub fn new(symbol: impl Into<String>, values: impl Into<Arc<[f64]>>) -> Self {
        Self {
            symbol: symbol.into(),
            values: values.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Price at tick `t`.
    pub fn get(&self, t: usize) -> Result<f64> {
        self.values.get(t).copied().ok_or_else(|| {
            Error::invalid_state(format!(
                "tick {} is outside {} ({} ticks)",
                t,
                self.symbol,
                self.values.len()
            ))
        })
    }
}

/// A series derived from a price series (moving average, z-score, hedge
/// ratio, spread), aligned index-for-index with its source.
///
/// Ticks before `first_valid` are not available and reading them is a
/// contract violation. Defined ticks may still hold `NaN`, which marks an
/// undefined value (for example a z-score over a constant window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    name: String,
    values: Vec<f64>,
    first_valid: usize,
}

impl DerivedSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>, first_valid: usize) -> Self {
        Self {
            name: name.into(),
            values,
            first_valid,
        }
    }

    /// Label used for reports, e.g. `"20 SMA"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First tick at which the lookback window is satisfied.
    pub fn first_valid(&self) -> usize {
        self.first_valid
    }

    /// Raw values, including the not-available prefix.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at tick `t`.
    ///
    /// Fails with `InvalidState` before the lookback window is satisfied or
    /// past the end of the series. Returns `Ok(None)` for an undefined value.
    pub fn get(&self, t: usize) -> Result<Option<f64>> {
        if t < self.first_valid {
            return Err(Error::invalid_state(format!(
                "{} read at tick {} before its lookback is satisfied (first valid tick {})",
                self.name, t, self.first_valid
            )));
        }
        let value = self.values.get(t).copied().ok_or_else(|| {
            Error::invalid_state(format!(
                "{} read at tick {} past its end ({} ticks)",
                self.name,
                t,
                self.values.len()
            ))
        })?;
        Ok(if value.is_nan() { None } else { Some(value) })
    }

    /// Whether the value at `t` is available and defined.
    pub fn is_defined(&self, t: usize) -> bool {
        matches!(self.get(t), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_series_get() {
        let series = PriceSeries::new("XRP", vec![1.0, 2.0, 3.0]);
        assert_eq!(series.symbol(), "XRP");
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(2).unwrap(), 3.0);
        assert!(series.get(3).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_price_series_clone_shares_values() {
        let series = PriceSeries::new("XLM", vec![0.5; 1000]);
        let copy = series.clone();
        assert_eq!(series.values().as_ptr(), copy.values().as_ptr());
    }

    #[test]
    fn test_derived_series_lookback() {
        let derived = DerivedSeries::new("3 SMA", vec![f64::NAN, f64::NAN, 2.0, 3.0], 2);

        assert!(derived.get(0).unwrap_err().is_invalid_state());
        assert!(derived.get(1).unwrap_err().is_invalid_state());
        assert_eq!(derived.get(2).unwrap(), Some(2.0));
        assert!(derived.get(4).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_derived_series_undefined_value() {
        let derived = DerivedSeries::new("2 Zscr", vec![f64::NAN, f64::NAN, 1.2], 1);

        assert_eq!(derived.get(1).unwrap(), None);
        assert!(!derived.is_defined(1));
        assert!(derived.is_defined(2));
    }
}
