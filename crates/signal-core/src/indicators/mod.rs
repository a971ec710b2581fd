//! Rolling signal generators over price series.
//!
//! Every generator produces a `DerivedSeries` aligned with its input. Values
//! before the lookback window is satisfied are stored as `NaN` and guarded by
//! `DerivedSeries::first_valid`.

pub mod ema;
pub mod sma;
pub mod zscore;

pub use ema::ExponentialMovingAverage;
pub use sma::SimpleMovingAverage;
pub use zscore::{window_zscore, ZScore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::DerivedSeries;
use crate::{Error, Result};

pub(crate) fn validate_period(period: usize) -> Result<()> {
    if period < 1 {
        return Err(Error::invalid_argument("period must be a positive integer"));
    }
    Ok(())
}

/// Moving average flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovingAverageKind {
    #[default]
    Sma,
    Ema,
}

impl MovingAverageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovingAverageKind::Sma => "SMA",
            MovingAverageKind::Ema => "EMA",
        }
    }
}

impl fmt::Display for MovingAverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovingAverageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SMA" => Ok(MovingAverageKind::Sma),
            "EMA" => Ok(MovingAverageKind::Ema),
            other => Err(Error::invalid_argument(format!(
                "MA type '{}' not supported, try 'SMA' or 'EMA'",
                other
            ))),
        }
    }
}

/// A moving average of either flavour.
#[derive(Debug, Clone, PartialEq)]
pub enum MovingAverage {
    Simple(SimpleMovingAverage),
    Exponential(ExponentialMovingAverage),
}

impl MovingAverage {
    pub fn new(kind: MovingAverageKind, values: &[f64], period: usize) -> Result<Self> {
        Ok(match kind {
            MovingAverageKind::Sma => MovingAverage::Simple(SimpleMovingAverage::new(values, period)?),
            MovingAverageKind::Ema => {
                MovingAverage::Exponential(ExponentialMovingAverage::new(values, period)?)
            }
        })
    }

    pub fn kind(&self) -> MovingAverageKind {
        match self {
            MovingAverage::Simple(_) => MovingAverageKind::Sma,
            MovingAverage::Exponential(_) => MovingAverageKind::Ema,
        }
    }

    pub fn period(&self) -> usize {
        match self {
            MovingAverage::Simple(ma) => ma.period(),
            MovingAverage::Exponential(ma) => ma.period(),
        }
    }

    pub fn series(&self) -> &DerivedSeries {
        match self {
            MovingAverage::Simple(ma) => ma.series(),
            MovingAverage::Exponential(ma) => ma.series(),
        }
    }

    /// Value at tick `t`. See `DerivedSeries::get`.
    pub fn get(&self, t: usize) -> Result<Option<f64>> {
        self.series().get(t)
    }
}
