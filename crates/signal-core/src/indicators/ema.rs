//! Exponential moving average.

use super::validate_period;
use crate::types::DerivedSeries;
use crate::Result;

/// Recursively weighted mean with `α = 2 / (period + 1)`.
///
/// The recursion is seeded with the first price and applied from the first
/// element without bias correction. The first `period - 1` ticks are treated
/// as warm-up so SMA and EMA signals become available at the same tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialMovingAverage {
    period: usize,
    alpha: f64,
    series: DerivedSeries,
}

impl ExponentialMovingAverage {
    pub fn new(values: &[f64], period: usize) -> Result<Self> {
        validate_period(period)?;
        let alpha = Self::smoothing(period);

        let mut out = Vec::with_capacity(values.len());
        let mut prev: Option<f64> = None;
        for &price in values {
            let next = match prev {
                None => price,
                Some(ema) => alpha * price + (1.0 - alpha) * ema,
            };
            out.push(next);
            prev = Some(next);
        }

        Ok(Self {
            period,
            alpha,
            series: DerivedSeries::new(format!("{} EMA", period), out, period - 1),
        })
    }

    /// Smoothing factor for a given span.
    pub fn smoothing(period: usize) -> f64 {
        2.0 / (period as f64 + 1.0)
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn series(&self) -> &DerivedSeries {
        &self.series
    }

    pub fn get(&self, t: usize) -> Result<Option<f64>> {
        self.series.get(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_failure() {
        assert!(ExponentialMovingAverage::new(&[1.0], 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_recursion() {
        // period 3 => alpha 0.5
        let ema = ExponentialMovingAverage::new(&[2.0, 4.0, 8.0, 0.0], 3).unwrap();
        assert_eq!(ema.alpha(), 0.5);

        let values = ema.series().values();
        assert_eq!(values[0], 2.0);
        assert_eq!(values[1], 3.0);
        assert_eq!(values[2], 5.5);
        assert_eq!(values[3], 2.75);

        assert!(ema.get(1).unwrap_err().is_invalid_state());
        assert_eq!(ema.get(2).unwrap(), Some(5.5));
    }

    #[test]
    fn test_period_one_is_spot() {
        let prices = [3.0, 1.5, 7.25];
        let ema = ExponentialMovingAverage::new(&prices, 1).unwrap();
        assert_eq!(ema.series().values(), &prices);
    }

    #[test]
    fn test_constant_series_is_constant() {
        let ema = ExponentialMovingAverage::new(&[4.0; 30], 10).unwrap();
        assert!(ema.series().values().iter().all(|v| (*v - 4.0).abs() < 1e-12));
    }
}
