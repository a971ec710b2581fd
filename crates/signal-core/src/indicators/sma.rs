//! Simple moving average.

use super::validate_period;
use crate::types::DerivedSeries;
use crate::Result;

/// Arithmetic mean of the trailing `period` values.
///
/// Undefined for `t < period - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleMovingAverage {
    period: usize,
    series: DerivedSeries,
}

impl SimpleMovingAverage {
    pub fn new(values: &[f64], period: usize) -> Result<Self> {
        validate_period(period)?;

        let mut out = vec![f64::NAN; values.len()];
        for t in (period - 1)..values.len() {
            let window = &values[t + 1 - period..=t];
            out[t] = window.iter().sum::<f64>() / period as f64;
        }

        Ok(Self {
            period,
            series: DerivedSeries::new(format!("{} SMA", period), out, period - 1),
        })
    }

    pub fn period(&self) -> usize {
        self.period
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
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_period_failure() {
        assert!(SimpleMovingAverage::new(&[1.0, 2.0], 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_values() {
        let sma = SimpleMovingAverage::new(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert!(sma.get(1).unwrap_err().is_invalid_state());
        assert_eq!(sma.get(2).unwrap(), Some(2.0));
        assert_eq!(sma.get(3).unwrap(), Some(3.0));
        assert_eq!(sma.get(4).unwrap(), Some(4.0));
    }

    #[test]
    fn test_period_one_is_spot() {
        let prices = [3.0, 1.5, 7.25];
        let sma = SimpleMovingAverage::new(&prices, 1).unwrap();
        for (t, price) in prices.iter().enumerate() {
            assert_eq!(sma.get(t).unwrap(), Some(*price));
        }
    }

    #[test]
    fn test_matches_trailing_mean_on_random_series() {
        let mut rng = StdRng::seed_from_u64(7);
        let prices: Vec<f64> = (0..200).map(|_| rng.gen_range(0.5..1.5)).collect();

        for period in [1, 2, 5, 17, 50] {
            let sma = SimpleMovingAverage::new(&prices, period).unwrap();
            for t in 0..prices.len() {
                if t + 1 < period {
                    assert!(sma.get(t).is_err());
                    continue;
                }
                let mean = prices[t + 1 - period..=t].iter().sum::<f64>() / period as f64;
                let value = sma.get(t).unwrap().unwrap();
                assert!((value - mean).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_period_longer_than_series() {
        let sma = SimpleMovingAverage::new(&[1.0, 2.0], 5).unwrap();
        assert_eq!(sma.series().len(), 2);
        assert!(sma.get(1).is_err());
    }
}
