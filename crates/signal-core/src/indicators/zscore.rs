//! Rolling z-score.

use super::validate_period;
use crate::types::DerivedSeries;
use crate::Result;

/// Z-score of the last value of `window` against the window itself, using
/// the sample standard deviation.
///
/// Returns `NaN` (undefined) for windows shorter than two values, windows
/// containing `NaN`, and constant windows.
pub fn window_zscore(window: &[f64]) -> f64 {
    let n = window.len();
    let last = match window.last() {
        Some(last) if n >= 2 => *last,
        _ => return f64::NAN,
    };

    let (min, max) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if window.iter().any(|v| v.is_nan()) || min == max {
        return f64::NAN;
    }

    let mean = window.iter().sum::<f64>() / n as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return f64::NAN;
    }

    (last - mean) / std
}

/// `(x_t - rolling mean) / rolling sample std` over a trailing window.
///
/// Undefined before the window is full and wherever the window is constant;
/// strategies must treat an undefined value as "no signal".
#[derive(Debug, Clone, PartialEq)]
pub struct ZScore {
    period: usize,
    series: DerivedSeries,
}

impl ZScore {
    pub fn new(values: &[f64], period: usize) -> Result<Self> {
        validate_period(period)?;

        let mut out = vec![f64::NAN; values.len()];
        for t in (period - 1)..values.len() {
            out[t] = window_zscore(&values[t + 1 - period..=t]);
        }

        Ok(Self {
            period,
            series: DerivedSeries::new(format!("{} Zscr", period), out, period - 1),
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

    #[test]
    fn test_period_failure() {
        assert!(ZScore::new(&[1.0, 2.0], 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_values() {
        // window [1, 2, 3]: mean 2, sample std 1
        let z = ZScore::new(&[1.0, 2.0, 3.0, 1.0], 3).unwrap();
        assert!(z.get(1).unwrap_err().is_invalid_state());
        assert!((z.get(2).unwrap().unwrap() - 1.0).abs() < 1e-12);

        // window [2, 3, 1]: mean 2, sample std 1
        assert!((z.get(3).unwrap().unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_window_is_undefined() {
        let prices = [0.1, 0.1, 0.1, 0.1, 0.3, 0.1];
        let z = ZScore::new(&prices, 3).unwrap();

        assert_eq!(z.get(2).unwrap(), None);
        assert_eq!(z.get(3).unwrap(), None);
        assert!(z.get(4).unwrap().unwrap().is_finite());
        assert!(!z.series().is_defined(3));
    }

    #[test]
    fn test_period_one_is_always_undefined() {
        let z = ZScore::new(&[1.0, 2.0, 3.0], 1).unwrap();
        assert!((0..3).all(|t| z.get(t).unwrap().is_none()));
    }

    #[test]
    fn test_window_zscore_nan_propagates() {
        assert!(window_zscore(&[1.0, f64::NAN, 3.0]).is_nan());
        assert!(window_zscore(&[]).is_nan());
    }
}
