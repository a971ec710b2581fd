//! Synthetic spread between two co-moving assets.
//!
//! The model is advanced one tick at a time so that the hedge ratio can be
//! frozen while a spread position is open.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::PairsConfig;
use crate::indicators::{window_zscore, ExponentialMovingAverage};
use crate::kalman::HedgeRatioEstimator;
use crate::types::{DerivedSeries, PriceSeries};
use crate::{Error, Result};

/// State of the spread after processing one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub tick: usize,
    pub hedge_ratio: f64,
    pub spread: f64,
    /// `None` until the lookback is full or when the window is degenerate.
    pub zscore: Option<f64>,
}

/// `spread_t = y_t - β_t·x_t` with a rolling z-score over the spread.
#[derive(Debug, Clone)]
pub struct SpreadModel {
    name: String,
    x: PriceSeries,
    y: PriceSeries,
    x_observed: Vec<f64>,
    y_observed: Vec<f64>,
    estimator: HedgeRatioEstimator,
    zscore_period: usize,
    hedge_ratio: Vec<f64>,
    spread: Vec<f64>,
    zscore: Vec<f64>,
}

impl SpreadModel {
    pub fn new(x: PriceSeries, y: PriceSeries, config: &PairsConfig) -> Result<Self> {
        config.validate()?;
        if x.len() != y.len() {
            return Err(Error::invalid_argument(format!(
                "pair series must have equal length, {} has {} ticks and {} has {}",
                x.symbol(),
                x.len(),
                y.symbol(),
                y.len()
            )));
        }

        let (x_observed, y_observed) = match config.hedge.smoothing_period {
            Some(period) => (
                ExponentialMovingAverage::new(x.values(), period)?
                    .series()
                    .values()
                    .to_vec(),
                ExponentialMovingAverage::new(y.values(), period)?
                    .series()
                    .values()
                    .to_vec(),
            ),
            None => (x.values().to_vec(), y.values().to_vec()),
        };

        let capacity = x.len();
        Ok(Self {
            name: format!("{}/{}", y.symbol(), x.symbol()),
            estimator: HedgeRatioEstimator::new(&config.hedge)?,
            zscore_period: config.zscore_period,
            x,
            y,
            x_observed,
            y_observed,
            hedge_ratio: Vec::with_capacity(capacity),
            spread: Vec::with_capacity(capacity),
            zscore: Vec::with_capacity(capacity),
        })
    }

    /// Spread label, `y/x`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn x(&self) -> &PriceSeries {
        &self.x
    }

    pub fn y(&self) -> &PriceSeries {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn zscore_period(&self) -> usize {
        self.zscore_period
    }

    /// Next tick `advance` expects.
    pub fn next_tick(&self) -> usize {
        self.spread.len()
    }

    /// First tick whose z-score can be defined.
    pub fn first_valid(&self) -> usize {
        self.zscore_period - 1
    }

    /// Process tick `t`.
    ///
    /// With `hold` set the previous tick's hedge ratio is carried forward and
    /// the estimator skips the observation.
    pub fn advance(&mut self, t: usize, hold: bool) -> Result<SpreadPoint> {
        if t != self.next_tick() {
            return Err(Error::invalid_state(format!(
                "spread {} must advance in order: expected tick {}, got {}",
                self.name,
                self.next_tick(),
                t
            )));
        }
        if t >= self.len() {
            return Err(Error::invalid_state(format!(
                "tick {} is past the end of spread {} ({} ticks)",
                t,
                self.name,
                self.len()
            )));
        }

        let hedge_ratio = if hold {
            match self.hedge_ratio.last() {
                Some(&previous) => previous,
                None => {
                    return Err(Error::invalid_state(format!(
                        "cannot hold the hedge ratio of {} at tick 0",
                        self.name
                    )))
                }
            }
        } else {
            self.estimator
                .update(self.x_observed[t], self.y_observed[t])?
        };

        let spread = self.y.values()[t] - hedge_ratio * self.x.values()[t];
        self.hedge_ratio.push(hedge_ratio);
        self.spread.push(spread);

        let zscore = if t + 1 >= self.zscore_period {
            window_zscore(&self.spread[t + 1 - self.zscore_period..=t])
        } else {
            f64::NAN
        };
        self.zscore.push(zscore);

        if hold {
            trace!(spread = %self.name, tick = t, hedge_ratio, "Hedge ratio held");
        }

        Ok(SpreadPoint {
            tick: t,
            hedge_ratio,
            spread,
            zscore: if zscore.is_nan() { None } else { Some(zscore) },
        })
    }

    /// Z-score at an already processed tick.
    pub fn zscore(&self, t: usize) -> Result<Option<f64>> {
        if t < self.first_valid() || t >= self.zscore.len() {
            return Err(Error::invalid_state(format!(
                "z-score of {} read at tick {} outside processed range {}..{}",
                self.name,
                t,
                self.first_valid(),
                self.zscore.len()
            )));
        }
        let value = self.zscore[t];
        Ok(if value.is_nan() { None } else { Some(value) })
    }

    pub fn hedge_ratio(&self, t: usize) -> Result<f64> {
        self.hedge_ratio.get(t).copied().ok_or_else(|| {
            Error::invalid_state(format!(
                "hedge ratio of {} read at unprocessed tick {}",
                self.name, t
            ))
        })
    }

    pub fn spread(&self, t: usize) -> Result<f64> {
        self.spread.get(t).copied().ok_or_else(|| {
            Error::invalid_state(format!(
                "spread {} read at unprocessed tick {}",
                self.name, t
            ))
        })
    }

    /// Snapshot of the hedge ratios processed so far.
    pub fn hedge_ratio_series(&self) -> DerivedSeries {
        DerivedSeries::new(format!("{} HR", self.name), self.hedge_ratio.clone(), 0)
    }

    pub fn spread_series(&self) -> DerivedSeries {
        DerivedSeries::new(self.name.clone(), self.spread.clone(), 0)
    }

    pub fn zscore_series(&self) -> DerivedSeries {
        DerivedSeries::new(
            format!("{} {} Zscr", self.name, self.zscore_period),
            self.zscore.clone(),
            self.first_valid(),
        )
    }
}
