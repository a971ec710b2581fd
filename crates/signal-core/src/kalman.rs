//! Online hedge-ratio estimation.
//!
//! Recursive linear regression `y_t = β_t·x_t + α_t` where `(β, α)` follows a
//! random walk. Observations are consumed strictly in tick order.

use tracing::trace;

use crate::config::HedgeRatioConfig;
use crate::types::DerivedSeries;
use crate::{Error, Result};

type Matrix2 = [[f64; 2]; 2];

const IDENTITY: Matrix2 = [[1.0, 0.0], [0.0, 1.0]];

/// Kalman filter over the state `(β, α)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeRatioEstimator {
    /// `[β, α]`
    state: [f64; 2],
    covariance: Matrix2,
    process_noise: f64,
    observation_variance: f64,
    scale: f64,
    observations: usize,
}

impl HedgeRatioEstimator {
    pub fn new(config: &HedgeRatioConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: [0.0, 0.0],
            covariance: IDENTITY,
            process_noise: config.delta / (1.0 - config.delta),
            observation_variance: config.observation_variance,
            scale: config.scale,
            observations: 0,
        })
    }

    /// Current slope estimate.
    pub fn beta(&self) -> f64 {
        self.state[0]
    }

    /// Current intercept estimate, in scaled units.
    pub fn intercept(&self) -> f64 {
        self.state[1]
    }

    pub fn covariance(&self) -> [[f64; 2]; 2] {
        self.covariance
    }

    /// Number of observations folded into the estimate.
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Fold one `(x, y)` observation into the estimate and return the new `β`.
    ///
    /// The first observation corrects the initial state directly; every later
    /// one is preceded by a random-walk prediction step.
    pub fn update(&mut self, x: f64, y: f64) -> Result<f64> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::invalid_argument(format!(
                "hedge ratio observation must be finite, got x={} y={}",
                x, y
            )));
        }

        let x = x * self.scale;
        let y = y * self.scale;

        if self.observations > 0 {
            self.covariance[0][0] += self.process_noise;
            self.covariance[1][1] += self.process_noise;
        }

        let p = self.covariance;
        let h = [x, 1.0];

        // P·Hᵀ
        let ph = [
            p[0][0] * h[0] + p[0][1] * h[1],
            p[1][0] * h[0] + p[1][1] * h[1],
        ];
        let innovation_variance = h[0] * ph[0] + h[1] * ph[1] + self.observation_variance;
        let gain = [ph[0] / innovation_variance, ph[1] / innovation_variance];
        let residual = y - (h[0] * self.state[0] + h[1] * self.state[1]);

        self.state[0] += gain[0] * residual;
        self.state[1] += gain[1] * residual;

        // P - K·(H·P), with H·P = (P·Hᵀ)ᵀ for symmetric P
        let mut next = [
            [p[0][0] - gain[0] * ph[0], p[0][1] - gain[0] * ph[1]],
            [p[1][0] - gain[1] * ph[0], p[1][1] - gain[1] * ph[1]],
        ];
        let off_diagonal = 0.5 * (next[0][1] + next[1][0]);
        next[0][1] = off_diagonal;
        next[1][0] = off_diagonal;
        self.covariance = next;
        self.observations += 1;

        trace!(
            observation = self.observations,
            beta = self.state[0],
            residual = residual,
            "Hedge ratio updated"
        );

        Ok(self.state[0])
    }

    /// Run a fresh estimator over two aligned series and collect `β` per tick.
    pub fn filter(config: &HedgeRatioConfig, x: &[f64], y: &[f64]) -> Result<DerivedSeries> {
        if x.len() != y.len() {
            return Err(Error::invalid_argument(format!(
                "hedge ratio inputs must have equal length, got {} and {}",
                x.len(),
                y.len()
            )));
        }

        let mut estimator = Self::new(config)?;
        let betas = x
            .iter()
            .zip(y)
            .map(|(&x, &y)| estimator.update(x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(DerivedSeries::new("Hedge Ratio", betas, 0))
    }
}
