//! Signal Core Library
//!
//! Price series, trade positions, rolling signal generators and the online
//! hedge-ratio estimator shared by every backtesting strategy.
//!
//! # Components
//!
//! - **Types**: `PriceSeries`, `DerivedSeries` and the single-slot `Position`
//! - **Indicators**: simple/exponential moving averages and rolling z-scores
//! - **Kalman**: recursive linear regression for a time-varying hedge ratio
//! - **Spread**: `y - β·x` synthetic spread with a freezable hedge ratio

pub mod config;
pub mod error;
pub mod indicators;
pub mod kalman;
pub mod spread;
pub mod types;

pub use config::{
    CrossoverConfig, EngineSettings, HedgeRatioConfig, PairsConfig, TerminalPolicy,
    TrendFlipPolicy, ZScoreTrendConfig,
};
pub use error::{Error, Result};
pub use indicators::{
    ExponentialMovingAverage, MovingAverage, MovingAverageKind, SimpleMovingAverage, ZScore,
};
pub use kalman::HedgeRatioEstimator;
pub use spread::{SpreadModel, SpreadPoint};
pub use types::*;
