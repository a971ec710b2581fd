//! Signal Backtest: moving-average, z-score and Kalman pairs backtesting
//!
//! This is the root crate that ties the workspace together for benchmarks and
//! integration tests. Functionality lives in the member crates:
//!
//! - `signal-core`: price series, positions, indicators, hedge-ratio estimation
//! - `backtester`: price frames, strategies, backtest runner, parameter sweeps

pub use backtester;
pub use signal_core as core;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
