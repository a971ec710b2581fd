//! Parallel parameter sweeps.
//!
//! Every combination builds its own strategy instance, so runs share nothing
//! but the immutable price frame.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use signal_core::{
    CrossoverConfig, EngineSettings, MovingAverageKind, PairsConfig, ZScoreTrendConfig,
};
use std::fmt::Debug;
use tracing::{info, warn};

use crate::data_store::PriceFrame;
use crate::runner::{sort_by_total_return, BacktestResult, BacktestRunner};
use crate::strategies::{CrossoverStrategy, PairsSpreadStrategy, ZScoreTrendStrategy};
use crate::strategy::Strategy;

/// Every `(fast, slow)` pair with `fast < slow` drawn from `periods`.
pub fn crossover_grid(periods: &[usize]) -> Vec<(usize, usize)> {
    let mut periods = periods.to_vec();
    periods.sort_unstable();
    periods.dedup();

    let mut grid = Vec::new();
    for (i, &fast) in periods.iter().enumerate() {
        for &slow in &periods[i + 1..] {
            grid.push((fast, slow));
        }
    }
    grid
}

/// Crossover configs for every symbol and grid point.
pub fn crossover_configs(
    symbols: &[&str],
    periods: &[usize],
    ma_type: MovingAverageKind,
    trading_fee: f64,
) -> Vec<CrossoverConfig> {
    let grid = crossover_grid(periods);
    symbols
        .iter()
        .flat_map(|symbol| {
            grid.iter().map(move |&(fast, slow)| {
                CrossoverConfig::new(*symbol, fast, slow)
                    .with_ma_type(ma_type)
                    .with_fee(trading_fee)
            })
        })
        .collect()
}

/// Runs batches of independent backtests on rayon.
#[derive(Debug, Clone, Default)]
pub struct ParameterSweep {
    threads: Option<usize>,
    runner: BacktestRunner,
}

impl ParameterSweep {
    /// Sweep on the global rayon pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep on a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            runner: BacktestRunner::new(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            threads: settings.sweep_threads,
            runner: BacktestRunner::new(),
        }
    }

    pub fn threads(&self) -> Option<usize> {
        self.threads
    }

    /// Build and run one strategy per config.
    ///
    /// Failing combinations are logged and skipped. Results are sorted by
    /// total return, best first. Errors only if every combination fails.
    pub fn run<C, S, F>(&self, configs: &[C], build: F) -> Result<Vec<BacktestResult>>
    where
        C: Debug + Sync,
        S: Strategy,
        F: Fn(&C) -> signal_core::Result<S> + Sync,
    {
        if configs.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            combinations = configs.len(),
            threads = ?self.threads,
            "Starting parameter sweep"
        );

        let job = || {
            configs
                .par_iter()
                .map(|config| {
                    let mut strategy = build(config)
                        .with_context(|| format!("Failed to build strategy for {:?}", config))?;
                    self.runner
                        .run(&mut strategy)
                        .with_context(|| format!("Backtest failed for {:?}", config))
                })
                .collect::<Vec<Result<BacktestResult>>>()
        };

        let outcomes = match self.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build sweep thread pool")?
                .install(job),
            None => job(),
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = 0;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    failures += 1;
                    warn!(error = %format!("{:#}", e), "Skipping parameter combination");
                }
            }
        }

        if results.is_empty() {
            bail!("All {} parameter combinations failed", failures);
        }

        sort_by_total_return(&mut results);

        info!(
            completed = results.len(),
            failed = failures,
            best_return = results[0].total_return,
            "Parameter sweep completed"
        );

        Ok(results)
    }

    pub fn crossover(
        &self,
        frame: &PriceFrame,
        configs: &[CrossoverConfig],
    ) -> Result<Vec<BacktestResult>> {
        self.run(configs, |config| CrossoverStrategy::new(frame, config.clone()))
    }

    pub fn zscore_trend(
        &self,
        frame: &PriceFrame,
        configs: &[ZScoreTrendConfig],
    ) -> Result<Vec<BacktestResult>> {
        self.run(configs, |config| ZScoreTrendStrategy::new(frame, config.clone()))
    }

    pub fn pairs(&self, frame: &PriceFrame, configs: &[PairsConfig]) -> Result<Vec<BacktestResult>> {
        self.run(configs, |config| PairsSpreadStrategy::new(frame, config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn frame() -> PriceFrame {
        let xrp: Vec<f64> = (0..200)
            .map(|t| 1.0 + 0.3 * (t as f64 / 9.0).sin() + t as f64 * 0.001)
            .collect();
        let ltc: Vec<f64> = (0..200)
            .map(|t| 2.0 + 0.5 * (t as f64 / 13.0).cos())
            .collect();
        PriceFrame::with_interval(
            Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap(),
            Duration::hours(1),
            vec![("XRP", xrp), ("LTC", ltc)],
        )
        .unwrap()
    }

    #[test]
    fn test_crossover_grid() {
        assert_eq!(
            crossover_grid(&[20, 1, 10, 10]),
            vec![(1, 10), (1, 20), (10, 20)]
        );
        assert!(crossover_grid(&[5]).is_empty());

        let configs = crossover_configs(&["XRP", "LTC"], &[1, 10, 20], MovingAverageKind::Ema, 0.001);
        assert_eq!(configs.len(), 6);
        assert_eq!(configs[3].asset_symbol, "LTC");
        assert_eq!(configs[3].ma_type, MovingAverageKind::Ema);
    }

    #[test]
    fn test_sweep_sorted_by_return() {
        let configs = crossover_configs(&["XRP", "LTC"], &[1, 5, 10, 20], MovingAverageKind::Sma, 0.0);
        let results = ParameterSweep::new().crossover(&frame(), &configs).unwrap();

        assert_eq!(results.len(), configs.len());
        for pair in results.windows(2) {
            assert!(pair[0].total_return >= pair[1].total_return);
        }
    }

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let frame = frame();
        let configs = crossover_configs(&["XRP"], &[1, 5, 10], MovingAverageKind::Sma, 0.001);
        let parallel = ParameterSweep::with_threads(2).crossover(&frame, &configs).unwrap();

        for result in &parallel {
            let fast: usize = result.strategy_params["fast_period"].parse().unwrap();
            let slow: usize = result.strategy_params["slow_period"].parse().unwrap();
            let mut strategy =
                CrossoverStrategy::new(&frame, CrossoverConfig::new("XRP", fast, slow).with_fee(0.001))
                    .unwrap();
            let total = strategy.trade().unwrap();
            assert_eq!(total.to_bits(), result.total_return.to_bits());
        }
    }

    #[test]
    fn test_sweep_skips_failures() {
        let mut configs = crossover_configs(&["XRP"], &[1, 10], MovingAverageKind::Sma, 0.0);
        configs.push(CrossoverConfig::new("DOGE", 1, 10));
        let results = ParameterSweep::new().crossover(&frame(), &configs).unwrap();
        assert_eq!(results.len(), 1);

        let configs = vec![CrossoverConfig::new("DOGE", 1, 10)];
        let err = ParameterSweep::new().crossover(&frame(), &configs).unwrap_err();
        assert!(err.to_string().contains("All 1 parameter combinations failed"));
    }

    #[test]
    fn test_from_settings() {
        let settings = EngineSettings {
            sweep_threads: Some(3),
            ..Default::default()
        };
        assert_eq!(ParameterSweep::from_settings(&settings).threads(), Some(3));
        assert!(ParameterSweep::new().crossover(&frame(), &[]).unwrap().is_empty());
    }
}
