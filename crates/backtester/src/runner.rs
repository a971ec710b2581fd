//! Backtest driver and performance summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_core::{Error, Result};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::strategy::{ReturnSink, Strategy};

/// Result of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Strategy name.
    pub strategy_name: String,
    /// Strategy parameters.
    pub strategy_params: HashMap<String, String>,
    /// Length of the price series.
    pub ticks: usize,
    /// First tick the strategy made a decision on.
    pub first_tick: usize,
    /// Cumulative return at the final tick.
    pub total_return: f64,
    /// Cumulative return per tick.
    pub equity_curve: Vec<f64>,
    /// Round-trip returns in close order.
    pub trade_returns: Vec<f64>,
    pub total_trades: usize,
    /// Mean round-trip return. Zero without trades.
    pub average_trade_return: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    /// Gross gains over gross losses.
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of the equity curve, in return units.
    pub max_drawdown: f64,
    /// Mean over standard deviation of per-tick returns. Not annualised.
    pub sharpe_ratio: f64,
    pub best_trade_return: f64,
    pub worst_trade_return: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub open_ticks: Vec<usize>,
    pub close_ticks: Vec<usize>,
    /// Computed at timestamp.
    pub computed_at: DateTime<Utc>,
}

impl BacktestResult {
    /// Check if the backtest was profitable.
    pub fn is_profitable(&self) -> bool {
        self.total_return > 0.0
    }
}

/// Drives a strategy over its tick range.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestRunner;

impl BacktestRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a backtest with the given strategy.
    pub fn run<S: Strategy + ?Sized>(&self, strategy: &mut S) -> Result<BacktestResult> {
        let name = strategy.name();
        let first_tick = strategy.first_tick();
        let ticks = strategy.tick_count();

        info!(strategy = %name, first_tick, ticks, "Starting backtest");

        if strategy.ledger().len() != ticks {
            return Err(Error::invalid_state(format!(
                "ledger of {} has {} entries for {} ticks",
                name,
                strategy.ledger().len(),
                ticks
            )));
        }
        if first_tick >= ticks {
            warn!(
                strategy = %name,
                first_tick,
                ticks,
                "Series too short for the strategy lookback, no ticks traded"
            );
        }

        for t in first_tick..ticks {
            strategy.on_tick(t)?;
        }
        strategy.finish()?;

        let result = self.calculate_results(strategy, first_tick, ticks);

        info!(
            strategy = %name,
            ticks,
            total_return = result.total_return,
            trades = result.total_trades,
            "Backtest completed"
        );

        Ok(result)
    }

    /// Run a backtest and stream the per-tick returns into `sink`.
    pub fn run_with_sink<S: Strategy + ?Sized>(
        &self,
        strategy: &mut S,
        sink: &mut dyn ReturnSink,
    ) -> Result<BacktestResult> {
        let result = self.run(strategy)?;
        strategy.ledger().replay(sink)?;
        Ok(result)
    }

    /// Run multiple strategies and compare results.
    pub fn compare_strategies(&self, strategies: &mut [Box<dyn Strategy>]) -> Vec<BacktestResult> {
        let mut results = Vec::new();

        for strategy in strategies.iter_mut() {
            match self.run(strategy.as_mut()) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(strategy = %strategy.name(), error = %e, "Strategy backtest failed");
                }
            }
        }

        sort_by_total_return(&mut results);
        results
    }

    fn calculate_results<S: Strategy + ?Sized>(
        &self,
        strategy: &S,
        first_tick: usize,
        ticks: usize,
    ) -> BacktestResult {
        let ledger = strategy.ledger();
        let log = strategy.trade_log();

        let equity_curve = ledger.cumulative();
        let total_return = equity_curve.last().copied().unwrap_or(0.0);
        let trade_returns = log.trade_returns();

        let winning_trades = trade_returns.iter().filter(|&&r| r > 0.0).count();
        let losing_trades = trade_returns.iter().filter(|&&r| r < 0.0).count();
        let total_trades = trade_returns.len();
        let (win_rate, average_trade_return) = if total_trades > 0 {
            (
                winning_trades as f64 / total_trades as f64,
                trade_returns.iter().sum::<f64>() / total_trades as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let total_wins: f64 = trade_returns.iter().filter(|&&r| r > 0.0).sum();
        let total_losses: f64 = -trade_returns.iter().filter(|&&r| r < 0.0).sum::<f64>();
        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let best_trade_return = trade_returns.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let worst_trade_return = trade_returns.iter().cloned().fold(f64::INFINITY, f64::min);
        let best_trade_return = if best_trade_return == f64::NEG_INFINITY { 0.0 } else { best_trade_return };
        let worst_trade_return = if worst_trade_return == f64::INFINITY { 0.0 } else { worst_trade_return };

        let (max_consecutive_wins, max_consecutive_losses) =
            calculate_consecutive_streaks(&trade_returns);

        BacktestResult {
            strategy_name: strategy.name(),
            strategy_params: strategy.parameters(),
            ticks,
            first_tick,
            total_return,
            max_drawdown: calculate_max_drawdown(&equity_curve),
            sharpe_ratio: calculate_sharpe(ledger.values().get(first_tick..).unwrap_or(&[])),
            equity_curve,
            total_trades,
            average_trade_return,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            best_trade_return,
            worst_trade_return,
            max_consecutive_wins,
            max_consecutive_losses,
            open_ticks: log.open_ticks(),
            close_ticks: log.close_ticks(),
            trade_returns,
            computed_at: Utc::now(),
        }
    }
}

/// Highest `total_return` first.
pub(crate) fn sort_by_total_return(results: &mut [BacktestResult]) {
    results.sort_by(|a, b| {
        b.total_return
            .partial_cmp(&a.total_return)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Calculate maximum consecutive wins and losses.
fn calculate_consecutive_streaks(trade_returns: &[f64]) -> (usize, usize) {
    let mut max_wins = 0;
    let mut max_losses = 0;
    let mut current_wins = 0;
    let mut current_losses = 0;

    for &r in trade_returns {
        if r > 0.0 {
            current_wins += 1;
            current_losses = 0;
            max_wins = max_wins.max(current_wins);
        } else if r < 0.0 {
            current_losses += 1;
            current_wins = 0;
            max_losses = max_losses.max(current_losses);
        }
    }

    (max_wins, max_losses)
}

/// Equity starts at zero cumulative return.
fn calculate_max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;

    for &value in equity_curve {
        peak = peak.max(value);
        max_drawdown = max_drawdown.max(peak - value);
    }

    max_drawdown
}

fn calculate_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean_return).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean_return / std_dev
    } else {
        0.0
    }
}
