//! Strategy contract and the records every strategy keeps.

use serde::{Deserialize, Serialize};
use signal_core::{Direction, Error, Result};
use std::collections::HashMap;

/// Receiver for the per-tick return stream of a backtest.
pub trait ReturnSink {
    /// Accept the return realized at `tick`.
    fn record(&mut self, tick: usize, value: f64) -> Result<()>;
}

impl ReturnSink for Vec<(usize, f64)> {
    fn record(&mut self, tick: usize, value: f64) -> Result<()> {
        self.push((tick, value));
        Ok(())
    }
}

/// Realized return per tick. Zero everywhere except close ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnLedger {
    returns: Vec<f64>,
}

impl ReturnLedger {
    pub fn new(ticks: usize) -> Self {
        Self {
            returns: vec![0.0; ticks],
        }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.returns
    }

    pub fn get(&self, tick: usize) -> Option<f64> {
        self.returns.get(tick).copied()
    }

    /// Running sum of the ledger.
    pub fn cumulative(&self) -> Vec<f64> {
        self.returns
            .iter()
            .scan(0.0, |total, r| {
                *total += r;
                Some(*total)
            })
            .collect()
    }

    /// Cumulative return at the final tick.
    pub fn total(&self) -> f64 {
        self.returns.iter().sum()
    }

    /// `(tick, return)` for every tick with a realized return.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.returns
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != 0.0)
            .map(|(t, r)| (t, *r))
    }

    /// Feed every tick, zeros included, into another sink.
    pub fn replay(&self, sink: &mut dyn ReturnSink) -> Result<()> {
        for (tick, value) in self.returns.iter().enumerate() {
            sink.record(tick, *value)?;
        }
        Ok(())
    }
}

impl ReturnSink for ReturnLedger {
    fn record(&mut self, tick: usize, value: f64) -> Result<()> {
        let len = self.returns.len();
        let slot = self.returns.get_mut(tick).ok_or_else(|| {
            Error::invalid_state(format!(
                "return recorded at tick {} outside ledger of {} ticks",
                tick, len
            ))
        })?;
        *slot += value;
        Ok(())
    }
}

/// Whether a trade record opened or closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Open,
    Close,
}

/// Informational record of one open or close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub tick: usize,
    pub action: TradeAction,
    pub direction: Direction,
    /// Price the action executed at (the spread value for pairs).
    pub price: f64,
    /// Realized return, set on closes.
    pub trade_return: Option<f64>,
}

/// Ordered open/close history of a strategy run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLog {
    records: Vec<TradeRecord>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_open(&mut self, tick: usize, price: f64, direction: Direction) {
        self.records.push(TradeRecord {
            tick,
            action: TradeAction::Open,
            direction,
            price,
            trade_return: None,
        });
    }

    pub fn record_close(&mut self, tick: usize, price: f64, direction: Direction, trade_return: f64) {
        self.records.push(TradeRecord {
            tick,
            action: TradeAction::Close,
            direction,
            price,
            trade_return: Some(trade_return),
        });
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn open_ticks(&self) -> Vec<usize> {
        self.ticks(TradeAction::Open)
    }

    pub fn close_ticks(&self) -> Vec<usize> {
        self.ticks(TradeAction::Close)
    }

    /// Returns of completed round trips, in close order.
    pub fn trade_returns(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.trade_return).collect()
    }

    fn ticks(&self, action: TradeAction) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.action == action)
            .map(|r| r.tick)
            .collect()
    }
}

/// A backtestable strategy.
///
/// Implementations precompute their signals at construction and make one
/// decision per tick in `on_tick`, reading only data at ticks `<= t`.
#[cfg_attr(test, mockall::automock)]
pub trait Strategy {
    /// Strategy identifier.
    fn name(&self) -> String;

    /// Parameters for reporting.
    fn parameters(&self) -> HashMap<String, String>;

    /// First tick at which every signal the strategy reads is defined.
    fn first_tick(&self) -> usize;

    /// Length of the underlying price series.
    fn tick_count(&self) -> usize;

    /// Make the decision for tick `t`. Ticks must arrive one at a time, in
    /// order, starting at `first_tick`.
    fn on_tick(&mut self, t: usize) -> Result<()>;

    /// End the run, applying the terminal policy to any open position.
    /// A strategy trades once; a second run is `InvalidState`.
    fn finish(&mut self) -> Result<()>;

    fn ledger(&self) -> &ReturnLedger;

    fn trade_log(&self) -> &TradeLog;

    /// Run every tick in order and return the cumulative return.
    fn trade(&mut self) -> Result<f64> {
        for t in self.first_tick()..self.tick_count() {
            self.on_tick(t)?;
        }
        self.finish()?;
        Ok(self.ledger().total())
    }

    /// Reporting hook. Plotting lives outside the engine.
    fn report_trades(&self) -> &TradeLog {
        self.trade_log()
    }
}
