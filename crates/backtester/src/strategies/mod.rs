//! Built-in strategies and the position bookkeeping they share.

pub mod crossover;
pub mod pairs;
pub mod zscore_trend;

pub use crossover::CrossoverStrategy;
pub use pairs::PairsSpreadStrategy;
pub use zscore_trend::ZScoreTrendStrategy;

use signal_core::{Direction, Error, Position, Result};
use tracing::debug;

use crate::strategy::{ReturnLedger, ReturnSink, TradeLog};

/// `previous <= level < current`
pub(crate) fn crosses_above(previous: f64, current: f64, level: f64) -> bool {
    previous <= level && current > level
}

/// `previous >= level > current`
pub(crate) fn crosses_below(previous: f64, current: f64, level: f64) -> bool {
    previous >= level && current < level
}

/// Tick before `t`; every strategy reads `t - 1`.
pub(crate) fn previous_tick(t: usize) -> Result<usize> {
    t.checked_sub(1)
        .ok_or_else(|| Error::invalid_state("tick 0 has no previous tick to compare against"))
}

/// One decision per tick, in order, then a single terminal pass.
#[derive(Debug, Clone)]
pub(crate) struct TickCursor {
    first: usize,
    next: usize,
    finished: bool,
}

impl TickCursor {
    pub(crate) fn new(first: usize) -> Self {
        Self {
            first,
            next: first,
            finished: false,
        }
    }

    pub(crate) fn first(&self) -> usize {
        self.first
    }

    /// Claim tick `t`. Only the tick after the last one processed is accepted.
    pub(crate) fn step(&mut self, t: usize) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_state(
                "strategy already traded; build a new instance to rerun",
            ));
        }
        if t != self.next {
            return Err(Error::invalid_state(format!(
                "expected tick {}, got {}",
                self.next, t
            )));
        }
        self.next += 1;
        Ok(())
    }

    /// End the run. Returns the last tick processed, if any.
    pub(crate) fn finish(&mut self) -> Result<Option<usize>> {
        if self.finished {
            return Err(Error::invalid_state(
                "strategy already traded; build a new instance to rerun",
            ));
        }
        self.finished = true;
        if self.next > self.first {
            Ok(Some(self.next - 1))
        } else {
            Ok(None)
        }
    }
}

/// Single position plus the ledger and log it writes to.
#[derive(Debug, Clone)]
pub(crate) struct TradeBook {
    position: Position,
    fee: f64,
    ledger: ReturnLedger,
    log: TradeLog,
}

impl TradeBook {
    pub(crate) fn new(ticks: usize, fee: f64) -> Self {
        Self {
            position: Position::new(),
            fee,
            ledger: ReturnLedger::new(ticks),
            log: TradeLog::new(),
        }
    }

    pub(crate) fn direction(&self) -> Option<Direction> {
        self.position.direction()
    }

    pub(crate) fn ledger(&self) -> &ReturnLedger {
        &self.ledger
    }

    pub(crate) fn log(&self) -> &TradeLog {
        &self.log
    }

    pub(crate) fn open(&mut self, tick: usize, price: f64, direction: Direction) -> Result<()> {
        self.position.open(price, direction, self.fee)?;
        self.log.record_open(tick, price, direction);
        debug!(tick, price, direction = %direction, "Position opened");
        Ok(())
    }

    pub(crate) fn close(&mut self, tick: usize, price: f64) -> Result<f64> {
        let direction = self.position.direction();
        let trade_return = self.position.close(price, self.fee)?;
        self.ledger.record(tick, trade_return)?;
        if let Some(direction) = direction {
            self.log.record_close(tick, price, direction, trade_return);
        }
        debug!(tick, price, trade_return, "Position closed");
        Ok(trade_return)
    }
}
