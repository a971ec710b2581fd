//! Moving-average crossover.

use signal_core::{CrossoverConfig, Direction, MovingAverage, PriceSeries, Result, TerminalPolicy};
use std::collections::HashMap;

use super::{crosses_above, crosses_below, previous_tick, TickCursor, TradeBook};
use crate::data_store::PriceFrame;
use crate::strategy::{ReturnLedger, Strategy, TradeLog};

/// Goes long when the fast MA crosses above the slow MA and short when it
/// crosses below, reversing any open position.
#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    config: CrossoverConfig,
    prices: PriceSeries,
    fast: MovingAverage,
    slow: MovingAverage,
    book: TradeBook,
    cursor: TickCursor,
}

impl CrossoverStrategy {
    pub fn new(frame: &PriceFrame, config: CrossoverConfig) -> Result<Self> {
        config.validate()?;
        let prices = frame.series(&config.asset_symbol)?;
        Self::from_series(prices, config)
    }

    pub fn from_series(prices: PriceSeries, config: CrossoverConfig) -> Result<Self> {
        config.validate()?;
        let fast = MovingAverage::new(config.ma_type, prices.values(), config.fast_period)?;
        let slow = MovingAverage::new(config.ma_type, prices.values(), config.slow_period)?;
        let book = TradeBook::new(prices.len(), config.trading_fee);
        let first_tick = fast.series().first_valid().max(slow.series().first_valid()) + 1;

        Ok(Self {
            config,
            prices,
            fast,
            slow,
            book,
            cursor: TickCursor::new(first_tick),
        })
    }

    pub fn config(&self) -> &CrossoverConfig {
        &self.config
    }

    pub fn fast(&self) -> &MovingAverage {
        &self.fast
    }

    pub fn slow(&self) -> &MovingAverage {
        &self.slow
    }

    pub fn direction(&self) -> Option<Direction> {
        self.book.direction()
    }

    fn reverse_into(&mut self, t: usize, price: f64, direction: Direction) -> Result<()> {
        if self.book.direction().is_some() {
            self.book.close(t, price)?;
        }
        self.book.open(t, price, direction)
    }
}

impl Strategy for CrossoverStrategy {
    fn name(&self) -> String {
        "crossover".to_string()
    }

    fn parameters(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("asset".to_string(), self.config.asset_symbol.clone());
        params.insert("fast_period".to_string(), self.config.fast_period.to_string());
        params.insert("slow_period".to_string(), self.config.slow_period.to_string());
        params.insert("ma_type".to_string(), self.config.ma_type.to_string());
        params.insert("trading_fee".to_string(), self.config.trading_fee.to_string());
        params.insert("terminal".to_string(), self.config.terminal.as_str().to_string());
        params
    }

    fn first_tick(&self) -> usize {
        self.cursor.first()
    }

    fn tick_count(&self) -> usize {
        self.prices.len()
    }

    fn on_tick(&mut self, t: usize) -> Result<()> {
        self.cursor.step(t)?;
        let prev = previous_tick(t)?;
        let (Some(fast_t), Some(slow_t), Some(fast_prev), Some(slow_prev)) = (
            self.fast.get(t)?,
            self.slow.get(t)?,
            self.fast.get(prev)?,
            self.slow.get(prev)?,
        ) else {
            return Ok(());
        };

        let price = self.prices.get(t)?;
        let spread_prev = fast_prev - slow_prev;
        let spread_t = fast_t - slow_t;

        if crosses_above(spread_prev, spread_t, 0.0) {
            self.reverse_into(t, price, Direction::Long)?;
        } else if crosses_below(spread_prev, spread_t, 0.0) {
            self.reverse_into(t, price, Direction::Short)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(last) = self.cursor.finish()? else {
            return Ok(());
        };
        if self.config.terminal == TerminalPolicy::Close && self.book.direction().is_some() {
            let price = self.prices.get(last)?;
            self.book.close(last, price)?;
        }
        Ok(())
    }

    fn ledger(&self) -> &ReturnLedger {
        self.book.ledger()
    }

    fn trade_log(&self) -> &TradeLog {
        self.book.log()
    }
}
