//! Trend-filtered z-score mean reversion.

use signal_core::{
    Direction, MovingAverage, PriceSeries, Result, TerminalPolicy, TrendFlipPolicy, ZScore,
    ZScoreTrendConfig,
};
use std::collections::HashMap;
use tracing::warn;

use super::{crosses_above, crosses_below, previous_tick, TickCursor, TradeBook};
use crate::data_store::PriceFrame;
use crate::strategy::{ReturnLedger, Strategy, TradeLog};

/// Buys oversold dips in an uptrend and sells overbought rallies in a
/// downtrend, exiting when the z-score crosses back through zero.
///
/// The trend is up while the fast MA (spot for period 1) is above the slow
/// MA. Entries against the trend are never taken; what happens to an open
/// position when the trend flips is governed by [`TrendFlipPolicy`].
#[derive(Debug, Clone)]
pub struct ZScoreTrendStrategy {
    config: ZScoreTrendConfig,
    prices: PriceSeries,
    fast: MovingAverage,
    slow: MovingAverage,
    zscore: ZScore,
    book: TradeBook,
    cursor: TickCursor,
}

impl ZScoreTrendStrategy {
    pub fn new(frame: &PriceFrame, config: ZScoreTrendConfig) -> Result<Self> {
        config.validate()?;
        let prices = frame.series(&config.asset_symbol)?;
        Self::from_series(prices, config)
    }

    pub fn from_series(prices: PriceSeries, config: ZScoreTrendConfig) -> Result<Self> {
        config.validate()?;
        let fast = MovingAverage::new(config.ma_type, prices.values(), config.fast_period)?;
        let slow = MovingAverage::new(config.ma_type, prices.values(), config.slow_period)?;
        let zscore = ZScore::new(prices.values(), config.zscore_period)?;
        let book = TradeBook::new(prices.len(), config.trading_fee);
        let first_tick = [
            fast.series().first_valid(),
            slow.series().first_valid(),
            zscore.series().first_valid(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1;

        Ok(Self {
            config,
            prices,
            fast,
            slow,
            zscore,
            book,
            cursor: TickCursor::new(first_tick),
        })
    }

    pub fn config(&self) -> &ZScoreTrendConfig {
        &self.config
    }

    pub fn zscore(&self) -> &ZScore {
        &self.zscore
    }

    pub fn direction(&self) -> Option<Direction> {
        self.book.direction()
    }

    /// `Some(true)` in an uptrend, `None` when either MA is undefined.
    fn uptrend(&self, t: usize) -> Result<Option<bool>> {
        Ok(match (self.fast.get(t)?, self.slow.get(t)?) {
            (Some(fast), Some(slow)) => Some(fast > slow),
            _ => None,
        })
    }
}

impl Strategy for ZScoreTrendStrategy {
    fn name(&self) -> String {
        "zscore_trend".to_string()
    }

    fn parameters(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("asset".to_string(), self.config.asset_symbol.clone());
        params.insert("fast_period".to_string(), self.config.fast_period.to_string());
        params.insert("slow_period".to_string(), self.config.slow_period.to_string());
        params.insert("ma_type".to_string(), self.config.ma_type.to_string());
        params.insert("zscore_period".to_string(), self.config.zscore_period.to_string());
        params.insert("bandwidth".to_string(), self.config.bandwidth.to_string());
        params.insert("trading_fee".to_string(), self.config.trading_fee.to_string());
        params.insert("trend_flip".to_string(), self.config.trend_flip.as_str().to_string());
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
        let uptrend = self.uptrend(t)?;
        let z_pair = (self.zscore.get(prev)?, self.zscore.get(t)?);
        let price = self.prices.get(t)?;
        let bandwidth = self.config.bandwidth;

        match self.book.direction() {
            None => {
                let (Some(uptrend), (Some(z_prev), Some(z_t))) = (uptrend, z_pair) else {
                    return Ok(());
                };
                if uptrend && crosses_above(z_prev, z_t, -bandwidth) {
                    self.book.open(t, price, Direction::Long)?;
                } else if !uptrend && crosses_below(z_prev, z_t, bandwidth) {
                    self.book.open(t, price, Direction::Short)?;
                }
            }
            Some(direction) => {
                if self.config.trend_flip == TrendFlipPolicy::ForceClose {
                    let against = matches!(
                        (direction, uptrend),
                        (Direction::Long, Some(false)) | (Direction::Short, Some(true))
                    );
                    if against {
                        self.book.close(t, price)?;
                        return Ok(());
                    }
                }

                let (Some(z_prev), Some(z_t)) = z_pair else {
                    warn!(
                        tick = t,
                        asset = %self.config.asset_symbol,
                        "Z-score undefined while a position is open"
                    );
                    return Ok(());
                };
                let exit = match direction {
                    Direction::Long => crosses_above(z_prev, z_t, 0.0),
                    Direction::Short => crosses_below(z_prev, z_t, 0.0),
                };
                if exit {
                    self.book.close(t, price)?;
                }
            }
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
