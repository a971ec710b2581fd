//! Cointegrated-pair spread mean reversion.

use signal_core::{
    Direction, PairsConfig, Position, PriceSeries, Result, SpreadModel, TerminalPolicy,
};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{crosses_above, crosses_below, previous_tick, TickCursor};
use crate::data_store::PriceFrame;
use crate::strategy::{ReturnLedger, ReturnSink, Strategy, TradeLog};

/// Leg weights and direction of an open spread trade.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpreadTrade {
    direction: Direction,
    hedge_ratio: f64,
    y_weight: f64,
    x_weight: f64,
}

impl SpreadTrade {
    fn new(direction: Direction, hedge_ratio: f64) -> Self {
        let magnitude = hedge_ratio.abs();
        Self {
            direction,
            hedge_ratio,
            y_weight: 1.0 / (1.0 + magnitude),
            x_weight: magnitude / (1.0 + magnitude),
        }
    }

    /// The `x` leg replicates `-β·x`.
    fn x_direction(&self) -> Direction {
        if self.hedge_ratio >= 0.0 {
            self.direction.opposite()
        } else {
            self.direction
        }
    }
}

/// Trades the z-score of `y - β·x`, with `β` from the Kalman estimator.
///
/// Long spread enters when z recovers through `-bandwidth` from below and
/// exits when it crosses up through zero; short spread mirrors this. While a
/// trade is open the hedge ratio is frozen so entry and exit share one `β`.
#[derive(Debug, Clone)]
pub struct PairsSpreadStrategy {
    config: PairsConfig,
    model: SpreadModel,
    y_leg: Position,
    x_leg: Position,
    open: Option<SpreadTrade>,
    ledger: ReturnLedger,
    log: TradeLog,
    cursor: TickCursor,
}

impl PairsSpreadStrategy {
    pub fn new(frame: &PriceFrame, config: PairsConfig) -> Result<Self> {
        config.validate()?;
        let x = frame.series(&config.asset1)?;
        let y = frame.series(&config.asset2)?;
        Self::from_series(x, y, config)
    }

    pub fn from_series(x: PriceSeries, y: PriceSeries, config: PairsConfig) -> Result<Self> {
        let model = SpreadModel::new(x, y, &config)?;
        let ticks = model.len();
        let first_tick = model.first_valid() + 1;

        Ok(Self {
            config,
            model,
            y_leg: Position::new(),
            x_leg: Position::new(),
            open: None,
            ledger: ReturnLedger::new(ticks),
            log: TradeLog::new(),
            cursor: TickCursor::new(first_tick),
        })
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    pub fn model(&self) -> &SpreadModel {
        &self.model
    }

    pub fn direction(&self) -> Option<Direction> {
        self.open.map(|trade| trade.direction)
    }

    fn open_spread(&mut self, t: usize, direction: Direction, hedge_ratio: f64, spread: f64) -> Result<()> {
        let trade = SpreadTrade::new(direction, hedge_ratio);
        let fee = self.config.trading_fee;

        self.y_leg.open(self.model.y().get(t)?, direction, fee)?;
        self.x_leg.open(self.model.x().get(t)?, trade.x_direction(), fee)?;
        self.open = Some(trade);
        self.log.record_open(t, spread, direction);

        debug!(
            spread = %self.model.name(),
            tick = t,
            price = spread,
            direction = %direction,
            hedge_ratio,
            "Spread position opened"
        );
        Ok(())
    }

    fn close_spread(&mut self, t: usize, trade: SpreadTrade, spread: f64) -> Result<f64> {
        let fee = self.config.trading_fee;
        let y_return = self.y_leg.close(self.model.y().get(t)?, fee)?;
        let x_return = self.x_leg.close(self.model.x().get(t)?, fee)?;
        let trade_return = trade.y_weight * y_return + trade.x_weight * x_return;

        self.open = None;
        self.ledger.record(t, trade_return)?;
        self.log.record_close(t, spread, trade.direction, trade_return);

        debug!(
            spread = %self.model.name(),
            tick = t,
            price = spread,
            trade_return,
            "Spread position closed"
        );
        Ok(trade_return)
    }
}

impl Strategy for PairsSpreadStrategy {
    fn name(&self) -> String {
        "pairs_spread".to_string()
    }

    fn parameters(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("pair".to_string(), self.config.name());
        params.insert("zscore_period".to_string(), self.config.zscore_period.to_string());
        params.insert("bandwidth".to_string(), self.config.bandwidth.to_string());
        params.insert("trading_fee".to_string(), self.config.trading_fee.to_string());
        params.insert("delta".to_string(), self.config.hedge.delta.to_string());
        params.insert("terminal".to_string(), self.config.terminal.as_str().to_string());
        params
    }

    fn first_tick(&self) -> usize {
        self.cursor.first()
    }

    fn tick_count(&self) -> usize {
        self.model.len()
    }

    fn on_tick(&mut self, t: usize) -> Result<()> {
        self.cursor.step(t)?;
        let prev = previous_tick(t)?;
        // Warm-up ticks before the first decision are filtered here.
        while self.model.next_tick() <= t {
            let tick = self.model.next_tick();
            self.model.advance(tick, self.open.is_some())?;
        }

        let z_pair = (self.model.zscore(prev)?, self.model.zscore(t)?);
        let spread = self.model.spread(t)?;
        let bandwidth = self.config.bandwidth;

        match self.open {
            None => {
                let (Some(z_prev), Some(z_t)) = z_pair else {
                    return Ok(());
                };
                let hedge_ratio = self.model.hedge_ratio(t)?;
                if crosses_above(z_prev, z_t, -bandwidth) && z_t < 0.0 {
                    self.open_spread(t, Direction::Long, hedge_ratio, spread)?;
                } else if crosses_below(z_prev, z_t, bandwidth) && z_t > 0.0 {
                    self.open_spread(t, Direction::Short, hedge_ratio, spread)?;
                }
            }
            Some(trade) => {
                let (Some(z_prev), Some(z_t)) = z_pair else {
                    warn!(
                        spread = %self.model.name(),
                        tick = t,
                        "Spread z-score undefined while a position is open"
                    );
                    return Ok(());
                };
                let exit = match trade.direction {
                    Direction::Long => crosses_above(z_prev, z_t, 0.0),
                    Direction::Short => crosses_below(z_prev, z_t, 0.0),
                };
                if exit {
                    self.close_spread(t, trade, spread)?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(last) = self.cursor.finish()? else {
            return Ok(());
        };
        if let (TerminalPolicy::Close, Some(trade)) = (self.config.terminal, self.open) {
            let spread = self.model.spread(last)?;
            self.close_spread(last, trade, spread)?;
        }
        Ok(())
    }

    fn ledger(&self) -> &ReturnLedger {
        &self.ledger
    }

    fn trade_log(&self) -> &TradeLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::TradeAction;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use signal_core::HedgeRatioConfig;

    fn cointegrated(seed: u64, n: usize) -> (PriceSeries, PriceSeries) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Vec::with_capacity(n);
        let mut level = 0.02;
        for _ in 0..n {
            level *= 1.0 + rng.gen_range(-0.01..0.01);
            x.push(level);
        }
        let mut noise = 0.0;
        let y = x
            .iter()
            .map(|v| {
                noise = 0.7 * noise + rng.gen_range(-0.0004..0.0004);
                1.5 * v + noise
            })
            .collect::<Vec<f64>>();
        (PriceSeries::new("XRP", x), PriceSeries::new("XLM", y))
    }

    fn config() -> PairsConfig {
        PairsConfig::new("XRP", "XLM").with_zscore(20, 1.0)
    }

    #[test]
    fn test_weights() {
        let trade = SpreadTrade::new(Direction::Long, 3.0);
        assert_eq!(trade.y_weight, 0.25);
        assert_eq!(trade.x_weight, 0.75);
        assert_eq!(trade.x_direction(), Direction::Short);

        let trade = SpreadTrade::new(Direction::Short, -1.0);
        assert_eq!(trade.y_weight, 0.5);
        assert_eq!(trade.x_weight, 0.5);
        assert_eq!(trade.x_direction(), Direction::Short);
    }

    #[test]
    fn test_first_tick() {
        let (x, y) = cointegrated(1, 100);
        let strategy = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        assert_eq!(strategy.first_tick(), 20);
        assert_eq!(strategy.tick_count(), 100);
    }

    #[test]
    fn test_trades_and_freezes_hedge_ratio() {
        let (x, y) = cointegrated(11, 600);
        let mut strategy = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        strategy.trade().unwrap();

        let records = strategy.trade_log().records().to_vec();
        assert!(!strategy.trade_log().close_ticks().is_empty());

        for pair in records.chunks(2).filter(|c| c.len() == 2) {
            assert_eq!(pair[0].action, TradeAction::Open);
            assert_eq!(pair[1].action, TradeAction::Close);
            let frozen = strategy.model().hedge_ratio(pair[0].tick).unwrap();
            for t in pair[0].tick..=pair[1].tick {
                assert_eq!(strategy.model().hedge_ratio(t).unwrap(), frozen);
            }
        }
    }

    #[test]
    fn test_trade_return_is_weighted_leg_sum() {
        let (x, y) = cointegrated(5, 600);
        let fee = 0.001;
        let mut strategy = PairsSpreadStrategy::from_series(
            x.clone(),
            y.clone(),
            config().with_fee(fee),
        )
        .unwrap();
        strategy.trade().unwrap();

        let records = strategy.trade_log().records().to_vec();
        let (open, close) = (&records[0], &records[1]);
        let beta = strategy.model().hedge_ratio(open.tick).unwrap();
        let trade = SpreadTrade::new(open.direction, beta);

        let mut y_leg = Position::new();
        y_leg.open(y.values()[open.tick], open.direction, fee).unwrap();
        let y_return = y_leg.close(y.values()[close.tick], fee).unwrap();
        let mut x_leg = Position::new();
        x_leg.open(x.values()[open.tick], trade.x_direction(), fee).unwrap();
        let x_return = x_leg.close(x.values()[close.tick], fee).unwrap();

        let expected = trade.y_weight * y_return + trade.x_weight * x_return;
        assert_eq!(strategy.ledger().get(close.tick), Some(expected));
        assert_eq!(close.trade_return, Some(expected));
    }

    #[test]
    fn test_deterministic_ledgers() {
        let (x, y) = cointegrated(23, 400);
        let run = || {
            let mut strategy =
                PairsSpreadStrategy::from_series(x.clone(), y.clone(), config()).unwrap();
            strategy.trade().unwrap();
            strategy
                .ledger()
                .values()
                .iter()
                .map(|v| v.to_bits())
                .collect::<Vec<u64>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_ticks_must_advance_one_at_a_time() {
        let (x, y) = cointegrated(2, 60);
        let mut strategy = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        assert!(strategy.on_tick(10).unwrap_err().is_invalid_state());

        let (x, y) = cointegrated(2, 60);
        let mut strategy = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        strategy.on_tick(20).unwrap();
        assert_eq!(strategy.model().next_tick(), 21);
        assert!(strategy.on_tick(20).unwrap_err().is_invalid_state());
        assert!(strategy.on_tick(25).unwrap_err().is_invalid_state());
        assert_eq!(strategy.model().next_tick(), 21);
        strategy.on_tick(21).unwrap();
    }

    #[test]
    fn test_open_spread_closes_at_last_tick() {
        let (x, y) = cointegrated(11, 600);
        let mut leave = PairsSpreadStrategy::from_series(
            x.clone(),
            y.clone(),
            config().with_terminal(TerminalPolicy::Leave),
        )
        .unwrap();
        leave.trade().unwrap();

        // Cut the series right after the last entry so it is still open.
        let last_open = *leave.trade_log().open_ticks().last().unwrap();
        let end = last_open + 1;
        let x = PriceSeries::new("XRP", x.values()[..end].to_vec());
        let y = PriceSeries::new("XLM", y.values()[..end].to_vec());

        let mut close = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        close.trade().unwrap();
        assert_eq!(close.trade_log().open_ticks().last(), Some(&last_open));
        assert_eq!(close.trade_log().close_ticks().last(), Some(&last_open));
        assert_eq!(close.direction(), None);
        let records = close.trade_log().records();
        assert_eq!(records.last().map(|r| r.action), Some(TradeAction::Close));
    }

    #[test]
    fn test_second_trade_is_rejected() {
        let (x, y) = cointegrated(23, 400);
        let mut strategy = PairsSpreadStrategy::from_series(x, y, config()).unwrap();
        let total = strategy.trade().unwrap();

        assert!(strategy.trade().unwrap_err().is_invalid_state());
        assert_eq!(strategy.ledger().total(), total);
    }

    #[test]
    fn test_rejects_same_asset_twice() {
        let (x, _) = cointegrated(3, 30);
        let err = PairsSpreadStrategy::from_series(
            x.clone(),
            x,
            PairsConfig::new("XRP", "XRP"),
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());

        let hedge = HedgeRatioConfig {
            scale: 0.0,
            ..Default::default()
        };
        let (x, y) = cointegrated(3, 30);
        assert!(PairsSpreadStrategy::from_series(x, y, config().with_hedge(hedge)).is_err());
    }
}
