//! Single-slot trade position with fee-adjusted fractional returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Direction of an open trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1.0` for longs, `-1.0` for shorts.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l" | "long" => Ok(Direction::Long),
            "s" | "short" => Ok(Direction::Short),
            other => Err(Error::invalid_argument(format!(
                "direction '{}' not recognised, use 'L' or 'S'",
                other
            ))),
        }
    }
}

/// Current state of a position in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, PositionState::Flat)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            PositionState::Flat => None,
            PositionState::Long => Some(Direction::Long),
            PositionState::Short => Some(Direction::Short),
        }
    }
}

impl From<Direction> for PositionState {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => PositionState::Long,
            Direction::Short => PositionState::Short,
        }
    }
}

/// A fixed "one unit" trade slot.
///
/// Returns are fractional (0.3 == +30%) rather than absolute amounts. Fees
/// shrink the signed size multiplier by `(1 - fee)` on both open and close.
///
/// `Flat --open--> Long/Short --close--> Flat` are the only transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    state: PositionState,
    entry_price: f64,
    exit_price: f64,
    fee_fraction: f64,
    size: f64,
    last_trade_return: f64,
}

fn validate_fee(fee: f64) -> Result<()> {
    if !(0.0..1.0).contains(&fee) {
        return Err(Error::invalid_argument(format!(
            "trading fee must be in [0, 1), got {}",
            fee
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() {
        return Err(Error::invalid_argument(format!(
            "price must be a finite number, got {}",
            price
        )));
    }
    Ok(())
}

impl Position {
    /// Create a new flat position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a position at `price`. Only valid from `Flat`.
    pub fn open(&mut self, price: f64, direction: Direction, fee: f64) -> Result<()> {
        if self.state.is_open() {
            return Err(Error::invalid_state(format!(
                "Cannot open {} position: a {} position is already open",
                direction,
                self.direction().map(|d| d.as_str()).unwrap_or("flat")
            )));
        }
        validate_fee(fee)?;
        validate_price(price)?;

        self.entry_price = price;
        self.fee_fraction = fee;
        self.size = direction.sign() * (1.0 - fee);
        self.state = direction.into();
        Ok(())
    }

    /// Close the open position at `price` and return the round-trip return.
    /// Only valid from `Long`/`Short`.
    pub fn close(&mut self, price: f64, fee: f64) -> Result<f64> {
        if !self.state.is_open() {
            return Err(Error::invalid_state("No open position to close"));
        }
        validate_fee(fee)?;
        validate_price(price)?;

        self.exit_price = price;
        self.size *= 1.0 - fee;

        // Equal prices (or a zero entry) leave only the fee drag. Kept for
        // compatibility with historical results; the formula is suspect.
        let trade_return = if price == self.entry_price || self.entry_price == 0.0 {
            self.size.abs() - 1.0
        } else {
            self.size * (price - self.entry_price) / self.entry_price.abs()
        };

        self.last_trade_return = trade_return;
        self.size = 0.0;
        self.state = PositionState::Flat;
        Ok(trade_return)
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.state.direction()
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Fee charged when the current (or last) position was opened.
    pub fn fee_fraction(&self) -> f64 {
        self.fee_fraction
    }

    /// Signed, fee-adjusted size multiplier. Zero while flat.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Return of the last completed round trip.
    pub fn trade_return(&self) -> f64 {
        self.last_trade_return
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(entry: f64, exit: f64, direction: Direction, fee: f64) -> f64 {
        let mut position = Position::new();
        position.open(entry, direction, fee).unwrap();
        position.close(exit, fee).unwrap()
    }

    #[test]
    fn test_initialisation() {
        let position = Position::new();
        assert_eq!(position.state(), PositionState::Flat);
        assert_eq!(position.entry_price(), 0.0);
        assert_eq!(position.exit_price(), 0.0);
        assert_eq!(position.trade_return(), 0.0);
    }

    #[test]
    fn test_open() {
        let mut position = Position::new();
        position.open(5.0, Direction::Long, 0.0).unwrap();
        assert_eq!(position.entry_price(), 5.0);
        assert_eq!(position.state(), PositionState::Long);
        assert_eq!(position.size(), 1.0);

        let mut position = Position::new();
        position.open(5.0, Direction::Short, 0.25).unwrap();
        assert_eq!(position.state(), PositionState::Short);
        assert!((position.size() + 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_close_longs() {
        assert!((round_trip(5.0, 10.0, Direction::Long, 0.0) - 1.0).abs() < 1e-12);
        assert!((round_trip(5.0, 2.5, Direction::Long, 0.0) + 0.5).abs() < 1e-12);
        assert!(round_trip(5.0, 5.0, Direction::Long, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_close_shorts() {
        assert!((round_trip(5.0, 10.0, Direction::Short, 0.0) + 1.0).abs() < 1e-12);
        assert!((round_trip(5.0, 2.5, Direction::Short, 0.0) - 0.5).abs() < 1e-12);
        assert!(round_trip(5.0, 5.0, Direction::Short, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_trading_fees() {
        assert!((round_trip(5.0, 10.0, Direction::Long, 0.1) - 0.81).abs() < 1e-12);

        // Flat round trip only realizes the entry fee.
        let mut position = Position::new();
        position.open(5.0, Direction::Long, 0.1).unwrap();
        let ret = position.close(5.0, 0.0).unwrap();
        assert!((ret + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_entry_price_is_degenerate() {
        let mut position = Position::new();
        position.open(0.0, Direction::Long, 0.1).unwrap();
        let ret = position.close(3.0, 0.1).unwrap();
        assert!((ret - (0.81 - 1.0)).abs() < 1e-12);
        assert!(ret.is_finite());
    }

    #[test]
    fn test_open_pos_failure() {
        let mut position = Position::new();
        position.open(5.0, Direction::Long, 0.0).unwrap();

        let err = position.open(5.0, Direction::Long, 0.0).unwrap_err();
        assert!(err.is_invalid_state());
        let err = position.open(5.0, Direction::Short, 0.0).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(position.entry_price(), 5.0);
    }

    #[test]
    fn test_close_pos_failure() {
        let mut position = Position::new();
        assert!(position.close(5.0, 0.0).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_fee_failure() {
        let mut position = Position::new();
        assert!(position.open(5.0, Direction::Long, 1.0).unwrap_err().is_invalid_argument());
        assert!(position.open(5.0, Direction::Long, 1.5).unwrap_err().is_invalid_argument());
        assert!(position.open(5.0, Direction::Long, -0.1).unwrap_err().is_invalid_argument());
        assert!(!position.is_open());

        position.open(5.0, Direction::Long, 0.0).unwrap();
        assert!(position.close(5.0, 1.0).unwrap_err().is_invalid_argument());
        assert!(position.close(5.0, 1.5).unwrap_err().is_invalid_argument());
        // A rejected close leaves the position open.
        assert!(position.is_open());
    }

    #[test]
    fn test_open_price_failure() {
        let mut position = Position::new();
        assert!(position.open(f64::NAN, Direction::Long, 0.0).unwrap_err().is_invalid_argument());
        assert!(position
            .open(f64::INFINITY, Direction::Short, 0.0)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("L".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!("short".parse::<Direction>().unwrap(), Direction::Short);
        assert!("noncompatible string".parse::<Direction>().unwrap_err().is_invalid_argument());
    }
}
