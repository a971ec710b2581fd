//! Core domain types for signal backtesting.

pub mod position;
pub mod series;

pub use position::*;
pub use series::*;
