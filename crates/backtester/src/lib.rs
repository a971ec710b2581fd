//! Backtester
//!
//! Historical simulation of signal-driven trading strategies.
//!
//! # Features
//!
//! - **Strategy Trait**: per-tick decision interface shared by every strategy
//! - **Price Frame**: aligned in-memory price columns keyed by symbol
//! - **Backtest Runner**: drives a strategy and summarises its return stream
//! - **Built-in Strategies**: MA crossover, trend-filtered z-score and pairs spread
//! - **Parameter Sweeps**: independent runs fanned out over rayon
//!
//! # Example
//!
//! ```ignore
//! use backtester::{BacktestRunner, CrossoverStrategy, PriceFrame};
//! use signal_core::CrossoverConfig;
//!
//! let frame = PriceFrame::from_columns(timestamps, vec![("XRP", closes)])?;
//! let mut strategy = CrossoverStrategy::new(&frame, CrossoverConfig::new("XRP", 10, 50))?;
//!
//! let result = BacktestRunner::new().run(&mut strategy)?;
//! println!("Return: {:.2}%", result.total_return * 100.0);
//! ```

pub mod data_store;
pub mod runner;
pub mod strategies;
pub mod strategy;
pub mod sweep;

// Re-exports
pub use data_store::PriceFrame;
pub use runner::{BacktestResult, BacktestRunner};
pub use strategies::{CrossoverStrategy, PairsSpreadStrategy, ZScoreTrendStrategy};
pub use strategy::{ReturnLedger, ReturnSink, Strategy, TradeAction, TradeLog, TradeRecord};
pub use sweep::{crossover_configs, crossover_grid, ParameterSweep};
