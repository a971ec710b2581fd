//! Strategy and engine configuration.
//!
//! Strategy configs are plain serde structs validated eagerly when a strategy
//! is constructed. Engine-wide settings can be overlaid from the environment
//! (`BACKTEST__HEDGE__DELTA`, `BACKTEST__SWEEP_THREADS`, ...).

use serde::{Deserialize, Serialize};

use crate::indicators::MovingAverageKind;
use crate::{Error, Result};

fn validate_fee(fee: f64) -> Result<()> {
    if !(0.0..1.0).contains(&fee) {
        return Err(Error::invalid_argument(format!(
            "trading fee must be in [0, 1), got {}",
            fee
        )));
    }
    Ok(())
}

fn validate_symbol(field: &str, symbol: &str) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_positive(field: &str, value: usize) -> Result<()> {
    if value < 1 {
        return Err(Error::invalid_argument(format!(
            "{} must be a positive integer",
            field
        )));
    }
    Ok(())
}

fn validate_ma_periods(fast_period: usize, slow_period: usize) -> Result<()> {
    validate_positive("fast_period", fast_period)?;
    validate_positive("slow_period", slow_period)?;
    if slow_period < fast_period {
        return Err(Error::invalid_argument(format!(
            "slow MA period ({}) must not be shorter than fast MA period ({})",
            slow_period, fast_period
        )));
    }
    Ok(())
}

fn validate_bandwidth(bandwidth: f64) -> Result<()> {
    if !(bandwidth.is_finite() && bandwidth > 0.0) {
        return Err(Error::invalid_argument(format!(
            "bandwidth must be a positive number, got {}",
            bandwidth
        )));
    }
    Ok(())
}

/// Moving-average crossover parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Column of the asset to trade.
    pub asset_symbol: String,
    /// Period of the faster MA. `1` trades the spot price against the slow MA.
    pub fast_period: usize,
    /// Period of the slower MA.
    pub slow_period: usize,
    pub ma_type: MovingAverageKind,
    /// Fractional fee charged on each open and close.
    pub trading_fee: f64,
    #[serde(default)]
    pub terminal: TerminalPolicy,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            asset_symbol: String::new(),
            fast_period: 1,
            slow_period: 20,
            ma_type: MovingAverageKind::Sma,
            trading_fee: 0.0,
            terminal: TerminalPolicy::Close,
        }
    }
}

impl CrossoverConfig {
    pub fn new(asset_symbol: impl Into<String>, fast_period: usize, slow_period: usize) -> Self {
        Self {
            asset_symbol: asset_symbol.into(),
            fast_period,
            slow_period,
            ..Default::default()
        }
    }

    pub fn with_ma_type(mut self, ma_type: MovingAverageKind) -> Self {
        self.ma_type = ma_type;
        self
    }

    pub fn with_fee(mut self, trading_fee: f64) -> Self {
        self.trading_fee = trading_fee;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalPolicy) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_symbol("asset_symbol", &self.asset_symbol)?;
        validate_ma_periods(self.fast_period, self.slow_period)?;
        validate_fee(self.trading_fee)
    }
}

/// What happens to a position still open after the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPolicy {
    /// Close at the last tick's price so the ledger realizes it.
    #[default]
    Close,
    /// Leave it open; the ledger holds completed round trips only.
    Leave,
}

impl TerminalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalPolicy::Close => "close",
            TerminalPolicy::Leave => "leave",
        }
    }
}

/// What the z-score trend strategy does with an open position when the
/// trend flips against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendFlipPolicy {
    /// Keep the position until its z-score exit fires.
    #[default]
    Hold,
    /// Close the position on the tick the trend turns against it.
    ForceClose,
}

impl TrendFlipPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendFlipPolicy::Hold => "hold",
            TrendFlipPolicy::ForceClose => "force_close",
        }
    }
}

/// Trend-filtered z-score reversion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreTrendConfig {
    pub asset_symbol: String,
    /// Period of the trend MA compared against the slow MA. `1` uses spot.
    pub fast_period: usize,
    /// Period of the MA defining the trend.
    pub slow_period: usize,
    pub ma_type: MovingAverageKind,
    pub trading_fee: f64,
    /// Lookback of the z-score driving entries and exits.
    pub zscore_period: usize,
    /// Z-score magnitude that triggers entries.
    pub bandwidth: f64,
    #[serde(default)]
    pub trend_flip: TrendFlipPolicy,
    #[serde(default)]
    pub terminal: TerminalPolicy,
}

impl Default for ZScoreTrendConfig {
    fn default() -> Self {
        Self {
            asset_symbol: String::new(),
            fast_period: 1,
            slow_period: 100,
            ma_type: MovingAverageKind::Sma,
            trading_fee: 0.0,
            zscore_period: 20,
            bandwidth: 2.0,
            trend_flip: TrendFlipPolicy::Hold,
            terminal: TerminalPolicy::Close,
        }
    }
}

impl ZScoreTrendConfig {
    pub fn new(
        asset_symbol: impl Into<String>,
        slow_period: usize,
        zscore_period: usize,
        bandwidth: f64,
    ) -> Self {
        Self {
            asset_symbol: asset_symbol.into(),
            slow_period,
            zscore_period,
            bandwidth,
            ..Default::default()
        }
    }

    pub fn with_fast_period(mut self, fast_period: usize) -> Self {
        self.fast_period = fast_period;
        self
    }

    pub fn with_ma_type(mut self, ma_type: MovingAverageKind) -> Self {
        self.ma_type = ma_type;
        self
    }

    pub fn with_fee(mut self, trading_fee: f64) -> Self {
        self.trading_fee = trading_fee;
        self
    }

    pub fn with_trend_flip(mut self, trend_flip: TrendFlipPolicy) -> Self {
        self.trend_flip = trend_flip;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalPolicy) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_symbol("asset_symbol", &self.asset_symbol)?;
        validate_ma_periods(self.fast_period, self.slow_period)?;
        validate_fee(self.trading_fee)?;
        validate_positive("zscore_period", self.zscore_period)?;
        validate_bandwidth(self.bandwidth)
    }
}

/// Kalman filter parameters for hedge-ratio estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatioConfig {
    /// Drift allowance; process noise is `delta / (1 - delta) * I`.
    pub delta: f64,
    /// Variance of the scalar observation noise.
    pub observation_variance: f64,
    /// Factor both series are multiplied by before filtering.
    pub scale: f64,
    /// EMA period smoothing the observations fed to the filter.
    pub smoothing_period: Option<usize>,
}

impl Default for HedgeRatioConfig {
    fn default() -> Self {
        Self {
            delta: 1e-5,
            observation_variance: 2.0,
            scale: 1e7,
            smoothing_period: Some(20),
        }
    }
}

impl HedgeRatioConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(Error::invalid_argument(format!(
                "delta must be in (0, 1), got {}",
                self.delta
            )));
        }
        if !(self.observation_variance.is_finite() && self.observation_variance > 0.0) {
            return Err(Error::invalid_argument(format!(
                "observation variance must be positive, got {}",
                self.observation_variance
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::invalid_argument(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if let Some(period) = self.smoothing_period {
            validate_positive("smoothing_period", period)?;
        }
        Ok(())
    }
}

/// Cointegrated-pair spread reversion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsConfig {
    /// Regressor asset `x`.
    pub asset1: String,
    /// Regressand asset `y`.
    pub asset2: String,
    pub zscore_period: usize,
    pub bandwidth: f64,
    pub trading_fee: f64,
    #[serde(default)]
    pub hedge: HedgeRatioConfig,
    #[serde(default)]
    pub terminal: TerminalPolicy,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            asset1: String::new(),
            asset2: String::new(),
            zscore_period: 20,
            bandwidth: 2.0,
            trading_fee: 0.0,
            hedge: HedgeRatioConfig::default(),
            terminal: TerminalPolicy::Close,
        }
    }
}

impl PairsConfig {
    pub fn new(asset1: impl Into<String>, asset2: impl Into<String>) -> Self {
        Self {
            asset1: asset1.into(),
            asset2: asset2.into(),
            ..Default::default()
        }
    }

    pub fn with_zscore(mut self, zscore_period: usize, bandwidth: f64) -> Self {
        self.zscore_period = zscore_period;
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_fee(mut self, trading_fee: f64) -> Self {
        self.trading_fee = trading_fee;
        self
    }

    pub fn with_hedge(mut self, hedge: HedgeRatioConfig) -> Self {
        self.hedge = hedge;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalPolicy) -> Self {
        self.terminal = terminal;
        self
    }

    /// Spread label, `y/x`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.asset2, self.asset1)
    }

    pub fn validate(&self) -> Result<()> {
        validate_symbol("asset1", &self.asset1)?;
        validate_symbol("asset2", &self.asset2)?;
        if self.asset1 == self.asset2 {
            return Err(Error::invalid_argument(format!(
                "pair must reference two different assets, got {} twice",
                self.asset1
            )));
        }
        validate_positive("zscore_period", self.zscore_period)?;
        validate_bandwidth(self.bandwidth)?;
        validate_fee(self.trading_fee)?;
        self.hedge.validate()
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Default filter parameters for pairs strategies.
    pub hedge: HedgeRatioConfig,
    /// Worker threads for parameter sweeps. `None` uses the global pool.
    pub sweep_threads: Option<usize>,
}

impl EngineSettings {
    /// Load settings from defaults overlaid with `BACKTEST__*` environment
    /// variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&EngineSettings::default())?;
        let settings: EngineSettings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("BACKTEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.hedge.validate()?;
        if let Some(threads) = self.sweep_threads {
            validate_positive("sweep_threads", threads)?;
        }
        Ok(())
    }
}
