//! In-memory historical price store.
//!
//! A `PriceFrame` holds one close-price column per asset symbol, aligned on a
//! shared timestamp index. Loading (web APIs, files) happens elsewhere; the
//! frame is the hand-off point into the engine.

use chrono::{DateTime, Duration, Utc};
use signal_core::{Error, PriceSeries, Result};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Aligned, immutable price columns keyed by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFrame {
    timestamps: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, Arc<[f64]>>,
}

impl PriceFrame {
    /// Build a frame from a timestamp index and named columns.
    ///
    /// Every column must have one value per timestamp and timestamps must be
    /// strictly increasing.
    pub fn from_columns<I, S>(timestamps: Vec<DateTime<Utc>>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        if let Some(pair) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::invalid_argument(format!(
                "timestamps must be strictly increasing, {} follows {}",
                pair[1], pair[0]
            )));
        }

        let mut frame: BTreeMap<String, Arc<[f64]>> = BTreeMap::new();
        for (symbol, values) in columns {
            let symbol = symbol.into();
            if values.len() != timestamps.len() {
                return Err(Error::invalid_argument(format!(
                    "column {} has {} values for {} timestamps",
                    symbol,
                    values.len(),
                    timestamps.len()
                )));
            }
            if frame.insert(symbol.clone(), Arc::from(values)).is_some() {
                return Err(Error::invalid_argument(format!(
                    "duplicate column {}",
                    symbol
                )));
            }
        }

        debug!(
            ticks = timestamps.len(),
            columns = frame.len(),
            "Price frame loaded"
        );

        Ok(Self {
            timestamps,
            columns: frame,
        })
    }

    /// Build a frame with evenly spaced timestamps starting at `start`.
    pub fn with_interval<I, S>(start: DateTime<Utc>, interval: Duration, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let columns: Vec<(String, Vec<f64>)> = columns
            .into_iter()
            .map(|(symbol, values)| (symbol.into(), values))
            .collect();
        let len = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        let timestamps = (0..len)
            .map(|t| start + interval * t as i32)
            .collect();
        Self::from_columns(timestamps, columns)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Timestamp of tick `t`.
    pub fn timestamp(&self, t: usize) -> Result<DateTime<Utc>> {
        self.timestamps.get(t).copied().ok_or_else(|| {
            Error::invalid_state(format!(
                "tick {} is outside the frame ({} ticks)",
                t,
                self.len()
            ))
        })
    }

    /// Price series for `symbol`. Shares the column's storage.
    pub fn series(&self, symbol: &str) -> Result<PriceSeries> {
        self.columns
            .get(symbol)
            .map(|values| PriceSeries::new(symbol, Arc::clone(values)))
            .ok_or_else(|| {
                Error::invalid_argument(format!("symbol {} is not in the price frame", symbol))
            })
    }

    /// Sub-frame covering `range` of ticks.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::invalid_argument(format!(
                "slice {}..{} is outside the frame ({} ticks)",
                range.start,
                range.end,
                self.len()
            )));
        }

        Ok(Self {
            timestamps: self.timestamps[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(symbol, values)| (symbol.clone(), Arc::from(&values[range.clone()])))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap()
    }

    fn frame() -> PriceFrame {
        PriceFrame::with_interval(
            start(),
            Duration::hours(1),
            vec![
                ("XRP", vec![1.0, 2.0, 3.0, 4.0]),
                ("XLM", vec![0.5, 0.6, 0.7, 0.8]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_series_lookup() {
        let frame = frame();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.symbols().collect::<Vec<_>>(), vec!["XLM", "XRP"]);

        let series = frame.series("XRP").unwrap();
        assert_eq!(series.symbol(), "XRP");
        assert_eq!(series.values(), &[1.0, 2.0, 3.0, 4.0]);

        let err = frame.series("BTC").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_timestamps() {
        let frame = frame();
        assert_eq!(frame.timestamp(0).unwrap(), start());
        assert_eq!(frame.timestamp(3).unwrap(), start() + Duration::hours(3));
        assert!(frame.timestamp(4).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let err = PriceFrame::from_columns(
            vec![start(), start() + Duration::hours(1)],
            vec![("XRP", vec![1.0, 2.0]), ("XLM", vec![1.0])],
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_rejects_unordered_timestamps() {
        let err = PriceFrame::from_columns(
            vec![start(), start()],
            vec![("XRP", vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_slice() {
        let frame = frame();
        let sub = frame.slice(1..3).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.timestamp(0).unwrap(), start() + Duration::hours(1));
        assert_eq!(sub.series("XLM").unwrap().values(), &[0.6, 0.7]);

        assert!(frame.slice(2..5).is_err());
    }
}
