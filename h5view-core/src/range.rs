//! Colormap value range tracking across linear and log display.
//!
//! The range chosen by the user is kept in whichever regime it was set in,
//! and its equivalent in the other regime is cached so that toggling the log
//! display back and forth returns exactly the bounds the user picked.

use ndarray::{ArrayBase, Data, Dimension};

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest value passed to `ln` when converting a linear range.
pub const MIN_LOG_ARG: f64 = 0.1;

/// Closed value interval used for colormap normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the interval.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map `value` into `[0, 1]` relative to this interval.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span <= 0.0 || !span.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Min/max over all finite-comparable elements, `None` for empty input.
    pub fn of<S, D>(data: &ArrayBase<S, D>) -> Option<Self>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let mut iter = data.iter().copied().filter(|v| !v.is_nan());
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }
}

/// Ranges offered to a colormap editor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColormapRanges {
    /// Currently configured range, or `whole` when none is configured.
    pub initial: ValueRange,
    /// Full extent of the displayed data.
    pub whole: ValueRange,
}

/// Active display range plus its cached linear/log equivalents.
#[derive(Debug, Clone)]
pub struct RangeModel {
    active: Option<ValueRange>,
    absolute: Option<ValueRange>,
    log: Option<ValueRange>,
    log_enabled: bool,
    log_floor: f64,
}

impl Default for RangeModel {
    fn default() -> Self {
        Self::new(MIN_LOG_ARG)
    }
}

impl RangeModel {
    /// Creates a model whose linear-to-log conversion clamps at `log_floor`.
    #[must_use]
    pub fn new(log_floor: f64) -> Self {
        Self {
            active: None,
            absolute: None,
            log: None,
            log_enabled: false,
            log_floor,
        }
    }

    /// Currently configured range, if any.
    #[must_use]
    pub fn active(&self) -> Option<ValueRange> {
        self.active
    }

    #[must_use]
    pub fn log_enabled(&self) -> bool {
        self.log_enabled
    }

    /// Ranges for a colormap editor given the data currently displayed.
    pub fn ranges_for_colormap<S, D>(&self, data: &ArrayBase<S, D>) -> Option<ColormapRanges>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let whole = ValueRange::of(data)?;
        Some(ColormapRanges {
            initial: self.active.unwrap_or(whole),
            whole,
        })
    }

    /// Store `(vmin, vmax)` as the active range in the current regime.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if a bound is not finite or
    /// `vmin > vmax`.
    pub fn set_range(&mut self, vmin: f64, vmax: f64) -> Result<()> {
        if !vmin.is_finite() || !vmax.is_finite() || vmin > vmax {
            return Err(Error::InvalidRange {
                min: vmin,
                max: vmax,
            });
        }
        let range = ValueRange::new(vmin, vmax);
        self.active = Some(range);
        if self.log_enabled {
            self.log = Some(range);
            self.absolute = Some(ValueRange::new(vmin.exp(), vmax.exp()));
        } else {
            self.absolute = Some(range);
            self.log = Some(ValueRange::new(vmin.max(self.log_floor).ln(), vmax.ln()));
        }
        Ok(())
    }

    /// Switch to the log (`true`) or linear regime.
    ///
    /// A configured range is replaced by its cached equivalent for the
    /// target regime. Without a configured range only the mode changes.
    pub fn switch_regime(&mut self, to_log: bool) {
        self.log_enabled = to_log;
        if self.active.is_some() {
            self.active = if to_log { self.log } else { self.absolute };
        }
    }

    /// Forget the configured range and return to linear display.
    pub fn reset(&mut self) {
        self.active = None;
        self.absolute = None;
        self.log = None;
        self.log_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_colormap_ranges_default_to_whole() {
        let model = RangeModel::default();
        let data = array![[1.0, 5.0], [-2.0, 3.0]];
        let ranges = model.ranges_for_colormap(&data).unwrap();
        assert_eq!(ranges.whole, ValueRange::new(-2.0, 5.0));
        assert_eq!(ranges.initial, ranges.whole);
    }

    #[test]
    fn test_colormap_ranges_use_configured() {
        let mut model = RangeModel::default();
        model.set_range(0.0, 2.0).unwrap();
        let data = array![[1.0, 5.0]];
        let ranges = model.ranges_for_colormap(&data).unwrap();
        assert_eq!(ranges.initial, ValueRange::new(0.0, 2.0));
        assert_eq!(ranges.whole, ValueRange::new(1.0, 5.0));
    }

    #[test]
    fn test_regime_round_trip() {
        let mut model = RangeModel::default();
        model.set_range(1.0, 10.0).unwrap();

        model.switch_regime(true);
        let log = model.active().unwrap();
        assert_relative_eq!(log.min, 0.0);
        assert_relative_eq!(log.max, 10f64.ln());

        model.switch_regime(false);
        let back = model.active().unwrap();
        assert_relative_eq!(back.min, 1.0);
        assert_relative_eq!(back.max, 10.0);
    }

    #[test]
    fn test_log_floor_clamps_lower_bound() {
        let mut model = RangeModel::default();
        model.set_range(-5.0, 100.0).unwrap();
        model.switch_regime(true);
        let log = model.active().unwrap();
        assert_relative_eq!(log.min, MIN_LOG_ARG.ln());
        assert_relative_eq!(log.max, 100f64.ln());
    }

    #[test]
    fn test_range_set_in_log_mode() {
        let mut model = RangeModel::default();
        model.switch_regime(true);
        assert!(model.active().is_none());

        model.set_range(0.0, 2.0).unwrap();
        model.switch_regime(false);
        let abs = model.active().unwrap();
        assert_relative_eq!(abs.min, 1.0);
        assert_relative_eq!(abs.max, 2f64.exp());
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut model = RangeModel::default();
        assert!(matches!(
            model.set_range(3.0, 1.0),
            Err(Error::InvalidRange { .. })
        ));
        assert!(model.set_range(f64::NAN, 1.0).is_err());
        assert!(model.active().is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut model = RangeModel::default();
        model.set_range(1.0, 2.0).unwrap();
        model.switch_regime(true);
        model.reset();
        assert!(model.active().is_none());
        assert!(!model.log_enabled());
        model.switch_regime(true);
        assert!(model.active().is_none());
    }

    #[test]
    fn test_normalize() {
        let range = ValueRange::new(0.0, 4.0);
        assert_relative_eq!(range.normalize(1.0), 0.25);
        assert_relative_eq!(range.normalize(-1.0), 0.0);
        assert_relative_eq!(range.normalize(9.0), 1.0);
        assert_relative_eq!(ValueRange::new(2.0, 2.0).normalize(2.0), 0.0);
    }
}
