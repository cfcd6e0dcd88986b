//! Display transforms applied to raw arrays.

use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::range::{ValueRange, MIN_LOG_ARG};

/// Natural-log display transform with a positive floor.
///
/// Every element is clamped to `[max(floor, min), max]` before taking the
/// logarithm, so the output is always finite for finite input. The input is
/// never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogTransform {
    floor: f64,
}

impl Default for LogTransform {
    fn default() -> Self {
        Self { floor: MIN_LOG_ARG }
    }
}

impl LogTransform {
    #[must_use]
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }

    #[must_use]
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Returns the log-transformed copy of `data`.
    pub fn apply<S, D>(&self, data: &ArrayBase<S, D>) -> Array<f64, D>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let Some(range) = ValueRange::of(data) else {
            return data.to_owned();
        };
        let lo = range.min.max(self.floor);
        let hi = range.max.max(lo);
        data.mapv(|v| v.clamp(lo, hi).ln())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_log_of_positive_data() {
        let data = array![[1.0, std::f64::consts::E], [10.0, 100.0]];
        let out = LogTransform::default().apply(&data);
        assert_relative_eq!(out[[0, 0]], 0.0);
        assert_relative_eq!(out[[0, 1]], 1.0);
        assert_relative_eq!(out[[1, 1]], 100f64.ln());
    }

    #[test]
    fn test_non_positive_values_clamped_to_floor() {
        let data = array![[-3.0, 0.0], [0.05, 2.0]];
        let out = LogTransform::default().apply(&data);
        let floor = MIN_LOG_ARG.ln();
        assert_relative_eq!(out[[0, 0]], floor);
        assert_relative_eq!(out[[0, 1]], floor);
        assert_relative_eq!(out[[1, 0]], floor);
        assert_relative_eq!(out[[1, 1]], 2f64.ln());
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_input_untouched() {
        let data = array![[0.0, 4.0], [9.0, 16.0]];
        let copy = data.clone();
        let _ = LogTransform::default().apply(&data);
        assert_eq!(data, copy);
    }

    #[test]
    fn test_all_below_floor() {
        let data = array![-1.0, -2.0];
        let out = LogTransform::new(0.5).apply(&data);
        assert_relative_eq!(out[0], 0.5f64.ln());
        assert_relative_eq!(out[1], 0.5f64.ln());
    }

    #[test]
    fn test_empty_input() {
        let data = Array2::<f64>::zeros((0, 3));
        let out = LogTransform::default().apply(&data);
        assert_eq!(out.dim(), (0, 3));
    }
}
