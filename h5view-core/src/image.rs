//! 2-D image data and its coordinate axes.

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Ix1};

use crate::util::{index_axis, usize_to_f64};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which end of the row axis is drawn at the top of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RowOrientation {
    /// Array row 0 sits at the top, which shows the largest row coordinate.
    /// Row masks are therefore applied in reverse array order.
    #[default]
    TopIsMax,
    /// Array row `i` is matched to row coordinate `i` directly.
    TopIsFirst,
}

/// Image placement in data coordinates, `(left, right, bottom, top)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Extent {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// Axis-aligned bounds of the image in the active coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Row and column coordinates of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAxes {
    rows: Array1<f64>,
    columns: Array1<f64>,
    calibrated: bool,
}

impl ImageAxes {
    /// Index axes `0..height` and `0..width` with no calibration.
    #[must_use]
    pub fn indices(height: usize, width: usize) -> Self {
        Self {
            rows: index_axis(height),
            columns: index_axis(width),
            calibrated: false,
        }
    }

    /// Resolve coordinate metadata against an image of `(height, width)`.
    ///
    /// `(axis_x, axis_y)` is adopted as `(rows, columns)` when the lengths
    /// line up that way, or swapped when they line up the other way.
    /// Missing, malformed or mismatched metadata falls back to index axes.
    #[must_use]
    pub fn resolve(
        (height, width): (usize, usize),
        axis_x: Option<&ArrayD<f64>>,
        axis_y: Option<&ArrayD<f64>>,
    ) -> Self {
        let (Some(x), Some(y)) = (axis_x.and_then(usable_axis), axis_y.and_then(usable_axis))
        else {
            log::debug!("no usable axis metadata, using index axes");
            return Self::indices(height, width);
        };

        if x.len() == height && y.len() == width {
            Self {
                rows: x,
                columns: y,
                calibrated: true,
            }
        } else if x.len() == width && y.len() == height {
            Self {
                rows: y,
                columns: x,
                calibrated: true,
            }
        } else {
            log::warn!(
                "axis lengths ({}, {}) do not match image shape ({height}, {width}); using index axes",
                x.len(),
                y.len()
            );
            Self::indices(height, width)
        }
    }

    #[must_use]
    pub fn rows(&self) -> ArrayView1<'_, f64> {
        self.rows.view()
    }

    #[must_use]
    pub fn columns(&self) -> ArrayView1<'_, f64> {
        self.columns.view()
    }

    /// True when the axes came from file metadata rather than indices.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Display extent; `None` for index axes.
    #[must_use]
    pub fn extent(&self, orientation: RowOrientation) -> Option<Extent> {
        if !self.calibrated {
            return None;
        }
        let left = *self.columns.first()?;
        let right = *self.columns.last()?;
        let first_row = *self.rows.first()?;
        let last_row = *self.rows.last()?;
        let (bottom, top) = match orientation {
            RowOrientation::TopIsMax => (first_row, last_row),
            RowOrientation::TopIsFirst => (last_row, first_row),
        };
        Some(Extent {
            left,
            right,
            bottom,
            top,
        })
    }

    /// Bounds in the space rectangles are drawn in.
    ///
    /// Calibrated axes span their min/max values; index axes span pixel
    /// edges `[0, len]`.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        if self.calibrated {
            let (x_min, x_max) = min_max(self.columns.view());
            let (y_min, y_max) = min_max(self.rows.view());
            Bounds {
                x_min,
                x_max,
                y_min,
                y_max,
            }
        } else {
            Bounds {
                x_min: 0.0,
                x_max: usize_to_f64(self.columns.len()),
                y_min: 0.0,
                y_max: usize_to_f64(self.rows.len()),
            }
        }
    }
}

/// A 2-D array with its axes. Replaced wholesale on every ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array2<f64>,
    axes: ImageAxes,
}

impl Image {
    #[must_use]
    pub fn new(data: Array2<f64>, axes: ImageAxes) -> Self {
        debug_assert_eq!(axes.rows.len(), data.nrows());
        debug_assert_eq!(axes.columns.len(), data.ncols());
        Self { data, axes }
    }

    #[must_use]
    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    #[must_use]
    pub fn axes(&self) -> &ImageAxes {
        &self.axes
    }

    /// `(height, width)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

fn usable_axis(axis: &ArrayD<f64>) -> Option<Array1<f64>> {
    if axis.ndim() != 1 || axis.is_empty() || axis.iter().any(|v| !v.is_finite()) {
        return None;
    }
    axis.clone().into_dimensionality::<Ix1>().ok()
}

fn min_max(values: ArrayView1<'_, f64>) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn axis(values: &[f64]) -> ArrayD<f64> {
        arr1(values).into_dyn()
    }

    #[test]
    fn test_resolve_natural_orientation() {
        let x = axis(&[10.0, 20.0, 30.0]);
        let y = axis(&[1.0, 2.0, 3.0, 4.0]);
        let axes = ImageAxes::resolve((3, 4), Some(&x), Some(&y));
        assert!(axes.is_calibrated());
        assert_eq!(axes.rows().to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(axes.columns().len(), 4);
    }

    #[test]
    fn test_resolve_swapped_orientation() {
        let x = axis(&[1.0, 2.0, 3.0, 4.0]);
        let y = axis(&[10.0, 20.0, 30.0]);
        let axes = ImageAxes::resolve((3, 4), Some(&x), Some(&y));
        assert!(axes.is_calibrated());
        assert_eq!(axes.rows().to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(axes.columns().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_resolve_mismatch_falls_back() {
        let x = axis(&[0.0; 5]);
        let y = axis(&[0.0; 4]);
        let axes = ImageAxes::resolve((3, 4), Some(&x), Some(&y));
        assert!(!axes.is_calibrated());
        assert_eq!(axes.rows().to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(axes.columns().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert!(axes.extent(RowOrientation::TopIsMax).is_none());
    }

    #[test]
    fn test_resolve_malformed_falls_back() {
        let x = ndarray::Array2::<f64>::zeros((3, 1)).into_dyn();
        let y = axis(&[0.0, 1.0, 2.0, f64::NAN]);
        assert!(!ImageAxes::resolve((3, 4), Some(&x), Some(&y)).is_calibrated());
        let y = axis(&[0.0, 1.0, 2.0, 3.0]);
        assert!(!ImageAxes::resolve((3, 4), None, Some(&y)).is_calibrated());
    }

    #[test]
    fn test_extent_orientation() {
        let x = axis(&[0.0, 1.0, 2.0]);
        let y = axis(&[5.0, 6.0]);
        let axes = ImageAxes::resolve((3, 2), Some(&x), Some(&y));
        let top_max = axes.extent(RowOrientation::TopIsMax).unwrap();
        assert_eq!(
            top_max,
            Extent {
                left: 5.0,
                right: 6.0,
                bottom: 0.0,
                top: 2.0
            }
        );
        let top_first = axes.extent(RowOrientation::TopIsFirst).unwrap();
        assert!((top_first.top - 0.0).abs() < f64::EPSILON);
        assert!((top_first.bottom - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds() {
        let axes = ImageAxes::indices(3, 4);
        let b = axes.bounds();
        assert!((b.x_max - 4.0).abs() < f64::EPSILON);
        assert!((b.y_max - 3.0).abs() < f64::EPSILON);

        let x = axis(&[3.0, 1.0, 2.0]);
        let y = axis(&[-1.0, 1.0]);
        let b = ImageAxes::resolve((3, 2), Some(&x), Some(&y)).bounds();
        assert!((b.y_min - 1.0).abs() < f64::EPSILON);
        assert!((b.y_max - 3.0).abs() < f64::EPSILON);
        assert!((b.x_min + 1.0).abs() < f64::EPSILON);
    }
}
