//! Numeric conversion helpers.
//!
//! These functions handle conversions between numeric types with explicit
//! handling of precision loss and bounds checking.

use ndarray::Array1;

/// Convert usize to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Truncate a coordinate toward zero and clamp it into `[0, len]`.
///
/// Used to turn pixel-space rectangle bounds into half-open slice bounds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn f64_to_slice_bound(value: f64, len: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let truncated = value.trunc();
    if truncated >= usize_to_f64(len) {
        len
    } else {
        truncated as usize
    }
}

/// Index sequence `0, 1, .., len - 1` as floats.
#[must_use]
pub fn index_axis(len: usize) -> Array1<f64> {
    Array1::from_iter((0..len).map(usize_to_f64))
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / usize_to_f64(n - 1);
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * usize_to_f64(i)
                    }
                })
                .collect()
        }
    }
}
