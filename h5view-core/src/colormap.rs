//! Colormap definitions for image display.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Available colormaps for 2-D plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Colormap {
    /// Viridis (approximate) - blue to teal to green to yellow.
    #[default]
    Viridis,
    /// Hot (Thermal) - red to yellow to white.
    Hot,
    /// Grayscale - black to white.
    Grayscale,
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colormap::Viridis => write!(f, "Viridis"),
            Colormap::Hot => write!(f, "Hot (Thermal)"),
            Colormap::Grayscale => write!(f, "Grayscale"),
        }
    }
}

impl Colormap {
    /// Apply the colormap to a normalized value [0, 1] and return RGBA bytes.
    ///
    /// Values outside the unit interval are clamped; NaN maps to transparent.
    #[must_use]
    pub fn apply(self, val: f64) -> [u8; 4] {
        if val.is_nan() {
            return [0, 0, 0, 0];
        }
        let val = val.clamp(0.0, 1.0);
        match self {
            Colormap::Grayscale => {
                let v = f64_to_u8(val * 255.0);
                [v, v, v, 255]
            }
            Colormap::Hot => {
                if val < 0.5 {
                    [255, f64_to_u8(val * 2.0 * 255.0), 0, 255]
                } else {
                    [255, 255, f64_to_u8((val - 0.5) * 2.0 * 255.0), 255]
                }
            }
            Colormap::Viridis => {
                let r = f64_to_u8(255.0 * val.powi(2));
                let g = f64_to_u8(255.0 * val);
                let b = f64_to_u8(255.0 * (1.0 - val));
                [r, g, b, 255]
            }
        }
    }
}

/// Convert f64 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_u8(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Colormap::Grayscale.apply(0.0), [0, 0, 0, 255]);
        assert_eq!(Colormap::Grayscale.apply(1.0), [255, 255, 255, 255]);
        assert_eq!(Colormap::Hot.apply(1.0), [255, 255, 255, 255]);
        assert_eq!(Colormap::Viridis.apply(0.0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_clamps_and_nan() {
        assert_eq!(Colormap::Grayscale.apply(2.0), [255, 255, 255, 255]);
        assert_eq!(Colormap::Grayscale.apply(-1.0), [0, 0, 0, 255]);
        assert_eq!(Colormap::Hot.apply(f64::NAN)[3], 0);
    }
}
