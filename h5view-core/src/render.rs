//! Outbound interfaces to the rendering and notification layers.

use ndarray::Array2;

use crate::colormap::Colormap;
use crate::image::Extent;
use crate::range::ValueRange;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A plotting surface that can be asked to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Surface {
    /// The main plot: a line for 1-D data or an image for 2-D data.
    Main,
    /// The cut view.
    Cut,
}

/// Role of a curve on its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CurveKind {
    /// A 1-D dataset on the main surface.
    Dataset,
    /// The live cut profile.
    Live,
    /// A frozen cut profile.
    Frozen,
    /// A fitted model curve.
    Fit,
}

/// One polyline handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Curve {
    pub kind: CurveKind,
    pub abscissa: Vec<f64>,
    pub ordinate: Vec<f64>,
}

/// Image data plus everything needed to paint it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub data: Array2<f64>,
    /// `None` when the image uses index axes.
    pub extent: Option<Extent>,
    pub colormap: Colormap,
    /// Normalization range; values outside are clamped.
    pub value_range: ValueRange,
}

impl ImageFrame {
    /// RGBA bytes, row-major, four bytes per element.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(self.data.len() * 4);
        for &v in &self.data {
            pixels.extend_from_slice(&self.colormap.apply(self.value_range.normalize(v)));
        }
        pixels
    }

    /// `(height, width)`.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Receiver of drawing commands.
pub trait RenderSink {
    /// Replace the image on the main surface.
    fn set_image(&mut self, frame: ImageFrame);

    /// Replace every curve on `surface`.
    fn set_lines(&mut self, surface: Surface, curves: &[Curve]);

    /// Ask for `surface` to be repainted.
    fn request_redraw(&mut self, surface: Surface);
}

/// Receiver of user-visible messages.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn set_image(&mut self, _frame: ImageFrame) {}

    fn set_lines(&mut self, _surface: Surface, _curves: &[Curve]) {}

    fn request_redraw(&mut self, _surface: Surface) {}
}

/// Notifier that forwards messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, message: &str) {
        log::error!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_to_rgba_normalizes_through_range() {
        let frame = ImageFrame {
            data: array![[0.0, 5.0], [10.0, 20.0]],
            extent: None,
            colormap: Colormap::Grayscale,
            value_range: ValueRange::new(0.0, 10.0),
        };
        let rgba = frame.to_rgba();
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(&rgba[12..16], &[255, 255, 255, 255]);
        assert_eq!(frame.size(), (2, 2));
    }
}
