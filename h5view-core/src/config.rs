//! Viewer configuration.

use crate::colormap::Colormap;
use crate::fit::FitConfig;
use crate::image::RowOrientation;
use crate::range::MIN_LOG_ARG;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default minimum drag span, in screen pixels, for a rectangle commit.
pub const DEFAULT_MIN_SPAN_PX: f64 = 5.0;

/// Which array a cut profile is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CutSource {
    /// The array as ingested.
    #[default]
    Raw,
    /// The array as displayed (log-transformed while log display is on).
    Displayed,
}

/// Configuration for the plotting session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewerConfig {
    /// Minimum rectangle span in pixels, checked in each dimension.
    pub min_span_px: f64,
    /// Floor applied before taking logarithms.
    pub log_floor: f64,
    /// How array rows map onto the row axis.
    pub row_orientation: RowOrientation,
    /// Array used to compute cut profiles.
    pub cut_source: CutSource,
    /// Colormap restored by a parameter reset.
    pub colormap: Colormap,
    /// Peak fit solver settings.
    pub fit: FitConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_span_px: DEFAULT_MIN_SPAN_PX,
            log_floor: MIN_LOG_ARG,
            row_orientation: RowOrientation::default(),
            cut_source: CutSource::default(),
            colormap: Colormap::default(),
            fit: FitConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum rectangle span in pixels.
    #[must_use]
    pub fn with_min_span_px(mut self, span: f64) -> Self {
        self.min_span_px = span;
        self
    }

    /// Sets the log floor.
    #[must_use]
    pub fn with_log_floor(mut self, floor: f64) -> Self {
        self.log_floor = floor;
        self
    }

    /// Sets the row orientation used for coordinate-mode cuts.
    #[must_use]
    pub fn with_row_orientation(mut self, orientation: RowOrientation) -> Self {
        self.row_orientation = orientation;
        self
    }

    /// Sets the cut source array.
    #[must_use]
    pub fn with_cut_source(mut self, source: CutSource) -> Self {
        self.cut_source = source;
        self
    }

    /// Sets the default colormap.
    #[must_use]
    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = colormap;
        self
    }

    /// Sets the fit configuration.
    #[must_use]
    pub fn with_fit(mut self, fit: FitConfig) -> Self {
        self.fit = fit;
        self
    }
}
