//! Plot state for a single plotting surface.
//!
//! One surface shows either a line plot (1-D datasets) or an image (2-D
//! datasets). [`ImagePlotState`] owns whatever is currently shown together
//! with the display parameters, and re-derives the displayed array from the
//! stored raw array whenever a parameter changes.

use ndarray::{Array1, Array2, ArrayD, ArrayView2, Ix1, Ix2};

use crate::colormap::Colormap;
use crate::config::ViewerConfig;
use crate::image::{Extent, Image, ImageAxes, RowOrientation};
use crate::range::{ColormapRanges, RangeModel, ValueRange};
use crate::transform::LogTransform;
use crate::util::index_axis;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discriminant of [`PlotState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlotMode {
    Empty,
    OneD,
    TwoD,
}

/// A 1-D dataset shown as a line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePlot {
    pub abscissa: Array1<f64>,
    pub ordinate: Array1<f64>,
}

/// A 2-D dataset shown as an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlot {
    image: Image,
    displayed: Array2<f64>,
}

impl ImagePlot {
    /// Raw image as ingested.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Array handed to the renderer.
    #[must_use]
    pub fn displayed(&self) -> ArrayView2<'_, f64> {
        self.displayed.view()
    }
}

/// What the surface currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlotState {
    #[default]
    Empty,
    OneD(LinePlot),
    TwoD(ImagePlot),
}

impl PlotState {
    #[must_use]
    pub fn mode(&self) -> PlotMode {
        match self {
            PlotState::Empty => PlotMode::Empty,
            PlotState::OneD(_) => PlotMode::OneD,
            PlotState::TwoD(_) => PlotMode::TwoD,
        }
    }
}

/// Display parameters shared by every image shown on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayParameters {
    pub value_range: Option<ValueRange>,
    pub log_enabled: bool,
    pub colormap: Colormap,
}

/// Result of a successful ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub mode: PlotMode,
    /// Coordinate axes were taken from metadata.
    pub calibrated: bool,
    /// The image bounds differ from the previously shown image.
    pub bounds_changed: bool,
}

/// Owner of the displayed data and its display parameters.
#[derive(Debug, Clone)]
pub struct ImagePlotState {
    state: PlotState,
    ranges: RangeModel,
    log: LogTransform,
    colormap: Colormap,
    default_colormap: Colormap,
    orientation: RowOrientation,
}

impl Default for ImagePlotState {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl ImagePlotState {
    #[must_use]
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: PlotState::Empty,
            ranges: RangeModel::new(config.log_floor),
            log: LogTransform::new(config.log_floor),
            colormap: config.colormap,
            default_colormap: config.colormap,
            orientation: config.row_orientation,
        }
    }

    #[must_use]
    pub fn state(&self) -> &PlotState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> PlotMode {
        self.state.mode()
    }

    /// The current image, if a 2-D dataset is shown.
    #[must_use]
    pub fn image_plot(&self) -> Option<&ImagePlot> {
        match &self.state {
            PlotState::TwoD(plot) => Some(plot),
            _ => None,
        }
    }

    #[must_use]
    pub fn orientation(&self) -> RowOrientation {
        self.orientation
    }

    #[must_use]
    pub fn log_enabled(&self) -> bool {
        self.ranges.log_enabled()
    }

    #[must_use]
    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    #[must_use]
    pub fn display_parameters(&self) -> DisplayParameters {
        DisplayParameters {
            value_range: self.ranges.active(),
            log_enabled: self.ranges.log_enabled(),
            colormap: self.colormap,
        }
    }

    /// Extent of the current image, `None` for index axes or no image.
    #[must_use]
    pub fn extent(&self) -> Option<Extent> {
        self.image_plot()
            .and_then(|plot| plot.image.axes().extent(self.orientation))
    }

    /// Take a new dataset for display.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDimensionality`] for arrays that are not
    /// 1-D or 2-D; the previous state is kept.
    pub fn ingest(
        &mut self,
        raw: ArrayD<f64>,
        axis_x: Option<&ArrayD<f64>>,
        axis_y: Option<&ArrayD<f64>>,
    ) -> Result<IngestOutcome> {
        match raw.ndim() {
            1 => {
                let ordinate = raw
                    .into_dimensionality::<Ix1>()
                    .map_err(|_| Error::UnsupportedDimensionality(1))?;
                let axis = axis_x
                    .filter(|axis| axis.len() == ordinate.len())
                    .and_then(|axis| axis.clone().into_dimensionality::<Ix1>().ok());
                let calibrated = axis.is_some();
                let abscissa = axis.unwrap_or_else(|| index_axis(ordinate.len()));
                log::debug!("showing 1-D dataset of {} points", ordinate.len());
                self.state = PlotState::OneD(LinePlot { abscissa, ordinate });
                Ok(IngestOutcome {
                    mode: PlotMode::OneD,
                    calibrated,
                    bounds_changed: true,
                })
            }
            2 => {
                let data = raw
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| Error::UnsupportedDimensionality(2))?;
                let axes = ImageAxes::resolve(data.dim(), axis_x, axis_y);
                let calibrated = axes.is_calibrated();
                let bounds_changed = self
                    .image_plot()
                    .map_or(true, |prev| prev.image.axes().bounds() != axes.bounds());
                let image = Image::new(data, axes);
                let displayed = self.derive_display(&image);
                log::debug!(
                    "showing 2-D dataset {:?} (calibrated: {calibrated})",
                    image.shape()
                );
                self.state = PlotState::TwoD(ImagePlot { image, displayed });
                Ok(IngestOutcome {
                    mode: PlotMode::TwoD,
                    calibrated,
                    bounds_changed,
                })
            }
            n => {
                log::warn!("ignoring {n}-dimensional dataset");
                Err(Error::UnsupportedDimensionality(n))
            }
        }
    }

    /// Turn log display on or off.
    ///
    /// Returns `false` when the requested state is already active.
    pub fn apply_log(&mut self, enable: bool) -> bool {
        if self.ranges.log_enabled() == enable {
            return false;
        }
        self.ranges.switch_regime(enable);
        self.refresh_display();
        true
    }

    /// Restore range, log flag and colormap to their defaults.
    pub fn reset_display_parameters(&mut self) {
        self.ranges.reset();
        self.colormap = self.default_colormap;
        self.refresh_display();
    }

    /// Set the colormap value range in the current regime.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] for unusable bounds.
    pub fn set_value_range(&mut self, vmin: f64, vmax: f64) -> Result<()> {
        self.ranges.set_range(vmin, vmax)
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    /// Ranges for a colormap editor, computed on the displayed array.
    #[must_use]
    pub fn colormap_ranges(&self) -> Option<ColormapRanges> {
        self.image_plot()
            .and_then(|plot| self.ranges.ranges_for_colormap(&plot.displayed))
    }

    fn derive_display(&self, image: &Image) -> Array2<f64> {
        if self.ranges.log_enabled() {
            self.log.apply(&image.data())
        } else {
            image.data().to_owned()
        }
    }

    fn refresh_display(&mut self) {
        let displayed = match &self.state {
            PlotState::TwoD(plot) => self.derive_display(&plot.image),
            PlotState::Empty | PlotState::OneD(_) => return,
        };
        if let PlotState::TwoD(plot) = &mut self.state {
            plot.displayed = displayed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, array, Array3};

    #[test]
    fn test_starts_empty() {
        let plot = ImagePlotState::default();
        assert_eq!(plot.mode(), PlotMode::Empty);
        assert!(plot.colormap_ranges().is_none());
    }

    #[test]
    fn test_ingest_1d_with_and_without_axis() {
        let mut plot = ImagePlotState::default();
        let y = arr1(&[3.0, 4.0, 5.0]).into_dyn();
        let x = arr1(&[0.5, 1.0, 1.5]).into_dyn();
        let outcome = plot.ingest(y.clone(), Some(&x), None).unwrap();
        assert_eq!(outcome.mode, PlotMode::OneD);
        assert!(outcome.calibrated);
        let PlotState::OneD(line) = plot.state() else {
            panic!("expected line plot");
        };
        assert_eq!(line.abscissa.to_vec(), vec![0.5, 1.0, 1.5]);

        let bad = arr1(&[1.0, 2.0]).into_dyn();
        plot.ingest(y, Some(&bad), None).unwrap();
        let PlotState::OneD(line) = plot.state() else {
            panic!("expected line plot");
        };
        assert_eq!(line.abscissa.to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ingest_3d_keeps_previous_state() {
        let mut plot = ImagePlotState::default();
        plot.ingest(array![[1.0, 2.0]].into_dyn(), None, None).unwrap();
        let err = plot
            .ingest(Array3::<f64>::zeros((2, 2, 2)).into_dyn(), None, None)
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedDimensionality(3));
        assert_eq!(plot.mode(), PlotMode::TwoD);
    }

    #[test]
    fn test_log_round_trip_restores_raw() {
        let data = array![[0.0, 1.0, 2.0], [3.0, 40.0, 500.0]];
        let mut plot = ImagePlotState::default();
        plot.ingest(data.clone().into_dyn(), None, None).unwrap();

        assert!(plot.apply_log(true));
        let shown = plot.image_plot().unwrap().displayed().to_owned();
        assert_ne!(shown, data);

        assert!(plot.apply_log(false));
        assert_eq!(plot.image_plot().unwrap().displayed(), data);
        assert_eq!(plot.image_plot().unwrap().image().data(), data);
    }

    #[test]
    fn test_apply_log_twice_is_idempotent() {
        let data = array![[1.0, 10.0], [100.0, 1000.0]];
        let mut plot = ImagePlotState::default();
        plot.ingest(data.into_dyn(), None, None).unwrap();
        assert!(plot.apply_log(true));
        let once = plot.image_plot().unwrap().displayed().to_owned();
        assert!(!plot.apply_log(true));
        assert_eq!(plot.image_plot().unwrap().displayed(), once);
    }

    #[test]
    fn test_new_ingest_honours_log_flag() {
        let mut plot = ImagePlotState::default();
        plot.apply_log(true);
        plot.ingest(array![[1.0, std::f64::consts::E]].into_dyn(), None, None)
            .unwrap();
        let shown = plot.image_plot().unwrap().displayed();
        assert!((shown[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_display_parameters() {
        let mut plot = ImagePlotState::default();
        plot.ingest(array![[1.0, 100.0]].into_dyn(), None, None).unwrap();
        plot.set_value_range(1.0, 50.0).unwrap();
        plot.apply_log(true);
        plot.set_colormap(Colormap::Hot);

        plot.reset_display_parameters();
        let params = plot.display_parameters();
        assert!(params.value_range.is_none());
        assert!(!params.log_enabled);
        assert_eq!(params.colormap, Colormap::Viridis);
        assert_eq!(
            plot.image_plot().unwrap().displayed(),
            array![[1.0, 100.0]]
        );
    }

    #[test]
    fn test_axis_fallback_on_mismatch() {
        let mut plot = ImagePlotState::default();
        let x = arr1(&[0.0, 1.0, 2.0, 3.0, 4.0]).into_dyn();
        let y = arr1(&[0.0, 1.0, 2.0, 3.0]).into_dyn();
        let outcome = plot
            .ingest(Array2::<f64>::ones((3, 4)).into_dyn(), Some(&x), Some(&y))
            .unwrap();
        assert!(!outcome.calibrated);
        let axes = plot.image_plot().unwrap().image().axes();
        assert_eq!(axes.rows().to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(axes.columns().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert!(plot.extent().is_none());
    }

    #[test]
    fn test_bounds_changed_tracking() {
        let mut plot = ImagePlotState::default();
        let first = plot
            .ingest(Array2::<f64>::ones((3, 4)).into_dyn(), None, None)
            .unwrap();
        assert!(first.bounds_changed);
        let same = plot
            .ingest(Array2::<f64>::zeros((3, 4)).into_dyn(), None, None)
            .unwrap();
        assert!(!same.bounds_changed);
        let other = plot
            .ingest(Array2::<f64>::zeros((5, 4)).into_dyn(), None, None)
            .unwrap();
        assert!(other.bounds_changed);
    }

    #[test]
    fn test_colormap_ranges_follow_display() {
        let mut plot = ImagePlotState::default();
        plot.ingest(array![[1.0, 100.0]].into_dyn(), None, None).unwrap();
        let linear = plot.colormap_ranges().unwrap();
        assert!((linear.whole.max - 100.0).abs() < 1e-12);
        plot.apply_log(true);
        let log = plot.colormap_ranges().unwrap();
        assert!((log.whole.max - 100f64.ln()).abs() < 1e-12);
    }
}
