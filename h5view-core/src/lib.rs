//! h5view-core: Interactive 2-D plot and cut-profile engine.
//!
//! This crate provides the display model behind the h5view data browser:
//! colormap range handling, log display, image/line plot state, rectangle
//! selection, cut profiles and the three-peak fit applied to them.
//!
//! Rendering is delegated through the [`RenderSink`] trait and user-visible
//! messages through [`Notifier`]; the crate itself draws nothing.

pub mod colormap;
pub mod command;
pub mod config;
pub mod cut;
pub mod error;
pub mod fit;
pub mod image;
pub mod plot;
pub mod range;
pub mod region;
pub mod render;
pub mod session;
pub mod transform;
pub mod util;

pub use colormap::Colormap;
pub use command::{CommandId, CommandState, MenuEntry};
pub use config::{CutSource, ViewerConfig};
pub use cut::{compute_cut, CutProfile, CutProfileData, Overlay, PlotContext, ProfileAxis};
pub use error::{Error, Result};
pub use fit::{fit, FitConfig, FitError, FitResult, FitSeed, PeakParameters};
pub use image::{Bounds, Extent, Image, ImageAxes, RowOrientation};
pub use plot::{ImagePlotState, IngestOutcome, PlotMode, PlotState};
pub use range::{ColormapRanges, RangeModel, ValueRange, MIN_LOG_ARG};
pub use region::{DragPoint, Rectangle, RegionSelector, SelectionChange};
pub use render::{
    Curve, CurveKind, ImageFrame, LogNotifier, Notifier, NullSink, RenderSink, Surface,
};
pub use session::PlotSession;
pub use transform::LogTransform;
