//! Error types for h5view-core.

use thiserror::Error;

use crate::command::CommandId;
use crate::fit::FitError;

/// Result type alias for h5view operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for plotting, cutting and fitting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Only 1-D and 2-D arrays can be plotted.
    #[error("cannot plot a {0}-dimensional array")]
    UnsupportedDimensionality(usize),

    /// Colormap value range is not usable.
    #[error("invalid value range: ({min}, {max})")]
    InvalidRange { min: f64, max: f64 },

    /// No 2-D image is currently displayed.
    #[error("no 2-D image is displayed")]
    NoImage,

    /// No rectangle has been selected yet.
    #[error("no region has been selected")]
    NoRegion,

    /// The selected rectangle does not cover any array element.
    #[error("selection covers no data (rows: {rows}, columns: {columns})")]
    EmptySelection { rows: usize, columns: usize },

    /// Abscissa and ordinate of a cut profile disagree in length.
    #[error("inconsistent cut profile: {abscissa} abscissa points, {ordinate} ordinate points")]
    InconsistentProfile { abscissa: usize, ordinate: usize },

    /// A command was invoked while its precondition does not hold.
    #[error("command '{0}' is not available in the current state")]
    CommandDisabled(CommandId),

    /// Peak fit failed.
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
}
