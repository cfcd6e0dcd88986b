//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Invalid file format or unsupported element type.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Dataset cannot be handed to the plot (scalar or non-numeric).
    #[error("dataset '{path}' cannot be plotted: {reason}")]
    NotPlottable { path: String, reason: String },

    /// No open file at the given catalog index.
    #[error("no open file at index {0}")]
    NoSuchFile(usize),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] h5view_core::Error),
}
