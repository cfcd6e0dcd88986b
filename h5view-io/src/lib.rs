//! h5view-io: File access for the h5view data browser.
//!
//! The tree model and the dataset table/selection types are always built.
//! Reading HDF5 files through [`H5Catalog`] requires the `hdf5` feature.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod table;
pub mod tree;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use crate::hdf5::{AttributeInfo, H5Catalog, X_AXIS_ATTR, Y_AXIS_ATTR};
pub use table::{DatasetSelection, DatasetTable};
pub use tree::{format_shape, NodeKind, TreeNode};
