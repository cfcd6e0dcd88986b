//! HDF5 file catalog.
//!
//! [`H5Catalog`] keeps a list of open files and answers the questions the
//! browser asks about them: the member tree, a dataset's attributes, a
//! dataset as a table, and a numeric dataset together with the axis datasets
//! its `x_axis`/`y_axis` attributes point at.

use crate::table::{DatasetSelection, DatasetTable};
use crate::tree::{NodeKind, TreeNode};
use crate::{Error, Result};
use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Dataset, File, Group, Location, ObjectReference1, ReferencedObject};
use ndarray::ArrayD;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Attribute naming the dataset that holds the first-axis coordinates.
pub const X_AXIS_ATTR: &str = "x_axis";
/// Attribute naming the dataset that holds the second-axis coordinates.
pub const Y_AXIS_ATTR: &str = "y_axis";

/// Groups nested deeper than this are not walked.
const MAX_DEPTH: usize = 64;
/// Values shown before an attribute value is elided.
const MAX_ATTR_VALUES: usize = 16;

/// One attribute of a file member.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AttributeInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    /// Display text of the value.
    pub value: String,
}

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    file: File,
}

/// The set of files open in the browser.
#[derive(Debug, Default)]
pub struct H5Catalog {
    files: Vec<OpenFile>,
}

impl H5Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every open file and open `path` alone.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened; the catalog is then
    /// empty.
    pub fn open_new<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        self.close_all();
        self.add(path)
    }

    /// Open `path` next to the files already open. Returns its index.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn add<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::debug!("opened {}", path.display());
        self.files.push(OpenFile {
            path: path.to_path_buf(),
            file,
        });
        Ok(self.files.len() - 1)
    }

    /// Close every open file.
    pub fn close_all(&mut self) {
        for open in self.files.drain(..) {
            if let Err(e) = open.file.close() {
                log::warn!("closing {} failed: {e}", open.path.display());
            }
        }
    }

    /// Paths of the open files in catalog order.
    #[must_use]
    pub fn files(&self) -> Vec<&Path> {
        self.files.iter().map(|open| open.path.as_path()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn open_file(&self, index: usize) -> Result<&OpenFile> {
        self.files.get(index).ok_or(Error::NoSuchFile(index))
    }

    /// Member tree of the file at `index`.
    ///
    /// # Errors
    /// Returns an error for a bad index or if the file cannot be walked.
    pub fn tree(&self, index: usize) -> Result<TreeNode> {
        let open = self.open_file(index)?;
        let mut entries = Vec::new();
        walk_group(&open.file, "", 0, &mut entries)?;
        let name = open.path.file_name().map_or_else(
            || open.path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        Ok(TreeNode::from_paths(&name, entries))
    }

    /// Numeric dataset at `path` with its resolved axis metadata.
    ///
    /// # Errors
    /// Returns [`Error::NotPlottable`] for scalar or non-numeric datasets and
    /// an HDF5 error if the dataset cannot be read.
    pub fn selection(&self, index: usize, path: &str) -> Result<DatasetSelection> {
        let open = self.open_file(index)?;
        let dataset = open.file.dataset(path)?;
        let descriptor = dataset.dtype()?.to_descriptor()?;
        if !is_numeric(&descriptor) {
            return Err(Error::NotPlottable {
                path: path.to_string(),
                reason: format!("element type {} is not numeric", dtype_name(&descriptor)),
            });
        }
        if dataset.ndim() == 0 {
            return Err(Error::NotPlottable {
                path: path.to_string(),
                reason: "scalar dataset".to_string(),
            });
        }

        let data = dataset.read_dyn::<f64>()?;
        let axis_x = resolve_axis(&open.file, &dataset, X_AXIS_ATTR);
        let axis_y = resolve_axis(&open.file, &dataset, Y_AXIS_ATTR);
        Ok(DatasetSelection::new(dataset.name(), data).with_axes(axis_x, axis_y))
    }

    /// Attributes of the group or dataset at `path` (`/` for the file).
    ///
    /// # Errors
    /// Returns an error if `path` names neither a group nor a dataset.
    pub fn attributes(&self, index: usize, path: &str) -> Result<Vec<AttributeInfo>> {
        let open = self.open_file(index)?;
        if let Ok(group) = open.file.group(path) {
            return read_attributes(&open.file, &group);
        }
        let dataset = open.file.dataset(path)?;
        read_attributes(&open.file, &dataset)
    }

    /// Dataset at `path` laid out as a table.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for element types that have no text
    /// form here (compound, fixed-length strings, ...) or for more than two
    /// dimensions.
    pub fn table(&self, index: usize, path: &str) -> Result<DatasetTable> {
        let open = self.open_file(index)?;
        let dataset = open.file.dataset(path)?;
        let descriptor = dataset.dtype()?.to_descriptor()?;
        match descriptor {
            ref d if is_numeric(d) => DatasetTable::from_numeric(&dataset.read_dyn::<f64>()?),
            TypeDescriptor::VarLenUnicode => {
                DatasetTable::from_array(&dataset.read_dyn::<VarLenUnicode>()?, |s| s.to_string())
            }
            TypeDescriptor::VarLenAscii => {
                DatasetTable::from_array(&dataset.read_dyn::<VarLenAscii>()?, |s| s.to_string())
            }
            ref d => Err(Error::InvalidFormat(format!(
                "cannot show {} dataset '{path}' as a table",
                dtype_name(d)
            ))),
        }
    }
}

impl Drop for H5Catalog {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Collect `(relative path, kind)` for every member below `group`, parents
/// before children, siblings in name order.
fn walk_group(
    group: &Group,
    prefix: &str,
    depth: usize,
    entries: &mut Vec<(String, NodeKind)>,
) -> Result<()> {
    enum Member {
        Group(Group),
        Dataset(Dataset),
    }

    if depth >= MAX_DEPTH {
        log::warn!("not walking below {prefix}: nesting deeper than {MAX_DEPTH}");
        return Ok(());
    }

    let mut members: Vec<(String, Member)> = Vec::new();
    for child in group.groups()? {
        members.push((last_segment(&child.name()), Member::Group(child)));
    }
    for child in group.datasets()? {
        members.push((last_segment(&child.name()), Member::Dataset(child)));
    }
    members.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, member) in members {
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        match member {
            Member::Group(child) => {
                entries.push((path.clone(), NodeKind::Group));
                walk_group(&child, &path, depth + 1, entries)?;
            }
            Member::Dataset(child) => {
                let dtype = child
                    .dtype()
                    .and_then(|t| t.to_descriptor())
                    .map_or_else(|_| "unknown".to_string(), |d| dtype_name(&d));
                entries.push((
                    path,
                    NodeKind::Dataset {
                        shape: child.shape(),
                        dtype,
                    },
                ));
            }
        }
    }
    Ok(())
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn is_numeric(descriptor: &TypeDescriptor) -> bool {
    matches!(
        descriptor,
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_)
    )
}

/// Short element type name such as `float64` or `uint8`.
fn dtype_name(descriptor: &TypeDescriptor) -> String {
    let bits = descriptor.size() * 8;
    match descriptor {
        TypeDescriptor::Integer(_) => format!("int{bits}"),
        TypeDescriptor::Unsigned(_) => format!("uint{bits}"),
        TypeDescriptor::Float(_) => format!("float{bits}"),
        TypeDescriptor::Boolean => "bool".to_string(),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => "string".to_string(),
        TypeDescriptor::Compound(_) => "compound".to_string(),
        TypeDescriptor::Enum(_) => "enum".to_string(),
        _ => "other".to_string(),
    }
}

/// Dataset an axis attribute points at, by object reference or by path.
fn referenced_dataset(file: &File, attr: &Attribute) -> Option<Dataset> {
    if let Ok(reference) = attr.read_scalar::<ObjectReference1>() {
        return match file.dereference(&reference) {
            Ok(ReferencedObject::Dataset(dataset)) => Some(dataset),
            Ok(_) => {
                log::debug!("axis reference does not point at a dataset");
                None
            }
            Err(e) => {
                log::debug!("axis reference cannot be resolved: {e}");
                None
            }
        };
    }
    let target = read_attr_opt_string(attr)?;
    match file.dataset(&target) {
        Ok(dataset) => Some(dataset),
        Err(e) => {
            log::debug!("axis path {target:?} cannot be opened: {e}");
            None
        }
    }
}

fn read_attr_opt_string(attr: &Attribute) -> Option<String> {
    if let Ok(value) = attr.read_scalar::<VarLenUnicode>() {
        return Some(value.to_string());
    }
    attr.read_scalar::<VarLenAscii>()
        .ok()
        .map(|value| value.to_string())
}

/// Values of the axis dataset named by attribute `name` of `dataset`.
///
/// Anything unusable resolves to `None`; the plot then uses index axes.
fn resolve_axis(file: &File, dataset: &Dataset, name: &str) -> Option<ArrayD<f64>> {
    let attr = dataset.attr(name).ok()?;
    let target = referenced_dataset(file, &attr)?;
    match target.read_dyn::<f64>() {
        Ok(values) => Some(values),
        Err(e) => {
            log::warn!("axis {name} of {} is not numeric: {e}", dataset.name());
            None
        }
    }
}

fn read_attributes(file: &File, location: &Location) -> Result<Vec<AttributeInfo>> {
    let mut infos = Vec::new();
    for name in location.attr_names()? {
        let attr = location.attr(&name)?;
        let descriptor = attr.dtype().and_then(|t| t.to_descriptor()).ok();
        let dtype = descriptor
            .as_ref()
            .map_or_else(|| "reference".to_string(), dtype_name);
        let value = attribute_value(file, &attr, descriptor.as_ref());
        infos.push(AttributeInfo {
            name,
            shape: attr.shape(),
            dtype,
            value,
        });
    }
    Ok(infos)
}

fn attribute_value(file: &File, attr: &Attribute, descriptor: Option<&TypeDescriptor>) -> String {
    let shown = match descriptor {
        Some(d) if is_numeric(d) => attr.read_dyn::<f64>().map(|values| format_values(&values)),
        Some(TypeDescriptor::VarLenUnicode) => attr
            .read_dyn::<VarLenUnicode>()
            .map(|values| format_values(&values)),
        Some(TypeDescriptor::VarLenAscii) => attr
            .read_dyn::<VarLenAscii>()
            .map(|values| format_values(&values)),
        _ => {
            return match attr.read_scalar::<ObjectReference1>() {
                Ok(reference) => match file.dereference(&reference) {
                    Ok(ReferencedObject::Dataset(target)) => format!("-> {}", target.name()),
                    Ok(ReferencedObject::Group(target)) => format!("-> {}", target.name()),
                    Ok(_) => "<object reference>".to_string(),
                    Err(_) => "<dangling reference>".to_string(),
                },
                Err(_) => format!(
                    "<{}>",
                    descriptor.map_or_else(|| "unknown".to_string(), dtype_name)
                ),
            };
        }
    };
    shown.unwrap_or_else(|e| format!("<unreadable: {e}>"))
}

fn format_values<T: std::fmt::Display>(values: &ArrayD<T>) -> String {
    if values.ndim() == 0 {
        return values.iter().next().map(ToString::to_string).unwrap_or_default();
    }
    let mut parts: Vec<String> = values
        .iter()
        .take(MAX_ATTR_VALUES)
        .map(ToString::to_string)
        .collect();
    if values.len() > MAX_ATTR_VALUES {
        parts.push("...".to_string());
    }
    format!("[{}]", parts.join(", "))
}
