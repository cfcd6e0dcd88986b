//! Tabular view of a dataset and the selection handed to the plot.

use ndarray::{ArrayD, Axis};

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::Serialize;

/// A dataset laid out as rows and columns of text cells.
///
/// A 1-D dataset becomes a single column, a 2-D dataset keeps its rows and
/// columns, and a scalar gives an empty table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DatasetTable {
    columns: usize,
    rows: Vec<Vec<String>>,
}

impl DatasetTable {
    /// Lay out `data`, formatting each element with `cell`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for arrays with more than two
    /// dimensions.
    pub fn from_array<T, F>(data: &ArrayD<T>, cell: F) -> Result<Self>
    where
        F: Fn(&T) -> String,
    {
        match data.ndim() {
            0 => Ok(Self::default()),
            1 => Ok(Self {
                columns: 1,
                rows: data.iter().map(|v| vec![cell(v)]).collect(),
            }),
            2 => Ok(Self {
                columns: data.len_of(Axis(1)),
                rows: data
                    .axis_iter(Axis(0))
                    .map(|row| row.iter().map(&cell).collect())
                    .collect(),
            }),
            n => Err(Error::InvalidFormat(format!(
                "cannot show a {n}-dimensional dataset as a table"
            ))),
        }
    }

    /// Numeric table with shortest round-trip formatting.
    ///
    /// # Errors
    /// See [`DatasetTable::from_array`].
    pub fn from_numeric(data: &ArrayD<f64>) -> Result<Self> {
        Self::from_array(data, ToString::to_string)
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text rendering with a column-index header and row indices.
    ///
    /// At most `limit` rows are printed; a trailing line reports the rest.
    #[must_use]
    pub fn render(&self, limit: Option<usize>) -> String {
        let shown = limit.map_or(self.rows.len(), |n| n.min(self.rows.len()));
        let index_width = shown.saturating_sub(1).to_string().len();
        let mut widths: Vec<usize> = (0..self.columns).map(|c| c.to_string().len()).collect();
        for row in &self.rows[..shown] {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (c, width) in widths.iter().enumerate() {
            out.push_str(&format!("  {c:>width$}"));
        }
        out.push('\n');
        for (r, row) in self.rows[..shown].iter().enumerate() {
            out.push_str(&format!("{r:>index_width$}"));
            for (cell, width) in row.iter().zip(&widths) {
                out.push_str(&format!("  {cell:>width$}"));
            }
            out.push('\n');
        }
        if shown < self.rows.len() {
            out.push_str(&format!("... {} more rows\n", self.rows.len() - shown));
        }
        out
    }
}

/// A numeric dataset chosen for display, with its axis metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSelection {
    /// Member path of the dataset.
    pub path: String,
    pub data: ArrayD<f64>,
    /// Values of the dataset referenced by the `x_axis` attribute.
    pub axis_x: Option<ArrayD<f64>>,
    /// Values of the dataset referenced by the `y_axis` attribute.
    pub axis_y: Option<ArrayD<f64>>,
}

impl DatasetSelection {
    #[must_use]
    pub fn new(path: impl Into<String>, data: ArrayD<f64>) -> Self {
        Self {
            path: path.into(),
            data,
            axis_x: None,
            axis_y: None,
        }
    }

    #[must_use]
    pub fn with_axes(mut self, axis_x: Option<ArrayD<f64>>, axis_y: Option<ArrayD<f64>>) -> Self {
        self.axis_x = axis_x;
        self.axis_y = axis_y;
        self
    }

    /// Hand the selection to a plot session.
    ///
    /// # Errors
    /// Returns the session's error for arrays it cannot display.
    pub fn show<R, N>(
        &self,
        session: &mut h5view_core::PlotSession<R, N>,
    ) -> Result<h5view_core::IngestOutcome>
    where
        R: h5view_core::RenderSink,
        N: h5view_core::Notifier,
    {
        Ok(session.ingest(
            self.data.clone(),
            self.axis_x.as_ref(),
            self.axis_y.as_ref(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5view_core::{LogNotifier, NullSink, PlotMode, PlotSession, ViewerConfig};
    use ndarray::{arr0, array, Array3, IxDyn};

    #[test]
    fn test_table_shapes() {
        let scalar = DatasetTable::from_numeric(&arr0(3.0).into_dyn()).unwrap();
        assert!(scalar.is_empty());
        assert_eq!(scalar.columns(), 0);

        let column = DatasetTable::from_numeric(&array![1.0, 2.5, 3.0].into_dyn()).unwrap();
        assert_eq!(column.columns(), 1);
        assert_eq!(column.rows().len(), 3);
        assert_eq!(column.rows()[1], vec!["2.5".to_string()]);

        let grid = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn();
        let grid = DatasetTable::from_numeric(&grid).unwrap();
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.rows().len(), 3);
        assert_eq!(grid.rows()[2], vec!["5".to_string(), "6".to_string()]);
    }

    #[test]
    fn test_table_rejects_3d() {
        let cube = Array3::<f64>::zeros((2, 2, 2)).into_dyn();
        let err = DatasetTable::from_numeric(&cube).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_render_limit() {
        let data = array![[1.0, 20.0], [3.0, 4.0], [5.0, 6.0]].into_dyn();
        let table = DatasetTable::from_numeric(&data).unwrap();
        assert_eq!(table.render(Some(2)), "   0   1\n0  1  20\n1  3   4\n... 1 more rows\n");
        assert!(table.render(None).ends_with("2  5   6\n"));
    }

    #[test]
    fn test_render_column_without_limit() {
        let table = DatasetTable::from_numeric(&array![0.5, 12.0].into_dyn()).unwrap();
        assert_eq!(table.render(None), "     0\n0  0.5\n1   12\n");
        assert_eq!(table.render(Some(10)), table.render(None));
    }

    #[test]
    fn test_selection_show() {
        let mut session = PlotSession::new(ViewerConfig::default(), NullSink, LogNotifier);
        let selection = DatasetSelection::new("/img", ndarray::Array::zeros(IxDyn(&[3, 4])))
            .with_axes(
                Some(array![0.0, 1.0, 2.0].into_dyn()),
                Some(array![0.0, 0.5, 1.0, 1.5].into_dyn()),
            );
        let outcome = selection.show(&mut session).unwrap();
        assert_eq!(outcome.mode, PlotMode::TwoD);
        assert!(outcome.calibrated);

        let cube = DatasetSelection::new("/cube", Array3::<f64>::zeros((2, 2, 2)).into_dyn());
        assert!(matches!(cube.show(&mut session), Err(Error::Core(_))));
        assert_eq!(session.plot().mode(), PlotMode::TwoD);
    }
}
