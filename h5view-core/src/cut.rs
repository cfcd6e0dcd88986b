//! Cut profiles: 1-D mean projections of a rectangle of the image.
//!
//! The live profile follows the committed rectangle. Freezing snapshots it
//! into an append-only overlay list that also collects fit curves.

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};

use crate::command::CommandId;
use crate::fit::{FitResult, PeakParameters};
use crate::image::{ImageAxes, RowOrientation};
use crate::region::Rectangle;
use crate::util::{f64_to_slice_bound, linspace, usize_to_f64};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The image direction a profile varies along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProfileAxis {
    /// Varies along x; rows were averaged.
    Columns,
    /// Varies along y; columns were averaged.
    Rows,
}

/// Abscissa/ordinate pair of equal length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutProfileData {
    abscissa: Vec<f64>,
    ordinate: Vec<f64>,
    along: ProfileAxis,
}

impl CutProfileData {
    /// # Errors
    /// Returns [`Error::InconsistentProfile`] when the lengths differ.
    pub fn new(abscissa: Vec<f64>, ordinate: Vec<f64>, along: ProfileAxis) -> Result<Self> {
        if abscissa.len() != ordinate.len() {
            return Err(Error::InconsistentProfile {
                abscissa: abscissa.len(),
                ordinate: ordinate.len(),
            });
        }
        Ok(Self {
            abscissa,
            ordinate,
            along,
        })
    }

    #[must_use]
    pub fn abscissa(&self) -> &[f64] {
        &self.abscissa
    }

    #[must_use]
    pub fn ordinate(&self) -> &[f64] {
        &self.ordinate
    }

    #[must_use]
    pub fn along(&self) -> ProfileAxis {
        self.along
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordinate.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordinate.is_empty()
    }
}

/// Everything a cut needs from the plot, passed in explicitly.
#[derive(Debug, Clone, Copy)]
pub struct PlotContext<'a> {
    /// Array the profile is averaged from.
    pub data: ArrayView2<'a, f64>,
    pub axes: &'a ImageAxes,
    pub rectangle: Rectangle,
    pub orientation: RowOrientation,
}

/// Compute the profile of `ctx.rectangle` over `ctx.data`.
///
/// Calibrated axes select elements whose coordinate lies strictly inside
/// the rectangle; index axes use truncated half-open pixel bounds. The
/// profile runs along the longer side of the rectangle, with ties and
/// degenerate rectangles averaged over rows.
///
/// # Errors
/// Returns [`Error::EmptySelection`] when no element is covered.
pub fn compute_cut(ctx: &PlotContext<'_>) -> Result<CutProfileData> {
    let (x_lo, x_hi) = ctx.rectangle.x_span();
    let (y_lo, y_hi) = ctx.rectangle.y_span();
    let average_rows = ctx.rectangle.height() <= ctx.rectangle.width();

    let (frame, abscissa) = if ctx.axes.is_calibrated() {
        let row_mask = strict_mask(ctx.axes.rows(), y_lo, y_hi);
        let row_mask: Vec<bool> = match ctx.orientation {
            RowOrientation::TopIsMax => row_mask.into_iter().rev().collect(),
            RowOrientation::TopIsFirst => row_mask,
        };
        let col_mask = strict_mask(ctx.axes.columns(), x_lo, x_hi);
        let mut frame = select(ctx.data, &row_mask, &col_mask);
        // rows of a flipped image run from high to low coordinate
        if matches!(ctx.orientation, RowOrientation::TopIsMax) {
            frame.invert_axis(Axis(0));
        }
        let abscissa = if average_rows {
            linspace(x_lo, x_hi, frame.ncols())
        } else {
            linspace(y_lo, y_hi, frame.nrows())
        };
        (frame, abscissa)
    } else {
        let (height, width) = ctx.data.dim();
        let r0 = f64_to_slice_bound(y_lo, height);
        let r1 = f64_to_slice_bound(y_hi, height);
        let c0 = f64_to_slice_bound(x_lo, width);
        let c1 = f64_to_slice_bound(x_hi, width);
        let frame = ctx.data.slice(s![r0..r1, c0..c1]).to_owned();
        let abscissa = if average_rows {
            (c0..c1).map(usize_to_f64).collect()
        } else {
            (r0..r1).map(usize_to_f64).collect()
        };
        (frame, abscissa)
    };

    let (rows, columns) = frame.dim();
    if rows == 0 || columns == 0 {
        return Err(Error::EmptySelection { rows, columns });
    }

    let (axis, along) = if average_rows {
        (Axis(0), ProfileAxis::Columns)
    } else {
        (Axis(1), ProfileAxis::Rows)
    };
    let ordinate = frame
        .mean_axis(axis)
        .ok_or(Error::EmptySelection { rows, columns })?
        .to_vec();

    debug_assert_eq!(abscissa.len(), ordinate.len(), "cut profile lengths diverged");
    CutProfileData::new(abscissa, ordinate, along)
}

fn strict_mask(axis: ArrayView1<'_, f64>, lo: f64, hi: f64) -> Vec<bool> {
    axis.iter().map(|&v| lo < v && v < hi).collect()
}

fn select(data: ArrayView2<'_, f64>, row_mask: &[bool], col_mask: &[bool]) -> Array2<f64> {
    let rows: Vec<usize> = indices(row_mask);
    let cols: Vec<usize> = indices(col_mask);
    data.select(Axis(0), &rows).select(Axis(1), &cols)
}

fn indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
        .collect()
}

/// A fitted curve kept alongside frozen profiles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitOverlay {
    pub curve: CutProfileData,
    pub parameters: PeakParameters,
    pub rms_residual: f64,
}

/// An immutable curve drawn on the cut surface.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Overlay {
    Frozen(CutProfileData),
    Fit(FitOverlay),
}

impl Overlay {
    /// The drawn data of the overlay.
    #[must_use]
    pub fn profile(&self) -> &CutProfileData {
        match self {
            Overlay::Frozen(profile) => profile,
            Overlay::Fit(fit) => &fit.curve,
        }
    }
}

/// Live cut profile plus its overlays.
#[derive(Debug, Clone, Default)]
pub struct CutProfile {
    live: Option<CutProfileData>,
    overlays: Vec<Overlay>,
}

impl CutProfile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live profile, `None` before the first cut and after a freeze.
    #[must_use]
    pub fn live(&self) -> Option<&CutProfileData> {
        self.live.as_ref()
    }

    #[must_use]
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    #[must_use]
    pub fn has_live(&self) -> bool {
        self.live.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Recompute the live profile from `ctx`.
    ///
    /// On failure the previous live profile is kept.
    ///
    /// # Errors
    /// Propagates the error of [`compute_cut`].
    pub fn recompute(&mut self, ctx: &PlotContext<'_>) -> Result<&CutProfileData> {
        let profile = compute_cut(ctx)?;
        log::debug!("cut profile of {} points along {:?}", profile.len(), profile.along());
        Ok(&*self.live.insert(profile))
    }

    /// Move the live profile into the overlays.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] when there is no live profile.
    pub fn freeze(&mut self) -> Result<()> {
        match self.live.take() {
            Some(profile) if !profile.is_empty() => {
                self.overlays.push(Overlay::Frozen(profile));
                Ok(())
            }
            other => {
                self.live = other;
                Err(Error::CommandDisabled(CommandId::FreezeCut))
            }
        }
    }

    /// Remove every overlay except the first.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] with fewer than two overlays.
    pub fn delete_frozen(&mut self) -> Result<usize> {
        if self.overlays.len() < 2 {
            return Err(Error::CommandDisabled(CommandId::DeleteFrozen));
        }
        let removed = self.overlays.len() - 1;
        self.overlays.truncate(1);
        Ok(removed)
    }

    /// Profile a fit runs on: the live profile, else the latest frozen one.
    ///
    /// Fit curves are never fitted again.
    #[must_use]
    pub fn fit_target(&self) -> Option<&CutProfileData> {
        self.live.as_ref().filter(|p| !p.is_empty()).or_else(|| {
            self.overlays.iter().rev().find_map(|overlay| match overlay {
                Overlay::Frozen(profile) => Some(profile),
                Overlay::Fit(_) => None,
            })
        })
    }

    /// Append a fit result as an overlay.
    ///
    /// # Errors
    /// Returns [`Error::InconsistentProfile`] when the curve and its
    /// abscissa differ in length.
    pub fn push_fit(&mut self, result: FitResult, along: ProfileAxis) -> Result<()> {
        let curve = CutProfileData::new(result.abscissa, result.curve, along)?;
        self.overlays.push(Overlay::Fit(FitOverlay {
            curve,
            parameters: result.parameters,
            rms_residual: result.rms_residual,
        }));
        Ok(())
    }

    /// Drop the live profile and every overlay.
    pub fn clear(&mut self) {
        self.live = None;
        self.overlays.clear();
    }
}
