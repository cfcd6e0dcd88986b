//! Rectangle selection over the image.

use crate::config::DEFAULT_MIN_SPAN_PX;
use crate::image::Bounds;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangle in the image's active coordinate space.
///
/// Corners are stored as drawn; `x2 < x1` or `y2 < y1` is allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// `(min, max)` of the x corners.
    #[must_use]
    pub fn x_span(&self) -> (f64, f64) {
        (self.x1.min(self.x2), self.x1.max(self.x2))
    }

    /// `(min, max)` of the y corners.
    #[must_use]
    pub fn y_span(&self) -> (f64, f64) {
        (self.y1.min(self.y2), self.y1.max(self.y2))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    /// Pull every corner into `bounds`, keeping the corner order.
    #[must_use]
    pub fn clamped(&self, bounds: Bounds) -> Self {
        Self {
            x1: self.x1.clamp(bounds.x_min, bounds.x_max),
            y1: self.y1.clamp(bounds.y_min, bounds.y_max),
            x2: self.x2.clamp(bounds.x_min, bounds.x_max),
            y2: self.y2.clamp(bounds.y_min, bounds.y_max),
        }
    }
}

/// A pointer position in both data and screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPoint {
    pub data: (f64, f64),
    pub pixel: (f64, f64),
}

impl DragPoint {
    #[must_use]
    pub fn new(data: (f64, f64), pixel: (f64, f64)) -> Self {
        Self { data, pixel }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegionDraft {
    start: DragPoint,
    current: DragPoint,
}

/// Outcome of ending a drag or committing a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionChange {
    /// A new rectangle replaced the previous one.
    Committed(Rectangle),
    /// The drag was too small; the previous rectangle is kept.
    TooSmall,
    /// Nothing was in progress or the selector is inactive.
    Ignored,
}

/// Interactive rectangle selector.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    min_span_px: f64,
    active: bool,
    draft: Option<RegionDraft>,
    current: Option<Rectangle>,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPAN_PX)
    }
}

impl RegionSelector {
    #[must_use]
    pub fn new(min_span_px: f64) -> Self {
        Self {
            min_span_px,
            active: false,
            draft: None,
            current: None,
        }
    }

    /// Committed rectangle, if any.
    #[must_use]
    pub fn current(&self) -> Option<Rectangle> {
        self.current
    }

    /// In-progress drag rectangle, for preview drawing.
    #[must_use]
    pub fn draft(&self) -> Option<Rectangle> {
        self.draft.map(|d| {
            Rectangle::new(d.start.data.0, d.start.data.1, d.current.data.0, d.current.data.1)
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable interaction. The committed rectangle is kept.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.draft = None;
        }
    }

    /// Start a drag at `start`.
    pub fn begin_drag(&mut self, start: DragPoint) {
        if self.active {
            self.draft = Some(RegionDraft {
                start,
                current: start,
            });
        }
    }

    /// Move the free corner of the drag.
    pub fn update_drag(&mut self, current: DragPoint) {
        if let Some(draft) = &mut self.draft {
            draft.current = current;
        }
    }

    /// Abandon an in-progress drag.
    pub fn cancel_drag(&mut self) {
        self.draft = None;
    }

    /// Finish the drag at `end` and commit if it spans enough pixels.
    pub fn release_drag(&mut self, end: DragPoint) -> SelectionChange {
        let Some(draft) = self.draft.take() else {
            return SelectionChange::Ignored;
        };
        let span_x = (end.pixel.0 - draft.start.pixel.0).abs();
        let span_y = (end.pixel.1 - draft.start.pixel.1).abs();
        if span_x < self.min_span_px || span_y < self.min_span_px {
            log::debug!("drag of {span_x:.1}x{span_y:.1} px below minimum span");
            return SelectionChange::TooSmall;
        }
        let rect = Rectangle::new(draft.start.data.0, draft.start.data.1, end.data.0, end.data.1);
        self.current = Some(rect);
        SelectionChange::Committed(rect)
    }

    /// Commit a rectangle delivered by the pointer layer.
    pub fn commit(&mut self, rect: Rectangle) -> SelectionChange {
        if !self.active {
            return SelectionChange::Ignored;
        }
        self.draft = None;
        self.current = Some(rect);
        SelectionChange::Committed(rect)
    }

    /// Clamp the committed rectangle into new image bounds.
    ///
    /// Returns the clamped rectangle if one exists.
    pub fn clamp_to(&mut self, bounds: Bounds) -> Option<Rectangle> {
        let rect = self.current?.clamped(bounds);
        self.current = Some(rect);
        Some(rect)
    }

    /// Forget the committed rectangle.
    pub fn clear(&mut self) {
        self.current = None;
        self.draft = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> DragPoint {
        DragPoint::new((x, y), (x * 10.0, y * 10.0))
    }

    #[test]
    fn test_drag_commits_unsorted() {
        let mut sel = RegionSelector::default();
        sel.set_active(true);
        sel.begin_drag(point(8.0, 6.0));
        sel.update_drag(point(4.0, 4.0));
        assert_eq!(sel.draft(), Some(Rectangle::new(8.0, 6.0, 4.0, 4.0)));
        let change = sel.release_drag(point(2.0, 1.0));
        assert_eq!(
            change,
            SelectionChange::Committed(Rectangle::new(8.0, 6.0, 2.0, 1.0))
        );
        assert_eq!(sel.current(), Some(Rectangle::new(8.0, 6.0, 2.0, 1.0)));
        assert!(sel.draft().is_none());
    }

    #[test]
    fn test_small_drag_rejected() {
        let mut sel = RegionSelector::default();
        sel.set_active(true);
        sel.begin_drag(point(0.0, 0.0));
        sel.release_drag(point(5.0, 5.0));

        sel.begin_drag(DragPoint::new((0.0, 0.0), (0.0, 0.0)));
        let change = sel.release_drag(DragPoint::new((1.0, 9.0), (100.0, 4.0)));
        assert_eq!(change, SelectionChange::TooSmall);
        assert_eq!(sel.current(), Some(Rectangle::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_inactive_selector_ignores_input() {
        let mut sel = RegionSelector::default();
        sel.begin_drag(point(0.0, 0.0));
        assert_eq!(sel.release_drag(point(5.0, 5.0)), SelectionChange::Ignored);
        assert_eq!(
            sel.commit(Rectangle::new(0.0, 0.0, 1.0, 1.0)),
            SelectionChange::Ignored
        );
        assert!(sel.current().is_none());
    }

    #[test]
    fn test_deactivate_keeps_rectangle() {
        let mut sel = RegionSelector::default();
        sel.set_active(true);
        sel.commit(Rectangle::new(0.0, 0.0, 3.0, 3.0));
        sel.set_active(false);
        assert_eq!(sel.current(), Some(Rectangle::new(0.0, 0.0, 3.0, 3.0)));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let mut sel = RegionSelector::default();
        sel.set_active(true);
        sel.commit(Rectangle::new(12.0, -3.0, 2.0, 5.0));
        let bounds = Bounds {
            x_min: 0.0,
            x_max: 10.0,
            y_min: 0.0,
            y_max: 4.0,
        };
        let rect = sel.clamp_to(bounds).unwrap();
        assert_eq!(rect, Rectangle::new(10.0, 0.0, 2.0, 4.0));
    }

    #[test]
    fn test_spans() {
        let rect = Rectangle::new(5.0, 1.0, -1.0, 3.0);
        assert_eq!(rect.x_span(), (-1.0, 5.0));
        assert_eq!(rect.y_span(), (1.0, 3.0));
        assert!((rect.width() - 6.0).abs() < f64::EPSILON);
        assert!((rect.height() - 2.0).abs() < f64::EPSILON);
    }
}
