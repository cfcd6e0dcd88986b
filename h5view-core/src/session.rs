//! The plotting session.
//!
//! [`PlotSession`] owns the plot state, the rectangle selector, the optional
//! cut view and the outbound sinks. Every operation that changes what is
//! drawn ends by pushing the new data to the [`RenderSink`] and requesting
//! a redraw of the affected surfaces.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use ndarray::ArrayD;

use crate::colormap::Colormap;
use crate::command::{self, CommandId, CommandState, MenuEntry};
use crate::config::{CutSource, ViewerConfig};
use crate::cut::{CutProfile, Overlay, PlotContext, ProfileAxis};
use crate::fit::{self, spawn_fit, FitError, FitMessage, FitResult, PeakParameters};
use crate::plot::{ImagePlotState, IngestOutcome, PlotState};
use crate::range::{ColormapRanges, ValueRange};
use crate::region::{DragPoint, Rectangle, RegionSelector, SelectionChange};
use crate::render::{Curve, CurveKind, ImageFrame, Notifier, RenderSink, Surface};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct PendingFit {
    generation: u64,
    along: ProfileAxis,
}

/// Plot state plus its cut view, driven by user events.
pub struct PlotSession<R: RenderSink, N: Notifier> {
    config: ViewerConfig,
    plot: ImagePlotState,
    selector: RegionSelector,
    /// Present while the cut view is open.
    cut: Option<CutProfile>,
    sink: R,
    notifier: N,
    fit_tx: Sender<FitMessage>,
    fit_rx: Receiver<FitMessage>,
    fit_generation: u64,
    pending_fit: Option<PendingFit>,
}

impl<R: RenderSink, N: Notifier> PlotSession<R, N> {
    pub fn new(config: ViewerConfig, sink: R, notifier: N) -> Self {
        let (fit_tx, fit_rx) = channel();
        Self {
            plot: ImagePlotState::new(&config),
            selector: RegionSelector::new(config.min_span_px),
            config,
            cut: None,
            sink,
            notifier,
            fit_tx,
            fit_rx,
            fit_generation: 0,
            pending_fit: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn plot(&self) -> &ImagePlotState {
        &self.plot
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    /// Cut view contents, `None` while the view is closed.
    pub fn cut(&self) -> Option<&CutProfile> {
        self.cut.as_ref()
    }

    pub fn rectangle(&self) -> Option<Rectangle> {
        self.selector.current()
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn is_cut_view_open(&self) -> bool {
        self.cut.is_some()
    }

    /// True while a background fit has not reported back.
    pub fn is_fit_pending(&self) -> bool {
        self.pending_fit.is_some()
    }

    // ---- inbound: dataset selection ----

    /// Show a new dataset.
    ///
    /// A rectangle that no longer fits the image bounds is clamped, an open
    /// cut view is recomputed and a pending background fit is dropped.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDimensionality`]; the session is unchanged.
    pub fn ingest(
        &mut self,
        raw: ArrayD<f64>,
        axis_x: Option<&ArrayD<f64>>,
        axis_y: Option<&ArrayD<f64>>,
    ) -> Result<IngestOutcome> {
        let outcome = self.plot.ingest(raw, axis_x, axis_y)?;
        if let Some(stale) = self.pending_fit.take() {
            log::debug!("fit request {} superseded by a new image", stale.generation);
        }
        if outcome.bounds_changed {
            if let Some(bounds) = self.plot.image_plot().map(|p| p.image().axes().bounds()) {
                if let Some(rect) = self.selector.clamp_to(bounds) {
                    log::debug!("rectangle clamped to new bounds: {rect:?}");
                }
            }
        }
        self.redraw_main();
        self.refresh_cut();
        Ok(outcome)
    }

    // ---- display parameters ----

    /// Turn log display on or off. Returns `false` if nothing changed.
    pub fn apply_log(&mut self, enable: bool) -> bool {
        if !self.plot.apply_log(enable) {
            return false;
        }
        self.redraw_main();
        if self.config.cut_source == CutSource::Displayed {
            self.refresh_cut();
        }
        true
    }

    /// # Errors
    /// Returns [`Error::CommandDisabled`] when no image is shown.
    pub fn toggle_log(&mut self) -> Result<()> {
        self.ensure_enabled(CommandId::ToggleLog)?;
        let enable = !self.plot.log_enabled();
        self.apply_log(enable);
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::CommandDisabled`] when no image is shown.
    pub fn reset_parameters(&mut self) -> Result<()> {
        self.ensure_enabled(CommandId::ResetParameters)?;
        let was_log = self.plot.log_enabled();
        self.plot.reset_display_parameters();
        self.redraw_main();
        if was_log && self.config.cut_source == CutSource::Displayed {
            self.refresh_cut();
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::InvalidRange`] for unusable bounds.
    pub fn set_value_range(&mut self, vmin: f64, vmax: f64) -> Result<()> {
        self.plot.set_value_range(vmin, vmax)?;
        self.redraw_main();
        Ok(())
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.plot.set_colormap(colormap);
        self.redraw_main();
    }

    pub fn colormap_ranges(&self) -> Option<ColormapRanges> {
        self.plot.colormap_ranges()
    }

    // ---- cut view ----

    /// # Errors
    /// Returns [`Error::CommandDisabled`] unless an image is shown and the
    /// view is closed.
    pub fn open_cut_view(&mut self) -> Result<()> {
        self.ensure_enabled(CommandId::OpenCutView)?;
        self.cut = Some(CutProfile::new());
        self.selector.set_active(true);
        log::debug!("cut view opened");
        self.refresh_cut();
        self.redraw_cut();
        Ok(())
    }

    /// Close the cut view, dropping its profiles. The rectangle is kept.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] when the view is not open.
    pub fn close_cut_view(&mut self) -> Result<()> {
        self.ensure_enabled(CommandId::CloseCutView)?;
        self.cut = None;
        self.selector.set_active(false);
        self.pending_fit = None;
        log::debug!("cut view closed");
        self.sink.set_lines(Surface::Cut, &[]);
        self.sink.request_redraw(Surface::Cut);
        self.sink.request_redraw(Surface::Main);
        Ok(())
    }

    pub fn begin_drag(&mut self, start: DragPoint) {
        self.selector.begin_drag(start);
    }

    pub fn update_drag(&mut self, current: DragPoint) {
        self.selector.update_drag(current);
        if self.selector.draft().is_some() {
            self.sink.request_redraw(Surface::Main);
        }
    }

    /// Finish a drag; a committed rectangle recomputes the cut.
    pub fn release_drag(&mut self, end: DragPoint) -> SelectionChange {
        let change = self.selector.release_drag(end);
        self.on_selection(change);
        change
    }

    /// Commit a rectangle delivered by the pointer layer.
    pub fn commit_rectangle(&mut self, rect: Rectangle) -> SelectionChange {
        let change = self.selector.commit(rect);
        self.on_selection(change);
        change
    }

    /// # Errors
    /// Returns [`Error::CommandDisabled`] without a live profile.
    pub fn freeze_cut(&mut self) -> Result<()> {
        self.ensure_enabled(CommandId::FreezeCut)?;
        if let Some(cut) = self.cut.as_mut() {
            cut.freeze()?;
        }
        self.redraw_cut();
        Ok(())
    }

    /// Remove every overlay except the first. Returns how many were removed.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] with fewer than two overlays.
    pub fn delete_frozen(&mut self) -> Result<usize> {
        self.ensure_enabled(CommandId::DeleteFrozen)?;
        let removed = match self.cut.as_mut() {
            Some(cut) => cut.delete_frozen()?,
            None => 0,
        };
        self.redraw_cut();
        Ok(removed)
    }

    // ---- fitting ----

    /// Fit the current profile on this thread.
    ///
    /// Failures are also forwarded to the notifier.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] when no profile can be fitted, or
    /// [`Error::Fit`] when the solver fails.
    pub fn run_fit(&mut self) -> Result<PeakParameters> {
        self.ensure_enabled(CommandId::RunFit)?;
        let target = self
            .cut
            .as_ref()
            .and_then(CutProfile::fit_target)
            .ok_or(Error::CommandDisabled(CommandId::RunFit))?;
        let along = target.along();
        let result = fit::fit(target.abscissa(), target.ordinate(), &self.config.fit);
        self.finish_fit(result, along)
    }

    /// Start a fit of the current profile on a worker thread.
    ///
    /// Returns the request generation. Collect the outcome with
    /// [`poll_fit`](Self::poll_fit) or [`wait_fit`](Self::wait_fit).
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] when no profile can be fitted or a
    /// fit is already running.
    pub fn request_fit(&mut self) -> Result<u64> {
        self.ensure_enabled(CommandId::RunFit)?;
        let target = self
            .cut
            .as_ref()
            .and_then(CutProfile::fit_target)
            .ok_or(Error::CommandDisabled(CommandId::RunFit))?;
        self.fit_generation += 1;
        let generation = self.fit_generation;
        spawn_fit(
            generation,
            target.abscissa().to_vec(),
            target.ordinate().to_vec(),
            self.config.fit.clone(),
            self.fit_tx.clone(),
        );
        self.pending_fit = Some(PendingFit {
            generation,
            along: target.along(),
        });
        log::debug!("fit request {generation} started");
        Ok(generation)
    }

    /// Apply a finished background fit, if one has arrived.
    ///
    /// Results of superseded requests are discarded.
    pub fn poll_fit(&mut self) -> Option<Result<PeakParameters>> {
        while let Ok(msg) = self.fit_rx.try_recv() {
            if let Some(outcome) = self.accept_fit_message(msg) {
                return Some(outcome);
            }
        }
        None
    }

    /// Block until the pending background fit reports or `timeout` expires.
    pub fn wait_fit(&mut self, timeout: Duration) -> Option<Result<PeakParameters>> {
        let deadline = Instant::now() + timeout;
        while self.pending_fit.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.fit_rx.recv_timeout(remaining) {
                Ok(msg) => {
                    if let Some(outcome) = self.accept_fit_message(msg) {
                        return Some(outcome);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn accept_fit_message(&mut self, msg: FitMessage) -> Option<Result<PeakParameters>> {
        match self.pending_fit {
            Some(pending) if pending.generation == msg.generation => {
                self.pending_fit = None;
                Some(self.finish_fit(msg.result, pending.along))
            }
            _ => {
                log::debug!("discarding stale fit result {}", msg.generation);
                None
            }
        }
    }

    fn finish_fit(
        &mut self,
        result: std::result::Result<FitResult, FitError>,
        along: ProfileAxis,
    ) -> Result<PeakParameters> {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                let err = Error::from(e);
                self.notifier.notify(&err.to_string());
                return Err(err);
            }
        };
        let parameters = result.parameters;
        let Some(cut) = self.cut.as_mut() else {
            log::warn!("fit finished after the cut view closed");
            return Err(Error::CommandDisabled(CommandId::RunFit));
        };
        if let Err(err) = cut.push_fit(result, along) {
            self.notifier.notify(&err.to_string());
            return Err(err);
        }
        self.redraw_cut();
        Ok(parameters)
    }

    // ---- commands ----

    /// Snapshot of the facts command predicates depend on.
    pub fn command_state(&self) -> CommandState {
        let cut = self.cut.as_ref();
        CommandState {
            mode: self.plot.mode(),
            log_enabled: self.plot.log_enabled(),
            cut_view_open: cut.is_some(),
            has_live_profile: cut.is_some_and(CutProfile::has_live),
            overlay_count: cut.map_or(0, |c| c.overlays().len()),
            fit_points: cut.and_then(CutProfile::fit_target).map_or(0, |p| p.len()),
            fit_pending: self.pending_fit.is_some(),
        }
    }

    pub fn is_enabled(&self, id: CommandId) -> bool {
        command::is_enabled(id, &self.command_state())
    }

    pub fn menu(&self) -> Vec<MenuEntry> {
        command::menu(&self.command_state())
    }

    /// Run a menu command.
    ///
    /// # Errors
    /// Returns [`Error::CommandDisabled`] when the command's predicate does
    /// not hold, or the error of the command itself.
    pub fn execute(&mut self, id: CommandId) -> Result<()> {
        match id {
            CommandId::ToggleLog => self.toggle_log(),
            CommandId::ResetParameters => self.reset_parameters(),
            CommandId::OpenCutView => self.open_cut_view(),
            CommandId::CloseCutView => self.close_cut_view(),
            CommandId::FreezeCut => self.freeze_cut(),
            CommandId::DeleteFrozen => self.delete_frozen().map(|_| ()),
            CommandId::RunFit => self.run_fit().map(|_| ()),
        }
    }

    fn ensure_enabled(&self, id: CommandId) -> Result<()> {
        if self.is_enabled(id) {
            Ok(())
        } else {
            log::debug!("rejected disabled command {id:?}");
            Err(Error::CommandDisabled(id))
        }
    }

    // ---- internals ----

    fn on_selection(&mut self, change: SelectionChange) {
        match change {
            SelectionChange::Committed(rect) => {
                log::debug!("rectangle committed: {rect:?}");
                self.refresh_cut();
                self.sink.request_redraw(Surface::Main);
            }
            SelectionChange::TooSmall | SelectionChange::Ignored => {}
        }
    }

    /// Recompute the live profile and redraw the cut view.
    ///
    /// A new profile supersedes any pending background fit. Failures keep
    /// the previous profile.
    fn refresh_cut(&mut self) {
        let Some(cut) = self.cut.as_mut() else {
            return;
        };
        let Some(plot) = self.plot.image_plot() else {
            log::warn!("cut skipped: {}", Error::NoImage);
            return;
        };
        let Some(rectangle) = self.selector.current() else {
            log::debug!("cut skipped: {}", Error::NoRegion);
            return;
        };
        let data = match self.config.cut_source {
            CutSource::Raw => plot.image().data(),
            CutSource::Displayed => plot.displayed(),
        };
        let ctx = PlotContext {
            data,
            axes: plot.image().axes(),
            rectangle,
            orientation: self.plot.orientation(),
        };
        match cut.recompute(&ctx) {
            Ok(_) => {
                if let Some(stale) = self.pending_fit.take() {
                    log::debug!("fit request {} superseded by a new cut", stale.generation);
                }
            }
            Err(err @ Error::InconsistentProfile { .. }) => {
                log::error!("{err}");
                self.notifier.notify(&err.to_string());
                return;
            }
            Err(err) => {
                log::warn!("cut skipped: {err}");
                return;
            }
        }
        self.redraw_cut();
    }

    fn redraw_main(&mut self) {
        match self.plot.state() {
            PlotState::Empty => self.sink.set_lines(Surface::Main, &[]),
            PlotState::OneD(line) => {
                let curve = Curve {
                    kind: CurveKind::Dataset,
                    abscissa: line.abscissa.to_vec(),
                    ordinate: line.ordinate.to_vec(),
                };
                self.sink.set_lines(Surface::Main, &[curve]);
            }
            PlotState::TwoD(image) => {
                let displayed = image.displayed();
                let params = self.plot.display_parameters();
                let value_range = params
                    .value_range
                    .or_else(|| ValueRange::of(&displayed))
                    .unwrap_or(ValueRange::new(0.0, 0.0));
                self.sink.set_image(ImageFrame {
                    data: displayed.to_owned(),
                    extent: self.plot.extent(),
                    colormap: params.colormap,
                    value_range,
                });
            }
        }
        self.sink.request_redraw(Surface::Main);
    }

    fn redraw_cut(&mut self) {
        let Some(cut) = self.cut.as_ref() else {
            return;
        };
        let mut curves: Vec<Curve> = cut
            .overlays()
            .iter()
            .map(|overlay| {
                let kind = match overlay {
                    Overlay::Frozen(_) => CurveKind::Frozen,
                    Overlay::Fit(_) => CurveKind::Fit,
                };
                let profile = overlay.profile();
                Curve {
                    kind,
                    abscissa: profile.abscissa().to_vec(),
                    ordinate: profile.ordinate().to_vec(),
                }
            })
            .collect();
        if let Some(live) = cut.live() {
            curves.push(Curve {
                kind: CurveKind::Live,
                abscissa: live.abscissa().to_vec(),
                ordinate: live.ordinate().to_vec(),
            });
        }
        self.sink.set_lines(Surface::Cut, &curves);
        self.sink.request_redraw(Surface::Cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{LogNotifier, NullSink};
    use ndarray::Array2;

    fn session() -> PlotSession<NullSink, LogNotifier> {
        PlotSession::new(ViewerConfig::default(), NullSink, LogNotifier)
    }

    #[test]
    fn test_commands_rejected_without_image() {
        let mut s = session();
        assert_eq!(
            s.execute(CommandId::ToggleLog),
            Err(Error::CommandDisabled(CommandId::ToggleLog))
        );
        assert_eq!(
            s.open_cut_view(),
            Err(Error::CommandDisabled(CommandId::OpenCutView))
        );
    }

    #[test]
    fn test_rectangle_survives_cut_view_close() {
        let mut s = session();
        s.ingest(Array2::<f64>::ones((8, 8)).into_dyn(), None, None)
            .unwrap();
        s.open_cut_view().unwrap();
        s.commit_rectangle(Rectangle::new(0.0, 0.0, 6.0, 2.0));
        assert!(s.cut().unwrap().live().is_some());
        s.close_cut_view().unwrap();
        assert!(s.cut().is_none());
        assert_eq!(s.rectangle(), Some(Rectangle::new(0.0, 0.0, 6.0, 2.0)));

        s.open_cut_view().unwrap();
        assert_eq!(s.cut().unwrap().live().map(|p| p.len()), Some(6));
    }

    #[test]
    fn test_commit_ignored_while_view_closed() {
        let mut s = session();
        s.ingest(Array2::<f64>::ones((8, 8)).into_dyn(), None, None)
            .unwrap();
        let change = s.commit_rectangle(Rectangle::new(0.0, 0.0, 6.0, 2.0));
        assert_eq!(change, SelectionChange::Ignored);
        assert!(s.rectangle().is_none());
    }

    #[test]
    fn test_ingest_clamps_rectangle() {
        let mut s = session();
        s.ingest(Array2::<f64>::ones((10, 10)).into_dyn(), None, None)
            .unwrap();
        s.open_cut_view().unwrap();
        s.commit_rectangle(Rectangle::new(2.0, 1.0, 9.0, 3.0));
        s.ingest(Array2::<f64>::ones((4, 5)).into_dyn(), None, None)
            .unwrap();
        assert_eq!(s.rectangle(), Some(Rectangle::new(2.0, 1.0, 5.0, 3.0)));
        assert_eq!(s.cut().unwrap().live().map(|p| p.len()), Some(3));
    }
}
