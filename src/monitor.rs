//! Hierarchical progress reporting with cooperative cancellation.
//!
//! A [`Monitor`] is threaded explicitly through every invocation. Composite nodes split their
//! share of work among children with [`Monitor::child`]; long-running operations poll
//! [`Monitor::check_cancelled`] and bail out with [`Interrupted`].

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Marker error raised when a run observes cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation interrupted")]
pub struct Interrupted;

/// Progress and cancellation protocol consumed by invocation.
pub trait Monitor {
    /// Begins a unit of work measured in `total_work` units.
    fn start(&self, label: &str, total_work: f64);

    /// Reports `work` additional units as completed.
    fn progress(&self, work: f64);

    /// Marks the current unit of work as finished.
    fn done(&self);

    fn is_cancelled(&self) -> bool;

    /// Creates a monitor that covers `work` units of this monitor's total.
    fn child(&self, work: f64) -> Box<dyn Monitor + '_>;

    fn check_cancelled(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

/// A monitor that ignores progress and is never cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn start(&self, _label: &str, _total_work: f64) {}

    fn progress(&self, _work: f64) {}

    fn done(&self) {}

    fn is_cancelled(&self) -> bool {
        false
    }

    fn child(&self, _work: f64) -> Box<dyn Monitor + '_> {
        Box::new(NullMonitor)
    }
}

/// Shared flag used to request cancellation of a running invocation, possibly from another
/// thread.
#[derive(Debug, Default, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A sub-monitor covering a fixed share of its parent's work.
///
/// Its own `start` total is mapped onto that share, so a child may count in whatever units
/// suit it. Calling `done` forwards whatever part of the share has not been reported yet.
pub struct ChildMonitor<'a> {
    parent: &'a dyn Monitor,
    parent_work: f64,
    total_work: Cell<f64>,
    forwarded: Cell<f64>,
}

impl<'a> ChildMonitor<'a> {
    pub fn new(parent: &'a dyn Monitor, parent_work: f64) -> Self {
        Self {
            parent,
            parent_work,
            total_work: Cell::new(0.0),
            forwarded: Cell::new(0.0),
        }
    }

    fn forward(&self, parent_units: f64) {
        let remaining = self.parent_work - self.forwarded.get();
        let units = parent_units.min(remaining);
        if units > 0.0 {
            self.forwarded.set(self.forwarded.get() + units);
            self.parent.progress(units);
        }
    }
}

impl Monitor for ChildMonitor<'_> {
    fn start(&self, _label: &str, total_work: f64) {
        self.total_work.set(total_work);
    }

    fn progress(&self, work: f64) {
        let total = self.total_work.get();
        if total > 0.0 {
            self.forward(work / total * self.parent_work);
        }
    }

    fn done(&self) {
        self.forward(self.parent_work);
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }

    fn child(&self, work: f64) -> Box<dyn Monitor + '_> {
        Box::new(ChildMonitor::new(self, work))
    }
}

/// Root monitor that accumulates progress, logs it and exposes a [`CancelHandle`].
#[derive(Debug, Default)]
pub struct ProgressTracker {
    label: RefCell<String>,
    total_work: Cell<f64>,
    worked: Cell<f64>,
    finished: Cell<bool>,
    cancel: CancelHandle,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker that observes an existing cancellation flag.
    pub fn with_cancel_handle(cancel: CancelHandle) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn label(&self) -> String {
        self.label.borrow().clone()
    }

    pub fn worked(&self) -> f64 {
        self.worked.get()
    }

    pub fn total_work(&self) -> f64 {
        self.total_work.get()
    }

    pub fn is_done(&self) -> bool {
        self.finished.get()
    }

    /// Completed share of the total work in `[0, 1]`; zero before `start`.
    pub fn fraction(&self) -> f64 {
        let total = self.total_work.get();
        if total > 0.0 {
            (self.worked.get() / total).min(1.0)
        } else {
            0.0
        }
    }
}

impl Monitor for ProgressTracker {
    fn start(&self, label: &str, total_work: f64) {
        debug!(label, total_work, "progress started");
        *self.label.borrow_mut() = label.to_string();
        self.total_work.set(total_work);
        self.worked.set(0.0);
        self.finished.set(false);
    }

    fn progress(&self, work: f64) {
        self.worked.set(self.worked.get() + work);
        debug!(
            label = %self.label.borrow(),
            worked = self.worked.get(),
            total_work = self.total_work.get(),
            "progress"
        );
    }

    fn done(&self) {
        self.worked.set(self.worked.get().max(self.total_work.get()));
        self.finished.set(true);
        debug!(label = %self.label.borrow(), "progress done");
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn child(&self, work: f64) -> Box<dyn Monitor + '_> {
        Box::new(ChildMonitor::new(self, work))
    }
}
