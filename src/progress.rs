//! Progress indicator abstraction.
//!
//! The shell drives an optional progress bar through [`ProgressIndicator`].
//! Every method has a no-op default, so an indicator implements only what it
//! supports, and the shell works the same with no indicator attached (during
//! bootstrap, before the view layer mounts one).

use crate::error::AppError;
use crate::trace_log;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A loading indicator driven by the navigation pipeline.
pub trait ProgressIndicator: Send + Sync + 'static {
    /// A navigation started loading.
    fn start(&self) {}

    /// Advance by `percent`.
    fn increase(&self, _percent: u8) {}

    /// A redirect interrupted the navigation.
    fn pause(&self) {}

    /// The navigation failed.
    fn fail(&self, _error: &AppError) {}

    /// The navigation finished.
    fn finish(&self) {}
}

/// Shared handle to the attached indicator plus the manual-mode flag.
///
/// In manual mode (a matched page declared `loading(false)`) the shell never
/// finishes the indicator on success; the page does it.
#[derive(Default)]
pub struct ProgressHandle {
    indicator: RwLock<Option<Arc<dyn ProgressIndicator>>>,
    manual: AtomicBool,
}

impl ProgressHandle {
    /// Handle with no indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the indicator.
    pub fn attach(&self, indicator: Arc<dyn ProgressIndicator>) {
        *self.indicator.write() = Some(indicator);
    }

    /// Detach the indicator.
    pub fn detach(&self) {
        *self.indicator.write() = None;
    }

    /// `true` if an indicator is attached.
    pub fn is_attached(&self) -> bool {
        self.indicator.read().is_some()
    }

    /// Set manual mode.
    pub fn set_manual(&self, manual: bool) {
        self.manual.store(manual, Ordering::SeqCst);
    }

    /// `true` in manual mode.
    pub fn is_manual(&self) -> bool {
        self.manual.load(Ordering::SeqCst)
    }

    fn with<F: FnOnce(&dyn ProgressIndicator)>(&self, op: &str, f: F) {
        let indicator = self.indicator.read().clone();
        if let Some(indicator) = indicator {
            trace_log!("Progress: {}", op);
            f(indicator.as_ref());
        }
    }

    /// Forward `start`.
    pub fn start(&self) {
        self.with("start", |p| p.start());
    }

    /// Forward `increase`.
    pub fn increase(&self, percent: u8) {
        self.with("increase", |p| p.increase(percent));
    }

    /// Forward `pause`.
    pub fn pause(&self) {
        self.with("pause", |p| p.pause());
    }

    /// Forward `fail`.
    pub fn fail(&self, error: &AppError) {
        self.with("fail", |p| p.fail(error));
    }

    /// Forward `finish`.
    pub fn finish(&self) {
        self.with("finish", |p| p.finish());
    }
}

impl fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("attached", &self.is_attached())
            .field("manual", &self.is_manual())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressIndicator for Recorder {
        fn start(&self) {
            self.0.lock().push("start".into());
        }

        fn increase(&self, percent: u8) {
            self.0.lock().push(format!("increase:{percent}"));
        }
    }

    #[test]
    fn test_detached_handle_is_silent() {
        let handle = ProgressHandle::new();
        handle.start();
        handle.finish();
        assert!(!handle.is_attached());
    }

    #[test]
    fn test_optional_methods_default_to_noop() {
        let recorder = Arc::new(Recorder::default());
        let handle = ProgressHandle::new();
        handle.attach(recorder.clone());

        handle.start();
        handle.increase(45);
        handle.pause();
        handle.finish();

        assert_eq!(*recorder.0.lock(), vec!["start", "increase:45"]);
    }

    #[test]
    fn test_manual_flag() {
        let handle = ProgressHandle::new();
        assert!(!handle.is_manual());
        handle.set_manual(true);
        assert!(handle.is_manual());
    }
}
