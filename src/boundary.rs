//! Root error boundary.
//!
//! [`ErrorBoundary`] decides what the root outlet shows:
//!
//! | State | Shown when | View |
//! |-------|------------|------|
//! | `Normal` | no active error | the page, keyed by [`page_key`] |
//! | `ShowingError` | an error is active | the configured error view |
//! | `ErrorInError` | the error view itself failed | a minimal static fallback |
//!
//! While the error view is rendered a one-shot "displaying error" flag is
//! armed; the host disarms it on the next tick. A failure captured while the
//! flag is armed switches to the fallback, which never renders the error
//! view again until the next tick.
//!
//! ```
//! use shell_navigator::boundary::{BoundaryState, BoundaryView, ErrorBoundary};
//! use shell_navigator::error::AppError;
//! use shell_navigator::path::PathCompiler;
//! use shell_navigator::RouteSnapshot;
//!
//! let boundary = ErrorBoundary::new();
//! let route = RouteSnapshot::new("/broken");
//! let error = AppError::internal("boom");
//!
//! let view = boundary.render(Some(&error), &route, None, &PathCompiler::new());
//! assert!(matches!(view, BoundaryView::ErrorView { .. }));
//!
//! assert!(boundary.capture("error view failed"));
//! let view = boundary.render(Some(&error), &route, None, &PathCompiler::new());
//! assert!(matches!(view, BoundaryView::Fallback(_)));
//! assert_eq!(boundary.state(), BoundaryState::ErrorInError);
//!
//! boundary.tick();
//! assert!(!boundary.is_displaying_error());
//! ```

use crate::error::AppError;
use crate::path::PathCompiler;
use crate::{trace_log, warn_log, RouteSnapshot, Shell};
use parking_lot::Mutex;
use std::fmt;

/// Title of the fallback view.
pub const FALLBACK_TITLE: &str = "An error occurred while showing the error page";

const FALLBACK_MESSAGE: &str =
    "Unfortunately an error occurred and while showing the error page another error occurred";

/// Render state of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryState {
    /// Rendering the page.
    #[default]
    Normal,
    /// Rendering the error view.
    ShowingError,
    /// Rendering the static fallback.
    ErrorInError,
}

/// Static content shown when the error view failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackView {
    /// Heading.
    pub title: String,
    /// Explanation.
    pub message: String,
    /// `Error details: ...` line.
    pub details: String,
    /// Target of the "go back" link.
    pub home: String,
}

impl FallbackView {
    fn new(failure: &str) -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            message: FALLBACK_MESSAGE.to_string(),
            details: format!("Error details: {failure}"),
            home: "/".to_string(),
        }
    }
}

/// What the root outlet renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryView {
    /// The matched page, keyed so it re-mounts when the key changes.
    Page {
        /// Page key.
        key: String,
    },
    /// The configured error view.
    ErrorView {
        /// Error handed to the view.
        error: AppError,
    },
    /// The static fallback.
    Fallback(FallbackView),
}

#[derive(Debug, Default)]
struct BoundaryInner {
    state: BoundaryState,
    displaying_error: bool,
    failure: Option<String>,
}

/// Root error boundary.
#[derive(Default)]
pub struct ErrorBoundary {
    inner: Mutex<BoundaryInner>,
}

impl ErrorBoundary {
    /// Boundary in the `Normal` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current render state.
    pub fn state(&self) -> BoundaryState {
        self.inner.lock().state
    }

    /// `true` between rendering the error view and the next tick.
    pub fn is_displaying_error(&self) -> bool {
        self.inner.lock().displaying_error
    }

    /// Decide what to render.
    pub fn render(
        &self,
        error: Option<&AppError>,
        route: &RouteSnapshot,
        child_key: Option<&str>,
        paths: &PathCompiler,
    ) -> BoundaryView {
        let mut inner = self.inner.lock();

        let Some(error) = error else {
            inner.state = BoundaryState::Normal;
            return BoundaryView::Page {
                key: page_key(route, child_key, paths),
            };
        };

        if let Some(fallback) = inner.failure.as_deref().map(FallbackView::new) {
            inner.state = BoundaryState::ErrorInError;
            return BoundaryView::Fallback(fallback);
        }

        inner.state = BoundaryState::ShowingError;
        inner.displaying_error = true;
        BoundaryView::ErrorView {
            error: error.clone(),
        }
    }

    /// Render for the shell's active error and current route.
    pub fn render_shell(&self, shell: &Shell, child_key: Option<&str>) -> BoundaryView {
        let route = shell.current_route().unwrap_or_default();
        self.render(
            shell.error_state().error.as_ref(),
            &route,
            child_key,
            shell.paths(),
        )
    }

    /// Offer a failure raised below the boundary.
    ///
    /// Returns `true` if it came from the error view; the host must then
    /// render again. Other failures are not handled here.
    pub fn capture(&self, failure: impl fmt::Display) -> bool {
        let mut inner = self.inner.lock();
        if !inner.displaying_error {
            return false;
        }
        let failure = failure.to_string();
        warn_log!("Error view failed: {}", failure);
        inner.failure = Some(failure);
        true
    }

    /// Disarm the one-shot flags. Call once per render tick.
    pub fn tick(&self) {
        let mut inner = self.inner.lock();
        if inner.displaying_error || inner.failure.is_some() {
            trace_log!("Error boundary tick ({:?})", inner.state);
        }
        inner.displaying_error = false;
        inner.failure = None;
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}

/// Key of the page rendered for `route`.
///
/// 1. `child_key`, or the first segment's resolved path when the route is
///    nested;
/// 2. the first page's declared key;
/// 3. the path, with a trailing slash stripped unless the matched template
///    ends with one.
pub fn page_key(route: &RouteSnapshot, child_key: Option<&str>, paths: &PathCompiler) -> String {
    if let Some(key) = child_key {
        return key.to_string();
    }

    let Some(first) = route.matched.first() else {
        return route.path.clone();
    };

    if route.matched.len() > 1 {
        return paths
            .resolve(&first.path, &route.params)
            .unwrap_or_else(|_| first.path.clone());
    }

    let declared = first
        .default_view()
        .and_then(|slot| slot.resolved())
        .and_then(|definition| definition.declared_key().map(|key| key.resolve(route)));
    if let Some(key) = declared {
        return key;
    }

    if first.path.ends_with('/') {
        route.path.clone()
    } else {
        route.path.trim_end_matches('/').to_string()
    }
}
