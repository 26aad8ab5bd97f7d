//! Navigation context handed to every hook.
//!
//! A [`NavigationContext`] is a cheap, cloneable handle onto one navigation:
//! the incoming and outgoing routes, the shell, and the navigation's
//! [`Completion`]. Hooks use it to read the route, to redirect, and to raise
//! errors.
//!
//! # Completion
//!
//! The router waits for exactly one answer per navigation: proceed,
//! redirect, or abort. [`Completion`] guards that contract: the first call
//! wins and every later call is ignored, so a redirect raised while loaders
//! are still running can never be followed by a second "proceed".
//!
//! # Example
//!
//! ```
//! use shell_navigator::{NavigationContext, NavigationError, RouteSnapshot, Shell};
//! use shell_navigator::context::NextAction;
//!
//! let shell = Shell::builder().build();
//! let route = RouteSnapshot::new("/private").shared();
//! let from = RouteSnapshot::new("/").shared();
//! let ctx = NavigationContext::detached(shell, route, from);
//!
//! let err = ctx.redirect("/login");
//! assert!(matches!(err, NavigationError::Redirect { .. }));
//! assert_eq!(ctx.completion().outcome(), Some(NextAction::Redirect("/login".into())));
//! ```

use crate::diff::NavigationState;
use crate::error::{AppError, NavigationError};
use crate::{debug_log, trace_log, QueryParams, RouteParams, RouteSnapshot, Shell};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Completion
// ============================================================================

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Confirm the navigation.
    Proceed,
    /// Navigate to this location instead.
    Redirect(String),
    /// Drop the navigation (the page is being reloaded).
    Abort,
}

/// Router callback receiving the navigation's outcome.
pub type CompletionFn = Box<dyn FnOnce(NextAction) + Send>;

/// At-most-once guard around the router's completion callback.
pub struct Completion {
    callback: Mutex<Option<CompletionFn>>,
    outcome: Mutex<Option<NextAction>>,
}

impl Completion {
    /// Wrap a router callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(NextAction) + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
            outcome: Mutex::new(None),
        }
    }

    /// A completion that only records the outcome.
    pub fn recording() -> Self {
        Self {
            callback: Mutex::new(None),
            outcome: Mutex::new(None),
        }
    }

    /// Deliver `action`. Returns `false` if an outcome was already delivered.
    pub fn complete(&self, action: NextAction) -> bool {
        {
            let mut outcome = self.outcome.lock();
            if outcome.is_some() {
                trace_log!("Completion already called, ignoring {:?}", action);
                return false;
            }
            *outcome = Some(action.clone());
        }

        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(action);
        }
        true
    }

    /// The delivered outcome, if any.
    pub fn outcome(&self) -> Option<NextAction> {
        self.outcome.lock().clone()
    }

    /// `true` once an outcome was delivered.
    pub fn is_completed(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("outcome", &self.outcome())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NavigationContext
// ============================================================================

/// Handle onto one navigation, passed to middleware, validators and loaders.
#[derive(Clone)]
pub struct NavigationContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    shell: Shell,
    route: Arc<RouteSnapshot>,
    from: Arc<RouteSnapshot>,
    navigation: Arc<NavigationState>,
    completion: Arc<Completion>,
    redirected: AtomicBool,
    errored: AtomicBool,
}

impl NavigationContext {
    pub(crate) fn new(
        shell: Shell,
        route: Arc<RouteSnapshot>,
        from: Arc<RouteSnapshot>,
        navigation: Arc<NavigationState>,
        completion: Arc<Completion>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                shell,
                route,
                from,
                navigation,
                completion,
                redirected: AtomicBool::new(false),
                errored: AtomicBool::new(false),
            }),
        }
    }

    /// Context outside of a router navigation (refresh, layout evaluation,
    /// tests). Its completion only records the outcome.
    pub fn detached(shell: Shell, route: Arc<RouteSnapshot>, from: Arc<RouteSnapshot>) -> Self {
        let error = shell.error_state();
        let navigation = Arc::new(NavigationState::bootstrap(
            0,
            error.is_errored(),
            error.stamp,
        ));
        Self::new(shell, route, from, navigation, Arc::new(Completion::recording()))
    }

    /// Incoming route.
    pub fn route(&self) -> &Arc<RouteSnapshot> {
        &self.inner.route
    }

    /// Outgoing route.
    pub fn from(&self) -> &Arc<RouteSnapshot> {
        &self.inner.from
    }

    /// Params of the incoming route.
    pub fn params(&self) -> &RouteParams {
        &self.inner.route.params
    }

    /// Query of the incoming route.
    pub fn query(&self) -> &QueryParams {
        &self.inner.route.query
    }

    /// The shell running the navigation.
    pub fn shell(&self) -> &Shell {
        &self.inner.shell
    }

    /// State of the navigation.
    pub fn navigation(&self) -> &Arc<NavigationState> {
        &self.inner.navigation
    }

    /// The navigation's completion guard.
    pub fn completion(&self) -> &Completion {
        &self.inner.completion
    }

    /// Redirect the navigation to `location`.
    ///
    /// The progress indicator is finished when `location` is the page being
    /// left, paused otherwise. Completion receives the redirect unless it was
    /// already called. Returns the sentinel error a hook should propagate to
    /// unwind the pipeline.
    pub fn redirect(&self, location: impl Into<String>) -> NavigationError {
        let location = location.into();
        let target_path = location.split(['?', '#']).next().unwrap_or_default();

        let progress = self.shell().progress();
        if target_path == self.from().path {
            progress.finish();
        } else {
            progress.pause();
        }

        self.inner.redirected.store(true, Ordering::SeqCst);
        if self
            .inner
            .completion
            .complete(NextAction::Redirect(location.clone()))
        {
            debug_log!(
                "Navigation #{} redirected to '{}'",
                self.navigation().id(),
                location
            );
        }
        NavigationError::Redirect { to: location }
    }

    /// Raise an error through the shell's error entry point.
    pub fn error(&self, error: impl Into<AppError>) -> AppError {
        let error = error.into();
        self.inner.errored.store(true, Ordering::SeqCst);
        self.shell().error(Some(error.clone()));
        error
    }

    /// `true` if a hook raised an error during this navigation.
    pub fn is_errored(&self) -> bool {
        self.inner.errored.load(Ordering::SeqCst)
    }

    /// `true` if a hook redirected this navigation.
    pub fn is_redirected(&self) -> bool {
        self.inner.redirected.load(Ordering::SeqCst)
    }

    /// `true` once completion was called, for any outcome.
    pub fn is_completed(&self) -> bool {
        self.inner.completion.is_completed()
    }

    pub(crate) fn proceed(&self) -> bool {
        self.inner.completion.complete(NextAction::Proceed)
    }

    pub(crate) fn abort(&self) -> bool {
        self.inner.completion.complete(NextAction::Abort)
    }
}

impl fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContext")
            .field("navigation", &self.navigation().id())
            .field("to", &self.route().full_path)
            .field("from", &self.from().full_path)
            .field("redirected", &self.is_redirected())
            .field("errored", &self.is_errored())
            .finish()
    }
}
