//! Route diff engine.
//!
//! Classifies a navigation by comparing the incoming and outgoing snapshots.
//! The three kinds are mutually exclusive and checked in priority order:
//!
//! 1. **route**: an error is currently shown, or the route name differs
//! 2. **param**: otherwise, the path differs
//! 3. **query**: otherwise, the full path (path plus query) differs
//!
//! When none apply the navigation is a no-op and the pipeline stops right
//! after classification.
//!
//! The result is a [`NavigationState`], the transient record of one in-flight
//! navigation. It also carries the resolved paths of the outgoing route (the
//! baseline for per-depth refresh decisions), the refresh decision recorded
//! for every depth, and the trail of pipeline phases.

use crate::error::ErrorStamp;
use crate::RouteSnapshot;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of change a navigation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteChange {
    /// A different route (or an error is active).
    Route,
    /// Same route, different path params.
    Param,
    /// Same path, different query string.
    Query,
    /// Nothing changed.
    Unchanged,
}

impl RouteChange {
    /// `routeChanged` flag.
    pub fn route_changed(self) -> bool {
        self == Self::Route
    }

    /// `paramChanged` flag.
    pub fn param_changed(self) -> bool {
        self == Self::Param
    }

    /// `queryChanged` flag.
    pub fn query_changed(self) -> bool {
        self == Self::Query
    }

    /// `true` when none of the flags is set.
    pub fn is_unchanged(self) -> bool {
        self == Self::Unchanged
    }
}

/// Classify a navigation from `from` to `to`.
///
/// `error_active` forces [`RouteChange::Route`] so that a navigation away
/// from an error page always runs the whole pipeline.
pub fn classify(to: &RouteSnapshot, from: &RouteSnapshot, error_active: bool) -> RouteChange {
    if error_active || to.name != from.name {
        RouteChange::Route
    } else if to.path != from.path {
        RouteChange::Param
    } else if to.full_path != from.full_path {
        RouteChange::Query
    } else {
        RouteChange::Unchanged
    }
}

/// Phases of the navigation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationPhase {
    /// Waiting for a navigation.
    Idle,
    /// Loading the incoming route's components.
    Resolving,
    /// Classifying the change.
    Diffing,
    /// Running the global middleware chain.
    RunningGlobalMiddleware,
    /// Resolving and loading the page layout.
    ResolvingLayout,
    /// Running layout and page middleware.
    RunningScopedMiddleware,
    /// Running validation predicates.
    Validating,
    /// Running data loaders.
    Fetching,
    /// Applying transitions and completing.
    Committing,
    /// Recording an error and showing the error layout.
    ErrorRecovery,
    /// Finished.
    Done,
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Refresh decision recorded for one depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    /// Depth in the flattened component list.
    pub depth: usize,
    /// Component id at that depth.
    pub component: String,
    /// Component version at that depth.
    pub version: u64,
    /// Refresh demanded by the route, param, or query rule.
    pub data_refresh: bool,
    /// Loaders actually ran (also `true` after an error or before mount).
    pub needs_refresh: bool,
}

/// Transient state of one in-flight navigation.
#[derive(Debug)]
pub struct NavigationState {
    id: u64,
    change: RouteChange,
    query_diff: BTreeSet<String>,
    spa_fallback: bool,
    previous_resolved_paths: Vec<String>,
    had_error: bool,
    error_stamp_at_start: Option<ErrorStamp>,
    refresh: Mutex<Vec<RefreshRecord>>,
    phases: Mutex<Vec<NavigationPhase>>,
}

impl NavigationState {
    /// Classify `to` against `from` and record the baseline.
    pub fn new(
        id: u64,
        to: &RouteSnapshot,
        from: &RouteSnapshot,
        error_active: bool,
        error_stamp: Option<ErrorStamp>,
        previous_resolved_paths: Vec<String>,
    ) -> Self {
        let change = classify(to, from, error_active);
        let query_diff = if change.query_changed() {
            to.query.diff(&from.query)
        } else {
            BTreeSet::new()
        };

        Self {
            id,
            change,
            query_diff,
            spa_fallback: false,
            previous_resolved_paths,
            had_error: error_active,
            error_stamp_at_start: error_stamp,
            refresh: Mutex::new(Vec::new()),
            phases: Mutex::new(vec![NavigationPhase::Idle]),
        }
    }

    /// State for the first render of a page that was not server-rendered.
    ///
    /// No flag is set, there is no previous path baseline, and the pipeline
    /// runs anyway.
    pub fn bootstrap(id: u64, error_active: bool, error_stamp: Option<ErrorStamp>) -> Self {
        Self {
            id,
            change: RouteChange::Unchanged,
            query_diff: BTreeSet::new(),
            spa_fallback: true,
            previous_resolved_paths: Vec::new(),
            had_error: error_active,
            error_stamp_at_start: error_stamp,
            refresh: Mutex::new(Vec::new()),
            phases: Mutex::new(vec![NavigationPhase::Idle]),
        }
    }

    /// Navigation id (logging only).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Classification result.
    pub fn change(&self) -> RouteChange {
        self.change
    }

    /// Query keys whose values changed (only for query navigations).
    pub fn query_diff(&self) -> &BTreeSet<String> {
        &self.query_diff
    }

    /// `true` for the first client render of a non-server-rendered page.
    pub fn is_spa_fallback(&self) -> bool {
        self.spa_fallback
    }

    /// Resolved paths of the outgoing route, by depth.
    pub fn previous_resolved_paths(&self) -> &[String] {
        &self.previous_resolved_paths
    }

    /// Previous resolved path at `depth`.
    pub fn previous_path(&self, depth: usize) -> Option<&str> {
        self.previous_resolved_paths.get(depth).map(String::as_str)
    }

    /// `true` if an error was shown when the navigation started.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Error stamp observed when the navigation started.
    pub fn error_stamp_at_start(&self) -> Option<ErrorStamp> {
        self.error_stamp_at_start
    }

    /// Record the refresh decision for one depth.
    pub fn record_refresh(&self, record: RefreshRecord) {
        let mut refresh = self.refresh.lock();
        refresh.retain(|r| r.depth != record.depth);
        refresh.push(record);
    }

    /// Refresh decision for `depth`, if one was recorded.
    pub fn refresh_at(&self, depth: usize) -> Option<RefreshRecord> {
        self.refresh.lock().iter().find(|r| r.depth == depth).cloned()
    }

    /// Enter a phase.
    pub fn enter(&self, phase: NavigationPhase) {
        crate::trace_log!("Navigation #{} -> {}", self.id, phase);
        self.phases.lock().push(phase);
    }

    /// Current phase.
    pub fn phase(&self) -> NavigationPhase {
        self.phases
            .lock()
            .last()
            .copied()
            .unwrap_or(NavigationPhase::Idle)
    }

    /// Every phase entered so far, in order.
    pub fn phases(&self) -> Vec<NavigationPhase> {
        self.phases.lock().clone()
    }
}
