//! Router seam and a reference router.
//!
//! The shell never matches locations itself. It consumes a router through
//! [`RouterContract`]: resolve a location into a [`RouteSnapshot`], report
//! the current route, push a new location. Any router that can produce
//! snapshots plugs in.
//!
//! With the `router` feature the crate ships one: [`RouteTable`] compiles a
//! tree of [`RouteRecord`]s into a `matchit` matcher, and [`HistoryRouter`]
//! drives the shell's before/after hooks around it, following redirects.
//!
//! ```
//! # #[cfg(feature = "router")]
//! # {
//! use shell_navigator::component::ComponentDefinition;
//! use shell_navigator::router::{RouteRecord, RouteTable};
//!
//! let table = RouteTable::new(vec![RouteRecord::new(
//!     "/users",
//!     ComponentDefinition::new("users"),
//! )
//! .child(RouteRecord::new(":id", ComponentDefinition::new("user")).name("user"))]);
//!
//! let route = table.resolve("/users/42?tab=posts");
//! assert_eq!(route.name.as_deref(), Some("user"));
//! assert_eq!(route.params.get("id"), Some("42"));
//! assert_eq!(route.query.get("tab"), Some("posts"));
//! assert_eq!(route.matched.len(), 2);
//! # }
//! ```

use crate::component::ComponentSlot;
use crate::error::{HookResult, NavigationError};
use crate::route::{NamedView, DEFAULT_VIEW};
use crate::{error_log, RouteSnapshot};
use futures::future::BoxFuture;
use std::sync::Arc;

#[cfg(feature = "router")]
use crate::controller::{Hydration, MountOutcome};
#[cfg(feature = "router")]
use crate::context::NextAction;
#[cfg(feature = "router")]
use crate::params::decode_uri_component;
#[cfg(feature = "router")]
use crate::route::MatchedRoute;
#[cfg(feature = "router")]
use crate::{debug_log, warn_log, QueryParams, RouteParams, Shell};
#[cfg(feature = "router")]
use futures::FutureExt;
#[cfg(feature = "router")]
use parking_lot::RwLock;
#[cfg(feature = "router")]
use regex::Regex;

/// What the shell needs from a router.
pub trait RouterContract: Send + Sync {
    /// Resolve a location (path, optional query and hash) into a snapshot.
    fn resolve(&self, location: &str) -> Arc<RouteSnapshot>;

    /// The route currently shown.
    fn current_route(&self) -> Arc<RouteSnapshot>;

    /// Navigate to `location`, resolving once the navigation committed.
    fn push(&self, location: String) -> BoxFuture<'static, HookResult<Arc<RouteSnapshot>>>;

    /// Report an error the shell could not handle.
    fn on_error(&self, error: &NavigationError) {
        error_log!("Router error: {}", error);
    }
}

// ============================================================================
// Route records
// ============================================================================

/// Declaration of one route and its children.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    path: String,
    name: Option<String>,
    views: Vec<NamedView>,
    children: Vec<RouteRecord>,
}

impl RouteRecord {
    /// Route rendering `component` in its default view.
    ///
    /// A child path without a leading `/` is relative to its parent.
    pub fn new(path: impl Into<String>, component: impl Into<ComponentSlot>) -> Self {
        Self::empty(path).view(DEFAULT_VIEW, component)
    }

    /// Route with no views (a pure grouping segment).
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            views: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the route name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind a component to a named view.
    pub fn view(mut self, name: impl Into<String>, component: impl Into<ComponentSlot>) -> Self {
        self.views.push(NamedView {
            name: name.into(),
            slot: Arc::new(component.into()),
        });
        self
    }

    /// Add a child route.
    pub fn child(mut self, child: RouteRecord) -> Self {
        self.children.push(child);
        self
    }

    /// Add several child routes.
    pub fn children(mut self, children: impl IntoIterator<Item = RouteRecord>) -> Self {
        self.children.extend(children);
        self
    }

    /// Path as declared.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Join a child path onto its parent's full path.
pub fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_string();
    }
    if child.is_empty() {
        return if parent.is_empty() { "/".to_string() } else { parent.to_string() };
    }
    format!("{}/{}", parent.trim_end_matches('/'), child)
}

/// Expand a path template into `matchit` patterns.
///
/// `:id` becomes `{id}`, `:rest*` and `:rest+` become `{*rest}`. Optional
/// and `*` parameters produce one pattern with and one without the segment.
/// Constraints in parentheses are left out; see [`param_constraints`].
pub fn matcher_patterns(template: &str) -> Vec<String> {
    let mut patterns = vec![String::new()];

    for segment in template.split('/').filter(|s| !s.is_empty()) {
        let Some(param) = segment.strip_prefix(':') else {
            for pattern in &mut patterns {
                pattern.push('/');
                pattern.push_str(segment);
            }
            continue;
        };

        let modifier = param.chars().last().filter(|m| matches!(m, '?' | '*' | '+'));
        let name = param.split(['(', '?', '*', '+']).next().unwrap_or(param);
        let piece = match modifier {
            Some('*' | '+') => format!("/{{*{name}}}"),
            _ => format!("/{{{name}}}"),
        };

        let optional = matches!(modifier, Some('?' | '*'));
        let mut next = Vec::with_capacity(patterns.len() * 2);
        for pattern in patterns {
            if optional {
                next.push(pattern.clone());
            }
            next.push(pattern + &piece);
        }
        patterns = next;
    }

    for pattern in &mut patterns {
        if pattern.is_empty() {
            pattern.push('/');
        }
    }
    patterns.dedup();
    patterns
}

/// `(name, pattern)` for every `:name(pattern)` parameter of `template`.
pub fn param_constraints(template: &str) -> Vec<(String, String)> {
    template
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter_map(|param| {
            let (name, rest) = param.split_once('(')?;
            let (pattern, _) = rest.rsplit_once(')')?;
            Some((name.to_string(), pattern.to_string()))
        })
        .collect()
}

#[cfg(feature = "router")]
fn split_location(location: &str) -> (&str, &str) {
    let location = location.split('#').next().unwrap_or(location);
    location.split_once('?').unwrap_or((location, ""))
}

// ============================================================================
// RouteTable
// ============================================================================

#[cfg(feature = "router")]
#[derive(Debug, Clone)]
struct RouteChain {
    name: Option<String>,
    segments: Vec<MatchedRoute>,
    constraints: Vec<(String, Regex)>,
}

#[cfg(feature = "router")]
impl RouteChain {
    fn accepts(&self, params: &RouteParams) -> bool {
        self.constraints
            .iter()
            .all(|(name, re)| params.get(name).map_or(true, |value| re.is_match(value)))
    }
}

#[cfg(feature = "router")]
fn compile_constraints(template: &str) -> Vec<(String, Regex)> {
    param_constraints(template)
        .into_iter()
        .filter_map(|(name, pattern)| match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(re) => Some((name, re)),
            Err(err) => {
                warn_log!("Constraint of ':{}' in '{}' ignored: {}", name, template, err);
                None
            }
        })
        .collect()
}

/// Compiled route tree backed by `matchit`.
#[cfg(feature = "router")]
pub struct RouteTable {
    matcher: matchit::Router<usize>,
    chains: Vec<RouteChain>,
}

#[cfg(feature = "router")]
impl RouteTable {
    /// Compile `records`.
    ///
    /// Every record is matchable at its full path. Children are inserted
    /// before their parent, so a child with an empty path wins over it.
    pub fn new(records: Vec<RouteRecord>) -> Self {
        let mut table = Self {
            matcher: matchit::Router::new(),
            chains: Vec::new(),
        };
        for record in &records {
            table.insert(record, "", &[]);
        }
        table
    }

    fn insert(&mut self, record: &RouteRecord, parent_path: &str, ancestors: &[MatchedRoute]) {
        let full_path = join_paths(parent_path, &record.path);
        let segment = MatchedRoute {
            path: full_path.clone(),
            views: record.views.clone(),
        };
        let mut chain = ancestors.to_vec();
        chain.push(segment);

        for child in &record.children {
            self.insert(child, &full_path, &chain);
        }

        let index = self.chains.len();
        let mut inserted = false;
        for pattern in matcher_patterns(&full_path) {
            match self.matcher.insert(pattern.as_str(), index) {
                Ok(()) => inserted = true,
                Err(err) => debug_log!("Route pattern '{}' skipped: {}", pattern, err),
            }
        }
        if inserted {
            self.chains.push(RouteChain {
                name: record.name.clone(),
                constraints: compile_constraints(&full_path),
                segments: chain,
            });
        } else {
            warn_log!("Route '{}' is shadowed by another route", full_path);
        }
    }

    /// Number of matchable routes.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// `true` if no route was registered.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Resolve `location`. Unmatched locations yield a snapshot with no
    /// matched segments.
    pub fn resolve(&self, location: &str) -> Arc<RouteSnapshot> {
        let (path, query) = split_location(location);
        let path = if path.is_empty() { "/" } else { path };
        let mut snapshot = RouteSnapshot::new(path).query(QueryParams::from_query_string(query));

        let found = self.matcher.at(path).ok().or_else(|| {
            let trimmed = path.trim_end_matches('/');
            (trimmed.len() < path.len() && !trimmed.is_empty())
                .then(|| self.matcher.at(trimmed).ok())
                .flatten()
        });

        let Some(found) = found else {
            debug_log!("No route matched '{}'", path);
            return snapshot.shared();
        };
        let Some(chain) = self.chains.get(*found.value) else {
            return snapshot.shared();
        };

        let params = found
            .params
            .iter()
            .map(|(key, value)| (key, decode_uri_component(value)))
            .collect::<RouteParams>();
        if !chain.accepts(&params) {
            debug_log!("'{}' rejected by a parameter constraint", path);
            return snapshot.shared();
        }
        snapshot.params = params;
        snapshot.name = chain.name.clone();
        snapshot.matched = chain.segments.clone();
        snapshot.shared()
    }
}

#[cfg(feature = "router")]
impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.chains.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HistoryRouter
// ============================================================================

/// Maximum redirects followed by one push.
#[cfg(feature = "router")]
const MAX_REDIRECT_DEPTH: usize = 5;

/// In-memory router driving a [`Shell`] over a [`RouteTable`].
#[cfg(feature = "router")]
#[derive(Clone)]
pub struct HistoryRouter {
    inner: Arc<HistoryInner>,
}

#[cfg(feature = "router")]
struct HistoryInner {
    shell: Shell,
    table: RouteTable,
    current: RwLock<Arc<RouteSnapshot>>,
    history: RwLock<Vec<String>>,
}

#[cfg(feature = "router")]
impl HistoryRouter {
    /// Router positioned on `initial` without running any navigation.
    pub fn new(shell: Shell, table: RouteTable, initial: &str) -> Self {
        let current = table.resolve(initial);
        Self {
            inner: Arc::new(HistoryInner {
                shell,
                table,
                current: RwLock::new(current),
                history: RwLock::new(vec![initial.to_string()]),
            }),
        }
    }

    /// The shell this router drives.
    pub fn shell(&self) -> &Shell {
        &self.inner.shell
    }

    /// Committed locations, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.inner.history.read().clone()
    }

    /// Mount the shell on the initial location.
    pub async fn start(&self, hydration: Hydration) -> HookResult<MountOutcome> {
        let shell = self.inner.shell.clone();
        shell.mount(self, hydration).await
    }

    async fn navigate(inner: Arc<HistoryInner>, location: String) -> HookResult<Arc<RouteSnapshot>> {
        let mut target = location;

        for _ in 0..MAX_REDIRECT_DEPTH {
            let to = inner.table.resolve(&target);
            let from = Arc::clone(&*inner.current.read());
            let report = inner
                .shell
                .navigate(Arc::clone(&to), Arc::clone(&from))
                .await;

            match report.outcome {
                Some(NextAction::Proceed) => {
                    *inner.current.write() = Arc::clone(&to);
                    inner.history.write().push(to.full_path.clone());
                    inner.shell.after_each(&to, &from);
                    return Ok(to);
                }
                Some(NextAction::Redirect(next)) => {
                    debug_log!("Following redirect '{}' → '{}'", target, next);
                    target = next;
                }
                Some(NextAction::Abort) | None => {
                    return Err(NavigationError::Message(format!(
                        "Navigation to '{}' was aborted",
                        target
                    )));
                }
            }
        }

        error_log!(
            "Redirect loop detected (depth {}) navigating to '{}'",
            MAX_REDIRECT_DEPTH,
            target
        );
        Err(NavigationError::Message(format!(
            "Redirect loop detected (depth {}): target '{}'",
            MAX_REDIRECT_DEPTH, target
        )))
    }
}

#[cfg(feature = "router")]
impl RouterContract for HistoryRouter {
    fn resolve(&self, location: &str) -> Arc<RouteSnapshot> {
        self.inner.table.resolve(location)
    }

    fn current_route(&self) -> Arc<RouteSnapshot> {
        Arc::clone(&*self.inner.current.read())
    }

    fn push(&self, location: String) -> BoxFuture<'static, HookResult<Arc<RouteSnapshot>>> {
        Self::navigate(Arc::clone(&self.inner), location).boxed()
    }
}

#[cfg(feature = "router")]
impl std::fmt::Debug for HistoryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRouter")
            .field("current", &self.inner.current.read().full_path)
            .field("table", &self.inner.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/users", ":id"), "/users/:id");
        assert_eq!(join_paths("/users/", "new"), "/users/new");
        assert_eq!(join_paths("/users", "/about"), "/about");
        assert_eq!(join_paths("/users", ""), "/users");
        assert_eq!(join_paths("", ""), "/");
    }

    #[test]
    fn test_matcher_patterns() {
        assert_eq!(matcher_patterns("/"), vec!["/"]);
        assert_eq!(matcher_patterns("/users/:id"), vec!["/users/{id}"]);
        assert_eq!(
            matcher_patterns("/users/:id/:tab?"),
            vec!["/users/{id}", "/users/{id}/{tab}"]
        );
        assert_eq!(matcher_patterns("/files/:path*"), vec!["/files", "/files/{*path}"]);
        assert_eq!(matcher_patterns("/items/:id(\\d+)"), vec!["/items/{id}"]);
    }

    #[test]
    fn test_param_constraints() {
        assert_eq!(
            param_constraints("/items/:id(\\d+)/:tab?"),
            vec![("id".to_string(), "\\d+".to_string())]
        );
        assert!(param_constraints("/users/:id").is_empty());
    }

    #[cfg(feature = "router")]
    #[test]
    fn test_split_location() {
        assert_eq!(split_location("/a?x=1#top"), ("/a", "x=1"));
        assert_eq!(split_location("/a#top"), ("/a", ""));
    }

    #[cfg(feature = "router")]
    mod table {
        use super::super::*;
        use crate::component::ComponentDefinition;

        fn table() -> RouteTable {
            RouteTable::new(vec![
                RouteRecord::new("/", ComponentDefinition::new("home")).name("home"),
                RouteRecord::new("/users", ComponentDefinition::new("users"))
                    .name("users")
                    .child(
                        RouteRecord::new(":id", ComponentDefinition::new("user"))
                            .name("user")
                            .view("sidebar", ComponentDefinition::new("user-sidebar")),
                    ),
                RouteRecord::new("/docs/:page*", ComponentDefinition::new("docs")),
                RouteRecord::new("/items/:id(\\d+)", ComponentDefinition::new("item")).name("item"),
            ])
        }

        #[test]
        fn test_resolve_nested() {
            let route = table().resolve("/users/a%20b");
            assert_eq!(route.name.as_deref(), Some("user"));
            assert_eq!(route.params.get("id"), Some("a b"));
            assert_eq!(route.matched.len(), 2);
            assert_eq!(route.matched[1].path, "/users/:id");
            assert_eq!(route.matched_components().len(), 3);
        }

        #[test]
        fn test_parent_is_matchable() {
            let route = table().resolve("/users/");
            assert_eq!(route.name.as_deref(), Some("users"));
            assert_eq!(route.matched.len(), 1);
        }

        #[test]
        fn test_catch_all() {
            let table = table();
            assert_eq!(table.resolve("/docs/a/b").params.get("page"), Some("a/b"));
            assert_eq!(table.resolve("/docs").matched.len(), 1);
        }

        #[test]
        fn test_constraint_rejects_param() {
            let table = table();
            let route = table.resolve("/items/42");
            assert_eq!(route.name.as_deref(), Some("item"));
            assert_eq!(route.params.get("id"), Some("42"));

            let route = table.resolve("/items/abc");
            assert!(route.matched.is_empty());
            assert!(route.params.is_empty());
        }

        #[test]
        fn test_unmatched() {
            let route = table().resolve("/missing?x=1");
            assert!(route.matched.is_empty());
            assert_eq!(route.full_path, "/missing?x=1");
        }
    }
}
