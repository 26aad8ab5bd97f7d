//! Page components and their declarative hooks.
//!
//! A [`ComponentDefinition`] is what the router binds to a matched segment.
//! The shell never renders it; it only reads the declarations:
//!
//! | Declaration | Used by |
//! |-------------|---------|
//! | `layout` | layout resolver (first matched component only) |
//! | `middleware` | scoped middleware chain |
//! | `validate` | validation gate (falsy result → 404) |
//! | `async_data` / `fetch` | data-fetch coordinator |
//! | `watch_query` / `watch_param` | refresh decision table |
//! | `loading(false)` | manual progress mode |
//! | `transition` | transition mapper |
//! | `key` | page key of the error boundary |
//! | `data` | initial state of live instances |
//!
//! Identity is explicit: a component has a stable [`ComponentId`] and a
//! `version` that a hot-reload bumps. Two definitions are "the same
//! component" iff both match.
//!
//! # Example
//!
//! ```
//! use shell_navigator::component::{ComponentDefinition, WatchQuery};
//! use serde_json::json;
//!
//! let users = ComponentDefinition::new("users")
//!     .layout("admin")
//!     .middleware("auth")
//!     .watch_query(WatchQuery::keys(["sort", "page"]))
//!     .async_data(|ctx| async move {
//!         let mut data = serde_json::Map::new();
//!         data.insert("page".into(), json!(ctx.query().get("page")));
//!         Ok(data)
//!     });
//! assert_eq!(users.id().as_str(), "users");
//! ```

use crate::context::NavigationContext;
use crate::error::{HookResult, NavigationError};
use crate::middleware::{Middleware, MiddlewareRef};
use crate::transition::TransitionDecl;
use crate::{trace_log, QueryParams, RouteSnapshot};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reactive state of a component instance.
pub type PageData = serde_json::Map<String, Value>;

/// Async data loader: result is merged into the component's state.
pub type AsyncDataFn = Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, HookResult<PageData>> + Send + Sync>;

/// Legacy fetch hook: runs for its side effects only.
pub type FetchFn = Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Validation predicate.
pub type ValidateFn = Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, HookResult<bool>> + Send + Sync>;

/// Initial state factory for live instances.
pub type DataFn = Arc<dyn Fn() -> PageData + Send + Sync>;

/// Watch-query predicate: `(instance, next_query, previous_query)`.
pub type WatchQueryFn =
    Arc<dyn Fn(Option<&ComponentInstance>, &QueryParams, &QueryParams) -> bool + Send + Sync>;

/// Loader of a lazily resolved component.
pub type ComponentLoader =
    Arc<dyn Fn() -> BoxFuture<'static, HookResult<ComponentDefinition>> + Send + Sync>;

// ============================================================================
// Identity
// ============================================================================

/// Stable identity of a component across hot reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Arc<str>);

impl ComponentId {
    /// Create an id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A value declared either literally or as a function of the navigation.
pub enum Declared<T> {
    /// Fixed value.
    Literal(T),
    /// Computed from the context each time it is needed.
    Computed(Arc<dyn Fn(&NavigationContext) -> T + Send + Sync>),
}

impl<T: Clone> Declared<T> {
    /// Produce the value for `ctx`.
    pub fn resolve(&self, ctx: &NavigationContext) -> T {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(f) => f(ctx),
        }
    }

    /// Build a computed declaration.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&NavigationContext) -> T + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }
}

impl<T: Clone> Clone for Declared<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Declared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Which query changes make a component reload its data.
#[derive(Clone, Default)]
pub enum WatchQuery {
    /// Query changes never refresh (the default).
    #[default]
    Disabled,
    /// Any query change refreshes.
    All,
    /// Refresh when one of these keys changed.
    Keys(BTreeSet<String>),
    /// Ask the live instance.
    Predicate(WatchQueryFn),
}

impl WatchQuery {
    /// Watch a fixed set of keys.
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Decide with a predicate over `(instance, next_query, previous_query)`.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&ComponentInstance>, &QueryParams, &QueryParams) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluate the policy for a query-only navigation.
    pub fn selects(
        &self,
        query_diff: &BTreeSet<String>,
        instance: Option<&ComponentInstance>,
        next: &QueryParams,
        previous: &QueryParams,
    ) -> bool {
        match self {
            Self::Disabled => false,
            Self::All => true,
            Self::Keys(keys) => keys.iter().any(|key| query_diff.contains(key)),
            Self::Predicate(f) => f(instance, next, previous),
        }
    }
}

impl fmt::Debug for WatchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::All => f.write_str("All"),
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Declared page key, used by the error boundary to key the rendered page.
#[derive(Clone)]
pub enum ComponentKey {
    /// Fixed key.
    Literal(String),
    /// Derived from the route.
    Computed(Arc<dyn Fn(&RouteSnapshot) -> String + Send + Sync>),
}

impl ComponentKey {
    /// Produce the key for `route`.
    pub fn resolve(&self, route: &RouteSnapshot) -> String {
        match self {
            Self::Literal(key) => key.clone(),
            Self::Computed(f) => f(route),
        }
    }
}

// ============================================================================
// ComponentDefinition
// ============================================================================

/// A page component as seen by the navigation pipeline.
#[derive(Clone)]
pub struct ComponentDefinition {
    id: ComponentId,
    version: u64,
    layout: Option<Declared<String>>,
    middleware: Vec<MiddlewareRef>,
    async_data: Option<AsyncDataFn>,
    fetch: Option<FetchFn>,
    validate: Option<ValidateFn>,
    data: Option<DataFn>,
    watch_query: WatchQuery,
    watch_param: bool,
    loading: bool,
    key: Option<ComponentKey>,
    transition: Option<TransitionDecl>,
}

impl ComponentDefinition {
    /// Create a component with no declarations.
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            layout: None,
            middleware: Vec::new(),
            async_data: None,
            fetch: None,
            validate: None,
            data: None,
            watch_query: WatchQuery::Disabled,
            watch_param: true,
            loading: true,
            key: None,
            transition: None,
        }
    }

    /// Set the definition version (bumped by hot reloads).
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Declare a fixed layout.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(Declared::Literal(layout.into()));
        self
    }

    /// Declare a layout computed from the navigation context.
    pub fn layout_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&NavigationContext) -> String + Send + Sync + 'static,
    {
        self.layout = Some(Declared::computed(f));
        self
    }

    /// Append a middleware by registered name.
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(MiddlewareRef::Named(name.into()));
        self
    }

    /// Append an inline middleware.
    pub fn middleware_inline(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(MiddlewareRef::Inline(Arc::new(middleware)));
        self
    }

    /// Declare the async data loader.
    pub fn async_data<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<PageData>> + Send + 'static,
    {
        self.async_data = Some(Arc::new(move |ctx| f(ctx).boxed()));
        self
    }

    /// Declare the legacy fetch hook.
    pub fn fetch<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.fetch = Some(Arc::new(move |ctx| f(ctx).boxed()));
        self
    }

    /// Declare a synchronous legacy fetch hook; its result is treated as
    /// already settled.
    pub fn fetch_sync<F>(mut self, f: F) -> Self
    where
        F: Fn(&NavigationContext) -> HookResult + Send + Sync + 'static,
    {
        self.fetch = Some(Arc::new(move |ctx| futures::future::ready(f(&ctx)).boxed()));
        self
    }

    /// Declare the validation predicate.
    pub fn validate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<bool>> + Send + 'static,
    {
        self.validate = Some(Arc::new(move |ctx| f(ctx).boxed()));
        self
    }

    /// Declare the initial state factory of live instances.
    pub fn data<F>(mut self, f: F) -> Self
    where
        F: Fn() -> PageData + Send + Sync + 'static,
    {
        self.data = Some(Arc::new(f));
        self
    }

    /// Set the watch-query policy.
    pub fn watch_query(mut self, policy: WatchQuery) -> Self {
        self.watch_query = policy;
        self
    }

    /// `false` disables refresh on param-only changes.
    pub fn watch_param(mut self, watch: bool) -> Self {
        self.watch_param = watch;
        self
    }

    /// `false` opts the page out of automatic progress completion.
    pub fn loading(mut self, enabled: bool) -> Self {
        self.loading = enabled;
        self
    }

    /// Declare a fixed page key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(ComponentKey::Literal(key.into()));
        self
    }

    /// Declare a page key derived from the route.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RouteSnapshot) -> String + Send + Sync + 'static,
    {
        self.key = Some(ComponentKey::Computed(Arc::new(f)));
        self
    }

    /// Declare the page transition.
    pub fn transition(mut self, transition: impl Into<TransitionDecl>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Stable id.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Definition version.
    pub fn definition_version(&self) -> u64 {
        self.version
    }

    /// `true` if `other` is the same component at the same version.
    pub fn same_as(&self, other: &ComponentDefinition) -> bool {
        self.id == other.id && self.version == other.version
    }

    /// Declared layout, if any.
    pub fn declared_layout(&self) -> Option<&Declared<String>> {
        self.layout.as_ref()
    }

    /// Declared middleware in declaration order.
    pub fn declared_middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Async data loader, if any.
    pub fn async_data_hook(&self) -> Option<&AsyncDataFn> {
        self.async_data.as_ref()
    }

    /// Legacy fetch hook, if any.
    pub fn fetch_hook(&self) -> Option<&FetchFn> {
        self.fetch.as_ref()
    }

    /// Validation predicate, if any.
    pub fn validate_hook(&self) -> Option<&ValidateFn> {
        self.validate.as_ref()
    }

    /// `true` if the component declares an initial state factory.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Watch-query policy.
    pub fn watch_query_policy(&self) -> &WatchQuery {
        &self.watch_query
    }

    /// Watch-param policy.
    pub fn watches_params(&self) -> bool {
        self.watch_param
    }

    /// `true` when the page opted out of the progress indicator.
    pub fn loading_disabled(&self) -> bool {
        !self.loading
    }

    /// Declared page key, if any.
    pub fn declared_key(&self) -> Option<&ComponentKey> {
        self.key.as_ref()
    }

    /// Declared transition, if any.
    pub fn declared_transition(&self) -> Option<&TransitionDecl> {
        self.transition.as_ref()
    }

    /// Initial state of a new instance (empty without a factory).
    pub fn initial_data(&self) -> PageData {
        self.data.as_ref().map(|f| f()).unwrap_or_default()
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("layout", &self.layout)
            .field("middleware", &self.middleware)
            .field("watch_query", &self.watch_query)
            .field("watch_param", &self.watch_param)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ComponentSlot
// ============================================================================

/// What a matched view points at: a ready definition or a lazy one.
pub enum ComponentSlot {
    /// Already available.
    Ready(Arc<ComponentDefinition>),
    /// Loaded on first use and memoised.
    Lazy(LazyComponent),
}

/// A component loaded on demand.
pub struct LazyComponent {
    id: ComponentId,
    loader: ComponentLoader,
    resolved: Mutex<Option<Arc<ComponentDefinition>>>,
}

impl ComponentSlot {
    /// Wrap a lazily loaded component.
    pub fn lazy<F, Fut>(id: impl Into<ComponentId>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<ComponentDefinition>> + Send + 'static,
    {
        Self::Lazy(LazyComponent {
            id: id.into(),
            loader: Arc::new(move || loader().boxed()),
            resolved: Mutex::new(None),
        })
    }

    /// The definition if it is available without loading.
    pub fn resolved(&self) -> Option<Arc<ComponentDefinition>> {
        match self {
            Self::Ready(def) => Some(Arc::clone(def)),
            Self::Lazy(lazy) => lazy.resolved.lock().clone(),
        }
    }

    /// Resolve the definition, loading it on first use.
    pub async fn resolve(&self) -> HookResult<Arc<ComponentDefinition>> {
        let lazy = match self {
            Self::Ready(def) => return Ok(Arc::clone(def)),
            Self::Lazy(lazy) => lazy,
        };
        if let Some(def) = lazy.resolved.lock().clone() {
            return Ok(def);
        }

        trace_log!("Loading lazy component '{}'", lazy.id);
        let loaded = (lazy.loader)().await.map_err(|err| match err {
            NavigationError::Message(message) => NavigationError::ComponentResolution {
                component: lazy.id.to_string(),
                message,
            },
            other => other,
        })?;
        let def = Arc::new(loaded);
        *lazy.resolved.lock() = Some(Arc::clone(&def));
        Ok(def)
    }
}

impl From<ComponentDefinition> for ComponentSlot {
    fn from(def: ComponentDefinition) -> Self {
        Self::Ready(Arc::new(def))
    }
}

impl From<Arc<ComponentDefinition>> for ComponentSlot {
    fn from(def: Arc<ComponentDefinition>) -> Self {
        Self::Ready(def)
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(def) => f.debug_tuple("Ready").field(def.id()).finish(),
            Self::Lazy(lazy) => f
                .debug_struct("Lazy")
                .field("id", &lazy.id)
                .field("resolved", &lazy.resolved.lock().is_some())
                .finish(),
        }
    }
}

// ============================================================================
// ComponentInstance
// ============================================================================

/// A live, mounted instance of a component.
///
/// Created by the render layer (see
/// [`Shell::mount_instance`](crate::Shell::mount_instance)); the shell merges
/// loader results into its state and re-initialises it when a navigation
/// reuses it for a refreshed page.
pub struct ComponentInstance {
    definition: Arc<ComponentDefinition>,
    keep_alive: bool,
    data: Mutex<PageData>,
    destroyed: AtomicBool,
}

impl ComponentInstance {
    /// Create an instance with the given initial state.
    pub fn new(definition: Arc<ComponentDefinition>, data: PageData) -> Self {
        Self {
            definition,
            keep_alive: false,
            data: Mutex::new(data),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Mark the instance as cached by a keep-alive wrapper.
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The definition this instance was created from.
    pub fn definition(&self) -> &Arc<ComponentDefinition> {
        &self.definition
    }

    /// `true` for keep-alive instances.
    pub fn is_kept_alive(&self) -> bool {
        self.keep_alive
    }

    /// Snapshot of the current state.
    pub fn data(&self) -> PageData {
        self.data.lock().clone()
    }

    /// Read one state key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Merge `patch` key by key into the state.
    pub fn merge(&self, patch: &PageData) {
        let mut data = self.data.lock();
        for (key, value) in patch {
            data.insert(key.clone(), value.clone());
        }
    }

    /// Replace the whole state.
    pub fn replace(&self, data: PageData) {
        *self.data.lock() = data;
    }

    /// Mark the instance as destroyed; the shell ignores it afterwards.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    /// `true` once destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("component", self.definition.id())
            .field("version", &self.definition.definition_version())
            .field("keep_alive", &self.keep_alive)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
