//! Middleware chain executor.
//!
//! Middleware are async hooks run **strictly in sequence** before a page's
//! data is loaded. They can redirect ([`NavigationContext::redirect`]) or raise
//! an error ([`NavigationContext::error`]); either one stops the chain before
//! the next middleware starts.
//!
//! # Execution order
//!
//! Each navigation runs two chains:
//!
//! | Scope | Middleware |
//! |-------|------------|
//! | [`MiddlewareScope::Global`] | every registered middleware in registration order, then extra global middleware |
//! | [`MiddlewareScope::Scoped`] | the layout's middleware, then each matched component's, in matched order |
//!
//! The scoped chain never starts before the global one has settled.
//!
//! # References
//!
//! Components and layouts name middleware by identifier
//! ([`MiddlewareRef::Named`]) or carry them inline ([`MiddlewareRef::Inline`]).
//! Every identifier is resolved before anything runs: if one is unknown, the
//! shell raises a 500 `Unknown middleware <name>` and **none** of the chain
//! runs.
//!
//! # Creating middleware
//!
//! | Approach | When to use |
//! |----------|-------------|
//! | Implement [`Middleware`] | Full control, named |
//! | [`middleware_fn`] | Quick one-off from an async closure |
//!
//! # Example
//!
//! ```
//! use shell_navigator::middleware::{middleware_fn, MiddlewareRegistry};
//!
//! let mut registry = MiddlewareRegistry::new();
//! registry.register(
//!     "auth",
//!     middleware_fn(|ctx| async move {
//!         if ctx.query().get("token").is_none() {
//!             return Err(ctx.redirect("/login"));
//!         }
//!         Ok(())
//!     }),
//! );
//! registry.global(middleware_fn(|_ctx| async { Ok(()) }));
//! assert!(registry.contains("auth"));
//! ```

use crate::context::NavigationContext;
use crate::error::{HookResult, NavigationError};
use crate::layout::LayoutDefinition;
use crate::route::ResolvedComponent;
use crate::{trace_log, warn_log};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Middleware trait
// ============================================================================

/// An async navigation hook.
///
/// # Example
///
/// ```
/// use futures::future::{BoxFuture, FutureExt};
/// use shell_navigator::middleware::Middleware;
/// use shell_navigator::{HookResult, NavigationContext};
///
/// struct Analytics;
///
/// impl Middleware for Analytics {
///     fn handle(&self, ctx: NavigationContext) -> BoxFuture<'static, HookResult> {
///         async move {
///             println!("page view: {}", ctx.route().path);
///             Ok(())
///         }
///         .boxed()
///     }
///
///     fn name(&self) -> &str {
///         "analytics"
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Run the middleware for the current navigation.
    fn handle(&self, ctx: NavigationContext) -> BoxFuture<'static, HookResult>;

    /// Middleware name for debugging.
    fn name(&self) -> &str {
        "Middleware"
    }
}

// ============================================================================
// middleware_fn helper
// ============================================================================

/// Create middleware from an async closure.
///
/// ```
/// use shell_navigator::middleware::{middleware_fn, Middleware};
///
/// let mw = middleware_fn(|_ctx| async { Ok(()) });
/// assert_eq!(mw.name(), "Middleware");
/// ```
pub const fn middleware_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    FnMiddleware { f }
}

/// Middleware created from a closure via [`middleware_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    fn handle(&self, ctx: NavigationContext) -> BoxFuture<'static, HookResult> {
        (self.f)(ctx).boxed()
    }
}

// ============================================================================
// References and registry
// ============================================================================

/// A middleware as declared by a component or layout.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// Looked up in the [`MiddlewareRegistry`].
    Named(String),
    /// Used as is.
    Inline(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Inline(mw) => mw.name(),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(mw) => f.debug_tuple("Inline").field(&mw.name()).finish(),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl<M: Middleware> From<Arc<M>> for MiddlewareRef {
    fn from(mw: Arc<M>) -> Self {
        Self::Inline(mw)
    }
}

/// Which chain to run.
#[derive(Debug, Clone, Copy)]
pub enum MiddlewareScope<'a> {
    /// Every registered middleware, then the extra global ones.
    Global,
    /// Layout middleware followed by page middleware.
    Scoped {
        /// Layout chosen for the navigation.
        layout: &'a LayoutDefinition,
        /// Matched components in matched order.
        components: &'a [ResolvedComponent],
    },
}

/// Named middleware plus extra unnamed global middleware.
///
/// Every named middleware belongs to the global chain. Components and layouts
/// may name one again to run it a second time in their scoped chain.
#[derive(Default, Clone)]
pub struct MiddlewareRegistry {
    named: Vec<(String, Arc<dyn Middleware>)>,
    globals: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named middleware.
    pub fn register(&mut self, name: impl Into<String>, middleware: impl Middleware) {
        self.register_arc(name, Arc::new(middleware));
    }

    /// Register (or replace) a shared named middleware.
    pub fn register_arc(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        let name = name.into();
        if let Some(entry) = self.named.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = middleware;
        } else {
            self.named.push((name, middleware));
        }
    }

    /// Append an unnamed middleware to the end of the global chain.
    pub fn global(&mut self, middleware: impl Middleware) {
        self.globals.push(Arc::new(middleware));
    }

    /// Look up a named middleware.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Middleware>> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, mw)| mw)
    }

    /// `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(n, _)| n.as_str())
    }

    /// References making up the chain for `scope`.
    pub fn refs_for(&self, scope: MiddlewareScope<'_>) -> Vec<MiddlewareRef> {
        match scope {
            MiddlewareScope::Global => self
                .named
                .iter()
                .map(|(name, _)| MiddlewareRef::Named(name.clone()))
                .chain(self.globals.iter().cloned().map(MiddlewareRef::Inline))
                .collect(),
            MiddlewareScope::Scoped { layout, components } => layout
                .middleware_refs()
                .iter()
                .chain(
                    components
                        .iter()
                        .flat_map(|c| c.definition.declared_middleware()),
                )
                .cloned()
                .collect(),
        }
    }

    /// Resolve every reference, failing on the first unknown name.
    pub fn resolve(&self, refs: &[MiddlewareRef]) -> Result<Vec<ChainLink>, NavigationError> {
        refs.iter()
            .map(|r| {
                let middleware = match r {
                    MiddlewareRef::Named(name) => Arc::clone(self.get(name).ok_or_else(|| {
                        NavigationError::UnknownMiddleware { name: name.clone() }
                    })?),
                    MiddlewareRef::Inline(mw) => Arc::clone(mw),
                };
                Ok(ChainLink {
                    label: r.label().to_string(),
                    middleware,
                })
            })
            .collect()
    }

    /// Resolve and run the chain for `scope`.
    ///
    /// An unknown identifier raises a 500 through the context and runs
    /// nothing. Otherwise middleware run one at a time until the chain ends,
    /// the navigation is redirected, or an error is raised. A middleware
    /// returning `Err` propagates it.
    pub async fn run(&self, scope: MiddlewareScope<'_>, ctx: &NavigationContext) -> HookResult {
        let refs = self.refs_for(scope);
        let chain = match self.resolve(&refs) {
            Ok(chain) => chain,
            Err(err) => {
                warn_log!("Navigation #{}: {}", ctx.navigation().id(), err);
                ctx.error(err.to_app_error());
                return Ok(());
            }
        };

        for link in chain {
            if ctx.is_redirected() || ctx.is_errored() {
                trace_log!("Middleware chain stopped before '{}'", link.label);
                break;
            }
            trace_log!("Running middleware '{}'", link.label);
            link.middleware.handle(ctx.clone()).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("named", &self.names().collect::<Vec<_>>())
            .field("globals", &self.globals.len())
            .finish()
    }
}

/// A resolved chain entry.
#[derive(Clone)]
pub struct ChainLink {
    /// Identifier or middleware name.
    pub label: String,
    /// The middleware to run.
    pub middleware: Arc<dyn Middleware>,
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChainLink").field(&self.label).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
