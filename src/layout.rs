//! Layout resolver.
//!
//! Layouts wrap pages. The first matched component chooses one by name,
//! literally or as a function of the navigation context. Names resolve
//! against a [`LayoutRegistry`], which always contains the default layout:
//!
//! - no declaration → the default layout
//! - unknown name → the default layout, with a warning
//! - a lazy layout whose loader fails → the default layout, with a warning
//!
//! Loading never fails, so a broken layout can never block a navigation.

use crate::error::HookResult;
use crate::middleware::{Middleware, MiddlewareRef};
use crate::{debug_log, warn_log};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Name of the built-in fallback layout.
pub const DEFAULT_LAYOUT: &str = "default";

/// Loader of a lazily resolved layout.
pub type LayoutLoader = Arc<dyn Fn() -> BoxFuture<'static, HookResult<LayoutDefinition>> + Send + Sync>;

/// A layout as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct LayoutDefinition {
    name: String,
    middleware: Vec<MiddlewareRef>,
}

impl LayoutDefinition {
    /// Layout without middleware.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            middleware: Vec::new(),
        }
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

    /// Layout name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared middleware, in order.
    pub fn middleware_refs(&self) -> &[MiddlewareRef] {
        &self.middleware
    }
}

/// The active layout: its name and its definition.
#[derive(Debug, Clone)]
pub struct LayoutHandle {
    /// Active layout name.
    pub name: String,
    /// Resolved definition.
    pub definition: Arc<LayoutDefinition>,
}

impl LayoutHandle {
    /// Handle for an already resolved definition.
    pub fn new(definition: Arc<LayoutDefinition>) -> Self {
        Self {
            name: definition.name().to_string(),
            definition,
        }
    }
}

enum LayoutEntry {
    Ready(Arc<LayoutDefinition>),
    Lazy {
        loader: LayoutLoader,
        loaded: Mutex<Option<Arc<LayoutDefinition>>>,
    },
}

impl LayoutEntry {
    fn loaded(&self) -> Option<Arc<LayoutDefinition>> {
        match self {
            Self::Ready(def) => Some(Arc::clone(def)),
            Self::Lazy { loaded, .. } => loaded.lock().clone(),
        }
    }
}

/// Registered layouts, always including the default one.
pub struct LayoutRegistry {
    default_name: String,
    entries: HashMap<String, LayoutEntry>,
}

impl LayoutRegistry {
    /// Registry whose fallback layout is `default_name`.
    pub fn new(default_name: impl Into<String>) -> Self {
        let default_name = default_name.into();
        let mut entries = HashMap::new();
        entries.insert(
            default_name.clone(),
            LayoutEntry::Ready(Arc::new(LayoutDefinition::new(default_name.clone()))),
        );
        Self {
            default_name,
            entries,
        }
    }

    /// Register (or replace) a layout.
    pub fn register(&mut self, layout: LayoutDefinition) {
        self.entries
            .insert(layout.name.clone(), LayoutEntry::Ready(Arc::new(layout)));
    }

    /// Register a layout loaded on first use.
    pub fn register_lazy<F, Fut>(&mut self, name: impl Into<String>, loader: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<LayoutDefinition>> + Send + 'static,
    {
        self.entries.insert(
            name.into(),
            LayoutEntry::Lazy {
                loader: Arc::new(move || loader().boxed()),
                loaded: Mutex::new(None),
            },
        );
    }

    /// Name of the fallback layout.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Map a candidate name to a registered one.
    pub fn resolve_name(&self, candidate: Option<&str>) -> String {
        match candidate {
            Some(name) if self.entries.contains_key(name) => name.to_string(),
            Some(name) => {
                warn_log!(
                    "Layout '{}' is not registered, falling back to '{}'",
                    name,
                    self.default_name
                );
                self.default_name.clone()
            }
            None => self.default_name.clone(),
        }
    }

    /// The default layout definition.
    pub fn default_layout(&self) -> Arc<LayoutDefinition> {
        self.entries
            .get(&self.default_name)
            .and_then(LayoutEntry::loaded)
            .unwrap_or_else(|| Arc::new(LayoutDefinition::new(self.default_name.clone())))
    }

    /// Definition of `name` if it is available without loading.
    pub fn loaded(&self, name: &str) -> Option<Arc<LayoutDefinition>> {
        self.entries.get(name).and_then(LayoutEntry::loaded)
    }

    /// Resolve and load a layout. Never fails; see the module docs.
    pub async fn load(&self, candidate: Option<&str>) -> Arc<LayoutDefinition> {
        let name = self.resolve_name(candidate);
        let Some(entry) = self.entries.get(&name) else {
            return self.default_layout();
        };

        let loader = match entry {
            LayoutEntry::Ready(def) => return Arc::clone(def),
            LayoutEntry::Lazy { loader, loaded } => {
                if let Some(def) = loaded.lock().clone() {
                    return def;
                }
                Arc::clone(loader)
            }
        };

        debug_log!("Loading layout '{}'", name);
        match loader().await {
            Ok(def) => {
                let def = Arc::new(def);
                if let LayoutEntry::Lazy { loaded, .. } = entry {
                    *loaded.lock() = Some(Arc::clone(&def));
                }
                def
            }
            Err(err) => {
                warn_log!(
                    "Layout '{}' failed to load ({}), falling back to '{}'",
                    name,
                    err,
                    self.default_name
                );
                self.default_layout()
            }
        }
    }

    /// Handle for committing `candidate` as the active layout.
    ///
    /// A lazy layout that was never loaded falls back to the default.
    pub fn handle_for(&self, candidate: Option<&str>) -> LayoutHandle {
        let name = self.resolve_name(candidate);
        match self.loaded(&name) {
            Some(definition) => LayoutHandle { name, definition },
            None => {
                warn_log!("Layout '{}' is not loaded yet, using '{}'", name, self.default_name);
                LayoutHandle::new(self.default_layout())
            }
        }
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT)
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("LayoutRegistry")
            .field("default_name", &self.default_name)
            .field("layouts", &names)
            .finish()
    }
}
