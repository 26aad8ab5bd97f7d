//! Shell configuration.
//!
//! Plain settings live in [`ShellConfig`] (deserialisable with the `serde`
//! feature). Layouts, middleware, the error page, the progress indicator and
//! listeners are wired through [`ShellBuilder`].
//!
//! ```
//! use shell_navigator::layout::LayoutDefinition;
//! use shell_navigator::middleware::middleware_fn;
//! use shell_navigator::Shell;
//!
//! let shell = Shell::builder()
//!     .layout(LayoutDefinition::new("admin").middleware("auth"))
//!     .middleware("auth", middleware_fn(|_ctx| async { Ok(()) }))
//!     .global_middleware(middleware_fn(|_ctx| async { Ok(()) }))
//!     .error_layout("blank")
//!     .build();
//! assert_eq!(shell.layout().name, "default");
//! ```

use crate::component::Declared;
use crate::context::NavigationContext;
use crate::error::{NavigationError, NOT_FOUND_MESSAGE};
use crate::events::{EventBus, ShellEvent};
use crate::layout::{LayoutDefinition, LayoutRegistry, DEFAULT_LAYOUT};
use crate::middleware::{Middleware, MiddlewareRegistry};
use crate::progress::ProgressIndicator;
use crate::transition::{default_transition, TransitionSpec, TransitionValue};
use crate::{HookResult, Shell};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Hook invoked with every unhandled pipeline error.
pub type ErrorHook = Arc<dyn Fn(&NavigationError) + Send + Sync>;

/// Plain settings of the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ShellConfig {
    /// Layout used when a page declares none.
    pub default_layout: String,
    /// Message of the 404 raised for unmatched locations and failed
    /// validation.
    pub not_found_message: String,
    /// Progress increase per loader when a component has one loader.
    pub single_loader_increase: u8,
    /// Progress increase per loader when a component has both loaders.
    pub dual_loader_increase: u8,
    /// Default transition name.
    pub transition_name: String,
    /// Default transition mode.
    pub transition_mode: String,
    /// Whether the default transition runs on first render.
    pub transition_appear: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_layout: DEFAULT_LAYOUT.to_string(),
            not_found_message: NOT_FOUND_MESSAGE.to_string(),
            single_loader_increase: 45,
            dual_loader_increase: 30,
            transition_name: "page".to_string(),
            transition_mode: "out-in".to_string(),
            transition_appear: true,
        }
    }
}

impl ShellConfig {
    /// The default transition spec built from these settings.
    pub fn default_transition(&self) -> TransitionSpec {
        default_transition()
            .with("name", self.transition_name.as_str())
            .with("mode", self.transition_mode.as_str())
            .with("appear", TransitionValue::Flag(self.transition_appear))
    }

    /// Progress increase per settled loader.
    pub fn loader_increase(&self, has_async_data: bool, has_fetch: bool) -> u8 {
        if has_async_data && has_fetch {
            self.dual_loader_increase
        } else {
            self.single_loader_increase
        }
    }
}

/// The error page's declarations.
#[derive(Debug, Clone, Default)]
pub struct ErrorPage {
    /// Layout the error page renders in.
    pub layout: Option<Declared<String>>,
}

impl ErrorPage {
    /// Layout name for `ctx`, if declared.
    pub fn layout_for(&self, ctx: &NavigationContext) -> Option<String> {
        self.layout.as_ref().map(|layout| layout.resolve(ctx))
    }
}

/// Builder for [`Shell`].
pub struct ShellBuilder {
    pub(crate) config: ShellConfig,
    pub(crate) layouts: LayoutRegistry,
    pub(crate) middleware: MiddlewareRegistry,
    pub(crate) error_page: ErrorPage,
    pub(crate) progress: Option<Arc<dyn ProgressIndicator>>,
    pub(crate) events: EventBus,
    pub(crate) error_hook: Option<ErrorHook>,
}

impl ShellBuilder {
    /// Builder with default settings.
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    /// Builder with explicit settings.
    pub fn with_config(config: ShellConfig) -> Self {
        Self {
            layouts: LayoutRegistry::new(config.default_layout.clone()),
            config,
            middleware: MiddlewareRegistry::new(),
            error_page: ErrorPage::default(),
            progress: None,
            events: EventBus::new(),
            error_hook: None,
        }
    }

    /// Register a layout.
    pub fn layout(mut self, layout: LayoutDefinition) -> Self {
        self.layouts.register(layout);
        self
    }

    /// Register a lazily loaded layout.
    pub fn lazy_layout<F, Fut>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<LayoutDefinition>> + Send + 'static,
    {
        self.layouts.register_lazy(name, loader);
        self
    }

    /// Register a named middleware. It runs in every navigation's global
    /// chain, in registration order.
    pub fn middleware(mut self, name: impl Into<String>, middleware: impl Middleware) -> Self {
        self.middleware.register(name, middleware);
        self
    }

    /// Append an unnamed middleware after the registered ones in the global
    /// chain.
    pub fn global_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.global(middleware);
        self
    }

    /// Fixed layout of the error page.
    pub fn error_layout(mut self, layout: impl Into<String>) -> Self {
        self.error_page.layout = Some(Declared::Literal(layout.into()));
        self
    }

    /// Error page layout computed from the context.
    pub fn error_layout_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&NavigationContext) -> String + Send + Sync + 'static,
    {
        self.error_page.layout = Some(Declared::computed(f));
        self
    }

    /// Attach a progress indicator from the start.
    pub fn progress(mut self, indicator: Arc<dyn ProgressIndicator>) -> Self {
        self.progress = Some(indicator);
        self
    }

    /// Subscribe to shell events.
    pub fn on_event<F>(self, listener: F) -> Self
    where
        F: Fn(&ShellEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(Arc::new(listener));
        self
    }

    /// Hook called with every unhandled pipeline error.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&NavigationError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// Build the shell.
    pub fn build(self) -> Shell {
        Shell::from_builder(self)
    }
}

impl Default for ShellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShellBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellBuilder")
            .field("config", &self.config)
            .field("layouts", &self.layouts)
            .field("middleware", &self.middleware)
            .field("error_page", &self.error_page)
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}
