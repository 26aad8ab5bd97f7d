//! Navigation controller.
//!
//! [`Shell`] is the runtime that sits between the router and the view layer.
//! The router calls [`Shell::before_each`] for every pending navigation and
//! [`Shell::after_each`] once it committed; the view layer reads the active
//! layout, error and transitions, and registers live component instances.
//!
//! # Pipeline
//!
//! ```text
//! Idle → Resolving → Diffing ─(no change)──────────────────────────────→ Done
//!                       │
//!                       ├─(nothing matched)→ global middleware → error layout → 404 → Done
//!                       ▼
//!        RunningGlobalMiddleware → ResolvingLayout → RunningScopedMiddleware
//!                       → Validating → Fetching → Committing → Done
//! ```
//!
//! - A redirect at any point completes the navigation with the redirect
//!   target; later phases are skipped.
//! - An error raised through the context after a middleware phase completes
//!   the navigation with [`NextAction::Proceed`] so the error page shows.
//! - Any other failure goes through `ErrorRecovery`: the error layout is
//!   loaded, the error is raised, `RouteChanged` fires, and completion is
//!   still called. A stale deployed asset requests a reload instead.
//!
//! Completion is called at most once per navigation.
//!
//! # Example
//!
//! ```
//! use shell_navigator::component::ComponentDefinition;
//! use shell_navigator::context::NextAction;
//! use shell_navigator::route::MatchedRoute;
//! use shell_navigator::{RouteSnapshot, Shell};
//!
//! let shell = Shell::builder().build();
//! let home = RouteSnapshot::new("/")
//!     .name("home")
//!     .matched(MatchedRoute::new("/", ComponentDefinition::new("home")))
//!     .shared();
//! let about = RouteSnapshot::new("/about")
//!     .name("about")
//!     .matched(MatchedRoute::new("/about", ComponentDefinition::new("about")))
//!     .shared();
//!
//! let report = pollster::block_on(shell.navigate(about.clone(), home.clone()));
//! assert_eq!(report.outcome, Some(NextAction::Proceed));
//! shell.after_each(&about, &home);
//! ```

use crate::component::{ComponentDefinition, ComponentId, ComponentInstance, PageData};
use crate::config::{ErrorPage, ShellBuilder, ShellConfig};
use crate::context::{Completion, NavigationContext, NextAction};
use crate::diff::{NavigationPhase, NavigationState, RouteChange};
use crate::error::{AppError, ErrorStamp, ErrorState, HookResult, NavigationError};
use crate::events::{EventBus, EventListener, ListenerId, ShellEvent};
use crate::fetch::{reload_instance, DataFetchCoordinator};
use crate::layout::{LayoutDefinition, LayoutHandle, LayoutRegistry};
use crate::middleware::{MiddlewareRegistry, MiddlewareScope};
use crate::path::PathCompiler;
use crate::progress::ProgressHandle;
use crate::route::ResolvedComponent;
use crate::router::RouterContract;
use crate::state::ApplicationRuntimeState;
use crate::transition::{map_transitions, normalize_transitions, OutletTransition, TransitionSpec};
use crate::{debug_log, error_log, info_log, trace_log, warn_log, RouteSnapshot};
use futures::future::join_all;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Shell
// ============================================================================

/// The application-shell runtime. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

struct ShellInner {
    config: ShellConfig,
    layouts: LayoutRegistry,
    middleware: MiddlewareRegistry,
    error_page: ErrorPage,
    progress: ProgressHandle,
    events: EventBus,
    paths: PathCompiler,
    state: Mutex<ApplicationRuntimeState>,
    navigation_seq: AtomicU64,
    error_hook: Option<crate::config::ErrorHook>,
}

impl Shell {
    /// Start configuring a shell.
    pub fn builder() -> ShellBuilder {
        ShellBuilder::new()
    }

    pub(crate) fn from_builder(builder: ShellBuilder) -> Self {
        let progress = ProgressHandle::new();
        if let Some(indicator) = builder.progress {
            progress.attach(indicator);
        }

        let mut state =
            ApplicationRuntimeState::new(LayoutHandle::new(builder.layouts.default_layout()));
        state.set_transitions(vec![builder.config.default_transition()]);

        Self {
            inner: Arc::new(ShellInner {
                config: builder.config,
                layouts: builder.layouts,
                middleware: builder.middleware,
                error_page: builder.error_page,
                progress,
                events: builder.events,
                paths: PathCompiler::new(),
                state: Mutex::new(state),
                navigation_seq: AtomicU64::new(0),
                error_hook: builder.error_hook,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    /// Plain settings.
    pub fn config(&self) -> &ShellConfig {
        &self.inner.config
    }

    /// Progress indicator handle.
    pub fn progress(&self) -> &ProgressHandle {
        &self.inner.progress
    }

    /// Event bus.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to shell events.
    pub fn on_event<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ShellEvent) + Send + Sync + 'static,
    {
        let listener: EventListener = Arc::new(listener);
        self.inner.events.subscribe(listener)
    }

    /// Remove a listener added with [`Shell::on_event`].
    pub fn off_event(&self, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Registered layouts.
    pub fn layouts(&self) -> &LayoutRegistry {
        &self.inner.layouts
    }

    /// Registered middleware.
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.inner.middleware
    }

    /// Path template compiler.
    pub fn paths(&self) -> &PathCompiler {
        &self.inner.paths
    }

    // ------------------------------------------------------------------
    // State reads
    // ------------------------------------------------------------------

    /// Active layout.
    pub fn layout(&self) -> LayoutHandle {
        self.inner.state.lock().layout().clone()
    }

    /// Active error and its stamp.
    pub fn error_state(&self) -> ErrorState {
        self.inner.state.lock().error_state().clone()
    }

    /// Committed transitions by depth.
    pub fn transitions(&self) -> Vec<TransitionSpec> {
        self.inner.state.lock().transitions().to_vec()
    }

    /// `true` once mounted.
    pub fn is_mounted(&self) -> bool {
        self.inner.state.lock().is_mounted()
    }

    /// Route of the last committed navigation.
    pub fn current_route(&self) -> Option<Arc<RouteSnapshot>> {
        self.inner.state.lock().current_route().cloned()
    }

    /// State of the most recent navigation.
    pub fn last_navigation(&self) -> Option<Arc<NavigationState>> {
        self.inner.state.lock().last_navigation().cloned()
    }

    /// Live instance at `depth`.
    pub fn instance(&self, depth: usize) -> Option<Arc<ComponentInstance>> {
        self.inner.state.lock().instance(depth).cloned()
    }

    /// Async data staged for `component`.
    pub fn staged_data(&self, component: &ComponentId) -> Option<PageData> {
        self.inner.state.lock().staged_data(component).cloned()
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Commit `candidate` (or the default layout) as the active layout.
    pub fn set_layout(&self, candidate: Option<&str>) -> LayoutHandle {
        let handle = self.inner.layouts.handle_for(candidate);
        debug_log!("Active layout: '{}'", handle.name);
        self.inner.state.lock().set_layout(handle.clone());
        handle
    }

    /// Resolve and load a layout without committing it.
    pub async fn load_layout(&self, candidate: Option<&str>) -> Arc<LayoutDefinition> {
        self.inner.layouts.load(candidate).await
    }

    /// Set or clear the active error.
    ///
    /// Every call stamps the write. Setting an error fails and then finishes
    /// the progress indicator.
    pub fn error(&self, error: Option<AppError>) -> ErrorStamp {
        let stamp = self.inner.state.lock().error(error.clone());
        match error {
            Some(error) => {
                debug_log!("Error raised ({:?}): {}", stamp, error);
                self.inner.progress.fail(&error);
                self.inner.progress.finish();
            }
            None => trace_log!("Error cleared ({:?})", stamp),
        }
        stamp
    }

    /// Commit transitions, each overlaid on the default transition.
    pub fn set_transitions(&self, transitions: Vec<TransitionSpec>) {
        let default = self.inner.config.default_transition();
        let transitions = if transitions.is_empty() {
            vec![default]
        } else {
            normalize_transitions(transitions, &default)
        };
        self.inner.state.lock().set_transitions(transitions);
    }

    // ------------------------------------------------------------------
    // Live instances
    // ------------------------------------------------------------------

    /// Create and register the live instance rendered at `depth`.
    ///
    /// Its state is the component's data factory overlaid with any staged
    /// async data.
    pub fn mount_instance(
        &self,
        depth: usize,
        definition: Arc<ComponentDefinition>,
        keep_alive: bool,
    ) -> Arc<ComponentInstance> {
        let data = self.initial_data_for(&definition);
        let instance = Arc::new(ComponentInstance::new(definition, data).keep_alive(keep_alive));
        self.inner
            .state
            .lock()
            .set_instance(depth, Arc::clone(&instance));
        instance
    }

    /// Destroy and forget the instance at `depth`.
    pub fn unmount_instance(&self, depth: usize) {
        let removed = self.inner.state.lock().remove_instance(depth);
        if let Some(instance) = removed {
            instance.destroy();
        }
    }

    fn initial_data_for(&self, definition: &ComponentDefinition) -> PageData {
        let mut data = definition.initial_data();
        if let Some(staged) = self.staged_data(definition.id()) {
            for (key, value) in staged {
                data.insert(key, value);
            }
        }
        data
    }

    pub(crate) fn stage_async_data(&self, depth: usize, definition: &ComponentDefinition, data: PageData) {
        let live = {
            let mut state = self.inner.state.lock();
            state.stage_data(definition.id().clone(), data.clone());
            state.instance(depth).cloned()
        };
        if let Some(instance) = live.filter(|i| i.definition().same_as(definition)) {
            instance.merge(&data);
        }
    }

    /// Transition props and listeners for the outlet at `depth`.
    ///
    /// The `beforeEnter` listener always emits [`ShellEvent::TriggerScroll`]
    /// before calling the declared one.
    pub fn outlet_transition(&self, depth: usize) -> OutletTransition {
        let transitions = self.transitions();
        let default = self.inner.config.default_transition();
        let mut outlet = OutletTransition::at_depth(&transitions, depth, &default);

        let declared = outlet.listeners.remove("beforeEnter");
        let shell = self.clone();
        outlet.listeners.insert(
            "beforeEnter".to_string(),
            Arc::new(move |depth: usize| {
                shell.inner.events.emit(&ShellEvent::TriggerScroll);
                if let Some(hook) = &declared {
                    hook(depth);
                }
            }),
        );
        outlet
    }

    fn not_found_error(&self) -> AppError {
        AppError::new(404, self.inner.config.not_found_message.clone())
    }

    fn normalize(&self, err: &NavigationError) -> AppError {
        match err {
            NavigationError::NotFound { .. } | NavigationError::ValidationFailed => {
                self.not_found_error()
            }
            other => other.to_app_error(),
        }
    }

    fn handle_global_error(&self, err: &NavigationError) {
        if let Some(hook) = &self.inner.error_hook {
            hook(err);
        }
    }

    fn emit_route_changed(&self, ctx: &NavigationContext, error: Option<AppError>) {
        self.inner.events.emit(&ShellEvent::RouteChanged {
            to: Arc::clone(ctx.route()),
            from: Arc::clone(ctx.from()),
            error,
        });
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("config", &self.inner.config)
            .field("layouts", &self.inner.layouts)
            .field("middleware", &self.inner.middleware)
            .field("progress", &self.inner.progress)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Navigation pipeline
// ============================================================================

/// Summary of one navigation.
#[derive(Debug, Clone)]
pub struct NavigationReport {
    /// Navigation sequence number.
    pub id: u64,
    /// Classification.
    pub change: RouteChange,
    /// What completion received (`None` if it was never called).
    pub outcome: Option<NextAction>,
    /// Error raised by this navigation, if any.
    pub error: Option<AppError>,
    /// Phases entered, in order.
    pub phases: Vec<NavigationPhase>,
}

impl Shell {
    /// Run the pipeline for a pending navigation; `next` receives the
    /// outcome exactly once.
    pub async fn before_each<F>(
        &self,
        to: Arc<RouteSnapshot>,
        from: Arc<RouteSnapshot>,
        next: F,
    ) -> NavigationReport
    where
        F: FnOnce(NextAction) + Send + 'static,
    {
        self.run_navigation(to, from, Arc::new(Completion::new(next)), false)
            .await
    }

    /// Run the pipeline and report the outcome instead of calling back.
    pub async fn navigate(&self, to: Arc<RouteSnapshot>, from: Arc<RouteSnapshot>) -> NavigationReport {
        self.run_navigation(to, from, Arc::new(Completion::recording()), false)
            .await
    }

    async fn run_navigation(
        &self,
        to: Arc<RouteSnapshot>,
        from: Arc<RouteSnapshot>,
        completion: Arc<Completion>,
        bootstrap: bool,
    ) -> NavigationReport {
        let id = self.inner.navigation_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let error = self.error_state();
        let navigation = Arc::new(if bootstrap {
            NavigationState::bootstrap(id, error.is_errored(), error.stamp)
        } else {
            NavigationState::new(
                id,
                &to,
                &from,
                error.is_errored(),
                error.stamp,
                from.resolved_paths(&self.inner.paths),
            )
        });
        self.inner
            .state
            .lock()
            .set_last_navigation(Arc::clone(&navigation));

        info_log!(
            "Navigation #{}: '{}' → '{}' ({:?})",
            id,
            from.full_path,
            to.full_path,
            navigation.change()
        );
        let ctx = NavigationContext::new(
            self.clone(),
            Arc::clone(&to),
            Arc::clone(&from),
            Arc::clone(&navigation),
            completion,
        );

        navigation.enter(NavigationPhase::Resolving);
        let resolved = to.resolve_components().await;

        navigation.enter(NavigationPhase::Diffing);
        if !bootstrap && navigation.change().is_unchanged() {
            debug_log!("Navigation #{}: nothing changed", id);
            ctx.proceed();
            return self.finish(&ctx);
        }

        let result = match resolved {
            Ok(components) => {
                if !bootstrap {
                    self.start_progress(&ctx, &components);
                }
                self.render(&ctx, &components).await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            self.recover(&ctx, err).await;
        }
        self.finish(&ctx)
    }

    fn finish(&self, ctx: &NavigationContext) -> NavigationReport {
        let navigation = ctx.navigation();
        navigation.enter(NavigationPhase::Done);
        let outcome = ctx.completion().outcome();
        info_log!("Navigation #{} done: {:?}", navigation.id(), outcome);

        NavigationReport {
            id: navigation.id(),
            change: navigation.change(),
            outcome,
            error: if ctx.is_errored() {
                self.error_state().error
            } else {
                None
            },
            phases: navigation.phases(),
        }
    }

    /// Start the indicator on route or param changes, and on query changes
    /// that some matched component watches.
    fn start_progress(&self, ctx: &NavigationContext, components: &[ResolvedComponent]) {
        let progress = &self.inner.progress;
        if progress.is_manual() {
            return;
        }

        let navigation = ctx.navigation();
        let start = match navigation.change() {
            RouteChange::Route | RouteChange::Param => true,
            RouteChange::Query => components.iter().any(|component| {
                let instance = self
                    .instance(component.depth)
                    .filter(|i| i.definition().same_as(&component.definition));
                component.definition.watch_query_policy().selects(
                    navigation.query_diff(),
                    instance.as_deref(),
                    &ctx.route().query,
                    &ctx.from().query,
                )
            }),
            RouteChange::Unchanged => false,
        };
        if start {
            progress.start();
        }
    }

    async fn render(&self, ctx: &NavigationContext, components: &[ResolvedComponent]) -> HookResult {
        let navigation = ctx.navigation();
        if components.is_empty() {
            return self.render_not_found(ctx).await;
        }

        navigation.enter(NavigationPhase::RunningGlobalMiddleware);
        self.inner.middleware.run(MiddlewareScope::Global, ctx).await?;
        if self.stopped(ctx) {
            return Ok(());
        }

        navigation.enter(NavigationPhase::ResolvingLayout);
        let layout_name = components[0]
            .definition
            .declared_layout()
            .map(|layout| layout.resolve(ctx));
        let layout = self.load_layout(layout_name.as_deref()).await;

        navigation.enter(NavigationPhase::RunningScopedMiddleware);
        self.inner
            .middleware
            .run(
                MiddlewareScope::Scoped {
                    layout: &layout,
                    components,
                },
                ctx,
            )
            .await?;
        if self.stopped(ctx) {
            return Ok(());
        }

        navigation.enter(NavigationPhase::Validating);
        if !self.validate(ctx, components).await? {
            return Ok(());
        }

        navigation.enter(NavigationPhase::Fetching);
        DataFetchCoordinator::new(self, ctx).run(components).await?;

        navigation.enter(NavigationPhase::Committing);
        self.commit(ctx, components);
        Ok(())
    }

    /// After a middleware phase: `true` when the navigation already
    /// completed or must complete now to show a raised error.
    fn stopped(&self, ctx: &NavigationContext) -> bool {
        if ctx.is_completed() {
            return true;
        }
        if ctx.is_errored() {
            ctx.proceed();
            return true;
        }
        false
    }

    async fn render_not_found(&self, ctx: &NavigationContext) -> HookResult {
        let navigation = ctx.navigation();

        navigation.enter(NavigationPhase::RunningGlobalMiddleware);
        self.inner.middleware.run(MiddlewareScope::Global, ctx).await?;
        if ctx.is_completed() {
            return Ok(());
        }

        navigation.enter(NavigationPhase::ResolvingLayout);
        let layout = self.inner.error_page.layout_for(ctx);
        self.load_layout(layout.as_deref()).await;

        debug_log!("Navigation #{}: no route matched '{}'", navigation.id(), ctx.route().path);
        ctx.error(self.not_found_error());
        ctx.proceed();
        Ok(())
    }

    /// Run validators in matched order. Returns `false` when one rejected the
    /// page; the error is raised and the navigation completed.
    async fn validate(&self, ctx: &NavigationContext, components: &[ResolvedComponent]) -> HookResult<bool> {
        for component in components {
            let Some(validate) = component.definition.validate_hook() else {
                continue;
            };
            let error = match validate(ctx.clone()).await {
                Ok(true) => continue,
                Ok(false) => self.not_found_error(),
                Err(err) if err.is_redirect() || err.is_stale_asset() => return Err(err),
                Err(err) => self.normalize(&err),
            };
            debug_log!(
                "Navigation #{}: '{}' failed validation ({})",
                ctx.navigation().id(),
                component.definition.id(),
                error
            );
            ctx.error(error);
            ctx.proceed();
            return Ok(false);
        }
        Ok(true)
    }

    fn commit(&self, ctx: &NavigationContext, components: &[ResolvedComponent]) {
        let to_components: Vec<_> = components
            .iter()
            .map(|c| Arc::clone(&c.definition))
            .collect();
        let from_components = ctx.from().resolved_components();
        self.set_transitions(map_transitions(
            &to_components,
            &from_components,
            ctx.route(),
            Some(ctx.from().as_ref()),
        ));

        if !ctx.is_completed() {
            if !self.inner.progress.is_manual() {
                self.inner.progress.finish();
            }
            ctx.proceed();
        }
    }

    async fn recover(&self, ctx: &NavigationContext, err: NavigationError) {
        let navigation = ctx.navigation();
        navigation.enter(NavigationPhase::ErrorRecovery);

        if let NavigationError::Redirect { to } = &err {
            if !ctx.is_completed() {
                ctx.redirect(to.clone());
            }
            self.emit_route_changed(ctx, None);
            return;
        }

        if err.is_stale_asset() {
            warn_log!(
                "Navigation #{}: stale asset ({}), reloading '{}'",
                navigation.id(),
                err,
                ctx.route().full_path
            );
            self.inner.events.emit(&ShellEvent::ReloadRequested {
                path: ctx.route().full_path.clone(),
            });
            ctx.abort();
            return;
        }

        error_log!("Navigation #{} failed: {}", navigation.id(), err);
        self.handle_global_error(&err);

        let layout = self.inner.error_page.layout_for(ctx);
        self.load_layout(layout.as_deref()).await;

        let error = ctx.error(self.normalize(&err));
        self.emit_route_changed(ctx, Some(error));
        ctx.proceed();
    }
}

// ============================================================================
// After navigation
// ============================================================================

impl Shell {
    /// Router "after" hook: commit the next layout, re-initialise reused
    /// instances, clear a stale error, and notify listeners.
    pub fn after_each(&self, to: &Arc<RouteSnapshot>, from: &Arc<RouteSnapshot>) {
        let navigation = self.last_navigation();
        self.set_layout_for_next_page(to, navigation.as_deref());
        self.inner.state.lock().set_current_route(Arc::clone(to));
        self.fix_prepatch(to, navigation.as_deref());

        if self.is_mounted() {
            self.inner.events.emit(&ShellEvent::RouteChanged {
                to: Arc::clone(to),
                from: Arc::clone(from),
                error: None,
            });
        }
    }

    /// `true` if the active error is new since `navigation` started.
    fn has_fresh_error(&self, navigation: Option<&NavigationState>) -> bool {
        let error = self.error_state();
        let carried_over = navigation
            .is_some_and(|nav| nav.had_error() && nav.error_stamp_at_start() == error.stamp);
        error.is_errored() && !carried_over
    }

    fn set_layout_for_next_page(&self, to: &Arc<RouteSnapshot>, navigation: Option<&NavigationState>) {
        let ctx = NavigationContext::detached(self.clone(), Arc::clone(to), Arc::clone(to));
        let layout = if self.has_fresh_error(navigation) {
            self.inner.error_page.layout_for(&ctx)
        } else {
            to.matched
                .first()
                .and_then(|segment| segment.default_view())
                .and_then(|slot| slot.resolved())
                .and_then(|def| def.declared_layout().map(|layout| layout.resolve(&ctx)))
        };
        self.set_layout(layout.as_deref());
    }

    /// Re-initialise reused instances whose component refreshed its data.
    fn fix_prepatch(&self, to: &RouteSnapshot, navigation: Option<&NavigationState>) {
        let Some(navigation) = navigation else {
            return;
        };
        if navigation.change().is_unchanged() {
            return;
        }

        for (depth, matched) in to.matched_components().into_iter().enumerate() {
            let (Some(instance), Some(definition)) = (self.instance(depth), matched.slot.resolved())
            else {
                continue;
            };
            let refreshed = navigation
                .refresh_at(depth)
                .is_some_and(|record| record.data_refresh);

            if refreshed
                && instance.definition().same_as(&definition)
                && !instance.is_kept_alive()
                && definition.has_data()
            {
                trace_log!("Re-initialising '{}' at depth {}", definition.id(), depth);
                instance.merge(&self.initial_data_for(&definition));
                self.inner.events.emit(&ShellEvent::TriggerScroll);
            }
        }
        self.check_for_errors(navigation);
    }

    /// Clear the error if nothing raised one since `navigation` started.
    fn check_for_errors(&self, navigation: &NavigationState) {
        if navigation.had_error() && navigation.error_stamp_at_start() == self.error_state().stamp {
            debug_log!("Clearing error carried over by navigation #{}", navigation.id());
            self.error(None);
        }
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// State handed over by the server for the first client render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Hydration {
    /// The page markup was rendered by the server.
    pub server_rendered: bool,
    /// Path the server rendered.
    pub route_path: Option<String>,
    /// Error the server rendered.
    pub error: Option<AppError>,
}

/// How [`Shell::mount`] brought the application up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// Server markup for the same path was adopted as is.
    Hydrated,
    /// The pipeline ran for the initial route.
    Rendered,
    /// The pipeline redirected; the application mounted on the target.
    Redirected(String),
    /// A stale asset was detected; the host must reload.
    ReloadRequested,
}

fn is_same_path(a: &str, b: &str) -> bool {
    let trim = |p: &str| p.trim_end_matches('/').to_string();
    trim(a) == trim(b)
}

impl Shell {
    /// Bring the application up on the router's current route.
    pub async fn mount<R>(&self, router: &R, hydration: Hydration) -> HookResult<MountOutcome>
    where
        R: RouterContract + ?Sized,
    {
        let current = router.current_route();
        let components = match current.resolve_components().await {
            Ok(components) => components,
            Err(err) => {
                error_log!("Failed to resolve components of '{}': {}", current.path, err);
                router.on_error(&err);
                return Err(err);
            }
        };

        if !components.is_empty() {
            let definitions: Vec<_> = components
                .iter()
                .map(|c| Arc::clone(&c.definition))
                .collect();
            self.set_transitions(map_transitions(&definitions, &[], &current, None));
        }
        if let Some(error) = hydration.error.clone() {
            self.error(Some(error));
        }

        if hydration.server_rendered
            && hydration
                .route_path
                .as_deref()
                .is_some_and(|path| is_same_path(path, &current.path))
        {
            info_log!("Hydrating server-rendered '{}'", current.path);
            self.set_layout_for_next_page(&current, None);
            self.finish_mount(&current);
            return Ok(MountOutcome::Hydrated);
        }

        let report = self
            .run_navigation(
                Arc::clone(&current),
                Arc::clone(&current),
                Arc::new(Completion::recording()),
                true,
            )
            .await;

        match report.outcome {
            Some(NextAction::Redirect(location)) => {
                let route = match router.push(location.clone()).await {
                    Ok(route) => route,
                    Err(err) => {
                        router.on_error(&err);
                        router.current_route()
                    }
                };
                self.client_first_mount(&route);
                Ok(MountOutcome::Redirected(location))
            }
            Some(NextAction::Abort) => Ok(MountOutcome::ReloadRequested),
            _ => {
                self.client_first_mount(&current);
                Ok(MountOutcome::Rendered)
            }
        }
    }

    fn client_first_mount(&self, route: &Arc<RouteSnapshot>) {
        let navigation = self.last_navigation();
        self.set_layout_for_next_page(route, navigation.as_deref());
        if let Some(navigation) = &navigation {
            self.check_for_errors(navigation);
        }
        self.finish_mount(route);
    }

    fn finish_mount(&self, route: &Arc<RouteSnapshot>) {
        {
            let mut state = self.inner.state.lock();
            state.set_current_route(Arc::clone(route));
            state.set_mounted();
        }
        info_log!("Mounted on '{}'", route.full_path);
        self.inner.events.emit(&ShellEvent::Ready);
    }
}

// ============================================================================
// Refresh and component errors
// ============================================================================

/// Where a live component raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentErrorPhase {
    /// While rendering; the error boundary handles these.
    Render,
    /// In a lifecycle hook.
    Lifecycle,
    /// In an event handler.
    EventHandler,
    /// In a watcher.
    Watcher,
}

impl Shell {
    /// Re-run both loaders of every live instance.
    ///
    /// The indicator is started, failed on error, and always finished. The
    /// first error is raised through [`Shell::error`] and returned.
    pub async fn refresh(&self) -> HookResult {
        let instances: Vec<_> = self
            .inner
            .state
            .lock()
            .instances()
            .map(|(_, instance)| Arc::clone(instance))
            .collect();
        if instances.is_empty() {
            return Ok(());
        }

        let route = self
            .current_route()
            .unwrap_or_else(|| RouteSnapshot::default().shared());
        let ctx = NavigationContext::detached(self.clone(), Arc::clone(&route), route);

        debug_log!("Refreshing {} live instance(s)", instances.len());
        self.inner.progress.start();
        let results = join_all(
            instances
                .into_iter()
                .map(|instance| reload_instance(ctx.clone(), instance)),
        )
        .await;
        let result: HookResult = results.into_iter().collect();

        if let Err(err) = &result {
            error_log!("Refresh failed: {}", err);
            let error = self.normalize(err);
            self.inner.progress.fail(&error);
            self.handle_global_error(err);
            self.error(Some(error));
        }
        self.inner.progress.finish();
        result
    }

    /// Show the error page for an error raised by a live component.
    ///
    /// Render errors are left to the error boundary; returns `false` for
    /// them.
    pub async fn report_component_error(&self, err: &NavigationError, phase: ComponentErrorPhase) -> bool {
        if phase == ComponentErrorPhase::Render {
            return false;
        }

        let route = self
            .current_route()
            .unwrap_or_else(|| RouteSnapshot::default().shared());
        let ctx = NavigationContext::detached(self.clone(), Arc::clone(&route), route);
        let layout = self.inner.error_page.layout_for(&ctx);

        warn_log!("Component error during {:?}: {}", phase, err);
        self.load_layout(layout.as_deref()).await;
        self.set_layout(layout.as_deref());
        self.error(Some(self.normalize(err)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::MatchedRoute;

    fn page(path: &str, name: &str) -> Arc<RouteSnapshot> {
        RouteSnapshot::new(path)
            .name(name)
            .matched(MatchedRoute::new(path, ComponentDefinition::new(name)))
            .shared()
    }

    #[test]
    fn test_initial_state() {
        let shell = Shell::builder().build();
        assert_eq!(shell.layout().name, "default");
        assert_eq!(shell.transitions().len(), 1);
        assert!(!shell.is_mounted());
        assert!(!shell.error_state().is_errored());
    }

    #[test]
    fn test_self_navigation_is_noop() {
        let shell = Shell::builder().build();
        let home = page("/", "home");
        let report = pollster::block_on(shell.navigate(Arc::clone(&home), home));
        assert_eq!(report.change, RouteChange::Unchanged);
        assert_eq!(report.outcome, Some(NextAction::Proceed));
        assert!(!report.phases.contains(&NavigationPhase::Fetching));
    }

    #[test]
    fn test_set_transitions_normalises() {
        let shell = Shell::builder().build();
        shell.set_transitions(vec![TransitionSpec::named("fade"), TransitionSpec::new()]);
        let transitions = shell.transitions();
        assert_eq!(transitions[0].name(), Some("fade"));
        assert_eq!(transitions[1].name(), Some("page"));
    }

    #[test]
    fn test_is_same_path_ignores_trailing_slash() {
        assert!(is_same_path("/about/", "/about"));
        assert!(!is_same_path("/about", "/contact"));
    }

    #[test]
    fn test_mount_instance_uses_staged_data() {
        let shell = Shell::builder().build();
        let def = Arc::new(ComponentDefinition::new("page"));
        let mut data = PageData::new();
        data.insert("title".into(), serde_json::json!("Hello"));
        shell.stage_async_data(0, &def, data);

        let instance = shell.mount_instance(0, Arc::clone(&def), false);
        assert_eq!(instance.get("title"), Some(serde_json::json!("Hello")));

        shell.unmount_instance(0);
        assert!(instance.is_destroyed());
        assert!(shell.instance(0).is_none());
    }

    #[test]
    fn test_render_error_left_to_boundary() {
        let shell = Shell::builder().build();
        let err = NavigationError::from("boom");
        assert!(!pollster::block_on(
            shell.report_component_error(&err, ComponentErrorPhase::Render)
        ));
        assert!(pollster::block_on(
            shell.report_component_error(&err, ComponentErrorPhase::Lifecycle)
        ));
        assert_eq!(shell.error_state().error.unwrap().status_code, 500);
    }
}
