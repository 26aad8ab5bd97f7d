//! Data-fetch coordinator.
//!
//! Decides, per matched component, whether its loaders must run and runs
//! them.
//!
//! # Refresh decision
//!
//! Evaluated in order; the first matching rule sets `data_refresh`:
//!
//! | Rule | Condition | `data_refresh` |
//! |------|-----------|----------------|
//! | 1 | route changed and the component's resolved path changed | `true` |
//! | 2 | params changed and the resolved path changed | the component's `watch_param` |
//! | 3 | query changed | the component's [`WatchQuery`](crate::component::WatchQuery) policy |
//!
//! Loaders run when `data_refresh` is set, when an error was shown at
//! navigation start, or before the application mounted.
//!
//! # Execution
//!
//! Every selected component launches its async-data loader and its fetch
//! hook together, and all components run together. The navigation waits for
//! everything to settle. Each settled loader advances the progress indicator
//! by the configured increment (45 by default, 30 when the component has
//! both loaders). Async data is staged for instances created later and
//! merged key by key into a live instance of the same component.

use crate::component::{ComponentDefinition, ComponentInstance, PageData};
use crate::context::NavigationContext;
use crate::diff::{NavigationState, RefreshRecord, RouteChange};
use crate::error::HookResult;
use crate::route::ResolvedComponent;
use crate::{debug_log, QueryParams, Shell};
use futures::future::{join_all, OptionFuture};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Inputs of the refresh decision for one component.
#[derive(Debug, Clone, Copy)]
pub struct RefreshInputs<'a> {
    /// Classification of the navigation.
    pub change: RouteChange,
    /// Query keys that changed.
    pub query_diff: &'a BTreeSet<String>,
    /// The component's resolved path on the incoming route.
    pub resolved_path: &'a str,
    /// Resolved path recorded at the same depth on the outgoing route.
    pub previous_path: Option<&'a str>,
    /// An error was shown when the navigation started.
    pub had_error: bool,
    /// The application has mounted.
    pub mounted: bool,
    /// Live instance at the same depth.
    pub instance: Option<&'a ComponentInstance>,
    /// Incoming query.
    pub to_query: &'a QueryParams,
    /// Outgoing query.
    pub from_query: &'a QueryParams,
}

/// Result of the refresh decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshDecision {
    /// Set by one of the three change rules.
    pub data_refresh: bool,
    /// Loaders must run.
    pub needs_refresh: bool,
}

/// Apply the decision table to `component`.
pub fn decide_refresh(component: &ComponentDefinition, inputs: &RefreshInputs<'_>) -> RefreshDecision {
    let path_changed = inputs.previous_path != Some(inputs.resolved_path);

    let data_refresh = match inputs.change {
        RouteChange::Route if path_changed => true,
        RouteChange::Param if path_changed => component.watches_params(),
        RouteChange::Query => component.watch_query_policy().selects(
            inputs.query_diff,
            inputs.instance,
            inputs.to_query,
            inputs.from_query,
        ),
        _ => false,
    };

    RefreshDecision {
        data_refresh,
        needs_refresh: data_refresh || inputs.had_error || !inputs.mounted,
    }
}

/// Runs the loaders of one navigation.
#[derive(Debug)]
pub struct DataFetchCoordinator<'a> {
    shell: &'a Shell,
    ctx: &'a NavigationContext,
}

impl<'a> DataFetchCoordinator<'a> {
    /// Coordinator for the navigation behind `ctx`.
    pub fn new(shell: &'a Shell, ctx: &'a NavigationContext) -> Self {
        Self { shell, ctx }
    }

    /// Decide and run loaders for every matched component.
    ///
    /// Waits for every launched loader, then returns the first error in
    /// matched order.
    pub async fn run(&self, components: &[ResolvedComponent]) -> HookResult {
        let navigation = self.ctx.navigation();
        let to = self.ctx.route();
        let from = self.ctx.from();
        let resolved_paths = to.resolved_paths(self.shell.paths());
        let mounted = self.shell.is_mounted();

        self.shell
            .progress()
            .set_manual(components.iter().any(|c| c.definition.loading_disabled()));

        let mut selected = Vec::new();
        for component in components {
            let instance = self
                .shell
                .instance(component.depth)
                .filter(|instance| instance.definition().same_as(&component.definition));
            let resolved_path = resolved_paths
                .get(component.depth)
                .map_or(component.template.as_str(), String::as_str);

            let inputs = RefreshInputs {
                change: navigation.change(),
                query_diff: navigation.query_diff(),
                resolved_path,
                previous_path: navigation.previous_path(component.depth),
                had_error: navigation.had_error(),
                mounted,
                instance: instance.as_deref(),
                to_query: &to.query,
                from_query: &from.query,
            };
            let decision = decide_refresh(&component.definition, &inputs);
            debug_log!(
                "Navigation #{}: '{}' at depth {} -> {:?}",
                navigation.id(),
                component.definition.id(),
                component.depth,
                decision
            );
            record(navigation, component, decision);

            if decision.needs_refresh {
                selected.push(component);
            }
        }

        let results = join_all(selected.into_iter().map(|c| self.load_component(c))).await;
        results.into_iter().collect()
    }

    async fn load_component(&self, component: &ResolvedComponent) -> HookResult {
        let definition = &component.definition;
        let async_data = definition.async_data_hook().cloned();
        let fetch = definition.fetch_hook().cloned();
        let increase = self
            .shell
            .config()
            .loader_increase(async_data.is_some(), fetch.is_some());

        let async_data = OptionFuture::from(async_data.map(|hook| {
            let ctx = self.ctx.clone();
            async move {
                let data = hook(ctx).await?;
                self.apply_async_data(component, data);
                self.shell.progress().increase(increase);
                HookResult::Ok(())
            }
        }));
        let fetch = OptionFuture::from(fetch.map(|hook| {
            let ctx = self.ctx.clone();
            async move {
                hook(ctx).await?;
                self.shell.progress().increase(increase);
                HookResult::Ok(())
            }
        }));

        let (async_data, fetch) = futures::join!(async_data, fetch);
        async_data.transpose()?;
        fetch.transpose()?;
        Ok(())
    }

    fn apply_async_data(&self, component: &ResolvedComponent, data: PageData) {
        self.shell
            .stage_async_data(component.depth, &component.definition, data);
    }
}

fn record(navigation: &NavigationState, component: &ResolvedComponent, decision: RefreshDecision) {
    navigation.record_refresh(RefreshRecord {
        depth: component.depth,
        component: component.definition.id().to_string(),
        version: component.definition.definition_version(),
        data_refresh: decision.data_refresh,
        needs_refresh: decision.needs_refresh,
    });
}

/// Run both loaders of a live instance, merging async data into it.
///
/// Used by [`Shell::refresh`].
pub(crate) async fn reload_instance(ctx: NavigationContext, instance: Arc<ComponentInstance>) -> HookResult {
    let definition = Arc::clone(instance.definition());

    let fetch = OptionFuture::from(definition.fetch_hook().map(|hook| hook(ctx.clone())));
    let async_data = OptionFuture::from(definition.async_data_hook().map(|hook| {
        let instance = Arc::clone(&instance);
        let loader = hook(ctx.clone());
        async move {
            let data = loader.await?;
            instance.merge(&data);
            HookResult::Ok(())
        }
    }));

    let (fetch, async_data) = futures::join!(fetch, async_data);
    fetch.transpose()?;
    async_data.transpose()?;
    Ok(())
}
