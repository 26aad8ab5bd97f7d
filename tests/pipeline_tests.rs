//! Scenario tests for the navigation pipeline
//!
//! Each test drives `Shell::before_each` / `Shell::navigate` with hand-built
//! route snapshots and checks completion, error state, progress calls and
//! emitted events.

mod common;

use common::*;
use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use shell_navigator::component::{ComponentDefinition, ComponentSlot, PageData, WatchQuery};
use shell_navigator::context::NextAction;
use shell_navigator::diff::{classify, NavigationPhase, RouteChange};
use shell_navigator::error::NOT_FOUND_MESSAGE;
use shell_navigator::events::ShellEvent;
use shell_navigator::layout::LayoutDefinition;
use shell_navigator::route::MatchedRoute;
use shell_navigator::transition::{TransitionSpec, TransitionValue};
use shell_navigator::{
    AppError, HookResult, Hydration, MountOutcome, NavigationError, QueryParams, RouteSnapshot,
    RouterContract, Shell, ShellBuilder,
};
use std::sync::{Arc, Mutex};

/// Router double that always reports the same current route.
struct StubRouter {
    current: Arc<RouteSnapshot>,
}

impl RouterContract for StubRouter {
    fn resolve(&self, _location: &str) -> Arc<RouteSnapshot> {
        Arc::clone(&self.current)
    }

    fn current_route(&self) -> Arc<RouteSnapshot> {
        Arc::clone(&self.current)
    }

    fn push(&self, location: String) -> BoxFuture<'static, HookResult<Arc<RouteSnapshot>>> {
        let route = RouteSnapshot::new(location).shared();
        async move { Ok(route) }.boxed()
    }
}

/// Build a shell and hydrate it on `route` so it counts as mounted.
fn mounted_shell(builder: ShellBuilder, route: &Arc<RouteSnapshot>) -> Shell {
    let shell = builder.build();
    let router = StubRouter {
        current: Arc::clone(route),
    };
    let hydration = Hydration {
        server_rendered: true,
        route_path: Some(route.path.clone()),
        error: None,
    };
    let outcome = pollster::block_on(shell.mount(&router, hydration)).unwrap();
    assert_eq!(outcome, MountOutcome::Hydrated);
    assert!(shell.is_mounted());
    shell
}

fn home() -> Arc<RouteSnapshot> {
    page("/", "home", ComponentDefinition::new("home"))
}

// ---- completion ----

#[tokio::test]
async fn test_self_navigation_runs_no_loaders() {
    init_logging();
    let loads = Counter::new();
    let route = page(
        "/",
        "home",
        ComponentDefinition::new("home").async_data(counting_loader(&loads, PageData::new())),
    );
    let shell = Shell::builder().build();

    let calls = Counter::new();
    let recorded = calls.clone();
    let report = shell
        .before_each(Arc::clone(&route), route, move |action| {
            assert_eq!(action, NextAction::Proceed);
            recorded.hit();
        })
        .await;

    assert_eq!(report.change, RouteChange::Unchanged);
    assert_eq!(loads.get(), 0);
    assert_eq!(calls.get(), 1);
    assert!(!report.phases.contains(&NavigationPhase::RunningGlobalMiddleware));
}

#[tokio::test]
async fn test_completion_called_once_when_loader_redirects() {
    let fetches = Counter::new();
    let counted = fetches.clone();
    let private = page(
        "/private",
        "private",
        ComponentDefinition::new("private")
            .async_data(|ctx| async move { Err(ctx.redirect("/login")) })
            .fetch(move |_ctx| {
                counted.hit();
                async { Ok(()) }
            }),
    );
    let shell = Shell::builder().build();

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let report = shell
        .before_each(private, home(), move |action| sink.lock().unwrap().push(action))
        .await;

    assert_eq!(fetches.get(), 1);
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![NextAction::Redirect("/login".into())]
    );
    assert_eq!(report.outcome, Some(NextAction::Redirect("/login".into())));
    assert!(shell.error_state().error.is_none());
}

// ---- classification ----

#[test]
fn test_classification_priority() {
    let from = RouteSnapshot::new("/a/1")
        .name("a")
        .param("id", "1")
        .query(QueryParams::new().with("x", "1"));
    let to = RouteSnapshot::new("/b/2")
        .name("b")
        .param("id", "2")
        .query(QueryParams::new().with("x", "2"));

    let change = classify(&to, &from, false);
    assert_eq!(change, RouteChange::Route);
    assert!(!change.param_changed());
    assert!(!change.query_changed());

    let same_name = RouteSnapshot::new("/a/2").name("a").param("id", "2");
    assert_eq!(classify(&same_name, &from, false), RouteChange::Param);
}

// ---- data fetch decisions ----

#[test]
fn test_watch_query_disabled_ignores_query_change() {
    let loads = Counter::new();
    let list = Arc::new(
        ComponentDefinition::new("list").async_data(counting_loader(&loads, PageData::new())),
    );
    let from = list_page(&[("page", "1")], Arc::clone(&list));
    let shell = mounted_shell(Shell::builder(), &from);

    let to = list_page(&[("page", "2")], list);
    let report = pollster::block_on(shell.navigate(to, from));

    assert_eq!(report.change, RouteChange::Query);
    assert_eq!(loads.get(), 0);
    assert_eq!(report.outcome, Some(NextAction::Proceed));
}

#[test]
fn test_watch_query_keys_refresh_only_on_listed_keys() {
    let loads = Counter::new();
    let list = Arc::new(
        ComponentDefinition::new("list")
            .watch_query(WatchQuery::keys(["sort"]))
            .async_data(counting_loader(&loads, PageData::new())),
    );
    let start = list_page(&[("sort", "asc"), ("page", "1")], Arc::clone(&list));
    let shell = mounted_shell(Shell::builder(), &start);

    let next_page = list_page(&[("sort", "asc"), ("page", "2")], Arc::clone(&list));
    pollster::block_on(shell.navigate(Arc::clone(&next_page), start));
    assert_eq!(loads.get(), 0);

    let sorted = list_page(&[("sort", "desc"), ("page", "2")], list);
    pollster::block_on(shell.navigate(sorted, next_page));
    assert_eq!(loads.get(), 1);
}

#[test]
fn test_watch_query_predicate_sees_instance_and_queries() {
    let loads = Counter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let list = Arc::new(
        ComponentDefinition::new("list")
            .watch_query(WatchQuery::predicate(move |instance, next, previous| {
                sink.lock().unwrap().push((
                    next.get("page").map(str::to_string),
                    previous.get("page").map(str::to_string),
                ));
                instance.and_then(|i| i.get("live")) == Some(json!(true))
            }))
            .async_data(counting_loader(&loads, PageData::new())),
    );
    let start = list_page(&[("page", "1")], Arc::clone(&list));
    let shell = mounted_shell(Shell::builder(), &start);

    let second = list_page(&[("page", "2")], Arc::clone(&list));
    pollster::block_on(shell.navigate(Arc::clone(&second), start));
    assert_eq!(loads.get(), 0);

    let instance = shell.mount_instance(0, Arc::clone(&list), false);
    instance.merge(&data("live", json!(true)));
    let third = list_page(&[("page", "3")], list);
    pollster::block_on(shell.navigate(third, second));

    assert_eq!(loads.get(), 1);
    assert_eq!(
        seen.lock().unwrap().last().cloned(),
        Some((Some("3".to_string()), Some("2".to_string())))
    );
}

#[tokio::test]
async fn test_loaders_of_all_components_start_together() {
    let (tx, rx) = futures::channel::oneshot::channel::<()>();
    let rx = Arc::new(Mutex::new(Some(rx)));
    let tx = Arc::new(Mutex::new(Some(tx)));

    let parent = ComponentDefinition::new("parent").async_data(move |_ctx| {
        let rx = rx.lock().unwrap().take();
        async move {
            let Some(rx) = rx else {
                return HookResult::Ok(PageData::new());
            };
            match rx.await {
                Ok(()) => HookResult::Ok(data("parent", json!(true))),
                Err(_) => Err(NavigationError::Message("sender dropped".into())),
            }
        }
    });
    let child = ComponentDefinition::new("child").async_data(move |_ctx| {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        async { HookResult::Ok(data("child", json!(true))) }
    });
    let route = RouteSnapshot::new("/p/c")
        .name("child")
        .matched(MatchedRoute::new("/p", parent))
        .matched(MatchedRoute::new("/p/c", child))
        .shared();
    let shell = Shell::builder().build();

    let report = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        shell.navigate(route, home()),
    )
    .await
    .expect("parent loader waited for a child loader that never started");

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert!(shell.error_state().error.is_none());
}

#[test]
fn test_param_change_with_watch_param_disabled() {
    let loads = Counter::new();
    let user = Arc::new(
        ComponentDefinition::new("a")
            .watch_param(false)
            .async_data(counting_loader(&loads, PageData::new())),
    );
    let from = param_page("1", Arc::clone(&user));
    let shell = mounted_shell(Shell::builder(), &from);

    let report = pollster::block_on(shell.navigate(param_page("2", user), from));

    assert_eq!(report.change, RouteChange::Param);
    let record = shell.last_navigation().unwrap().refresh_at(0).unwrap();
    assert!(!record.data_refresh);
    assert!(!record.needs_refresh);
    assert_eq!(loads.get(), 0);
}

#[test]
fn test_unmounted_shell_always_loads() {
    let loads = Counter::new();
    let user = Arc::new(
        ComponentDefinition::new("a")
            .watch_param(false)
            .async_data(counting_loader(&loads, data("name", json!("ada")))),
    );
    let shell = Shell::builder().build();

    pollster::block_on(shell.navigate(param_page("2", Arc::clone(&user)), param_page("1", user.clone())));

    assert_eq!(loads.get(), 1);
    assert_eq!(
        shell.staged_data(user.id()).unwrap().get("name"),
        Some(&json!("ada"))
    );
}

#[tokio::test]
async fn test_async_data_merges_into_live_instance() {
    let user = Arc::new(
        ComponentDefinition::new("user").async_data(|ctx| async move {
            let id = ctx.params().get("id").unwrap_or_default().to_string();
            Ok(data("id", json!(id)))
        }),
    );
    let from = param_page("1", Arc::clone(&user));
    let shell = mounted_shell(Shell::builder(), &from);
    let instance = shell.mount_instance(0, Arc::clone(&user), false);

    shell.navigate(param_page("2", user), from).await;

    assert_eq!(instance.get("id"), Some(json!("2")));
}

// ---- progress ----

#[tokio::test]
async fn test_progress_increments_per_loader() {
    let progress = RecordingProgress::new();
    let both = page(
        "/both",
        "both",
        ComponentDefinition::new("both")
            .async_data(|_ctx| async { Ok(PageData::new()) })
            .fetch(|_ctx| async { Ok(()) }),
    );
    let shell = Shell::builder().progress(progress.clone()).build();

    shell.navigate(both, home()).await;

    assert_eq!(
        progress.calls(),
        vec!["start", "increase(30)", "increase(30)", "finish"]
    );
}

#[tokio::test]
async fn test_manual_progress_is_not_finished() {
    let progress = RecordingProgress::new();
    let manual = page(
        "/manual",
        "manual",
        ComponentDefinition::new("manual")
            .loading(false)
            .fetch(|_ctx| async { Ok(()) }),
    );
    let shell = Shell::builder().progress(progress.clone()).build();

    let report = shell.navigate(manual, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert!(shell.progress().is_manual());
    assert_eq!(progress.calls(), vec!["start", "increase(45)"]);
}

// ---- transitions ----

#[tokio::test]
async fn test_transition_merge_keeps_outgoing_leave() {
    let from = page(
        "/fade",
        "fade",
        ComponentDefinition::new("fade")
            .transition(TransitionSpec::named("fade").with("leave", "fadeOut")),
    );
    let to = page(
        "/slide",
        "slide",
        ComponentDefinition::new("slide").transition(TransitionSpec::named("slide")),
    );
    let shell = Shell::builder().build();

    shell.navigate(to, from).await;

    let transitions = shell.transitions();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].name(), Some("slide"));
    assert_eq!(
        transitions[0].get("leave").and_then(TransitionValue::as_text),
        Some("fadeOut")
    );
    assert_eq!(
        transitions[0].get("mode").and_then(TransitionValue::as_text),
        Some("out-in")
    );
}

// ---- validation ----

#[tokio::test]
async fn test_validate_false_yields_404() {
    let loads = Counter::new();
    let route = page(
        "/item",
        "item",
        ComponentDefinition::new("item")
            .validate(|_ctx| async { Ok(false) })
            .async_data(counting_loader(&loads, PageData::new())),
    );
    let shell = Shell::builder().build();

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert_error_status(&shell, 404);
    assert_eq!(report.error.unwrap().message, NOT_FOUND_MESSAGE);
    assert_eq!(loads.get(), 0);
    assert!(!report.phases.contains(&NavigationPhase::Fetching));
}

#[tokio::test]
async fn test_validate_error_keeps_its_status() {
    let route = page(
        "/admin",
        "admin",
        ComponentDefinition::new("admin")
            .validate(|_ctx| async { Err(AppError::new(403, "Forbidden").into()) }),
    );
    let shell = Shell::builder().build();

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert_error_status(&shell, 403);
}

// ---- middleware ----

#[tokio::test]
async fn test_unknown_middleware_aborts_chain_with_500() {
    let counted = Counter::new();
    let shell = Shell::builder().build();
    let route = page(
        "/page",
        "page",
        ComponentDefinition::new("page")
            .middleware("nope")
            .middleware_inline(counting_middleware(&counted)),
    );

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert_error_status(&shell, 500);
    assert_eq!(shell.error_state().error.unwrap().message, "Unknown middleware nope");
    assert_eq!(counted.get(), 0);
}

#[tokio::test]
async fn test_redirect_in_global_middleware_skips_scoped() {
    let progress = RecordingProgress::new();
    let scoped = Counter::new();
    let shell = Shell::builder()
        .progress(progress.clone())
        .middleware(
            "auth",
            shell_navigator::middleware_fn(|ctx| async move { Err(ctx.redirect("/login")) }),
        )
        .build();
    let events = EventLog::attach(&shell);
    let route = page(
        "/account",
        "account",
        ComponentDefinition::new("account").middleware_inline(counting_middleware(&scoped)),
    );

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Redirect("/login".into())));
    assert_eq!(scoped.get(), 0);
    assert_eq!(progress.calls(), vec!["start", "pause"]);
    assert_eq!(
        events.count(|e| matches!(e, ShellEvent::RouteChanged { error: None, .. })),
        1
    );
}

#[tokio::test]
async fn test_layout_middleware_runs_before_component_middleware() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let log = |name: &'static str| {
        let order = Arc::clone(&order);
        shell_navigator::middleware_fn(move |_ctx| {
            order.lock().unwrap().push(name);
            futures::future::ready(HookResult::Ok(()))
        })
    };
    let shell = Shell::builder()
        .layout(LayoutDefinition::new("admin").middleware_inline(log("layout")))
        .middleware("global", log("global"))
        .build();
    let route = page(
        "/admin",
        "admin",
        ComponentDefinition::new("admin")
            .layout("admin")
            .middleware_inline(log("page")),
    );

    shell.navigate(Arc::clone(&route), home()).await;
    shell.after_each(&route, &home());

    assert_eq!(*order.lock().unwrap(), vec!["global", "layout", "page"]);
    assert_eq!(shell.layout().name, "admin");
}

#[tokio::test]
async fn test_registered_middleware_runs_in_global_chain() {
    let tracked = Counter::new();
    let shell = Shell::builder()
        .middleware("track", counting_middleware(&tracked))
        .build();
    let from = page("/a", "a", ComponentDefinition::new("a"));
    let to = page("/b", "b", ComponentDefinition::new("b"));

    let report = shell.navigate(to, from).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert_eq!(tracked.get(), 1);
}

#[tokio::test]
async fn test_named_page_middleware_also_runs_globally() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    let shell = Shell::builder()
        .middleware(
            "stats",
            shell_navigator::middleware_fn(move |ctx| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(ctx.route().path.clone());
                    HookResult::Ok(())
                }
            }),
        )
        .global_middleware(shell_navigator::middleware_fn(|_ctx| async { HookResult::Ok(()) }))
        .build();
    let route = page("/stats", "stats", ComponentDefinition::new("stats").middleware("stats"));

    shell.navigate(route, home()).await;

    assert_eq!(*order.lock().unwrap(), vec!["/stats", "/stats"]);
}

// ---- error recovery ----

#[tokio::test]
async fn test_unmatched_path_yields_404_without_redirect() {
    let shell = Shell::builder()
        .layout(LayoutDefinition::new("blank"))
        .error_layout("blank")
        .build();
    let to = unmatched("/nowhere");

    let report = shell.navigate(Arc::clone(&to), home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    let error = shell.error_state().error.unwrap();
    assert_eq!(error.status_code, 404);
    assert_eq!(error.message, "This page could not be found");

    shell.after_each(&to, &home());
    assert_eq!(shell.layout().name, "blank");
}

#[tokio::test]
async fn test_loader_failure_recovers_to_error_page() {
    let progress = RecordingProgress::new();
    let hook_calls = Counter::new();
    let counted = hook_calls.clone();
    let shell = Shell::builder()
        .progress(progress.clone())
        .layout(LayoutDefinition::new("blank"))
        .error_layout("blank")
        .on_error(move |_err| counted.hit())
        .build();
    let events = EventLog::attach(&shell);
    let route = page(
        "/report",
        "report",
        ComponentDefinition::new("report").fetch(|_ctx| async { Err("database offline".into()) }),
    );

    let report = shell.navigate(Arc::clone(&route), home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert!(report.phases.contains(&NavigationPhase::ErrorRecovery));
    assert_error_status(&shell, 500);
    assert_eq!(hook_calls.get(), 1);
    assert_eq!(progress.calls(), vec!["start", "fail(500)", "finish"]);
    assert_eq!(
        events.count(|e| matches!(e, ShellEvent::RouteChanged { error: Some(_), .. })),
        1
    );

    shell.after_each(&route, &home());
    assert_eq!(shell.layout().name, "blank");
}

#[tokio::test]
async fn test_stale_asset_requests_reload() {
    let shell = Shell::builder().build();
    let events = EventLog::attach(&shell);
    let route = page(
        "/chunked",
        "chunked",
        ComponentDefinition::new("chunked")
            .fetch(|_ctx| async { Err(NavigationError::from("Loading chunk 42 failed.")) }),
    );

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Abort));
    assert!(shell.error_state().error.is_none());
    assert_eq!(
        events.count(|e| matches!(e, ShellEvent::ReloadRequested { path } if path == "/chunked")),
        1
    );
}

#[tokio::test]
async fn test_lazy_component_failure_is_recovered() {
    let shell = Shell::builder().build();
    let route = RouteSnapshot::new("/lazy")
        .name("lazy")
        .matched(MatchedRoute::new(
            "/lazy",
            ComponentSlot::lazy("lazy", || async { Err("network down".into()) }),
        ))
        .shared();

    let report = shell.navigate(route, home()).await;

    assert_eq!(report.outcome, Some(NextAction::Proceed));
    assert_error_status(&shell, 500);
}

#[tokio::test]
async fn test_lazy_component_is_resolved_once() {
    let loads = Counter::new();
    let counted = loads.clone();
    let slot = Arc::new(ComponentSlot::lazy("lazy", move || {
        counted.hit();
        async { Ok(ComponentDefinition::new("lazy")) }
    }));
    let lazy = |path: &str| {
        RouteSnapshot::new(path)
            .name("lazy")
            .matched(MatchedRoute::from_slot("/lazy/:id", Arc::clone(&slot)))
            .shared()
    };
    let shell = Shell::builder().build();

    shell.navigate(lazy("/lazy/1"), home()).await;
    shell.navigate(lazy("/lazy/2"), lazy("/lazy/1")).await;

    assert_eq!(loads.get(), 1);
}

// ---- after navigation ----

#[tokio::test]
async fn test_carried_over_error_is_cleared_after_next_navigation() {
    let shell = Shell::builder().build();
    shell.error(Some(AppError::internal("boom")));
    let about = page("/about", "about", ComponentDefinition::new("about"));

    let report = shell.navigate(Arc::clone(&about), home()).await;
    assert_eq!(report.change, RouteChange::Route);
    shell.after_each(&about, &home());

    assert!(shell.error_state().error.is_none());
}

#[tokio::test]
async fn test_reused_instance_is_reinitialised() {
    let user = Arc::new(
        ComponentDefinition::new("user")
            .data(|| data("tab", json!("overview")))
            .fetch(|_ctx| async { Ok(()) }),
    );
    let from = param_page("1", Arc::clone(&user));
    let shell = mounted_shell(Shell::builder(), &from);
    let events = EventLog::attach(&shell);
    let instance = shell.mount_instance(0, Arc::clone(&user), false);
    instance.merge(&data("tab", json!("settings")));

    let to = param_page("2", user);
    shell.navigate(Arc::clone(&to), Arc::clone(&from)).await;
    shell.after_each(&to, &from);

    assert_eq!(instance.get("tab"), Some(json!("overview")));
    assert_eq!(events.count(|e| matches!(e, ShellEvent::TriggerScroll)), 1);
    assert_eq!(
        events.count(|e| matches!(e, ShellEvent::RouteChanged { .. })),
        1
    );
}

#[tokio::test]
async fn test_outlet_before_enter_triggers_scroll() {
    let shell = Shell::builder().build();
    let events = EventLog::attach(&shell);
    let entered = Counter::new();
    let counted = entered.clone();
    shell.set_transitions(vec![TransitionSpec::named("fade").hook("beforeEnter", move |_| {
        counted.hit()
    })]);

    let outlet = shell.outlet_transition(0);
    assert!(outlet.fire("beforeEnter"));

    assert_eq!(entered.get(), 1);
    assert_eq!(events.count(|e| matches!(e, ShellEvent::TriggerScroll)), 1);
    assert_eq!(
        outlet.props.get("name").and_then(TransitionValue::as_text),
        Some("fade")
    );
}

// ---- mount and refresh ----

#[tokio::test]
async fn test_mount_runs_pipeline_when_not_hydrated() {
    let loads = Counter::new();
    let route = page(
        "/",
        "home",
        ComponentDefinition::new("home").async_data(counting_loader(&loads, PageData::new())),
    );
    let shell = Shell::builder().build();
    let events = EventLog::attach(&shell);
    let router = StubRouter {
        current: Arc::clone(&route),
    };

    let outcome = shell.mount(&router, Hydration::default()).await.unwrap();

    assert_eq!(outcome, MountOutcome::Rendered);
    assert_eq!(loads.get(), 1);
    assert!(shell.is_mounted());
    assert_eq!(events.count(|e| matches!(e, ShellEvent::Ready)), 1);
}

#[tokio::test]
async fn test_mount_adopts_hydration_error() {
    let route = home();
    let shell = Shell::builder().build();
    let router = StubRouter {
        current: Arc::clone(&route),
    };
    let hydration = Hydration {
        server_rendered: true,
        route_path: Some("/".into()),
        error: Some(AppError::not_found()),
    };

    let outcome = shell.mount(&router, hydration).await.unwrap();

    assert_eq!(outcome, MountOutcome::Hydrated);
    assert_error_status(&shell, 404);
}

#[tokio::test]
async fn test_refresh_reloads_live_instances() {
    let loads = Counter::new();
    let user = Arc::new(
        ComponentDefinition::new("user").async_data(counting_loader(&loads, data("fresh", json!(true)))),
    );
    let route = param_page("1", Arc::clone(&user));
    let shell = mounted_shell(Shell::builder(), &route);
    let instance = shell.mount_instance(0, user, false);

    shell.refresh().await.unwrap();

    assert_eq!(loads.get(), 1);
    assert_eq!(instance.get("fresh"), Some(json!(true)));
}

#[tokio::test]
async fn test_refresh_failure_raises_error() {
    let progress = RecordingProgress::new();
    let broken = Arc::new(
        ComponentDefinition::new("broken").fetch(|_ctx| async { Err(AppError::new(503, "Unavailable").into()) }),
    );
    let route = param_page("1", Arc::clone(&broken));
    let shell = mounted_shell(Shell::builder().progress(progress.clone()), &route);
    shell.mount_instance(0, broken, false);

    let result = shell.refresh().await;

    assert!(result.is_err());
    assert_error_status(&shell, 503);
    assert_eq!(progress.calls().first().map(String::as_str), Some("start"));
    assert!(progress.calls().contains(&"fail(503)".to_string()));
    assert_eq!(progress.calls().last().map(String::as_str), Some("finish"));
}

// ---- events ----

#[tokio::test]
async fn test_removed_listener_misses_later_navigations() {
    let shell = mounted_shell(Shell::builder(), &home());
    let seen = Counter::new();
    let counter = seen.clone();
    let id = shell.on_event(move |event| {
        if matches!(event, ShellEvent::RouteChanged { .. }) {
            counter.hit();
        }
    });
    let about = page("/about", "about", ComponentDefinition::new("about"));

    shell.navigate(Arc::clone(&about), home()).await;
    shell.after_each(&about, &home());
    assert_eq!(seen.get(), 1);

    assert!(shell.off_event(id));
    shell.navigate(home(), Arc::clone(&about)).await;
    shell.after_each(&home(), &about);
    assert_eq!(seen.get(), 1);
    assert!(shell.events().is_empty());
}
