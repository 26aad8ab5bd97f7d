//! Test utilities for pipeline tests
//!
//! Provides route fixtures, recording doubles and small assertion helpers.

#![allow(dead_code)]

use futures::future::{BoxFuture, FutureExt};
use shell_navigator::component::{ComponentDefinition, PageData};
use shell_navigator::events::ShellEvent;
use shell_navigator::middleware::{middleware_fn, Middleware};
use shell_navigator::progress::ProgressIndicator;
use shell_navigator::route::MatchedRoute;
use shell_navigator::{AppError, HookResult, NavigationContext, QueryParams, RouteSnapshot, Shell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Enable `RUST_LOG` output for a test run.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Single-segment route rendering `component`.
pub fn page(path: &str, name: &str, component: ComponentDefinition) -> Arc<RouteSnapshot> {
    RouteSnapshot::new(path)
        .name(name)
        .matched(MatchedRoute::new(path, component))
        .shared()
}

/// `/a/:id` route with the given param and component.
pub fn param_page(id: &str, component: Arc<ComponentDefinition>) -> Arc<RouteSnapshot> {
    RouteSnapshot::new(format!("/a/{id}"))
        .name("a")
        .param("id", id)
        .matched(MatchedRoute::new("/a/:id", component))
        .shared()
}

/// `/list` route with the given query and component.
pub fn list_page(query: &[(&str, &str)], component: Arc<ComponentDefinition>) -> Arc<RouteSnapshot> {
    let query = query
        .iter()
        .fold(QueryParams::new(), |q, (k, v)| q.with(*k, *v));
    RouteSnapshot::new("/list")
        .name("list")
        .query(query)
        .matched(MatchedRoute::new("/list", component))
        .shared()
}

/// Route that matched nothing.
pub fn unmatched(path: &str) -> Arc<RouteSnapshot> {
    RouteSnapshot::new(path).shared()
}

/// Page data with one entry.
pub fn data(key: &str, value: serde_json::Value) -> PageData {
    let mut data = PageData::new();
    data.insert(key.to_string(), value);
    data
}

/// Counts calls of a loader or middleware.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Middleware that only counts its invocations.
pub fn counting_middleware(counter: &Counter) -> impl Middleware {
    let counter = counter.clone();
    middleware_fn(move |_ctx| {
        counter.hit();
        futures::future::ready(HookResult::Ok(()))
    })
}

/// Async data loader that counts calls and returns `result`.
pub fn counting_loader(
    counter: &Counter,
    result: PageData,
) -> impl Fn(NavigationContext) -> BoxFuture<'static, HookResult<PageData>> + Send + Sync + 'static {
    let counter = counter.clone();
    move |_ctx| {
        counter.hit();
        futures::future::ready(HookResult::Ok(result.clone())).boxed()
    }
}

/// Progress indicator recording every call.
#[derive(Default)]
pub struct RecordingProgress {
    calls: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl ProgressIndicator for RecordingProgress {
    fn start(&self) {
        self.record("start");
    }

    fn increase(&self, percent: u8) {
        self.record(format!("increase({percent})"));
    }

    fn pause(&self) {
        self.record("pause");
    }

    fn fail(&self, error: &AppError) {
        self.record(format!("fail({})", error.status_code));
    }

    fn finish(&self) {
        self.record("finish");
    }
}

/// Collects emitted events.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<ShellEvent>>>);

impl EventLog {
    pub fn attach(shell: &Shell) -> Self {
        let log = Self::default();
        let sink = log.clone();
        shell.on_event(move |event| sink.0.lock().unwrap().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ShellEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

/// Assert the shell shows an error with `status`.
pub fn assert_error_status(shell: &Shell, status: u16) {
    let state = shell.error_state();
    let error = state.error.expect("expected an active error");
    assert_eq!(error.status_code, status, "unexpected error: {error}");
}
