//! # shell-navigator
//!
//! Navigation orchestration for a client-side application shell.
//!
//! A router decides *where* the user is going. The shell decides what has to
//! happen before the page may show: which middleware runs, which layout
//! wraps the page, which data loaders must re-run, which transition plays,
//! and what to show when any of that fails.
//!
//! ## Pipeline
//!
//! ```text
//! router "before" ─► Shell::before_each
//!                      ├─ resolve matched components (lazy ones load here)
//!                      ├─ classify the change (route > param > query)
//!                      ├─ global middleware
//!                      ├─ layout resolution
//!                      ├─ layout + component middleware
//!                      ├─ validation
//!                      ├─ data loaders (all components concurrently)
//!                      └─ commit transitions, finish progress, complete
//! router "after"  ─► Shell::after_each
//! ```
//!
//! Any failure is recovered in one place: the error layout is loaded, the
//! error is raised through [`Shell::error`] and the router is still told to
//! proceed so the error view can render.
//!
//! ## Quick start
//!
//! ```
//! use shell_navigator::component::ComponentDefinition;
//! use shell_navigator::context::NextAction;
//! use shell_navigator::middleware::middleware_fn;
//! use shell_navigator::route::MatchedRoute;
//! use shell_navigator::{RouteSnapshot, Shell};
//!
//! let shell = Shell::builder()
//!     .middleware("auth", middleware_fn(|ctx| async move {
//!         if ctx.route().path.starts_with("/admin") {
//!             return Err(ctx.redirect("/login"));
//!         }
//!         Ok(())
//!     }))
//!     .build();
//!
//! let home = RouteSnapshot::new("/")
//!     .matched(MatchedRoute::new("/", ComponentDefinition::new("home")))
//!     .shared();
//! let admin = RouteSnapshot::new("/admin")
//!     .matched(MatchedRoute::new("/admin", ComponentDefinition::new("admin")))
//!     .shared();
//!
//! let report = pollster::block_on(shell.navigate(admin, home));
//! assert_eq!(report.outcome, Some(NextAction::Redirect("/login".into())));
//! ```
//!
//! ## Features
//!
//! | Feature   | Default | Enables |
//! |-----------|---------|---------|
//! | `log`     | yes     | logging through the `log` crate |
//! | `tracing` | no      | logging through `tracing` instead |
//! | `cache`   | yes     | LRU cache of compiled path templates |
//! | `router`  | yes     | [`router::RouteTable`] and [`router::HistoryRouter`] |
//! | `serde`   | no      | deserialisable [`ShellConfig`] and hydration payloads |

#![cfg_attr(docsrs, feature(doc_cfg))]

// Must come first: the logging macros are used by every other module.
#[macro_use]
pub mod logging;

pub mod boundary;
#[cfg(feature = "cache")]
pub mod cache;
pub mod component;
pub mod config;
pub mod context;
pub mod controller;
pub mod diff;
pub mod error;
pub mod events;
pub mod fetch;
pub mod layout;
pub mod middleware;
pub mod params;
pub mod path;
pub mod progress;
pub mod route;
pub mod router;
pub mod state;
pub mod transition;

pub use boundary::{BoundaryView, ErrorBoundary};
pub use component::{ComponentDefinition, ComponentInstance, PageData, WatchQuery};
pub use config::{ShellBuilder, ShellConfig};
pub use context::{NavigationContext, NextAction};
pub use controller::{Hydration, MountOutcome, NavigationReport, Shell};
pub use diff::{NavigationState, RouteChange};
pub use error::{AppError, HookResult, NavigationError};
pub use events::{ListenerId, ShellEvent};
pub use layout::LayoutDefinition;
pub use middleware::{middleware_fn, Middleware};
pub use params::{QueryParams, RouteParams};
pub use progress::ProgressIndicator;
pub use route::{MatchedRoute, RouteSnapshot};
pub use router::{RouteRecord, RouterContract};
#[cfg(feature = "router")]
pub use router::{HistoryRouter, RouteTable};
pub use transition::TransitionSpec;
