//! Route snapshots handed to the shell by the router.
//!
//! A [`RouteSnapshot`] is an immutable picture of a location: its path, the
//! parsed params and query, and the chain of [`MatchedRoute`] segments from
//! outermost to innermost. Each segment can bind several named views; the
//! shell always works on the flattened list returned by
//! [`RouteSnapshot::matched_components`], whose index is the component's
//! *depth*.

use crate::component::{ComponentDefinition, ComponentSlot};
use crate::error::HookResult;
use crate::path::PathCompiler;
use crate::{QueryParams, RouteParams};
use std::sync::Arc;

/// Name of the view used when a segment binds a single component.
pub const DEFAULT_VIEW: &str = "default";

/// One view of a matched segment.
#[derive(Debug, Clone)]
pub struct NamedView {
    /// View name (`"default"` for the unnamed one).
    pub name: String,
    /// Component bound to the view.
    pub slot: Arc<ComponentSlot>,
}

/// One matched segment of a route, outermost first.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    /// Full path template of the segment (`/users/:id`).
    pub path: String,
    /// Views in declaration order.
    pub views: Vec<NamedView>,
}

impl MatchedRoute {
    /// Segment with a single default view.
    pub fn new(path: impl Into<String>, component: impl Into<ComponentSlot>) -> Self {
        Self::from_slot(path, Arc::new(component.into()))
    }

    /// Segment with a single default view sharing an existing slot.
    pub fn from_slot(path: impl Into<String>, slot: Arc<ComponentSlot>) -> Self {
        Self {
            path: path.into(),
            views: vec![NamedView {
                name: DEFAULT_VIEW.to_string(),
                slot,
            }],
        }
    }

    /// Segment with no views yet.
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            views: Vec::new(),
        }
    }

    /// Add a named view.
    pub fn view(mut self, name: impl Into<String>, component: impl Into<ComponentSlot>) -> Self {
        self.views.push(NamedView {
            name: name.into(),
            slot: Arc::new(component.into()),
        });
        self
    }

    /// The default view's slot, if bound.
    pub fn default_view(&self) -> Option<&Arc<ComponentSlot>> {
        self.views
            .iter()
            .find(|view| view.name == DEFAULT_VIEW)
            .map(|view| &view.slot)
    }
}

/// Immutable snapshot of a location.
#[derive(Debug, Clone, Default)]
pub struct RouteSnapshot {
    /// Route name, if the matched leaf is named.
    pub name: Option<String>,
    /// Path without query.
    pub path: String,
    /// Path plus query string.
    pub full_path: String,
    /// Path params.
    pub params: RouteParams,
    /// Query params.
    pub query: QueryParams,
    /// Matched segments, outermost first. Empty when nothing matched.
    pub matched: Vec<MatchedRoute>,
}

impl RouteSnapshot {
    /// Snapshot for `path` with nothing matched yet.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            full_path: path.clone(),
            path,
            ..Self::default()
        }
    }

    /// Set the route name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a path param.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Set the query; `full_path` is rebuilt from it.
    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self.full_path = if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.to_query_string())
        };
        self
    }

    /// Append a matched segment.
    pub fn matched(mut self, segment: MatchedRoute) -> Self {
        self.matched.push(segment);
        self
    }

    /// Freeze into a shared snapshot.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Flattened component slots with their depth-independent segment index.
    pub fn matched_components(&self) -> Vec<MatchedComponent<'_>> {
        self.matched
            .iter()
            .enumerate()
            .flat_map(|(match_index, segment)| {
                segment.views.iter().map(move |view| MatchedComponent {
                    match_index,
                    template: &segment.path,
                    view: &view.name,
                    slot: &view.slot,
                })
            })
            .collect()
    }

    /// Flattened components, `None` where a lazy slot is not loaded yet.
    ///
    /// Used for the outgoing route, whose components were resolved by the
    /// navigation that produced it. Positions match the flattened depth.
    pub fn resolved_components(&self) -> Vec<Option<Arc<ComponentDefinition>>> {
        self.matched_components()
            .into_iter()
            .map(|matched| matched.slot.resolved())
            .collect()
    }

    /// Resolved path of each flattened component, in depth order.
    ///
    /// A segment whose template cannot be filled resolves to its template.
    pub fn resolved_paths(&self, compiler: &PathCompiler) -> Vec<String> {
        self.matched_components()
            .into_iter()
            .map(|matched| {
                compiler
                    .resolve(matched.template, &self.params)
                    .unwrap_or_else(|_| matched.template.to_string())
            })
            .collect()
    }

    /// Resolve every flattened component, loading lazy ones.
    pub async fn resolve_components(&self) -> HookResult<Vec<ResolvedComponent>> {
        let matched = self.matched_components();
        let mut resolved = Vec::with_capacity(matched.len());
        for (depth, component) in matched.into_iter().enumerate() {
            resolved.push(ResolvedComponent {
                depth,
                match_index: component.match_index,
                template: component.template.to_string(),
                view: component.view.to_string(),
                definition: component.slot.resolve().await?,
            });
        }
        Ok(resolved)
    }
}

/// A flattened, possibly unresolved, matched component.
#[derive(Debug, Clone, Copy)]
pub struct MatchedComponent<'a> {
    /// Index of the owning segment in [`RouteSnapshot::matched`].
    pub match_index: usize,
    /// Path template of the owning segment.
    pub template: &'a str,
    /// View name.
    pub view: &'a str,
    /// The component slot.
    pub slot: &'a Arc<ComponentSlot>,
}

/// A flattened matched component whose definition is loaded.
#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    /// Position in the flattened list.
    pub depth: usize,
    /// Index of the owning segment.
    pub match_index: usize,
    /// Path template of the owning segment.
    pub template: String,
    /// View name.
    pub view: String,
    /// Loaded definition.
    pub definition: Arc<ComponentDefinition>,
}
