//! Transition mapper.
//!
//! Each matched component may declare transition metadata: a name
//! shorthand, a full [`TransitionSpec`], or a function of the `to` and `from`
//! routes. On every navigation the specs of the outgoing and incoming trees
//! are merged depth by depth:
//!
//! - start from the outgoing component's spec
//! - overwrite with every key of the incoming spec, **except** keys whose
//!   name contains `leave` (case-insensitive): the leave phase always belongs
//!   to the component that is leaving
//!
//! ```
//! use shell_navigator::transition::{merge_transition, TransitionSpec};
//!
//! let from = TransitionSpec::named("fade").with("leave", "fadeOut");
//! let to = TransitionSpec::from("slide");
//! let merged = merge_transition(&from, &to);
//! assert_eq!(merged.name(), Some("slide"));
//! assert_eq!(merged.get("leave").and_then(|v| v.as_text()), Some("fadeOut"));
//! ```
//!
//! The committed list is normalised against the default transition (see
//! [`default_transition`]), and outlets read the entry at their depth with
//! [`OutletTransition::at_depth`].

use crate::component::ComponentDefinition;
use crate::RouteSnapshot;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callback attached to a transition phase; receives the outlet depth.
pub type TransitionHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Transition metadata computed from the routes.
pub type TransitionFn =
    Arc<dyn Fn(&RouteSnapshot, Option<&RouteSnapshot>) -> TransitionSpec + Send + Sync>;

/// Renderer props copied onto an outlet's transition wrapper.
pub const TRANSITION_PROP_KEYS: &[&str] = &[
    "name",
    "mode",
    "appear",
    "css",
    "type",
    "duration",
    "enterClass",
    "leaveClass",
    "appearClass",
    "enterActiveClass",
    "leaveActiveClass",
    "appearActiveClass",
    "enterToClass",
    "leaveToClass",
    "appearToClass",
];

/// Phase callbacks wired as outlet listeners.
pub const TRANSITION_LISTENER_KEYS: &[&str] = &[
    "beforeEnter",
    "enter",
    "afterEnter",
    "enterCancelled",
    "beforeLeave",
    "leave",
    "afterLeave",
    "leaveCancelled",
    "beforeAppear",
    "appear",
    "afterAppear",
    "appearCancelled",
];

// ============================================================================
// Values and specs
// ============================================================================

/// One transition property.
#[derive(Clone)]
pub enum TransitionValue {
    /// String value (`name`, `mode`, class names).
    Text(String),
    /// Boolean value (`appear`, `css`).
    Flag(bool),
    /// Numeric value (`duration`).
    Number(u64),
    /// Phase callback.
    Hook(TransitionHook),
}

impl TransitionValue {
    /// The string value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The boolean value, if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The callback, if this is a hook.
    pub fn as_hook(&self) -> Option<&TransitionHook> {
        match self {
            Self::Hook(hook) => Some(hook),
            _ => None,
        }
    }
}

impl PartialEq for TransitionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Flag(a), Self::Flag(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Hook(a), Self::Hook(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for TransitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Hook(_) => f.write_str("<hook>"),
        }
    }
}

impl From<&str> for TransitionValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TransitionValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for TransitionValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<u64> for TransitionValue {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

/// Transition metadata for one depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionSpec {
    entries: BTreeMap<String, TransitionValue>,
}

impl TransitionSpec {
    /// Empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with("name", name.into())
    }

    /// Set a property.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TransitionValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Set a phase callback.
    pub fn hook<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.with(key, TransitionValue::Hook(Arc::new(f)))
    }

    /// Read a property.
    pub fn get(&self, key: &str) -> Option<&TransitionValue> {
        self.entries.get(key)
    }

    /// The `name` property.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(TransitionValue::as_text)
    }

    /// Iterate over properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TransitionValue)> {
        self.entries.iter()
    }

    /// `true` without properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl From<&str> for TransitionSpec {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for TransitionSpec {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

/// A component's transition declaration.
#[derive(Clone)]
pub enum TransitionDecl {
    /// Fixed spec (a bare name becomes `{name}`).
    Spec(TransitionSpec),
    /// Computed from `(to, from)`.
    Computed(TransitionFn),
}

impl TransitionDecl {
    /// Build a computed declaration.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RouteSnapshot, Option<&RouteSnapshot>) -> TransitionSpec + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Evaluate the declaration.
    pub fn resolve(&self, to: &RouteSnapshot, from: Option<&RouteSnapshot>) -> TransitionSpec {
        match self {
            Self::Spec(spec) => spec.clone(),
            Self::Computed(f) => f(to, from),
        }
    }
}

impl From<TransitionSpec> for TransitionDecl {
    fn from(spec: TransitionSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<&str> for TransitionDecl {
    fn from(name: &str) -> Self {
        Self::Spec(TransitionSpec::named(name))
    }
}

impl fmt::Debug for TransitionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// The built-in default transition.
pub fn default_transition() -> TransitionSpec {
    TransitionSpec::named("page")
        .with("mode", "out-in")
        .with("appear", true)
        .with("appearClass", "appear")
        .with("appearActiveClass", "appear-active")
        .with("appearToClass", "appear-to")
}

fn is_leave_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("leave")
}

/// Merge one depth: `outgoing` overwritten by `incoming` except leave keys.
pub fn merge_transition(outgoing: &TransitionSpec, incoming: &TransitionSpec) -> TransitionSpec {
    let mut merged = outgoing.clone();
    for (key, value) in incoming.iter().filter(|(key, _)| !is_leave_key(key)) {
        merged.entries.insert(key.clone(), value.clone());
    }
    merged
}

fn component_transition(
    component: Option<&Arc<ComponentDefinition>>,
    to: &RouteSnapshot,
    from: Option<&RouteSnapshot>,
) -> TransitionSpec {
    component
        .and_then(|c| c.declared_transition())
        .map(|decl| decl.resolve(to, from))
        .unwrap_or_default()
}

/// Merge transitions of the incoming and outgoing trees by depth.
///
/// The result has one entry per depth up to the longer of the two lists.
/// Outgoing depths that are `None` contribute an empty spec.
pub fn map_transitions(
    to_components: &[Arc<ComponentDefinition>],
    from_components: &[Option<Arc<ComponentDefinition>>],
    to: &RouteSnapshot,
    from: Option<&RouteSnapshot>,
) -> Vec<TransitionSpec> {
    let max_depth = to_components.len().max(from_components.len());
    (0..max_depth)
        .map(|depth| {
            let incoming = component_transition(to_components.get(depth), to, from);
            let outgoing =
                component_transition(from_components.get(depth).and_then(Option::as_ref), to, from);
            merge_transition(&outgoing, &incoming)
        })
        .collect()
}

/// Overlay every spec on `default`.
pub fn normalize_transitions(specs: Vec<TransitionSpec>, default: &TransitionSpec) -> Vec<TransitionSpec> {
    specs
        .into_iter()
        .map(|spec| {
            let mut merged = default.clone();
            merged.entries.extend(spec.entries);
            merged
        })
        .collect()
}

// ============================================================================
// Outlet props
// ============================================================================

/// What an outlet at a given depth hands to its transition wrapper.
#[derive(Clone, Default)]
pub struct OutletTransition {
    /// Outlet depth.
    pub depth: usize,
    /// Renderer props (see [`TRANSITION_PROP_KEYS`]).
    pub props: BTreeMap<String, TransitionValue>,
    /// Phase listeners (see [`TRANSITION_LISTENER_KEYS`]).
    pub listeners: BTreeMap<String, TransitionHook>,
}

impl OutletTransition {
    /// Split the active spec at `depth` (or `default`) into props and
    /// listeners.
    pub fn at_depth(transitions: &[TransitionSpec], depth: usize, default: &TransitionSpec) -> Self {
        let spec = transitions.get(depth).unwrap_or(default);

        let props = TRANSITION_PROP_KEYS
            .iter()
            .filter_map(|key| {
                spec.get(key)
                    .filter(|value| value.as_hook().is_none())
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect();

        let listeners = TRANSITION_LISTENER_KEYS
            .iter()
            .filter_map(|key| {
                spec.get(key)
                    .and_then(TransitionValue::as_hook)
                    .map(|hook| ((*key).to_string(), Arc::clone(hook)))
            })
            .collect();

        Self {
            depth,
            props,
            listeners,
        }
    }

    /// Invoke a listener if present.
    pub fn fire(&self, key: &str) -> bool {
        match self.listeners.get(key) {
            Some(hook) => {
                hook(self.depth);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for OutletTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutletTransition")
            .field("depth", &self.depth)
            .field("props", &self.props)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn component(id: &str, transition: impl Into<TransitionDecl>) -> Arc<ComponentDefinition> {
        Arc::new(ComponentDefinition::new(id).transition(transition))
    }

    #[test]
    fn test_leave_keys_come_from_outgoing() {
        let from = TransitionSpec::named("fade").with("leave", "fadeOut");
        let to = TransitionSpec::named("slide");
        let merged = merge_transition(&from, &to);

        let expected = TransitionSpec::named("slide").with("leave", "fadeOut");
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_incoming_leave_keys_ignored_case_insensitively() {
        let from = TransitionSpec::new();
        let to = TransitionSpec::named("x").with("leaveActiveClass", "a").with("beforeLeave", "b");
        let merged = merge_transition(&from, &to);
        assert_eq!(merged, TransitionSpec::named("x"));
    }

    #[test]
    fn test_map_by_depth_uses_longer_chain() {
        let route = RouteSnapshot::new("/");
        let to = vec![component("a", "slide")];
        let from = vec![Some(component("b", "fade")), Some(component("c", "zoom"))];

        let mapped = map_transitions(&to, &from, &route, Some(&route));
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].name(), Some("slide"));
        assert_eq!(mapped[1].name(), Some("zoom"));
    }

    #[test]
    fn test_unresolved_outgoing_keeps_depths() {
        let route = RouteSnapshot::new("/");
        let to = vec![component("a", "slide"), component("b", "fade")];
        let from = vec![None, Some(component("c", TransitionSpec::named("zoom").with("leave", "zoomOut")))];

        let mapped = map_transitions(&to, &from, &route, Some(&route));
        assert_eq!(mapped[0], TransitionSpec::named("slide"));
        assert_eq!(mapped[1], TransitionSpec::named("fade").with("leave", "zoomOut"));
    }

    #[test]
    fn test_computed_declaration() {
        let decl = TransitionDecl::computed(|to, from| {
            if from.is_some_and(|f| f.path.len() < to.path.len()) {
                TransitionSpec::named("deeper")
            } else {
                TransitionSpec::named("shallower")
            }
        });
        let to = RouteSnapshot::new("/a/b");
        let from = RouteSnapshot::new("/a");
        assert_eq!(decl.resolve(&to, Some(&from)).name(), Some("deeper"));
        assert_eq!(decl.resolve(&to, None).name(), Some("shallower"));
    }

    #[test]
    fn test_normalize_overlays_default() {
        let normalized = normalize_transitions(
            vec![TransitionSpec::new(), TransitionSpec::named("fade")],
            &default_transition(),
        );
        assert_eq!(normalized[0], default_transition());
        assert_eq!(normalized[1].name(), Some("fade"));
        assert_eq!(
            normalized[1].get("mode").and_then(TransitionValue::as_text),
            Some("out-in")
        );
    }

    #[test]
    fn test_outlet_split() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = TransitionSpec::named("fade")
            .with("duration", 300_u64)
            .with("custom", "ignored")
            .hook("afterEnter", move |depth| {
                counter.fetch_add(depth + 1, Ordering::SeqCst);
            });

        let outlet = OutletTransition::at_depth(&[TransitionSpec::new(), spec], 1, &default_transition());
        assert!(outlet.props.contains_key("name"));
        assert!(outlet.props.contains_key("duration"));
        assert!(!outlet.props.contains_key("custom"));
        assert!(outlet.fire("afterEnter"));
        assert!(!outlet.fire("leave"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_outlet_beyond_list_uses_default() {
        let outlet = OutletTransition::at_depth(&[], 3, &default_transition());
        assert_eq!(outlet.props.get("name").and_then(TransitionValue::as_text), Some("page"));
    }
}
