//! Application runtime state.
//!
//! [`ApplicationRuntimeState`] is the single owned record of what the shell
//! shows: the active layout, the active error with its stamp, the committed
//! transition list, the mounted flag, live component instances by depth, and
//! loader results staged for instances that do not exist yet.
//!
//! Fields are private. The three shared values only change through their
//! entry points: [`set_layout`](ApplicationRuntimeState::set_layout),
//! [`error`](ApplicationRuntimeState::error) and
//! [`set_transitions`](ApplicationRuntimeState::set_transitions).

use crate::component::{ComponentDefinition, ComponentId, ComponentInstance, PageData};
use crate::diff::NavigationState;
use crate::error::{AppError, ErrorStamp, ErrorState};
use crate::layout::LayoutHandle;
use crate::transition::TransitionSpec;
use crate::RouteSnapshot;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared runtime state of the shell.
#[derive(Debug)]
pub struct ApplicationRuntimeState {
    layout: LayoutHandle,
    error: ErrorState,
    next_stamp: u64,
    transitions: Vec<TransitionSpec>,
    mounted: bool,
    current_route: Option<Arc<RouteSnapshot>>,
    last_navigation: Option<Arc<NavigationState>>,
    instances: Vec<Option<Arc<ComponentInstance>>>,
    staged_data: HashMap<ComponentId, PageData>,
}

impl ApplicationRuntimeState {
    /// State showing `layout`, with no error and nothing mounted.
    pub fn new(layout: LayoutHandle) -> Self {
        Self {
            layout,
            error: ErrorState::default(),
            next_stamp: 0,
            transitions: Vec::new(),
            mounted: false,
            current_route: None,
            last_navigation: None,
            instances: Vec::new(),
            staged_data: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Commit the active layout.
    pub fn set_layout(&mut self, layout: LayoutHandle) {
        self.layout = layout;
    }

    /// Set or clear the active error, stamping the write.
    ///
    /// Every call produces a fresh stamp, even when clearing or when the
    /// error is identical to the active one.
    pub fn error(&mut self, error: Option<AppError>) -> ErrorStamp {
        self.next_stamp += 1;
        let stamp = ErrorStamp(self.next_stamp);
        self.error = ErrorState {
            error,
            stamp: Some(stamp),
        };
        stamp
    }

    /// Commit the transition list.
    pub fn set_transitions(&mut self, transitions: Vec<TransitionSpec>) {
        self.transitions = transitions;
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Active layout.
    pub fn layout(&self) -> &LayoutHandle {
        &self.layout
    }

    /// Active error and stamp.
    pub fn error_state(&self) -> &ErrorState {
        &self.error
    }

    /// Committed transitions by depth.
    pub fn transitions(&self) -> &[TransitionSpec] {
        &self.transitions
    }

    /// `true` once the application mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Route of the last committed navigation.
    pub fn current_route(&self) -> Option<&Arc<RouteSnapshot>> {
        self.current_route.as_ref()
    }

    /// The most recent navigation (not necessarily committed).
    pub fn last_navigation(&self) -> Option<&Arc<NavigationState>> {
        self.last_navigation.as_ref()
    }

    /// Live instance at `depth`.
    pub fn instance(&self, depth: usize) -> Option<&Arc<ComponentInstance>> {
        self.instances
            .get(depth)
            .and_then(Option::as_ref)
            .filter(|instance| !instance.is_destroyed())
    }

    /// Live instances with their depth.
    pub fn instances(&self) -> impl Iterator<Item = (usize, &Arc<ComponentInstance>)> {
        self.instances
            .iter()
            .enumerate()
            .filter_map(|(depth, slot)| slot.as_ref().map(|instance| (depth, instance)))
            .filter(|(_, instance)| !instance.is_destroyed())
    }

    /// Loader result staged for `component`.
    pub fn staged_data(&self, component: &ComponentId) -> Option<&PageData> {
        self.staged_data.get(component)
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    pub(crate) fn set_mounted(&mut self) {
        self.mounted = true;
    }

    pub(crate) fn set_current_route(&mut self, route: Arc<RouteSnapshot>) {
        self.current_route = Some(route);
    }

    pub(crate) fn set_last_navigation(&mut self, navigation: Arc<NavigationState>) {
        self.last_navigation = Some(navigation);
    }

    pub(crate) fn stage_data(&mut self, component: ComponentId, data: PageData) {
        self.staged_data.insert(component, data);
    }

    pub(crate) fn set_instance(&mut self, depth: usize, instance: Arc<ComponentInstance>) {
        if self.instances.len() <= depth {
            self.instances.resize(depth + 1, None);
        }
        self.instances[depth] = Some(instance);
    }

    pub(crate) fn remove_instance(&mut self, depth: usize) -> Option<Arc<ComponentInstance>> {
        self.instances.get_mut(depth).and_then(Option::take)
    }
}
