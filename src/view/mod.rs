//! View-layer surface consumed by the controller core.
//!
//! Every region of the screen reaches the core only as a [`RegionHandle`].
//! The core pushes children, visibility and active flags into handles and
//! never reads them back; its own models are the source of truth.

mod aggregate;
mod tabs;

pub use aggregate::AggregateOutput;
pub use tabs::{OutputSlot, TabbedOutputView};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::render::SafeMarkup;

/// One child element rendered into a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    /// Section heading, e.g. a provider name.
    Heading(String),
    /// Plain, unformatted text.
    Text(String),
    /// A checkbox-like selection control.
    Toggle {
        /// Stable key of the control.
        key: String,
        /// Visible label.
        label: String,
        /// Current check state.
        checked: bool,
    },
    /// A clickable tab in the tab strip.
    Tab {
        /// Slug of the slot this tab activates.
        key: String,
        /// Visible label.
        label: String,
        /// Whether this tab is the active one.
        active: bool,
    },
    /// A content slot holding rendered markup.
    Slot {
        /// Slug addressing this slot.
        key: String,
        /// Rendered content.
        markup: SafeMarkup,
        /// Whether this slot is the visible one.
        active: bool,
    },
    /// Rendered markup outside the tab machinery.
    Markup(SafeMarkup),
    /// Progress in percent.
    Progress(u8),
}

impl ViewNode {
    /// Key of keyed nodes (toggles, tabs, slots).
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Toggle { key, .. } | Self::Tab { key, .. } | Self::Slot { key, .. } => {
                Some(key)
            }
            Self::Heading(_) | Self::Text(_) | Self::Markup(_) | Self::Progress(_) => None,
        }
    }

    /// Whether a tab or slot is marked active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Tab { active: true, .. } | Self::Slot { active: true, .. }
        )
    }

    fn set_active(&mut self, value: bool) {
        if let Self::Tab { active, .. } | Self::Slot { active, .. } = self {
            *active = value;
        }
    }
}

/// Opaque handle to a region of the view.
pub trait RegionHandle {
    /// Replace all children of the region.
    fn render_children(&mut self, children: Vec<ViewNode>);
    /// Show or hide the region.
    fn set_visible(&mut self, visible: bool);
    /// Mark the keyed child active or inactive.
    fn set_active(&mut self, key: &str, active: bool);
}

/// Snapshot of a region as last written by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionState {
    /// Children in render order.
    pub children: Vec<ViewNode>,
    /// Visibility flag.
    pub visible: bool,
}

impl RegionState {
    /// Keys of children currently marked active.
    #[must_use]
    pub fn active_keys(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter(|node| node.is_active())
            .filter_map(ViewNode::key)
            .collect()
    }

    /// Find a keyed child.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&ViewNode> {
        self.children.iter().find(|node| node.key() == Some(key))
    }
}

/// In-process region shared between the core (writer) and a renderer (reader).
#[derive(Debug, Clone)]
pub struct SharedRegion {
    state: Arc<Mutex<RegionState>>,
}

impl SharedRegion {
    /// Create an empty, visible region.
    #[must_use]
    pub fn new() -> Self {
        Self::with_visibility(true)
    }

    /// Create an empty region with the given visibility.
    #[must_use]
    pub fn with_visibility(visible: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegionState {
                children: Vec::new(),
                visible,
            })),
        }
    }

    /// Copy the current state out.
    #[must_use]
    pub fn snapshot(&self) -> RegionState {
        self.state.lock().clone()
    }

    /// Boxed handle onto the same region, for injection into the core.
    #[must_use]
    pub fn handle(&self) -> Box<dyn RegionHandle> {
        Box::new(self.clone())
    }
}

impl Default for SharedRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionHandle for SharedRegion {
    fn render_children(&mut self, children: Vec<ViewNode>) {
        self.state.lock().children = children;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.lock().visible = visible;
    }

    fn set_active(&mut self, key: &str, active: bool) {
        let mut state = self.state.lock();
        if let Some(node) = state
            .children
            .iter_mut()
            .find(|node| node.key() == Some(key))
        {
            node.set_active(active);
        }
    }
}

/// Every region the core writes to, injected at construction.
pub struct ViewHandles {
    /// Catalog summary ("loading", model counts, "no models").
    pub catalog: Box<dyn RegionHandle>,
    /// Selection toggles grouped by provider.
    pub selection: Box<dyn RegionHandle>,
    /// Container for tab strip and tab content; hidden when nothing is selected.
    pub outputs: Box<dyn RegionHandle>,
    /// Tab strip.
    pub tabs: Box<dyn RegionHandle>,
    /// Tab content slots.
    pub slots: Box<dyn RegionHandle>,
    /// Fixed aggregate output.
    pub aggregate: Box<dyn RegionHandle>,
    /// Progress indicator.
    pub progress: Box<dyn RegionHandle>,
    /// Busy indicator.
    pub busy: Box<dyn RegionHandle>,
    /// User-visible notices (validation and request errors).
    pub notice: Box<dyn RegionHandle>,
}

impl std::fmt::Debug for ViewHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandles").finish_non_exhaustive()
    }
}

/// Reader side of a [`ViewHandles`] built from [`SharedRegion`]s.
#[derive(Debug, Clone)]
pub struct SharedView {
    /// Catalog summary region.
    pub catalog: SharedRegion,
    /// Selection toggles region.
    pub selection: SharedRegion,
    /// Output container region.
    pub outputs: SharedRegion,
    /// Tab strip region.
    pub tabs: SharedRegion,
    /// Tab content region.
    pub slots: SharedRegion,
    /// Aggregate output region.
    pub aggregate: SharedRegion,
    /// Progress region.
    pub progress: SharedRegion,
    /// Busy region.
    pub busy: SharedRegion,
    /// Notice region.
    pub notice: SharedRegion,
}

impl SharedView {
    /// Fresh regions in their startup visibility: outputs, progress and busy
    /// start hidden.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: SharedRegion::new(),
            selection: SharedRegion::new(),
            outputs: SharedRegion::with_visibility(false),
            tabs: SharedRegion::new(),
            slots: SharedRegion::new(),
            aggregate: SharedRegion::new(),
            progress: SharedRegion::with_visibility(false),
            busy: SharedRegion::with_visibility(false),
            notice: SharedRegion::new(),
        }
    }

    /// Writer handles onto these regions.
    #[must_use]
    pub fn handles(&self) -> ViewHandles {
        ViewHandles {
            catalog: self.catalog.handle(),
            selection: self.selection.handle(),
            outputs: self.outputs.handle(),
            tabs: self.tabs.handle(),
            slots: self.slots.handle(),
            aggregate: self.aggregate.handle(),
            progress: self.progress.handle(),
            busy: self.busy.handle(),
            notice: self.notice.handle(),
        }
    }
}

impl Default for SharedView {
    fn default() -> Self {
        Self::new()
    }
}
