//! Which catalog models are selected for the next generate action.

use tracing::debug;

use crate::catalog::{ModelGroups, ModelId};
use crate::view::{RegionHandle, ViewNode};

/// Key of the "All" master toggle. Model keys always contain a space, so
/// this cannot collide with one.
pub const ALL_KEY: &str = "all";

/// A selection control, as addressed by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// The "All" master toggle.
    All,
    /// One model's toggle.
    Model(ModelId),
}

impl Control {
    /// Key used for this control in the selection region.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::All => ALL_KEY.to_string(),
            Self::Model(id) => id.to_string(),
        }
    }
}

/// Notified synchronously after every selection mutation.
pub trait SelectionObserver {
    /// `selected` is the full selection in catalog order.
    fn on_selection_changed(&mut self, selected: &[ModelId]);
}

/// Selection flags for every catalog model, in catalog order.
pub struct SelectionState {
    groups: ModelGroups,
    entries: Vec<(ModelId, bool)>,
    controls: Box<dyn RegionHandle>,
}

impl std::fmt::Debug for SelectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionState")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl SelectionState {
    /// Empty selection writing its controls into `controls`.
    #[must_use]
    pub fn new(controls: Box<dyn RegionHandle>) -> Self {
        Self {
            groups: ModelGroups::default(),
            entries: Vec::new(),
            controls,
        }
    }

    /// Replace the catalog. Every entry starts unselected.
    pub fn initialize(&mut self, groups: ModelGroups) {
        self.entries = groups.ids().map(|id| (id, false)).collect();
        self.groups = groups;
        debug!(models = self.entries.len(), "Selection initialized");
        self.render_controls();
    }

    /// Flip one model. Unknown ids are ignored without notification.
    pub fn toggle(&mut self, id: &ModelId, observer: &mut dyn SelectionObserver) {
        let Some((_, checked)) = self.entries.iter_mut().find(|(entry, _)| entry == id) else {
            debug!(model = %id, "Ignoring toggle for unknown model");
            return;
        };
        *checked = !*checked;
        self.changed(observer);
    }

    /// Set every entry to `value`, notifying once.
    pub fn set_all(&mut self, value: bool, observer: &mut dyn SelectionObserver) {
        for (_, checked) in &mut self.entries {
            *checked = value;
        }
        self.changed(observer);
    }

    /// Apply a control activation from the view.
    pub fn activate(&mut self, control: &Control, observer: &mut dyn SelectionObserver) {
        match control {
            Control::All => {
                let value = !self.all_selected();
                self.set_all(value, observer);
            }
            Control::Model(id) => self.toggle(id, observer),
        }
    }

    /// Selected identifiers in catalog order.
    #[must_use]
    pub fn selected(&self) -> Vec<ModelId> {
        self.entries
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Derived "select all" state: true when every model is selected.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, checked)| *checked)
    }

    /// Whether `id` is currently selected.
    #[must_use]
    pub fn is_selected(&self, id: &ModelId) -> bool {
        self.entries
            .iter()
            .any(|(entry, checked)| *checked && entry == id)
    }

    /// The catalog this selection was initialized from.
    #[must_use]
    pub const fn groups(&self) -> &ModelGroups {
        &self.groups
    }

    /// Controls in display order: "All" first, then every model.
    #[must_use]
    pub fn controls(&self) -> Vec<Control> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        std::iter::once(Control::All)
            .chain(self.entries.iter().map(|(id, _)| Control::Model(id.clone())))
            .collect()
    }

    fn changed(&mut self, observer: &mut dyn SelectionObserver) {
        self.render_controls();
        let selected = self.selected();
        debug!(selected = selected.len(), "Selection changed");
        observer.on_selection_changed(&selected);
    }

    fn render_controls(&mut self) {
        let mut nodes = Vec::with_capacity(self.entries.len() + self.groups.groups().len() + 1);
        if !self.entries.is_empty() {
            nodes.push(ViewNode::Toggle {
                key: Control::All.key(),
                label: "All".to_string(),
                checked: self.all_selected(),
            });
        }
        for group in self.groups.groups() {
            nodes.push(ViewNode::Heading(group.provider.clone()));
            for id in group.ids() {
                let checked = self.is_selected(&id);
                let label = id.model.clone();
                nodes.push(ViewNode::Toggle {
                    key: Control::Model(id).key(),
                    label,
                    checked,
                });
            }
        }
        self.controls.render_children(nodes);
    }
}
