//! Tabbed per-model output, rebuilt from the selection on every change.

use tracing::debug;

use super::{RegionHandle, ViewNode};
use crate::catalog::{ModelId, slugify};
use crate::render::SafeMarkup;
use crate::selection::SelectionObserver;

/// One model's output slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSlot {
    /// Model shown in this slot.
    pub id: ModelId,
    /// Unique slot key: the slug, suffixed when two models share a slug.
    pub key: String,
    /// Current content.
    pub markup: SafeMarkup,
    /// Bumped on every content write; used to drop stale typeset results.
    pub revision: u64,
}

/// Tab strip plus content slots, one pair per selected model.
///
/// Either empty (output region hidden) or populated with exactly one
/// active pair.
pub struct TabbedOutputView {
    outputs: Box<dyn RegionHandle>,
    tabs: Box<dyn RegionHandle>,
    content: Box<dyn RegionHandle>,
    slots: Vec<OutputSlot>,
    active: usize,
    revision: u64,
}

impl std::fmt::Debug for TabbedOutputView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabbedOutputView")
            .field("slots", &self.slots)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl TabbedOutputView {
    /// Empty view over the output container, tab strip and content regions.
    #[must_use]
    pub fn new(
        outputs: Box<dyn RegionHandle>,
        tabs: Box<dyn RegionHandle>,
        content: Box<dyn RegionHandle>,
    ) -> Self {
        let mut view = Self {
            outputs,
            tabs,
            content,
            slots: Vec::new(),
            active: 0,
            revision: 0,
        };
        view.outputs.set_visible(false);
        view
    }

    /// Discard every slot and build one per `selected` model, first active.
    pub fn rebuild(&mut self, selected: &[ModelId]) {
        self.slots.clear();
        self.active = 0;
        self.tabs.render_children(Vec::new());
        self.content.render_children(Vec::new());

        if selected.is_empty() {
            self.outputs.set_visible(false);
            debug!("Output view emptied");
            return;
        }

        for id in selected {
            let key = self.unique_key(&id.slug());
            let markup = SafeMarkup::paragraph(&format!("{id} response will appear here..."));
            let revision = self.next_revision();
            self.slots.push(OutputSlot {
                id: id.clone(),
                key,
                markup,
                revision,
            });
        }

        let tabs = self.tab_nodes();
        self.tabs.render_children(tabs);
        self.render_content();
        self.outputs.set_visible(true);
        debug!(slots = self.slots.len(), "Output view rebuilt");
    }

    /// Make the pair keyed `key` the only active one.
    ///
    /// Returns `false` (and changes nothing) for unknown keys.
    pub fn activate(&mut self, key: &str) -> bool {
        let Some(index) = self.slots.iter().position(|slot| slot.key == key) else {
            return false;
        };

        for slot in &self.slots {
            self.tabs.set_active(&slot.key, false);
            self.content.set_active(&slot.key, false);
        }
        self.tabs.set_active(key, true);
        self.content.set_active(key, true);
        self.active = index;
        true
    }

    /// Activate the pair after the current one, wrapping around.
    pub fn activate_next(&mut self) {
        if let Some(key) = self
            .slots
            .get((self.active + 1) % self.slots.len().max(1))
            .map(|slot| slot.key.clone())
        {
            self.activate(&key);
        }
    }

    /// Activate the pair before the current one, wrapping around.
    pub fn activate_previous(&mut self) {
        let Some(last) = self.slots.len().checked_sub(1) else {
            return;
        };
        let index = self.active.checked_sub(1).unwrap_or(last);
        if let Some(key) = self.slots.get(index).map(|slot| slot.key.clone()) {
            self.activate(&key);
        }
    }

    /// Key of the active pair; `None` when empty.
    #[must_use]
    pub fn active_key(&self) -> Option<&str> {
        self.slots.get(self.active).map(|slot| slot.key.as_str())
    }

    /// Current slots in selection order.
    #[must_use]
    pub fn slots(&self) -> &[OutputSlot] {
        &self.slots
    }

    /// Look up a slot by key.
    #[must_use]
    pub fn slot(&self, key: &str) -> Option<&OutputSlot> {
        self.slots.iter().find(|slot| slot.key == key)
    }

    /// Slot for a proposal keyed by the server.
    ///
    /// Exact identifier matches win; otherwise the first slot whose model
    /// slugs the same as the key.
    #[must_use]
    pub fn slot_for_proposal(&self, proposal_key: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|slot| slot.id.matches_key(proposal_key))
            .or_else(|| {
                let slug = slugify(proposal_key);
                self.slots.iter().find(|slot| slot.id.slug() == slug)
            })
            .map(|slot| slot.key.as_str())
    }

    /// Replace a slot's content. Returns the new revision, or `None` when
    /// the slot no longer exists.
    pub fn set_markup(&mut self, key: &str, markup: SafeMarkup) -> Option<u64> {
        let revision = self.next_revision();
        let slot = self.slots.iter_mut().find(|slot| slot.key == key)?;
        slot.markup = markup;
        slot.revision = revision;
        self.render_content();
        Some(revision)
    }

    /// Apply a typeset result if the slot still holds the revision it was
    /// computed from.
    pub fn apply_typeset(&mut self, key: &str, revision: u64, markup: SafeMarkup) -> bool {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.key == key && slot.revision == revision)
        else {
            debug!(slot = key, revision, "Dropping stale typeset result");
            return false;
        };
        slot.markup = markup;
        self.render_content();
        true
    }

    fn unique_key(&self, slug: &str) -> String {
        let taken = |candidate: &str| self.slots.iter().any(|slot| slot.key == candidate);
        if !taken(slug) {
            return slug.to_string();
        }
        (2..)
            .map(|n| format!("{slug}-{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| slug.to_string())
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn tab_nodes(&self) -> Vec<ViewNode> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| ViewNode::Tab {
                key: slot.key.clone(),
                label: slot.id.to_string(),
                active: index == self.active,
            })
            .collect()
    }

    fn render_content(&mut self) {
        let nodes = self.slot_nodes();
        self.content.render_children(nodes);
    }

    fn slot_nodes(&self) -> Vec<ViewNode> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| ViewNode::Slot {
                key: slot.key.clone(),
                markup: slot.markup.clone(),
                active: index == self.active,
            })
            .collect()
    }
}

impl SelectionObserver for TabbedOutputView {
    fn on_selection_changed(&mut self, selected: &[ModelId]) {
        self.rebuild(selected);
    }
}
