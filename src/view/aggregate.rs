//! Fixed aggregate-output region.

use tracing::debug;

use super::{RegionHandle, ViewNode};
use crate::render::SafeMarkup;

/// The synthesized answer. Always visible; overwritten by every completed
/// render cycle.
pub struct AggregateOutput {
    region: Box<dyn RegionHandle>,
    markup: SafeMarkup,
    revision: u64,
}

impl std::fmt::Debug for AggregateOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateOutput")
            .field("markup", &self.markup)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl AggregateOutput {
    /// Empty aggregate output over `region`.
    #[must_use]
    pub fn new(mut region: Box<dyn RegionHandle>) -> Self {
        region.set_visible(true);
        Self {
            region,
            markup: SafeMarkup::default(),
            revision: 0,
        }
    }

    /// Overwrite the content. Returns the new revision.
    pub fn set_markup(&mut self, markup: SafeMarkup) -> u64 {
        self.revision += 1;
        self.markup = markup;
        self.render();
        self.revision
    }

    /// Apply a typeset result computed from `revision`, if still current.
    pub fn apply_typeset(&mut self, revision: u64, markup: SafeMarkup) -> bool {
        if revision != self.revision {
            debug!(revision, current = self.revision, "Dropping stale aggregate typeset");
            return false;
        }
        self.markup = markup;
        self.render();
        true
    }

    /// Current content.
    #[must_use]
    pub const fn markup(&self) -> &SafeMarkup {
        &self.markup
    }

    fn render(&mut self) {
        let node = ViewNode::Markup(self.markup.clone());
        self.region.render_children(vec![node]);
    }
}
