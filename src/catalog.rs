//! Model catalog: identifiers, provider grouping and output-slot slugs.
//!
//! The server hands out flat `"<provider> <model-name>"` strings. The first
//! space-delimited token names the provider and everything after the first
//! space is the model name, which may itself contain spaces.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A model identifier split into provider and model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId {
    /// Provider token, e.g. `OpenAI`.
    pub provider: String,
    /// Model name, e.g. `gpt-4` or `claude 3 opus`.
    pub model: String,
}

impl ModelId {
    /// Build an identifier from its parts.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Split `"<provider> <model-name>"` on the first space.
    ///
    /// Returns `None` when either half is empty.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (provider, model) = raw.split_once(' ')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self::new(provider, model))
    }

    /// Whether a proposal key returned by the server names this model.
    ///
    /// Accepts both the catalog form (`"OpenAI gpt-4"`) and the colon form
    /// (`"OpenAI:gpt-4"`) the aggregation service uses for its keys.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        key.strip_prefix(self.provider.as_str())
            .and_then(|rest| rest.strip_prefix([' ', ':']))
            .is_some_and(|model| model == self.model)
    }

    /// Slot slug for this identifier. See [`slugify`].
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.provider, self.model)
    }
}

/// Replace every character outside `[A-Za-z0-9]` with `-` and lowercase.
#[must_use]
pub fn slugify(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// One provider and its models in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderGroup {
    /// Provider token shared by every member.
    pub provider: String,
    /// Model names in first-seen order.
    pub models: Vec<String>,
}

impl ProviderGroup {
    /// Full identifiers of this group's members.
    pub fn ids(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.models
            .iter()
            .map(|model| ModelId::new(self.provider.clone(), model.clone()))
    }
}

/// Catalog grouped by provider, in first-seen provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelGroups {
    groups: Vec<ProviderGroup>,
}

impl ModelGroups {
    /// Group a flat identifier list by provider.
    ///
    /// Malformed identifiers are logged and skipped; duplicates keep their
    /// first position.
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: Vec<ProviderGroup> = Vec::new();
        for raw in identifiers {
            let raw = raw.as_ref();
            let Some(id) = ModelId::parse(raw) else {
                warn!(identifier = raw, "Skipping malformed model identifier");
                continue;
            };

            match groups.iter_mut().find(|g| g.provider == id.provider) {
                Some(group) => {
                    if !group.models.contains(&id.model) {
                        group.models.push(id.model);
                    }
                }
                None => groups.push(ProviderGroup {
                    provider: id.provider,
                    models: vec![id.model],
                }),
            }
        }
        Self { groups }
    }

    /// Provider groups in catalog order.
    #[must_use]
    pub fn groups(&self) -> &[ProviderGroup] {
        &self.groups
    }

    /// Every identifier, provider by provider, in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.groups.iter().flat_map(ProviderGroup::ids)
    }

    /// Number of models across all providers.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.groups.iter().map(|g| g.models.len()).sum()
    }

    /// Whether the catalog has no models.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
