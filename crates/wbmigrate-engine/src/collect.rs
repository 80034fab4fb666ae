//! Which ids a batch needs mappings for.
//!
//! The mapping rows of a batch are fetched with VALUES-restricted queries: the
//! caller lists every id the source records mention and asks the mapping
//! source for exactly those. [`referenced_ids`] produces that list and
//! [`values_queries`] renders it into chunked queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use wbmigrate_model::{EntityId, EntityKind, EntityRecord};

/// Placeholder replaced by the VALUES list in a query template.
pub const VALUES_PLACEHOLDER: &str = "$source_entities";

/// Ids per query when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedIds {
    pub items: BTreeSet<EntityId>,
    pub properties: BTreeSet<EntityId>,
}

impl ReferencedIds {
    pub fn insert(&mut self, id: EntityId) {
        match id.kind() {
            EntityKind::Item => self.items.insert(id),
            EntityKind::Property => self.properties.insert(id),
        };
    }

    pub fn of_kind(&self, kind: EntityKind) -> &BTreeSet<EntityId> {
        match kind {
            EntityKind::Item => &self.items,
            EntityKind::Property => &self.properties,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.properties.is_empty()
    }
}

/// Every id the records mention: their own ids, claim properties and
/// values, qualifier and reference ids, quantity units and sitelink badges.
pub fn referenced_ids<'a>(records: impl IntoIterator<Item = &'a EntityRecord>) -> ReferencedIds {
    let mut ids = ReferencedIds::default();
    for record in records {
        if let Some(id) = &record.id {
            ids.insert(id.clone());
        }
        for claim in &record.claims {
            for slot in claim.id_refs() {
                ids.insert(slot.id().clone());
            }
        }
        for sitelink in record.sitelinks.values() {
            for badge in &sitelink.badges {
                ids.insert(badge.id().clone());
            }
        }
    }
    ids
}

/// Render `template` once per chunk of `ids`, replacing
/// [`VALUES_PLACEHOLDER`] with the chunk as quoted string literals, one per
/// line.
pub fn values_queries<'a>(
    template: &str,
    ids: impl IntoIterator<Item = &'a EntityId>,
    chunk_size: usize,
) -> Vec<String> {
    let literals: Vec<String> = ids.into_iter().map(|id| format!("\"{id}\"")).collect();
    literals
        .chunks(chunk_size.max(1))
        .map(|chunk| template.replace(VALUES_PLACEHOLDER, &chunk.join("\n")))
        .collect()
}
