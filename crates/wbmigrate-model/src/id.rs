//! Entity identifiers.
//!
//! An [`EntityId`] is the normalized `Q…`/`P…` string of an item or property.
//! Ids coming out of query services are often concept IRIs
//! (`https://wiki.example.org/entity/Q42`); [`EntityId::parse`] reduces those
//! to their local name and drops leading zeros so that ids from rows, dumps
//! and configuration compare equal.
//!
//! An [`IdRef`] is an id *slot* inside a record. After translation a slot is
//! either resolved (valid in the record's own space) or explicitly marked as
//! an unmapped source id.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digits beyond this would not fit the numeric id of the JSON format.
const MAX_ID_DIGITS: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Property,
}

impl EntityKind {
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Item => 'Q',
            EntityKind::Property => 'P',
        }
    }

    /// Name used by the `entity-type` field of the JSON format.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Property => "property",
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'Q' => Some(EntityKind::Item),
            'P' => Some(EntityKind::Property),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    kind: EntityKind,
    id: String,
}

impl EntityId {
    /// Parse and normalize an id. Accepts bare ids (`Q42`, ` q42 `) and concept
    /// IRIs (`http://www.wikidata.org/entity/Q42`).
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        let local = trimmed
            .rsplit(['/', '#'])
            .next()
            .unwrap_or(trimmed)
            .trim();

        let mut chars = local.chars();
        let kind = chars
            .next()
            .and_then(EntityKind::from_prefix)
            .ok_or_else(|| ModelError::InvalidEntityId(raw.to_string()))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ModelError::InvalidEntityId(raw.to_string()));
        }
        // `Q042` is `Q42`; `Q0` names nothing.
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Err(ModelError::InvalidEntityId(raw.to_string()));
        }
        if digits.len() > MAX_ID_DIGITS {
            return Err(ModelError::EntityIdTooLong(raw.to_string()));
        }

        Ok(Self {
            kind,
            id: format!("{}{}", kind.prefix(), digits),
        })
    }

    pub fn new(kind: EntityKind, number: u64) -> Self {
        Self {
            kind,
            id: format!("{}{}", kind.prefix(), number),
        }
    }

    pub fn item(number: u64) -> Self {
        Self::new(EntityKind::Item, number)
    }

    pub fn property(number: u64) -> Self {
        Self::new(EntityKind::Property, number)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_item(&self) -> bool {
        self.kind == EntityKind::Item
    }

    pub fn is_property(&self) -> bool {
        self.kind == EntityKind::Property
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Numeric part of the id (`42` for `Q42`).
    pub fn numeric_id(&self) -> u64 {
        // Digits were validated and bounded by `parse`.
        self.id[1..].parse().unwrap_or_default()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for EntityId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.id
    }
}

// ============================================================================
// Id slots
// ============================================================================

/// An id slot in a record.
///
/// Records read from a source or target system only hold `Resolved` ids. The
/// translator turns a slot into `Unresolved` when the source id has no
/// counterpart in the target, so a writer can never mistake it for a valid
/// target id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdRef {
    Resolved(EntityId),
    Unresolved(EntityId),
}

impl IdRef {
    pub fn id(&self) -> &EntityId {
        match self {
            IdRef::Resolved(id) | IdRef::Unresolved(id) => id,
        }
    }

    pub fn resolved(&self) -> Option<&EntityId> {
        match self {
            IdRef::Resolved(id) => Some(id),
            IdRef::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, IdRef::Resolved(_))
    }

    pub fn kind(&self) -> EntityKind {
        self.id().kind()
    }
}

impl From<EntityId> for IdRef {
    fn from(value: EntityId) -> Self {
        IdRef::Resolved(value)
    }
}

impl fmt::Display for IdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdRef::Resolved(id) => write!(f, "{id}"),
            IdRef::Unresolved(id) => write!(f, "unresolved:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_iri_forms() {
        let bare = EntityId::parse("Q42").unwrap();
        let iri = EntityId::parse("http://www.wikidata.org/entity/Q42").unwrap();
        let sloppy = EntityId::parse("  q42 ").unwrap();
        assert_eq!(bare, iri);
        assert_eq!(bare, sloppy);
        assert_eq!(bare.kind(), EntityKind::Item);
        assert_eq!(bare.numeric_id(), 42);
    }

    #[test]
    fn property_ids_keep_their_kind() {
        let p = EntityId::parse("https://wiki.example.org/prop/direct/P31").unwrap();
        assert!(p.is_property());
        assert_eq!(p.as_str(), "P31");
    }

    #[test]
    fn rejects_other_entity_types() {
        assert!(EntityId::parse("L12").is_err());
        assert!(EntityId::parse("Q").is_err());
        assert!(EntityId::parse("Q12a").is_err());
        assert!(EntityId::parse("").is_err());
        assert!(matches!(
            EntityId::parse("Q1234567890123456789"),
            Err(ModelError::EntityIdTooLong(_))
        ));
    }

    #[test]
    fn leading_zeros_are_stripped() {
        assert_eq!(EntityId::parse("Q042").unwrap(), EntityId::item(42));
        assert_eq!(EntityId::parse("p007").unwrap().as_str(), "P7");
        assert_eq!(
            EntityId::parse("http://www.wikidata.org/entity/Q0042").unwrap(),
            EntityId::parse("Q42").unwrap()
        );
        assert!(EntityId::parse("Q0").is_err());
        assert!(EntityId::parse("Q000").is_err());
    }

    #[test]
    fn serde_uses_plain_strings() {
        let id = EntityId::property(10);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"P10\"");
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<EntityId>("\"X1\"").is_err());
    }

    #[test]
    fn unresolved_slots_display_their_marker() {
        let slot = IdRef::Unresolved(EntityId::item(5));
        assert_eq!(slot.to_string(), "unresolved:Q5");
        assert!(slot.resolved().is_none());
    }
}
