//! Entity records: terms, sitelinks and claims of one item or property.

use crate::claim::Claim;
use crate::datatype::Datatype;
use crate::id::{EntityId, EntityKind, IdRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Terms
// ============================================================================

/// One string per language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.0.contains_key(language)
    }

    /// Set the value for a language, replacing any previous one.
    pub fn set(&mut self, language: impl Into<String>, value: impl Into<String>) {
        self.0.insert(language.into(), value.into());
    }

    /// Set the value only when the language has none. Returns whether it was
    /// added.
    pub fn set_if_absent(&mut self, language: &str, value: &str) -> bool {
        if self.0.contains_key(language) {
            return false;
        }
        self.0.insert(language.to_string(), value.to_string());
        true
    }

    pub fn retain_languages(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|language, _| keep(language));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for LocalizedText {
    fn from_iter<T: IntoIterator<Item = (L, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        )
    }
}

/// An ordered set of strings per language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasSet(BTreeMap<String, Vec<String>>);

impl AliasSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, language: &str) -> &[String] {
        self.0.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append an alias unless the language already has it. Returns whether
    /// it was added.
    pub fn push(&mut self, language: &str, alias: &str) -> bool {
        let aliases = self.0.entry(language.to_string()).or_default();
        if aliases.iter().any(|a| a == alias) {
            return false;
        }
        aliases.push(alias.to_string());
        true
    }

    /// Append several aliases, returning how many were new.
    pub fn extend<'a>(&mut self, language: &str, aliases: impl IntoIterator<Item = &'a str>) -> usize {
        aliases
            .into_iter()
            .filter(|alias| self.push(language, alias))
            .count()
    }

    pub fn retain_languages(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|language, _| keep(language));
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(l, a)| (l.as_str(), a.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

// ============================================================================
// Sitelinks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitelink {
    pub site: String,
    pub title: String,
    /// Badge items.
    pub badges: Vec<IdRef>,
}

impl Sitelink {
    pub fn new(site: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            title: title.into(),
            badges: Vec::new(),
        }
    }
}

pub type Sitelinks = BTreeMap<String, Sitelink>;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// `None` means the entity does not exist yet and is to be created.
    pub id: Option<EntityId>,
    pub kind: EntityKind,
    /// Datatype of a property entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Datatype>,
    #[serde(default)]
    pub labels: LocalizedText,
    #[serde(default)]
    pub descriptions: LocalizedText,
    #[serde(default)]
    pub aliases: AliasSet,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub sitelinks: Sitelinks,
}

impl EntityRecord {
    /// An empty record of the given kind, to be created.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            id: None,
            kind,
            datatype: None,
            labels: LocalizedText::new(),
            descriptions: LocalizedText::new(),
            aliases: AliasSet::new(),
            claims: Vec::new(),
            sitelinks: Sitelinks::new(),
        }
    }

    /// An empty record for an existing entity.
    pub fn with_id(id: EntityId) -> Self {
        let mut record = Self::new(id.kind());
        record.id = Some(id);
        record
    }

    pub fn with_label(mut self, language: &str, value: &str) -> Self {
        self.labels.set(language, value);
        self
    }

    pub fn with_description(mut self, language: &str, value: &str) -> Self {
        self.descriptions.set(language, value);
        self
    }

    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn claims_for<'a>(&'a self, property: &'a IdRef) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims.iter().filter(move |c| c.property() == property)
    }

    /// Unmapped source ids still present in the record (claims and sitelink
    /// badges). A record is only writable when this is empty.
    pub fn unresolved_ids(&self) -> Vec<&EntityId> {
        let claim_refs = self.claims.iter().flat_map(|c| c.id_refs());
        let badge_refs = self.sitelinks.values().flat_map(|s| s.badges.iter());
        let mut out: Vec<&EntityId> = Vec::new();
        for slot in claim_refs.chain(badge_refs) {
            if let IdRef::Unresolved(id) = slot {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }

    pub fn is_writable(&self) -> bool {
        self.unresolved_ids().is_empty()
    }
}
