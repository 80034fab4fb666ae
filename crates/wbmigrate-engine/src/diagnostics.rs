//! Non-fatal findings attached to each entity's result.
//!
//! Fatal problems are errors (`MappingError`, `EntityError`, …). Everything
//! else the engine notices while translating, merging or injecting is a
//! [`Diagnostic`]: the entity still migrates, but "with warnings".

use crate::cast::CastFailure;
use serde::{Deserialize, Serialize};
use wbmigrate_model::{Datatype, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// Where in a source record an id or value was found. Claim indices refer to
/// the source record's claim list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "in", rename_all = "snake_case")]
pub enum Location {
    MainSnak { claim: usize },
    Qualifier { claim: usize },
    Reference { claim: usize, block: usize },
    SitelinkBadge { site: String },
}

/// Whether the unmapped id sat in a snak's property slot or in its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Property,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Kept in the record as `IdRef::Unresolved`.
    Flagged,
    /// Removed together with the snak (or claim, or badge) holding it.
    Dropped,
}

/// A source id with no counterpart in the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub id: EntityId,
    pub location: Location,
    pub position: Position,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    UnresolvedReference(UnresolvedReference),
    /// A value could not be cast to the target property's datatype; the
    /// original value was kept.
    CastFailure {
        property: EntityId,
        location: Location,
        from: Datatype,
        to: Datatype,
        reason: String,
    },
    /// The description equals the label in the same language and was not
    /// carried over.
    DescriptionEqualsLabel { language: String },
    /// Several qualifier-less target claims matched; the first one was used.
    MergeAmbiguity {
        property: EntityId,
        candidates: usize,
        chosen: usize,
    },
    /// A back-reference sitelink could not be added because the site already
    /// links to another page.
    SitelinkConflict {
        site: String,
        existing: String,
        wanted: String,
    },
}

impl Diagnostic {
    pub fn cast_failure(
        property: EntityId,
        location: Location,
        from: &Datatype,
        to: &Datatype,
        failure: &CastFailure,
    ) -> Self {
        Diagnostic::CastFailure {
            property,
            location,
            from: from.clone(),
            to: to.clone(),
            reason: failure.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DescriptionEqualsLabel { .. } => Severity::Info,
            Diagnostic::UnresolvedReference(_)
            | Diagnostic::CastFailure { .. }
            | Diagnostic::MergeAmbiguity { .. }
            | Diagnostic::SitelinkConflict { .. } => Severity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl From<UnresolvedReference> for Diagnostic {
    fn from(value: UnresolvedReference) -> Self {
        Diagnostic::UnresolvedReference(value)
    }
}
