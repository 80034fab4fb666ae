//! Snaks, qualifier groups, reference blocks and claims.

use crate::datatype::Datatype;
use crate::error::ModelError;
use crate::id::{EntityId, IdRef};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Snaks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "snaktype", content = "datavalue", rename_all = "snake_case")]
pub enum SnakValue {
    Value(Value),
    NoValue,
    SomeValue,
}

/// A single property–value assertion. Used as main snak, qualifier and
/// reference component alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snak {
    pub property: IdRef,
    pub datatype: Datatype,
    pub value: SnakValue,
}

impl Snak {
    pub fn value(property: EntityId, datatype: Datatype, value: Value) -> Self {
        Self {
            property: property.into(),
            datatype,
            value: SnakValue::Value(value),
        }
    }

    pub fn no_value(property: EntityId, datatype: Datatype) -> Self {
        Self {
            property: property.into(),
            datatype,
            value: SnakValue::NoValue,
        }
    }

    pub fn some_value(property: EntityId, datatype: Datatype) -> Self {
        Self {
            property: property.into(),
            datatype,
            value: SnakValue::SomeValue,
        }
    }

    /// Shorthand for an item-valued snak.
    pub fn item(property: EntityId, item: EntityId) -> Self {
        Self::value(property, Datatype::WikibaseItem, Value::entity(item))
    }

    /// Shorthand for a plain string snak.
    pub fn string(property: EntityId, value: impl Into<String>) -> Self {
        Self::value(property, Datatype::String, Value::string(value))
    }

    /// Same property and same payload. The declared datatype is not compared:
    /// two snaks carrying the same value are the same assertion.
    pub fn same_assertion(&self, other: &Snak) -> bool {
        self.property == other.property && self.value == other.value
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.value {
            SnakValue::Value(value) => Some(value),
            SnakValue::NoValue | SnakValue::SomeValue => None,
        }
    }

    /// Every id slot of this snak, property first.
    pub fn id_refs(&self) -> Vec<&IdRef> {
        let mut refs = vec![&self.property];
        if let Some(value) = self.payload() {
            refs.extend(value.id_refs());
        }
        refs
    }
}

/// Snaks stated under one property, in order. Qualifiers and reference
/// blocks are both lists of these groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakGroup {
    pub property: IdRef,
    pub snaks: Vec<Snak>,
}

impl SnakGroup {
    pub fn new(property: IdRef, snaks: Vec<Snak>) -> Self {
        Self { property, snaks }
    }

    /// Group snaks by property, keeping first-appearance order of properties.
    pub fn group(snaks: Vec<Snak>) -> Vec<SnakGroup> {
        let mut groups: Vec<SnakGroup> = Vec::new();
        for snak in snaks {
            match groups.iter_mut().find(|g| g.property == snak.property) {
                Some(group) => group.snaks.push(snak),
                None => groups.push(SnakGroup {
                    property: snak.property.clone(),
                    snaks: vec![snak],
                }),
            }
        }
        groups
    }

    pub fn contains(&self, snak: &Snak) -> bool {
        self.snaks.iter().any(|s| s.same_assertion(snak))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceBlock {
    pub groups: Vec<SnakGroup>,
}

impl ReferenceBlock {
    pub fn new(groups: Vec<SnakGroup>) -> Self {
        Self { groups }
    }

    pub fn from_snaks(snaks: Vec<Snak>) -> Self {
        Self {
            groups: SnakGroup::group(snaks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.snaks.is_empty())
    }

    pub fn snaks(&self) -> impl Iterator<Item = &Snak> {
        self.groups.iter().flat_map(|g| g.snaks.iter())
    }
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

impl Rank {
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Preferred => "preferred",
            Rank::Normal => "normal",
            Rank::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preferred" => Ok(Rank::Preferred),
            "normal" => Ok(Rank::Normal),
            "deprecated" => Ok(Rank::Deprecated),
            other => Err(ModelError::UnknownRank(other.to_string())),
        }
    }
}

/// A statement. Its property is the property of the main snak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Statement GUID in the system the claim was read from. Claims that do
    /// not exist in the target yet have none.
    pub id: Option<String>,
    pub main_snak: Snak,
    pub qualifiers: Vec<SnakGroup>,
    pub references: Vec<ReferenceBlock>,
    pub rank: Rank,
}

impl Claim {
    pub fn new(main_snak: Snak) -> Self {
        Self {
            id: None,
            main_snak,
            qualifiers: Vec::new(),
            references: Vec::new(),
            rank: Rank::Normal,
        }
    }

    pub fn with_qualifier(mut self, snak: Snak) -> Self {
        match self
            .qualifiers
            .iter_mut()
            .find(|g| g.property == snak.property)
        {
            Some(group) => group.snaks.push(snak),
            None => self.qualifiers.push(SnakGroup {
                property: snak.property.clone(),
                snaks: vec![snak],
            }),
        }
        self
    }

    pub fn with_reference(mut self, block: ReferenceBlock) -> Self {
        self.references.push(block);
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn property(&self) -> &IdRef {
        &self.main_snak.property
    }

    pub fn qualifier_group(&self, property: &IdRef) -> Option<&SnakGroup> {
        self.qualifiers.iter().find(|g| &g.property == property)
    }

    pub fn qualifier_snaks(&self) -> impl Iterator<Item = &Snak> {
        self.qualifiers.iter().flat_map(|g| g.snaks.iter())
    }

    /// Every id slot of the claim: main snak, qualifiers, references.
    pub fn id_refs(&self) -> Vec<&IdRef> {
        let mut refs = self.main_snak.id_refs();
        for group in &self.qualifiers {
            refs.push(&group.property);
            for snak in &group.snaks {
                refs.extend(snak.id_refs());
            }
        }
        for block in &self.references {
            for group in &block.groups {
                refs.push(&group.property);
                for snak in &group.snaks {
                    refs.extend(snak.id_refs());
                }
            }
        }
        refs
    }
}
