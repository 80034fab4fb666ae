//! Snak payloads.
//!
//! [`Value`] is a closed sum over the datavalue shapes of the Wikibase JSON
//! format. Shapes the model does not know (lexemes, future datatypes) are kept
//! verbatim in [`Value::Opaque`] so they survive a migration untouched.

use crate::id::{EntityId, IdRef};
use serde::{Deserialize, Serialize};

/// Unit IRI of a dimensionless quantity.
pub const DIMENSIONLESS_UNIT: &str = "1";

/// Gregorian calendar model IRI, the default for time values.
pub const GREGORIAN_CALENDAR: &str = "http://www.wikidata.org/entity/Q1985727";

/// Earth globe IRI, the default for coordinates.
pub const EARTH_GLOBE: &str = "http://www.wikidata.org/entity/Q2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    /// Reference to an item or property (`wikibase-entityid`).
    Entity { id: IdRef },
    String { value: String },
    MonolingualText(MonolingualText),
    Quantity(Quantity),
    Time(Time),
    GlobeCoordinate(GlobeCoordinate),
    /// A datavalue the model does not interpret.
    Opaque {
        value_type: String,
        raw: serde_json::Value,
    },
}

impl Value {
    pub fn entity(id: EntityId) -> Self {
        Value::Entity { id: id.into() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String {
            value: value.into(),
        }
    }

    pub fn monolingual(text: impl Into<String>, language: impl Into<String>) -> Self {
        Value::MonolingualText(MonolingualText {
            text: text.into(),
            language: language.into(),
        })
    }

    /// The `datavalue.type` of the JSON format.
    pub fn value_type(&self) -> &str {
        match self {
            Value::Entity { .. } => "wikibase-entityid",
            Value::String { .. } => "string",
            Value::MonolingualText(_) => "monolingualtext",
            Value::Quantity(_) => "quantity",
            Value::Time(_) => "time",
            Value::GlobeCoordinate(_) => "globecoordinate",
            Value::Opaque { value_type, .. } => value_type,
        }
    }

    /// Every id slot held by this value.
    pub fn id_refs(&self) -> Vec<&IdRef> {
        match self {
            Value::Entity { id } => vec![id],
            Value::Quantity(Quantity {
                unit: QuantityUnit::Entity(id),
                ..
            }) => vec![id],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonolingualText {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    /// Decimal string with explicit sign, e.g. `+12.5`.
    pub amount: String,
    pub upper_bound: Option<String>,
    pub lower_bound: Option<String>,
    pub unit: QuantityUnit,
}

impl Quantity {
    pub fn dimensionless(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            upper_bound: None,
            lower_bound: None,
            unit: QuantityUnit::Dimensionless,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    /// The unit `1`.
    Dimensionless,
    /// A unit item of the same wiki.
    Entity(IdRef),
    /// A unit IRI that does not name an item of the same wiki.
    Iri(String),
}

impl QuantityUnit {
    /// Classify a unit IRI as written in the JSON format. Only IRIs under
    /// `concept_base` (the wiki's own entity namespace) become entity units.
    pub fn from_iri(iri: &str, concept_base: &str) -> Self {
        if iri == DIMENSIONLESS_UNIT {
            return QuantityUnit::Dimensionless;
        }
        if let Some(local) = iri.strip_prefix(concept_base) {
            if let Ok(id) = EntityId::parse(local) {
                if id.is_item() {
                    return QuantityUnit::Entity(id.into());
                }
            }
        }
        QuantityUnit::Iri(iri.to_string())
    }

    /// The IRI of this unit, with entity units placed under `concept_base`.
    pub fn to_iri(&self, concept_base: &str) -> String {
        match self {
            QuantityUnit::Dimensionless => DIMENSIONLESS_UNIT.to_string(),
            QuantityUnit::Entity(id) => format!("{concept_base}{}", id.id()),
            QuantityUnit::Iri(iri) => iri.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    /// ISO-8601-like timestamp with sign, e.g. `+1990-05-17T00:00:00Z`.
    pub time: String,
    /// 9 = year, 10 = month, 11 = day.
    pub precision: u8,
    pub timezone: i32,
    pub before: u32,
    pub after: u32,
    pub calendar_model: String,
}

impl Time {
    pub const PRECISION_YEAR: u8 = 9;
    pub const PRECISION_MONTH: u8 = 10;
    pub const PRECISION_DAY: u8 = 11;

    pub fn new(time: impl Into<String>, precision: u8) -> Self {
        Self {
            time: time.into(),
            precision,
            timezone: 0,
            before: 0,
            after: 0,
            calendar_model: GREGORIAN_CALENDAR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobeCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub precision: Option<f64>,
    pub globe: String,
}
