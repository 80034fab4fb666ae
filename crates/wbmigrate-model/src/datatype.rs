//! Property datatypes.
//!
//! Wikibase reports datatypes in two spellings: the API/JSON names
//! (`wikibase-item`, `external-id`, …) and the ontology names returned by
//! `wikibase:propertyType` in SPARQL (`WikibaseItem`, `ExternalId`, …). Both
//! parse into the same [`Datatype`]; unknown names are kept as
//! [`Datatype::Other`] rather than rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Datatype {
    WikibaseItem,
    WikibaseProperty,
    String,
    ExternalId,
    Url,
    CommonsMedia,
    LocalMedia,
    MonolingualText,
    Quantity,
    Time,
    GlobeCoordinate,
    GeoShape,
    TabularData,
    Math,
    MusicalNotation,
    EntitySchema,
    Edtf,
    WikibaseLexeme,
    WikibaseForm,
    WikibaseSense,
    Other(String),
}

/// (JSON name, ontology name) for every known datatype.
const NAMES: &[(Datatype, &str, &str)] = &[
    (Datatype::WikibaseItem, "wikibase-item", "WikibaseItem"),
    (Datatype::WikibaseProperty, "wikibase-property", "WikibaseProperty"),
    (Datatype::String, "string", "String"),
    (Datatype::ExternalId, "external-id", "ExternalId"),
    (Datatype::Url, "url", "Url"),
    (Datatype::CommonsMedia, "commonsMedia", "CommonsMedia"),
    (Datatype::LocalMedia, "localMedia", "LocalMedia"),
    (Datatype::MonolingualText, "monolingualtext", "Monolingualtext"),
    (Datatype::Quantity, "quantity", "Quantity"),
    (Datatype::Time, "time", "Time"),
    (Datatype::GlobeCoordinate, "globe-coordinate", "GlobeCoordinate"),
    (Datatype::GeoShape, "geo-shape", "GeoShape"),
    (Datatype::TabularData, "tabular-data", "TabularData"),
    (Datatype::Math, "math", "Math"),
    (Datatype::MusicalNotation, "musical-notation", "MusicalNotation"),
    (Datatype::EntitySchema, "entity-schema", "EntitySchema"),
    (Datatype::Edtf, "edtf", "Edtf"),
    (Datatype::WikibaseLexeme, "wikibase-lexeme", "WikibaseLexeme"),
    (Datatype::WikibaseForm, "wikibase-form", "WikibaseForm"),
    (Datatype::WikibaseSense, "wikibase-sense", "WikibaseSense"),
];

impl Datatype {
    /// Parse a JSON (`wikibase-item`) or ontology (`WikibaseItem`, or its full
    /// `http://wikiba.se/ontology#WikibaseItem` IRI) name.
    pub fn parse(name: &str) -> Datatype {
        let name = name.trim();
        let local = name.rsplit(['#', '/']).next().unwrap_or(name);
        for (datatype, json_name, ontology_name) in NAMES {
            if name == *json_name || local == *ontology_name {
                return datatype.clone();
            }
        }
        // `wikibase-property` is spelled `property` by some tools.
        if name == "property" {
            return Datatype::WikibaseProperty;
        }
        Datatype::Other(name.to_string())
    }

    /// The JSON name, as written in snaks and property entities.
    pub fn as_str(&self) -> &str {
        if let Datatype::Other(name) = self {
            return name;
        }
        NAMES
            .iter()
            .find(|(datatype, _, _)| datatype == self)
            .map(|(_, json_name, _)| *json_name)
            .unwrap_or("")
    }

    /// Datatypes whose value is a plain string (`datavalue.type == "string"`).
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Datatype::String
                | Datatype::ExternalId
                | Datatype::Url
                | Datatype::CommonsMedia
                | Datatype::LocalMedia
                | Datatype::GeoShape
                | Datatype::TabularData
                | Datatype::Math
                | Datatype::MusicalNotation
                | Datatype::Edtf
        )
    }

    /// Datatypes whose value points at an item or property of the same wiki.
    pub fn is_entity_reference(&self) -> bool {
        matches!(self, Datatype::WikibaseItem | Datatype::WikibaseProperty)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Datatype {
    fn from(value: String) -> Self {
        Datatype::parse(&value)
    }
}

impl From<Datatype> for String {
    fn from(value: Datatype) -> Self {
        value.as_str().to_string()
    }
}
