//! Property datatype lookup.

use serde_json::Value as Json;
use std::collections::HashMap;
use wbmigrate_model::{Datatype, EntityId, EntityKind, EntityRecord, ModelError};

/// Datatype of a property in one wiki.
pub trait PropertyMetadata: Sync {
    fn datatype(&self, property: &EntityId) -> Option<Datatype>;
}

/// No metadata: every lookup misses, so no casts are attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl PropertyMetadata for NoMetadata {
    fn datatype(&self, _property: &EntityId) -> Option<Datatype> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("property datatypes have the wrong shape: {0}")]
    InvalidShape(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyDatatypes(HashMap<EntityId, Datatype>);

impl PropertyDatatypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: EntityId, datatype: Datatype) {
        self.0.insert(property, datatype);
    }

    pub fn get(&self, property: &EntityId) -> Option<&Datatype> {
        self.0.get(property)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: PropertyDatatypes) {
        self.0.extend(other.0);
    }

    /// `{"P31": "wikibase-item", "P1082": "Quantity", …}`. Keys may be ids or
    /// concept IRIs, values JSON or ontology names.
    pub fn from_json_object(doc: &Json) -> Result<Self, MetadataError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| MetadataError::InvalidShape("expected an object".into()))?;
        let mut out = Self::new();
        for (key, value) in obj {
            let name = value.as_str().ok_or_else(|| {
                MetadataError::InvalidShape(format!("datatype of `{key}` is not a string"))
            })?;
            out.insert(parse_property(key)?, Datatype::parse(name));
        }
        Ok(out)
    }

    /// SPARQL results binding a property (`?p`) to its
    /// `wikibase:propertyType` IRI (`?type`).
    pub fn from_sparql_json(doc: &Json, property_var: &str, type_var: &str) -> Result<Self, MetadataError> {
        let bindings = doc
            .pointer("/results/bindings")
            .and_then(Json::as_array)
            .ok_or_else(|| MetadataError::InvalidShape("missing results.bindings array".into()))?;
        let mut out = Self::new();
        for binding in bindings {
            let value = |var: &str| {
                binding
                    .get(var)
                    .and_then(|b| b.get("value"))
                    .and_then(Json::as_str)
            };
            let (Some(property), Some(datatype)) = (value(property_var), value(type_var)) else {
                return Err(MetadataError::InvalidShape(format!(
                    "binding without `{property_var}` or `{type_var}`"
                )));
            };
            out.insert(parse_property(property)?, Datatype::parse(datatype));
        }
        Ok(out)
    }

    /// Accepts either of the two documents above.
    pub fn from_json(doc: &Json) -> Result<Self, MetadataError> {
        if doc.get("results").is_some() {
            Self::from_sparql_json(doc, "p", "type")
        } else {
            Self::from_json_object(doc)
        }
    }

    /// Datatypes declared by property records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EntityRecord>) -> Self {
        records
            .into_iter()
            .filter_map(|r| match (&r.id, &r.datatype) {
                (Some(id), Some(datatype)) if id.is_property() => Some((id.clone(), datatype.clone())),
                _ => None,
            })
            .collect()
    }
}

impl FromIterator<(EntityId, Datatype)> for PropertyDatatypes {
    fn from_iter<T: IntoIterator<Item = (EntityId, Datatype)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PropertyMetadata for PropertyDatatypes {
    fn datatype(&self, property: &EntityId) -> Option<Datatype> {
        self.0.get(property).cloned()
    }
}

fn parse_property(raw: &str) -> Result<EntityId, MetadataError> {
    let id = EntityId::parse(raw)?;
    if id.kind() != EntityKind::Property {
        return Err(MetadataError::InvalidShape(format!("`{raw}` is not a property")));
    }
    Ok(id)
}
