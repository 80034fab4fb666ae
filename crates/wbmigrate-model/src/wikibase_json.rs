//! Wikibase JSON codec.
//!
//! Decodes the entity JSON served by `wbgetentities` / `Special:EntityData`
//! into [`EntityRecord`]s and encodes records back into the same shape for a
//! writer.
//!
//! ```text
//! {"entities": {"Q42": {"type": "item", "labels": {…}, "claims": {"P31": [statement, …]}, …}}}
//!                         │
//!                         ▼
//!                   EntityRecord { labels, descriptions, aliases, claims, sitelinks }
//! ```
//!
//! Notes:
//! - Snak hashes are dropped on decode; the target recomputes them.
//! - Statement GUIDs are kept so that merged claims can be updated in place.
//! - Encoding refuses records that still hold unresolved ids.

use crate::claim::{Claim, Rank, ReferenceBlock, Snak, SnakGroup, SnakValue};
use crate::datatype::Datatype;
use crate::error::CodecError;
use crate::id::{EntityId, EntityKind, IdRef};
use crate::record::{EntityRecord, Sitelink};
use crate::value::{
    GlobeCoordinate, MonolingualText, Quantity, QuantityUnit, Time, Value, EARTH_GLOBE,
    GREGORIAN_CALENDAR,
};
use serde_json::{json, Map, Value as Json};

/// Concept IRI prefix of Wikidata.
pub const WIKIDATA_CONCEPT_BASE: &str = "http://www.wikidata.org/entity/";

/// Codec bound to one wiki. The concept base is the IRI prefix of the wiki's
/// own entities; it decides which quantity units are local items.
#[derive(Debug, Clone)]
pub struct EntityCodec {
    concept_base: String,
}

impl Default for EntityCodec {
    fn default() -> Self {
        Self::new(WIKIDATA_CONCEPT_BASE)
    }
}

type JsonObject = Map<String, Json>;

impl EntityCodec {
    pub fn new(concept_base: impl Into<String>) -> Self {
        Self {
            concept_base: concept_base.into(),
        }
    }

    pub fn concept_base(&self) -> &str {
        &self.concept_base
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode every entity of a document. Accepts the `{"entities": {…}}`
    /// envelope, a bare id → entity object, an array of entities, or a single
    /// entity. Entries flagged `missing` are skipped.
    pub fn decode_entities(&self, doc: &Json) -> Result<Vec<EntityRecord>, CodecError> {
        let entries: Vec<&Json> = match doc {
            Json::Array(items) => items.iter().collect(),
            Json::Object(obj) if obj.contains_key("entities") => match &obj["entities"] {
                Json::Object(entities) => entities.values().collect(),
                Json::Array(items) => items.iter().collect(),
                _ => {
                    return Err(invalid("entities", "document", "expected an object or array"))
                }
            },
            Json::Object(obj) if obj.contains_key("type") => vec![doc],
            Json::Object(obj) => obj.values().collect(),
            _ => return Err(invalid("entities", "document", "expected an object or array")),
        };

        entries
            .into_iter()
            .filter(|entry| entry.get("missing").is_none())
            .map(|entry| self.decode_entity(entry))
            .collect()
    }

    pub fn decode_entity(&self, json: &Json) -> Result<EntityRecord, CodecError> {
        let obj = as_object(json, "entity", "document")?;
        let id = match obj.get("id").and_then(Json::as_str) {
            Some(raw) => Some(EntityId::parse(raw)?),
            None => None,
        };
        let context = id
            .as_ref()
            .map(|id| format!("entity {id}"))
            .unwrap_or_else(|| "new entity".to_string());

        let kind = match obj.get("type").and_then(Json::as_str) {
            Some("item") => EntityKind::Item,
            Some("property") => EntityKind::Property,
            Some(other) => return Err(CodecError::UnsupportedEntityType(other.to_string())),
            None => match &id {
                Some(id) => id.kind(),
                None => return Err(missing("type", &context)),
            },
        };

        let mut record = EntityRecord::new(kind);
        record.id = id;
        record.datatype = obj
            .get("datatype")
            .and_then(Json::as_str)
            .map(Datatype::parse);

        if let Some(labels) = obj.get("labels") {
            for (language, value) in terms(labels, "labels", &context)? {
                record.labels.set(language, value);
            }
        }
        if let Some(descriptions) = obj.get("descriptions") {
            for (language, value) in terms(descriptions, "descriptions", &context)? {
                record.descriptions.set(language, value);
            }
        }
        if let Some(aliases) = obj.get("aliases") {
            for (language, entries) in as_object(aliases, "aliases", &context)? {
                let entries = as_array(entries, "aliases", &context)?;
                for entry in entries {
                    let value = str_field(as_object(entry, "aliases", &context)?, "value", &context)?;
                    record.aliases.push(language, value);
                }
            }
        }
        if let Some(sitelinks) = obj.get("sitelinks") {
            for (site, entry) in as_object(sitelinks, "sitelinks", &context)? {
                let entry = as_object(entry, "sitelinks", &context)?;
                let mut sitelink = Sitelink::new(site.clone(), str_field(entry, "title", &context)?);
                if let Some(badges) = entry.get("badges") {
                    for badge in as_array(badges, "badges", &context)? {
                        let raw = badge
                            .as_str()
                            .ok_or_else(|| invalid("badges", &context, "expected a string"))?;
                        sitelink.badges.push(EntityId::parse(raw)?.into());
                    }
                }
                record.sitelinks.insert(site.clone(), sitelink);
            }
        }

        let claims = obj.get("claims").or_else(|| obj.get("statements"));
        if let Some(claims) = claims {
            for (_, statements) in as_object(claims, "claims", &context)? {
                for statement in as_array(statements, "claims", &context)? {
                    record.claims.push(self.decode_claim(statement, &context)?);
                }
            }
        }

        Ok(record)
    }

    fn decode_claim(&self, json: &Json, context: &str) -> Result<Claim, CodecError> {
        let obj = as_object(json, "claim", context)?;
        let main_snak = self.decode_snak(
            obj.get("mainsnak").ok_or_else(|| missing("mainsnak", context))?,
            context,
        )?;
        let rank = match obj.get("rank").and_then(Json::as_str) {
            Some(rank) => rank.parse::<Rank>()?,
            None => Rank::Normal,
        };

        let qualifiers = match obj.get("qualifiers") {
            Some(q) => self.decode_snak_groups(q, obj.get("qualifiers-order"), context)?,
            None => Vec::new(),
        };

        let mut references = Vec::new();
        if let Some(refs) = obj.get("references") {
            for block in as_array(refs, "references", context)? {
                let block = as_object(block, "references", context)?;
                let snaks = block.get("snaks").ok_or_else(|| missing("snaks", context))?;
                let groups = self.decode_snak_groups(snaks, block.get("snaks-order"), context)?;
                references.push(ReferenceBlock::new(groups));
            }
        }

        Ok(Claim {
            id: obj.get("id").and_then(Json::as_str).map(str::to_string),
            main_snak,
            qualifiers,
            references,
            rank,
        })
    }

    fn decode_snak_groups(
        &self,
        json: &Json,
        order: Option<&Json>,
        context: &str,
    ) -> Result<Vec<SnakGroup>, CodecError> {
        let obj = as_object(json, "snaks", context)?;
        let mut keys: Vec<&str> = Vec::new();
        if let Some(order) = order.and_then(Json::as_array) {
            keys.extend(order.iter().filter_map(Json::as_str));
        }
        for key in obj.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }

        let mut groups = Vec::new();
        for key in keys {
            let Some(snaks) = obj.get(key) else { continue };
            let property = EntityId::parse(key)?;
            let snaks = as_array(snaks, "snaks", context)?
                .iter()
                .map(|s| self.decode_snak(s, context))
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(SnakGroup::new(property.into(), snaks));
        }
        Ok(groups)
    }

    pub fn decode_snak(&self, json: &Json, context: &str) -> Result<Snak, CodecError> {
        let obj = as_object(json, "snak", context)?;
        let property = EntityId::parse(str_field(obj, "property", context)?)?;
        let declared = obj.get("datatype").and_then(Json::as_str).map(Datatype::parse);

        let value = match str_field(obj, "snaktype", context)? {
            "value" => {
                let datavalue = as_object(
                    obj.get("datavalue")
                        .ok_or_else(|| missing("datavalue", context))?,
                    "datavalue",
                    context,
                )?;
                SnakValue::Value(self.decode_value(datavalue, context)?)
            }
            "novalue" => SnakValue::NoValue,
            "somevalue" => SnakValue::SomeValue,
            other => return Err(CodecError::UnknownSnakType(other.to_string())),
        };

        let datatype = match (declared, &value) {
            (Some(datatype), _) => datatype,
            (None, SnakValue::Value(value)) => infer_datatype(value),
            (None, _) => Datatype::Other(String::new()),
        };

        Ok(Snak {
            property: property.into(),
            datatype,
            value,
        })
    }

    fn decode_value(&self, datavalue: &JsonObject, context: &str) -> Result<Value, CodecError> {
        let value_type = str_field(datavalue, "type", context)?;
        let raw = datavalue
            .get("value")
            .ok_or_else(|| missing("value", context))?;

        let value = match value_type {
            "string" => Value::string(
                raw.as_str()
                    .ok_or_else(|| invalid("value", context, "expected a string"))?,
            ),
            "wikibase-entityid" => {
                let obj = as_object(raw, "value", context)?;
                match entity_value_id(obj)? {
                    Some(id) => Value::entity(id),
                    // Lexemes, forms, senses.
                    None => opaque(value_type, raw),
                }
            }
            "monolingualtext" => {
                let obj = as_object(raw, "value", context)?;
                Value::MonolingualText(MonolingualText {
                    text: str_field(obj, "text", context)?.to_string(),
                    language: str_field(obj, "language", context)?.to_string(),
                })
            }
            "quantity" => {
                let obj = as_object(raw, "value", context)?;
                let unit = obj
                    .get("unit")
                    .and_then(Json::as_str)
                    .unwrap_or(crate::value::DIMENSIONLESS_UNIT);
                Value::Quantity(Quantity {
                    amount: decimal_field(obj, "amount", context)?
                        .ok_or_else(|| missing("amount", context))?,
                    upper_bound: decimal_field(obj, "upperBound", context)?,
                    lower_bound: decimal_field(obj, "lowerBound", context)?,
                    unit: QuantityUnit::from_iri(unit, &self.concept_base),
                })
            }
            "time" => {
                let obj = as_object(raw, "value", context)?;
                Value::Time(Time {
                    time: str_field(obj, "time", context)?.to_string(),
                    precision: int_field(obj, "precision", context)?.unwrap_or(11) as u8,
                    timezone: int_field(obj, "timezone", context)?.unwrap_or(0) as i32,
                    before: int_field(obj, "before", context)?.unwrap_or(0) as u32,
                    after: int_field(obj, "after", context)?.unwrap_or(0) as u32,
                    calendar_model: obj
                        .get("calendarmodel")
                        .and_then(Json::as_str)
                        .unwrap_or(GREGORIAN_CALENDAR)
                        .to_string(),
                })
            }
            "globecoordinate" => {
                let obj = as_object(raw, "value", context)?;
                Value::GlobeCoordinate(GlobeCoordinate {
                    latitude: float_field(obj, "latitude", context)?
                        .ok_or_else(|| missing("latitude", context))?,
                    longitude: float_field(obj, "longitude", context)?
                        .ok_or_else(|| missing("longitude", context))?,
                    altitude: float_field(obj, "altitude", context)?,
                    precision: float_field(obj, "precision", context)?,
                    globe: obj
                        .get("globe")
                        .and_then(Json::as_str)
                        .unwrap_or(EARTH_GLOBE)
                        .to_string(),
                })
            }
            other => opaque(other, raw),
        };
        Ok(value)
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    pub fn encode_entities(&self, records: &[EntityRecord]) -> Result<Json, CodecError> {
        let mut entities = JsonObject::new();
        for (index, record) in records.iter().enumerate() {
            let key = record
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("new-{index}"));
            entities.insert(key, self.encode_entity(record)?);
        }
        Ok(json!({ "entities": entities }))
    }

    pub fn encode_entity(&self, record: &EntityRecord) -> Result<Json, CodecError> {
        let mut obj = JsonObject::new();
        if let Some(id) = &record.id {
            obj.insert("id".into(), json!(id.as_str()));
        }
        obj.insert("type".into(), json!(record.kind.as_str()));
        if let Some(datatype) = &record.datatype {
            obj.insert("datatype".into(), json!(datatype.as_str()));
        }

        let mut labels = JsonObject::new();
        for (language, value) in record.labels.iter() {
            labels.insert(language.into(), json!({ "language": language, "value": value }));
        }
        obj.insert("labels".into(), Json::Object(labels));

        let mut descriptions = JsonObject::new();
        for (language, value) in record.descriptions.iter() {
            descriptions.insert(language.into(), json!({ "language": language, "value": value }));
        }
        obj.insert("descriptions".into(), Json::Object(descriptions));

        let mut aliases = JsonObject::new();
        for (language, values) in record.aliases.iter() {
            let entries: Vec<Json> = values
                .iter()
                .map(|v| json!({ "language": language, "value": v }))
                .collect();
            aliases.insert(language.into(), Json::Array(entries));
        }
        obj.insert("aliases".into(), Json::Object(aliases));

        let mut claims = JsonObject::new();
        for claim in &record.claims {
            let property = resolved(claim.property())?.to_string();
            let encoded = self.encode_claim(claim)?;
            match claims.get_mut(&property) {
                Some(Json::Array(list)) => list.push(encoded),
                _ => {
                    claims.insert(property, Json::Array(vec![encoded]));
                }
            }
        }
        obj.insert("claims".into(), Json::Object(claims));

        if record.kind == EntityKind::Item {
            let mut sitelinks = JsonObject::new();
            for (site, sitelink) in &record.sitelinks {
                let badges = sitelink
                    .badges
                    .iter()
                    .map(|b| resolved(b).map(|id| json!(id.as_str())))
                    .collect::<Result<Vec<_>, _>>()?;
                sitelinks.insert(
                    site.clone(),
                    json!({ "site": site, "title": sitelink.title, "badges": badges }),
                );
            }
            obj.insert("sitelinks".into(), Json::Object(sitelinks));
        }

        Ok(Json::Object(obj))
    }

    fn encode_claim(&self, claim: &Claim) -> Result<Json, CodecError> {
        let mut obj = JsonObject::new();
        if let Some(id) = &claim.id {
            obj.insert("id".into(), json!(id));
        }
        obj.insert("type".into(), json!("statement"));
        obj.insert("mainsnak".into(), self.encode_snak(&claim.main_snak)?);
        obj.insert("rank".into(), json!(claim.rank.as_str()));

        if !claim.qualifiers.is_empty() {
            let (qualifiers, order) = self.encode_snak_groups(&claim.qualifiers)?;
            obj.insert("qualifiers".into(), qualifiers);
            obj.insert("qualifiers-order".into(), order);
        }

        let mut references = Vec::new();
        for block in &claim.references {
            let (snaks, order) = self.encode_snak_groups(&block.groups)?;
            references.push(json!({ "snaks": snaks, "snaks-order": order }));
        }
        if !references.is_empty() {
            obj.insert("references".into(), Json::Array(references));
        }
        Ok(Json::Object(obj))
    }

    fn encode_snak_groups(&self, groups: &[SnakGroup]) -> Result<(Json, Json), CodecError> {
        let mut snaks = JsonObject::new();
        let mut order = Vec::new();
        for group in groups {
            let property = resolved(&group.property)?.to_string();
            let encoded = group
                .snaks
                .iter()
                .map(|s| self.encode_snak(s))
                .collect::<Result<Vec<_>, _>>()?;
            match snaks.get_mut(&property) {
                Some(Json::Array(list)) => list.extend(encoded),
                _ => {
                    order.push(json!(property));
                    snaks.insert(property, Json::Array(encoded));
                }
            }
        }
        Ok((Json::Object(snaks), Json::Array(order)))
    }

    pub fn encode_snak(&self, snak: &Snak) -> Result<Json, CodecError> {
        let mut obj = JsonObject::new();
        let snaktype = match &snak.value {
            SnakValue::Value(_) => "value",
            SnakValue::NoValue => "novalue",
            SnakValue::SomeValue => "somevalue",
        };
        obj.insert("snaktype".into(), json!(snaktype));
        obj.insert("property".into(), json!(resolved(&snak.property)?.as_str()));
        if !snak.datatype.as_str().is_empty() {
            obj.insert("datatype".into(), json!(snak.datatype.as_str()));
        }
        if let SnakValue::Value(value) = &snak.value {
            obj.insert(
                "datavalue".into(),
                json!({ "value": self.encode_value(value)?, "type": value.value_type() }),
            );
        }
        Ok(Json::Object(obj))
    }

    fn encode_value(&self, value: &Value) -> Result<Json, CodecError> {
        let encoded = match value {
            Value::Entity { id } => {
                let id = resolved(id)?;
                json!({
                    "entity-type": id.kind().as_str(),
                    "numeric-id": id.numeric_id(),
                    "id": id.as_str(),
                })
            }
            Value::String { value } => json!(value),
            Value::MonolingualText(text) => json!({ "text": text.text, "language": text.language }),
            Value::Quantity(quantity) => {
                if let QuantityUnit::Entity(id) = &quantity.unit {
                    resolved(id)?;
                }
                let mut obj = JsonObject::new();
                obj.insert("amount".into(), json!(quantity.amount));
                obj.insert("unit".into(), json!(quantity.unit.to_iri(&self.concept_base)));
                if let Some(upper) = &quantity.upper_bound {
                    obj.insert("upperBound".into(), json!(upper));
                }
                if let Some(lower) = &quantity.lower_bound {
                    obj.insert("lowerBound".into(), json!(lower));
                }
                Json::Object(obj)
            }
            Value::Time(time) => json!({
                "time": time.time,
                "timezone": time.timezone,
                "before": time.before,
                "after": time.after,
                "precision": time.precision,
                "calendarmodel": time.calendar_model,
            }),
            Value::GlobeCoordinate(coord) => json!({
                "latitude": coord.latitude,
                "longitude": coord.longitude,
                "altitude": coord.altitude,
                "precision": coord.precision,
                "globe": coord.globe,
            }),
            Value::Opaque { raw, .. } => raw.clone(),
        };
        Ok(encoded)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn missing(field: &'static str, context: &str) -> CodecError {
    CodecError::MissingField {
        field,
        context: context.to_string(),
    }
}

fn invalid(field: &'static str, context: &str, reason: &str) -> CodecError {
    CodecError::InvalidField {
        field,
        context: context.to_string(),
        reason: reason.to_string(),
    }
}

fn as_object<'a>(json: &'a Json, field: &'static str, context: &str) -> Result<&'a JsonObject, CodecError> {
    json.as_object()
        .ok_or_else(|| invalid(field, context, "expected an object"))
}

fn as_array<'a>(json: &'a Json, field: &'static str, context: &str) -> Result<&'a Vec<Json>, CodecError> {
    json.as_array()
        .ok_or_else(|| invalid(field, context, "expected an array"))
}

fn str_field<'a>(obj: &'a JsonObject, field: &'static str, context: &str) -> Result<&'a str, CodecError> {
    obj.get(field)
        .ok_or_else(|| missing(field, context))?
        .as_str()
        .ok_or_else(|| invalid(field, context, "expected a string"))
}

/// Decimal fields are strings in the JSON format but some exporters write
/// numbers.
fn decimal_field(obj: &JsonObject, field: &'static str, context: &str) -> Result<Option<String>, CodecError> {
    match obj.get(field) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s.clone())),
        Some(Json::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(invalid(field, context, "expected a decimal string")),
    }
}

fn int_field(obj: &JsonObject, field: &'static str, context: &str) -> Result<Option<i64>, CodecError> {
    match obj.get(field) {
        None | Some(Json::Null) => Ok(None),
        Some(json) => json
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(field, context, "expected an integer")),
    }
}

fn float_field(obj: &JsonObject, field: &'static str, context: &str) -> Result<Option<f64>, CodecError> {
    match obj.get(field) {
        None | Some(Json::Null) => Ok(None),
        Some(json) => json
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(field, context, "expected a number")),
    }
}

fn terms<'a>(json: &'a Json, field: &'static str, context: &str) -> Result<Vec<(&'a str, &'a str)>, CodecError> {
    let mut out = Vec::new();
    for (language, entry) in as_object(json, field, context)? {
        let value = str_field(as_object(entry, field, context)?, "value", context)?;
        out.push((language.as_str(), value));
    }
    Ok(out)
}

/// Item or property id of a `wikibase-entityid` value; `None` for other
/// entity types.
fn entity_value_id(obj: &JsonObject) -> Result<Option<EntityId>, CodecError> {
    if let Some(raw) = obj.get("id").and_then(Json::as_str) {
        return match EntityId::parse(raw) {
            Ok(id) => Ok(Some(id)),
            Err(_) => Ok(None),
        };
    }
    let kind = match obj.get("entity-type").and_then(Json::as_str) {
        Some("item") => EntityKind::Item,
        Some("property") => EntityKind::Property,
        _ => return Ok(None),
    };
    match obj.get("numeric-id").and_then(Json::as_u64) {
        Some(n) => Ok(Some(EntityId::new(kind, n))),
        None => Err(missing("numeric-id", "wikibase-entityid value")),
    }
}

fn opaque(value_type: &str, raw: &Json) -> Value {
    Value::Opaque {
        value_type: value_type.to_string(),
        raw: raw.clone(),
    }
}

fn infer_datatype(value: &Value) -> Datatype {
    match value {
        Value::Entity { id } if id.kind() == EntityKind::Property => Datatype::WikibaseProperty,
        Value::Entity { .. } => Datatype::WikibaseItem,
        Value::String { .. } => Datatype::String,
        Value::MonolingualText(_) => Datatype::MonolingualText,
        Value::Quantity(_) => Datatype::Quantity,
        Value::Time(_) => Datatype::Time,
        Value::GlobeCoordinate(_) => Datatype::GlobeCoordinate,
        Value::Opaque { value_type, .. } => Datatype::Other(value_type.clone()),
    }
}

fn resolved(slot: &IdRef) -> Result<&EntityId, CodecError> {
    match slot {
        IdRef::Resolved(id) => Ok(id),
        IdRef::Unresolved(id) => Err(CodecError::UnresolvedReference(id.clone())),
    }
}
