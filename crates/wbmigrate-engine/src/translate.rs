//! Entity translator.
//!
//! Rewrites one source record into the target's id space:
//!
//! ```text
//! source record ──► terms filtered by language
//!               ──► claims: every snak (main, qualifier, reference) through remap_snak
//!                     property ─► property_map
//!                     value    ─► item_map / property_map (quantity units ─► item_map)
//!                     datatype ─► cast to the target property's datatype (optional)
//!               ──► sitelinks filtered by site, badges ─► item_map
//! ```
//!
//! Ids without a mapping are either dropped with the snak holding them or
//! kept as [`IdRef::Unresolved`]; every occurrence is reported as an
//! [`UnresolvedReference`].

use crate::cast;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, Disposition, Location, Position, UnresolvedReference};
use crate::mapping::MappingTable;
use crate::metadata::PropertyMetadata;
use serde::{Deserialize, Serialize};
use wbmigrate_model::{
    Claim, EntityId, EntityKind, EntityRecord, IdRef, LocalizedText, Quantity, QuantityUnit,
    ReferenceBlock, Sitelink, Snak, SnakGroup, SnakValue, Value,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub source_id: Option<EntityId>,
    /// The existing target entity, `None` when the entity is to be created.
    pub target_id: Option<EntityId>,
    pub record: EntityRecord,
    pub unresolved: Vec<UnresolvedReference>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationResult {
    /// Unmapped source ids of the given kind, deduplicated, in order of
    /// first occurrence.
    pub fn missing(&self, kind: EntityKind) -> Vec<&EntityId> {
        let mut out: Vec<&EntityId> = Vec::new();
        for reference in &self.unresolved {
            if reference.id.kind() == kind && !out.contains(&&reference.id) {
                out.push(&reference.id);
            }
        }
        out
    }

    pub fn missing_items(&self) -> Vec<&EntityId> {
        self.missing(EntityKind::Item)
    }

    pub fn missing_properties(&self) -> Vec<&EntityId> {
        self.missing(EntityKind::Property)
    }

    pub fn has_warnings(&self) -> bool {
        !self.unresolved.is_empty() || self.diagnostics.iter().any(Diagnostic::is_warning)
    }

    /// All findings as diagnostics, unresolved references first.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.unresolved
            .iter()
            .cloned()
            .map(Diagnostic::from)
            .chain(self.diagnostics.iter().cloned())
    }
}

pub struct Translator<'a> {
    table: &'a MappingTable,
    metadata: &'a dyn PropertyMetadata,
    config: &'a EngineConfig,
}

/// Findings collected while translating one record.
#[derive(Default)]
struct Findings {
    unresolved: Vec<UnresolvedReference>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Translator<'a> {
    pub fn new(
        table: &'a MappingTable,
        metadata: &'a dyn PropertyMetadata,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            table,
            metadata,
            config,
        }
    }

    pub fn translate(&self, source: &EntityRecord) -> TranslationResult {
        let mut findings = Findings::default();
        let target_id = source
            .id
            .as_ref()
            .and_then(|id| self.table.lookup(id))
            .cloned();

        let mut record = EntityRecord::new(source.kind);
        record.id = target_id.clone();
        record.datatype = source.datatype.clone();

        // Terms.
        record.labels = self.filter_terms(&source.labels);
        for (language, description) in source.descriptions.iter() {
            if !self.config.language_allowed(language) {
                continue;
            }
            if record.labels.get(language) == Some(description) {
                findings.diagnostics.push(Diagnostic::DescriptionEqualsLabel {
                    language: language.to_string(),
                });
                continue;
            }
            record.descriptions.set(language, description);
        }
        for (language, aliases) in source.aliases.iter() {
            if self.config.language_allowed(language) {
                record.aliases.extend(language, aliases.iter().map(String::as_str));
            }
        }

        // Claims.
        for (index, claim) in source.claims.iter().enumerate() {
            if let Some(claim) = self.translate_claim(index, claim, &mut findings) {
                record.claims.push(claim);
            }
        }

        // Sitelinks.
        for (site, sitelink) in &source.sitelinks {
            if !self.config.sitelink_allowed(site) {
                continue;
            }
            let mut translated = Sitelink::new(site.clone(), sitelink.title.clone());
            for badge in &sitelink.badges {
                match self.table.item(badge.id()) {
                    Some(target) => translated.badges.push(target.clone().into()),
                    None => findings.unresolved.push(UnresolvedReference {
                        id: badge.id().clone(),
                        location: Location::SitelinkBadge { site: site.clone() },
                        position: Position::Value,
                        disposition: Disposition::Dropped,
                    }),
                }
            }
            record.sitelinks.insert(site.clone(), translated);
        }

        tracing::debug!(
            source = ?source.id,
            target = ?target_id,
            claims = record.claims.len(),
            unresolved = findings.unresolved.len(),
            "translated entity"
        );

        TranslationResult {
            source_id: source.id.clone(),
            target_id,
            record,
            unresolved: findings.unresolved,
            diagnostics: findings.diagnostics,
        }
    }

    fn filter_terms(&self, terms: &LocalizedText) -> LocalizedText {
        terms
            .iter()
            .filter(|(language, _)| self.config.language_allowed(language))
            .collect()
    }

    fn translate_claim(&self, index: usize, claim: &Claim, findings: &mut Findings) -> Option<Claim> {
        let main_snak = self.remap_snak(&claim.main_snak, Location::MainSnak { claim: index }, findings)?;

        let qualifier_snaks = claim
            .qualifier_snaks()
            .filter_map(|snak| self.remap_snak(snak, Location::Qualifier { claim: index }, findings))
            .collect();

        let mut references = Vec::new();
        for (block_index, block) in claim.references.iter().enumerate() {
            let location = Location::Reference {
                claim: index,
                block: block_index,
            };
            let snaks: Vec<Snak> = block
                .snaks()
                .filter_map(|snak| self.remap_snak(snak, location.clone(), findings))
                .collect();
            let block = ReferenceBlock::from_snaks(snaks);
            if !block.is_empty() {
                references.push(block);
            }
        }

        Some(Claim {
            id: None,
            main_snak,
            // Regrouped: two source properties may map to one target property.
            qualifiers: SnakGroup::group(qualifier_snaks),
            references,
            rank: claim.rank,
        })
    }

    /// The one snak rewrite shared by main snaks, qualifiers and references.
    /// `None` means the snak is dropped.
    fn remap_snak(&self, snak: &Snak, location: Location, findings: &mut Findings) -> Option<Snak> {
        match snak.value {
            SnakValue::NoValue if self.config.ignore_no_values => return None,
            SnakValue::SomeValue if self.config.ignore_unknown_values => return None,
            _ => {}
        }

        let property = self.remap_id(snak.property.id(), &location, Position::Property, findings)?;
        let value = match &snak.value {
            SnakValue::Value(value) => SnakValue::Value(self.remap_value(value, &location, findings)?),
            other => other.clone(),
        };
        let mut out = Snak {
            property,
            datatype: snak.datatype.clone(),
            value,
        };
        self.cast_snak(&mut out, &location, findings);
        Some(out)
    }

    fn remap_value(&self, value: &Value, location: &Location, findings: &mut Findings) -> Option<Value> {
        let remapped = match value {
            Value::Entity { id } => Value::Entity {
                id: self.remap_id(id.id(), location, Position::Value, findings)?,
            },
            Value::Quantity(quantity @ Quantity {
                unit: QuantityUnit::Entity(unit),
                ..
            }) => Value::Quantity(Quantity {
                unit: QuantityUnit::Entity(self.remap_id(unit.id(), location, Position::Value, findings)?),
                ..quantity.clone()
            }),
            other => other.clone(),
        };
        Some(remapped)
    }

    /// Map a source id through the table of its kind. Unmapped ids are
    /// dropped (`None`) or flagged, and reported either way.
    fn remap_id(
        &self,
        id: &EntityId,
        location: &Location,
        position: Position,
        findings: &mut Findings,
    ) -> Option<IdRef> {
        if let Some(target) = self.table.lookup(id) {
            return Some(IdRef::Resolved(target.clone()));
        }
        let drop = self.config.drop_unresolved();
        findings.unresolved.push(UnresolvedReference {
            id: id.clone(),
            location: location.clone(),
            position,
            disposition: if drop {
                Disposition::Dropped
            } else {
                Disposition::Flagged
            },
        });
        if drop {
            None
        } else {
            Some(IdRef::Unresolved(id.clone()))
        }
    }

    fn cast_snak(&self, snak: &mut Snak, location: &Location, findings: &mut Findings) {
        if !self.config.type_casts.enabled {
            return;
        }
        let (IdRef::Resolved(property), SnakValue::Value(value)) = (&snak.property, &snak.value) else {
            return;
        };
        // Without metadata the declared datatype stands, which still
        // normalizes quantities and times.
        let wanted = self
            .metadata
            .datatype(property)
            .unwrap_or_else(|| snak.datatype.clone());
        if wanted == snak.datatype && !cast::has_normal_form(&wanted) {
            return;
        }
        match cast::cast(value, &snak.datatype, &wanted, &self.config.type_casts.fallback_language) {
            Ok(cast_value) => {
                snak.value = SnakValue::Value(cast_value);
                snak.datatype = wanted;
            }
            Err(failure) => {
                tracing::warn!(
                    property = %property,
                    from = %snak.datatype,
                    to = %wanted,
                    error = %failure,
                    "type cast failed, keeping the original value"
                );
                findings.diagnostics.push(Diagnostic::cast_failure(
                    property.clone(),
                    location.clone(),
                    &snak.datatype,
                    &wanted,
                    &failure,
                ));
            }
        }
    }
}

/// Translate one record with a throwaway [`Translator`].
pub fn translate(
    source: &EntityRecord,
    table: &MappingTable,
    metadata: &dyn PropertyMetadata,
    config: &EngineConfig,
) -> TranslationResult {
    Translator::new(table, metadata, config).translate(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRow;
    use crate::metadata::{NoMetadata, PropertyDatatypes};
    use wbmigrate_model::{Datatype, Rank, Time};

    fn q(n: u64) -> EntityId {
        EntityId::item(n)
    }

    fn p(n: u64) -> EntityId {
        EntityId::property(n)
    }

    fn table() -> MappingTable {
        MappingTable::builder()
            .items([MappingRow::new("Q1", "Q101"), MappingRow::new("Q5", "Q105")])
            .unwrap()
            .properties([
                MappingRow::new("P31", "P1"),
                MappingRow::new("P580", "P2"),
                MappingRow::new("P585", "P2"),
            ])
            .unwrap()
            .build()
            .0
    }

    #[test]
    fn qualifier_groups_collapsing_onto_one_property_are_regrouped() {
        let source = EntityRecord::with_id(q(1)).with_claim(
            Claim::new(Snak::item(p(31), q(5)))
                .with_qualifier(Snak::string(p(580), "a"))
                .with_qualifier(Snak::string(p(585), "b")),
        );
        let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
        let claim = &result.record.claims[0];
        assert_eq!(claim.qualifiers.len(), 1);
        assert_eq!(claim.qualifiers[0].property, IdRef::Resolved(p(2)));
        assert_eq!(claim.qualifiers[0].snaks.len(), 2);
    }

    #[test]
    fn statement_ids_are_cleared_and_rank_kept() {
        let mut claim = Claim::new(Snak::item(p(31), q(5))).with_rank(Rank::Deprecated);
        claim.id = Some("Q1$abc".to_string());
        let source = EntityRecord::with_id(q(1)).with_claim(claim);
        let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
        assert_eq!(result.record.claims[0].id, None);
        assert_eq!(result.record.claims[0].rank, Rank::Deprecated);
        assert_eq!(result.record.id, Some(q(101)));
    }

    #[test]
    fn unmapped_quantity_units_are_flagged() {
        let quantity = Quantity {
            amount: "+1".into(),
            upper_bound: None,
            lower_bound: None,
            unit: QuantityUnit::Entity(q(11573).into()),
        };
        let source = EntityRecord::with_id(q(1)).with_claim(Claim::new(Snak::value(
            p(31),
            Datatype::Quantity,
            Value::Quantity(quantity),
        )));
        let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
        assert_eq!(result.missing_items(), vec![&q(11573)]);
        assert!(!result.record.is_writable());
    }

    #[test]
    fn casts_follow_target_datatypes() {
        let mut target_types = PropertyDatatypes::new();
        target_types.insert(p(2), Datatype::Time);
        let config = EngineConfig {
            type_casts: crate::config::TypeCastConfig {
                enabled: true,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        let source = EntityRecord::with_id(q(1))
            .with_claim(Claim::new(Snak::string(p(580), "1990-05")))
            .with_claim(Claim::new(Snak::string(p(585), "sometime")));
        let result = translate(&source, &table(), &target_types, &config);

        let first = &result.record.claims[0].main_snak;
        assert_eq!(first.datatype, Datatype::Time);
        assert!(matches!(first.payload(), Some(Value::Time(t)) if t.precision == 10));

        let second = &result.record.claims[1].main_snak;
        assert_eq!(second.datatype, Datatype::String);
        assert!(matches!(
            result.diagnostics.as_slice(),
            [Diagnostic::CastFailure { .. }]
        ));
    }

    #[test]
    fn casts_are_off_by_default() {
        let mut target_types = PropertyDatatypes::new();
        target_types.insert(p(2), Datatype::Time);
        let source = EntityRecord::with_id(q(1)).with_claim(Claim::new(Snak::string(p(580), "1990")));
        let result = translate(&source, &table(), &target_types, &EngineConfig::default());
        assert_eq!(result.record.claims[0].main_snak.datatype, Datatype::String);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn quantities_and_times_are_normalized_in_place() {
        let config = EngineConfig {
            type_casts: crate::config::TypeCastConfig {
                enabled: true,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        let mut quantity = Quantity::dimensionless("7");
        quantity.unit = QuantityUnit::Iri(String::new());
        let source = EntityRecord::with_id(q(1))
            .with_claim(Claim::new(Snak::value(p(31), Datatype::Quantity, Value::Quantity(quantity))))
            .with_claim(Claim::new(Snak::value(
                p(580),
                Datatype::Time,
                Value::Time(Time::new("+1990-05-17T00:00:00Z", 9)),
            )));

        let mut target_types = PropertyDatatypes::new();
        target_types.insert(p(1), Datatype::Quantity);
        // P2 has no metadata: the declared datatype is kept and normalized.
        let result = translate(&source, &table(), &target_types, &config);
        assert!(result.diagnostics.is_empty());

        match result.record.claims[0].main_snak.payload() {
            Some(Value::Quantity(q)) => {
                assert_eq!(q.amount, "+7");
                assert_eq!(q.unit, QuantityUnit::Dimensionless);
            }
            other => panic!("expected a quantity, got {other:?}"),
        }
        assert_eq!(
            result.record.claims[1].main_snak.payload(),
            Some(&Value::Time(Time::new("+1990-00-00T00:00:00Z", 9)))
        );

        let untouched = translate(&source, &table(), &target_types, &EngineConfig::default());
        assert!(matches!(
            untouched.record.claims[0].main_snak.payload(),
            Some(Value::Quantity(q)) if q.amount == "7"
        ));
    }
}
