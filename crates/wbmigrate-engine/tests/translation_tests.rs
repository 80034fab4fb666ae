use std::collections::BTreeSet;
use wbmigrate_engine::{
    translate, Diagnostic, Disposition, EngineConfig, Location, MappingRow, MappingTable,
    NoMetadata, Position,
};
use wbmigrate_model::{
    Claim, Datatype, EntityId, EntityRecord, IdRef, ReferenceBlock, Sitelink, Snak, SnakValue,
};

fn q(n: u64) -> EntityId {
    EntityId::item(n)
}

fn p(n: u64) -> EntityId {
    EntityId::property(n)
}

fn table() -> MappingTable {
    MappingTable::builder()
        .items([
            MappingRow::new("Q42", "Q1042"),
            MappingRow::new("Q5", "Q2"),
            MappingRow::new("Q17437796", "Q77"),
        ])
        .unwrap()
        .properties([
            MappingRow::new("P31", "P1"),
            MappingRow::new("P580", "P5"),
            MappingRow::new("P248", "P8"),
        ])
        .unwrap()
        .build()
        .0
}

fn languages(list: &[&str]) -> Option<BTreeSet<String>> {
    Some(list.iter().map(|l| l.to_string()).collect())
}

#[test]
fn unmapped_entity_is_returned_for_creation() {
    let source = EntityRecord::with_id(q(1)).with_label("en", "new thing");
    let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
    assert_eq!(result.target_id, None);
    assert_eq!(result.record.id, None);
    assert_eq!(result.record.labels.get("en"), Some("new thing"));
}

#[test]
fn terms_are_filtered_by_language() {
    let mut source = EntityRecord::with_id(q(42))
        .with_label("en", "Douglas Adams")
        .with_label("de", "Douglas Adams")
        .with_label("fr", "Douglas Adams")
        .with_description("en", "English writer");
    source.aliases.extend("en", ["DNA"]);
    source.aliases.extend("fr", ["D. Adams"]);

    let config = EngineConfig {
        languages: languages(&["en", "de"]),
        ..EngineConfig::default()
    };
    let result = translate(&source, &table(), &NoMetadata, &config);
    assert_eq!(result.target_id, Some(q(1042)));
    assert_eq!(result.record.labels.len(), 2);
    assert!(!result.record.labels.contains("fr"));
    assert_eq!(result.record.descriptions.get("en"), Some("English writer"));
    assert_eq!(result.record.aliases.get("en"), ["DNA"]);
    assert!(result.record.aliases.get("fr").is_empty());
}

#[test]
fn description_equal_to_label_is_skipped() {
    let source = EntityRecord::with_id(q(42))
        .with_label("en", "Douglas Adams")
        .with_description("en", "Douglas Adams");
    let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
    assert!(result.record.descriptions.is_empty());
    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::DescriptionEqualsLabel {
            language: "en".into()
        }]
    );
    assert!(!result.has_warnings());
}

#[test]
fn unmapped_ids_are_flagged_by_default() {
    let source = EntityRecord::with_id(q(42))
        .with_claim(Claim::new(Snak::item(p(31), q(999))))
        .with_claim(Claim::new(Snak::item(p(999), q(5))));
    let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());

    assert_eq!(result.record.claims.len(), 2);
    let first = &result.record.claims[0].main_snak;
    assert_eq!(first.property, IdRef::Resolved(p(1)));
    assert_eq!(first.payload().unwrap().id_refs(), vec![&IdRef::Unresolved(q(999))]);
    let second = &result.record.claims[1].main_snak;
    assert_eq!(second.property, IdRef::Unresolved(p(999)));

    assert_eq!(result.missing_items(), vec![&q(999)]);
    assert_eq!(result.missing_properties(), vec![&p(999)]);
    assert!(result
        .unresolved
        .iter()
        .all(|u| u.disposition == Disposition::Flagged));
    assert_eq!(result.unresolved[1].position, Position::Property);
    assert!(!result.record.is_writable());
}

#[test]
fn dropping_a_qualifier_keeps_the_claim() {
    let source = EntityRecord::with_id(q(42)).with_claim(
        Claim::new(Snak::item(p(31), q(5)))
            .with_qualifier(Snak::item(p(580), q(999)))
            .with_qualifier(Snak::string(p(580), "kept"))
            .with_reference(ReferenceBlock::from_snaks(vec![Snak::item(p(248), q(998))])),
    );
    let config = EngineConfig {
        drop_unresolved: Some(true),
        ..EngineConfig::default()
    };
    let result = translate(&source, &table(), &NoMetadata, &config);

    let claim = &result.record.claims[0];
    assert_eq!(claim.qualifiers.len(), 1);
    assert_eq!(claim.qualifiers[0].snaks, vec![Snak::string(p(5), "kept")]);
    // The only reference snak was dropped, so is the block.
    assert!(claim.references.is_empty());
    assert!(result.record.is_writable());
    assert_eq!(result.unresolved.len(), 2);
    assert_eq!(result.unresolved[0].location, Location::Qualifier { claim: 0 });
    assert_eq!(
        result.unresolved[1].location,
        Location::Reference { claim: 0, block: 0 }
    );
}

#[test]
fn dropping_a_main_snak_drops_the_claim() {
    let source = EntityRecord::with_id(q(42))
        .with_claim(Claim::new(Snak::item(p(31), q(999))))
        .with_claim(Claim::new(Snak::item(p(31), q(5))));
    let config = EngineConfig {
        ignore_unknown_values: true,
        ..EngineConfig::default()
    };
    let result = translate(&source, &table(), &NoMetadata, &config);
    assert_eq!(result.record.claims.len(), 1);
    assert_eq!(result.unresolved[0].disposition, Disposition::Dropped);
}

#[test]
fn special_values_follow_the_ignore_flags() {
    let source = EntityRecord::with_id(q(42))
        .with_claim(Claim::new(Snak::no_value(p(31), Datatype::WikibaseItem)))
        .with_claim(Claim::new(Snak::some_value(p(580), Datatype::Time)));

    let kept = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
    assert_eq!(kept.record.claims.len(), 2);
    assert_eq!(kept.record.claims[0].main_snak.property, IdRef::Resolved(p(1)));
    assert_eq!(kept.record.claims[1].main_snak.value, SnakValue::SomeValue);

    let config = EngineConfig {
        ignore_no_values: true,
        ..EngineConfig::default()
    };
    let filtered = translate(&source, &table(), &NoMetadata, &config);
    assert_eq!(filtered.record.claims.len(), 1);
    assert_eq!(filtered.record.claims[0].main_snak.value, SnakValue::SomeValue);
}

#[test]
fn sitelinks_are_filtered_and_badges_remapped() {
    let mut source = EntityRecord::with_id(q(42));
    let mut enwiki = Sitelink::new("enwiki", "Douglas Adams");
    enwiki.badges = vec![q(17437796).into(), q(123).into()];
    source.sitelinks.insert("enwiki".into(), enwiki);
    source
        .sitelinks
        .insert("frwiki".into(), Sitelink::new("frwiki", "Douglas Adams"));

    let config = EngineConfig {
        sitelinks: languages(&["enwiki"]),
        ..EngineConfig::default()
    };
    let result = translate(&source, &table(), &NoMetadata, &config);
    assert_eq!(result.record.sitelinks.len(), 1);
    assert_eq!(result.record.sitelinks["enwiki"].badges, vec![IdRef::Resolved(q(77))]);
    assert_eq!(
        result.unresolved[0].location,
        Location::SitelinkBadge {
            site: "enwiki".into()
        }
    );
    assert_eq!(result.unresolved[0].disposition, Disposition::Dropped);
}

#[test]
fn property_entities_keep_their_datatype() {
    let mut source = EntityRecord::with_id(p(31)).with_label("en", "instance of");
    source.datatype = Some(Datatype::WikibaseItem);
    let result = translate(&source, &table(), &NoMetadata, &EngineConfig::default());
    assert_eq!(result.target_id, Some(p(1)));
    assert_eq!(result.record.datatype, Some(Datatype::WikibaseItem));
}
