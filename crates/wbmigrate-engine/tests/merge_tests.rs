//! Merge scenarios on translated records.

use wbmigrate_engine::{
    translate, ChangeEntry, EngineConfig, MappingRow, MappingTable, MergeResult, Merger,
    NoMetadata, TranslationResult,
};
use wbmigrate_model::{Claim, EntityId, EntityRecord, IdRef, ReferenceBlock, Snak};

fn q(n: u64) -> EntityId {
    EntityId::item(n)
}

fn p(n: u64) -> EntityId {
    EntityId::property(n)
}

/// Identity-like table: source and target share ids so scenarios read
/// directly in target terms.
fn identity_table() -> MappingTable {
    MappingTable::builder()
        .items([MappingRow::new("Q9", "Q9"), MappingRow::new("Q20", "Q20")])
        .unwrap()
        .properties([
            MappingRow::new("P10", "P10"),
            MappingRow::new("P1", "P1"),
            MappingRow::new("P248", "P248"),
        ])
        .unwrap()
        .build()
        .0
}

fn translated(source: &EntityRecord) -> TranslationResult {
    translate(source, &identity_table(), &NoMetadata, &EngineConfig::default())
}

fn merged(source: &EntityRecord, target: &EntityRecord) -> MergeResult {
    Merger::default()
        .merge(&translated(source), Some(target))
        .unwrap()
}

fn claims_on(record: &EntityRecord, property: EntityId) -> Vec<&Claim> {
    let property = IdRef::from(property);
    record.claims.iter().filter(|c| c.property() == &property).collect()
}

#[test]
fn qualifiers_fold_into_an_unqualified_claim() {
    let target = EntityRecord::with_id(q(9)).with_claim(Claim::new(Snak::item(p(10), q(20))));
    let source = EntityRecord::with_id(q(9))
        .with_claim(Claim::new(Snak::item(p(10), q(20))).with_qualifier(Snak::string(p(1), "A")));

    let result = merged(&source, &target);
    let claims = claims_on(&result.record, p(10));
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].qualifier_snaks().collect::<Vec<_>>(), vec![&Snak::string(p(1), "A")]);
    assert!(matches!(result.changes.as_slice(), [ChangeEntry::MergedQualifiers(_)]));
}

#[test]
fn differently_qualified_claims_stay_apart() {
    let original = Claim::new(Snak::item(p(10), q(20))).with_qualifier(Snak::string(p(1), "A"));
    let target = EntityRecord::with_id(q(9)).with_claim(original.clone());
    let source = EntityRecord::with_id(q(9))
        .with_claim(Claim::new(Snak::item(p(10), q(20))).with_qualifier(Snak::string(p(1), "B")));

    let result = merged(&source, &target);
    let claims = claims_on(&result.record, p(10));
    assert_eq!(claims.len(), 2);
    assert_eq!(claims[0], &original);
    assert_eq!(claims[1].qualifier_snaks().collect::<Vec<_>>(), vec![&Snak::string(p(1), "B")]);
    assert!(matches!(result.changes.as_slice(), [ChangeEntry::NewClaim(_)]));
}

#[test]
fn remerging_is_a_no_op() {
    let target = EntityRecord::with_id(q(9))
        .with_label("en", "nine")
        .with_claim(Claim::new(Snak::item(p(10), q(20))));
    let source = EntityRecord::with_id(q(9))
        .with_label("de", "neun")
        .with_claim(
            Claim::new(Snak::item(p(10), q(20)))
                .with_qualifier(Snak::string(p(1), "A"))
                .with_reference(ReferenceBlock::from_snaks(vec![Snak::item(p(248), q(9))])),
        )
        .with_claim(Claim::new(Snak::item(p(1), q(20))));

    let first = merged(&source, &target);
    assert!(!first.is_unchanged());
    let second = merged(&source, &first.record);
    assert!(second.is_unchanged(), "unexpected changes: {:?}", second.changes);
    assert_eq!(second.record, first.record);
}

#[test]
fn claim_order_is_preserved_and_new_claims_go_last() {
    let target = EntityRecord::with_id(q(9))
        .with_claim(Claim::new(Snak::string(p(1), "b")))
        .with_claim(Claim::new(Snak::string(p(1), "a")));
    let source = EntityRecord::with_id(q(9))
        .with_claim(Claim::new(Snak::string(p(1), "c")))
        .with_claim(Claim::new(Snak::string(p(1), "a")));

    let result = merged(&source, &target);
    let values: Vec<_> = result
        .record
        .claims
        .iter()
        .map(|c| c.main_snak.payload().cloned())
        .collect();
    assert_eq!(
        values,
        vec![
            Some(wbmigrate_model::Value::string("b")),
            Some(wbmigrate_model::Value::string("a")),
            Some(wbmigrate_model::Value::string("c")),
        ]
    );
}

#[test]
fn aliases_are_unioned_target_first() {
    let mut target = EntityRecord::with_id(q(9));
    target.aliases.extend("en", ["nine", "IX"]);
    let mut source = EntityRecord::with_id(q(9));
    source.aliases.extend("en", ["9", "nine"]);

    let result = merged(&source, &target);
    assert_eq!(result.record.aliases.get("en"), ["nine", "IX", "9"]);
    assert_eq!(
        result.changes,
        vec![ChangeEntry::AddedAliases {
            language: "en".into(),
            count: 1
        }]
    );
}

#[test]
fn merged_record_keeps_the_target_id() {
    let target = EntityRecord::with_id(q(9));
    let source = EntityRecord::with_id(q(9)).with_label("en", "nine");
    assert_eq!(merged(&source, &target).record.id, Some(q(9)));
}
