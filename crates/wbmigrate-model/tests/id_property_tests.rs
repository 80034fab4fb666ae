use proptest::prelude::*;
use wbmigrate_model::{EntityCodec, EntityId, EntityKind, EntityRecord, LocalizedText};

fn kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![Just(EntityKind::Item), Just(EntityKind::Property)]
}

fn language() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z]{2,3}(-[a-z]{2})?").unwrap()
}

proptest! {
    #[test]
    fn bare_ids_iris_and_lowercase_agree(kind in kind(), number in 1u64..1_000_000_000) {
        let expected = EntityId::new(kind, number);
        let bare = format!("{}{number}", kind.prefix());
        let lower = format!("  {}{number} ", kind.prefix().to_ascii_lowercase());
        let iri = format!("http://www.wikidata.org/entity/{bare}");

        prop_assert_eq!(EntityId::parse(&bare).unwrap(), expected.clone());
        prop_assert_eq!(EntityId::parse(&lower).unwrap(), expected.clone());
        prop_assert_eq!(EntityId::parse(&iri).unwrap(), expected.clone());
        prop_assert_eq!(expected.to_string(), bare);
        prop_assert_eq!(expected.numeric_id(), number);
    }

    #[test]
    fn other_prefixes_are_rejected(prefix in "[A-OR-Za-or-z]", number in 1u64..1000) {
        let id_str = format!("{prefix}{number}");
        prop_assert!(EntityId::parse(&id_str).is_err());
    }

    #[test]
    fn terms_survive_the_codec(
        labels in proptest::collection::btree_map(language(), "[^\\p{C}]{1,20}", 0..5),
        number in 1u64..10_000,
    ) {
        let mut record = EntityRecord::with_id(EntityId::item(number));
        record.labels = labels.clone().into_iter().collect::<LocalizedText>();

        let codec = EntityCodec::default();
        let encoded = codec.encode_entities(std::slice::from_ref(&record)).unwrap();
        let decoded = codec.decode_entities(&encoded).unwrap();
        prop_assert_eq!(decoded.len(), 1);
        prop_assert_eq!(&decoded[0].labels, &record.labels);
        prop_assert_eq!(decoded[0].id.clone(), Some(EntityId::item(number)));
    }
}
