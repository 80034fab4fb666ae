//! Back-references from migrated entities to their source.
//!
//! After merging, each entity can be given a pointer back to the entity it
//! was migrated from: either an external-id claim holding the source id, or a
//! sitelink to the source wiki's page. Both are added only when missing, so
//! re-running a migration never duplicates them.

use crate::diagnostics::Diagnostic;
use crate::merge::{ChangeEntry, ClaimRef, MergeResult};
use serde::{Deserialize, Serialize};
use wbmigrate_model::{Claim, Datatype, EntityId, EntityKind, IdRef, Sitelink, Snak, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackReference {
    /// A claim on this (external-id) property whose value is the source id.
    Property { id: EntityId },
    /// A sitelink under `site` titled `title_prefix` + source id.
    Sitelink {
        site: String,
        #[serde(default)]
        title_prefix: String,
    },
}

/// Back-reference per entity kind; `None` disables it for that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackReferenceConfig {
    pub item: Option<BackReference>,
    pub property: Option<BackReference>,
}

impl BackReferenceConfig {
    pub fn for_kind(&self, kind: EntityKind) -> Option<&BackReference> {
        match kind {
            EntityKind::Item => self.item.as_ref(),
            EntityKind::Property => self.property.as_ref(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BackReferenceError {
    #[error("properties have no sitelinks (back reference to site `{0}`)")]
    SitelinkOnProperty(String),
}

/// Add the configured back-reference for `source_id` to a merge result,
/// recording what was added in its change log.
pub fn inject(
    result: &mut MergeResult,
    config: &BackReferenceConfig,
    source_id: &EntityId,
) -> Result<(), BackReferenceError> {
    let record = &mut result.record;
    let Some(reference) = config.for_kind(record.kind) else {
        return Ok(());
    };

    match reference {
        BackReference::Property { id } => {
            let property = IdRef::Resolved(id.clone());
            let value = Value::string(source_id.as_str());
            let present = record
                .claims_for(&property)
                .any(|c| c.main_snak.payload() == Some(&value));
            if !present {
                record.claims.push(Claim::new(Snak::value(id.clone(), Datatype::ExternalId, value)));
                let index = record.claims.len() - 1;
                result.changes.push(ChangeEntry::NewClaim(ClaimRef {
                    index,
                    property,
                    id: None,
                }));
            }
        }
        BackReference::Sitelink { site, title_prefix } => {
            if record.kind == EntityKind::Property {
                return Err(BackReferenceError::SitelinkOnProperty(site.clone()));
            }
            let wanted = format!("{title_prefix}{source_id}");
            match record.sitelinks.get(site) {
                Some(existing) if existing.title != wanted => {
                    tracing::warn!(
                        site = %site,
                        existing = %existing.title,
                        wanted = %wanted,
                        "site already links elsewhere, back reference not added"
                    );
                    result.diagnostics.push(Diagnostic::SitelinkConflict {
                        site: site.clone(),
                        existing: existing.title.clone(),
                        wanted,
                    });
                }
                Some(_) => {}
                None => {
                    record
                        .sitelinks
                        .insert(site.clone(), Sitelink::new(site.clone(), wanted));
                    result
                        .changes
                        .push(ChangeEntry::AddedSitelink { site: site.clone() });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbmigrate_model::EntityRecord;

    fn created(record: EntityRecord) -> MergeResult {
        MergeResult {
            record,
            changes: vec![ChangeEntry::EntityCreated],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn property_back_reference_is_idempotent() {
        let config = BackReferenceConfig {
            item: Some(BackReference::Property {
                id: EntityId::property(1),
            }),
            property: None,
        };
        let mut result = created(EntityRecord::new(EntityKind::Item));
        inject(&mut result, &config, &EntityId::item(42)).unwrap();
        inject(&mut result, &config, &EntityId::item(42)).unwrap();

        assert_eq!(result.record.claims.len(), 1);
        let snak = &result.record.claims[0].main_snak;
        assert_eq!(snak.datatype, Datatype::ExternalId);
        assert_eq!(snak.payload(), Some(&Value::string("Q42")));
        assert_eq!(result.changes.len(), 2);
    }

    #[test]
    fn disabled_for_kinds_without_configuration() {
        let config = BackReferenceConfig {
            item: Some(BackReference::Property {
                id: EntityId::property(1),
            }),
            property: None,
        };
        let mut result = created(EntityRecord::new(EntityKind::Property));
        inject(&mut result, &config, &EntityId::property(7)).unwrap();
        assert!(result.record.claims.is_empty());
    }

    #[test]
    fn sitelink_back_reference_respects_existing_titles() {
        let config = BackReferenceConfig {
            item: Some(BackReference::Sitelink {
                site: "sourcewiki".into(),
                title_prefix: "Item:".into(),
            }),
            property: None,
        };
        let mut result = created(EntityRecord::new(EntityKind::Item));
        inject(&mut result, &config, &EntityId::item(42)).unwrap();
        assert_eq!(result.record.sitelinks["sourcewiki"].title, "Item:Q42");

        let mut other = created(EntityRecord::new(EntityKind::Item));
        other
            .record
            .sitelinks
            .insert("sourcewiki".into(), Sitelink::new("sourcewiki", "Item:Q1"));
        inject(&mut other, &config, &EntityId::item(42)).unwrap();
        assert_eq!(other.record.sitelinks["sourcewiki"].title, "Item:Q1");
        assert!(matches!(
            other.diagnostics.as_slice(),
            [Diagnostic::SitelinkConflict { .. }]
        ));
    }

    #[test]
    fn sitelinks_on_properties_are_rejected() {
        let config = BackReferenceConfig {
            item: None,
            property: Some(BackReference::Sitelink {
                site: "sourcewiki".into(),
                title_prefix: String::new(),
            }),
        };
        let mut result = created(EntityRecord::new(EntityKind::Property));
        assert_eq!(
            inject(&mut result, &config, &EntityId::property(7)),
            Err(BackReferenceError::SitelinkOnProperty("sourcewiki".into()))
        );
    }
}
