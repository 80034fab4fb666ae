//! Batch pipeline: translate → merge → inject for every entity of a batch.
//!
//! Entities are independent, so the batch runs on the rayon pool with the
//! mapping table, metadata and configuration shared by reference. Each
//! entity ends in its own [`EntityOutcome`]; one failing entity never stops
//! the others. A cancel flag is checked before each entity starts.

use crate::backref::{self, BackReferenceError};
use crate::config::{ConfigError, EngineConfig};
use crate::diagnostics::Diagnostic;
use crate::mapping::MappingTable;
use crate::merge::{MergeError, MergeResult, Merger};
use crate::metadata::PropertyMetadata;
use crate::translate::{TranslationResult, Translator};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use wbmigrate_model::{EntityId, EntityRecord};

/// Read access to the records of one wiki.
pub trait RecordLookup: Sync {
    fn record(&self, id: &EntityId) -> Option<&EntityRecord>;
}

impl RecordLookup for HashMap<EntityId, EntityRecord> {
    fn record(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.get(id)
    }
}

impl RecordLookup for BTreeMap<EntityId, EntityRecord> {
    fn record(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.get(id)
    }
}

/// Index records by id, skipping records without one.
pub fn index_records(records: impl IntoIterator<Item = EntityRecord>) -> HashMap<EntityId, EntityRecord> {
    records
        .into_iter()
        .filter_map(|r| r.id.clone().map(|id| (id, r)))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("source entity {0} not found")]
    MissingSource(EntityId),
    #[error("{source_id} maps to {target} but the target entity was not found")]
    MissingTarget {
        source_id: EntityId,
        target: EntityId,
    },
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    BackReference(#[from] BackReferenceError),
}

#[derive(Debug)]
pub enum EntityOutcome {
    Migrated {
        translation: TranslationResult,
        merge: MergeResult,
    },
    /// The target exists and merging into existing entities is off.
    Skipped { target: EntityId },
    Failed(EntityError),
}

#[derive(Debug)]
pub struct EntityReport {
    pub source_id: EntityId,
    pub outcome: EntityOutcome,
}

impl EntityReport {
    pub fn target_id(&self) -> Option<&EntityId> {
        match &self.outcome {
            EntityOutcome::Migrated { translation, .. } => translation.target_id.as_ref(),
            EntityOutcome::Skipped { target } => Some(target),
            EntityOutcome::Failed(EntityError::MissingTarget { target, .. }) => Some(target),
            EntityOutcome::Failed(_) => None,
        }
    }

    /// The record to hand to a writer, if any.
    pub fn record(&self) -> Option<&EntityRecord> {
        match &self.outcome {
            EntityOutcome::Migrated { merge, .. } => Some(&merge.record),
            _ => None,
        }
    }

    /// Translation findings followed by merge and injection findings.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match &self.outcome {
            EntityOutcome::Migrated { translation, merge } => translation
                .all_diagnostics()
                .chain(merge.diagnostics.iter().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Migrated without a single warning.
    pub fn is_clean(&self) -> bool {
        matches!(self.outcome, EntityOutcome::Migrated { .. })
            && !self.diagnostics().iter().any(Diagnostic::is_warning)
    }
}

pub struct Batch<'a> {
    table: &'a MappingTable,
    metadata: &'a dyn PropertyMetadata,
    config: &'a EngineConfig,
}

impl<'a> Batch<'a> {
    pub fn new(
        table: &'a MappingTable,
        metadata: &'a dyn PropertyMetadata,
        config: &'a EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            table,
            metadata,
            config,
        })
    }

    /// Run every entity. Results keep the order of `ids`; entities that had
    /// not started when `cancel` was set are left out.
    pub fn run(
        &self,
        ids: &[EntityId],
        source: &dyn RecordLookup,
        target: &dyn RecordLookup,
        cancel: &AtomicBool,
    ) -> Vec<EntityReport> {
        let reports: Vec<EntityReport> = ids
            .par_iter()
            .filter_map(|id| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(self.migrate(id, source, target))
            })
            .collect();
        if reports.len() < ids.len() {
            tracing::warn!(
                finished = reports.len(),
                requested = ids.len(),
                "batch cancelled"
            );
        }
        reports
    }

    pub fn migrate(
        &self,
        id: &EntityId,
        source: &dyn RecordLookup,
        target: &dyn RecordLookup,
    ) -> EntityReport {
        let outcome = match self.migrate_inner(id, source, target) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(source = %id, error = %err, "entity migration failed");
                EntityOutcome::Failed(err)
            }
        };
        EntityReport {
            source_id: id.clone(),
            outcome,
        }
    }

    fn migrate_inner(
        &self,
        id: &EntityId,
        source: &dyn RecordLookup,
        target: &dyn RecordLookup,
    ) -> Result<EntityOutcome, EntityError> {
        let record = source
            .record(id)
            .ok_or_else(|| EntityError::MissingSource(id.clone()))?;
        let translation = Translator::new(self.table, self.metadata, self.config).translate(record);

        let existing = match &translation.target_id {
            Some(target_id) if !self.config.merge_existing => {
                tracing::debug!(source = %id, target = %target_id, "target exists, skipping");
                return Ok(EntityOutcome::Skipped {
                    target: target_id.clone(),
                });
            }
            Some(target_id) => Some(target.record(target_id).ok_or_else(|| {
                EntityError::MissingTarget {
                    source_id: id.clone(),
                    target: target_id.clone(),
                }
            })?),
            None => None,
        };

        let mut merge = Merger::new(self.config.ambiguity).merge(&translation, existing)?;
        backref::inject(&mut merge, &self.config.back_reference, id)?;
        tracing::debug!(
            source = %id,
            changes = merge.changes.len(),
            unresolved = translation.unresolved.len(),
            "entity migrated"
        );
        Ok(EntityOutcome::Migrated { translation, merge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRow;
    use crate::metadata::NoMetadata;
    use wbmigrate_model::{Claim, Snak};

    fn q(n: u64) -> EntityId {
        EntityId::item(n)
    }

    fn fixture() -> (MappingTable, HashMap<EntityId, EntityRecord>, HashMap<EntityId, EntityRecord>) {
        let (table, _) = MappingTable::builder()
            .items([MappingRow::new("Q1", "Q101"), MappingRow::new("Q3", "Q103")])
            .unwrap()
            .properties([MappingRow::new("P31", "P1")])
            .unwrap()
            .build();
        let source = index_records([
            EntityRecord::with_id(q(1))
                .with_label("en", "one")
                .with_claim(Claim::new(Snak::item(EntityId::property(31), q(1)))),
            EntityRecord::with_id(q(2)).with_label("en", "two"),
            EntityRecord::with_id(q(3)).with_label("en", "three"),
        ]);
        let target = index_records([EntityRecord::with_id(q(101)).with_label("de", "eins")]);
        (table, source, target)
    }

    #[test]
    fn each_entity_gets_its_own_outcome() {
        let (table, source, target) = fixture();
        let config = EngineConfig::default();
        let batch = Batch::new(&table, &NoMetadata, &config).unwrap();
        let ids = [q(1), q(2), q(3), q(4)];
        let reports = batch.run(&ids, &source, &target, &AtomicBool::new(false));

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].source_id, q(1));
        assert!(matches!(reports[0].outcome, EntityOutcome::Migrated { .. }));
        let merged = reports[0].record().unwrap();
        assert_eq!(merged.id, Some(q(101)));
        assert_eq!(merged.labels.get("de"), Some("eins"));
        assert_eq!(merged.labels.get("en"), Some("one"));

        // Q2 is unmapped: created.
        assert_eq!(reports[1].record().unwrap().id, None);
        // Q3 maps to a target that is not in the dump.
        assert!(matches!(
            reports[2].outcome,
            EntityOutcome::Failed(EntityError::MissingTarget { .. })
        ));
        assert!(matches!(
            reports[3].outcome,
            EntityOutcome::Failed(EntityError::MissingSource(_))
        ));
    }

    #[test]
    fn existing_targets_are_skipped_when_merging_is_off() {
        let (table, source, target) = fixture();
        let config = EngineConfig {
            merge_existing: false,
            ..EngineConfig::default()
        };
        let batch = Batch::new(&table, &NoMetadata, &config).unwrap();
        let report = batch.migrate(&q(1), &source, &target);
        assert!(matches!(report.outcome, EntityOutcome::Skipped { .. }));
        assert_eq!(report.target_id(), Some(&q(101)));
    }

    #[test]
    fn cancelled_batches_start_nothing() {
        let (table, source, target) = fixture();
        let config = EngineConfig::default();
        let batch = Batch::new(&table, &NoMetadata, &config).unwrap();
        let reports = batch.run(&[q(1), q(2)], &source, &target, &AtomicBool::new(true));
        assert!(reports.is_empty());
    }

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let (table, _, _) = fixture();
        let mut config = EngineConfig::default();
        config.type_casts.fallback_language.clear();
        assert!(Batch::new(&table, &NoMetadata, &config).is_err());
    }
}
