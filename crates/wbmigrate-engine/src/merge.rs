//! Merge engine.
//!
//! Combines a translated record with the target's existing record without
//! removing or rewriting anything the target already has:
//!
//! - terms and sitelinks are only added for languages/sites the target lacks;
//! - aliases are unioned, target order first;
//! - claims are matched on (property, main value). A source claim already
//!   present in a target claim with the same qualifiers (or with none of its
//!   own) only contributes missing references; otherwise it is folded into the
//!   first *qualifier-less* matching claim, or appended.
//!
//! Appending never reorders: new claims, groups, snaks and reference blocks
//! always go at the end of their list.

use crate::diagnostics::Diagnostic;
use crate::translate::TranslationResult;
use serde::{Deserialize, Serialize};
use wbmigrate_model::{Claim, EntityKind, EntityRecord, IdRef, Snak};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("{candidates} qualifier-less claims on {property} match the same value")]
    Ambiguous { property: IdRef, candidates: usize },
    #[error("cannot merge a {incoming} into a {existing}")]
    KindMismatch {
        incoming: EntityKind,
        existing: EntityKind,
    },
}

/// What to do when several target claims qualify as merge candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Use the first candidate and report the ambiguity.
    #[default]
    FirstWins,
    /// Fail the entity.
    Strict,
}

/// A claim of the merged record: its position and, for claims that came
/// from the target, its statement id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRef {
    pub index: usize,
    pub property: IdRef,
    pub id: Option<String>,
}

impl ClaimRef {
    fn of(claims: &[Claim], index: usize) -> Self {
        Self {
            index,
            property: claims[index].property().clone(),
            id: claims[index].id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ChangeEntry {
    EntityCreated,
    NewClaim(ClaimRef),
    MergedQualifiers(ClaimRef),
    AppendedReferenceBlock(ClaimRef),
    AddedLabel { language: String },
    AddedDescription { language: String },
    AddedAliases { language: String, count: usize },
    AddedSitelink { site: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub record: EntityRecord,
    pub changes: Vec<ChangeEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeResult {
    /// True when the target already held everything.
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, matches: impl Fn(&ChangeEntry) -> bool) -> usize {
        self.changes.iter().filter(|c| matches(c)).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Merger {
    policy: AmbiguityPolicy,
}

impl Merger {
    pub fn new(policy: AmbiguityPolicy) -> Self {
        Self { policy }
    }

    pub fn merge(
        &self,
        translation: &TranslationResult,
        existing: Option<&EntityRecord>,
    ) -> Result<MergeResult, MergeError> {
        let incoming = &translation.record;
        let Some(existing) = existing else {
            return Ok(MergeResult {
                record: incoming.clone(),
                changes: vec![ChangeEntry::EntityCreated],
                diagnostics: Vec::new(),
            });
        };
        if incoming.kind != existing.kind {
            return Err(MergeError::KindMismatch {
                incoming: incoming.kind,
                existing: existing.kind,
            });
        }

        let mut record = existing.clone();
        let mut changes = Vec::new();
        let mut diagnostics = Vec::new();

        for (language, value) in incoming.labels.iter() {
            if record.labels.set_if_absent(language, value) {
                changes.push(ChangeEntry::AddedLabel {
                    language: language.to_string(),
                });
            }
        }
        for (language, value) in incoming.descriptions.iter() {
            if record.descriptions.set_if_absent(language, value) {
                changes.push(ChangeEntry::AddedDescription {
                    language: language.to_string(),
                });
            }
        }
        for (language, aliases) in incoming.aliases.iter() {
            let count = record
                .aliases
                .extend(language, aliases.iter().map(String::as_str));
            if count > 0 {
                changes.push(ChangeEntry::AddedAliases {
                    language: language.to_string(),
                    count,
                });
            }
        }
        for (site, sitelink) in &incoming.sitelinks {
            if !record.sitelinks.contains_key(site) {
                record.sitelinks.insert(site.clone(), sitelink.clone());
                changes.push(ChangeEntry::AddedSitelink { site: site.clone() });
            }
        }

        for claim in &incoming.claims {
            self.merge_claim(&mut record.claims, claim, &mut changes, &mut diagnostics)?;
        }

        tracing::debug!(
            target = ?record.id,
            changes = changes.len(),
            "merged entity"
        );
        Ok(MergeResult {
            record,
            changes,
            diagnostics,
        })
    }

    fn merge_claim(
        &self,
        claims: &mut Vec<Claim>,
        incoming: &Claim,
        changes: &mut Vec<ChangeEntry>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), MergeError> {
        let same_value = |c: &Claim| c.main_snak.same_assertion(&incoming.main_snak);

        // Already stated with the same qualifiers: only references can be
        // missing. A claim that also holds every reference wins.
        let stated = |c: &Claim| same_value(c) && same_qualifiers(c, incoming);
        let complete = claims
            .iter()
            .position(|c| stated(c) && incoming.references.iter().all(|r| c.references.contains(r)));
        if let Some(index) = complete.or_else(|| claims.iter().position(|c| stated(c))) {
            append_references(claims, index, incoming, changes);
            return Ok(());
        }

        let candidates: Vec<usize> = claims
            .iter()
            .enumerate()
            .filter(|(_, c)| same_value(c) && c.qualifiers.is_empty())
            .map(|(i, _)| i)
            .collect();

        let Some(index) = self.choose(incoming, &candidates, diagnostics)? else {
            claims.push(incoming.clone());
            changes.push(ChangeEntry::NewClaim(ClaimRef::of(claims, claims.len() - 1)));
            return Ok(());
        };

        let target = &mut claims[index];
        for group in &incoming.qualifiers {
            match target.qualifiers.iter_mut().find(|g| g.property == group.property) {
                Some(existing) => {
                    for snak in &group.snaks {
                        if !existing.contains(snak) {
                            existing.snaks.push(snak.clone());
                        }
                    }
                }
                None => target.qualifiers.push(group.clone()),
            }
        }
        changes.push(ChangeEntry::MergedQualifiers(ClaimRef::of(claims, index)));
        append_references(claims, index, incoming, changes);
        Ok(())
    }

    /// The single place where several candidates are resolved.
    fn choose(
        &self,
        incoming: &Claim,
        candidates: &[usize],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<usize>, MergeError> {
        match candidates {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            [first, ..] => match self.policy {
                AmbiguityPolicy::Strict => Err(MergeError::Ambiguous {
                    property: incoming.property().clone(),
                    candidates: candidates.len(),
                }),
                AmbiguityPolicy::FirstWins => {
                    tracing::warn!(
                        property = %incoming.property(),
                        candidates = candidates.len(),
                        "ambiguous merge target, using the first matching claim"
                    );
                    diagnostics.push(Diagnostic::MergeAmbiguity {
                        property: incoming.property().id().clone(),
                        candidates: candidates.len(),
                        chosen: *first,
                    });
                    Ok(Some(*first))
                }
            },
        }
    }
}

/// Both claims carry the same qualifier snaks, or `incoming` carries none.
fn same_qualifiers(existing: &Claim, incoming: &Claim) -> bool {
    let holds = |claim: &Claim, snak: &Snak| {
        claim
            .qualifier_group(&snak.property)
            .is_some_and(|group| group.contains(snak))
    };
    incoming.qualifiers.is_empty()
        || (incoming.qualifier_snaks().all(|snak| holds(existing, snak))
            && existing.qualifier_snaks().all(|snak| holds(incoming, snak)))
}

fn append_references(
    claims: &mut [Claim],
    index: usize,
    incoming: &Claim,
    changes: &mut Vec<ChangeEntry>,
) {
    for block in &incoming.references {
        if !claims[index].references.contains(block) {
            claims[index].references.push(block.clone());
            changes.push(ChangeEntry::AppendedReferenceBlock(ClaimRef::of(claims, index)));
        }
    }
}

/// Merge with the default first-wins policy.
pub fn merge(
    translation: &TranslationResult,
    existing: Option<&EntityRecord>,
) -> Result<MergeResult, MergeError> {
    Merger::default().merge(translation, existing)
}
