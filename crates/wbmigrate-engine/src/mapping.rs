//! Source → target identifier mapping.
//!
//! The table is built once per batch from `(source, target)` rows, one row set
//! per entity kind, and is read-only afterwards. It is neither total (unmapped
//! ids are normal) nor injective (several source ids may share a target).
//!
//! Conflicts resolve first-wins: the first row for a source id decides, every
//! later row naming a different target becomes a [`MappingWarning`]. For
//! properties the builder can be given the datatypes of both wikis; a
//! candidate whose datatype matches the source property is then preferred.

use crate::metadata::PropertyMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use wbmigrate_model::{EntityId, EntityKind};

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("malformed {kind} mapping row {row}: {reason}")]
    MalformedRow {
        kind: EntityKind,
        row: usize,
        reason: String,
    },
    #[error("mapping rows have the wrong shape: {0}")]
    InvalidRows(String),
}

/// One row of a mapping query result. Columns may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingRow {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl MappingRow {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
        }
    }
}

/// A source id mapped to more than one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingWarning {
    pub source: EntityId,
    pub chosen: EntityId,
    pub ignored: EntityId,
}

// ============================================================================
// Table
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    items: HashMap<EntityId, EntityId>,
    properties: HashMap<EntityId, EntityId>,
}

impl MappingTable {
    pub fn builder() -> MappingTableBuilder<'static> {
        MappingTableBuilder::default()
    }

    /// Look a source id up in the map of its own kind.
    pub fn lookup(&self, source: &EntityId) -> Option<&EntityId> {
        match source.kind() {
            EntityKind::Item => self.items.get(source),
            EntityKind::Property => self.properties.get(source),
        }
    }

    pub fn item(&self, source: &EntityId) -> Option<&EntityId> {
        self.items.get(source)
    }

    pub fn property(&self, source: &EntityId) -> Option<&EntityId> {
        self.properties.get(source)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Item => self.items.len(),
            EntityKind::Property => self.properties.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.properties.is_empty()
    }

    pub fn iter(&self, kind: EntityKind) -> impl Iterator<Item = (&EntityId, &EntityId)> {
        match kind {
            EntityKind::Item => self.items.iter(),
            EntityKind::Property => self.properties.iter(),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Source id and the target of every row for it, in row order. Repeats are
/// kept so each conflicting row yields its own warning.
type Candidates = Vec<(EntityId, Vec<EntityId>)>;

#[derive(Default)]
pub struct MappingTableBuilder<'a> {
    items: Candidates,
    properties: Candidates,
    datatypes: Option<(&'a dyn PropertyMetadata, &'a dyn PropertyMetadata)>,
}

impl<'a> MappingTableBuilder<'a> {
    /// Prefer property targets whose datatype (in `target`) equals the source
    /// property's datatype (in `source`).
    pub fn with_datatypes<'b>(
        self,
        source: &'b dyn PropertyMetadata,
        target: &'b dyn PropertyMetadata,
    ) -> MappingTableBuilder<'b> {
        MappingTableBuilder {
            items: self.items,
            properties: self.properties,
            datatypes: Some((source, target)),
        }
    }

    pub fn items<I>(mut self, rows: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = MappingRow>,
    {
        add_rows(&mut self.items, EntityKind::Item, rows)?;
        Ok(self)
    }

    pub fn properties<I>(mut self, rows: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = MappingRow>,
    {
        add_rows(&mut self.properties, EntityKind::Property, rows)?;
        Ok(self)
    }

    /// Resolve conflicts and freeze the table.
    pub fn build(self) -> (MappingTable, Vec<MappingWarning>) {
        let mut warnings = Vec::new();
        let items = resolve(self.items, None, &mut warnings);
        let properties = resolve(self.properties, self.datatypes, &mut warnings);
        for warning in &warnings {
            tracing::warn!(
                source = %warning.source,
                chosen = %warning.chosen,
                ignored = %warning.ignored,
                "ambiguous mapping, keeping the first matching target"
            );
        }
        tracing::debug!(
            items = items.len(),
            properties = properties.len(),
            "built mapping table"
        );
        (MappingTable { items, properties }, warnings)
    }
}

fn add_rows<I>(candidates: &mut Candidates, kind: EntityKind, rows: I) -> Result<(), MappingError>
where
    I: IntoIterator<Item = MappingRow>,
{
    let mut index: HashMap<EntityId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, (source, _))| (source.clone(), i))
        .collect();

    for (row_number, row) in rows.into_iter().enumerate() {
        let source = parse_column(row.source.as_deref(), "source", kind, row_number)?;
        let target = parse_column(row.target.as_deref(), "target", kind, row_number)?;
        match index.get(&source) {
            Some(&i) => candidates[i].1.push(target),
            None => {
                index.insert(source.clone(), candidates.len());
                candidates.push((source, vec![target]));
            }
        }
    }
    Ok(())
}

fn parse_column(
    value: Option<&str>,
    column: &str,
    kind: EntityKind,
    row: usize,
) -> Result<EntityId, MappingError> {
    let malformed = |reason: String| MappingError::MalformedRow { kind, row, reason };
    let raw = match value.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(malformed(format!("{column} column is missing or empty"))),
    };
    let id = EntityId::parse(raw).map_err(|err| malformed(format!("{column} column: {err}")))?;
    if id.kind() != kind {
        return Err(malformed(format!("{column} `{id}` is not a {kind} id")));
    }
    Ok(id)
}

fn resolve(
    candidates: Candidates,
    datatypes: Option<(&dyn PropertyMetadata, &dyn PropertyMetadata)>,
    warnings: &mut Vec<MappingWarning>,
) -> HashMap<EntityId, EntityId> {
    let mut map = HashMap::with_capacity(candidates.len());
    for (source, targets) in candidates {
        let chosen = choose(&source, &targets, datatypes);
        for target in &targets {
            if target != &targets[chosen] {
                warnings.push(MappingWarning {
                    source: source.clone(),
                    chosen: targets[chosen].clone(),
                    ignored: target.clone(),
                });
            }
        }
        map.insert(source, targets[chosen].clone());
    }
    map
}

/// Index of the winning target. Targets are never empty.
fn choose(
    source: &EntityId,
    targets: &[EntityId],
    datatypes: Option<(&dyn PropertyMetadata, &dyn PropertyMetadata)>,
) -> usize {
    if targets.len() < 2 {
        return 0;
    }
    let Some((source_types, target_types)) = datatypes else {
        return 0;
    };
    let Some(wanted) = source_types.datatype(source) else {
        return 0;
    };
    targets
        .iter()
        .position(|t| target_types.datatype(t).as_ref() == Some(&wanted))
        .unwrap_or(0)
}

// ============================================================================
// Row readers
// ============================================================================

/// Read rows from a SPARQL 1.1 JSON results document
/// (`{"head": …, "results": {"bindings": [...]}}`). Unbound variables give
/// empty columns, which the builder rejects.
pub fn rows_from_sparql_json(
    doc: &Json,
    source_var: &str,
    target_var: &str,
) -> Result<Vec<MappingRow>, MappingError> {
    let bindings = doc
        .pointer("/results/bindings")
        .and_then(Json::as_array)
        .ok_or_else(|| MappingError::InvalidRows("missing results.bindings array".into()))?;
    Ok(bindings
        .iter()
        .map(|binding| MappingRow {
            source: binding_value(binding, source_var),
            target: binding_value(binding, target_var),
        })
        .collect())
}

fn binding_value(binding: &Json, var: &str) -> Option<String> {
    binding
        .get(var)
        .and_then(|b| b.get("value"))
        .and_then(Json::as_str)
        .map(str::to_string)
}

/// Read rows from either a SPARQL results document or a plain array of
/// objects keyed by column name.
pub fn rows_from_json(
    doc: &Json,
    source_column: &str,
    target_column: &str,
) -> Result<Vec<MappingRow>, MappingError> {
    if doc.get("results").is_some() {
        return rows_from_sparql_json(doc, source_column, target_column);
    }
    let rows = doc
        .as_array()
        .ok_or_else(|| MappingError::InvalidRows("expected a SPARQL result or an array".into()))?;
    Ok(rows
        .iter()
        .map(|row| MappingRow {
            source: row.get(source_column).and_then(Json::as_str).map(str::to_string),
            target: row.get(target_column).and_then(Json::as_str).map(str::to_string),
        })
        .collect())
}
