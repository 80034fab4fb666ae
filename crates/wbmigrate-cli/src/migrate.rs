//! `wbmigrate migrate`

use crate::profile::MigrationProfile;
use crate::{read_json, write_json};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use wbmigrate_engine::mapping::rows_from_json;
use wbmigrate_engine::pipeline::index_records;
use wbmigrate_engine::{
    Batch, ChangeEntry, Diagnostic, EntityOutcome, EntityReport, MappingTable, MappingWarning,
    PropertyDatatypes,
};
use wbmigrate_model::{EntityId, EntityRecord};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Migration profile (JSON).
    #[arg(long)]
    pub profile: PathBuf,
    /// Item mapping rows (SPARQL JSON results or an array of objects).
    #[arg(long)]
    pub items: PathBuf,
    /// Property mapping rows.
    #[arg(long)]
    pub properties: PathBuf,
    /// Source entities to migrate (Wikibase JSON).
    #[arg(long)]
    pub source: PathBuf,
    /// Existing target entities (Wikibase JSON).
    #[arg(long)]
    pub target: Option<PathBuf>,
    /// Target property datatypes (`{"P1": "string"}` or SPARQL results).
    #[arg(long)]
    pub datatypes: Option<PathBuf>,
    /// Only migrate these source ids (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
    /// Output file for writable records.
    #[arg(long)]
    pub out: PathBuf,
    /// Per-entity JSON report.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Migrated,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct EntityEntry {
    pub source: EntityId,
    pub target: Option<EntityId>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// False when the record still holds unresolved ids and was not written.
    pub writable: bool,
    pub changes: Vec<ChangeEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EntityEntry {
    fn from_report(report: &EntityReport) -> Self {
        let (status, error, changes) = match &report.outcome {
            EntityOutcome::Migrated { merge, .. } => (Status::Migrated, None, merge.changes.clone()),
            EntityOutcome::Skipped { .. } => (Status::Skipped, None, Vec::new()),
            EntityOutcome::Failed(err) => (Status::Failed, Some(err.to_string()), Vec::new()),
        };
        Self {
            source: report.source_id.clone(),
            target: report.target_id().cloned(),
            status,
            error,
            writable: report.record().is_some_and(EntityRecord::is_writable),
            changes,
            diagnostics: report.diagnostics(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub profile: String,
    pub mapping_warnings: Vec<MappingWarning>,
    pub entities: Vec<EntityEntry>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub migrated: usize,
    pub with_warnings: usize,
    pub not_writable: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MigrationReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for entry in &self.entities {
            match entry.status {
                Status::Migrated => {
                    summary.migrated += 1;
                    if entry.diagnostics.iter().any(Diagnostic::is_warning) {
                        summary.with_warnings += 1;
                    }
                    if !entry.writable {
                        summary.not_writable += 1;
                    }
                }
                Status::Skipped => summary.skipped += 1,
                Status::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

// ============================================================================
// Command
// ============================================================================

pub struct MigrationOutput {
    pub records: Vec<EntityRecord>,
    pub report: MigrationReport,
}

pub fn run_migration(args: &MigrateArgs) -> Result<(MigrationProfile, MigrationOutput)> {
    let profile = MigrationProfile::load(&args.profile)?;
    let source_codec = profile.source.codec();
    let target_codec = profile.target.codec();

    let source_records = source_codec
        .decode_entities(&read_json(&args.source)?)
        .with_context(|| format!("failed to decode {}", args.source.display()))?;
    let target_records = match &args.target {
        Some(path) => target_codec
            .decode_entities(&read_json(path)?)
            .with_context(|| format!("failed to decode {}", path.display()))?,
        None => Vec::new(),
    };

    let source_types = PropertyDatatypes::from_records(&source_records);
    let mut target_types = PropertyDatatypes::from_records(&target_records);
    if let Some(path) = &args.datatypes {
        let extra = PropertyDatatypes::from_json(&read_json(path)?)
            .with_context(|| format!("invalid property datatypes in {}", path.display()))?;
        target_types.extend(extra);
    }

    let columns = &profile.mapping;
    let item_rows = rows_from_json(&read_json(&args.items)?, &columns.source_column, &columns.target_column)
        .with_context(|| format!("invalid mapping rows in {}", args.items.display()))?;
    let property_rows = rows_from_json(
        &read_json(&args.properties)?,
        &columns.source_column,
        &columns.target_column,
    )
    .with_context(|| format!("invalid mapping rows in {}", args.properties.display()))?;
    let (table, mapping_warnings) = MappingTable::builder()
        .with_datatypes(&source_types, &target_types)
        .items(item_rows)?
        .properties(property_rows)?
        .build();

    let ids: Vec<EntityId> = if args.only.is_empty() {
        source_records.iter().filter_map(|r| r.id.clone()).collect()
    } else {
        args.only
            .iter()
            .map(|raw| EntityId::parse(raw).with_context(|| format!("invalid id in --only: {raw}")))
            .collect::<Result<_>>()?
    };

    let source = index_records(source_records);
    let target = index_records(target_records);
    let batch = Batch::new(&table, &target_types, &profile.engine)?;
    let reports = batch.run(&ids, &source, &target, &AtomicBool::new(false));

    let records = reports
        .iter()
        .filter_map(EntityReport::record)
        .filter(|r| r.is_writable())
        .cloned()
        .collect();
    let report = MigrationReport {
        profile: profile.name.clone(),
        mapping_warnings,
        entities: reports.iter().map(EntityEntry::from_report).collect(),
    };
    Ok((profile, MigrationOutput { records, report }))
}

pub fn cmd_migrate(args: &MigrateArgs) -> Result<()> {
    let (profile, output) = run_migration(args)?;

    let encoded = profile
        .target
        .codec()
        .encode_entities(&output.records)
        .context("failed to encode migrated records")?;
    write_json(&args.out, &encoded)?;
    if let Some(path) = &args.report {
        write_json(path, &serde_json::to_value(&output.report)?)?;
    }

    print_summary(&output.report, &args.out);
    Ok(())
}

fn print_summary(report: &MigrationReport, out: &Path) {
    let summary = report.summary();
    eprintln!(
        "{} {} migrated ({} with warnings), {} skipped, {}",
        "ok".green().bold(),
        summary.migrated,
        summary.with_warnings.to_string().yellow(),
        summary.skipped,
        if summary.failed > 0 {
            format!("{} failed", summary.failed).red().bold()
        } else {
            "0 failed".normal()
        }
    );
    if summary.not_writable > 0 {
        eprintln!(
            "{} {} records hold unresolved ids and were not written",
            "warn".yellow().bold(),
            summary.not_writable
        );
    }
    if !report.mapping_warnings.is_empty() {
        eprintln!(
            "{} {} ambiguous mapping rows",
            "warn".yellow().bold(),
            report.mapping_warnings.len()
        );
    }
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
}
