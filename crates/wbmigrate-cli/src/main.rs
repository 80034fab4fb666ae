//! wbmigrate CLI
//!
//! File-based driver for the migration engine:
//! - `ids`: list the ids a set of source entities references, or render the
//!   VALUES queries that fetch their mappings
//! - `migrate`: translate and merge source entities into the target and
//!   write the results as Wikibase JSON plus a per-entity report
//!
//! Fetching dumps and query results, and writing the output back to a wiki,
//! happen outside this tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as Json;
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod ids;
mod migrate;
mod profile;

#[derive(Parser)]
#[command(name = "wbmigrate")]
#[command(author, version, about = "Migrate Wikibase entities between wikis")]
struct Cli {
    /// Debug logging for wbmigrate crates (RUST_LOG is honoured as well).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the ids referenced by source entities.
    ///
    /// With a query template (`--query-template` or the profile's), prints
    /// one VALUES query per chunk instead, with `$source_entities` replaced
    /// by the ids.
    Ids(ids::IdsArgs),

    /// Translate and merge source entities into the target.
    Migrate(migrate::MigrateArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Ids(args) => ids::cmd_ids(&args),
        Commands::Migrate(args) => migrate::cmd_migrate(&args),
    };

    if let Err(err) = result {
        use colored::Colorize;
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        for directive in ["wbmigrate=debug", "wbmigrate_engine=debug", "wbmigrate_model=debug"] {
            if let Ok(directive) = directive.parse::<tracing_subscriber::filter::Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

pub(crate) fn read_json(path: &Path) -> Result<Json> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub(crate) fn write_json(path: &Path, value: &Json) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
