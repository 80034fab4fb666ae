//! `wbmigrate ids`

use crate::profile::MigrationProfile;
use crate::read_json;
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use wbmigrate_engine::collect::{referenced_ids, values_queries, DEFAULT_CHUNK_SIZE};
use wbmigrate_model::{EntityCodec, EntityKind};

#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Source entities (Wikibase JSON).
    #[arg(long)]
    pub source: PathBuf,
    /// Profile supplying the source concept base and the item/property query
    /// templates.
    #[arg(long)]
    pub profile: Option<PathBuf>,
    /// Query template used for both kinds; overrides the profile's templates.
    #[arg(long)]
    pub query_template: Option<PathBuf>,
    /// Ids per rendered query.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

pub fn cmd_ids(args: &IdsArgs) -> Result<()> {
    let profile = match &args.profile {
        Some(path) => Some(MigrationProfile::load(path)?),
        None => None,
    };
    let codec = profile
        .as_ref()
        .map_or_else(EntityCodec::default, |p| p.source.codec());
    let records = codec
        .decode_entities(&read_json(&args.source)?)
        .with_context(|| format!("failed to decode {}", args.source.display()))?;
    let ids = referenced_ids(&records);
    tracing::debug!(records = records.len(), ids = ids.len(), "collected referenced ids");

    let shared = match &args.query_template {
        Some(path) => Some(
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };
    for kind in [EntityKind::Item, EntityKind::Property] {
        match template_for(kind, shared.as_deref(), profile.as_ref()) {
            Some(template) => {
                for query in values_queries(template, ids.of_kind(kind), args.chunk_size) {
                    println!("# {kind} ids");
                    println!("{query}");
                    println!();
                }
            }
            None => {
                for id in ids.of_kind(kind) {
                    println!("{id}");
                }
            }
        }
    }
    Ok(())
}

/// The shared template if given, else the profile's template for `kind`.
fn template_for<'a>(
    kind: EntityKind,
    shared: Option<&'a str>,
    profile: Option<&'a MigrationProfile>,
) -> Option<&'a str> {
    if shared.is_some() {
        return shared;
    }
    let mapping = &profile?.mapping;
    match kind {
        EntityKind::Item => mapping.item_query.as_deref(),
        EntityKind::Property => mapping.property_query.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_template_overrides_the_profile() {
        let mut profile = MigrationProfile::default();
        profile.mapping.item_query = Some("items $source_entities".into());
        assert_eq!(
            template_for(EntityKind::Item, None, Some(&profile)),
            Some("items $source_entities")
        );
        assert_eq!(template_for(EntityKind::Property, None, Some(&profile)), None);
        assert_eq!(
            template_for(EntityKind::Property, Some("any"), Some(&profile)),
            Some("any")
        );
        assert_eq!(template_for(EntityKind::Item, None, None), None);
    }
}
