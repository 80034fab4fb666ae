//! Migration profiles.
//!
//! A profile names the two wikis' concept namespaces, how mapping query
//! results are laid out, and the engine configuration:
//!
//! ```json
//! {
//!   "name": "wikidata-to-local",
//!   "source": {"concept_base": "http://www.wikidata.org/entity/"},
//!   "target": {"concept_base": "https://wiki.example.org/entity/"},
//!   "mapping": {"source_column": "wd", "target_column": "item"},
//!   "engine": {"languages": ["en", "de"], "type_casts": {"enabled": true}}
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use wbmigrate_engine::EngineConfig;
use wbmigrate_model::wikibase_json::WIKIDATA_CONCEPT_BASE;
use wbmigrate_model::EntityCodec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// IRI prefix of the wiki's entities.
    pub concept_base: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            concept_base: WIKIDATA_CONCEPT_BASE.to_string(),
        }
    }
}

impl WikiConfig {
    pub fn codec(&self) -> EntityCodec {
        EntityCodec::new(self.concept_base.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Column (or SPARQL variable) holding the source id.
    pub source_column: String,
    /// Column (or SPARQL variable) holding the target id.
    pub target_column: String,
    /// VALUES query templates, see `wbmigrate ids`.
    pub item_query: Option<String>,
    pub property_query: Option<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            source_column: "source".to_string(),
            target_column: "target".to_string(),
            item_query: None,
            property_query: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationProfile {
    pub name: String,
    pub source: WikiConfig,
    pub target: WikiConfig,
    pub mapping: MappingConfig,
    pub engine: EngineConfig,
}

impl MigrationProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        let profile: MigrationProfile = serde_json::from_str(&text)
            .with_context(|| format!("invalid profile {}", path.display()))?;
        profile
            .engine
            .validate()
            .with_context(|| format!("invalid engine configuration in {}", path.display()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_profile_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"name": "test"}"#).unwrap();
        let profile = MigrationProfile::load(&path).unwrap();
        assert_eq!(profile.name, "test");
        assert_eq!(profile.mapping.source_column, "source");
        assert_eq!(profile.target.concept_base, WIKIDATA_CONCEPT_BASE);
        assert!(profile.engine.merge_existing);
    }

    #[test]
    fn invalid_engine_sections_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(
            &path,
            r#"{"engine": {"back_reference": {"property": {"type": "sitelink", "site": "x"}}}}"#,
        )
        .unwrap();
        assert!(MigrationProfile::load(&path).is_err());
    }
}
