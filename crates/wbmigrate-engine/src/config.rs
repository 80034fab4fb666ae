//! Engine configuration.
//!
//! Plain data, usually read from the `engine` section of a migration profile.
//! Every field has a default so a profile only names what it changes.

use crate::backref::{BackReference, BackReferenceConfig};
use crate::merge::AmbiguityPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("type_casts.fallback_language must not be empty")]
    EmptyFallbackLanguage,
    #[error("back reference for properties cannot be a sitelink (site `{0}`)")]
    SitelinkBackReferenceOnProperty(String),
    #[error("back reference property `{0}` is not a property id")]
    BackReferenceNotAProperty(String),
    #[error("back reference sitelink has an empty site")]
    EmptySitelinkSite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeCastConfig {
    pub enabled: bool,
    /// Language given to strings cast into monolingual text.
    pub fallback_language: String,
}

impl Default for TypeCastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fallback_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Languages kept for labels, descriptions and aliases. `None` keeps all.
    pub languages: Option<BTreeSet<String>>,
    /// Sites kept for sitelinks. `None` keeps all.
    pub sitelinks: Option<BTreeSet<String>>,
    pub ignore_no_values: bool,
    pub ignore_unknown_values: bool,
    /// Drop snaks whose ids have no mapping instead of flagging them.
    /// Falls back to `ignore_unknown_values` when unset.
    pub drop_unresolved: Option<bool>,
    pub type_casts: TypeCastConfig,
    pub back_reference: BackReferenceConfig,
    /// Merge into targets that already exist; when off they are skipped.
    pub merge_existing: bool,
    pub ambiguity: AmbiguityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            languages: None,
            sitelinks: None,
            ignore_no_values: false,
            ignore_unknown_values: false,
            drop_unresolved: None,
            type_casts: TypeCastConfig::default(),
            back_reference: BackReferenceConfig::default(),
            merge_existing: true,
            ambiguity: AmbiguityPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.type_casts.fallback_language.trim().is_empty() {
            return Err(ConfigError::EmptyFallbackLanguage);
        }
        for reference in [&self.back_reference.item, &self.back_reference.property]
            .into_iter()
            .flatten()
        {
            match reference {
                BackReference::Property { id } if !id.is_property() => {
                    return Err(ConfigError::BackReferenceNotAProperty(id.to_string()))
                }
                BackReference::Sitelink { site, .. } if site.trim().is_empty() => {
                    return Err(ConfigError::EmptySitelinkSite)
                }
                _ => {}
            }
        }
        if let Some(BackReference::Sitelink { site, .. }) = &self.back_reference.property {
            return Err(ConfigError::SitelinkBackReferenceOnProperty(site.clone()));
        }
        Ok(())
    }

    pub fn drop_unresolved(&self) -> bool {
        self.drop_unresolved.unwrap_or(self.ignore_unknown_values)
    }

    pub fn language_allowed(&self, language: &str) -> bool {
        self.languages
            .as_ref()
            .map_or(true, |languages| languages.contains(language))
    }

    pub fn sitelink_allowed(&self, site: &str) -> bool {
        self.sitelinks
            .as_ref()
            .map_or(true, |sites| sites.contains(site))
    }
}
