//! Error types for the data model and the Wikibase JSON codec.

use crate::id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid entity id `{0}`")]
    InvalidEntityId(String),
    #[error("entity id `{0}` is too long")]
    EntityIdTooLong(String),
    #[error("unknown rank `{0}`")]
    UnknownRank(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("missing field `{field}` in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },
    #[error("field `{field}` in {context} has the wrong shape: {reason}")]
    InvalidField {
        field: &'static str,
        context: String,
        reason: String,
    },
    #[error("unsupported entity type `{0}`")]
    UnsupportedEntityType(String),
    #[error("unknown snak type `{0}`")]
    UnknownSnakType(String),
    #[error("unresolved reference to `{0}` cannot be encoded")]
    UnresolvedReference(EntityId),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
