//! wbmigrate data model
//!
//! Typed records for Wikibase items and properties (terms, sitelinks,
//! claims with qualifiers and references) plus a codec for the Wikibase
//! entity JSON format.
//!
//! Records are system-agnostic: the same types hold an entity as read from the
//! source wiki, after translation into the target id space, and as read from
//! the target wiki. Id slots are [`IdRef`]s so that a source id which could
//! not be translated stays visibly marked instead of passing for a target id.

pub mod claim;
pub mod datatype;
pub mod error;
pub mod id;
pub mod record;
pub mod value;
pub mod wikibase_json;

pub use claim::{Claim, Rank, ReferenceBlock, Snak, SnakGroup, SnakValue};
pub use datatype::Datatype;
pub use error::{CodecError, ModelError};
pub use id::{EntityId, EntityKind, IdRef};
pub use record::{AliasSet, EntityRecord, LocalizedText, Sitelink, Sitelinks};
pub use value::{GlobeCoordinate, MonolingualText, Quantity, QuantityUnit, Time, Value};
pub use wikibase_json::EntityCodec;
