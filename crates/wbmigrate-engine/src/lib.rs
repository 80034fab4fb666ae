//! wbmigrate engine
//!
//! Moves Wikibase entities from a source wiki into a target wiki:
//!
//! ```text
//! mapping rows ──► MappingTable ─┐
//!                                ▼
//! source record ──► Translator ──► TranslationResult ──► Merger ──► MergeResult ──► backref::inject
//!                                                          ▲
//!                                   existing target record ┘
//! ```
//!
//! Everything here is pure over its inputs: no network access, no state kept
//! between batches. Fetching rows and records and writing the results back
//! belong to the caller.
//!
//! ## Modules
//!
//! - [`mapping`]: source → target id table built from query rows
//! - [`cast`]: datatype conversions for values
//! - [`translate`]: rewrites a source record into target ids
//! - [`merge`]: non-destructive merge into an existing target record
//! - [`backref`]: provenance pointers back to the source entity
//! - [`pipeline`]: parallel batch driver
//! - [`collect`]: ids a batch needs mappings for

pub mod backref;
pub mod cast;
pub mod collect;
pub mod config;
pub mod diagnostics;
pub mod mapping;
pub mod merge;
pub mod metadata;
pub mod pipeline;
pub mod translate;

pub use backref::{inject, BackReference, BackReferenceConfig, BackReferenceError};
pub use cast::{cast, CastFailure};
pub use collect::{referenced_ids, values_queries, ReferencedIds};
pub use config::{ConfigError, EngineConfig, TypeCastConfig};
pub use diagnostics::{Diagnostic, Disposition, Location, Position, Severity, UnresolvedReference};
pub use mapping::{MappingError, MappingRow, MappingTable, MappingTableBuilder, MappingWarning};
pub use merge::{merge, AmbiguityPolicy, ChangeEntry, ClaimRef, MergeError, MergeResult, Merger};
pub use metadata::{MetadataError, NoMetadata, PropertyDatatypes, PropertyMetadata};
pub use pipeline::{Batch, EntityError, EntityOutcome, EntityReport, RecordLookup};
pub use translate::{translate, TranslationResult, Translator};
