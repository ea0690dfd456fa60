//! The package metadata document: ordered sections of key/value terms.
//!
//! The term grammar itself is deliberately opaque here;
//! this module only provides the stable tree API the resolver and builder
//! depend on: term lookup, URL rewrite, section iteration, canonical
//! sorting and (de)serialization to the CSV row layout shared by the
//! directory, zip and single-CSV encodings (the Excel encoding reuses the
//! same rows on its `meta` sheet).
//!
//! # Row layout
//!
//! ```text
//! Section,Root
//! Name,example.com-random_names-1
//! Section,Resources
//! Datafile,data/random-names.csv,name=random_names
//! ```
//!
//! The leading `Root` section header is optional on input.

mod doc;
mod term;

pub use doc::MetadataDoc;
pub use term::{Section, Term};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Section name holding package identity terms
pub const SECTION_ROOT: &str = "Root";
/// Section name holding documentation terms
pub const SECTION_DOCUMENTATION: &str = "Documentation";
/// Section name holding reference terms
pub const SECTION_REFERENCES: &str = "References";
/// Section name holding resource declarations
pub const SECTION_RESOURCES: &str = "Resources";
/// Section name holding generated column schemas
pub const SECTION_SCHEMA: &str = "Schema";

/// Canonical section order used when finalizing a build.
pub const CANONICAL_ORDER: &[&str] = &[
    SECTION_ROOT,
    SECTION_DOCUMENTATION,
    SECTION_REFERENCES,
    SECTION_RESOURCES,
    SECTION_SCHEMA,
];

/// Term name declaring one tabular resource
pub const TERM_DATAFILE: &str = "Datafile";

/// Term name declaring one external reference
pub const TERM_REFERENCE: &str = "Reference";

/// Term name declaring one schema column (`Field,<header>,type=..,resource=..`)
pub const TERM_FIELD: &str = "Field";

/// Term name recording one uploaded access URL of a store-hosted build
pub const TERM_DISTRIBUTION: &str = "Distribution";

/// Errors from reading or writing a metadata document.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("metadata document parsing error")]
    Csv(#[from] csv::Error),
}
