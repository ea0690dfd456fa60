//! tabpack - build, address and resolve tabular data packages.
//!
//! A *data package* is a metadata document plus a set of tabular resources,
//! stored in one of five physical encodings: a directory tree, a single CSV
//! file, an Excel workbook, a Zip archive, or an object-store-hosted tree.
//!
//! # Architecture
//!
//! ```text
//! reference string
//!       │
//!       ▼
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ address::parse│ --> │   Resolver   │ --> │     Builder      │
//! │ (classify)    │     │ (dereference)│     │ (materialize one │
//! └──────────────┘     └──────┬───────┘     │  encoding from   │
//!                             │             │  another)        │
//!                      ┌──────▼───────┐     └────────┬─────────┘
//!                      │ SearchIndex  │              │
//!                      │ (indirect    │     ┌────────▼─────────┐
//!                      │  references) │     │ EncodingWriter   │
//!                      └──────────────┘     │ dir/csv/xlsx/zip │
//!                                           │ /store           │
//!                                           └──────────────────┘
//! ```
//!
//! - [`address`]: reference parsing and encoding-aware resolution
//! - [`metadata`]: the ordered term/section metadata document
//! - [`index`]: the persistent search index for indirect references
//! - [`stream`]: row streaming, schema intuition and type casting
//! - [`build`]: the shared build pipeline and its five encoding writers

pub mod address;
pub mod build;
pub mod core;
pub mod error;
pub mod freshness;
pub mod index;
pub mod logger;
pub mod metadata;
pub mod stream;

pub use address::{
    Address, AddressError, DocAddress, PackageAddress, Reference, ResourceAddress, Resolved,
    Resolver,
};
pub use build::{BuildError, BuildOptions, BuildReport, Builder, EncodingWriter};
pub use crate::core::{Encoding, Locator, PackageName};
pub use error::Error;
pub use index::SearchIndex;
pub use metadata::MetadataDoc;
