//! Top-level error type aggregating every subsystem's taxonomy.
//!
//! Each subsystem keeps its own `thiserror` enum; this wrapper exists so
//! embedding applications can hold one error type (or feed everything
//! into `anyhow`) without flattening the per-subsystem detail.

use thiserror::Error;

use crate::address::AddressError;
use crate::build::BuildError;
use crate::index::IndexError;
use crate::metadata::MetadataError;
use crate::stream::StreamError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Build(#[from] BuildError),
}
