//! Row streaming, schema intuition and type casting.
//!
//! The build pipeline consumes an abstract ordered sequence of rows
//! ([`RowStream`]), optionally headed, and validates it against a column
//! schema ([`Schema`]) through a [`Caster`] that accumulates per-column
//! cast errors instead of aborting — until a configured ceiling, at which
//! point the whole resource load fails.

mod cast;
mod rows;
mod schema;

pub use cast::{Caster, DEFAULT_CAST_CEILING};
pub use rows::RowStream;
pub use schema::{ColType, Schema, SchemaColumn, intuit};

use thiserror::Error;

/// Errors from row sources and casting.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("csv read error")]
    Csv(#[from] csv::Error),

    #[error("too many casting errors ({count} exceeds ceiling {ceiling})")]
    TooManyCastErrors { count: usize, ceiling: usize },
}
