//! Row casting against a schema, with accumulated per-column errors.

use rustc_hash::FxHashMap;

use super::{Schema, StreamError};

/// Default ceiling on accumulated cast errors before a resource aborts.
pub const DEFAULT_CAST_CEILING: usize = 5000;

/// Casts rows through a schema, accumulating per-column errors.
///
/// A single bad cell never aborts the stream: the raw value is kept, an
/// error is recorded under that column, and casting continues — until the
/// total error count exceeds the ceiling, which fails the whole resource
/// with [`StreamError::TooManyCastErrors`].
pub struct Caster {
    schema: Schema,
    ceiling: usize,
    errors: FxHashMap<String, Vec<String>>,
    error_count: usize,
    row: u64,
}

impl Caster {
    pub fn new(schema: Schema, ceiling: usize) -> Self {
        Self {
            schema,
            ceiling,
            errors: FxHashMap::default(),
            error_count: 0,
            row: 0,
        }
    }

    /// Pass-through caster for encodings that copy no rows.
    pub fn passthrough() -> Self {
        Self::new(Schema::default(), DEFAULT_CAST_CEILING)
    }

    /// Cast one row. Returns the normalized row, or an error once the
    /// ceiling is exceeded.
    pub fn cast(&mut self, mut row: Vec<String>) -> Result<Vec<String>, StreamError> {
        self.row += 1;
        for (idx, column) in self.schema.columns.iter().enumerate() {
            let Some(value) = row.get_mut(idx) else {
                continue;
            };
            if column.datatype.accepts(value) {
                *value = column.datatype.normalize(value);
            } else {
                self.error_count += 1;
                self.errors
                    .entry(column.name.clone())
                    .or_default()
                    .push(format!(
                        "row {}: `{}` is not a {}",
                        self.row, value, column.datatype
                    ));
                if self.error_count > self.ceiling {
                    return Err(StreamError::TooManyCastErrors {
                        count: self.error_count,
                        ceiling: self.ceiling,
                    });
                }
            }
        }
        Ok(row)
    }

    /// Per-column cast errors accumulated so far.
    pub fn errors(&self) -> &FxHashMap<String, Vec<String>> {
        &self.errors
    }

    /// Total number of accumulated errors.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
