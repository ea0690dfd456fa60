//! Core value types shared across the crate.
//!
//! - [`Encoding`]: physical container format of a package
//! - [`Locator`]: local-path-or-URL storage location
//! - [`PackageName`]: versioned/non-versioned package identity
//! - Layout constants shared by the resolver and the encoding writers

mod encoding;
mod locator;
mod name;

pub use encoding::Encoding;
pub use locator::Locator;
pub use name::PackageName;

/// Default metadata file name, implicitly appended to directory references
pub const METADATA_FILE: &str = "metadata.csv";

/// Fixed metadata sheet name inside Excel-encoded packages
pub const META_SHEET: &str = "meta";

/// Resource data directory inside directory/zip/store-encoded packages
pub const DATA_DIR: &str = "data";

/// Documentation directory inside directory/zip/store-encoded packages
pub const DOCS_DIR: &str = "docs";

/// Environment variable overriding the search-index file location
pub const INDEX_ENV: &str = "TABPACK_SEARCH_INDEX";

/// Default search-index file location (tilde-expanded)
pub const DEFAULT_INDEX_PATH: &str = "~/.tabpack/index.json";

/// Convert a resource name to a filesystem/URL-safe slug.
///
/// Lowercases and maps runs of non-alphanumeric characters to a single
/// `-`, so resource `random_names` stores as `data/random-names.csv`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("random_names"), "random-names");
        assert_eq!(slugify("Random Names (v2)"), "random-names-v2");
        assert_eq!(slugify("already-fine"), "already-fine");
        assert_eq!(slugify("__edges__"), "edges");
    }
}
