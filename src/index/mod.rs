//! Persistent search index for indirect package references.
//!
//! A small key/value store mapping package identifiers, names and
//! non-versioned names to the concrete locations of every encoding a
//! package has been built in. Used to resolve `index:` references and to
//! answer "the latest build of X" queries.
//!
//! The whole table persists as one JSON object on local disk, rewritten
//! atomically (write-to-temp, backup-previous, rename) on every update.
//! Concurrent readers are safe; concurrent writers race and the last
//! rename wins, which is acceptable because re-indexing is idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{DEFAULT_INDEX_PATH, Encoding, INDEX_ENV};
use crate::log;
use crate::metadata::MetadataDoc;

/// Errors from loading or persisting the index file.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error on index file `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("index file is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// One indexed build of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Package identifier term (may be empty for unidentified packages)
    pub ident: String,
    /// Full versioned name
    pub name: String,
    /// Name with the version suffix stripped
    pub nv_name: String,
    /// Trailing build version (0 when unversioned)
    pub version: u64,
    /// Physical encoding of this build
    pub format: Encoding,
    /// Concrete location of the build
    pub url: String,
}

/// The persistent search index.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchIndex {
    entries: FxHashMap<String, Vec<IndexEntry>>,
    #[serde(skip)]
    path: PathBuf,
}

impl SearchIndex {
    /// Open the index at its configured location, creating an empty one
    /// when no file exists yet.
    ///
    /// The location comes from the `TABPACK_SEARCH_INDEX` environment
    /// variable, defaulting to `~/.tabpack/index.json`.
    pub fn open() -> Result<Self, IndexError> {
        Self::open_at(&default_path())
    }

    /// Open the index backed by an explicit file path.
    pub fn open_at(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Ok(Self {
                entries: FxHashMap::default(),
                path: path.to_path_buf(),
            });
        }
        let text =
            fs::read_to_string(path).map_err(|e| IndexError::Io(path.to_path_buf(), e))?;
        let mut index: Self = serde_json::from_str(&text)?;
        index.path = path.to_path_buf();
        Ok(index)
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Upsert one build of a package.
    ///
    /// Extracts identifier, name, non-versioned name and version from the
    /// metadata document. Any prior entry for the same (non-versioned
    /// name, encoding) pair is replaced.
    pub fn add(&mut self, doc: &MetadataDoc, format: Encoding, url: &str) {
        let Some(name) = doc.package_name() else {
            log!("index"; "skipping package without a Name term at {url}");
            return;
        };
        let entry = IndexEntry {
            ident: doc.identifier().unwrap_or_default().to_string(),
            name: name.as_str().to_string(),
            nv_name: name.non_versioned().to_string(),
            version: name.version().unwrap_or(0),
            format,
            url: url.to_string(),
        };
        self.add_entry(entry);
    }

    /// Upsert a pre-built entry (used by registries of unbuilt sources).
    pub fn add_entry(&mut self, entry: IndexEntry) {
        // one entry per (nv_name, format), everywhere it is keyed
        for bucket in self.entries.values_mut() {
            bucket.retain(|e| !(e.nv_name == entry.nv_name && e.format == entry.format));
        }
        self.entries.retain(|_, bucket| !bucket.is_empty());

        let mut keys = vec![entry.name.clone(), entry.nv_name.clone()];
        if !entry.ident.is_empty() {
            keys.push(entry.ident.clone());
        }
        keys.dedup();
        for key in keys {
            self.entries.entry(key).or_default().push(entry.clone());
        }
    }

    /// Empty the table and persist the empty state.
    pub fn clear(&mut self) -> Result<(), IndexError> {
        self.entries.clear();
        self.write()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Search for packages matching `query`.
    ///
    /// Exact key match (identifier, name or non-versioned name) wins;
    /// substring match over keys is the fallback. Results sort by
    /// (version descending, encoding rank descending) and deduplicate
    /// identical (format, name) pairs.
    pub fn search(&self, query: &str, format: Option<Encoding>) -> Vec<IndexEntry> {
        let mut matches: Vec<IndexEntry> = match self.entries.get(query) {
            Some(bucket) => bucket.clone(),
            None => self
                .entries
                .iter()
                .filter(|(key, _)| key.contains(query))
                .flat_map(|(_, bucket)| bucket.iter().cloned())
                .collect(),
        };

        if let Some(format) = format {
            matches.retain(|e| e.format == format);
        }

        matches.sort_by(|a, b| {
            b.version
                .cmp(&a.version)
                .then_with(|| b.format.rank().cmp(&a.format.rank()))
                .then_with(|| a.name.cmp(&b.name))
        });
        matches.dedup_by(|a, b| a.format == b.format && a.name == b.name);
        matches
    }

    /// The best-ranked match for `query`, if any.
    pub fn best(&self, query: &str, format: Option<Encoding>) -> Option<IndexEntry> {
        self.search(query, format).into_iter().next()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persist the whole table: write to a temp file, back up the
    /// previous index, then rename into place.
    pub fn write(&self) -> Result<(), IndexError> {
        let io_err = |e| IndexError::Io(self.path.clone(), e);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = serde_json::to_string_pretty(self)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(io_err)?;

        if self.path.exists() {
            let backup = self.path.with_extension("json.bak");
            fs::rename(&self.path, &backup).map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

/// Resolve the index file location from the environment.
pub fn default_path() -> PathBuf {
    match std::env::var(INDEX_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(shellexpand::tilde(&path).as_ref()),
        _ => PathBuf::from(shellexpand::tilde(DEFAULT_INDEX_PATH).as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nv: &str, version: u64, format: Encoding) -> IndexEntry {
        IndexEntry {
            ident: format!("id-{nv}-{version}"),
            name: format!("{nv}-{version}"),
            nv_name: nv.to_string(),
            version,
            format,
            url: format!("/builds/{nv}-{version}.{}", format.as_str()),
        }
    }

    #[test]
    fn test_latest_version_ranks_first() {
        let mut index = SearchIndex::default();
        index.add_entry(entry("example.com-names", 2, Encoding::Zip));
        index.add_entry(entry("example.com-names", 3, Encoding::Zip));

        let results = index.search("example.com-names", None);
        assert_eq!(results[0].version, 3);
        // version 2's (nv, zip) entry was overwritten, not kept alongside
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_encoding_rank_breaks_version_ties() {
        let mut index = SearchIndex::default();
        index.add_entry(entry("pkg", 1, Encoding::Csv));
        index.add_entry(entry("pkg", 1, Encoding::Dir));
        index.add_entry(entry("pkg", 1, Encoding::Zip));

        let results = index.search("pkg", None);
        let formats: Vec<Encoding> = results.iter().map(|e| e.format).collect();
        assert_eq!(formats, [Encoding::Dir, Encoding::Zip, Encoding::Csv]);
    }

    #[test]
    fn test_format_filter_and_substring_fallback() {
        let mut index = SearchIndex::default();
        index.add_entry(entry("example.com-census", 1, Encoding::Dir));
        index.add_entry(entry("example.com-census", 1, Encoding::Zip));

        let zips = index.search("example.com-census", Some(Encoding::Zip));
        assert_eq!(zips.len(), 1);
        assert_eq!(zips[0].format, Encoding::Zip);

        let fuzzy = index.search("census", None);
        assert!(!fuzzy.is_empty());
    }

    #[test]
    fn test_add_from_doc_keys_all_identities() {
        let mut doc = MetadataDoc::new("example.com-names-2");
        doc.new_term("Root", "Identifier", "abc123");
        let mut index = SearchIndex::default();
        index.add(&doc, Encoding::Dir, "/builds/names");

        assert!(index.best("abc123", None).is_some());
        assert!(index.best("example.com-names-2", None).is_some());
        assert!(index.best("example.com-names", None).is_some());
    }

    #[test]
    fn test_write_is_atomic_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = SearchIndex::open_at(&path).unwrap();
        index.add_entry(entry("pkg", 1, Encoding::Dir));
        index.write().unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        index.add_entry(entry("pkg", 2, Encoding::Dir));
        index.write().unwrap();
        assert!(path.with_extension("json.bak").exists());

        let reloaded = SearchIndex::open_at(&path).unwrap();
        assert_eq!(reloaded.best("pkg", None).unwrap().version, 2);
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut index = SearchIndex::open_at(&path).unwrap();
        index.add_entry(entry("pkg", 1, Encoding::Dir));
        index.write().unwrap();

        index.clear().unwrap();
        let reloaded = SearchIndex::open_at(&path).unwrap();
        assert!(reloaded.is_empty());
    }
}
