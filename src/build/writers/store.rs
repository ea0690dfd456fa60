//! Object-storage writer: the directory layout pushed key-by-key through
//! the [`RemoteStore`] seam, with a `Distribution` term recorded for each
//! uploaded access URL.
//!
//! Real object-store clients belong to the out-of-scope fetch layer; the
//! bundled [`FsStore`] maps keys onto a local directory, which is enough
//! for tests and local mirrors.

use std::fs;
use std::path::{Path, PathBuf};

use super::{EncodingWriter, LoadedResource, drain_rows};
use crate::address::Resolved;
use crate::build::BuildError;
use crate::core::{DATA_DIR, DOCS_DIR, Encoding, METADATA_FILE, slugify};
use crate::metadata::{MetadataDoc, SECTION_ROOT, TERM_DISTRIBUTION};
use crate::stream::{Caster, RowStream};

/// Key/value upload seam for object storage.
pub trait RemoteStore {
    /// Store one object, returning its access URL.
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<String, BuildError>;

    /// Base location of the store, for logging and indexing.
    fn base(&self) -> String;
}

/// Filesystem-backed store: keys map onto paths under a root directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl RemoteStore for FsStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<String, BuildError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(&path, bytes).map_err(|e| BuildError::Io(path.clone(), e))?;
        Ok(path.display().to_string())
    }

    fn base(&self) -> String {
        self.root.display().to_string()
    }
}

pub struct StoreWriter {
    store: Box<dyn RemoteStore>,
    prefix: String,
    distributions: Vec<String>,
}

impl StoreWriter {
    pub fn new(store: Box<dyn RemoteStore>, name: &str) -> Self {
        Self {
            store,
            prefix: name.to_string(),
            distributions: Vec::new(),
        }
    }

    fn put(&mut self, rel: &str, bytes: &[u8]) -> Result<String, BuildError> {
        let key = format!("{}/{}", self.prefix, rel);
        let url = self.store.put(&key, bytes)?;
        self.distributions.push(url.clone());
        Ok(url)
    }
}

impl EncodingWriter for StoreWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Store
    }

    fn destination(&self) -> String {
        format!("{}/{}", self.store.base(), self.prefix)
    }

    fn load_resource(
        &mut self,
        name: &str,
        _source: &Resolved,
        rows: &mut RowStream,
        caster: &mut Caster,
    ) -> Result<LoadedResource, BuildError> {
        let mut buffer = csv::Writer::from_writer(Vec::new());
        let count = drain_rows(name, rows, caster, |row| {
            buffer.write_record(row).map_err(BuildError::from)
        })?;
        let bytes = buffer
            .into_inner()
            .map_err(|e| BuildError::Csv(e.into_error().into()))?;

        let rel = format!("{DATA_DIR}/{}.csv", slugify(name));
        self.put(&rel, &bytes)?;
        Ok(LoadedResource { url: rel, rows: count })
    }

    fn copy_doc(&mut self, file_name: &str, bytes: &[u8]) -> Result<Option<String>, BuildError> {
        let rel = format!("{DOCS_DIR}/{file_name}");
        self.put(&rel, bytes)?;
        Ok(Some(rel))
    }

    fn copy_aux(&mut self, rel: &Path, bytes: &[u8]) -> Result<bool, BuildError> {
        let rel = rel.to_string_lossy().replace('\\', "/");
        self.put(&rel, bytes)?;
        Ok(true)
    }

    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError> {
        for url in std::mem::take(&mut self.distributions) {
            doc.new_term(SECTION_ROOT, TERM_DISTRIBUTION, &url);
        }
        let text = doc.to_csv_string()?;
        self.put(METADATA_FILE, text.as_bytes())?;
        Ok(())
    }
}
