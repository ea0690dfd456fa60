//! Directory-tree writer: `<root>/metadata.csv` + `data/*` + `docs/*`,
//! with a regenerated JSON/HTML summary on every checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use super::{EncodingWriter, LoadedResource, drain_rows};
use crate::address::Resolved;
use crate::build::{BuildError, summary};
use crate::core::{DATA_DIR, DOCS_DIR, Encoding, METADATA_FILE, slugify};
use crate::metadata::MetadataDoc;
use crate::stream::{Caster, RowStream};

pub struct DirWriter {
    root: PathBuf,
}

impl DirWriter {
    pub fn new(dest: &Path, name: &str) -> Result<Self, BuildError> {
        let root = dest.join(name);
        let data = root.join(DATA_DIR);
        fs::create_dir_all(&data).map_err(|e| BuildError::Io(data, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_bytes(&self, rel: &Path, bytes: &[u8]) -> Result<(), BuildError> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(&path, bytes).map_err(|e| BuildError::Io(path, e))
    }
}

impl EncodingWriter for DirWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Dir
    }

    fn destination(&self) -> String {
        self.root.display().to_string()
    }

    fn load_resource(
        &mut self,
        name: &str,
        _source: &Resolved,
        rows: &mut RowStream,
        caster: &mut Caster,
    ) -> Result<LoadedResource, BuildError> {
        let rel = format!("{DATA_DIR}/{}.csv", slugify(name));
        let path = self.root.join(&rel);
        let mut writer = csv::Writer::from_path(&path)?;
        let count = drain_rows(name, rows, caster, |row| {
            writer.write_record(row).map_err(BuildError::from)
        })?;
        writer.flush().map_err(|e| BuildError::Io(path, e))?;
        Ok(LoadedResource { url: rel, rows: count })
    }

    fn copy_doc(&mut self, file_name: &str, bytes: &[u8]) -> Result<Option<String>, BuildError> {
        let rel = format!("{DOCS_DIR}/{file_name}");
        self.write_bytes(Path::new(&rel), bytes)?;
        Ok(Some(rel))
    }

    fn copy_aux(&mut self, rel: &Path, bytes: &[u8]) -> Result<bool, BuildError> {
        self.write_bytes(rel, bytes)?;
        Ok(true)
    }

    fn checkpoint(&mut self, doc: &MetadataDoc) -> Result<(), BuildError> {
        doc.write(&self.root.join(METADATA_FILE))?;
        summary::write_summary(&self.root, doc)
    }

    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError> {
        self.checkpoint(doc)
    }
}
