//! Zip-archive writer: the directory layout under one top-level folder
//! named after the package, written to a temp file and renamed into
//! place once sealed.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

use super::{EncodingWriter, LoadedResource, drain_rows};
use crate::address::Resolved;
use crate::build::BuildError;
use crate::core::{DATA_DIR, DOCS_DIR, Encoding, METADATA_FILE, slugify};
use crate::metadata::MetadataDoc;
use crate::stream::{Caster, RowStream};

pub struct ZipWriter {
    path: PathBuf,
    tmp: PathBuf,
    folder: String,
    // taken on finish; every entry method errors afterwards
    archive: Option<zip::ZipWriter<File>>,
}

impl ZipWriter {
    pub fn new(dest: &Path, name: &str) -> Result<Self, BuildError> {
        let path = dest.join(format!("{name}.zip"));
        let tmp = path.with_extension("zip.tmp");
        let file = File::create(&tmp).map_err(|e| BuildError::Io(tmp.clone(), e))?;
        Ok(Self {
            path,
            tmp,
            folder: name.to_string(),
            archive: Some(zip::ZipWriter::new(file)),
        })
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    fn add_entry(&mut self, entry: &str, bytes: &[u8]) -> Result<(), BuildError> {
        let name = format!("{}/{}", self.folder, entry);
        let archive = self
            .archive
            .as_mut()
            .ok_or_else(|| BuildError::Io(self.path.clone(), sealed_error()))?;
        archive
            .start_file(name, Self::options())
            .map_err(|e| BuildError::Zip(self.path.clone(), e))?;
        archive
            .write_all(bytes)
            .map_err(|e| BuildError::Io(self.path.clone(), e))
    }
}

fn sealed_error() -> std::io::Error {
    std::io::Error::other("archive already sealed")
}

impl EncodingWriter for ZipWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Zip
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
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
        self.add_entry(&rel, &bytes)?;
        Ok(LoadedResource { url: rel, rows: count })
    }

    fn copy_doc(&mut self, file_name: &str, bytes: &[u8]) -> Result<Option<String>, BuildError> {
        let rel = format!("{DOCS_DIR}/{file_name}");
        self.add_entry(&rel, bytes)?;
        Ok(Some(rel))
    }

    fn copy_aux(&mut self, rel: &Path, bytes: &[u8]) -> Result<bool, BuildError> {
        let entry = rel.to_string_lossy().replace('\\', "/");
        self.add_entry(&entry, bytes)?;
        Ok(true)
    }

    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError> {
        let text = doc.to_csv_string()?;
        self.add_entry(METADATA_FILE, text.as_bytes())?;

        let archive = self
            .archive
            .take()
            .ok_or_else(|| BuildError::Io(self.path.clone(), sealed_error()))?;
        archive
            .finish()
            .map_err(|e| BuildError::Zip(self.path.clone(), e))?;
        fs::rename(&self.tmp, &self.path).map_err(|e| BuildError::Io(self.path.clone(), e))
    }
}
