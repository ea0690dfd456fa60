//! The five encoding writers behind one trait.
//!
//! A writer owns the destination artifact for one build: the builder
//! drives the shared pipeline (resolve, cast, rewrite, finalize) and
//! delegates every byte that lands at the destination to the writer.

mod csv;
mod dir;
mod excel;
mod store;
mod zip;

pub use csv::CsvWriter;
pub use dir::DirWriter;
pub use excel::ExcelWriter;
pub use store::{FsStore, RemoteStore, StoreWriter};
pub use zip::ZipWriter;

use std::path::Path;

use super::BuildError;
use crate::address::Resolved;
use crate::core::Encoding;
use crate::logger::RowProgress;
use crate::metadata::MetadataDoc;
use crate::stream::{Caster, RowStream};

/// Result of materializing one resource at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedResource {
    /// Value to record for this resource in the working metadata document
    /// (relative path, sheet name or absolute URL, per encoding)
    pub url: String,
    /// Data rows written (0 for non-copying encodings)
    pub rows: u64,
}

/// One physical package encoding's write side.
pub trait EncodingWriter {
    fn encoding(&self) -> Encoding;

    /// Human-readable destination; also the URL recorded in the index.
    fn destination(&self) -> String;

    /// Whether this encoding materializes resource rows at the
    /// destination. Non-copying encodings get an empty row stream and a
    /// pass-through caster.
    fn copies_rows(&self) -> bool {
        true
    }

    /// Materialize one resource.
    fn load_resource(
        &mut self,
        name: &str,
        source: &Resolved,
        rows: &mut RowStream,
        caster: &mut Caster,
    ) -> Result<LoadedResource, BuildError>;

    /// Store one documentation file, returning its new relative URL.
    /// `None` when the encoding has no place for documentation.
    fn copy_doc(&mut self, _file_name: &str, _bytes: &[u8]) -> Result<Option<String>, BuildError> {
        Ok(None)
    }

    /// Store one ancillary file verbatim; `false` when unsupported.
    fn copy_aux(&mut self, _rel: &Path, _bytes: &[u8]) -> Result<bool, BuildError> {
        Ok(false)
    }

    /// Persist the working metadata document mid-build. Only encodings
    /// with an independently readable metadata artifact override this.
    fn checkpoint(&mut self, _doc: &MetadataDoc) -> Result<(), BuildError> {
        Ok(())
    }

    /// Write the finalized metadata document and seal the artifact.
    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError>;
}

/// Create the writer for a destination encoding.
///
/// The artifact lands under `dest`: a `<name>/` tree for directory and
/// store builds, a `<name>.<ext>` file for the single-file encodings.
pub fn writer_for(
    encoding: Encoding,
    dest: &Path,
    name: &str,
) -> Result<Box<dyn EncodingWriter>, BuildError> {
    std::fs::create_dir_all(dest).map_err(|e| BuildError::Io(dest.to_path_buf(), e))?;
    match encoding {
        Encoding::Dir => Ok(Box::new(DirWriter::new(dest, name)?)),
        Encoding::Csv => Ok(Box::new(CsvWriter::new(dest, name))),
        Encoding::Excel => Ok(Box::new(ExcelWriter::new(dest, name)?)),
        Encoding::Zip => Ok(Box::new(ZipWriter::new(dest, name)?)),
        Encoding::Store => Ok(Box::new(StoreWriter::new(
            Box::new(FsStore::new(dest)),
            name,
        ))),
        Encoding::Source => Err(BuildError::Unbuildable(encoding)),
    }
}

/// Drive a row stream through the caster into a writer-provided sink,
/// with periodic progress reports.
///
/// The header row (when present) goes through the sink uncast. A final
/// progress line is emitted whether the drain succeeds or fails.
pub(crate) fn drain_rows<F>(
    name: &str,
    rows: &mut RowStream,
    caster: &mut Caster,
    mut sink: F,
) -> Result<u64, BuildError>
where
    F: FnMut(&[String]) -> Result<(), BuildError>,
{
    if let Some(headers) = rows.headers() {
        let headers = headers.to_vec();
        sink(&headers)?;
    }
    let mut progress = RowProgress::new(name);
    while let Some(row) = rows.next_row() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                progress.finish();
                return Err(e.into());
            }
        };
        let row = match caster.cast(row) {
            Ok(row) => row,
            Err(e) => {
                progress.finish();
                return Err(e.into());
            }
        };
        if let Err(e) = sink(&row) {
            progress.finish();
            return Err(e);
        }
        progress.tick();
    }
    progress.finish();
    Ok(progress.rows())
}
