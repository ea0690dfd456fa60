//! Single-CSV writer: one metadata file, no data copied.
//!
//! Every resource keeps living where it already is; the metadata document
//! records absolute URLs so the package stays resolvable from anywhere.

use std::path::{Path, PathBuf};

use super::{EncodingWriter, LoadedResource};
use crate::address::Resolved;
use crate::core::Encoding;
use crate::metadata::MetadataDoc;
use crate::stream::{Caster, RowStream};
use crate::build::BuildError;

pub struct CsvWriter {
    path: PathBuf,
}

impl CsvWriter {
    pub fn new(dest: &Path, name: &str) -> Self {
        Self {
            path: dest.join(format!("{name}.csv")),
        }
    }
}

impl EncodingWriter for CsvWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Csv
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn copies_rows(&self) -> bool {
        false
    }

    fn load_resource(
        &mut self,
        _name: &str,
        source: &Resolved,
        _rows: &mut RowStream,
        _caster: &mut Caster,
    ) -> Result<LoadedResource, BuildError> {
        Ok(LoadedResource {
            url: source.absolute_url()?,
            rows: 0,
        })
    }

    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError> {
        doc.write(&self.path).map_err(BuildError::from)
    }
}
