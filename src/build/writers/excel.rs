//! Excel-workbook writer: a `meta` sheet carrying the metadata rows plus
//! one sheet per resource. The metadata value for each resource is its
//! sheet name.

use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;

use super::{EncodingWriter, LoadedResource, drain_rows};
use crate::address::Resolved;
use crate::build::BuildError;
use crate::core::{Encoding, META_SHEET, slugify};
use crate::metadata::MetadataDoc;
use crate::stream::{Caster, RowStream};

/// Worksheet name length cap imposed by the xlsx format.
const MAX_SHEET_NAME: usize = 31;

pub struct ExcelWriter {
    path: PathBuf,
    workbook: Workbook,
}

impl ExcelWriter {
    pub fn new(dest: &Path, name: &str) -> Result<Self, BuildError> {
        let path = dest.join(format!("{name}.xlsx"));
        let mut workbook = Workbook::new();
        // the meta sheet goes first so readers land on it by default
        workbook
            .add_worksheet()
            .set_name(META_SHEET)
            .map_err(|e| BuildError::Xlsx(path.clone(), e))?;
        Ok(Self { path, workbook })
    }

    fn sheet_name(resource: &str) -> String {
        let mut name = slugify(resource);
        name.truncate(MAX_SHEET_NAME);
        name
    }
}

impl EncodingWriter for ExcelWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Excel
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
        let path = self.path.clone();
        let sheet_name = Self::sheet_name(name);
        let sheet = self
            .workbook
            .add_worksheet()
            .set_name(&sheet_name)
            .map_err(|e| BuildError::Xlsx(path.clone(), e))?;

        let mut line: u32 = 0;
        let count = drain_rows(name, rows, caster, |row| {
            for (col, cell) in row.iter().enumerate() {
                sheet
                    .write_string(line, col as u16, cell.as_str())
                    .map_err(|e| BuildError::Xlsx(path.clone(), e))?;
            }
            line += 1;
            Ok(())
        })?;
        Ok(LoadedResource {
            url: sheet_name,
            rows: count,
        })
    }

    fn finish(&mut self, doc: &mut MetadataDoc) -> Result<(), BuildError> {
        let path = self.path.clone();
        let xlsx_err = |e| BuildError::Xlsx(path.clone(), e);

        let meta = self.workbook.worksheet_from_name(META_SHEET).map_err(xlsx_err)?;
        for (line, row) in doc.to_rows().iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                meta.write_string(line as u32, col as u16, cell.as_str())
                    .map_err(xlsx_err)?;
            }
        }

        let tmp = self.path.with_extension("xlsx.tmp");
        self.workbook.save(&tmp).map_err(xlsx_err)?;
        fs::rename(&tmp, &self.path).map_err(|e| BuildError::Io(self.path.clone(), e))
    }
}
