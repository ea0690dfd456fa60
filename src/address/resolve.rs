//! Semantic resolution: from typed addresses to fetchable locations.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use url::Url;

use super::{Address, AddressError, DocAddress, Reference, ResourceAddress};
use crate::core::{Encoding, Locator};
use crate::debug;
use crate::index::SearchIndex;
use crate::metadata::{MetadataDoc, TERM_DATAFILE};
use crate::stream::RowStream;

// ============================================================================
// Resolver
// ============================================================================

/// Resolves typed addresses into concrete, fetchable locations.
///
/// Carries an optional borrowed [`SearchIndex`] for indirect references;
/// direct references resolve without one.
#[derive(Default)]
pub struct Resolver<'a> {
    index: Option<&'a SearchIndex>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self { index: None }
    }

    /// Attach a search index for resolving indirect references.
    pub fn with_index(index: &'a SearchIndex) -> Self {
        Self { index: Some(index) }
    }

    /// Resolve a parsed reference to a concrete address.
    ///
    /// Search references look up the best-ranked index match and recurse
    /// into the address it points at; a miss is fatal to the caller.
    pub fn resolve(&self, reference: &Reference) -> Result<Address, AddressError> {
        match reference {
            Reference::Direct(addr) => Ok(addr.clone()),
            Reference::Search { query, format } => {
                let entry = self
                    .index
                    .and_then(|index| index.best(query, *format))
                    .ok_or_else(|| AddressError::SearchUnresolved(query.clone()))?;
                debug!("resolve"; "index match for `{query}`: {} ({})", entry.url, entry.format);
                match super::parse(&entry.url)? {
                    Reference::Direct(addr) => Ok(addr),
                    // an index entry must never point at another search ref
                    Reference::Search { .. } => Err(AddressError::Malformed(entry.url)),
                }
            }
        }
    }

    /// Open and parse the metadata document a document address points at.
    pub fn open_metadata(&self, doc: &DocAddress) -> Result<MetadataDoc, AddressError> {
        let doc = doc.document_address();
        let Some(path) = doc.loc.as_path() else {
            return Err(AddressError::RemoteFetch(doc.loc.to_string()));
        };
        match doc.encoding {
            Encoding::Dir | Encoding::Csv | Encoding::Store | Encoding::Source => {
                MetadataDoc::read(path)
                    .map_err(|e| AddressError::Metadata(doc.loc.to_string(), e))
            }
            Encoding::Zip => {
                let bytes = read_zip_entry(path, &doc.target)?;
                let text = String::from_utf8_lossy(&bytes);
                MetadataDoc::from_csv_str(&text)
                    .map_err(|e| AddressError::Metadata(doc.loc.to_string(), e))
            }
            Encoding::Excel => {
                let (headers, mut rows) = read_sheet_rows(path, &doc.target)?;
                // the metadata sheet mirrors the CSV rows verbatim, so the
                // "header" row is just the first metadata row
                if let Some(headers) = headers {
                    rows.insert(0, headers);
                }
                Ok(MetadataDoc::from_rows(rows))
            }
        }
    }

    /// Resolve one named resource to a concrete fetchable location.
    pub fn resolve_resource(&self, addr: &ResourceAddress) -> Result<Resolved, AddressError> {
        let doc_addr = addr.document_address();
        let meta = self.open_metadata(&doc_addr)?;

        // explicitly named resources first, slugged-value fallbacks second
        let term = meta
            .find_first_with(TERM_DATAFILE, "name", &addr.resource)
            .or_else(|| {
                meta.resources()
                    .find(|t| t.resource_name() == addr.resource)
            })
            .or_else(|| {
                meta.references()
                    .find(|t| t.resource_name() == addr.resource)
            })
            .ok_or_else(|| AddressError::NoResource {
                package: doc_addr.loc.to_string(),
                name: addr.resource.clone(),
            })?;
        let value = term.value.clone();

        // absolute values resolve as-is, regardless of encoding;
        // file:// URLs decode back into streamable local paths
        if value.contains("://") {
            return match Locator::parse(&value)
                .map_err(|e| AddressError::Url(value.clone(), e))?
            {
                Locator::Path(path) => Ok(Resolved::Local(path)),
                Locator::Url(url) => Ok(Resolved::Remote(url)),
            };
        }

        let root = doc_addr.package_address().root;
        match doc_addr.encoding {
            // single-CSV packages must record absolute urls
            Encoding::Csv => Err(AddressError::RelativeInCsv {
                name: addr.resource.clone(),
                value,
            }),
            Encoding::Dir | Encoding::Store | Encoding::Source => {
                match root.join(&value) {
                    Locator::Path(path) => Ok(Resolved::Local(path)),
                    Locator::Url(url) => Ok(Resolved::Remote(url)),
                }
            }
            Encoding::Zip => {
                let archive = root
                    .as_path()
                    .ok_or_else(|| AddressError::RemoteFetch(root.to_string()))?;
                Ok(Resolved::ZipEntry {
                    archive: archive.to_path_buf(),
                    entry: value,
                })
            }
            Encoding::Excel => {
                let workbook = root
                    .as_path()
                    .ok_or_else(|| AddressError::RemoteFetch(root.to_string()))?;
                Ok(Resolved::Sheet {
                    workbook: workbook.to_path_buf(),
                    sheet: value,
                })
            }
        }
    }
}

// ============================================================================
// Resolved Locations
// ============================================================================

/// A concrete fetchable location for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Local file (CSV rows)
    Local(PathBuf),
    /// Absolute remote URL, returned verbatim
    Remote(Url),
    /// Entry inside a local zip archive
    ZipEntry { archive: PathBuf, entry: String },
    /// Sheet inside a local workbook
    Sheet { workbook: PathBuf, sheet: String },
}

impl Resolved {
    /// Stream the resource's rows.
    ///
    /// Remote locations are not streamed here; byte fetching belongs to
    /// the external fetch/cache layer.
    pub fn rows(&self) -> Result<RowStream, AddressError> {
        match self {
            Self::Local(path) => Ok(RowStream::from_csv_path(path)?),
            Self::Remote(url) => Err(AddressError::RemoteFetch(url.to_string())),
            Self::ZipEntry { archive, entry } => {
                let bytes = read_zip_entry(archive, entry)?;
                Ok(RowStream::from_csv_bytes(bytes)?)
            }
            Self::Sheet { workbook, sheet } => {
                let (headers, rows) = read_sheet_rows(workbook, sheet)?;
                Ok(RowStream::from_rows(headers, rows))
            }
        }
    }

    /// Render as an absolute URL (for single-CSV package metadata).
    pub fn absolute_url(&self) -> Result<String, AddressError> {
        match self {
            Self::Remote(url) => Ok(url.to_string()),
            Self::Local(path) => Locator::Path(path.clone())
                .to_absolute_url()
                .ok_or_else(|| AddressError::NotFetchable(path.display().to_string())),
            Self::ZipEntry { archive, .. } => {
                Err(AddressError::NotFetchable(archive.display().to_string()))
            }
            Self::Sheet { workbook, .. } => {
                Err(AddressError::NotFetchable(workbook.display().to_string()))
            }
        }
    }
}

// ============================================================================
// Container Readers
// ============================================================================

/// Read one entry out of a zip archive.
///
/// Built archives nest the package tree under one top-level folder, so an
/// entry matches either exactly or as a `<folder>/<entry>` suffix.
pub(crate) fn read_zip_entry(archive: &Path, entry: &str) -> Result<Vec<u8>, AddressError> {
    let display = archive.display().to_string();
    let file = File::open(archive).map_err(|e| AddressError::Io(display.clone(), e))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| AddressError::Zip(display.clone(), e))?;

    let suffix = format!("/{entry}");
    let name = zip
        .file_names()
        .find(|n| *n == entry || n.ends_with(&suffix))
        .map(str::to_string)
        .ok_or_else(|| {
            AddressError::Zip(display.clone(), zip::result::ZipError::FileNotFound)
        })?;

    let mut bytes = Vec::new();
    zip.by_name(&name)
        .map_err(|e| AddressError::Zip(display.clone(), e))?
        .read_to_end(&mut bytes)
        .map_err(|e| AddressError::Io(display, e))?;
    Ok(bytes)
}

/// Read one worksheet as string rows, splitting off the header row.
pub(crate) fn read_sheet_rows(
    workbook: &Path,
    sheet: &str,
) -> Result<(Option<Vec<String>>, Vec<Vec<String>>), AddressError> {
    let display = workbook.display().to_string();
    let mut book =
        open_workbook_auto(workbook).map_err(|e| AddressError::Workbook(display.clone(), e))?;
    let range = book
        .worksheet_range(sheet)
        .map_err(|e| AddressError::Workbook(display, e))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());
    let headers = rows.next();
    Ok((headers, rows.collect()))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 9e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        other => other.to_string(),
    }
}
