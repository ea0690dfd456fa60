//! The package build pipeline.
//!
//! One [`Builder`] invocation materializes a source package into a
//! destination encoding: resolve each declared resource, stream its rows
//! through the casting layer, hand the bytes to the destination's
//! [`EncodingWriter`], rewrite the resource URL in the working metadata
//! document, and checkpoint. The pipeline is a linear stage machine,
//! driven once, synchronously:
//!
//! ```text
//! Init -> DeclarationsLoaded -> DocumentationLoaded -> ResourcesLoaded
//!      -> AuxFilesLoaded -> MetadataWritten -> IndexRebuilt -> Done
//! ```
//!
//! Builds are idempotent across invocations: a destination artifact newer
//! than the source metadata document is skipped outright. There is no
//! locking between concurrent builds of the same destination.

pub mod summary;
mod writers;

pub use writers::{
    CsvWriter, DirWriter, EncodingWriter, ExcelWriter, FsStore, LoadedResource, RemoteStore,
    StoreWriter, ZipWriter, writer_for,
};

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use jwalk::WalkDir;
use thiserror::Error;

use crate::address::{Address, AddressError, DocAddress, PackageAddress, Resolver, read_zip_entry};
use crate::core::{DATA_DIR, DOCS_DIR, Encoding, Locator, METADATA_FILE};
use crate::freshness::{get_mtime, is_fresh};
use crate::index::{IndexError, SearchIndex, default_path};
use crate::metadata::{
    MetadataDoc, MetadataError, SECTION_DOCUMENTATION, SECTION_ROOT, SECTION_SCHEMA, TERM_FIELD,
    Term,
};
use crate::stream::{self, Caster, RowStream, Schema, StreamError};
use crate::{debug, log};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the build pipeline and the encoding writers.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("package metadata has no `Name` term; add one to the Root section")]
    MissingName,

    #[error("`{0}` is not a buildable destination encoding")]
    Unbuildable(Encoding),

    #[error("resource `{name}` failed to load")]
    Resource {
        name: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("resource `{0}` has no header row and no declared schema")]
    MissingHeaders(String),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("csv write error")]
    Csv(#[from] csv::Error),

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("zip write error on `{0}`")]
    Zip(PathBuf, #[source] zip::result::ZipError),

    #[error("workbook write error on `{0}`")]
    Xlsx(PathBuf, #[source] rust_xlsxwriter::XlsxError),

    #[error("summary generation failed: {0}")]
    Summary(String),
}

// ============================================================================
// Stages, Options, Report
// ============================================================================

/// Linear pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    DeclarationsLoaded,
    DocumentationLoaded,
    ResourcesLoaded,
    AuxFilesLoaded,
    MetadataWritten,
    IndexRebuilt,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Init => "init",
            Self::DeclarationsLoaded => "declarations loaded",
            Self::DocumentationLoaded => "documentation loaded",
            Self::ResourcesLoaded => "resources loaded",
            Self::AuxFilesLoaded => "aux files loaded",
            Self::MetadataWritten => "metadata written",
            Self::IndexRebuilt => "index rebuilt",
            Self::Done => "done",
        };
        f.write_str(tag)
    }
}

/// Per-invocation build configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Accumulated cast errors past this count abort the resource
    pub cast_ceiling: usize,
    /// Treat every resource as if it carried `ignore-errors`
    pub ignore_errors: bool,
    /// Rebuild even when the destination is fresh
    pub force: bool,
    /// Upsert the finished build into the search index
    pub update_index: bool,
    /// Explicit index location; the environment default otherwise
    pub index_path: Option<PathBuf>,
    /// Lookahead rows sampled for schema intuition
    pub sample_rows: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cast_ceiling: stream::DEFAULT_CAST_CEILING,
            ignore_errors: false,
            force: false,
            update_index: false,
            index_path: None,
            sample_rows: 100,
        }
    }
}

/// One per-target outcome in the build log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildAction {
    Written { target: String, rows: u64 },
    Skipped { target: String, reason: String },
}

/// What a finished (or skipped) build produced.
#[derive(Debug)]
pub struct BuildReport {
    /// Address of the destination package
    pub address: PackageAddress,
    /// Per-target actions in execution order
    pub log: Vec<BuildAction>,
    /// Whether the whole build was skipped as fresh
    pub skipped: bool,
}

// ============================================================================
// Builder
// ============================================================================

/// Builds one package into one destination encoding.
///
/// Concurrent builds of the same destination are not locked against each
/// other; callers that need exclusion must serialize externally.
pub struct Builder {
    source: Address,
    dest: PathBuf,
    encoding: Encoding,
    options: BuildOptions,
}

impl Builder {
    pub fn new(source: Address, dest: &Path, encoding: Encoding, options: BuildOptions) -> Self {
        Self {
            source,
            dest: dest.to_path_buf(),
            encoding,
            options,
        }
    }

    /// Run the pipeline to completion.
    pub fn build(self) -> Result<BuildReport, BuildError> {
        enter(Stage::Init);
        let resolver = Resolver::new();
        let doc_addr = self.source.document_address();
        let source_doc = resolver.open_metadata(&doc_addr)?;
        let name = source_doc.package_name().ok_or(BuildError::MissingName)?;
        let name = name.as_str().to_string();

        // cross-invocation skip: destination strictly newer than the
        // source metadata document
        let artifact = artifact_path(&self.dest, self.encoding, &name);
        let source_mtime = doc_addr.loc.as_path().and_then(get_mtime);
        if !self.options.force && is_fresh(get_mtime(&artifact), source_mtime) {
            log!("build"; "{name} -> {} is up to date, skipping", self.encoding);
            return Ok(BuildReport {
                address: self.dest_address(&name),
                log: vec![BuildAction::Skipped {
                    target: name,
                    reason: "destination is newer than the source metadata".to_string(),
                }],
                skipped: true,
            });
        }

        let mut working = source_doc.clone();
        let mut log = Vec::new();
        let mut writer = writer_for(self.encoding, &self.dest, &name)?;
        log!("build"; "building {name} -> {} at {}", self.encoding, writer.destination());
        enter(Stage::DeclarationsLoaded);

        let src_root = local_source_root(&doc_addr);
        let doc_sources = self.load_documentation(
            writer.as_mut(),
            &doc_addr,
            &source_doc,
            &mut working,
            &src_root,
            &mut log,
        )?;
        enter(Stage::DocumentationLoaded);

        self.load_resources(
            writer.as_mut(),
            &resolver,
            &doc_addr,
            &source_doc,
            &mut working,
            &mut log,
        )?;
        enter(Stage::ResourcesLoaded);

        self.load_aux_files(writer.as_mut(), &src_root, &doc_sources, &mut log)?;
        enter(Stage::AuxFilesLoaded);

        // finalize: stamp the issue time, canonical sort, seal the artifact
        working.remove_term("Issued");
        working.new_term(SECTION_ROOT, "Issued", &Utc::now().to_rfc3339());
        working.sort_sections();
        writer.finish(&mut working)?;
        enter(Stage::MetadataWritten);

        if self.options.update_index {
            let path = self.options.index_path.clone().unwrap_or_else(default_path);
            let mut index = SearchIndex::open_at(&path)?;
            index.add(&working, self.encoding, &writer.destination());
            index.write()?;
            log!("index"; "indexed {name} ({}) at {}", self.encoding, writer.destination());
        }
        enter(Stage::IndexRebuilt);

        enter(Stage::Done);
        Ok(BuildReport {
            address: self.dest_address(&name),
            log,
            skipped: false,
        })
    }

    fn dest_address(&self, name: &str) -> PackageAddress {
        let root = match self.encoding {
            Encoding::Dir | Encoding::Store => self.dest.join(name),
            _ => artifact_path(&self.dest, self.encoding, name),
        };
        PackageAddress {
            root: Locator::Path(root),
            encoding: self.encoding,
        }
    }

    /// Copy documentation files from the source package into the
    /// destination and rewrite their term values. Directory sources read
    /// from disk, archive sources extract their entries; an unreadable
    /// source is logged as skipped rather than carried over dangling.
    /// Returns the set of copied source paths so the aux walk does not
    /// copy them twice.
    fn load_documentation(
        &self,
        writer: &mut dyn EncodingWriter,
        doc_addr: &DocAddress,
        source_doc: &MetadataDoc,
        working: &mut MetadataDoc,
        src_root: &Option<PathBuf>,
        log: &mut Vec<BuildAction>,
    ) -> Result<HashSet<PathBuf>, BuildError> {
        let mut copied = HashSet::new();
        let Some(section) = source_doc.section(SECTION_DOCUMENTATION) else {
            return Ok(copied);
        };

        for term in section.terms.clone() {
            if term.value.is_empty() || term.value.contains("://") {
                continue;
            }
            let Some(bytes) = read_doc_bytes(doc_addr, src_root, &term.value)? else {
                log.push(BuildAction::Skipped {
                    target: term.value.clone(),
                    reason: "documentation source not found".to_string(),
                });
                continue;
            };
            let Some(file_name) = Path::new(&term.value)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            if let Some(rel) = writer.copy_doc(&file_name, &bytes)? {
                working.update_term_value(SECTION_DOCUMENTATION, &term.term, &term.value, &rel);
                copied.insert(PathBuf::from(&term.value));
                log.push(BuildAction::Written {
                    target: rel,
                    rows: 0,
                });
            }
        }
        Ok(copied)
    }

    fn load_resources(
        &self,
        writer: &mut dyn EncodingWriter,
        resolver: &Resolver<'_>,
        doc_addr: &DocAddress,
        source_doc: &MetadataDoc,
        working: &mut MetadataDoc,
        log: &mut Vec<BuildAction>,
    ) -> Result<(), BuildError> {
        let resources: Vec<_> = source_doc.resources().cloned().collect();
        for term in resources {
            let name = term.resource_name();
            match load_one(writer, resolver, doc_addr, source_doc, &name, &self.options) {
                Ok((loaded, intuited)) => {
                    if let Some(schema) = intuited {
                        record_schema(working, &name, &schema);
                    }
                    working.update_resource_url(&name, &loaded.url);
                    log.push(BuildAction::Written {
                        target: name,
                        rows: loaded.rows,
                    });
                    writer.checkpoint(working)?;
                }
                Err(e) if self.options.ignore_errors || term.ignore_errors() => {
                    log!("build"; "skipping resource {name}: {e}");
                    log.push(BuildAction::Skipped {
                        target: name,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(BuildError::Resource {
                        name,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(())
    }

    /// Copy everything else in a local source tree verbatim, minus the
    /// generated artifacts and what earlier stages already handled.
    fn load_aux_files(
        &self,
        writer: &mut dyn EncodingWriter,
        src_root: &Option<PathBuf>,
        doc_sources: &HashSet<PathBuf>,
        log: &mut Vec<BuildAction>,
    ) -> Result<(), BuildError> {
        let Some(root) = src_root else {
            return Ok(());
        };
        for entry in WalkDir::new(root).sort(true) {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if rel.starts_with(DATA_DIR) || rel.starts_with(DOCS_DIR) {
                continue;
            }
            if matches!(
                rel.to_str(),
                Some(METADATA_FILE) | Some("metadata.json") | Some("index.html")
            ) {
                continue;
            }
            if doc_sources.contains(rel) {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| BuildError::Io(path.clone(), e))?;
            if writer.copy_aux(rel, &bytes)? {
                log.push(BuildAction::Written {
                    target: rel.display().to_string(),
                    rows: 0,
                });
            }
        }
        Ok(())
    }
}

fn enter(stage: Stage) {
    debug!("build"; "stage: {stage}");
}

/// Destination artifact whose mtime drives the freshness skip.
fn artifact_path(dest: &Path, encoding: Encoding, name: &str) -> PathBuf {
    match encoding {
        Encoding::Dir | Encoding::Store => dest.join(name).join(METADATA_FILE),
        Encoding::Csv => dest.join(format!("{name}.csv")),
        Encoding::Excel => dest.join(format!("{name}.xlsx")),
        Encoding::Zip => dest.join(format!("{name}.zip")),
        Encoding::Source => dest.join(name),
    }
}

/// Read one documentation file out of the source package.
///
/// `None` means the file is not present (or the source encoding carries
/// no loose files at all); the caller logs it as skipped.
fn read_doc_bytes(
    doc_addr: &DocAddress,
    src_root: &Option<PathBuf>,
    value: &str,
) -> Result<Option<Vec<u8>>, BuildError> {
    match doc_addr.encoding {
        Encoding::Dir => {
            let Some(root) = src_root else {
                return Ok(None);
            };
            let path = root.join(value);
            if !path.is_file() {
                return Ok(None);
            }
            fs::read(&path)
                .map(Some)
                .map_err(|e| BuildError::Io(path, e))
        }
        Encoding::Zip => {
            let Some(archive) = doc_addr.loc.as_path() else {
                return Ok(None);
            };
            Ok(read_zip_entry(archive, value).ok())
        }
        _ => Ok(None),
    }
}

/// The source package root as a local directory, when it is one.
fn local_source_root(doc_addr: &DocAddress) -> Option<PathBuf> {
    if doc_addr.encoding != Encoding::Dir {
        return None;
    }
    let root = doc_addr.package_address().root;
    let path = root.as_path()?;
    path.is_dir().then(|| path.to_path_buf())
}

/// Schema declared in the source document for one resource, if any.
fn declared_schema(doc: &MetadataDoc, resource: &str) -> Option<Schema> {
    let section = doc.section(SECTION_SCHEMA)?;
    let pairs: Vec<(String, String)> = section
        .terms
        .iter()
        .filter(|t| {
            t.term.eq_ignore_ascii_case(TERM_FIELD)
                && t.prop("resource").is_some_and(|r| r == resource)
        })
        .map(|t| {
            (
                t.value.clone(),
                t.prop("type").unwrap_or("text").to_string(),
            )
        })
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(Schema::from_pairs(pairs))
    }
}

/// Append intuited schema columns to the working document.
fn record_schema(working: &mut MetadataDoc, resource: &str, schema: &Schema) {
    let section = working.ensure_section(SECTION_SCHEMA);
    for column in &schema.columns {
        let term = Term::new(TERM_FIELD, column.name.as_str())
            .with_prop("type", column.datatype.to_string())
            .with_prop("resource", resource);
        section.terms.push(term);
    }
}

/// Resolve and materialize one resource. Returns the intuited schema
/// alongside, so the caller records it only on success.
fn load_one(
    writer: &mut dyn EncodingWriter,
    resolver: &Resolver<'_>,
    doc_addr: &DocAddress,
    source_doc: &MetadataDoc,
    name: &str,
    options: &BuildOptions,
) -> Result<(LoadedResource, Option<Schema>), BuildError> {
    let resolved = resolver.resolve_resource(&doc_addr.resource(name))?;

    if !writer.copies_rows() {
        let mut rows = RowStream::from_rows(None, Vec::new());
        let mut caster = Caster::passthrough();
        let loaded = writer.load_resource(name, &resolved, &mut rows, &mut caster)?;
        return Ok((loaded, None));
    }

    let mut rows = resolved.rows()?;
    let (schema, intuited) = match declared_schema(source_doc, name) {
        Some(schema) => (schema, None),
        None => {
            let headers = rows.headers().map(<[String]>::to_vec).unwrap_or_default();
            if headers.is_empty() {
                return Err(BuildError::MissingHeaders(name.to_string()));
            }
            let sample = rows.sample(options.sample_rows)?;
            let schema = stream::intuit(&headers, &sample);
            (schema.clone(), Some(schema))
        }
    };
    let mut caster = Caster::new(schema, options.cast_ceiling);
    let loaded = writer.load_resource(name, &resolved, &mut rows, &mut caster)?;
    for (column, errors) in caster.errors() {
        log!("build"; "resource {name}, column {column}: {} cast errors", errors.len());
    }
    Ok((loaded, intuited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Reference, Resolved, parse};
    use crate::metadata::{SECTION_RESOURCES, TERM_DATAFILE};
    use std::io::Read;

    const PKG: &str = "example.com-random_names-1";

    fn write_source(root: &Path, rows: usize) {
        fs::create_dir_all(root.join(DATA_DIR)).unwrap();
        let mut doc = MetadataDoc::new(PKG);
        doc.new_term(SECTION_ROOT, "Identifier", "d3c7a8f2");
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/random-names.csv")
            .props
            .push(("name".into(), "random_names".into()));
        doc.write(&root.join(METADATA_FILE)).unwrap();

        let mut body = String::from("id,name\n");
        for i in 1..=rows {
            body.push_str(&format!("{i},name {i}\n"));
        }
        fs::write(root.join("data/random-names.csv"), body).unwrap();
    }

    fn source_address(root: &Path) -> Address {
        match parse(&root.display().to_string()).unwrap() {
            Reference::Direct(addr) => addr,
            other => panic!("expected direct address, got {other:?}"),
        }
    }

    fn count_rows(resolved: &Resolved) -> usize {
        let mut rows = resolved.rows().unwrap();
        let mut count = 0;
        while let Some(row) = rows.next_row() {
            row.unwrap();
            count += 1;
        }
        count
    }

    #[test]
    fn test_dir_build_writes_tree_and_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 10);

        let report = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        assert!(!report.skipped);
        let root = dest.join(PKG);
        assert!(root.join("data/random-names.csv").exists());
        assert!(root.join("metadata.json").exists());
        assert!(root.join("index.html").exists());

        let built = MetadataDoc::read(&root.join(METADATA_FILE)).unwrap();
        assert_eq!(
            built.resources().next().unwrap().value,
            "data/random-names.csv"
        );
        assert!(built.find_first_value("Issued").is_some());
        // intuited schema landed in the document: id integer, name text
        let fields: Vec<_> = built.section(SECTION_SCHEMA).unwrap().terms.clone();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value, "id");
        assert_eq!(fields[0].prop("type"), Some("integer"));
        assert_eq!(fields[1].prop("type"), Some("text"));
    }

    #[test]
    fn test_zip_build_roundtrips_100_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 100);

        Builder::new(
            source_address(&src),
            &dest,
            Encoding::Zip,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let archive_path = dest.join(format!("{PKG}.zip"));
        let file = fs::File::open(&archive_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive
            .by_name(&format!("{PKG}/data/random-names.csv"))
            .unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert_eq!(text.lines().count(), 101);
        drop(entry);

        // and through the resolver, fragment-addressed
        let reference = format!("{}#random_names", archive_path.display());
        let Reference::Direct(Address::Resource(addr)) = parse(&reference).unwrap() else {
            panic!("expected resource address");
        };
        let resolved = Resolver::new().resolve_resource(&addr).unwrap();
        assert_eq!(count_rows(&resolved), 100);
    }

    #[test]
    fn test_excel_build_roundtrips_through_sheets() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 25);

        Builder::new(
            source_address(&src),
            &dest,
            Encoding::Excel,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let workbook = dest.join(format!("{PKG}.xlsx"));
        let reference = format!("{}#random_names", workbook.display());
        let Reference::Direct(Address::Resource(addr)) = parse(&reference).unwrap() else {
            panic!("expected resource address");
        };
        let resolver = Resolver::new();
        let built = resolver.open_metadata(&addr.document_address()).unwrap();
        assert_eq!(built.resources().next().unwrap().value, "random-names");

        let resolved = resolver.resolve_resource(&addr).unwrap();
        let mut rows = resolved.rows().unwrap();
        assert_eq!(rows.headers().unwrap(), &["id", "name"]);
        let mut count = 0;
        while let Some(row) = rows.next_row() {
            row.unwrap();
            count += 1;
        }
        assert_eq!(count, 25);
    }

    #[test]
    fn test_csv_build_absolutizes_urls_and_copies_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 5);

        let report = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Csv,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let built = MetadataDoc::read(&dest.join(format!("{PKG}.csv"))).unwrap();
        let value = &built.resources().next().unwrap().value;
        assert!(value.starts_with("file://"), "expected absolute url, got {value}");

        // the absolute url resolves back to the original rows
        let reference = format!("{}#random_names", dest.join(format!("{PKG}.csv")).display());
        let Reference::Direct(Address::Resource(addr)) = parse(&reference).unwrap() else {
            panic!("expected resource address");
        };
        let resolved = Resolver::new().resolve_resource(&addr).unwrap();
        assert_eq!(count_rows(&resolved), 5);
        assert!(
            report
                .log
                .iter()
                .any(|a| matches!(a, BuildAction::Written { rows: 0, .. }))
        );
        // nothing but the metadata file lands at the destination
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);
    }

    #[test]
    fn test_store_build_records_distributions() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("store");
        write_source(&src, 5);

        Builder::new(
            source_address(&src),
            &dest,
            Encoding::Store,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let root = dest.join(PKG);
        assert!(root.join("data/random-names.csv").exists());
        let built = MetadataDoc::read(&root.join(METADATA_FILE)).unwrap();
        let distributions: Vec<_> = built
            .section(SECTION_ROOT)
            .unwrap()
            .terms
            .iter()
            .filter(|t| t.term == "Distribution")
            .collect();
        assert!(!distributions.is_empty());
    }

    #[test]
    fn test_fresh_destination_skips_and_stale_rebuilds() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 5);

        let build = || {
            Builder::new(
                source_address(&src),
                &dest,
                Encoding::Dir,
                BuildOptions::default(),
            )
            .build()
            .unwrap()
        };

        assert!(!build().skipped);

        // age the source so the destination reads as fresh
        let meta = src.join(METADATA_FILE);
        filetime::set_file_mtime(&meta, filetime::FileTime::from_unix_time(1_000, 0)).unwrap();
        assert!(build().skipped);

        // touch the source into the future and the build runs again
        filetime::set_file_mtime(&meta, filetime::FileTime::from_unix_time(4_102_444_800, 0))
            .unwrap();
        assert!(!build().skipped);
    }

    #[test]
    fn test_missing_name_fails_before_touching_the_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();
        let mut doc = MetadataDoc::default();
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/x.csv");
        doc.write(&src.join(METADATA_FILE)).unwrap();

        let err = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, BuildError::MissingName));
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_cast_ceiling_aborts_the_resource_not_its_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fs::create_dir_all(src.join(DATA_DIR)).unwrap();

        let mut doc = MetadataDoc::new("example.com-mixed-1");
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/bad.csv")
            .props
            .push(("name".into(), "bad".into()));
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/good.csv")
            .props
            .push(("name".into(), "good".into()));
        // pin the bad resource's column to integer so every row miscasts
        doc.new_term(SECTION_SCHEMA, TERM_FIELD, "id")
            .props
            .extend([
                ("type".to_string(), "integer".to_string()),
                ("resource".to_string(), "bad".to_string()),
            ]);
        doc.write(&src.join(METADATA_FILE)).unwrap();
        fs::write(src.join("data/bad.csv"), "id\nx\ny\nz\nw\n").unwrap();
        fs::write(src.join("data/good.csv"), "id\n1\n2\n").unwrap();

        let options = BuildOptions {
            cast_ceiling: 2,
            ..Default::default()
        };

        let err = Builder::new(source_address(&src), &dest, Encoding::Dir, options.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Resource { ref name, .. } if name == "bad"));

        // with the ignore flag the sibling still builds
        let options = BuildOptions {
            ignore_errors: true,
            force: true,
            ..options
        };
        let report = Builder::new(source_address(&src), &dest, Encoding::Dir, options)
            .build()
            .unwrap();
        assert!(report.log.iter().any(
            |a| matches!(a, BuildAction::Skipped { target, .. } if target == "bad")
        ));
        assert!(report.log.iter().any(
            |a| matches!(a, BuildAction::Written { target, rows: 2 } if target == "good")
        ));
        assert!(dest.join("example.com-mixed-1/data/good.csv").exists());
    }

    #[test]
    fn test_headerless_resource_without_schema_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fs::create_dir_all(src.join(DATA_DIR)).unwrap();

        let mut doc = MetadataDoc::new("example.com-empty-1");
        doc.new_term(SECTION_RESOURCES, TERM_DATAFILE, "data/empty.csv")
            .props
            .push(("name".into(), "empty".into()));
        doc.write(&src.join(METADATA_FILE)).unwrap();
        fs::write(src.join("data/empty.csv"), "").unwrap();

        let err = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap_err();

        let (name, source) = match err {
            BuildError::Resource { name, source } => (name, source),
            other => panic!("expected resource error, got {other:?}"),
        };
        assert_eq!(name, "empty");
        assert!(matches!(*source, BuildError::MissingHeaders(ref r) if r == "empty"));

        // a declared schema makes the same file buildable
        let mut doc = MetadataDoc::read(&src.join(METADATA_FILE)).unwrap();
        doc.new_term(SECTION_SCHEMA, TERM_FIELD, "id").props.extend([
            ("type".to_string(), "integer".to_string()),
            ("resource".to_string(), "empty".to_string()),
        ]);
        doc.write(&src.join(METADATA_FILE)).unwrap();
        let report = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap();
        assert!(report.log.iter().any(
            |a| matches!(a, BuildAction::Written { target, rows: 0 } if target == "empty")
        ));
    }

    #[test]
    fn test_zip_source_rebuild_extracts_documentation() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let archived = tmp.path().join("archived");
        let unpacked = tmp.path().join("unpacked");
        write_source(&src, 3);
        fs::write(src.join("README.md"), "# readme\n").unwrap();

        let mut doc = MetadataDoc::read(&src.join(METADATA_FILE)).unwrap();
        doc.new_term(SECTION_DOCUMENTATION, "Page", "README.md");
        doc.write(&src.join(METADATA_FILE)).unwrap();

        Builder::new(
            source_address(&src),
            &archived,
            Encoding::Zip,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        // the archive is itself a buildable source, docs included
        let archive_path = archived.join(format!("{PKG}.zip"));
        Builder::new(
            source_address(&archive_path),
            &unpacked,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let root = unpacked.join(PKG);
        assert_eq!(
            fs::read_to_string(root.join("docs/README.md")).unwrap(),
            "# readme\n"
        );
        let built = MetadataDoc::read(&root.join(METADATA_FILE)).unwrap();
        let page = built.section(SECTION_DOCUMENTATION).unwrap().terms[0].clone();
        assert_eq!(page.value, "docs/README.md");
    }

    #[test]
    fn test_build_updates_the_index() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        let index_path = tmp.path().join("index.json");
        write_source(&src, 3);

        let options = BuildOptions {
            update_index: true,
            index_path: Some(index_path.clone()),
            ..Default::default()
        };
        Builder::new(source_address(&src), &dest, Encoding::Dir, options)
            .build()
            .unwrap();

        let index = SearchIndex::open_at(&index_path).unwrap();
        let best = index.best("example.com-random_names", None).unwrap();
        assert_eq!(best.format, Encoding::Dir);
        assert_eq!(best.url, dest.join(PKG).display().to_string());
    }

    #[test]
    fn test_docs_and_aux_files_are_carried_over() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        write_source(&src, 2);
        fs::write(src.join("README.md"), "# readme\n").unwrap();
        fs::write(src.join("LICENSE"), "MIT\n").unwrap();

        let mut doc = MetadataDoc::read(&src.join(METADATA_FILE)).unwrap();
        doc.new_term(SECTION_DOCUMENTATION, "Page", "README.md");
        doc.write(&src.join(METADATA_FILE)).unwrap();

        let report = Builder::new(
            source_address(&src),
            &dest,
            Encoding::Dir,
            BuildOptions::default(),
        )
        .build()
        .unwrap();

        let root = dest.join(PKG);
        assert!(root.join("docs/README.md").exists());
        assert!(root.join("LICENSE").exists());
        // the documentation source is not duplicated at the package root
        assert!(!root.join("README.md").exists());

        let built = MetadataDoc::read(&root.join(METADATA_FILE)).unwrap();
        let page = built.section(SECTION_DOCUMENTATION).unwrap().terms[0].clone();
        assert_eq!(page.value, "docs/README.md");
        assert!(
            report
                .log
                .iter()
                .any(|a| matches!(a, BuildAction::Written { target, .. } if target == "LICENSE"))
        );
    }
}
