//! Package addressing - unified model for every reference a consumer can
//! dereference.
//!
//! # Relationship between parsing and resolution
//!
//! - [`parse`]: **syntactic** classification (scheme, encoding, fragment;
//!   no I/O)
//! - [`Resolver`]: **semantic** resolution (opens metadata documents,
//!   consults the search index for indirect references)
//!
//! # Addressing model
//!
//! ```text
//! Reference string                 Typed address
//! ================                 =============
//! pkg/                        ->   Dir package, metadata pkg/metadata.csv
//! pkg/metadata.csv            ->   Dir package, same as above
//! pkg.csv                     ->   single-CSV package
//! pkg.xlsx#names              ->   resource `names` in an Excel package
//! pkg.zip#names               ->   resource `names` in a Zip package
//! index:example.com-names     ->   indirect, resolved via the SearchIndex
//! ```
//!
//! The central ambiguity is the implicit-append rule: a path without a
//! known single-file extension is a *directory* package and the default
//! metadata file name is appended. Every derivation in this module applies
//! that rule consistently; the inverse asymmetry is in
//! [`DocAddress::package_address`], where a directory package's root is
//! the *parent* of its metadata file while a single-file package's root
//! is the file itself.

mod parse;
mod resolve;

pub use parse::parse;
pub use resolve::{Resolved, Resolver};
pub(crate) use resolve::read_zip_entry;

use std::fmt;

use thiserror::Error;

use crate::core::{Encoding, Locator, META_SHEET, METADATA_FILE};
use crate::metadata::MetadataError;
use crate::stream::StreamError;

// ============================================================================
// Errors
// ============================================================================

/// Errors from parsing or resolving references.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("empty or malformed reference `{0}`")]
    Malformed(String),

    #[error("invalid url in reference `{0}`")]
    Url(String, #[source] url::ParseError),

    #[error(
        "package at `{package}` has no resource named `{name}` \
         (check the `#{name}` fragment against the package's declared resources)"
    )]
    NoResource { package: String, name: String },

    #[error(
        "resource `{name}` in a single-csv package must carry an absolute url, found `{value}`"
    )]
    RelativeInCsv { name: String, value: String },

    #[error("search reference `{0}` has no match in the index")]
    SearchUnresolved(String),

    #[error("cannot read metadata document at `{0}`")]
    Metadata(String, #[source] MetadataError),

    #[error("IO error reading `{0}`")]
    Io(String, #[source] std::io::Error),

    #[error("zip archive `{0}` cannot be read")]
    Zip(String, #[source] zip::result::ZipError),

    #[error("workbook `{0}` cannot be read")]
    Workbook(String, #[source] calamine::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("`{0}` is remote; byte fetching is delegated to the fetch/cache layer")]
    RemoteFetch(String),

    #[error("`{0}` cannot be rendered as an absolute fetchable url")]
    NotFetchable(String),
}

// ============================================================================
// Typed Addresses
// ============================================================================

/// Points at a package's metadata document.
///
/// `target` is the literal thing to open for this encoding: the metadata
/// file path itself (directory and single-CSV packages), the in-archive
/// entry name (zip), or the internal sheet name (excel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocAddress {
    pub loc: Locator,
    pub encoding: Encoding,
    pub target: String,
}

impl DocAddress {
    /// The canonical metadata document address for this package.
    pub fn document_address(&self) -> DocAddress {
        match self.encoding {
            // already targets the metadata file / is the metadata file
            Encoding::Dir | Encoding::Csv => self.clone(),
            Encoding::Excel => DocAddress {
                loc: self.loc.clone(),
                encoding: Encoding::Excel,
                target: META_SHEET.to_string(),
            },
            Encoding::Zip => DocAddress {
                loc: self.loc.clone(),
                encoding: Encoding::Zip,
                target: METADATA_FILE.to_string(),
            },
            Encoding::Store | Encoding::Source => DocAddress {
                loc: self.loc.join(METADATA_FILE),
                encoding: self.encoding,
                target: METADATA_FILE.to_string(),
            },
        }
    }

    /// The canonical package root.
    ///
    /// For directory packages the root is the *parent directory* of the
    /// metadata file; for single-file and archive packages the root is
    /// the address itself. Getting this backwards silently breaks
    /// relative-resource resolution for filesystem packages.
    pub fn package_address(&self) -> PackageAddress {
        match self.encoding {
            Encoding::Dir => PackageAddress {
                root: self.loc.parent(),
                encoding: Encoding::Dir,
            },
            _ => PackageAddress {
                root: self.loc.clone(),
                encoding: self.encoding,
            },
        }
    }

    /// Address one named resource inside this package.
    pub fn resource(&self, name: &str) -> ResourceAddress {
        ResourceAddress {
            doc: self.document_address(),
            resource: name.to_string(),
        }
    }
}

impl fmt::Display for DocAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.loc)
    }
}

/// Canonical fragment-free root of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageAddress {
    pub root: Locator,
    pub encoding: Encoding,
}

impl PackageAddress {
    /// Re-derive the metadata document address from the root.
    pub fn doc_address(&self) -> DocAddress {
        match self.encoding {
            Encoding::Dir | Encoding::Store | Encoding::Source => DocAddress {
                loc: self.root.join(METADATA_FILE),
                encoding: self.encoding,
                target: METADATA_FILE.to_string(),
            },
            Encoding::Csv => DocAddress {
                loc: self.root.clone(),
                encoding: Encoding::Csv,
                target: self.root.file_name().unwrap_or_default(),
            },
            Encoding::Excel => DocAddress {
                loc: self.root.clone(),
                encoding: Encoding::Excel,
                target: META_SHEET.to_string(),
            },
            Encoding::Zip => DocAddress {
                loc: self.root.clone(),
                encoding: Encoding::Zip,
                target: METADATA_FILE.to_string(),
            },
        }
    }

    /// Address one named resource inside this package.
    pub fn resource(&self, name: &str) -> ResourceAddress {
        self.doc_address().resource(name)
    }
}

impl fmt::Display for PackageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// A metadata document address plus a resource-name fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    pub doc: DocAddress,
    pub resource: String,
}

impl ResourceAddress {
    pub fn package_address(&self) -> PackageAddress {
        self.doc.package_address()
    }

    pub fn document_address(&self) -> DocAddress {
        self.doc.document_address()
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.doc, self.resource)
    }
}

// ============================================================================
// Address & Reference
// ============================================================================

/// A typed address: one of the three shapes a reference can resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Doc(DocAddress),
    Package(PackageAddress),
    Resource(ResourceAddress),
}

impl Address {
    /// The package root of any address shape.
    pub fn package_address(&self) -> PackageAddress {
        match self {
            Self::Doc(d) => d.package_address(),
            Self::Package(p) => p.clone(),
            Self::Resource(r) => r.package_address(),
        }
    }

    /// The metadata document address of any address shape.
    pub fn document_address(&self) -> DocAddress {
        match self {
            Self::Doc(d) => d.document_address(),
            Self::Package(p) => p.doc_address(),
            Self::Resource(r) => r.document_address(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doc(d) => d.fmt(f),
            Self::Package(p) => p.fmt(f),
            Self::Resource(r) => r.fmt(f),
        }
    }
}

/// A parsed reference: either a concrete address or an indirect search
/// reference that must be looked up through the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Direct(Address),
    Search {
        query: String,
        format: Option<Encoding>,
    },
}
