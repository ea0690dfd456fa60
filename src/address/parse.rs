//! Syntactic reference parsing: scheme and encoding classification.

use super::{Address, AddressError, DocAddress, Reference, ResourceAddress};
use crate::core::{Encoding, Locator, META_SHEET, METADATA_FILE};

/// Parse a raw reference string into a typed reference.
///
/// No I/O is performed; classification is purely syntactic. Encoding is
/// detected from the file extension of the last path segment, and
/// extensionless references are directory packages with the default
/// metadata file name implicitly appended.
pub fn parse(raw: &str) -> Result<Reference, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Malformed(raw.to_string()));
    }

    // indirect references go through the search index
    for scheme in ["index:", "search:"] {
        if let Some(query) = raw.strip_prefix(scheme) {
            if query.is_empty() {
                return Err(AddressError::Malformed(raw.to_string()));
            }
            return Ok(Reference::Search {
                query: query.to_string(),
                format: None,
            });
        }
    }

    let (base, fragment) = match raw.split_once('#') {
        Some((base, frag)) => (base, Some(frag)),
        None => (raw, None),
    };
    if base.is_empty() {
        return Err(AddressError::Malformed(raw.to_string()));
    }

    let loc = Locator::parse(base).map_err(|e| AddressError::Url(base.to_string(), e))?;
    let doc = classify(loc);

    match fragment {
        Some(name) if !name.is_empty() => Ok(Reference::Direct(Address::Resource(
            ResourceAddress {
                doc,
                resource: name.to_string(),
            },
        ))),
        _ => Ok(Reference::Direct(Address::Doc(doc))),
    }
}

/// Detect the physical encoding of a locator and derive its target file.
fn classify(loc: Locator) -> DocAddress {
    // a path ending in the default metadata file is a directory package
    // addressed by its metadata file, not a single-CSV package
    if loc.file_name().as_deref() == Some(METADATA_FILE) {
        return DocAddress {
            loc,
            encoding: Encoding::Dir,
            target: METADATA_FILE.to_string(),
        };
    }

    match loc.extension().as_deref() {
        Some("csv") => {
            let target = loc.file_name().unwrap_or_default();
            DocAddress {
                loc,
                encoding: Encoding::Csv,
                target,
            }
        }
        Some("xlsx") | Some("xls") => DocAddress {
            loc,
            encoding: Encoding::Excel,
            target: META_SHEET.to_string(),
        },
        Some("zip") => DocAddress {
            loc,
            encoding: Encoding::Zip,
            target: METADATA_FILE.to_string(),
        },
        _ => DocAddress {
            loc: loc.join(METADATA_FILE),
            encoding: Encoding::Dir,
            target: METADATA_FILE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_doc(raw: &str) -> DocAddress {
        match parse(raw).unwrap() {
            Reference::Direct(Address::Doc(d)) => d,
            other => panic!("expected doc address for `{raw}`, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_directory_appends_metadata_file() {
        let doc = direct_doc("packages/census");
        assert_eq!(doc.encoding, Encoding::Dir);
        assert_eq!(doc.loc, Locator::parse("packages/census/metadata.csv").unwrap());
        assert_eq!(doc.target, METADATA_FILE);
    }

    #[test]
    fn test_metadata_file_path_is_directory_package() {
        let doc = direct_doc("packages/census/metadata.csv");
        assert_eq!(doc.encoding, Encoding::Dir);
        assert_eq!(doc.loc, Locator::parse("packages/census/metadata.csv").unwrap());
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(direct_doc("pkg.csv").encoding, Encoding::Csv);
        assert_eq!(direct_doc("pkg.xlsx").encoding, Encoding::Excel);
        assert_eq!(direct_doc("pkg.XLS").encoding, Encoding::Excel);
        assert_eq!(direct_doc("pkg.zip").encoding, Encoding::Zip);
    }

    #[test]
    fn test_excel_targets_meta_sheet() {
        let doc = direct_doc("pkg.xlsx");
        assert_eq!(doc.target, META_SHEET);
    }

    #[test]
    fn test_fragment_names_a_resource() {
        let reference = parse("pkg.zip#random_names").unwrap();
        let Reference::Direct(Address::Resource(resource)) = reference else {
            panic!("expected resource address");
        };
        assert_eq!(resource.resource, "random_names");
        assert_eq!(resource.doc.encoding, Encoding::Zip);
    }

    #[test]
    fn test_search_reference() {
        let reference = parse("index:example.com-names").unwrap();
        assert_eq!(
            reference,
            Reference::Search {
                query: "example.com-names".to_string(),
                format: None,
            }
        );
        assert!(matches!(
            parse("search:example.com-names").unwrap(),
            Reference::Search { .. }
        ));
    }

    #[test]
    fn test_remote_reference() {
        let doc = direct_doc("https://example.com/builds/pkg.zip");
        assert_eq!(doc.encoding, Encoding::Zip);
        assert!(doc.loc.is_remote());
    }

    #[test]
    fn test_malformed_references() {
        assert!(matches!(parse(""), Err(AddressError::Malformed(_))));
        assert!(matches!(parse("index:"), Err(AddressError::Malformed(_))));
        assert!(matches!(parse("#frag"), Err(AddressError::Malformed(_))));
    }
}
