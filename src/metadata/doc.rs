//! The metadata document tree and its CSV row (de)serialization.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use super::{
    CANONICAL_ORDER, MetadataError, SECTION_REFERENCES, SECTION_RESOURCES, SECTION_ROOT, Section,
    TERM_DATAFILE, TERM_REFERENCE, Term,
};
use crate::core::PackageName;

/// Ordered sections of key/value terms describing one package.
///
/// Owned and mutated by the build pipeline; resolution code only performs
/// transient read-only lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataDoc {
    sections: Vec<Section>,
}

impl MetadataDoc {
    /// Create a document with a `Root` section holding the package name.
    pub fn new(name: &str) -> Self {
        let mut doc = Self::default();
        doc.new_term(SECTION_ROOT, "Name", name);
        doc
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// All sections in order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section by name (case-insensitive).
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// First term with the given name anywhere in the document.
    pub fn find_first(&self, term: &str) -> Option<&Term> {
        self.sections.iter().find_map(|s| s.find(term))
    }

    /// Value of the first term with the given name.
    pub fn find_first_value(&self, term: &str) -> Option<&str> {
        self.find_first(term).map(|t| t.value.as_str())
    }

    /// First term with the given name carrying `key=value` (both
    /// case-insensitive).
    pub fn find_first_with(&self, term: &str, key: &str, value: &str) -> Option<&Term> {
        self.sections.iter().flat_map(|s| &s.terms).find(|t| {
            t.term.eq_ignore_ascii_case(term)
                && t.prop(key).is_some_and(|v| v.eq_ignore_ascii_case(value))
        })
    }

    /// Declared tabular resources, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Term> {
        self.section(SECTION_RESOURCES)
            .map(|s| s.terms.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|t| t.term.eq_ignore_ascii_case(TERM_DATAFILE))
    }

    /// Declared references, in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &Term> {
        self.section(SECTION_REFERENCES)
            .map(|s| s.terms.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|t| t.term.eq_ignore_ascii_case(TERM_REFERENCE))
    }

    /// The package name term, parsed into its versioned parts.
    pub fn package_name(&self) -> Option<PackageName> {
        self.find_first_value("Name").map(PackageName::parse)
    }

    /// The package identifier term, when present.
    pub fn identifier(&self) -> Option<&str> {
        self.find_first_value("Identifier")
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Section by name, created at the end of the document if absent.
    pub fn ensure_section(&mut self, name: &str) -> &mut Section {
        if let Some(idx) = self
            .sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            &mut self.sections[idx]
        } else {
            self.sections.push(Section::new(name));
            self.sections.last_mut().unwrap()
        }
    }

    /// Append a new term to a section (creating the section if needed).
    pub fn new_term(&mut self, section: &str, term: &str, value: &str) -> &mut Term {
        let section = self.ensure_section(section);
        section.terms.push(Term::new(term, value));
        section.terms.last_mut().unwrap()
    }

    /// Remove every term with the given name, in any section.
    pub fn remove_term(&mut self, term: &str) {
        for section in &mut self.sections {
            section.terms.retain(|t| !t.term.eq_ignore_ascii_case(term));
        }
    }

    /// Rewrite the URL value of the named resource in place.
    ///
    /// Returns `false` when no resource with that name is declared.
    pub fn update_resource_url(&mut self, resource: &str, url: &str) -> bool {
        let Some(section) = self
            .sections
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(SECTION_RESOURCES))
        else {
            return false;
        };
        for term in &mut section.terms {
            if term.term.eq_ignore_ascii_case(TERM_DATAFILE) && term.resource_name() == resource {
                term.value = url.to_string();
                return true;
            }
        }
        false
    }

    /// Rewrite the value of the first matching term in a section.
    ///
    /// Matches on term name and current value; returns `false` when no
    /// such term exists.
    pub fn update_term_value(&mut self, section: &str, term: &str, old: &str, new: &str) -> bool {
        let Some(section) = self
            .sections
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(section))
        else {
            return false;
        };
        for t in &mut section.terms {
            if t.term.eq_ignore_ascii_case(term) && t.value == old {
                t.value = new.to_string();
                return true;
            }
        }
        false
    }

    /// Re-sort sections into canonical order; unknown sections keep their
    /// relative order after the known ones.
    pub fn sort_sections(&mut self) {
        let rank = |name: &str| {
            CANONICAL_ORDER
                .iter()
                .position(|s| s.eq_ignore_ascii_case(name))
                .unwrap_or(CANONICAL_ORDER.len())
        };
        self.sections.sort_by_key(|s| rank(&s.name));
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Flatten into CSV-shaped rows (`Section,<name>` headers between
    /// section bodies; the leading `Root` header is kept for symmetry).
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for section in &self.sections {
            rows.push(vec!["Section".to_string(), section.name.clone()]);
            for term in &section.terms {
                let mut row = vec![term.term.clone(), term.value.clone()];
                for (k, v) in &term.props {
                    row.push(format!("{k}={v}"));
                }
                rows.push(row);
            }
        }
        rows
    }

    /// Rebuild a document from CSV-shaped rows.
    ///
    /// Rows before the first `Section` header land in `Root`.
    pub fn from_rows<R>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<String>>,
    {
        let mut doc = Self::default();
        let mut current = SECTION_ROOT.to_string();
        for row in rows {
            let mut cells = row.into_iter();
            let Some(first) = cells.next() else { continue };
            if first.trim().is_empty() {
                continue;
            }
            if first.eq_ignore_ascii_case("section") {
                current = cells.next().unwrap_or_default();
                doc.ensure_section(&current);
                continue;
            }
            let value = cells.next().unwrap_or_default();
            let mut term = Term::new(first, value);
            for cell in cells {
                if cell.trim().is_empty() {
                    continue;
                }
                match cell.split_once('=') {
                    Some((k, v)) => term.props.push((k.to_string(), v.to_string())),
                    None => term.props.push((cell, String::new())),
                }
            }
            doc.ensure_section(&current).terms.push(term);
        }
        doc
    }

    /// Serialize to a CSV string.
    pub fn to_csv_string(&self) -> Result<String, MetadataError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in self.to_rows() {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| MetadataError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse from a CSV string.
    pub fn from_csv_str(text: &str) -> Result<Self, MetadataError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::from_rows(rows))
    }

    /// Read a document from a CSV file.
    pub fn read(path: &Path) -> Result<Self, MetadataError> {
        let text = fs::read_to_string(path)
            .map_err(|e| MetadataError::Io(path.to_path_buf(), e))?;
        Self::from_csv_str(&text)
    }

    /// Write the document to a CSV file.
    pub fn write(&self, path: &Path) -> Result<(), MetadataError> {
        let text = self.to_csv_string()?;
        fs::write(path, text).map_err(|e| MetadataError::Io(path.to_path_buf(), e))
    }

    /// JSON view of the document (section name → list of term objects).
    pub fn to_json(&self) -> Value {
        let mut root = serde_json::Map::new();
        for section in &self.sections {
            let terms: Vec<Value> = section
                .terms
                .iter()
                .map(|t| {
                    let mut obj = serde_json::Map::new();
                    obj.insert("term".into(), json!(t.term));
                    obj.insert("value".into(), json!(t.value));
                    for (k, v) in &t.props {
                        obj.insert(k.clone(), json!(v));
                    }
                    Value::Object(obj)
                })
                .collect();
            root.insert(section.name.clone(), Value::Array(terms));
        }
        Value::Object(root)
    }
}
