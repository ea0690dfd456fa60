//! Terms and sections: the nodes of the metadata tree.

use crate::core::slugify;

/// One key/value term, with optional `key=value` properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Term name within its section (e.g. `Name`, `Datafile`, `Column`)
    pub term: String,
    /// Term value (URL, name, column header, ...)
    pub value: String,
    /// Ordered properties
    pub props: Vec<(String, String)>,
}

impl Term {
    /// Create a term with no properties.
    pub fn new(term: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            value: value.into(),
            props: Vec::new(),
        }
    }

    /// Builder-style property append.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.push((key.into(), value.into()));
        self
    }

    /// Look up a property by key (case-insensitive).
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this term carries the ignore-errors flag.
    pub fn ignore_errors(&self) -> bool {
        matches!(self.prop("ignore-errors"), Some("true") | Some("1") | Some("yes"))
    }

    /// The resource name for a `Datafile` term: the `name` property, or a
    /// slug of the value's file stem when no name was declared.
    pub fn resource_name(&self) -> String {
        if let Some(name) = self.prop("name") {
            return name.to_string();
        }
        let base = self
            .value
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.value);
        let stem = base.rsplit_once('.').map_or(base, |(s, _)| s);
        slugify(stem)
    }
}

/// One ordered section of terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    /// Section name (`Root`, `Resources`, ...)
    pub name: String,
    /// Terms in declaration order
    pub terms: Vec<Term>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terms: Vec::new(),
        }
    }

    /// First term with the given name (case-insensitive).
    pub fn find(&self, term: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.term.eq_ignore_ascii_case(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_lookup_is_case_insensitive() {
        let term = Term::new("Datafile", "data/x.csv").with_prop("Name", "x");
        assert_eq!(term.prop("name"), Some("x"));
        assert_eq!(term.prop("missing"), None);
    }

    #[test]
    fn test_resource_name_falls_back_to_value_stem() {
        let named = Term::new("Datafile", "data/x.csv").with_prop("name", "random_names");
        assert_eq!(named.resource_name(), "random_names");

        let unnamed = Term::new("Datafile", "data/Random Names.csv");
        assert_eq!(unnamed.resource_name(), "random-names");
    }

    #[test]
    fn test_ignore_errors_flag() {
        let flagged = Term::new("Datafile", "x.csv").with_prop("ignore-errors", "true");
        assert!(flagged.ignore_errors());
        let plain = Term::new("Datafile", "x.csv");
        assert!(!plain.ignore_errors());
    }
}
