//! Versioned package names.
//!
//! Package identity names carry a trailing integer build version, e.g.
//! `example.com-random_names-3`. The non-versioned name (`example.com-
//! random_names`) identifies the package across builds and is what "get me
//! the latest" queries key on.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

// [0-9] rather than \d: the unicode-perl regex feature is not enabled
static VERSIONED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<nv>.+?)-(?P<ver>[0-9]+)$").unwrap());

/// A package name, split into its non-versioned stem and optional
/// trailing build version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName {
    name: String,
    non_versioned: String,
    version: Option<u64>,
}

impl PackageName {
    /// Parse a name, detecting a trailing `-<digits>` version suffix.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_string();
        match VERSIONED.captures(&name) {
            Some(caps) => {
                let non_versioned = caps["nv"].to_string();
                let version = caps["ver"].parse().ok();
                Self {
                    name: name.clone(),
                    non_versioned,
                    version,
                }
            }
            None => Self {
                non_versioned: name.clone(),
                name,
                version: None,
            },
        }
    }

    /// The full versioned name as given.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The name with the version suffix stripped.
    pub fn non_versioned(&self) -> &str {
        &self.non_versioned
    }

    /// The trailing build version, when present.
    pub fn version(&self) -> Option<u64> {
        self.version
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
