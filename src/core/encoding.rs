//! Physical package encodings and their fixed priority ranking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical container format of a package.
///
/// Addresses only ever parse into `Dir`, `Csv`, `Excel` or `Zip`; the
/// `Store` and `Source` variants exist so the search index can rank
/// object-store-hosted and unbuilt packages alongside built ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Directory tree: `<root>/metadata.csv` + `data/*` + `docs/*`
    Dir,
    /// Zip archive containing the directory tree under one top folder
    Zip,
    /// Excel workbook: `meta` sheet plus one sheet per resource
    Excel,
    /// Single CSV file holding only metadata, all resource URLs absolute
    Csv,
    /// Object-store-hosted directory tree
    Store,
    /// Source-only registry entry (not yet built)
    Source,
}

impl Encoding {
    /// Fixed priority rank; higher wins when a caller asks for "the"
    /// package without naming an encoding.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Dir => 60,
            Self::Zip => 50,
            Self::Excel => 40,
            Self::Csv => 30,
            Self::Store => 20,
            Self::Source => 10,
        }
    }

    /// Short lowercase tag used in the index file and log output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::Zip => "zip",
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Store => "store",
            Self::Source => "source",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dir" | "fs" | "directory" => Ok(Self::Dir),
            "zip" => Ok(Self::Zip),
            "excel" | "xlsx" | "xls" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "store" | "s3" => Ok(Self::Store),
            "source" => Ok(Self::Source),
            other => Err(format!("unknown encoding `{other}`")),
        }
    }
}
