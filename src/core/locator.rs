//! Storage locator: a local path or a remote URL.
//!
//! Internal representation is always decoded and `~`-expanded; joining and
//! parent derivation keep the two shapes behind one API so address
//! derivations never branch on "is this a path or a URL".

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// A concrete storage location: either a local filesystem path or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Local filesystem path (tilde-expanded at parse time)
    Path(PathBuf),
    /// Remote URL (http, https, s3, ...)
    Url(Url),
}

impl Locator {
    /// Parse a raw locator string.
    ///
    /// `file://` URLs are percent-decoded into local paths; anything else
    /// with a `scheme://` prefix parses as a URL; everything else is a
    /// local path with `~` expanded.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        if let Some(rest) = raw.strip_prefix("file://") {
            let decoded = percent_encoding::percent_decode_str(rest).decode_utf8_lossy();
            Ok(Self::Path(PathBuf::from(decoded.as_ref())))
        } else if raw.contains("://") {
            Ok(Self::Url(Url::parse(raw)?))
        } else {
            let expanded = shellexpand::tilde(raw);
            Ok(Self::Path(PathBuf::from(expanded.as_ref())))
        }
    }

    /// The final path segment, if any.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Path(p) => p.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Url(u) => u
                .path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
                .filter(|s| !s.is_empty()),
        }
    }

    /// Lowercased file extension of the final segment, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }

    /// Append one path segment, returning a new locator.
    pub fn join(&self, segment: &str) -> Self {
        match self {
            Self::Path(p) => Self::Path(p.join(segment)),
            Self::Url(u) => {
                let mut base = u.clone();
                if !base.path().ends_with('/') {
                    let with_slash = format!("{}/", base.path());
                    base.set_path(&with_slash);
                }
                match base.join(segment) {
                    Ok(joined) => Self::Url(joined),
                    Err(_) => Self::Url(base),
                }
            }
        }
    }

    /// The containing location (parent directory / URL with the last
    /// segment dropped).
    pub fn parent(&self) -> Self {
        match self {
            Self::Path(p) => Self::Path(
                p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            Self::Url(u) => {
                let mut parent = u.clone();
                if let Ok(mut segments) = parent.path_segments_mut() {
                    segments.pop_if_empty().pop();
                }
                Self::Url(parent)
            }
        }
    }

    /// Whether the locator points outside the local filesystem.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Local path view, when this is a filesystem locator.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            Self::Url(_) => None,
        }
    }

    /// Render as an absolute URL string.
    ///
    /// Local paths are absolutized against the current directory and
    /// rendered as `file://` URLs; remote URLs render verbatim.
    pub fn to_absolute_url(&self) -> Option<String> {
        match self {
            Self::Url(u) => Some(u.to_string()),
            Self::Path(p) => {
                let abs = if p.is_absolute() {
                    p.clone()
                } else {
                    std::env::current_dir().ok()?.join(p)
                };
                Url::from_file_path(&abs).ok().map(|u| u.to_string())
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u.as_str()),
        }
    }
}
