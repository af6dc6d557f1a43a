//! Validated audio locators.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{Error, Result};

/// Where the engine should load audio from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An `http` or `https` URL.
    Remote(Url),
}

impl Locator {
    /// Parse a raw locator string without touching the filesystem.
    ///
    /// Strings that are not URLs are treated as local paths; `file://` URLs
    /// are converted to paths. Only `http`, `https` and `file` schemes are
    /// accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidSource("empty locator".to_string()));
        }

        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => {
                    if url.host_str().map_or(true, str::is_empty) {
                        return Err(Error::InvalidSource(format!("missing host in '{raw}'")));
                    }
                    Ok(Self::Remote(url))
                }
                "file" => url
                    .to_file_path()
                    .map(Self::File)
                    .map_err(|()| Error::InvalidSource(format!("bad file URL '{raw}'"))),
                // Windows drive letters parse as one-letter schemes.
                scheme if scheme.len() == 1 => Ok(Self::File(PathBuf::from(raw))),
                scheme => Err(Error::InvalidSource(format!(
                    "unsupported scheme '{scheme}' in '{raw}'"
                ))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::File(PathBuf::from(raw))),
            Err(e) => Err(Error::InvalidSource(format!("'{raw}': {e}"))),
        }
    }

    /// Parse and check that a local file actually exists.
    ///
    /// Remote locators are accepted as-is; reachability is the engine's concern.
    pub fn resolve(raw: &str) -> Result<Self> {
        let locator = Self::parse(raw)?;
        if let Self::File(path) = &locator {
            if !path.is_file() {
                return Err(Error::FileNotFound(path.display().to_string()));
            }
        }
        Ok(locator)
    }

    /// Local path, if this is a file locator.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_remote() {
        let locator = Locator::parse("https://cdn.example.com/a.mp3").unwrap();
        assert!(locator.is_remote());
        assert_eq!(locator.to_string(), "https://cdn.example.com/a.mp3");
    }

    #[test]
    fn test_parse_plain_path() {
        let locator = Locator::parse("music/a.mp3").unwrap();
        assert_eq!(locator.as_path(), Some(Path::new("music/a.mp3")));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(Locator::parse(""), Err(Error::InvalidSource(_))));
        assert!(matches!(Locator::parse("http://"), Err(Error::InvalidSource(_))));
        assert!(matches!(
            Locator::parse("ftp://example.com/a.mp3"),
            Err(Error::InvalidSource(_))
        ));
    }

    #[test]
    fn test_resolve_missing_file() {
        let err = Locator::resolve("/definitely/not/here/a.mp3").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_resolve_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let raw = file.path().to_str().unwrap().to_string();
        let locator = Locator::resolve(&raw).unwrap();
        assert_eq!(locator.as_path(), Some(file.path()));

        let url = Url::from_file_path(file.path()).unwrap();
        assert_eq!(
            Locator::resolve(url.as_str()).unwrap().as_path(),
            Some(file.path())
        );
    }
}
