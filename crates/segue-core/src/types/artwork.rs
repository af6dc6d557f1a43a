//! Artwork images and the resolver contract.

use std::path::PathBuf;

use url::Url;

use crate::Result;

const INLINE_PREFIX: &str = "data:image/";
const FILE_PREFIX: &str = "file://";

/// A decoded artwork image in RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// The three kinds of artwork locators, told apart by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkLocator {
    /// `data:image/<fmt>;base64,<payload>`.
    Inline(String),
    /// `file://` URL converted to a path.
    File(PathBuf),
    /// Anything else is fetched over the network.
    Remote(String),
}

impl ArtworkLocator {
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with(INLINE_PREFIX) {
            return Self::Inline(raw.to_string());
        }
        if raw.starts_with(FILE_PREFIX) {
            let path = Url::parse(raw)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .unwrap_or_else(|| PathBuf::from(&raw[FILE_PREFIX.len()..]));
            return Self::File(path);
        }
        Self::Remote(raw.to_string())
    }
}

/// Turns an artwork locator into a decoded image.
///
/// Implementations may block (file and network I/O); callers run them off the
/// playback control thread.
pub trait ArtworkResolver: Send + Sync {
    fn resolve(&self, locator: &str) -> Result<Artwork>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(matches!(
            ArtworkLocator::classify("data:image/png;base64,AAAA"),
            ArtworkLocator::Inline(_)
        ));
        assert_eq!(
            ArtworkLocator::classify("file:///tmp/cover.jpg"),
            ArtworkLocator::File(PathBuf::from("/tmp/cover.jpg"))
        );
        assert_eq!(
            ArtworkLocator::classify("https://img.example.com/c.jpg"),
            ArtworkLocator::Remote("https://img.example.com/c.jpg".to_string())
        );
    }
}
