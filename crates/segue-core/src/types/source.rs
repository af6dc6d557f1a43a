//! Audio source records held by the playlist.

use serde::{Deserialize, Serialize};

/// A single playable entry.
///
/// `audio_id` is the identity key: the playlist never holds two sources with
/// the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AudioSource {
    /// Stable, caller-assigned identifier.
    pub audio_id: String,
    /// Local path, `file://` URL, or remote URL of the audio.
    pub source: String,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Album title (if known).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    /// Artwork locator: inline `data:image/...`, `file://` or remote URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_source: Option<String>,
}

impl AudioSource {
    pub fn new(
        audio_id: impl Into<String>,
        source: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            audio_id: audio_id.into(),
            source: source.into(),
            title: title.into(),
            artist: artist.into(),
            album_title: None,
            artwork_source: None,
        }
    }

    /// Set the album title.
    #[must_use]
    pub fn with_album(mut self, album_title: impl Into<String>) -> Self {
        self.album_title = Some(album_title.into());
        self
    }

    /// Set the artwork locator.
    #[must_use]
    pub fn with_artwork(mut self, artwork_source: impl Into<String>) -> Self {
        self.artwork_source = Some(artwork_source.into());
        self
    }

    /// Returns true if both sources point at the same audio locator.
    pub fn same_locator(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_serde_uses_camel_case() {
        let source = AudioSource::new("a", "https://cdn.example.com/a.mp3", "Song", "Band")
            .with_album("Record");
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["audioId"], "a");
        assert_eq!(json["albumTitle"], "Record");
        assert!(json.get("artworkSource").is_none());

        let back: AudioSource = serde_json::from_value(json).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn test_same_locator() {
        let a = AudioSource::new("a", "/music/a.mp3", "A", "X");
        let b = AudioSource::new("b", "/music/a.mp3", "B", "Y");
        let c = AudioSource::new("a", "/music/c.mp3", "A", "X");
        assert!(a.same_locator(&b));
        assert!(!a.same_locator(&c));
    }
}
