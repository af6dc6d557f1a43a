//! Error types for Segue.

use thiserror::Error;

/// Result type alias using Segue's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Segue.
#[derive(Error, Debug)]
pub enum Error {
    // Playlist structure errors
    #[error("Audio source with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Audio source with id '{0}' not found")]
    NotFound(String),

    #[error("Audio source with id '{0}' is not in the playlist")]
    NotInPlaylist(String),

    #[error("Cannot remove audio source '{0}' while it is playing")]
    CannotRemoveActive(String),

    #[error("No audio source is currently loaded")]
    NoCurrentItem,

    // Source validation errors
    #[error("Invalid audio source: {0}")]
    InvalidSource(String),

    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    // Transport errors
    #[error("Duration of the current item is not available")]
    NoDuration,

    #[error("Seek position {requested:.2}s is outside 0..={duration:.2}s")]
    OutOfRange { requested: f64, duration: f64 },

    // Engine errors
    #[error("Failed to load audio: {0}")]
    EngineLoadFailed(String),

    #[error("Engine command failed: {0}")]
    EngineCommandFailed(String),

    #[error("Playback controller is no longer running")]
    ControllerStopped,

    // Artwork errors
    #[error("Artwork error: {0}")]
    Artwork(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for playlist structure errors that are reported
    /// synchronously to the caller.
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId(_)
                | Self::NotFound(_)
                | Self::NotInPlaylist(_)
                | Self::CannotRemoveActive(_)
        )
    }

    /// Returns true if the source locator was rejected before reaching the engine.
    pub const fn is_source_rejection(&self) -> bool {
        matches!(self, Self::InvalidSource(_) | Self::FileNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_structural() {
        assert!(Error::DuplicateId("a".into()).is_structural());
        assert!(Error::CannotRemoveActive("a".into()).is_structural());
        assert!(!Error::NoDuration.is_structural());
        assert!(!Error::EngineLoadFailed("boom".into()).is_structural());
    }

    #[test]
    fn test_error_source_rejection() {
        assert!(Error::FileNotFound("/tmp/x.mp3".into()).is_source_rejection());
        assert!(Error::InvalidSource("bad".into()).is_source_rejection());
        assert!(!Error::NotFound("a".into()).is_source_rejection());
    }

    #[test]
    fn test_error_display() {
        let err = Error::OutOfRange {
            requested: 12.0,
            duration: 10.0,
        };
        assert_eq!(err.to_string(), "Seek position 12.00s is outside 0..=10.00s");
        assert_eq!(
            Error::CannotRemoveActive("a".into()).to_string(),
            "Cannot remove audio source 'a' while it is playing"
        );
    }
}
