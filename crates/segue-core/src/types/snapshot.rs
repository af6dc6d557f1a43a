//! Now-playing metadata snapshots.

use std::sync::Arc;

use super::{Artwork, AudioSource};

/// Metadata published to the system "now playing" surface.
///
/// Always derived from the playlist and the engine's live counters; never
/// authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingSnapshot {
    pub audio_id: String,
    pub title: String,
    pub artist: String,
    pub album_title: Option<String>,
    /// Duration in seconds (0.0 while unknown).
    pub duration: f64,
    /// Elapsed time in seconds.
    pub elapsed_time: f64,
    /// Playback rate (0.0 when paused).
    pub rate: f32,
    pub artwork: Option<Arc<Artwork>>,
}

impl NowPlayingSnapshot {
    pub fn from_source(source: &AudioSource, duration: f64, elapsed_time: f64, rate: f32) -> Self {
        Self {
            audio_id: source.audio_id.clone(),
            title: source.title.clone(),
            artist: source.artist.clone(),
            album_title: source.album_title.clone(),
            duration,
            elapsed_time,
            rate,
            artwork: None,
        }
    }

    /// Copy of this snapshot with artwork attached.
    #[must_use]
    pub fn with_artwork(&self, artwork: Arc<Artwork>) -> Self {
        Self {
            artwork: Some(artwork),
            ..self.clone()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.rate > 0.0
    }
}
