//! Playback state of the bound engine item.

use serde::{Deserialize, Serialize};

/// Lifecycle of the item currently bound to the render engine.
///
/// `Idle -> Loading -> {Ready, Failed}`, `Ready -> Playing <-> Paused`,
/// `Playing | Paused -> Idle` on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Failed,
}

impl PlaybackState {
    /// Whether the item's readiness is known (it either loaded or failed).
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Failed)
    }

    /// Whether the item loaded successfully and exposes duration and time.
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }

    #[test]
    fn test_resolution() {
        assert!(!PlaybackState::Idle.is_resolved());
        assert!(!PlaybackState::Loading.is_resolved());
        assert!(PlaybackState::Failed.is_resolved());
        assert!(!PlaybackState::Failed.is_loaded());
        assert!(PlaybackState::Paused.is_loaded());
    }
}
