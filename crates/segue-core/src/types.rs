//! Core domain types for Segue.

pub mod artwork;
pub mod locator;
pub mod route;
pub mod snapshot;
pub mod source;
pub mod state;

pub use artwork::{Artwork, ArtworkLocator, ArtworkResolver};
pub use locator::Locator;
pub use route::{OutputKind, RouteChange, RouteChangeReason, RouteOutput, RouteSnapshot, RouteState};
pub use snapshot::NowPlayingSnapshot;
pub use source::AudioSource;
pub use state::PlaybackState;
