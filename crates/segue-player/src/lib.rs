//! # segue-player
//!
//! Playlist and transport state machine for Segue.
//!
//! This crate provides:
//! - [`PlaylistManager`]: the command surface over a dedicated control thread
//! - [`RenderEngine`]: the contract an audio engine implements to be driven
//! - [`EventBus`] and [`CallbackSlots`] for observers
//! - Route monitoring, now-playing projection and a remote-command bridge

pub mod callbacks;
pub mod config;
mod control;
pub mod engine;
pub mod events;
pub mod manager;
pub mod now_playing;
pub mod playlist;
mod readiness;
pub mod remote;
pub mod route;

#[cfg(test)]
mod testing;

pub use callbacks::CallbackSlots;
pub use config::PlayerConfig;
pub use engine::{EngineItemSink, ItemEvent, ItemHandle, RenderEngine};
pub use events::{EventBus, EventSubscription, PlayerEvent};
pub use manager::{ManagerBuilder, PlaylistManager};
pub use now_playing::NowPlayingSurface;
pub use playlist::Playlist;
pub use readiness::ReadinessOutcome;
pub use remote::{CommandStatus, RemoteCommand};
pub use route::RouteMonitor;
