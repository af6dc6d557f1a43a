//! Event bus for playback observers.
//!
//! One multi-subscriber channel carries every outward notification as a typed
//! [`PlayerEvent`]. Each event also has a stable name and a string-keyed
//! payload for bridges that forward events by name.
//!
//! Events are delivered to each subscriber in emission order. A subscriber
//! that falls more than `capacity` events behind skips ahead and logs a
//! warning.

use segue_core::PlaybackState;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Events emitted by the playback controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback started or stopped.
    PlaybackStatusChange {
        audio_id: Option<String>,
        is_playing: bool,
    },
    /// An item failed to load or was rejected before loading.
    PlaybackError { audio_id: String, error: String },
    /// The bound item moved to a new lifecycle state.
    PlaybackStateChange {
        audio_id: Option<String>,
        state: PlaybackState,
    },
    /// The bound item played to its end.
    AudioEnd { audio_id: String },
    /// Navigation policy should pick and play the next item.
    PlayNext,
    /// Navigation policy should pick and play the previous item.
    PlayPrevious,
    /// A seek finished at the requested time (seconds).
    Seek { time: f64 },
    /// Wireless output route became active or inactive.
    AirplayActiveChange { active: bool },
    /// An audio session interruption began or ended.
    Interruption { began: bool, should_resume: bool },
}

impl PlayerEvent {
    /// Stable event name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PlaybackStatusChange { .. } => "playbackStatusChange",
            Self::PlaybackError { .. } => "playbackError",
            Self::PlaybackStateChange { .. } => "playbackStateChange",
            Self::AudioEnd { .. } => "audioEnd",
            Self::PlayNext => "playNext",
            Self::PlayPrevious => "playPrevious",
            Self::Seek { .. } => "seek",
            Self::AirplayActiveChange { .. } => "airplayActiveChange",
            Self::Interruption { .. } => "interruption",
        }
    }

    /// Payload as a string-keyed map with camelCase keys.
    pub fn payload(&self) -> Map<String, Value> {
        let value = match self {
            Self::PlaybackStatusChange {
                audio_id,
                is_playing,
            } => json!({ "audioId": audio_id, "isPlaying": is_playing }),
            Self::PlaybackError { audio_id, error } => {
                json!({ "audioId": audio_id, "error": error })
            }
            Self::PlaybackStateChange { audio_id, state } => {
                json!({ "audioId": audio_id, "state": state.as_str() })
            }
            Self::AudioEnd { audio_id } => json!({ "audioId": audio_id }),
            Self::PlayNext | Self::PlayPrevious => json!({}),
            Self::Seek { time } => json!({ "time": time }),
            Self::AirplayActiveChange { active } => json!({ "active": active }),
            Self::Interruption {
                began,
                should_resume,
            } => json!({ "began": began, "shouldResume": should_resume }),
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Broadcast bus shared by the controller and its observers.
///
/// One instance lives as long as the playlist manager that owns it.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all events emitted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Emit an event to every current subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: PlayerEvent) -> usize {
        trace!("Emitting {}", event.name());
        self.tx.send(event).unwrap_or_else(|err| {
            trace!("No subscribers for {}", err.0.name());
            0
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::PlayerConfig::default().event_capacity)
    }
}

/// A subscriber's view of the bus.
#[derive(Debug)]
pub struct EventSubscription {
    rx: broadcast::Receiver<PlayerEvent>,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Blocking variant of [`recv`](Self::recv) for non-async threads.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<PlayerEvent> {
        loop {
            match self.rx.blocking_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<PlayerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return None
                }
            }
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
