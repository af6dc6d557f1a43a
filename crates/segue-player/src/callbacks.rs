//! Single-handler callback slots.
//!
//! Some hosts want "set one function per notification" instead of a
//! subscription. [`CallbackSlots`] provides that on top of the event bus:
//! a dispatcher thread subscribes once and forwards each event to whichever
//! handler is currently installed in its slot. Setting a slot again replaces
//! the previous handler.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use segue_core::{Error, Result};
use tracing::{debug, trace};

use crate::events::{EventBus, PlayerEvent};

type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
struct Slots {
    audio_end: Option<Handler<String>>,
    playback_status_change: Option<Handler<bool>>,
    play_next: Option<Handler<()>>,
    play_previous: Option<Handler<()>>,
    seek: Option<Handler<f64>>,
    airplay_active_change: Option<Handler<bool>>,
    playback_error: Option<ErrorHandler>,
}

/// Overwriteable per-event handlers fed from an [`EventBus`].
///
/// Handlers run on the `segue-callbacks` thread. Dropping the slots stops the
/// dispatcher after the next event.
pub struct CallbackSlots {
    slots: Arc<RwLock<Slots>>,
}

impl CallbackSlots {
    /// Subscribe to `bus` and start dispatching.
    pub fn attach(bus: &EventBus) -> Result<Self> {
        let slots = Arc::new(RwLock::new(Slots::default()));
        let weak = Arc::downgrade(&slots);
        let mut events = bus.subscribe();

        std::thread::Builder::new()
            .name("segue-callbacks".to_string())
            .spawn(move || {
                while let Some(event) = events.blocking_recv() {
                    if !dispatch(&weak, event) {
                        break;
                    }
                }
                debug!("Callback dispatcher stopped");
            })
            .map_err(Error::Io)?;

        Ok(Self { slots })
    }

    pub fn on_audio_end(&self, handler: impl Fn(String) + Send + Sync + 'static) {
        self.slots.write().audio_end = Some(Arc::new(handler));
    }

    pub fn on_playback_status_change(&self, handler: impl Fn(bool) + Send + Sync + 'static) {
        self.slots.write().playback_status_change = Some(Arc::new(handler));
    }

    /// Navigation policy hook for "next".
    pub fn on_play_next(&self, handler: impl Fn(()) + Send + Sync + 'static) {
        self.slots.write().play_next = Some(Arc::new(handler));
    }

    /// Navigation policy hook for "previous".
    pub fn on_play_previous(&self, handler: impl Fn(()) + Send + Sync + 'static) {
        self.slots.write().play_previous = Some(Arc::new(handler));
    }

    pub fn on_seek(&self, handler: impl Fn(f64) + Send + Sync + 'static) {
        self.slots.write().seek = Some(Arc::new(handler));
    }

    pub fn on_airplay_active_change(&self, handler: impl Fn(bool) + Send + Sync + 'static) {
        self.slots.write().airplay_active_change = Some(Arc::new(handler));
    }

    /// Called with `(audio_id, message)`.
    pub fn on_playback_error(&self, handler: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.slots.write().playback_error = Some(Arc::new(handler));
    }

    /// Remove every handler.
    pub fn clear(&self) {
        *self.slots.write() = Slots::default();
    }
}

/// Forward one event. Returns false once the slots are gone.
fn dispatch(slots: &Weak<RwLock<Slots>>, event: PlayerEvent) -> bool {
    let Some(slots) = slots.upgrade() else {
        return false;
    };

    // Clone the handler out so it runs without holding the lock.
    let guard = slots.read();
    match event {
        PlayerEvent::AudioEnd { audio_id } => {
            if let Some(handler) = guard.audio_end.clone() {
                drop(guard);
                handler(audio_id);
            }
        }
        PlayerEvent::PlaybackStatusChange { is_playing, .. } => {
            if let Some(handler) = guard.playback_status_change.clone() {
                drop(guard);
                handler(is_playing);
            }
        }
        PlayerEvent::PlayNext => {
            if let Some(handler) = guard.play_next.clone() {
                drop(guard);
                handler(());
            }
        }
        PlayerEvent::PlayPrevious => {
            if let Some(handler) = guard.play_previous.clone() {
                drop(guard);
                handler(());
            }
        }
        PlayerEvent::Seek { time } => {
            if let Some(handler) = guard.seek.clone() {
                drop(guard);
                handler(time);
            }
        }
        PlayerEvent::AirplayActiveChange { active } => {
            if let Some(handler) = guard.airplay_active_change.clone() {
                drop(guard);
                handler(active);
            }
        }
        PlayerEvent::PlaybackError { audio_id, error } => {
            if let Some(handler) = guard.playback_error.clone() {
                drop(guard);
                handler(&audio_id, &error);
            }
        }
        other => trace!("No callback slot for {}", other.name()),
    }
    true
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crossbeam_channel::{unbounded, RecvTimeoutError};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_handlers_receive_their_events() {
        let bus = EventBus::new(16);
        let slots = CallbackSlots::attach(&bus).unwrap();
        let (tx, rx) = unbounded();

        let errors = tx.clone();
        slots.on_playback_error(move |id, message| {
            errors.send(format!("{id}:{message}")).unwrap();
        });
        let seeks = tx.clone();
        slots.on_seek(move |time| seeks.send(format!("seek:{time}")).unwrap());

        bus.emit(PlayerEvent::PlaybackError {
            audio_id: "a".into(),
            error: "boom".into(),
        });
        bus.emit(PlayerEvent::PlayNext);
        bus.emit(PlayerEvent::Seek { time: 4.5 });

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "a:boom");
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "seek:4.5");
    }

    #[test]
    fn test_setting_a_slot_replaces_the_handler() {
        let bus = EventBus::new(16);
        let slots = CallbackSlots::attach(&bus).unwrap();
        let (tx, rx) = unbounded();

        let first = tx.clone();
        slots.on_audio_end(move |id| first.send(format!("first:{id}")).unwrap());
        let second = tx;
        slots.on_audio_end(move |id| second.send(format!("second:{id}")).unwrap());

        bus.emit(PlayerEvent::AudioEnd {
            audio_id: "x".into(),
        });

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "second:x");
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn test_cleared_slots_stay_silent() {
        let bus = EventBus::new(16);
        let slots = CallbackSlots::attach(&bus).unwrap();
        let (tx, rx) = unbounded();

        slots.on_playback_status_change(move |playing| tx.send(playing).unwrap());
        slots.clear();
        bus.emit(PlayerEvent::PlaybackStatusChange {
            audio_id: None,
            is_playing: true,
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
