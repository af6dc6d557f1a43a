//! Contract with the external render engine.
//!
//! The playlist controller never decodes or outputs audio itself. It drives a
//! [`RenderEngine`] and learns about item status through the
//! [`EngineItemSink`] handed over on every load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use segue_core::{Locator, Result};
use tracing::{debug, trace};

use crate::control::Request;

/// Identity of one bind of the engine.
///
/// Every load gets a fresh handle; callbacks carrying an older handle are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemHandle(pub(crate) u64);

/// Status transitions reported by the engine for a loaded item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEvent {
    /// The item can play. Duration in seconds if known.
    Ready { duration: Option<f64> },
    /// The item could not be loaded or stopped playing due to an error.
    Failed { message: String },
    /// A seek finished. `finished` is false when a newer seek superseded it.
    SeekCompleted { time: f64, finished: bool },
    /// Playback reached the end of the item.
    ReachedEnd,
}

/// The render engine driven by the controller.
///
/// All methods are called from the controller thread. Asynchronous outcomes
/// go through the sink passed to [`load`](Self::load).
pub trait RenderEngine: Send {
    /// Replace the current item with `locator`.
    ///
    /// Readiness or failure is reported later through `sink`. An error
    /// returned here is treated exactly like an asynchronous load failure.
    fn load(&mut self, locator: &Locator, sink: EngineItemSink) -> Result<()>;

    /// Drop the current item. Must be a no-op when nothing is loaded.
    fn unload(&mut self);

    /// Start or resume playback. On a loading item, playback starts once it
    /// is ready.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Begin seeking to `seconds`; completion arrives through the sink.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Duration of the current item in seconds, if known.
    fn duration(&self) -> Option<f64>;

    /// Current playback rate; 0.0 when not playing.
    fn rate(&self) -> f32;

    fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Set output volume in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Whether the engine is in an error state.
    fn has_error(&self) -> bool;
}

/// Status observer for one loaded item.
///
/// Cheap to clone. Once the controller rebinds or unbinds, every clone is
/// revoked and further reports are dropped.
#[derive(Debug, Clone)]
pub struct EngineItemSink {
    handle: ItemHandle,
    tx: Sender<Request>,
    revoked: Arc<AtomicBool>,
}

impl EngineItemSink {
    pub const fn handle(&self) -> ItemHandle {
        self.handle
    }

    /// Whether the item this sink observes has been superseded.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub fn ready(&self, duration: Option<f64>) {
        self.send(ItemEvent::Ready { duration });
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.send(ItemEvent::Failed {
            message: message.into(),
        });
    }

    pub fn seek_completed(&self, time: f64, finished: bool) {
        self.send(ItemEvent::SeekCompleted { time, finished });
    }

    pub fn reached_end(&self) {
        self.send(ItemEvent::ReachedEnd);
    }

    fn send(&self, event: ItemEvent) {
        if self.is_revoked() {
            trace!("Dropping {:?} for superseded item {:?}", event, self.handle);
            return;
        }
        if self
            .tx
            .send(Request::Item {
                handle: self.handle,
                event,
            })
            .is_err()
        {
            debug!("Controller gone, dropping item event");
        }
    }
}

/// Controller-side half of an item observer. Dropping it revokes the sink.
#[derive(Debug)]
pub(crate) struct ItemSubscription {
    revoked: Arc<AtomicBool>,
}

impl ItemSubscription {
    pub(crate) fn new(handle: ItemHandle, tx: Sender<Request>) -> (Self, EngineItemSink) {
        let revoked = Arc::new(AtomicBool::new(false));
        let sink = EngineItemSink {
            handle,
            tx,
            revoked: revoked.clone(),
        };
        (Self { revoked }, sink)
    }
}

impl Drop for ItemSubscription {
    fn drop(&mut self) {
        self.revoked.store(true, Ordering::Release);
    }
}
