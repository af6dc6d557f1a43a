//! Playlist and transport state machine.
//!
//! The [`Controller`] owns the playlist, the bound engine item, the route
//! monitor and the now-playing projector. It runs on a single control
//! thread; user commands, engine callbacks, route changes and artwork
//! completions all arrive through one request queue, so state is only ever
//! touched from that thread.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use segue_core::{
    Artwork, AudioSource, Error, Locator, NowPlayingSnapshot, PlaybackState, Result, RouteChange,
    RouteState,
};
use tracing::{debug, error, info, trace, warn};

use crate::config::PlayerConfig;
use crate::engine::{ItemEvent, ItemHandle, ItemSubscription, RenderEngine};
use crate::events::{EventBus, PlayerEvent};
use crate::now_playing::NowPlayingProjector;
use crate::playlist::Playlist;
use crate::readiness::{Readiness, ReadinessOutcome};
use crate::route::RouteMonitor;

/// A command closure executed on the control thread.
pub(crate) type Job = Box<dyn FnOnce(&mut Controller) + Send>;

/// Everything the control thread reacts to.
pub(crate) enum Request {
    /// A user command with its reply already captured.
    Command(Job),
    /// Status callback from the engine for a bound item.
    Item { handle: ItemHandle, event: ItemEvent },
    /// Raw route-change notification from the platform.
    RouteChanged(RouteChange),
    InterruptionBegan,
    InterruptionEnded { should_resume: bool },
    /// Artwork lookup finished.
    ArtworkResolved {
        request: u64,
        locator: String,
        result: Result<Artwork>,
    },
    Shutdown,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(_) => f.write_str("Command"),
            Self::Item { handle, event } => write!(f, "Item({handle:?}, {event:?})"),
            Self::RouteChanged(change) => write!(f, "RouteChanged({:?})", change.reason),
            Self::InterruptionBegan => f.write_str("InterruptionBegan"),
            Self::InterruptionEnded { should_resume } => {
                write!(f, "InterruptionEnded(resume={should_resume})")
            }
            Self::ArtworkResolved { locator, .. } => write!(f, "ArtworkResolved({locator})"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Result of reading a live counter that may depend on readiness.
pub(crate) enum LiveRead {
    Value(f64),
    Pending(Arc<Readiness>),
}

/// Readiness of the bound item as seen from the control thread.
pub(crate) enum Settled {
    Now(ReadinessOutcome),
    Pending(Arc<Readiness>),
}

/// The item currently bound to the engine.
struct BoundItem {
    source: AudioSource,
    handle: ItemHandle,
    state: PlaybackState,
    /// Playback was requested and not paused since.
    wants_play: bool,
    /// Duration reported with readiness.
    duration: Option<f64>,
    readiness: Arc<Readiness>,
    /// Revokes the engine's sink for this item on drop.
    _subscription: ItemSubscription,
}

impl BoundItem {
    fn is_play_requested(&self) -> bool {
        self.wants_play
            && matches!(
                self.state,
                PlaybackState::Loading | PlaybackState::Ready | PlaybackState::Playing
            )
    }
}

/// Deferred advance after a load failure.
#[derive(Debug)]
struct PendingAdvance {
    deadline: Instant,
    /// Generation at the time of the failure; any rebind invalidates it.
    generation: u64,
    target_id: String,
}

pub(crate) struct Controller {
    config: PlayerConfig,
    engine: Box<dyn RenderEngine>,
    bus: Arc<EventBus>,
    /// Used to hand out item sinks that post back into our own queue.
    tx: Sender<Request>,
    playlist: Playlist,
    bound: Option<BoundItem>,
    /// Bumped on every bind and unbind.
    generation: u64,
    pending_advance: Option<PendingAdvance>,
    route: RouteMonitor,
    projector: NowPlayingProjector,
    interrupted_while_playing: bool,
}

impl Controller {
    pub(crate) fn new(
        config: PlayerConfig,
        engine: Box<dyn RenderEngine>,
        bus: Arc<EventBus>,
        tx: Sender<Request>,
        route: RouteMonitor,
        projector: NowPlayingProjector,
    ) -> Self {
        Self {
            config,
            engine,
            bus,
            tx,
            playlist: Playlist::new(),
            bound: None,
            generation: 0,
            pending_advance: None,
            route,
            projector,
            interrupted_while_playing: false,
        }
    }

    /// Process requests until shutdown or until every sender is gone.
    pub(crate) fn run(mut self, rx: Receiver<Request>) {
        info!("Playback controller started");

        loop {
            let request = match self.pending_advance.as_ref().map(|p| p.deadline) {
                Some(deadline) => match rx.recv_deadline(deadline) {
                    Ok(request) => Some(request),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(request) => Some(request),
                    Err(_) => break,
                },
            };

            match request {
                Some(Request::Shutdown) => {
                    info!("Playback controller shutting down");
                    break;
                }
                Some(request) => self.handle(request),
                None => self.fire_auto_advance(),
            }
        }

        self.unbind();
        debug!("Playback controller stopped");
    }

    fn handle(&mut self, request: Request) {
        trace!("Handling {request:?}");
        match request {
            Request::Command(job) => job(self),
            Request::Item { handle, event } => self.handle_item_event(handle, event),
            Request::RouteChanged(change) => self.route_changed(&change),
            Request::InterruptionBegan => self.interruption_began(),
            Request::InterruptionEnded { should_resume } => self.interruption_ended(should_resume),
            Request::ArtworkResolved {
                request,
                locator,
                result,
            } => self.projector.artwork_resolved(request, locator, result),
            Request::Shutdown => {}
        }
    }

    // Playlist mutation

    pub(crate) fn add_source(&mut self, source: AudioSource) -> Result<()> {
        debug!("Adding source {}", source.audio_id);
        self.playlist.push(source)
    }

    pub(crate) fn add_sources(&mut self, sources: Vec<AudioSource>) -> Result<()> {
        debug!("Adding {} sources", sources.len());
        self.playlist.extend(sources)
    }

    /// Replace the playlist. Whatever was bound is stopped; nothing is
    /// current until the next `play`.
    pub(crate) fn set_sources(&mut self, sources: Vec<AudioSource>) -> Result<()> {
        debug!("Setting {} sources", sources.len());
        // Validate before stopping anything.
        let mut staged = Playlist::new();
        staged.set(sources)?;

        if self.bound.is_some() {
            self.stop();
        }
        if let Some(pending) = self.pending_advance.take() {
            debug!("Dropping auto-advance to {}", pending.target_id);
        }
        self.playlist = staged;
        Ok(())
    }

    /// Substitute a source in place. Replacing the bound source restarts
    /// playback on the new locator.
    pub(crate) fn replace_source(&mut self, audio_id: &str, source: AudioSource) -> Result<()> {
        debug!("Replacing source {audio_id} with {}", source.audio_id);
        if self.bound_id() != Some(audio_id) {
            self.playlist.replace(audio_id, source)?;
            return Ok(());
        }

        // The bound entry stays in place unless the new one can be bound.
        let locator = self.resolve(&source)?;
        let (index, _) = self.playlist.replace(audio_id, source.clone())?;
        info!("Replaced the playing source, restarting on new locator");
        self.start(index, source, locator)
    }

    pub(crate) fn remove_source(&mut self, audio_id: &str) -> Result<()> {
        if self.bound_id() == Some(audio_id) {
            return Err(Error::CannotRemoveActive(audio_id.to_string()));
        }
        self.playlist.remove(audio_id)?;
        debug!("Removed source {audio_id}");
        Ok(())
    }

    /// Bulk removal. The bound source and unknown ids are skipped.
    pub(crate) fn remove_sources(&mut self, audio_ids: &[String]) -> usize {
        let mut removed = 0;
        for audio_id in audio_ids {
            if self.bound_id() == Some(audio_id.as_str()) {
                debug!("Skipping removal of active source {audio_id}");
                continue;
            }
            if self.playlist.remove(audio_id).is_ok() {
                removed += 1;
            }
        }
        debug!("Removed {removed} of {} sources", audio_ids.len());
        removed
    }

    // Transport

    pub(crate) fn play(&mut self, source: Option<AudioSource>) -> Result<()> {
        let Some(source) = source else {
            if self.bound.is_none() {
                return Err(Error::NoCurrentItem);
            }
            self.resume_bound();
            return Ok(());
        };

        if self
            .bound
            .as_ref()
            .is_some_and(|bound| bound.source.same_locator(&source))
        {
            self.resume_bound();
            return Ok(());
        }

        let index = self
            .playlist
            .position(&source.audio_id)
            .ok_or_else(|| Error::NotInPlaylist(source.audio_id.clone()))?;
        let entry = self.playlist.items()[index].clone();
        let locator = self.resolve(&entry)?;
        self.start(index, entry, locator)
    }

    fn resume_bound(&mut self) {
        if self.bound.as_ref().is_some_and(BoundItem::is_play_requested) {
            trace!("Already playing, ignoring play");
            return;
        }
        self.resume();
    }

    /// Resolve the locator of `source`, reporting a rejection as a
    /// playback error.
    fn resolve(&self, source: &AudioSource) -> Result<Locator> {
        Locator::resolve(&source.source).inspect_err(|e| {
            warn!("Rejecting source {}: {e}", source.audio_id);
            self.bus.emit(PlayerEvent::PlaybackError {
                audio_id: source.audio_id.clone(),
                error: e.to_string(),
            });
        })
    }

    /// Bind and start loading `source` at `index`.
    fn start(&mut self, index: usize, source: AudioSource, locator: Locator) -> Result<()> {
        // The old observer must be dead before the new item exists.
        self.release_bound();
        self.generation += 1;
        self.pending_advance = None;

        let handle = ItemHandle(self.generation);
        let audio_id = source.audio_id.clone();
        self.playlist.select(index);

        let (subscription, sink) = ItemSubscription::new(handle, self.tx.clone());
        self.bound = Some(BoundItem {
            source,
            handle,
            state: PlaybackState::Loading,
            wants_play: true,
            duration: None,
            readiness: Readiness::new(),
            _subscription: subscription,
        });
        self.emit_state();

        info!("Loading {audio_id} from {locator}");
        if let Err(e) = self.engine.load(&locator, sink) {
            let message = match e {
                Error::EngineLoadFailed(message) => message,
                other => other.to_string(),
            };
            self.handle_load_failure(handle, message.clone());
            return Err(Error::EngineLoadFailed(message));
        }
        if let Err(e) = self.engine.play() {
            warn!("Engine refused to start {audio_id}: {e}");
        }

        self.bus.emit(PlayerEvent::PlaybackStatusChange {
            audio_id: Some(audio_id),
            is_playing: true,
        });
        self.refresh_now_playing();
        Ok(())
    }

    /// Ask the engine to play, whatever is bound.
    pub(crate) fn resume(&mut self) {
        debug!("Resume");
        if let Err(e) = self.engine.play() {
            warn!("Engine failed to resume: {e}");
        }

        let mut changed = false;
        if let Some(bound) = self.bound.as_mut() {
            bound.wants_play = true;
            if matches!(bound.state, PlaybackState::Ready | PlaybackState::Paused) {
                bound.state = PlaybackState::Playing;
                changed = true;
            }
        }
        if changed {
            self.emit_state();
        }

        self.bus.emit(PlayerEvent::PlaybackStatusChange {
            audio_id: self.bound_id().map(str::to_string),
            is_playing: true,
        });
        self.refresh_now_playing();
    }

    pub(crate) fn pause(&mut self) {
        debug!("Pause");
        if let Err(e) = self.engine.pause() {
            warn!("Engine failed to pause: {e}");
        }

        let mut changed = false;
        if let Some(bound) = self.bound.as_mut() {
            bound.wants_play = false;
            if matches!(bound.state, PlaybackState::Ready | PlaybackState::Playing) {
                bound.state = PlaybackState::Paused;
                changed = true;
            }
        }
        if changed {
            self.emit_state();
        }

        self.bus.emit(PlayerEvent::PlaybackStatusChange {
            audio_id: self.bound_id().map(str::to_string),
            is_playing: false,
        });
        self.refresh_now_playing();
    }

    pub(crate) fn stop(&mut self) {
        debug!("Stop");
        self.pause();
        self.unbind();
        self.refresh_now_playing();
    }

    pub(crate) fn play_next(&self) {
        info!("Next track requested");
        self.bus.emit(PlayerEvent::PlayNext);
    }

    pub(crate) fn play_previous(&self) {
        info!("Previous track requested");
        self.bus.emit(PlayerEvent::PlayPrevious);
    }

    pub(crate) fn seek(&mut self, seconds: f64) -> Result<()> {
        let duration = self.known_duration().ok_or(Error::NoDuration)?;
        if !(0.0..=duration).contains(&seconds) {
            return Err(Error::OutOfRange {
                requested: seconds,
                duration,
            });
        }
        debug!("Seeking to {seconds:.2}s");
        self.engine.seek(seconds).map_err(|e| match e {
            e @ Error::EngineCommandFailed(_) => e,
            other => Error::EngineCommandFailed(other.to_string()),
        })
    }

    /// Relative seek forward. Targets past the end are ignored.
    pub(crate) fn seek_forward(&mut self, by: f64) -> Result<()> {
        let duration = self.known_duration().ok_or(Error::NoDuration)?;
        let target = self.engine.current_time() + by;
        if target > duration {
            debug!("Seek forward to {target:.2}s is past the end, ignoring");
            return Ok(());
        }
        self.seek(target)
    }

    /// Relative seek backward, clamped at zero.
    pub(crate) fn seek_backward(&mut self, by: f64) -> Result<()> {
        let duration = self.known_duration().ok_or(Error::NoDuration)?;
        let target = (self.engine.current_time() - by).clamp(0.0, duration);
        self.seek(target)
    }

    /// Out-of-range volume is logged and ignored.
    pub(crate) fn set_volume(&mut self, volume: f32) {
        if !(0.0..=1.0).contains(&volume) {
            warn!("Ignoring volume {volume}, expected 0.0..=1.0");
            return;
        }
        if let Err(e) = self.engine.set_volume(volume) {
            error!("Failed to set volume: {e}");
        }
    }

    pub(crate) fn set_rate(&mut self, rate: f32) {
        if !rate.is_finite() || rate <= 0.0 {
            warn!("Ignoring playback rate {rate}");
            return;
        }
        if let Err(e) = self.engine.set_rate(rate) {
            error!("Failed to set rate: {e}");
            return;
        }
        self.refresh_now_playing();
    }

    // Environment events

    fn route_changed(&mut self, change: &RouteChange) {
        if let Some(active) = self.route.handle(change) {
            info!("Wireless output {}", if active { "active" } else { "inactive" });
            self.bus.emit(PlayerEvent::AirplayActiveChange { active });
        }
    }

    fn interruption_began(&mut self) {
        self.interrupted_while_playing = self
            .bound
            .as_ref()
            .is_some_and(BoundItem::is_play_requested);
        info!(
            "Audio interruption began (was playing: {})",
            self.interrupted_while_playing
        );
        self.bus.emit(PlayerEvent::Interruption {
            began: true,
            should_resume: false,
        });
        if self.interrupted_while_playing {
            self.pause();
        }
    }

    fn interruption_ended(&mut self, should_resume: bool) {
        let was_playing = std::mem::take(&mut self.interrupted_while_playing);
        info!("Audio interruption ended (should resume: {should_resume})");
        self.bus.emit(PlayerEvent::Interruption {
            began: false,
            should_resume,
        });
        if was_playing
            && should_resume
            && self.config.resume_after_interruption
            && self.bound.is_some()
        {
            self.resume();
        }
    }

    fn handle_item_event(&mut self, handle: ItemHandle, event: ItemEvent) {
        let Some(bound) = self.bound.as_mut() else {
            trace!("No bound item, dropping {event:?}");
            return;
        };
        if bound.handle != handle {
            trace!("Stale callback for {handle:?}, dropping {event:?}");
            return;
        }

        match event {
            ItemEvent::Ready { duration } => {
                if bound.state != PlaybackState::Loading {
                    return;
                }
                bound.duration = duration;
                bound.state = if bound.wants_play {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Ready
                };
                bound.readiness.resolve(true);
                debug!("{} ready ({duration:?}s)", bound.source.audio_id);
                self.emit_state();
                self.refresh_now_playing();
            }
            ItemEvent::Failed { message } => self.handle_load_failure(handle, message),
            ItemEvent::SeekCompleted { time, finished } => {
                if finished {
                    self.bus.emit(PlayerEvent::Seek { time });
                    self.refresh_now_playing();
                } else {
                    debug!("Seek to {time:.2}s was superseded");
                }
            }
            ItemEvent::ReachedEnd => {
                let audio_id = bound.source.audio_id.clone();
                bound.wants_play = false;
                bound.state = PlaybackState::Paused;
                info!("{audio_id} reached its end");
                self.bus.emit(PlayerEvent::AudioEnd {
                    audio_id: audio_id.clone(),
                });
                self.bus.emit(PlayerEvent::PlaybackStatusChange {
                    audio_id: Some(audio_id),
                    is_playing: false,
                });
                self.emit_state();
                self.refresh_now_playing();
            }
        }
    }

    /// Report the failure, unbind, and schedule an advance to the next entry.
    fn handle_load_failure(&mut self, handle: ItemHandle, message: String) {
        if self.bound.as_ref().map(|b| b.handle) != Some(handle) {
            return;
        }
        let Some(bound) = self.release_bound() else {
            return;
        };
        let audio_id = bound.source.audio_id.clone();
        error!("Failed to load {audio_id}: {message}");

        self.bus.emit(PlayerEvent::PlaybackError {
            audio_id: audio_id.clone(),
            error: message,
        });
        self.bus.emit(PlayerEvent::PlaybackStateChange {
            audio_id: Some(audio_id.clone()),
            state: PlaybackState::Failed,
        });
        drop(bound);

        self.engine.unload();
        self.generation += 1;
        self.bus.emit(PlayerEvent::PlaybackStatusChange {
            audio_id: Some(audio_id.clone()),
            is_playing: false,
        });
        self.refresh_now_playing();

        match self.playlist.next_after(&audio_id) {
            Some(next) => {
                info!(
                    "Advancing to {} in {:?}",
                    next.audio_id,
                    self.config.auto_advance_delay()
                );
                self.pending_advance = Some(PendingAdvance {
                    deadline: Instant::now() + self.config.auto_advance_delay(),
                    generation: self.generation,
                    target_id: next.audio_id.clone(),
                });
            }
            None => debug!("No entry after {audio_id}, not advancing"),
        }
    }

    fn fire_auto_advance(&mut self) {
        let Some(pending) = self.pending_advance.take() else {
            return;
        };
        if pending.generation != self.generation {
            debug!("Auto-advance to {} superseded", pending.target_id);
            return;
        }
        let Some(source) = self.playlist.get(&pending.target_id).cloned() else {
            warn!("Auto-advance target {} was removed", pending.target_id);
            return;
        };
        if let Err(e) = self.play(Some(source)) {
            error!("Auto-advance to {} failed: {e}", pending.target_id);
        }
    }

    // Queries

    pub(crate) fn is_playing(&self) -> bool {
        self.engine.rate() != 0.0 && !self.engine.has_error()
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.bound.as_ref().map_or(PlaybackState::Idle, |b| b.state)
    }

    pub(crate) fn current_audio_source(&self) -> Option<AudioSource> {
        self.playlist.current().cloned()
    }

    pub(crate) const fn current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    pub(crate) fn sources(&self) -> Vec<AudioSource> {
        self.playlist.items().to_vec()
    }

    pub(crate) const fn route_state(&self) -> RouteState {
        self.route.state()
    }

    pub(crate) fn now_playing(&self) -> Option<NowPlayingSnapshot> {
        self.projector.last().cloned()
    }

    pub(crate) fn live_duration(&self) -> LiveRead {
        self.read_live(|c| c.known_duration().unwrap_or(0.0))
    }

    pub(crate) fn live_time(&self) -> LiveRead {
        self.read_live(|c| c.engine.current_time())
    }

    pub(crate) fn readiness(&self) -> Settled {
        match self.bound.as_ref() {
            None => Settled::Now(ReadinessOutcome::Unbound),
            Some(b) if b.state == PlaybackState::Loading => Settled::Pending(b.readiness.clone()),
            Some(_) => Settled::Now(ReadinessOutcome::Ready),
        }
    }

    fn read_live(&self, value: impl FnOnce(&Self) -> f64) -> LiveRead {
        match self.bound.as_ref() {
            Some(b) if b.state == PlaybackState::Loading => LiveRead::Pending(b.readiness.clone()),
            Some(b) if b.state.is_loaded() => LiveRead::Value(value(self)),
            _ => LiveRead::Value(0.0),
        }
    }

    // Helpers

    fn bound_id(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.source.audio_id.as_str())
    }

    /// Duration of a loaded item, if finite and positive.
    fn known_duration(&self) -> Option<f64> {
        let bound = self.bound.as_ref().filter(|b| b.state.is_loaded())?;
        self.engine
            .duration()
            .or(bound.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Detach the bound item without touching the engine. Waiters on its
    /// readiness are released.
    fn release_bound(&mut self) -> Option<BoundItem> {
        let bound = self.bound.take()?;
        bound.readiness.resolve(false);
        Some(bound)
    }

    fn unbind(&mut self) {
        if let Some(bound) = self.release_bound() {
            debug!("Unbinding {}", bound.source.audio_id);
            self.engine.unload();
            self.generation += 1;
            self.bus.emit(PlayerEvent::PlaybackStateChange {
                audio_id: Some(bound.source.audio_id),
                state: PlaybackState::Idle,
            });
        }
        self.pending_advance = None;
    }

    fn emit_state(&self) {
        if let Some(bound) = &self.bound {
            debug!("{} -> {:?}", bound.source.audio_id, bound.state);
            self.bus.emit(PlayerEvent::PlaybackStateChange {
                audio_id: Some(bound.source.audio_id.clone()),
                state: bound.state,
            });
        }
    }

    fn refresh_now_playing(&mut self) {
        let Some(bound) = self.bound.as_ref() else {
            self.projector.refresh(None, 0.0, 0.0, 0.0);
            return;
        };
        let (duration, elapsed) = if bound.state.is_loaded() {
            (
                self.known_duration().unwrap_or(0.0),
                self.engine.current_time(),
            )
        } else {
            (0.0, 0.0)
        };
        let rate = self.engine.rate();
        self.projector
            .refresh(Some(&bound.source), duration, elapsed, rate);
    }
}
