//! Public handle to the playback controller.
//!
//! [`PlaylistManager`] is a cheap, cloneable handle. Every call is forwarded
//! to the `segue-control` thread and answered there, so commands observe
//! each other in submission order regardless of which thread issued them.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use segue_core::{
    ArtworkResolver, AudioSource, Error, NowPlayingSnapshot, PlaybackState, Result, RouteChange,
    RouteSnapshot, RouteState,
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::control::{Controller, LiveRead, Request, Settled};
use crate::engine::RenderEngine;
use crate::events::{EventBus, EventSubscription};
use crate::now_playing::{spawn_artwork_worker, NowPlayingProjector, NowPlayingSurface};
use crate::readiness::ReadinessOutcome;
use crate::route::RouteMonitor;

struct Inner {
    tx: Sender<Request>,
    bus: Arc<EventBus>,
    config: PlayerConfig,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.tx.send(Request::Shutdown);
    }
}

/// Handle to a running playback controller.
///
/// Surfaces and resolvers are invoked on the controller's own threads and
/// must not call back into the manager synchronously.
#[derive(Clone)]
pub struct PlaylistManager {
    inner: Arc<Inner>,
}

/// Configures and starts a [`PlaylistManager`].
pub struct ManagerBuilder {
    engine: Box<dyn RenderEngine>,
    config: PlayerConfig,
    bus: Option<Arc<EventBus>>,
    surface: Option<Arc<dyn NowPlayingSurface>>,
    resolver: Option<Arc<dyn ArtworkResolver>>,
    initial_route: RouteSnapshot,
}

impl ManagerBuilder {
    #[must_use]
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish on an existing bus instead of creating one.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn with_now_playing(mut self, surface: Arc<dyn NowPlayingSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Without a resolver, snapshots never carry artwork.
    #[must_use]
    pub fn with_artwork_resolver(mut self, resolver: Arc<dyn ArtworkResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Route in effect at startup; seeds the wireless-output flag.
    #[must_use]
    pub fn with_initial_route(mut self, route: RouteSnapshot) -> Self {
        self.initial_route = route;
        self
    }

    /// Start the control thread (and the artwork thread, if a resolver was
    /// given).
    pub fn spawn(self) -> Result<PlaylistManager> {
        let (tx, rx) = unbounded();
        let bus = self
            .bus
            .unwrap_or_else(|| Arc::new(EventBus::new(self.config.event_capacity)));

        let artwork_tx = self
            .resolver
            .map(|resolver| spawn_artwork_worker(resolver, tx.clone()))
            .transpose()?;

        let controller = Controller::new(
            self.config.clone(),
            self.engine,
            bus.clone(),
            tx.clone(),
            RouteMonitor::new(&self.initial_route),
            NowPlayingProjector::new(self.surface, artwork_tx),
        );

        let thread = std::thread::Builder::new()
            .name("segue-control".to_string())
            .spawn(move || controller.run(rx))
            .map_err(Error::Io)?;

        info!("Playlist manager started");
        Ok(PlaylistManager {
            inner: Arc::new(Inner {
                tx,
                bus,
                config: self.config,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }
}

impl PlaylistManager {
    pub fn builder(engine: impl RenderEngine + 'static) -> ManagerBuilder {
        ManagerBuilder {
            engine: Box::new(engine),
            config: PlayerConfig::default(),
            bus: None,
            surface: None,
            resolver: None,
            initial_route: RouteSnapshot::default(),
        }
    }

    /// Start with default configuration and no now-playing surface.
    pub fn new(engine: impl RenderEngine + 'static) -> Result<Self> {
        Self::builder(engine).spawn()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Subscribe to every event emitted from now on.
    pub fn events(&self) -> EventSubscription {
        self.inner.bus.subscribe()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.inner.bus.clone()
    }

    // Playlist

    /// Append a source. Fails with [`Error::DuplicateId`] if its id exists.
    pub fn add_source(&self, source: AudioSource) -> Result<()> {
        self.call(move |c| c.add_source(source))?
    }

    /// Append sources in order.
    ///
    /// Not transactional: when element `k` fails, elements before it stay
    /// in the playlist.
    pub fn add_sources(&self, sources: Vec<AudioSource>) -> Result<()> {
        self.call(move |c| c.add_sources(sources))?
    }

    /// Replace the whole playlist and stop playback. Fails without changing
    /// anything if `sources` contains a repeated id.
    pub fn set_sources(&self, sources: Vec<AudioSource>) -> Result<()> {
        self.call(move |c| c.set_sources(sources))?
    }

    /// Substitute the entry `audio_id` in place. Replacing the bound entry
    /// restarts playback on the new locator.
    pub fn replace_source(&self, audio_id: impl Into<String>, source: AudioSource) -> Result<()> {
        let audio_id = audio_id.into();
        self.call(move |c| c.replace_source(&audio_id, source))?
    }

    /// Remove one entry. The bound entry cannot be removed.
    pub fn remove_source(&self, audio_id: impl Into<String>) -> Result<()> {
        let audio_id = audio_id.into();
        self.call(move |c| c.remove_source(&audio_id))?
    }

    /// Remove several entries, skipping the bound one and unknown ids.
    /// Returns how many were removed.
    pub fn remove_sources(&self, audio_ids: Vec<String>) -> Result<usize> {
        self.call(move |c| c.remove_sources(&audio_ids))
    }

    // Transport

    /// Play `source`, or resume the bound item when `None`.
    ///
    /// Returns once the item is bound; load failures arrive later as a
    /// `playbackError` event.
    pub fn play(&self, source: Option<AudioSource>) -> Result<()> {
        self.call(move |c| c.play(source))?
    }

    pub fn resume(&self) -> Result<()> {
        self.call(Controller::resume)
    }

    pub fn pause(&self) -> Result<()> {
        self.call(Controller::pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.call(Controller::stop)
    }

    /// Ask the navigation policy for the next item.
    pub fn play_next(&self) -> Result<()> {
        self.call(|c| c.play_next())
    }

    /// Ask the navigation policy for the previous item.
    pub fn play_previous(&self) -> Result<()> {
        self.call(|c| c.play_previous())
    }

    /// Seek to an absolute position in seconds.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.call(move |c| c.seek(seconds))?
    }

    /// Seek forward by `by` seconds (default step from config). A target past
    /// the end is ignored.
    pub fn seek_forward(&self, by: Option<f64>) -> Result<()> {
        let by = by.unwrap_or(self.inner.config.seek_step_secs);
        self.call(move |c| c.seek_forward(by))?
    }

    /// Seek backward by `by` seconds (default step from config), stopping at
    /// zero.
    pub fn seek_backward(&self, by: Option<f64>) -> Result<()> {
        let by = by.unwrap_or(self.inner.config.seek_step_secs);
        self.call(move |c| c.seek_backward(by))?
    }

    /// Set output volume. Values outside `0.0..=1.0` are logged and ignored.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.call(move |c| c.set_volume(volume))
    }

    /// Set playback rate. Non-positive or non-finite values are ignored.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        self.call(move |c| c.set_rate(rate))
    }

    // Environment

    /// Feed a platform route-change notification.
    pub fn route_changed(&self, change: RouteChange) -> Result<()> {
        self.send(Request::RouteChanged(change))
    }

    pub fn interruption_began(&self) -> Result<()> {
        self.send(Request::InterruptionBegan)
    }

    pub fn interruption_ended(&self, should_resume: bool) -> Result<()> {
        self.send(Request::InterruptionEnded { should_resume })
    }

    // Queries

    /// True when the engine reports a nonzero rate and no error.
    pub fn is_playing(&self) -> bool {
        self.query(|c| c.is_playing())
    }

    pub fn state(&self) -> PlaybackState {
        self.query(|c| c.state())
    }

    /// The entry at the current index. Updated as soon as `play` binds,
    /// before loading finishes.
    pub fn current_audio_source(&self) -> Option<AudioSource> {
        self.query(|c| c.current_audio_source())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.query(|c| c.current_index())
    }

    pub fn sources(&self) -> Vec<AudioSource> {
        self.query(|c| c.sources())
    }

    pub fn is_airplay_active(&self) -> bool {
        self.query(|c| c.route_state().airplay_active)
    }

    pub fn route_state(&self) -> RouteState {
        self.query(|c| c.route_state())
    }

    /// The last snapshot handed to the now-playing surface.
    pub fn now_playing(&self) -> Option<NowPlayingSnapshot> {
        self.query(|c| c.now_playing())
    }

    /// Duration of the bound item in seconds.
    ///
    /// Blocks up to the readiness timeout while the item is loading. Returns
    /// 0.0 when nothing is bound, the item failed, or the wait timed out.
    pub fn current_duration(&self) -> f64 {
        self.read_live(Controller::live_duration)
    }

    /// Playback position in seconds, with the same waiting rules as
    /// [`current_duration`](Self::current_duration).
    pub fn current_time(&self) -> f64 {
        self.read_live(Controller::live_time)
    }

    pub async fn current_duration_async(&self) -> f64 {
        self.read_live_async(Controller::live_duration).await
    }

    pub async fn current_time_async(&self) -> f64 {
        self.read_live_async(Controller::live_time).await
    }

    /// Wait for the bound item to settle, reporting how the wait ended.
    pub fn wait_ready(&self) -> ReadinessOutcome {
        match self.call(|c| c.readiness()) {
            Ok(Settled::Now(outcome)) => outcome,
            Ok(Settled::Pending(readiness)) => readiness.wait(self.inner.config.readiness_timeout()),
            Err(e) => {
                warn!("Readiness query failed: {e}");
                ReadinessOutcome::Unbound
            }
        }
    }

    pub async fn wait_ready_async(&self) -> ReadinessOutcome {
        match self.call_async(|c| c.readiness()).await {
            Ok(Settled::Now(outcome)) => outcome,
            Ok(Settled::Pending(readiness)) => {
                readiness
                    .wait_async(self.inner.config.readiness_timeout())
                    .await
            }
            Err(e) => {
                warn!("Readiness query failed: {e}");
                ReadinessOutcome::Unbound
            }
        }
    }

    /// Stop the control thread and wait for it to exit. Later commands fail
    /// with [`Error::ControllerStopped`].
    pub fn shutdown(&self) {
        let _ = self.inner.tx.send(Request::Shutdown);
        let handle = self.inner.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Control thread panicked");
            }
            debug!("Playlist manager shut down");
        }
    }

    // Plumbing

    fn send(&self, request: Request) -> Result<()> {
        self.inner
            .tx
            .send(request)
            .map_err(|_| Error::ControllerStopped)
    }

    /// Run `f` on the control thread and wait for its result.
    fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Controller) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(Request::Command(Box::new(move |controller| {
            let _ = reply_tx.send(f(controller));
        })))?;
        reply_rx.recv().map_err(|_| Error::ControllerStopped)
    }

    async fn call_async<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Controller) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Request::Command(Box::new(move |controller| {
            let _ = reply_tx.send(f(controller));
        })))?;
        reply_rx.await.map_err(|_| Error::ControllerStopped)
    }

    fn query<R, F>(&self, f: F) -> R
    where
        R: Default + Send + 'static,
        F: FnOnce(&mut Controller) -> R + Send + 'static,
    {
        self.call(f).unwrap_or_else(|e| {
            warn!("Query failed: {e}");
            R::default()
        })
    }

    fn read_live(&self, read: fn(&Controller) -> LiveRead) -> f64 {
        match self.call(move |c| read(c)) {
            Ok(LiveRead::Value(value)) => value,
            Ok(LiveRead::Pending(readiness)) => {
                match readiness.wait(self.inner.config.readiness_timeout()) {
                    ReadinessOutcome::Ready => match self.call(move |c| read(c)) {
                        Ok(LiveRead::Value(value)) => value,
                        _ => 0.0,
                    },
                    outcome => {
                        debug!("Live read resolved to zero ({outcome:?})");
                        0.0
                    }
                }
            }
            Err(e) => {
                warn!("Live read failed: {e}");
                0.0
            }
        }
    }

    async fn read_live_async(&self, read: fn(&Controller) -> LiveRead) -> f64 {
        match self.call_async(move |c| read(c)).await {
            Ok(LiveRead::Value(value)) => value,
            Ok(LiveRead::Pending(readiness)) => {
                match readiness
                    .wait_async(self.inner.config.readiness_timeout())
                    .await
                {
                    ReadinessOutcome::Ready => match self.call_async(move |c| read(c)).await {
                        Ok(LiveRead::Value(value)) => value,
                        _ => 0.0,
                    },
                    outcome => {
                        debug!("Live read resolved to zero ({outcome:?})");
                        0.0
                    }
                }
            }
            Err(e) => {
                warn!("Live read failed: {e}");
                0.0
            }
        }
    }
}

impl std::fmt::Debug for PlaylistManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistManager")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
