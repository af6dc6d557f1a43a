//! Now-playing projection.
//!
//! Snapshots are published immediately without artwork; artwork is resolved
//! on a background thread and the snapshot is republished once it arrives.
//! Artwork failures only ever mean "no artwork".

use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use segue_core::{Artwork, ArtworkResolver, AudioSource, Error, NowPlayingSnapshot, Result};
use tracing::{debug, info, trace, warn};

use crate::control::Request;

/// The system "now playing" surface (lock screen, media session, ...).
pub trait NowPlayingSurface: Send + Sync {
    fn publish(&self, snapshot: &NowPlayingSnapshot);
    fn clear(&self);
}

/// Work item for the artwork thread.
#[derive(Debug)]
pub(crate) struct ArtworkJob {
    request: u64,
    locator: String,
}

/// Builds snapshots on the controller thread.
pub(crate) struct NowPlayingProjector {
    surface: Option<Arc<dyn NowPlayingSurface>>,
    artwork_tx: Option<Sender<ArtworkJob>>,
    /// Id of the artwork request whose result may still be applied.
    request: u64,
    pending_locator: Option<String>,
    cached: Option<(String, Arc<Artwork>)>,
    last: Option<NowPlayingSnapshot>,
}

impl NowPlayingProjector {
    pub(crate) fn new(
        surface: Option<Arc<dyn NowPlayingSurface>>,
        artwork_tx: Option<Sender<ArtworkJob>>,
    ) -> Self {
        Self {
            surface,
            artwork_tx,
            request: 0,
            pending_locator: None,
            cached: None,
            last: None,
        }
    }

    pub(crate) const fn last(&self) -> Option<&NowPlayingSnapshot> {
        self.last.as_ref()
    }

    /// Rebuild and publish. `None` clears the surface.
    pub(crate) fn refresh(
        &mut self,
        source: Option<&AudioSource>,
        duration: f64,
        elapsed_time: f64,
        rate: f32,
    ) {
        let Some(source) = source else {
            self.invalidate_request();
            if self.last.take().is_some() {
                if let Some(surface) = &self.surface {
                    surface.clear();
                }
            }
            return;
        };

        let mut snapshot = NowPlayingSnapshot::from_source(source, duration, elapsed_time, rate);

        match source.artwork_source.as_deref() {
            Some(locator) => match &self.cached {
                Some((cached_locator, artwork)) if cached_locator == locator => {
                    snapshot.artwork = Some(artwork.clone());
                }
                _ => self.request_artwork(locator),
            },
            None => self.invalidate_request(),
        }

        self.publish(snapshot);
    }

    /// Apply a finished artwork lookup if it is still the one we want.
    pub(crate) fn artwork_resolved(&mut self, request: u64, locator: String, result: Result<Artwork>) {
        if request != self.request {
            trace!("Dropping stale artwork for {locator}");
            return;
        }
        self.pending_locator = None;

        match result {
            Ok(artwork) => {
                let artwork = Arc::new(artwork);
                self.cached = Some((locator, artwork.clone()));
                if let Some(snapshot) = self.last.as_ref().map(|s| s.with_artwork(artwork)) {
                    self.publish(snapshot);
                }
            }
            Err(e) => warn!("Artwork unavailable for {locator}: {e}"),
        }
    }

    fn request_artwork(&mut self, locator: &str) {
        if self.pending_locator.as_deref() == Some(locator) {
            return;
        }
        let Some(tx) = &self.artwork_tx else {
            return;
        };

        self.request += 1;
        self.pending_locator = Some(locator.to_string());
        let job = ArtworkJob {
            request: self.request,
            locator: locator.to_string(),
        };
        if tx.send(job).is_err() {
            warn!("Artwork worker is not running");
            self.pending_locator = None;
        }
    }

    fn invalidate_request(&mut self) {
        self.request += 1;
        self.pending_locator = None;
    }

    fn publish(&mut self, snapshot: NowPlayingSnapshot) {
        if let Some(surface) = &self.surface {
            surface.publish(&snapshot);
        }
        self.last = Some(snapshot);
    }
}

/// Spawn the thread that runs artwork lookups and posts results back to the
/// controller queue.
pub(crate) fn spawn_artwork_worker(
    resolver: Arc<dyn ArtworkResolver>,
    control_tx: Sender<Request>,
) -> Result<Sender<ArtworkJob>> {
    let (job_tx, job_rx) = unbounded::<ArtworkJob>();

    std::thread::Builder::new()
        .name("segue-artwork".to_string())
        .spawn(move || {
            info!("Artwork worker started");
            for job in job_rx {
                debug!("Resolving artwork {}", job.locator);
                let result = resolver.resolve(&job.locator);
                let resolved = Request::ArtworkResolved {
                    request: job.request,
                    locator: job.locator,
                    result,
                };
                if control_tx.send(resolved).is_err() {
                    break;
                }
            }
            debug!("Artwork worker stopped");
        })
        .map_err(Error::Io)?;

    Ok(job_tx)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSurface {
        published: Mutex<Vec<NowPlayingSnapshot>>,
        clears: Mutex<usize>,
    }

    impl NowPlayingSurface for RecordingSurface {
        fn publish(&self, snapshot: &NowPlayingSnapshot) {
            self.published.lock().push(snapshot.clone());
        }

        fn clear(&self) {
            *self.clears.lock() += 1;
        }
    }

    fn artwork() -> Artwork {
        Artwork {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        }
    }

    fn projector() -> (NowPlayingProjector, Arc<RecordingSurface>, crossbeam_channel::Receiver<ArtworkJob>) {
        let surface = Arc::new(RecordingSurface::default());
        let (tx, rx) = unbounded();
        let projector = NowPlayingProjector::new(Some(surface.clone()), Some(tx));
        (projector, surface, rx)
    }

    #[test]
    fn test_publishes_without_waiting_for_artwork() {
        let (mut projector, surface, jobs) = projector();
        let source = AudioSource::new("a", "/a.mp3", "Song", "Band").with_artwork("https://img/a.jpg");

        projector.refresh(Some(&source), 180.0, 3.0, 1.0);

        let published = surface.published.lock().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "Song");
        assert!(published[0].artwork.is_none());

        let job = jobs.try_recv().unwrap();
        projector.artwork_resolved(job.request, job.locator, Ok(artwork()));

        let published = surface.published.lock().clone();
        assert_eq!(published.len(), 2);
        assert!(published[1].artwork.is_some());
        assert!((published[1].duration - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cached_artwork_is_reused() {
        let (mut projector, surface, jobs) = projector();
        let source = AudioSource::new("a", "/a.mp3", "Song", "Band").with_artwork("file:///a.png");

        projector.refresh(Some(&source), 10.0, 0.0, 1.0);
        let job = jobs.try_recv().unwrap();
        projector.artwork_resolved(job.request, job.locator, Ok(artwork()));

        projector.refresh(Some(&source), 10.0, 5.0, 0.0);
        assert!(jobs.try_recv().is_err());
        let last = surface.published.lock().last().cloned().unwrap();
        assert!(last.artwork.is_some());
        assert!(!last.is_playing());
    }

    #[test]
    fn test_stale_and_failed_artwork_is_ignored() {
        let (mut projector, surface, jobs) = projector();
        let first = AudioSource::new("a", "/a.mp3", "A", "X").with_artwork("https://img/a.jpg");
        let second = AudioSource::new("b", "/b.mp3", "B", "X").with_artwork("https://img/b.jpg");

        projector.refresh(Some(&first), 0.0, 0.0, 0.0);
        let stale = jobs.try_recv().unwrap();
        projector.refresh(Some(&second), 0.0, 0.0, 0.0);
        let current = jobs.try_recv().unwrap();

        projector.artwork_resolved(stale.request, stale.locator, Ok(artwork()));
        projector.artwork_resolved(
            current.request,
            current.locator,
            Err(Error::Artwork("404".into())),
        );

        let published = surface.published.lock().clone();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|s| s.artwork.is_none()));
        assert_eq!(projector.last().unwrap().audio_id, "b");
    }

    #[test]
    fn test_refresh_without_source_clears_once() {
        let (mut projector, surface, _jobs) = projector();
        let source = AudioSource::new("a", "/a.mp3", "A", "X");

        projector.refresh(Some(&source), 0.0, 0.0, 0.0);
        projector.refresh(None, 0.0, 0.0, 0.0);
        projector.refresh(None, 0.0, 0.0, 0.0);

        assert_eq!(*surface.clears.lock(), 1);
        assert!(projector.last().is_none());
    }
}
