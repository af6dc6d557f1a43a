//! Scripted render engine for controller tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use segue_core::{AudioSource, Error, Locator, Result};

use crate::engine::{EngineItemSink, RenderEngine};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCall {
    Load(String),
    Unload,
    Play,
    Pause,
    Seek(f64),
    SetRate(f32),
    SetVolume(f32),
}

#[derive(Debug)]
pub(crate) struct FakeState {
    pub calls: Vec<EngineCall>,
    pub sink: Option<EngineItemSink>,
    pub playing: bool,
    pub time: f64,
    pub duration: Option<f64>,
    /// Rate applied while playing.
    pub rate: f32,
    pub error: bool,
    /// Report readiness with this duration as soon as an item loads.
    pub auto_ready: Option<f64>,
    /// Locators that report an asynchronous load failure.
    pub failing: HashSet<String>,
    /// Make `load` itself return an error.
    pub reject_loads: bool,
    /// Confirm seeks immediately.
    pub complete_seeks: bool,
    /// Make `seek` return an error.
    pub reject_seeks: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            sink: None,
            playing: false,
            time: 0.0,
            duration: None,
            rate: 1.0,
            error: false,
            auto_ready: Some(120.0),
            failing: HashSet::new(),
            reject_loads: false,
            complete_seeks: true,
            reject_seeks: false,
        }
    }
}

/// Cloneable fake; clones share state so tests keep a handle after the
/// controller takes ownership.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeEngine {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// An engine whose items stay loading until the test reports readiness.
    pub(crate) fn manual() -> Self {
        let engine = Self::default();
        engine.state().auto_ready = None;
        engine
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub(crate) fn fail_locator(&self, locator: &str) {
        self.state().failing.insert(locator.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub(crate) fn loads(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Load(locator) => Some(locator.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn sink(&self) -> Option<EngineItemSink> {
        self.state().sink.clone()
    }

    /// Poll until `predicate` holds or two seconds pass.
    pub(crate) fn wait_for(&self, predicate: impl Fn(&FakeState) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if predicate(&self.state()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl RenderEngine for FakeEngine {
    fn load(&mut self, locator: &Locator, sink: EngineItemSink) -> Result<()> {
        let mut state = self.state();
        let locator = locator.to_string();
        state.calls.push(EngineCall::Load(locator.clone()));
        if state.reject_loads {
            return Err(Error::EngineLoadFailed(format!("cannot open {locator}")));
        }

        state.time = 0.0;
        state.duration = None;
        state.error = false;
        if state.failing.contains(&locator) {
            state.error = true;
            sink.failed(format!("unsupported media at {locator}"));
        } else if let Some(duration) = state.auto_ready {
            state.duration = Some(duration);
            sink.ready(Some(duration));
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn unload(&mut self) {
        let mut state = self.state();
        state.calls.push(EngineCall::Unload);
        state.sink = None;
        state.playing = false;
        state.duration = None;
        state.time = 0.0;
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(EngineCall::Play);
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(EngineCall::Pause);
        state.playing = false;
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        let mut state = self.state();
        state.calls.push(EngineCall::Seek(seconds));
        if state.reject_seeks {
            return Err(Error::EngineCommandFailed("seek rejected".to_string()));
        }
        if state.complete_seeks {
            state.time = seconds;
            if let Some(sink) = &state.sink {
                sink.seek_completed(seconds, true);
            }
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state().time
    }

    fn duration(&self) -> Option<f64> {
        self.state().duration
    }

    fn rate(&self) -> f32 {
        let state = self.state();
        if state.playing && state.sink.is_some() {
            state.rate
        } else {
            0.0
        }
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        let mut state = self.state();
        state.calls.push(EngineCall::SetRate(rate));
        state.rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.state().calls.push(EngineCall::SetVolume(volume));
        Ok(())
    }

    fn has_error(&self) -> bool {
        self.state().error
    }
}

/// A remote source, so tests never touch the filesystem.
pub(crate) fn source(id: &str) -> AudioSource {
    AudioSource::new(
        id,
        format!("https://cdn.example.com/{id}.mp3"),
        format!("Title {id}"),
        "Artist",
    )
}

pub(crate) fn locator(id: &str) -> String {
    format!("https://cdn.example.com/{id}.mp3")
}

/// Route controller logs to the test harness; filter with `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
