//! Serialized access to a stateful speech engine
//!
//! The offline engine keeps process-wide state and misbehaves when a second
//! synthesis starts before the first has released its resources. The
//! [`SynthesisGate`] lets exactly one request at a time run the full engine
//! lifecycle:
//!
//! `Idle → Acquiring → Configuring → Synthesizing → Draining → TornDown → Idle`
//!
//! Every request gets a freshly created engine, and the engine is torn down
//! before the gate is released, on every exit path.

mod drain;
pub mod engine;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use speechgate_config::GateConfig;
use tokio::sync::{Mutex, OwnedMutexGuard};

use self::drain::{Settle, wait_for_stable_size};
use self::engine::{EngineError, EngineFactory, SpeechEngine};
use crate::{
    error::{Result, TtsError},
    types::{AudioFormat, OutputArtifact, SynthesisRequest},
};

/// Lifecycle position of the request currently holding the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateState {
    Idle = 0,
    Acquiring = 1,
    Configuring = 2,
    Synthesizing = 3,
    Draining = 4,
    TornDown = 5,
}

impl GateState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Acquiring,
            2 => Self::Configuring,
            3 => Self::Synthesizing,
            4 => Self::Draining,
            5 => Self::TornDown,
            _ => Self::Idle,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Configuring => "configuring",
            Self::Synthesizing => "synthesizing",
            Self::Draining => "draining",
            Self::TornDown => "torn_down",
        }
    }
}

/// Timings governing one engine lifecycle
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// Voice used when a request asks for an index the engine does not have
    pub default_voice_index: usize,
    pub poll_interval: Duration,
    pub settle_timeout: Duration,
    pub teardown_pause: Duration,
    pub acquire_timeout: Option<Duration>,
    /// Longest a single engine run may take before it is killed
    pub synthesis_timeout: Duration,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            default_voice_index: 0,
            poll_interval: Duration::from_millis(50),
            settle_timeout: Duration::from_secs(5),
            teardown_pause: Duration::from_millis(200),
            acquire_timeout: None,
            synthesis_timeout: Duration::from_secs(120),
        }
    }
}

impl GateSettings {
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        let invalid = |e: anyhow::Error| TtsError::ConfigError(e.to_string());

        Ok(Self {
            default_voice_index: config.default_voice_index,
            poll_interval: config.poll_interval().map_err(invalid)?,
            settle_timeout: config.settle_timeout().map_err(invalid)?,
            teardown_pause: config.teardown_pause().map_err(invalid)?,
            acquire_timeout: config.acquire_timeout().map_err(invalid)?,
            synthesis_timeout: config.synthesis_timeout().map_err(invalid)?,
        })
    }
}

/// Mutual exclusion around a single stateful speech engine
#[derive(Clone)]
pub struct SynthesisGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    factory: Arc<dyn EngineFactory>,
    lock: Arc<Mutex<()>>,
    state: AtomicU8,
    waiting: AtomicUsize,
    settings: GateSettings,
}

impl SynthesisGate {
    pub fn new(factory: Arc<dyn EngineFactory>, settings: GateSettings) -> Self {
        Self {
            inner: Arc::new(GateInner {
                factory,
                lock: Arc::new(Mutex::new(())),
                state: AtomicU8::new(GateState::Idle as u8),
                waiting: AtomicUsize::new(0),
                settings,
            }),
        }
    }

    /// Current lifecycle state of the gate holder
    pub fn state(&self) -> GateState {
        GateState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Number of requests blocked on acquisition
    pub fn waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::Acquire)
    }

    pub fn format(&self) -> AudioFormat {
        self.inner.factory.format()
    }

    /// Render `request` into `output` with exclusive use of the engine
    ///
    /// Waits for the gate, then runs the whole engine lifecycle on a
    /// blocking worker that owns the lock. Dropping the returned future does
    /// not release the gate early: the worker finishes tearing the engine
    /// down first.
    ///
    /// # Errors
    ///
    /// - `GateBusy` if the configured acquire timeout elapses
    /// - `EngineInitFailure` if the engine cannot be started
    /// - `SynthesisFailure` if the engine errors or leaves no usable file
    pub async fn synthesize(&self, request: SynthesisRequest, output: PathBuf) -> Result<OutputArtifact> {
        let guard = self.acquire().await?;
        let inner = Arc::clone(&self.inner);
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            inner.run(guard, &request, &output)
        })
        .await
        .map_err(|e| {
            tracing::error!("synthesis worker aborted: {e}");
            TtsError::InternalError(None)
        })?
    }

    async fn acquire(&self) -> Result<OwnedMutexGuard<()>> {
        let lock = Arc::clone(&self.inner.lock);

        let acquired = {
            let mut waiter = Waiter::enter(&self.inner);

            let guard = match self.inner.settings.acquire_timeout {
                Some(limit) => tokio::time::timeout(limit, lock.lock_owned()).await.ok(),
                None => Some(lock.lock_owned().await),
            };
            waiter.acquired = guard.is_some();
            guard
        };

        acquired.ok_or_else(|| {
            tracing::warn!(waiting = self.waiting(), "timed out waiting for synthesis gate");
            TtsError::GateBusy
        })
    }
}

/// Counts a request as waiting until dropped, including on cancellation
///
/// An idle gate reports `Acquiring` while anyone waits. The last waiter to
/// give up without the lock puts it back to `Idle`.
struct Waiter<'a> {
    gate: &'a GateInner,
    acquired: bool,
}

impl<'a> Waiter<'a> {
    fn enter(gate: &'a GateInner) -> Self {
        gate.waiting.fetch_add(1, Ordering::AcqRel);
        gate.replace_state(GateState::Idle, GateState::Acquiring);
        tracing::trace!(state = GateState::Acquiring.as_str(), "waiting for synthesis gate");

        Self { gate, acquired: false }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let remaining = self.gate.waiting.fetch_sub(1, Ordering::AcqRel) - 1;

        if !self.acquired && remaining == 0 {
            self.gate.replace_state(GateState::Acquiring, GateState::Idle);
        }
    }
}

/// Holds the gate for one lifecycle; hands the state back on drop
struct Holder<'a> {
    gate: &'a GateInner,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for Holder<'_> {
    fn drop(&mut self) {
        let next = if self.gate.waiting.load(Ordering::Acquire) > 0 {
            GateState::Acquiring
        } else {
            GateState::Idle
        };

        self.gate.state.store(next as u8, Ordering::Release);
        tracing::trace!(state = next.as_str(), "synthesis gate released");
    }
}

impl GateInner {
    fn transition(&self, state: GateState) {
        self.state.store(state as u8, Ordering::Release);
        tracing::trace!(state = state.as_str(), "synthesis gate transition");
    }

    fn replace_state(&self, current: GateState, next: GateState) {
        let _ = self
            .state
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire);
    }

    fn run(&self, guard: OwnedMutexGuard<()>, request: &SynthesisRequest, output: &Path) -> Result<OutputArtifact> {
        let _holder = Holder { gate: self, _guard: guard };

        self.transition(GateState::Configuring);

        let mut engine = self.factory.create().map_err(|e| {
            tracing::error!(
                voice_index = ?request.voice_index(),
                text_len = request.text().len(),
                "speech engine failed to start: {e}"
            );
            TtsError::EngineInitFailure(e.to_string())
        })?;

        let rendered = self.render(engine.as_mut(), request, output);

        self.transition(GateState::Draining);

        if rendered.is_ok() {
            match wait_for_stable_size(output, self.settings.poll_interval, self.settings.settle_timeout) {
                Settle::Stable(size) => tracing::debug!(?size, "engine output settled"),
                Settle::TimedOut(size) => {
                    tracing::warn!(?size, "engine output still changing after settle timeout");
                }
            }
        }

        if let Err(e) = engine.stop() {
            tracing::debug!("ignoring engine stop failure: {e}");
        }

        engine.dispose();
        self.transition(GateState::TornDown);

        if !self.settings.teardown_pause.is_zero() {
            std::thread::sleep(self.settings.teardown_pause);
        }

        if let Err(e) = rendered {
            tracing::error!(
                voice_index = ?request.voice_index(),
                rate = request.rate(),
                volume = request.volume(),
                text_len = request.text().len(),
                "speech synthesis failed: {e}"
            );
            return Err(TtsError::SynthesisFailure(e.to_string()));
        }

        OutputArtifact::verify(output).inspect_err(|e| {
            tracing::error!(
                voice_index = ?request.voice_index(),
                text_len = request.text().len(),
                path = %output.display(),
                "engine produced no usable output: {e}"
            );
        })
    }

    fn render(
        &self,
        engine: &mut dyn SpeechEngine,
        request: &SynthesisRequest,
        output: &Path,
    ) -> std::result::Result<(), EngineError> {
        let voices = engine.voices()?;

        let index = match request.voice_index() {
            Some(index) if index < voices.len() => index,
            Some(index) => {
                tracing::warn!(
                    requested = index,
                    available = voices.len(),
                    fallback = self.settings.default_voice_index,
                    "voice index out of range, using default"
                );
                self.settings.default_voice_index
            }
            None => self.settings.default_voice_index,
        };

        match voices.get(index).or_else(|| voices.first()) {
            Some(voice) => {
                tracing::debug!(voice = %voice.id, "selecting engine voice");
                engine.set_voice(&voice.id)?;
            }
            None => tracing::warn!("engine reports no voices, keeping its default"),
        }

        engine.set_rate(request.rate())?;
        engine.set_volume(request.volume())?;

        self.transition(GateState::Synthesizing);

        engine.save_to_file(request.text(), output)?;
        engine.run_and_wait()
    }
}
