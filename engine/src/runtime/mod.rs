//! Boundary runtime: the task that owns the session, plus its timers and IO.
//!
//! One tokio task owns the [`Session`] and is the only code that mutates it.
//! Everything else (the landmark stream, timer firings, capture and
//! classification completions, user commands) reaches it as a [`Command`]
//! on one channel. Timers hold a weak sender so that dropping every
//! [`EngineHandle`] shuts the task down.

use std::sync::Arc;
use std::time::Duration;

use sortcam_core::{Effect, PhaseTag, Session, SessionEvent, SessionSnapshot, SessionTiming};
use sortcam_providers::{BackendTarget, BackendTargetError, DispatchError};
use sortcam_types::{CaptureArtifact, CycleId, Observation};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::capture::{self, FrameSize, VideoSource};
use crate::classifier::Classifier;
use crate::config::EngineSettings;

const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine has shut down")]
    Closed,
    #[error(transparent)]
    Backend(#[from] BackendTargetError),
}

/// Startup options for the runtime task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub target: BackendTarget,
    pub fallback_frame: FrameSize,
    pub timing: SessionTiming,
}

impl From<&EngineSettings> for EngineOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            target: settings.target.clone(),
            fallback_frame: settings.fallback_frame,
            timing: SessionTiming::default(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Session(SessionEvent),
    SelectBackend(BackendTarget),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    backend: watch::Receiver<BackendTarget>,
}

impl EngineHandle {
    /// Feed one landmark-stream tick.
    pub async fn observe(&self, observation: Observation) -> Result<(), EngineError> {
        self.send(Command::Session(SessionEvent::Observation(observation)))
            .await
    }

    /// Acknowledge a result or failure. Ignored while a cycle is active.
    pub async fn reset(&self) -> Result<(), EngineError> {
        self.send(Command::Session(SessionEvent::Reset)).await
    }

    /// Switch backends. Takes effect at the next dispatch.
    pub async fn select_backend(&self, target: BackendTarget) -> Result<(), EngineError> {
        self.send(Command::SelectBackend(target)).await
    }

    /// Validate `raw` and switch to that local model server. On a bad URL the
    /// current target is kept.
    pub async fn select_local(&self, raw: &str) -> Result<(), EngineError> {
        let target = BackendTarget::local(raw)?;
        self.select_backend(target).await
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn backend(&self) -> BackendTarget {
        self.backend.borrow().clone()
    }

    /// Stop the runtime task and wait for it to exit.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }
}

/// Spawn the runtime task on the current tokio runtime.
pub fn spawn_engine(
    options: EngineOptions,
    source: Arc<dyn VideoSource>,
    classifier: Arc<dyn Classifier>,
) -> (EngineHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let session = Session::new(options.timing);
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let (backend_tx, backend_rx) = watch::channel(options.target.clone());

    let runtime = Runtime {
        session,
        target: options.target,
        fallback_frame: options.fallback_frame,
        source,
        classifier,
        commands: tx.downgrade(),
        snapshots: snapshot_tx,
        backend: backend_tx,
    };
    let join = tokio::spawn(runtime.run(rx));

    let handle = EngineHandle {
        commands: tx,
        snapshots: snapshot_rx,
        backend: backend_rx,
    };
    (handle, join)
}

struct Runtime {
    session: Session,
    target: BackendTarget,
    fallback_frame: FrameSize,
    source: Arc<dyn VideoSource>,
    classifier: Arc<dyn Classifier>,
    commands: mpsc::WeakSender<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    backend: watch::Sender<BackendTarget>,
}

impl Runtime {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::debug!(backend = %self.target, "Engine started");
        while let Some(command) = rx.recv().await {
            match command {
                Command::Session(event) => {
                    let effects = self.session.handle(event);
                    for effect in effects {
                        self.perform(effect);
                    }
                }
                Command::SelectBackend(target) => self.select_backend(target),
                Command::Shutdown(done) => {
                    tracing::debug!("Engine shutting down");
                    let _ = done.send(());
                    return;
                }
            }
            self.publish();
        }
        tracing::debug!("All engine handles dropped");
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn select_backend(&mut self, target: BackendTarget) {
        if self.session.phase() == PhaseTag::Classifying {
            tracing::info!(backend = %target, "Backend switched; applies to the next request");
        } else {
            tracing::info!(backend = %target, "Backend switched");
        }
        self.target = target.clone();
        self.backend.send_replace(target);
    }

    fn perform(&self, effect: Effect) {
        match effect {
            Effect::StartDwellTimer { generation, after } => {
                self.schedule(after, SessionEvent::DwellElapsed(generation));
            }
            Effect::StartTickTimer { generation, after } => {
                self.schedule(after, SessionEvent::CountdownTick(generation));
            }
            Effect::Capture { cycle } => self.spawn_capture(cycle),
            Effect::Dispatch { cycle, artifact } => self.spawn_dispatch(cycle, artifact),
        }
    }

    /// One-shot timer. The session discards the event if its generation is stale.
    fn schedule(&self, after: Duration, event: SessionEvent) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            deliver(&commands, event).await;
        });
    }

    fn spawn_capture(&self, cycle: CycleId) {
        let source = Arc::clone(&self.source);
        let fallback = self.fallback_frame;
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || capture::capture(source.as_ref(), fallback))
                    .await;
            let event = match outcome {
                Ok(Ok(artifact)) => SessionEvent::Captured { cycle, artifact },
                Ok(Err(e)) => SessionEvent::CaptureFailed {
                    cycle,
                    reason: e.to_string(),
                },
                Err(e) => SessionEvent::CaptureFailed {
                    cycle,
                    reason: format!("capture task failed: {e}"),
                },
            };
            deliver(&commands, event).await;
        });
    }

    fn spawn_dispatch(&self, cycle: CycleId, artifact: CaptureArtifact) {
        // Target is read here, at dispatch time.
        let request = self.classifier.classify(artifact, self.target.clone());
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let event = match request.await {
                Ok(result) => SessionEvent::Classified { cycle, result },
                // The outstanding request belongs to another caller; this
                // cycle still has to leave Classifying.
                Err(e @ DispatchError::Busy) => {
                    tracing::debug!(%cycle, "Dispatch rejected as duplicate");
                    SessionEvent::ClassificationFailed {
                        cycle,
                        failure: e.to_failure(),
                    }
                }
                Err(e) => SessionEvent::ClassificationFailed {
                    cycle,
                    failure: e.to_failure(),
                },
            };
            deliver(&commands, event).await;
        });
    }
}

async fn deliver(commands: &mpsc::WeakSender<Command>, event: SessionEvent) {
    let Some(commands) = commands.upgrade() else {
        return;
    };
    if commands.send(Command::Session(event)).await.is_err() {
        tracing::debug!("Engine stopped before event delivery");
    }
}
