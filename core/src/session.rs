//! The capture session: single owner of [`SessionState`] and its sub-state.
//!
//! The session is sans-IO. Callers feed it [`SessionEvent`]s (landmark ticks,
//! timer firings, capture and classification completions, resets) and carry
//! out the [`Effect`]s it returns. Timer firings name the generation they
//! were scheduled under; a stale generation is a no-op, which is how
//! cancellation works without ever aborting a timer.

use std::panic::Location;
use std::time::{Duration, Instant};

use sortcam_types::{
    CaptureArtifact, ClassificationFailure, ClassificationResult, CycleId, Generation, GrabSignal,
    Observation,
};

use crate::countdown::{
    COUNTDOWN_FROM, CountdownController, CountdownState, TICK_INTERVAL, TickOutcome,
};
use crate::grab;
use crate::stability::{DWELL_DURATION, GateUpdate, StabilityGate};
use crate::state::{PhaseTag, SessionState};
use crate::transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub dwell: Duration,
    pub countdown_from: u8,
    pub tick: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            dwell: DWELL_DURATION,
            countdown_from: COUNTDOWN_FROM,
            tick: TICK_INTERVAL,
        }
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    Observation(Observation),
    DwellElapsed(Generation),
    CountdownTick(Generation),
    Captured {
        cycle: CycleId,
        artifact: CaptureArtifact,
    },
    CaptureFailed {
        cycle: CycleId,
        reason: String,
    },
    Classified {
        cycle: CycleId,
        result: ClassificationResult,
    },
    ClassificationFailed {
        cycle: CycleId,
        failure: ClassificationFailure,
    },
    Reset,
}

/// Work the caller must perform on the session's behalf.
#[derive(Debug)]
pub enum Effect {
    /// Deliver `DwellElapsed(generation)` after `after`.
    StartDwellTimer {
        generation: Generation,
        after: Duration,
    },
    /// Deliver `CountdownTick(generation)` after `after`.
    StartTickTimer {
        generation: Generation,
        after: Duration,
    },
    /// Grab one frame and report `Captured` or `CaptureFailed`.
    Capture { cycle: CycleId },
    /// Send the artifact for classification and report the outcome.
    Dispatch {
        cycle: CycleId,
        artifact: CaptureArtifact,
    },
}

/// Read-only view for UI feedback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub phase: PhaseTag,
    pub grabbing: bool,
    pub countdown: Option<u8>,
    pub result: Option<ClassificationResult>,
    pub failure: Option<ClassificationFailure>,
    pub notice: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    gate: StabilityGate,
    countdown: CountdownController,
    timing: SessionTiming,
    last_signal: Option<GrabSignal>,
    next_cycle: CycleId,
    notice: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionTiming::default())
    }
}

impl Session {
    #[must_use]
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            state: SessionState::Idle,
            gate: StabilityGate::new(timing.dwell),
            countdown: CountdownController::new(timing.countdown_from),
            timing,
            last_signal: None,
            next_cycle: CycleId::new(1),
            notice: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> PhaseTag {
        self.state.tag()
    }

    #[must_use]
    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    /// Latest grab signal, whether or not it is driving transitions.
    #[must_use]
    pub fn is_grabbing(&self) -> bool {
        self.last_signal.is_some_and(GrabSignal::is_grabbing)
    }

    #[must_use]
    pub fn stability_window(&self) -> Option<Instant> {
        self.gate.window_start()
    }

    #[must_use]
    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            grabbing: self.is_grabbing(),
            countdown: self.countdown.remaining(),
            result: match &self.state {
                SessionState::ResultReady(result) => Some(result.clone()),
                _ => None,
            },
            failure: match &self.state {
                SessionState::Failed(failure) => Some(failure.clone()),
                _ => None,
            },
            notice: self.notice.clone(),
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let effects = match event {
            SessionEvent::Observation(observation) => self.on_observation(&observation),
            SessionEvent::DwellElapsed(generation) => self.on_dwell_elapsed(generation),
            SessionEvent::CountdownTick(generation) => self.on_countdown_tick(generation),
            SessionEvent::Captured { cycle, artifact } => self.on_captured(cycle, artifact),
            SessionEvent::CaptureFailed { cycle, reason } => self.on_capture_failed(cycle, reason),
            SessionEvent::Classified { cycle, result } => {
                self.on_classification_outcome(cycle, SessionState::ResultReady(result))
            }
            SessionEvent::ClassificationFailed { cycle, failure } => {
                self.on_classification_outcome(cycle, SessionState::Failed(failure))
            }
            SessionEvent::Reset => {
                self.reset();
                Vec::new()
            }
        };
        debug_assert!(self.invariants_hold(), "session invariants violated: {self:?}");
        effects
    }

    /// Return to `Idle` and clear all sub-state.
    ///
    /// Honoured from `Idle`, `ResultReady` and `Failed`; a no-op elsewhere.
    pub fn reset(&mut self) {
        let phase = self.phase();
        if !phase.accepts_reset() {
            tracing::debug!(phase = %phase, "Reset ignored while cycle is active");
            return;
        }
        self.gate.clear();
        self.countdown.cancel();
        self.notice = None;
        self.transition(SessionState::Idle);
    }

    fn on_observation(&mut self, observation: &Observation) -> Vec<Effect> {
        let signal = grab::grab_signal(observation);
        self.last_signal = Some(signal);

        // Capture and classification are in flight or finished; gesture
        // input is feedback only until reset.
        let phase = self.phase();
        if !phase.accepts_gesture() {
            return Vec::new();
        }

        match phase {
            PhaseTag::Idle | PhaseTag::StabilityPending => match self.gate.observe(signal) {
                GateUpdate::Armed(generation) => {
                    tracing::debug!(%generation, "Grab started, arming dwell check");
                    self.notice = None;
                    self.transition(SessionState::StabilityPending);
                    vec![Effect::StartDwellTimer {
                        generation,
                        after: self.gate.dwell(),
                    }]
                }
                GateUpdate::Holding { held } => {
                    let held_ms = u64::try_from(held.as_millis()).unwrap_or(u64::MAX);
                    tracing::trace!(held_ms, "Grab held");
                    Vec::new()
                }
                GateUpdate::Cleared => {
                    tracing::debug!("Grab lost before dwell elapsed");
                    self.transition(SessionState::Idle);
                    Vec::new()
                }
                GateUpdate::Quiet => Vec::new(),
            },
            PhaseTag::CountingDown => {
                if !signal.is_grabbing() {
                    let remaining = self.countdown.remaining();
                    self.countdown.cancel();
                    tracing::info!(remaining = ?remaining, "Grab lost, countdown cancelled");
                    self.transition(SessionState::Idle);
                }
                Vec::new()
            }
            PhaseTag::Capturing
            | PhaseTag::Classifying
            | PhaseTag::ResultReady
            | PhaseTag::Failed => Vec::new(),
        }
    }

    fn on_dwell_elapsed(&mut self, generation: Generation) -> Vec<Effect> {
        if self.phase() != PhaseTag::StabilityPending || !self.gate.is_current(generation) {
            tracing::debug!(%generation, phase = %self.phase(), "Stale dwell check ignored");
            return Vec::new();
        }

        // Decide on the live signal, not the one seen when the check was armed.
        if !self.is_grabbing() {
            tracing::debug!("Grab no longer held at dwell check");
            self.gate.clear();
            self.transition(SessionState::Idle);
            return Vec::new();
        }

        let Some(tick_generation) = self.countdown.start() else {
            tracing::debug!("Countdown already running, commit ignored");
            return Vec::new();
        };
        self.gate.clear();
        tracing::info!(from = self.timing.countdown_from, "Grab stable, starting countdown");
        self.transition(SessionState::CountingDown);
        vec![Effect::StartTickTimer {
            generation: tick_generation,
            after: self.timing.tick,
        }]
    }

    fn on_countdown_tick(&mut self, generation: Generation) -> Vec<Effect> {
        if self.phase() != PhaseTag::CountingDown {
            tracing::debug!(%generation, phase = %self.phase(), "Stale countdown tick ignored");
            return Vec::new();
        }

        match self.countdown.tick(generation) {
            TickOutcome::Stale => {
                tracing::debug!(%generation, "Stale countdown tick ignored");
                Vec::new()
            }
            TickOutcome::Continue { remaining, next } => {
                tracing::info!(remaining, "Countdown");
                vec![Effect::StartTickTimer {
                    generation: next,
                    after: self.timing.tick,
                }]
            }
            TickOutcome::Complete => {
                let cycle = self.next_cycle;
                self.next_cycle = cycle.next();
                tracing::info!(%cycle, "Countdown complete, capturing");
                self.transition(SessionState::Capturing { cycle });
                vec![Effect::Capture { cycle }]
            }
        }
    }

    fn on_captured(&mut self, cycle: CycleId, artifact: CaptureArtifact) -> Vec<Effect> {
        if self.state != (SessionState::Capturing { cycle }) {
            tracing::debug!(%cycle, phase = %self.phase(), "Capture for inactive cycle dropped");
            return Vec::new();
        }
        tracing::info!(
            %cycle,
            bytes = artifact.bytes().len(),
            width = artifact.width(),
            height = artifact.height(),
            "Frame captured, classifying"
        );
        self.transition(SessionState::Classifying { cycle });
        vec![Effect::Dispatch { cycle, artifact }]
    }

    fn on_capture_failed(&mut self, cycle: CycleId, reason: String) -> Vec<Effect> {
        if self.state != (SessionState::Capturing { cycle }) {
            tracing::debug!(
                %cycle,
                phase = %self.phase(),
                "Capture failure for inactive cycle dropped"
            );
            return Vec::new();
        }
        tracing::warn!(%cycle, %reason, "Capture failed, returning to idle");
        self.notice = Some(format!("Capture failed: {reason}"));
        self.transition(SessionState::Idle);
        Vec::new()
    }

    fn on_classification_outcome(&mut self, cycle: CycleId, next: SessionState) -> Vec<Effect> {
        if self.state != (SessionState::Classifying { cycle }) {
            tracing::debug!(
                %cycle,
                phase = %self.phase(),
                "Classification outcome for inactive cycle dropped"
            );
            return Vec::new();
        }
        match &next {
            SessionState::ResultReady(result) => {
                tracing::info!(%cycle, parts = result.len(), "Classification complete");
            }
            SessionState::Failed(failure) => {
                tracing::warn!(%cycle, error = %failure, "Classification failed");
            }
            _ => {}
        }
        self.transition(next);
        Vec::new()
    }

    /// Authoritative `SessionState` transition point.
    #[track_caller]
    fn transition(&mut self, next: SessionState) {
        let from = self.phase();
        let to = next.tag();
        let receipt = transition::transition_receipt(from, to);
        let legal = receipt.is_some_and(transition::receipt_is_legal);
        if !legal {
            let loc = Location::caller();
            tracing::warn!(
                from = %from,
                to = %to,
                file = loc.file(),
                line = loc.line(),
                "Illegal SessionState transition",
            );
            debug_assert!(
                legal,
                "Illegal SessionState transition: {from:?} --> {to:?} at {}:{}",
                loc.file(),
                loc.line()
            );
            return;
        }
        if let Some(receipt) = receipt
            && from != to
        {
            tracing::info!(
                from = %receipt.from(),
                to = %receipt.to(),
                edge = receipt.edge().as_str(),
                "SessionState transition",
            );
        }
        self.state = next;
    }

    /// Stability window exists only while pending; the countdown runs only
    /// while counting down.
    fn invariants_hold(&self) -> bool {
        let phase = self.phase();
        self.gate.window_start().is_some() == (phase == PhaseTag::StabilityPending)
            && self.countdown.is_running() == (phase == PhaseTag::CountingDown)
    }
}
