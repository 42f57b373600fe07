//! Stability gate: debounces the grab signal over a dwell window.
//!
//! The first positive signal opens a window and arms a one-shot dwell timer.
//! Any negative signal closes the window and invalidates the timer; there is
//! no partial credit, so a single missed frame restarts the dwell.

use std::time::{Duration, Instant};

use sortcam_types::{Generation, GrabSignal};

/// Minimum continuous grab before a countdown may start.
pub const DWELL_DURATION: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateUpdate {
    /// A new window opened; schedule a dwell check for this generation.
    Armed(Generation),
    /// Streak continues.
    Holding { held: Duration },
    /// Streak broken; any pending dwell check is now stale.
    Cleared,
    /// No window and no grab.
    Quiet,
}

#[derive(Debug)]
pub struct StabilityGate {
    window: Option<Instant>,
    generation: Generation,
    dwell: Duration,
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(DWELL_DURATION)
    }
}

impl StabilityGate {
    #[must_use]
    pub fn new(dwell: Duration) -> Self {
        Self {
            window: None,
            generation: Generation::default(),
            dwell,
        }
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Start of the current grab streak.
    #[must_use]
    pub fn window_start(&self) -> Option<Instant> {
        self.window
    }

    pub fn observe(&mut self, signal: GrabSignal) -> GateUpdate {
        match (signal.is_grabbing(), self.window) {
            (true, None) => {
                self.window = Some(signal.at());
                self.generation = self.generation.next();
                GateUpdate::Armed(self.generation)
            }
            (true, Some(start)) => GateUpdate::Holding {
                held: signal.at().saturating_duration_since(start),
            },
            (false, Some(_)) => {
                self.clear();
                GateUpdate::Cleared
            }
            (false, None) => GateUpdate::Quiet,
        }
    }

    /// Whether a dwell check armed with `generation` is still live.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.window.is_some() && self.generation == generation
    }

    /// Close the window and invalidate any pending dwell check.
    pub fn clear(&mut self) {
        self.window = None;
        self.generation = self.generation.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(grabbing: bool, at: Instant) -> GrabSignal {
        GrabSignal::new(grabbing, at)
    }

    #[test]
    fn first_grab_arms_once() {
        let t0 = Instant::now();
        let mut gate = StabilityGate::default();

        let GateUpdate::Armed(generation) = gate.observe(signal(true, t0)) else {
            panic!("first grab should arm");
        };
        assert_eq!(gate.window_start(), Some(t0));
        assert!(gate.is_current(generation));

        let update = gate.observe(signal(true, t0 + Duration::from_millis(400)));
        assert_eq!(
            update,
            GateUpdate::Holding {
                held: Duration::from_millis(400)
            }
        );
        assert!(gate.is_current(generation));
    }

    #[test]
    fn single_miss_invalidates_pending_check() {
        let t0 = Instant::now();
        let mut gate = StabilityGate::default();

        let GateUpdate::Armed(first) = gate.observe(signal(true, t0)) else {
            panic!("should arm");
        };
        assert_eq!(
            gate.observe(signal(false, t0 + Duration::from_millis(900))),
            GateUpdate::Cleared
        );
        assert!(!gate.is_current(first));
        assert_eq!(gate.window_start(), None);

        let GateUpdate::Armed(second) = gate.observe(signal(true, t0 + Duration::from_millis(950)))
        else {
            panic!("should re-arm");
        };
        assert_ne!(first, second);
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        assert_eq!(
            gate.window_start(),
            Some(t0 + Duration::from_millis(950))
        );
    }

    #[test]
    fn quiet_without_window() {
        let mut gate = StabilityGate::default();
        assert_eq!(gate.observe(signal(false, Instant::now())), GateUpdate::Quiet);
    }

    #[test]
    fn clear_invalidates_current_generation() {
        let mut gate = StabilityGate::default();
        let GateUpdate::Armed(generation) = gate.observe(signal(true, Instant::now())) else {
            panic!("should arm");
        };
        gate.clear();
        assert!(!gate.is_current(generation));
    }
}
