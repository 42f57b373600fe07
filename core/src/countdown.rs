//! Countdown controller: `Inactive -> Running(3) -> Running(2) -> Running(1) -> Complete`.
//!
//! Every scheduled tick carries the generation it was scheduled under. The
//! generation advances on each accepted tick and on cancel, so duplicate or
//! late ticks are rejected as stale.

use std::time::Duration;

use sortcam_types::Generation;

pub const COUNTDOWN_FROM: u8 = 3;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountdownState {
    #[default]
    Inactive,
    Running {
        remaining: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick was for a cancelled or already-consumed schedule.
    Stale,
    /// Still counting; schedule the next tick under `next`.
    Continue { remaining: u8, next: Generation },
    /// Reached zero. The controller is back to `Inactive`.
    Complete,
}

#[derive(Debug)]
pub struct CountdownController {
    state: CountdownState,
    generation: Generation,
    from: u8,
}

impl Default for CountdownController {
    fn default() -> Self {
        Self::new(COUNTDOWN_FROM)
    }
}

impl CountdownController {
    #[must_use]
    pub fn new(from: u8) -> Self {
        Self {
            state: CountdownState::Inactive,
            generation: Generation::default(),
            from: from.max(1),
        }
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u8> {
        match self.state {
            CountdownState::Inactive => None,
            CountdownState::Running { remaining } => Some(remaining),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    /// Begin counting. Returns the generation for the first tick, or `None`
    /// when already running (re-entrant starts are no-ops).
    pub fn start(&mut self) -> Option<Generation> {
        if self.is_running() {
            return None;
        }
        self.state = CountdownState::Running {
            remaining: self.from,
        };
        self.generation = self.generation.next();
        Some(self.generation)
    }

    pub fn tick(&mut self, generation: Generation) -> TickOutcome {
        let CountdownState::Running { remaining } = self.state else {
            return TickOutcome::Stale;
        };
        if generation != self.generation {
            return TickOutcome::Stale;
        }

        self.generation = self.generation.next();
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.state = CountdownState::Inactive;
            TickOutcome::Complete
        } else {
            self.state = CountdownState::Running { remaining };
            TickOutcome::Continue {
                remaining,
                next: self.generation,
            }
        }
    }

    /// Stop counting regardless of the remaining count. Returns whether a
    /// countdown was actually running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = CountdownState::Inactive;
        self.generation = self.generation.next();
        was_running
    }
}
