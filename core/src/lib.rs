//! Core capture logic for sortcam.
//!
//! This crate holds the gesture-triggered capture state machine:
//! grab classification, the dwell gate, the countdown, and the session
//! that sequences them. It performs no IO; timers, frame capture and
//! classification are requested through [`session::Effect`] values.

pub mod countdown;
pub mod grab;
pub mod session;
pub mod stability;
pub mod state;
pub mod transition;

pub use countdown::{
    COUNTDOWN_FROM, CountdownController, CountdownState, TICK_INTERVAL, TickOutcome,
};
pub use grab::{Finger, GrabAnalysis, analyze, classify, grab_signal};
pub use session::{Effect, Session, SessionEvent, SessionSnapshot, SessionTiming};
pub use stability::{DWELL_DURATION, GateUpdate, StabilityGate};
pub use state::{PhaseTag, SessionEdge, SessionState};
pub use transition::{
    TransitionReceipt, is_legal_transition, transition_edge, transition_receipt,
};
