//! Session state machine types.

use std::fmt;

use sortcam_types::{ClassificationFailure, ClassificationResult, CycleId};

/// Top-level session state. Exactly one value exists at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    StabilityPending,
    CountingDown,
    Capturing {
        cycle: CycleId,
    },
    Classifying {
        cycle: CycleId,
    },
    ResultReady(ClassificationResult),
    Failed(ClassificationFailure),
}

impl SessionState {
    #[must_use]
    pub fn tag(&self) -> PhaseTag {
        match self {
            SessionState::Idle => PhaseTag::Idle,
            SessionState::StabilityPending => PhaseTag::StabilityPending,
            SessionState::CountingDown => PhaseTag::CountingDown,
            SessionState::Capturing { .. } => PhaseTag::Capturing,
            SessionState::Classifying { .. } => PhaseTag::Classifying,
            SessionState::ResultReady(_) => PhaseTag::ResultReady,
            SessionState::Failed(_) => PhaseTag::Failed,
        }
    }
}

/// Payload-free discriminant of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhaseTag {
    #[default]
    Idle,
    StabilityPending,
    CountingDown,
    Capturing,
    Classifying,
    ResultReady,
    Failed,
}

impl PhaseTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PhaseTag::Idle => "idle",
            PhaseTag::StabilityPending => "stability_pending",
            PhaseTag::CountingDown => "counting_down",
            PhaseTag::Capturing => "capturing",
            PhaseTag::Classifying => "classifying",
            PhaseTag::ResultReady => "result_ready",
            PhaseTag::Failed => "failed",
        }
    }

    /// Phases from which an explicit reset is honoured.
    #[must_use]
    pub const fn accepts_reset(self) -> bool {
        matches!(self, PhaseTag::Idle | PhaseTag::ResultReady | PhaseTag::Failed)
    }

    /// Phases in which gesture input still drives transitions.
    #[must_use]
    pub const fn accepts_gesture(self) -> bool {
        matches!(
            self,
            PhaseTag::Idle | PhaseTag::StabilityPending | PhaseTag::CountingDown
        )
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named edges of the session graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEdge {
    ArmDwell,
    DropDwell,
    CommitCountdown,
    CancelCountdown,
    CompleteCountdown,
    BeginClassification,
    AbandonCapture,
    ReceiveResult,
    ReceiveError,
    Acknowledge,
}

impl SessionEdge {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionEdge::ArmDwell => "arm_dwell",
            SessionEdge::DropDwell => "drop_dwell",
            SessionEdge::CommitCountdown => "commit_countdown",
            SessionEdge::CancelCountdown => "cancel_countdown",
            SessionEdge::CompleteCountdown => "complete_countdown",
            SessionEdge::BeginClassification => "begin_classification",
            SessionEdge::AbandonCapture => "abandon_capture",
            SessionEdge::ReceiveResult => "receive_result",
            SessionEdge::ReceiveError => "receive_error",
            SessionEdge::Acknowledge => "acknowledge",
        }
    }
}
