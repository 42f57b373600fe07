//! Session transition graph authority.
//!
//! This module is the single encoding point for named `SessionState` edges
//! and legality checks. The session delegates transition graph decisions
//! here instead of embedding the graph in multiple call sites.

use crate::state::{PhaseTag, SessionEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionReceipt {
    from: PhaseTag,
    edge: SessionEdge,
    to: PhaseTag,
}

impl TransitionReceipt {
    #[must_use]
    pub const fn from(self) -> PhaseTag {
        self.from
    }

    #[must_use]
    pub const fn edge(self) -> SessionEdge {
        self.edge
    }

    #[must_use]
    pub const fn to(self) -> PhaseTag {
        self.to
    }
}

#[must_use]
pub fn transition_receipt(from: PhaseTag, to: PhaseTag) -> Option<TransitionReceipt> {
    transition_edge(from, to).map(|edge| TransitionReceipt { from, edge, to })
}

#[must_use]
pub fn receipt_is_legal(receipt: TransitionReceipt) -> bool {
    is_legal_transition(receipt.from, receipt.edge, receipt.to)
}

#[must_use]
pub fn transition_edge(from: PhaseTag, to: PhaseTag) -> Option<SessionEdge> {
    use PhaseTag::{
        Capturing, Classifying, CountingDown, Failed, Idle, ResultReady, StabilityPending,
    };
    use SessionEdge::{
        AbandonCapture, Acknowledge, ArmDwell, BeginClassification, CancelCountdown,
        CommitCountdown, CompleteCountdown, DropDwell, ReceiveError, ReceiveResult,
    };

    match (from, to) {
        (Idle, StabilityPending) => Some(ArmDwell),
        (StabilityPending, Idle) => Some(DropDwell),
        (StabilityPending, CountingDown) => Some(CommitCountdown),
        (CountingDown, Idle) => Some(CancelCountdown),
        (CountingDown, Capturing) => Some(CompleteCountdown),
        (Capturing, Classifying) => Some(BeginClassification),
        (Capturing, Idle) => Some(AbandonCapture),
        (Classifying, ResultReady) => Some(ReceiveResult),
        (Classifying, Failed) => Some(ReceiveError),
        (ResultReady | Failed | Idle, Idle) => Some(Acknowledge),
        _ => None,
    }
}

#[must_use]
pub fn is_legal_transition(from: PhaseTag, edge: SessionEdge, to: PhaseTag) -> bool {
    use PhaseTag::{
        Capturing, Classifying, CountingDown, Failed, Idle, ResultReady, StabilityPending,
    };
    use SessionEdge::{
        AbandonCapture, Acknowledge, ArmDwell, BeginClassification, CancelCountdown,
        CommitCountdown, CompleteCountdown, DropDwell, ReceiveError, ReceiveResult,
    };

    match edge {
        ArmDwell => from == Idle && to == StabilityPending,
        DropDwell => from == StabilityPending && to == Idle,
        CommitCountdown => from == StabilityPending && to == CountingDown,
        CancelCountdown => from == CountingDown && to == Idle,
        CompleteCountdown => from == CountingDown && to == Capturing,
        BeginClassification => from == Capturing && to == Classifying,
        AbandonCapture => from == Capturing && to == Idle,
        ReceiveResult => from == Classifying && to == ResultReady,
        ReceiveError => from == Classifying && to == Failed,
        Acknowledge => to == Idle && matches!(from, ResultReady | Failed | Idle),
    }
}
