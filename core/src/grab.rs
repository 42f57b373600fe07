//! Grab classifier: landmark set to grab/no-grab.
//!
//! # Rule
//!
//! A finger is closed when its tip lies below its middle joint
//! (image-space `y` grows downward). The thumb is close when the horizontal
//! distance between its tip and joint is under [`THUMB_PROXIMITY`].
//!
//! Grabbing = thumb close AND at least [`MIN_CLOSED_FINGERS`] of the other four
//! fingers closed. The thumb is mandatory; the 2-of-4 rule tolerates one or two
//! occluded fingers without firing on a relaxed open hand.
//!
//! Malformed input (no hand, fewer than 21 points, non-finite coordinates)
//! is "no grab", never an error.

use sortcam_types::{
    GrabSignal, INDEX_PIP, INDEX_TIP, LandmarkFrame, MIDDLE_PIP, MIDDLE_TIP, Observation,
    PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP,
};

/// Maximum thumb tip-to-joint horizontal distance, in normalized units.
pub const THUMB_PROXIMITY: f32 = 0.05;

/// Closed non-thumb fingers required alongside a close thumb.
pub const MIN_CLOSED_FINGERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    const fn tip(self) -> usize {
        match self {
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    const fn joint(self) -> usize {
        match self {
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Finger::Index => 0,
            Finger::Middle => 1,
            Finger::Ring => 2,
            Finger::Pinky => 3,
        }
    }
}

/// Per-finger breakdown behind a grab decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabAnalysis {
    closed: [bool; 4],
    thumb_distance: f32,
}

impl GrabAnalysis {
    #[must_use]
    pub fn is_closed(&self, finger: Finger) -> bool {
        self.closed[finger.slot()]
    }

    #[must_use]
    pub fn closed_fingers(&self) -> usize {
        self.closed.iter().filter(|closed| **closed).count()
    }

    #[must_use]
    pub fn thumb_distance(&self) -> f32 {
        self.thumb_distance
    }

    #[must_use]
    pub fn thumb_close(&self) -> bool {
        self.thumb_distance < THUMB_PROXIMITY
    }

    #[must_use]
    pub fn is_grabbing(&self) -> bool {
        self.thumb_close() && self.closed_fingers() >= MIN_CLOSED_FINGERS
    }
}

/// Analyze a hand, or `None` when the landmark set is malformed.
#[must_use]
pub fn analyze(frame: &LandmarkFrame) -> Option<GrabAnalysis> {
    if !frame.is_complete() {
        return None;
    }

    let mut closed = [false; 4];
    for finger in Finger::ALL {
        let tip = frame.point(finger.tip())?;
        let joint = frame.point(finger.joint())?;
        closed[finger.slot()] = tip.y > joint.y;
    }

    let thumb_tip = frame.point(THUMB_TIP)?;
    let thumb_joint = frame.point(THUMB_IP)?;

    Some(GrabAnalysis {
        closed,
        thumb_distance: (thumb_tip.x - thumb_joint.x).abs(),
    })
}

/// Pure grab decision. `None` stands for "no hand this tick".
#[must_use]
pub fn classify(hand: Option<&LandmarkFrame>) -> bool {
    hand.and_then(analyze)
        .is_some_and(|analysis| analysis.is_grabbing())
}

/// Derive the tick's grab signal from an observation.
#[must_use]
pub fn grab_signal(observation: &Observation) -> GrabSignal {
    let analysis = observation.hand().and_then(analyze);
    let grabbing = analysis.is_some_and(|a| a.is_grabbing());
    if let Some(analysis) = analysis
        && grabbing
    {
        tracing::debug!(
            closed_fingers = analysis.closed_fingers(),
            thumb_distance = analysis.thumb_distance(),
            "Hand grabbing"
        );
    }
    GrabSignal::new(grabbing, observation.at())
}
