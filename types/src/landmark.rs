//! Hand landmark observations.
//!
//! Coordinates are normalized to the image: `x` grows rightward, `y` grows
//! downward, both in `[0, 1]` for points inside the frame.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Number of points in a complete hand landmark set.
pub const HAND_LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// False for NaN or infinite coordinates.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Landmarks for a single detected hand, in detector order.
///
/// The point count is not validated here. A frame with fewer than
/// [`HAND_LANDMARK_COUNT`] points is representable; consumers decide what a
/// malformed frame means for them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    #[must_use]
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    #[must_use]
    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Has at least [`HAND_LANDMARK_COUNT`] points, all finite.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() >= HAND_LANDMARK_COUNT
            && self.points[..HAND_LANDMARK_COUNT]
                .iter()
                .all(Landmark::is_finite)
    }
}

/// One tick of the landmark stream: zero or one tracked hand plus the capture instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    at: Instant,
    hand: Option<LandmarkFrame>,
}

impl Observation {
    #[must_use]
    pub fn no_hand(at: Instant) -> Self {
        Self { at, hand: None }
    }

    #[must_use]
    pub fn with_hand(at: Instant, hand: LandmarkFrame) -> Self {
        Self {
            at,
            hand: Some(hand),
        }
    }

    /// Build from every hand the detector reported.
    ///
    /// Only the first hand is tracked; the rest are dropped.
    #[must_use]
    pub fn from_hands(at: Instant, hands: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            at,
            hand: hands.into_iter().next(),
        }
    }

    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }

    #[must_use]
    pub fn hand(&self) -> Option<&LandmarkFrame> {
        self.hand.as_ref()
    }
}
