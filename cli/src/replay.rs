//! JSON-lines landmark replay.
//!
//! One observation per line: `{"t_ms": 1234, "hands": [[{"x":..,"y":..,"z":..}, ...]]}`.
//! `t_ms` is relative to the first line; `hands` may be empty or omitted.

use std::time::{Duration, Instant};

use serde::Deserialize;
use sortcam_engine::{LandmarkFrame, Observation};

#[derive(Debug, Deserialize)]
struct RawLine {
    t_ms: u64,
    #[serde(default)]
    hands: serde_json::Value,
}

#[derive(Debug)]
pub struct ReplayLine {
    pub t_ms: u64,
    pub hands: Vec<LandmarkFrame>,
    /// Set when `hands` was present but unreadable; the tick then carries no hand.
    pub malformed_hands: Option<serde_json::Error>,
}

impl ReplayLine {
    /// Offset from the start of the replay.
    #[must_use]
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.t_ms)
    }

    #[must_use]
    pub fn into_observation(self, at: Instant) -> Observation {
        Observation::from_hands(at, self.hands)
    }
}

/// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
///
/// A line without a readable `t_ms` is an error. A readable `t_ms` with bad
/// landmarks still yields a tick, with no hand.
pub fn parse_line(line: &str) -> Result<Option<ReplayLine>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let raw: RawLine = serde_json::from_str(trimmed)?;
    let (hands, malformed_hands) = match raw.hands {
        serde_json::Value::Null => (Vec::new(), None),
        value => match serde_json::from_value(value) {
            Ok(hands) => (hands, None),
            Err(e) => (Vec::new(), Some(e)),
        },
    };
    Ok(Some(ReplayLine {
        t_ms: raw.t_ms,
        hands,
        malformed_hands,
    }))
}
