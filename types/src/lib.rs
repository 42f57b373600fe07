//! Core domain types for sortcam.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod artifact;
mod ids;
mod landmark;
mod material;

pub use artifact::CaptureArtifact;
pub use ids::{CycleId, Generation};
pub use landmark::{
    HAND_LANDMARK_COUNT, INDEX_PIP, INDEX_TIP, Landmark, LandmarkFrame, MIDDLE_PIP, MIDDLE_TIP,
    Observation, PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP, WRIST,
};
pub use material::{
    ClassificationResult, MaterialCode, MaterialEntry, MaterialParseError, ResultValidationError,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("string must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl From<NonEmptyStaticStr> for NonEmptyString {
    fn from(value: NonEmptyStaticStr) -> Self {
        Self(value.0.to_string())
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A compile-time checked non-empty static string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonEmptyStaticStr(&'static str);

impl NonEmptyStaticStr {
    #[must_use]
    pub const fn new(value: &'static str) -> Self {
        assert!(!value.is_empty(), "NonEmptyStaticStr must not be empty");
        Self(value)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

// ============================================================================
// Grab Signal
// ============================================================================

/// Per-tick grab decision and the instant it was computed at.
///
/// Recomputed for every observation; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabSignal {
    grabbing: bool,
    at: Instant,
}

impl GrabSignal {
    #[must_use]
    pub const fn new(grabbing: bool, at: Instant) -> Self {
        Self { grabbing, at }
    }

    #[must_use]
    pub const fn is_grabbing(self) -> bool {
        self.grabbing
    }

    #[must_use]
    pub const fn at(self) -> Instant {
        self.at
    }
}

// ============================================================================
// Classification Failure
// ============================================================================

/// User-visible classification error.
///
/// `message` is the backend's `error` string, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    message: NonEmptyString,
    details: Option<String>,
}

impl ClassificationFailure {
    #[must_use]
    pub fn new(message: NonEmptyString, details: Option<String>) -> Self {
        let details = details.filter(|d| !d.trim().is_empty());
        Self { message, details }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for ClassificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({details})", self.message),
            None => f.write_str(self.message.as_str()),
        }
    }
}
