//! Material codes and classification results.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One-letter material category returned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCode {
    #[serde(rename = "A")]
    Cardboard,
    #[serde(rename = "B")]
    Glass,
    #[serde(rename = "C")]
    Metal,
    #[serde(rename = "D")]
    Paper,
    #[serde(rename = "E")]
    Plastic,
    /// Identifiable waste that fits none of the specific materials.
    #[serde(rename = "F")]
    Trash,
    /// No waste item in frame. Never appears alongside another code.
    #[serde(rename = "G")]
    NoWaste,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaterialParseError {
    #[error("material answer is empty")]
    Empty,
    #[error("unrecognized material answer: {0:?}")]
    Unrecognized(String),
}

impl MaterialCode {
    pub const ALL: [MaterialCode; 7] = [
        MaterialCode::Cardboard,
        MaterialCode::Glass,
        MaterialCode::Metal,
        MaterialCode::Paper,
        MaterialCode::Plastic,
        MaterialCode::Trash,
        MaterialCode::NoWaste,
    ];

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            MaterialCode::Cardboard => 'A',
            MaterialCode::Glass => 'B',
            MaterialCode::Metal => 'C',
            MaterialCode::Paper => 'D',
            MaterialCode::Plastic => 'E',
            MaterialCode::Trash => 'F',
            MaterialCode::NoWaste => 'G',
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MaterialCode::Cardboard => "Cardboard",
            MaterialCode::Glass => "Glass",
            MaterialCode::Metal => "Metal",
            MaterialCode::Paper => "Paper",
            MaterialCode::Plastic => "Plastic",
            MaterialCode::Trash => "Trash",
            MaterialCode::NoWaste => "None",
        }
    }

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.letter() == letter)
    }

    /// Parse a classifier answer.
    ///
    /// Accepts a bare letter (`"E"`), a letter with label (`"E: Plastic"`),
    /// or a label containing the material name (`"a plastic bottle"`). Only
    /// an uppercase letter counts as a code.
    pub fn parse(raw: &str) -> Result<Self, MaterialParseError> {
        let trimmed = raw.trim().trim_matches('$').trim();
        if trimmed.is_empty() {
            return Err(MaterialParseError::Empty);
        }

        let by_name = Self::find_name(trimmed);
        let mut chars = trimmed.chars();
        if let Some(code) = chars.next().and_then(Self::from_letter) {
            match chars.next() {
                None | Some(':' | '.' | ')' | '-' | '$') => return Ok(code),
                // "A plastic bottle": the name wins over a leading article.
                Some(c) if c.is_whitespace() => return Ok(by_name.unwrap_or(code)),
                Some(_) => {}
            }
        }

        by_name.ok_or_else(|| MaterialParseError::Unrecognized(trimmed.to_string()))
    }

    fn find_name(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|code| lower.contains(&code.name().to_ascii_lowercase()))
    }

    /// Display label in the classifier's own format, e.g. `E: Plastic`.
    #[must_use]
    pub fn label(self) -> String {
        format!("{}: {}", self.letter(), self.name())
    }
}

impl fmt::Display for MaterialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.letter(), self.name())
    }
}

/// One identified part and its material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub part_name: String,
    pub code: MaterialCode,
}

impl MaterialEntry {
    #[must_use]
    pub fn new(part_name: impl Into<String>, code: MaterialCode) -> Self {
        Self {
            part_name: part_name.into(),
            code,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultValidationError {
    #[error("material code G (none) cannot appear alongside other materials")]
    NoWasteMixedWithMaterials,
}

/// Ordered list of identified parts.
///
/// An empty list, or a list of only `G` entries, means no recognizable waste
/// item was in frame. That is a valid result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    entries: Vec<MaterialEntry>,
}

impl ClassificationResult {
    pub fn new(entries: Vec<MaterialEntry>) -> Result<Self, ResultValidationError> {
        let has_none = entries.iter().any(|e| e.code == MaterialCode::NoWaste);
        let has_material = entries.iter().any(|e| e.code != MaterialCode::NoWaste);
        if has_none && has_material {
            return Err(ResultValidationError::NoWasteMixedWithMaterials);
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[MaterialEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when nothing recognizable was in frame.
    #[must_use]
    pub fn is_empty_scene(&self) -> bool {
        self.entries.iter().all(|e| e.code == MaterialCode::NoWaste)
    }
}
