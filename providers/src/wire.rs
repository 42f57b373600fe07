//! JSON request/response shapes of the classification backend.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sortcam_types::{ClassificationResult, MaterialCode, MaterialEntry};

/// Request body: `{ "imageBase64": ..., "apiUrl"?: ... }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassifyRequest<'a> {
    pub image_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<&'a str>,
}

impl<'a> ClassifyRequest<'a> {
    /// Raw base64 of the JPEG bytes, without a `data:` prefix.
    pub(crate) fn new(jpeg: &[u8], api_url: Option<&'a str>) -> Self {
        Self {
            image_base64: base64::engine::general_purpose::STANDARD.encode(jpeg),
            api_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    material: Vec<WireEntry>,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    part_name: String,
    answer: String,
}

/// Parse a success body into a validated result.
pub(crate) fn parse_success_body(body: &[u8]) -> Result<ClassificationResult, String> {
    let response: ClassifyResponse =
        serde_json::from_slice(body).map_err(|e| format!("invalid response JSON: {e}"))?;

    let mut entries = Vec::with_capacity(response.material.len());
    for entry in response.material {
        let code = MaterialCode::parse(&entry.answer)
            .map_err(|e| format!("part '{}': {e}", entry.part_name))?;
        entries.push(MaterialEntry::new(entry.part_name, code));
    }
    ClassificationResult::new(entries).map_err(|e| e.to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Backend error surfaced to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiErrorBody {
    pub error: String,
    pub details: Option<String>,
}

/// Extract `{error, details}` from an error body.
///
/// Non-JSON bodies, or JSON without a usable `error`, fall back to
/// `HTTP <status>` with the raw text as details.
pub(crate) fn parse_error_body(status: u16, body: &str) -> ApiErrorBody {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let error = parsed
        .as_ref()
        .and_then(|b| b.error.as_deref())
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string);

    match (error, parsed) {
        (Some(error), Some(parsed)) => ApiErrorBody {
            error,
            details: parsed.details.and_then(details_text),
        },
        _ => {
            let body = body.trim();
            ApiErrorBody {
                error: format!("HTTP {status}"),
                details: (!body.is_empty()).then(|| body.to_string()),
            }
        }
    }
}

fn details_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
