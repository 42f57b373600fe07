//! Human-readable status lines for snapshot changes.

use sortcam_engine::{ClassificationResult, PhaseTag, SessionSnapshot};

/// Lines to print when the session moves from `prev` to `next`.
#[must_use]
pub fn describe(prev: &SessionSnapshot, next: &SessionSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    if next.notice != prev.notice
        && let Some(notice) = &next.notice
    {
        lines.push(notice.clone());
    }

    if next.phase != prev.phase {
        match next.phase {
            PhaseTag::Idle => {
                if !matches!(prev.phase, PhaseTag::ResultReady | PhaseTag::Failed) {
                    lines.push("Ready. Show an item with a grabbing hand.".to_string());
                }
            }
            PhaseTag::StabilityPending => lines.push("Hold steady...".to_string()),
            PhaseTag::CountingDown | PhaseTag::Capturing => {}
            PhaseTag::Classifying => lines.push("Analyzing...".to_string()),
            PhaseTag::ResultReady => {
                if let Some(result) = &next.result {
                    lines.extend(describe_result(result));
                }
            }
            PhaseTag::Failed => {
                if let Some(failure) = &next.failure {
                    lines.push(format!("Error: {failure}"));
                }
            }
        }
    }

    if next.countdown != prev.countdown
        && let Some(remaining) = next.countdown
    {
        lines.push(format!("{remaining}..."));
    }
    if next.phase == PhaseTag::Capturing && prev.phase != PhaseTag::Capturing {
        lines.push("Capturing".to_string());
    }

    lines
}

fn describe_result(result: &ClassificationResult) -> Vec<String> {
    if result.is_empty_scene() {
        return vec!["No waste item detected.".to_string()];
    }
    result
        .entries()
        .iter()
        .map(|entry| format!("{}: {}", entry.part_name, entry.code.label()))
        .collect()
}
