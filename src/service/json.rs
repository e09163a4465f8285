//! Extraction of JSON payloads from model replies

use regex::Regex;
use serde_json::Value;

const FAILURE_PREVIEW_CHARS: usize = 500;

/// Pull a JSON value out of a model reply.
///
/// Models asked for JSON still wrap it in markdown fences or lead with
/// prose ("Here is the extracted data: …"). A fenced block wins if
/// present; otherwise parsing starts at the first `{` or `[`. Returns
/// None when nothing parseable is found, logging the file and a preview
/// of the reply so the failure can be diagnosed from logs alone.
pub fn extract_json(file_name: &str, raw: &str) -> Option<Value> {
    let trimmed = raw.trim();

    let fence = Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").unwrap();
    let mut candidate = match fence.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => trimmed,
    };

    if !candidate.starts_with('{') && !candidate.starts_with('[') {
        let start = match (candidate.find('{'), candidate.find('[')) {
            (Some(obj), Some(arr)) => Some(obj.min(arr)),
            (Some(obj), None) => Some(obj),
            (None, Some(arr)) => Some(arr),
            (None, None) => None,
        };
        match start {
            Some(idx) => candidate = &candidate[idx..],
            None => {
                tracing::warn!(
                    file = %file_name,
                    preview = %preview(trimmed),
                    "Model reply contained no JSON"
                );
                return None;
            }
        }
    }

    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                file = %file_name,
                error = %e,
                preview = %preview(trimmed),
                "Failed to parse JSON from model reply"
            );
            None
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(FAILURE_PREVIEW_CHARS).collect()
}
