// src/format.rs
//
// Rendering helpers shared by the tool handlers: output-format selection,
// millisecond timestamps, and the character budget applied to Markdown
// renderings (structured output is never truncated).
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Upper bound on a Markdown tool response, in characters.
pub const CHARACTER_LIMIT: usize = 25_000;
/// Room reserved for the truncation marker.
const TRUNCATION_RESERVE: usize = 200;

/// Output format for tool responses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

/// Render a Unix timestamp in milliseconds as local `YYYY-MM-DD HH:MM`.
/// Absent or zero timestamps read as "Unknown".
pub fn format_timestamp(ts: Option<i64>) -> String {
    match ts {
        None | Some(0) => "Unknown".to_string(),
        Some(millis) => match Local.timestamp_millis_opt(millis).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => millis.to_string(),
        },
    }
}

/// Cut an oversized rendering down to the character budget and append a
/// marker naming the original item count.
pub fn truncate_response(text: String, item_count: usize) -> String {
    if text.chars().count() <= CHARACTER_LIMIT {
        return text;
    }

    let keep = CHARACTER_LIMIT - TRUNCATION_RESERVE;
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(index, _)| index)
        .unwrap_or(text.len());

    let mut truncated = text[..cut].to_string();
    truncated.push_str(&format!(
        "\n\n---\n**Response truncated** ({} items). Use filters to narrow results.",
        item_count
    ));
    truncated
}
