//! Utility functions for the quiz arena service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique room ID
pub fn generate_room_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique connection ID
pub fn generate_connection_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Case-insensitive exact comparison of a submitted answer with the correct one
pub fn answer_matches(submitted: Option<&str>, correct: &str) -> bool {
    submitted
        .map(|answer| answer.trim().eq_ignore_ascii_case(correct.trim()))
        .unwrap_or(false)
}

/// Option labels ("A", "B", ...) for a question with `option_count` options.
///
/// Questions without explicit options fall back to the usual four labels.
pub fn option_labels(option_count: usize) -> Vec<String> {
    let count = if option_count == 0 { 4 } else { option_count.min(26) };
    (0..count)
        .map(|i| ((b'A' + i as u8) as char).to_string())
        .collect()
}

/// Option labels that are not the correct answer
pub fn wrong_option_labels(option_count: usize, correct: &str) -> Vec<String> {
    option_labels(option_count)
        .into_iter()
        .filter(|label| !label.eq_ignore_ascii_case(correct.trim()))
        .collect()
}
