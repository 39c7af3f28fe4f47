use chrono::{DateTime, Utc};

/// Coarse "how long ago" label. Units are truncated, never rounded, and a
/// timestamp in the future reads as "just now".
pub fn time_ago(past: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(past);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if hours < 24 {
        format!("{hours} hours ago")
    } else {
        format!("{} days ago", elapsed.num_days())
    }
}
