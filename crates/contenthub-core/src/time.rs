//! Coarse relative-time labels for card metadata

use chrono::{DateTime, Utc};

/// Format a card timestamp relative to the current instant.
#[must_use]
pub fn relative_time(value: Option<DateTime<Utc>>) -> String {
    relative_time_at(value, Utc::now())
}

/// Format `value` relative to `now`.
///
/// An absent timestamp reads as freshly created, which is what a document
/// looks like before the server clock has stamped it. Buckets always
/// floor, never round.
#[must_use]
pub fn relative_time_at(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(value) = value else {
        return "just now".to_string();
    };

    let diff_ms = now.timestamp_millis() - value.timestamp_millis();
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff_ms < minute {
        "moments ago".to_string()
    } else if diff_ms < hour {
        format!("{}m ago", diff_ms / minute)
    } else if diff_ms < day {
        format!("{}h ago", diff_ms / hour)
    } else {
        format!("{}d ago", diff_ms / day)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn absent_timestamp_reads_just_now() {
        assert_eq!(relative_time(None), "just now");
    }

    #[test]
    fn buckets_floor_elapsed_time() {
        let now = Utc::now();
        let cases = [
            (Duration::seconds(30), "moments ago"),
            (Duration::minutes(5), "5m ago"),
            (Duration::minutes(59), "59m ago"),
            (Duration::hours(3), "3h ago"),
            (Duration::hours(23), "23h ago"),
            (Duration::days(2), "2d ago"),
            (Duration::days(400), "400d ago"),
        ];

        for (elapsed, expected) in cases {
            assert_eq!(relative_time_at(Some(now - elapsed), now), expected);
        }
    }

    #[test]
    fn future_timestamps_read_moments_ago() {
        let now = Utc::now();
        let ahead = now + Duration::minutes(10);
        assert_eq!(relative_time_at(Some(ahead), now), "moments ago");
    }
}
