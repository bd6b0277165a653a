//! Sync window computation.

use chrono::{DateTime, Duration, Local};

/// Time window to synchronize: now → now + N weeks.
#[derive(Debug, Clone)]
pub struct SyncWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl SyncWindow {
    /// Window starting at the current local time and extending `weeks` ahead.
    pub fn next_weeks(weeks: i64) -> Self {
        let start = Local::now();
        SyncWindow {
            start,
            end: start + Duration::weeks(weeks),
        }
    }

    /// Get `start` as an RFC 3339 string for API query parameters.
    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339()
    }

    /// Get `end` as an RFC 3339 string for API query parameters.
    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_spans_requested_weeks() {
        let window = SyncWindow::next_weeks(2);
        assert_eq!(window.end - window.start, Duration::weeks(2));
    }

    #[test]
    fn test_rfc3339_accessors_parse_back_to_same_instants() {
        let window = SyncWindow::next_weeks(1);

        let start = DateTime::parse_from_rfc3339(&window.start_rfc3339()).unwrap();
        let end = DateTime::parse_from_rfc3339(&window.end_rfc3339()).unwrap();

        assert_eq!(start, window.start);
        assert_eq!(end.signed_duration_since(start), Duration::weeks(1));
    }
}
