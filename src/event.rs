//! Origin tags and the provider-neutral source event record.
//!
//! A mirrored event carries the id of its origin in the subject line:
//! `GID:<id> - …` on Outlook for mirrors of Garoon events, `OID:<id> - …`
//! on Garoon for mirrors of Outlook events. An event is either native
//! (no tag, authoritative on its home calendar) or a mirror (tagged,
//! owned by this tool), never both.

use chrono::{DateTime, Utc};

/// Subject prefix marking an Outlook event as a mirror of a Garoon event.
pub const GAROON_TAG: &str = "GID:";

/// Subject prefix marking a Garoon event as a mirror of an Outlook event.
pub const OUTLOOK_TAG: &str = "OID:";

/// Extract the origin id from a tagged subject.
///
/// Returns `None` when the subject does not start with `tag`.
/// `"GID:42 - Standup"` → `Some("42")`.
pub fn mirror_key(subject: &str, tag: &str) -> Option<String> {
    if !subject.starts_with(tag) {
        return None;
    }

    let token = subject.split_whitespace().next()?;
    Some(token[tag.len()..].to_string())
}

/// Format the subject for a mirror of `id`: `"GID:42 - Standup"`.
pub fn mirror_subject(tag: &str, id: &str, subject: &str) -> String {
    format!("{}{} - {}", tag, id, subject)
}

/// A Garoon event normalized at the API boundary.
///
/// The diff and writer layers work exclusively with this record; wire
/// shapes stay inside the provider modules.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    /// Effective key: the event id, qualified by the occurrence id for
    /// recurring series (`id_repeatId`).
    pub key: String,
    /// Series id with any occurrence qualifier stripped.
    pub base_id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    /// First booked facility name, if any.
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_key_extracts_id() {
        assert_eq!(
            mirror_key("GID:42 - Standup", GAROON_TAG),
            Some("42".to_string())
        );
        assert_eq!(
            mirror_key("OID:AAMkAGI1 - Weekly 1:1", OUTLOOK_TAG),
            Some("AAMkAGI1".to_string())
        );
    }

    #[test]
    fn test_mirror_key_ignores_untagged_subjects() {
        assert_eq!(mirror_key("Standup", GAROON_TAG), None);
        assert_eq!(mirror_key("Budget GID:42 review", GAROON_TAG), None);
    }

    #[test]
    fn test_mirror_key_requires_matching_tag() {
        assert_eq!(mirror_key("GID:42 - Standup", OUTLOOK_TAG), None);
        assert_eq!(mirror_key("OID:AAMkAGI1 - Weekly", GAROON_TAG), None);
    }

    #[test]
    fn test_mirror_key_accepts_bare_tag_token() {
        assert_eq!(mirror_key("GID:42", GAROON_TAG), Some("42".to_string()));
    }

    #[test]
    fn test_mirror_subject_round_trips() {
        let subject = mirror_subject(GAROON_TAG, "5_100", "Design review");

        assert_eq!(subject, "GID:5_100 - Design review");
        assert_eq!(
            mirror_key(&subject, GAROON_TAG),
            Some("5_100".to_string())
        );
    }
}
