//! Reconciliation between Garoon-native events and their Outlook mirrors.
//!
//! This module decides what to change without applying anything. Events
//! native to Outlook are never touched: the reverse direction
//! (Outlook → Garoon) is not implemented.

use crate::event::SourceEvent;
use crate::providers::outlook::OutlookEvent;
use std::collections::HashMap;

/// Result of comparing the source-native set against the mirrors
/// currently on the destination. Entries are Garoon keys.
pub struct SyncPlan {
    pub to_create: Vec<String>,
    pub to_update: Vec<String>,
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Compute the plan for one run.
///
/// - A mirror whose key no longer exists on Garoon is orphaned → delete.
/// - A Garoon event with an existing mirror → update in place.
/// - A Garoon event with no mirror → create.
///
/// Keys are sorted so run order and output are deterministic. The
/// caller applies deletions before creates and updates.
pub fn compute(
    source_native: &HashMap<String, SourceEvent>,
    mirrors: &HashMap<String, OutlookEvent>,
) -> SyncPlan {
    let mut plan = SyncPlan {
        to_create: Vec::new(),
        to_update: Vec::new(),
        to_delete: Vec::new(),
    };

    for key in mirrors.keys() {
        if !source_native.contains_key(key) {
            plan.to_delete.push(key.clone());
        }
    }

    for key in source_native.keys() {
        if mirrors.contains_key(key) {
            plan.to_update.push(key.clone());
        } else {
            plan.to_create.push(key.clone());
        }
    }

    plan.to_create.sort();
    plan.to_update.sort();
    plan.to_delete.sort();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn source(key: &str, subject: &str) -> SourceEvent {
        SourceEvent {
            key: key.to_string(),
            base_id: key.split('_').next().unwrap_or(key).to_string(),
            subject: subject.to_string(),
            start: Utc.with_ymd_and_hms(2026, 3, 20, 15, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 20, 16, 0, 0).unwrap(),
            is_all_day: false,
            location: None,
        }
    }

    fn mirror(key: &str) -> OutlookEvent {
        OutlookEvent {
            id: format!("outlook-{}", key),
            subject: format!("GID:{} - mirrored", key),
            ..Default::default()
        }
    }

    fn native_map(events: Vec<SourceEvent>) -> HashMap<String, SourceEvent> {
        events.into_iter().map(|e| (e.key.clone(), e)).collect()
    }

    fn mirror_map(keys: &[&str]) -> HashMap<String, OutlookEvent> {
        keys.iter()
            .map(|k| (k.to_string(), mirror(k)))
            .collect()
    }

    #[test]
    fn test_unmatched_source_events_are_created() {
        let plan = compute(
            &native_map(vec![source("1", "Standup"), source("2", "Review")]),
            &HashMap::new(),
        );

        assert_eq!(plan.to_create, vec!["1", "2"]);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_matched_keys_are_updated_in_place() {
        let plan = compute(
            &native_map(vec![source("1", "Standup")]),
            &mirror_map(&["1"]),
        );

        assert_eq!(plan.to_update, vec!["1"]);
        assert!(plan.to_create.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_orphaned_mirrors_are_deleted() {
        let plan = compute(
            &native_map(vec![source("2", "Review")]),
            &mirror_map(&["1", "2"]),
        );

        assert_eq!(plan.to_delete, vec!["1"]);
        assert_eq!(plan.to_update, vec!["2"]);
        assert!(plan.to_create.is_empty());
    }

    #[test]
    fn test_outlook_native_events_never_enter_the_plan() {
        // Outlook-native events are keyed separately and simply not
        // passed in; an empty source set with no mirrors plans nothing.
        let plan = compute(&HashMap::new(), &HashMap::new());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_recurring_occurrences_plan_independently() {
        let plan = compute(
            &native_map(vec![source("5_100", "Weekly"), source("5_101", "Weekly")]),
            &mirror_map(&["5_100"]),
        );

        assert_eq!(plan.to_update, vec!["5_100"]);
        assert_eq!(plan.to_create, vec!["5_101"]);
    }

    #[test]
    fn test_plan_keys_are_sorted() {
        let plan = compute(
            &native_map(vec![source("9", "c"), source("3", "a"), source("7", "b")]),
            &HashMap::new(),
        );

        assert_eq!(plan.to_create, vec!["3", "7", "9"]);
    }

    #[test]
    fn test_source_event_lifecycle() {
        // First run: source has A, destination has no mirrors → create.
        let plan = compute(&native_map(vec![source("A", "Meeting")]), &HashMap::new());
        assert_eq!(plan.to_create, vec!["A"]);

        // Next run: the mirror exists but A is gone from the source →
        // the mirror is deleted and nothing is created.
        let plan = compute(&HashMap::new(), &mirror_map(&["A"]));
        assert_eq!(plan.to_delete, vec!["A"]);
        assert!(plan.to_create.is_empty());
        assert!(plan.to_update.is_empty());
    }
}
