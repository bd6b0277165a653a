//! Microsoft Graph client for the destination calendar.
//!
//! Authenticates with an app-only (client-credential) token, fetches
//! the sync window from the target mailbox's default calendar, and
//! applies create/update/delete operations for mirrored events.
//!
//! The token is cached at `<config_dir>/garoon-sync/token.json` and
//! reacquired only when missing or expired.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::event::{mirror_key, mirror_subject, SourceEvent, GAROON_TAG};
use crate::period::SyncWindow;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const TOKEN_SCOPE: &str = "https://graph.microsoft.com/.default";

// =============================================================================
// Token session
// =============================================================================

/// Cached app-only Graph token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionData {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl SessionData {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

fn session_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("garoon-sync")
        .join("token.json"))
}

/// Load the cached token. A missing, unreadable, or stale-format cache
/// is not an error; the caller reauthenticates.
fn load_session() -> Option<SessionData> {
    let path = session_path().ok()?;
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn save_session(session: &SessionData) -> Result<()> {
    let path = session_path()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents =
        serde_json::to_string_pretty(session).context("Failed to serialize token cache")?;

    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write token cache to {}", path.display()))?;

    // Set to owner-only (0600) since the file contains a bearer token:
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Request a fresh token via the client-credential grant.
async fn request_token(http: &reqwest::Client, config: &Config) -> Result<SessionData> {
    let token_url = format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        config.azure_tenant_id
    );

    let response = http
        .post(&token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", config.azure_app_application_id.as_str()),
            ("client_secret", config.azure_app_client_secret.as_str()),
            ("scope", TOKEN_SCOPE),
        ])
        .send()
        .await
        .context("Failed to reach the Microsoft identity platform")?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Outlook token request failed: {}", error_text);
    }

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: i64,
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    Ok(SessionData {
        access_token: token.access_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
    })
}

// =============================================================================
// Wire types
// =============================================================================

/// A Graph calendar event, limited to the fields this tool reads or writes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlookEvent {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub subject: String,
    #[serde(default)]
    pub start: GraphDateTime,
    #[serde(default)]
    pub end: GraphDateTime,
    #[serde(default)]
    pub location: Option<GraphLocation>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_reminder_on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl GraphDateTime {
    /// Graph date-time in UTC, e.g. `2026-03-20T15:00:00`.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        GraphDateTime {
            date_time: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    /// Parse back to an instant. Events are fetched with
    /// `Prefer: outlook.timezone="UTC"`, so the value is UTC with an
    /// optional fractional-second part.
    pub fn to_utc(&self) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(&self.date_time, "%Y-%m-%dT%H:%M:%S%.f")
            .with_context(|| format!("Invalid timestamp from Outlook: {}", self.date_time))?;
        Ok(naive.and_utc())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLocation {
    #[serde(default, deserialize_with = "string_or_null")]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBody {
    pub content_type: String,
    pub content: String,
}

/// Graph sends `null` for absent string fields; map it to the empty string.
fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Event writer
// =============================================================================

/// Field-level changes to write to a destination event.
///
/// `None` fields are left untouched; serialization skips them, so a
/// PATCH carries only what actually changed.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<GraphBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<GraphDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<GraphDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GraphLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_all_day: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reminder_on: Option<bool>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.body.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.location.is_none()
            && self.is_all_day.is_none()
            && self.is_reminder_on.is_none()
    }

    /// Compute what must change on the mirror of `source`.
    ///
    /// `current` is the existing mirror, or `None` when creating one.
    /// Every field is gated on an actual-change check, so an untouched
    /// mirror produces an empty change set and no write. Timestamps are
    /// compared instant-to-instant, never string-to-string.
    pub fn compute(
        current: Option<&OutlookEvent>,
        key: &str,
        source: &SourceEvent,
        event_url: &str,
    ) -> Result<Self> {
        let mut changes = EventChanges::default();

        let subject = mirror_subject(GAROON_TAG, key, &source.subject);
        if current.map(|e| e.subject.as_str()) != Some(subject.as_str()) {
            // The body only links back to the Garoon event, so it is
            // refreshed together with the subject.
            changes.body = Some(GraphBody {
                content_type: "text".to_string(),
                content: format!("{}{}", event_url, source.base_id),
            });
            changes.subject = Some(subject);
        }

        let current_start = match current {
            Some(event) => Some(event.start.to_utc()?),
            None => None,
        };
        if current_start != Some(source.start) {
            changes.start = Some(GraphDateTime::from_utc(source.start));
        }

        let current_end = match current {
            Some(event) => Some(event.end.to_utc()?),
            None => None,
        };
        if current_end != Some(source.end) {
            changes.end = Some(GraphDateTime::from_utc(source.end));
        }

        if let Some(location) = &source.location {
            let current_location = current
                .and_then(|e| e.location.as_ref())
                .map(|l| l.display_name.as_str());
            if current_location != Some(location.as_str()) {
                changes.location = Some(GraphLocation {
                    display_name: location.clone(),
                });
            }
        }

        if current.map(|e| e.is_all_day) != Some(source.is_all_day) {
            changes.is_all_day = Some(source.is_all_day);
        }

        // Mirrors never ring reminders.
        if current.map(|e| e.is_reminder_on) != Some(false) {
            changes.is_reminder_on = Some(false);
        }

        Ok(changes)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Events fetched from the destination calendar, partitioned by origin.
pub struct OutlookEvents {
    /// Mirrors of Garoon events (`GID:`-tagged), keyed by the embedded
    /// Garoon key.
    pub garoon_mirrors: HashMap<String, OutlookEvent>,
    /// Events native to Outlook, keyed by their Graph id. Never
    /// modified by this tool.
    pub native: HashMap<String, OutlookEvent>,
}

impl OutlookEvents {
    pub fn total(&self) -> usize {
        self.garoon_mirrors.len() + self.native.len()
    }
}

pub struct OutlookClient {
    http: reqwest::Client,
    access_token: String,
    user_id: String,
    limit: usize,
}

impl OutlookClient {
    /// Authenticate against the tenant, reusing the cached token when
    /// it has not expired yet.
    pub async fn connect(config: &Config, limit: usize) -> Result<Self> {
        let http = reqwest::Client::new();

        let session = match load_session() {
            Some(session) if !session.is_expired() => session,
            _ => {
                let session = request_token(&http, config).await?;
                save_session(&session)?;
                session
            }
        };

        Ok(OutlookClient {
            http,
            access_token: session.access_token,
            user_id: config.outlook_user_id.clone(),
            limit,
        })
    }

    /// Fetch the window from the default calendar, with recurring
    /// series expanded into occurrences, partitioned by origin.
    pub async fn fetch_events(&self, window: &SyncWindow) -> Result<OutlookEvents> {
        let url = format!(
            "{}/users/{}/calendar/calendarView",
            GRAPH_BASE_URL, self.user_id
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .query(&[
                ("startDateTime", window.start_rfc3339()),
                ("endDateTime", window.end_rfc3339()),
                ("$top", self.limit.to_string()),
            ])
            .send()
            .await
            .context("Failed to reach the Graph API")?
            .error_for_status()
            .context("Outlook calendar query failed")?;

        #[derive(Deserialize)]
        struct CalendarViewResponse {
            value: Vec<OutlookEvent>,
        }

        let body: CalendarViewResponse = response
            .json()
            .await
            .context("Failed to parse Outlook events response")?;

        Ok(partition(body.value))
    }

    /// Create a mirror on the default calendar.
    pub async fn create_event(&self, changes: &EventChanges) -> Result<OutlookEvent> {
        let url = format!(
            "{}/users/{}/calendar/events",
            GRAPH_BASE_URL, self.user_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(changes)
            .send()
            .await
            .context("Failed to reach the Graph API")?
            .error_for_status()
            .context("Outlook event creation failed")?;

        response
            .json()
            .await
            .context("Failed to parse created Outlook event")
    }

    /// Apply field changes to an existing event.
    pub async fn update_event(&self, event_id: &str, changes: &EventChanges) -> Result<()> {
        let url = format!(
            "{}/users/{}/events/{}",
            GRAPH_BASE_URL, self.user_id, event_id
        );

        self.http
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(changes)
            .send()
            .await
            .context("Failed to reach the Graph API")?
            .error_for_status()
            .with_context(|| format!("Outlook event update failed for {}", event_id))?;

        Ok(())
    }

    /// Delete an event.
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        let url = format!(
            "{}/users/{}/events/{}",
            GRAPH_BASE_URL, self.user_id, event_id
        );

        self.http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to reach the Graph API")?
            .error_for_status()
            .with_context(|| format!("Outlook event deletion failed for {}", event_id))?;

        Ok(())
    }
}

/// File each event under mirrored-from-Garoon or native by its subject tag.
fn partition(events: Vec<OutlookEvent>) -> OutlookEvents {
    let mut garoon_mirrors = HashMap::new();
    let mut native = HashMap::new();

    for event in events {
        if let Some(garoon_id) = mirror_key(&event.subject, GAROON_TAG) {
            garoon_mirrors.insert(garoon_id, event);
        } else {
            native.insert(event.id.clone(), event);
        }
    }

    OutlookEvents {
        garoon_mirrors,
        native,
    }
}
