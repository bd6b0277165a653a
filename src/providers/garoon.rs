//! Garoon REST API client.
//!
//! Fetches events overlapping the sync window and partitions them into
//! Garoon-native events and mirrors of Outlook events (subjects tagged
//! `OID:<id>`). Wire shapes are normalized into [`SourceEvent`] at this
//! boundary; nothing downstream sees Garoon's string booleans or
//! unparsed timestamps.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use crate::config::Config;
use crate::event::{mirror_key, SourceEvent, OUTLOOK_TAG};
use crate::period::SyncWindow;

/// Wire shape of `GET <BASE_URL>events`.
#[derive(Debug, Deserialize)]
struct EventsResponse {
    events: Vec<GaroonEvent>,
}

/// A single event as returned by the Garoon API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaroonEvent {
    pub id: String,
    /// Occurrence id, present for instances of a recurring series.
    #[serde(default)]
    pub repeat_id: Option<String>,
    pub subject: String,
    pub start: GaroonDateTime,
    pub end: GaroonDateTime,
    /// Garoon serializes this as the string `"true"`/`"false"`.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub is_all_day: bool,
    #[serde(default)]
    pub facilities: Vec<Facility>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaroonDateTime {
    pub date_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Facility {
    pub name: String,
}

impl GaroonEvent {
    /// Effective key: occurrences of a recurring series get distinct
    /// keys (`id_repeatId`); standalone events use the plain id.
    pub fn key(&self) -> String {
        match &self.repeat_id {
            Some(repeat_id) => format!("{}_{}", self.id, repeat_id),
            None => self.id.clone(),
        }
    }

    /// Normalize into the record the diff and writer layers consume.
    pub fn to_source_event(&self) -> Result<SourceEvent> {
        Ok(SourceEvent {
            key: self.key(),
            base_id: self.id.clone(),
            subject: self.subject.clone(),
            start: parse_timestamp(&self.start.date_time)?,
            end: parse_timestamp(&self.end.date_time)?,
            is_all_day: self.is_all_day,
            location: self.facilities.first().map(|f| f.name.clone()),
        })
    }
}

/// Parse an ISO 8601 timestamp with offset into UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp from Garoon: {}", s))?;
    Ok(dt.with_timezone(&Utc))
}

/// Accept both a JSON bool and the string `"true"`/`"false"`.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::String(s) => s == "true",
    })
}

/// Events fetched from Garoon, partitioned by origin.
pub struct GaroonEvents {
    /// Garoon-native events, keyed by qualified id.
    pub native: HashMap<String, SourceEvent>,
    /// Mirrors of Outlook events (`OID:`-tagged), keyed by the embedded
    /// Outlook id. Collected during partitioning; the reverse sync
    /// direction that would consume them is not implemented.
    pub outlook_mirrors: HashMap<String, GaroonEvent>,
}

impl GaroonEvents {
    pub fn total(&self) -> usize {
        self.native.len() + self.outlook_mirrors.len()
    }
}

pub struct GaroonClient {
    http: reqwest::Client,
    url: String,
    cybozu_auth: String,
    basic_user: String,
    basic_password: String,
    limit: usize,
}

impl GaroonClient {
    pub fn new(config: &Config, limit: usize) -> Self {
        let cybozu_credential = format!(
            "{}:{}",
            config.cybozu_user_name, config.cybozu_user_password
        );

        GaroonClient {
            http: reqwest::Client::new(),
            url: format!("{}events", config.base_url),
            cybozu_auth: BASE64.encode(cybozu_credential),
            basic_user: config.basic_auth_user.clone(),
            basic_password: config.basic_auth_password.clone(),
            limit,
        }
    }

    /// Fetch all events overlapping the window, partitioned by origin.
    ///
    /// Any transport, auth, or response-shape error propagates; the
    /// caller aborts the run rather than sync partially.
    pub async fn fetch_events(&self, window: &SyncWindow) -> Result<GaroonEvents> {
        let response = self
            .http
            .get(&self.url)
            .basic_auth(&self.basic_user, Some(&self.basic_password))
            .header("X-Cybozu-Authorization", &self.cybozu_auth)
            .query(&[
                ("limit", self.limit.to_string()),
                ("rangeStart", window.start_rfc3339()),
                ("rangeEnd", window.end_rfc3339()),
            ])
            .send()
            .await
            .context("Failed to reach the Garoon API")?
            .error_for_status()
            .context("Garoon API request failed")?;

        let body: EventsResponse = response
            .json()
            .await
            .context("Failed to parse Garoon events response")?;

        partition(body.events)
    }
}

/// File each event under native or mirrored-from-Outlook by its subject tag.
fn partition(events: Vec<GaroonEvent>) -> Result<GaroonEvents> {
    let mut native = HashMap::new();
    let mut outlook_mirrors = HashMap::new();

    for event in events {
        if let Some(outlook_id) = mirror_key(&event.subject, OUTLOOK_TAG) {
            outlook_mirrors.insert(outlook_id, event);
        } else {
            native.insert(event.key(), event.to_source_event()?);
        }
    }

    Ok(GaroonEvents {
        native,
        outlook_mirrors,
    })
}
