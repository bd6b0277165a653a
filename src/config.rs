//! Config file loading.
//!
//! The config is a single JSON file, `garoon-sync.json`, looked up in
//! the working directory first and the home directory second. A missing
//! file is not an error; the caller prints a hint and exits.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Fixed config filename.
pub const CONFIG_FILE: &str = "garoon-sync.json";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Garoon account, sent base64-encoded in `X-Cybozu-Authorization`.
    #[serde(rename = "CYBOZU_USER_NAME")]
    pub cybozu_user_name: String,
    #[serde(rename = "CYBOZU_USER_PASSWORD")]
    pub cybozu_user_password: String,

    /// Outer HTTP Basic auth in front of the Garoon API.
    #[serde(rename = "BASIC_AUTH_USER")]
    pub basic_auth_user: String,
    #[serde(rename = "BASIC_AUTH_PASSWORD")]
    pub basic_auth_password: String,

    /// Garoon API base URL; `events` is appended verbatim.
    #[serde(rename = "BASE_URL")]
    pub base_url: String,

    /// Azure AD application (client) id and secret for the app-only
    /// Graph token.
    #[serde(rename = "AZURE_APP_APPLICATION_ID")]
    pub azure_app_application_id: String,
    #[serde(rename = "AZURE_APP_CLIENT_SECRET")]
    pub azure_app_client_secret: String,

    /// Tenant segment of the token endpoint.
    #[serde(rename = "AZURE_TENANT_ID", default = "default_tenant")]
    pub azure_tenant_id: String,

    /// Mailbox whose default calendar receives the mirrored events.
    #[serde(rename = "OUTLOOK_USER_ID")]
    pub outlook_user_id: String,

    /// URL prefix written into the body of mirrored events; the Garoon
    /// event id is appended.
    #[serde(rename = "EVENT_URL")]
    pub event_url: String,
}

fn default_tenant() -> String {
    "common".to_string()
}

/// Candidate config paths, in lookup order.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE));
    }

    paths
}

/// Load the config file.
///
/// Returns `Ok(None)` when no config file exists at any candidate path.
/// A file that exists but cannot be read or parsed is an error.
pub fn load() -> Result<Option<Config>> {
    for path in candidate_paths() {
        if !path.exists() {
            continue;
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        return Ok(Some(config));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config_json() -> String {
        r#"{
            "CYBOZU_USER_NAME": "taro",
            "CYBOZU_USER_PASSWORD": "garoon-pass",
            "BASIC_AUTH_USER": "gate",
            "BASIC_AUTH_PASSWORD": "gate-pass",
            "BASE_URL": "https://example.cybozu.com/g/api/v1/schedule/",
            "AZURE_APP_APPLICATION_ID": "11111111-2222-3333-4444-555555555555",
            "AZURE_APP_CLIENT_SECRET": "s3cret",
            "OUTLOOK_USER_ID": "taro@example.onmicrosoft.com",
            "EVENT_URL": "https://example.cybozu.com/g/schedule/view.csp?event="
        }"#
        .to_string()
    }

    #[test]
    fn test_parses_all_recognized_keys() {
        let config: Config = serde_json::from_str(&full_config_json()).unwrap();

        assert_eq!(config.cybozu_user_name, "taro");
        assert_eq!(config.basic_auth_password, "gate-pass");
        assert_eq!(
            config.base_url,
            "https://example.cybozu.com/g/api/v1/schedule/"
        );
        assert_eq!(config.outlook_user_id, "taro@example.onmicrosoft.com");
    }

    #[test]
    fn test_tenant_defaults_to_common() {
        let config: Config = serde_json::from_str(&full_config_json()).unwrap();
        assert_eq!(config.azure_tenant_id, "common");
    }

    #[test]
    fn test_explicit_tenant_wins_over_default() {
        let json = full_config_json().replacen(
            "\"CYBOZU_USER_NAME\"",
            "\"AZURE_TENANT_ID\": \"contoso.onmicrosoft.com\", \"CYBOZU_USER_NAME\"",
            1,
        );

        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.azure_tenant_id, "contoso.onmicrosoft.com");
    }

    #[test]
    fn test_missing_required_key_is_an_error() {
        let json = full_config_json().replacen("CYBOZU_USER_NAME", "IGNORED_KEY", 1);
        assert!(serde_json::from_str::<Config>(&json).is_err());
    }
}
