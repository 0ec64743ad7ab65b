//! Configuration loading for mail services
//!
//! Supports loading OAuth credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)
//!
//! Runtime settings come from `settings.json` in the same directory, with
//! environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the Courier config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Settings filename in the Courier config directory
const SETTINGS_FILE: &str = "settings.json";

/// Default attachment root, relative to the working directory
const DEFAULT_ATTACHMENTS_DIR: &str = "attachments";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. JSON file (~/.config/courier/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Support both "installed" (desktop) and "web" credential types
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/courier/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the attachment tree
    pub attachments_dir: PathBuf,
    /// From address for outgoing mail; Gmail uses the account address if unset
    pub sender: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attachments_dir: PathBuf::from(DEFAULT_ATTACHMENTS_DIR),
            sender: None,
        }
    }
}

impl Settings {
    /// Load `settings.json` if present, then apply `COURIER_ATTACHMENTS_DIR`
    /// and `COURIER_SENDER`
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };

        Ok(settings.with_overrides(
            std::env::var("COURIER_ATTACHMENTS_DIR").ok(),
            std::env::var("COURIER_SENDER").ok(),
        ))
    }

    /// Parse settings from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    fn with_overrides(mut self, attachments_dir: Option<String>, sender: Option<String>) -> Self {
        if let Some(dir) = attachments_dir.filter(|d| !d.is_empty()) {
            self.attachments_dir = PathBuf::from(dir);
        }
        if let Some(sender) = sender.filter(|s| !s.is_empty()) {
            self.sender = Some(sender);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{
            "web": {
                "client_id": "web-client-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-client-id.apps.googleusercontent.com");
    }

    #[test]
    fn test_invalid_json() {
        let json = r#"{ "other": {} }"#;
        assert!(GmailCredentials::from_json(json).is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.attachments_dir, PathBuf::from("attachments"));
    }

    #[test]
    fn test_settings_from_json() {
        let settings =
            Settings::from_json(r#"{ "attachments_dir": "/srv/mail", "sender": "me@example.com" }"#)
                .unwrap();
        assert_eq!(settings.attachments_dir, PathBuf::from("/srv/mail"));
        assert_eq!(settings.sender.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_settings_overrides() {
        let settings = Settings::default()
            .with_overrides(Some("/tmp/att".to_string()), Some(String::new()));
        assert_eq!(settings.attachments_dir, PathBuf::from("/tmp/att"));
        assert_eq!(settings.sender, None);
    }
}
