//! Service settings loading from config.toml
//!
//! Every section is optional; anything left out falls back to its default so
//! the service can start without a config file at all. `PORT` and
//! `ADMIN_USER_IDS` in the environment take precedence over the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP server settings
    pub server: ServerSettings,
    /// Notification and admin settings
    pub notifications: NotificationSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Port the HTTP API listens on
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Where admin notifications go and who counts as an admin
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Chat channel that receives admin notifications
    pub admin_channel_id: Option<String>,
    /// Discord user ids allowed to approve or reject help requests
    pub admin_user_ids: Vec<String>,
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })
    }

    /// Whether the given Discord user id may decide help requests.
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.notifications.admin_user_ids.iter().any(|id| id == user_id)
    }

    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port.parse().map_err(|e| Error::Config {
                message: format!("Invalid PORT value '{port}': {e}"),
            })?;
        }
        self.notifications.admin_user_ids = super::admins::merge_admin_ids(
            &self.notifications.admin_user_ids,
            super::admins::admin_ids_from_env(),
        );
        Ok(self)
    }
}

/// Loads settings from a TOML file, falling back to defaults if the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed, or if an
/// environment override is malformed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let settings = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        info!("Loaded settings from {}", path.display());
        Settings::from_toml(&contents)?
    } else {
        warn!("{} not found, using default settings", path.display());
        Settings::default()
    };
    settings.apply_env_overrides()
}

/// Loads settings from `CONFIG_PATH`, or ./config.toml when unset.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_settings(path)
}
