// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;

use ticketsync_remote::RemoteConfig;

use crate::error::SyncError;

/// Synchronization configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    /// Template reference assigned to records created without one.
    #[serde(default)]
    pub template_event: Option<String>,

    /// Slug template for new remote events; `{id}` and `{random}` are substituted.
    #[serde(default = "default_slug_template")]
    pub event_slug_template: String,

    /// Language key of localized text objects.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Key of the remote meta data entry that carries the accounting code.
    #[serde(default)]
    pub accounting_meta_key: Option<String>,

    /// Remote service connection.
    pub remote: RemoteConfig,
}

impl SyncConfig {
    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            SyncError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        text.parse()
    }

    /// The slug template, with `-{id}` appended when it lacks an `{id}` placeholder.
    #[must_use]
    pub fn slug_template(&self) -> Cow<'_, str> {
        if self.event_slug_template.contains("{id}") {
            Cow::Borrowed(&self.event_slug_template)
        } else {
            Cow::Owned(format!("{}-{{id}}", self.event_slug_template))
        }
    }
}

impl FromStr for SyncConfig {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self =
            toml::from_str(s).map_err(|e| SyncError::Config(format!("Invalid TOML: {e}")))?;
        if config.remote.organizer.is_empty() {
            return Err(SyncError::Config("remote.organizer is empty".to_string()));
        }
        Ok(config)
    }
}

fn default_slug_template() -> String {
    "{id}-{random}".to_string()
}

fn default_language() -> String {
    "en".to_string()
}
