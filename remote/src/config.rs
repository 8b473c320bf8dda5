// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Authentication method for the ticketing API.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Static API token, sent as `Authorization: Token <token>`.
    #[serde(rename = "token")]
    Token {
        /// API token.
        token: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// Remote ticketing service configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the service, without the `api/v1` suffix.
    pub base_url: String,
    /// Organizer namespace all requests are scoped to.
    pub organizer: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl RemoteConfig {
    /// Base URL with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("ticketsync-remote/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            organizer: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
