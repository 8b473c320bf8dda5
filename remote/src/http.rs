// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and JSON handling.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

use crate::config::{AuthMethod, RemoteConfig};
use crate::error::RemoteError;

/// Path prefix of the versioned API below the base URL.
const API_PREFIX: &str = "api/v1/";

/// HTTP client for ticketing API operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: RemoteConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        if config.base_url.is_empty() {
            return Err(RemoteError::Config("base_url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Resolves a path below `api/v1/`, or passes an absolute URL through.
    ///
    /// Pagination links are absolute, everything else is relative.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{API_PREFIX}{}",
                self.config.base_url(),
                path.trim_start_matches('/')
            )
        }
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json");

        match &self.config.auth {
            AuthMethod::Token { token } => {
                req = req.header("Authorization", format!("Token {token}"));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Attaches a JSON body.
    pub fn json_body(req: RequestBuilder, payload: &Value) -> RequestBuilder {
        req.json(payload)
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());
        Err(RemoteError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// Executes a request and parses the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn execute_json(
        &self,
        req: RequestBuilder,
        kind: &'static str,
    ) -> Result<Value, RemoteError> {
        let resp = self.execute(req).await?;
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::decode(kind, e))
    }
}
