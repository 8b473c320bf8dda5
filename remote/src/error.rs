// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Remote ticketing client errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Network layer failure (connection, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, if it could be read.
        body: String,
    },

    /// The response body is not the JSON shape that was expected.
    #[error("Cannot decode {kind}: {message}")]
    Decode {
        /// What was being decoded.
        kind: &'static str,
        /// Decoder message.
        message: String,
    },

    /// A caller passed an identifier of the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Whether the error happened at the network/HTTP level.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Whether the service answered `404 Not Found`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    pub(crate) fn decode(kind: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            kind,
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
