// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use ticketsync_remote::RemoteError;

/// Synchronization errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A domain precondition does not hold (missing template, quota, variant...).
    #[error("{0}")]
    Synchronize(String),

    /// A remote call failed.
    #[error("{context}")]
    Remote {
        /// What the engine was doing.
        context: String,
        /// Underlying client error.
        #[source]
        source: RemoteError,
    },

    /// Reconciling one instance failed; the run stopped there.
    #[error("Instance {id}")]
    Instance {
        /// Local instance id.
        id: i64,
        /// Why it failed.
        #[source]
        source: Box<SyncError>,
    },

    /// Record store failure.
    #[error("Record store error")]
    Store(#[from] sqlx::Error),

    /// Record store schema migration failure.
    #[error("Failed to run migrations")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The host catalogue could not serve a local entity.
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether the failure originated in a network or HTTP error.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_transport(),
            Self::Instance { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

/// Annotates remote failures with what was being attempted.
pub(crate) trait RemoteContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, SyncError>;
}

impl<T> RemoteContext<T> for Result<T, RemoteError> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, SyncError> {
        self.map_err(|source| SyncError::Remote {
            context: context(),
            source,
        })
    }
}

/// Renders an error and its whole `source()` chain as `a: b: c`.
#[must_use]
pub fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
