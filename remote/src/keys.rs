// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Uniform identifier extraction.
//!
//! Operations accept either a hydrated entity or a bare identifier. Identifiers
//! read back from stored snapshots arrive as raw JSON values, so those are
//! accepted too, but never coerced: a JSON number is not a slug and a JSON
//! string is not an id.

use serde_json::Value;

use crate::error::RemoteError;
use crate::types::{Event, Item, Quota, SubEvent, Webhook};

/// Something that identifies an event by slug.
pub trait SlugRef {
    /// Returns the slug.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidArgument`] if the value is not a non-empty string.
    fn resolve_slug(&self) -> Result<String, RemoteError>;
}

/// Something that identifies an entity by numeric id.
pub trait IdRef {
    /// Returns the id.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidArgument`] if the value is not an integer.
    fn resolve_id(&self) -> Result<i64, RemoteError>;
}

impl SlugRef for str {
    fn resolve_slug(&self) -> Result<String, RemoteError> {
        if self.is_empty() {
            return Err(RemoteError::InvalidArgument(
                "String expected, found an empty slug".to_string(),
            ));
        }
        Ok(self.to_string())
    }
}

impl SlugRef for String {
    fn resolve_slug(&self) -> Result<String, RemoteError> {
        self.as_str().resolve_slug()
    }
}

impl SlugRef for Event {
    fn resolve_slug(&self) -> Result<String, RemoteError> {
        self.slug.resolve_slug()
    }
}

impl SlugRef for Value {
    fn resolve_slug(&self) -> Result<String, RemoteError> {
        match self {
            Value::String(s) => s.resolve_slug(),
            other => Err(RemoteError::InvalidArgument(format!(
                "String expected, found {other}"
            ))),
        }
    }
}

impl<T: SlugRef + ?Sized> SlugRef for &T {
    fn resolve_slug(&self) -> Result<String, RemoteError> {
        (**self).resolve_slug()
    }
}

impl IdRef for i64 {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        Ok(*self)
    }
}

impl IdRef for SubEvent {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        Ok(self.id)
    }
}

impl IdRef for Item {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        Ok(self.id)
    }
}

impl IdRef for Quota {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        Ok(self.id)
    }
}

impl IdRef for Webhook {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        Ok(self.id)
    }
}

impl IdRef for Value {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        self.as_i64().ok_or_else(|| {
            RemoteError::InvalidArgument(format!("Integer expected, found {self}"))
        })
    }
}

impl<T: IdRef + ?Sized> IdRef for &T {
    fn resolve_id(&self) -> Result<i64, RemoteError> {
        (**self).resolve_id()
    }
}
