// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Read model of the host's local catalogue.

use std::fmt;

use async_trait::async_trait;
use jiff::Zoned;
use ticketsync_remote::Amount;

use crate::error::SyncError;

/// Kind of a local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A series, mirrored as a remote event.
    Series,
    /// A dated instance, mirrored as a remote sub-event.
    Instance,
}

impl EntityKind {
    /// Stable name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Series => "series",
            EntityKind::Instance => "instance",
        }
    }

    /// Parses a stored name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "series" => Some(EntityKind::Series),
            "instance" => Some(EntityKind::Instance),
            _ => None,
        }
    }
}

/// Identity of a local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity id, unique per kind.
    pub id: i64,
}

impl EntityKey {
    /// Key of a series.
    #[must_use]
    pub const fn series(id: i64) -> Self {
        Self {
            kind: EntityKind::Series,
            id,
        }
    }

    /// Key of an instance.
    #[must_use]
    pub const fn instance(id: i64) -> Self {
        Self {
            kind: EntityKind::Instance,
            id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Postal location of a series or instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Venue name.
    pub place: String,
    /// First address line.
    pub address_line1: String,
    /// Second address line.
    pub address_line2: String,
    /// Postal code.
    pub postal_code: String,
    /// Town or city.
    pub locality: String,
}

impl Location {
    /// Multi-line text form, skipping empty lines.
    #[must_use]
    pub fn to_text(&self) -> String {
        let town = format!("{} {}", self.postal_code.trim(), self.locality.trim());
        [
            self.place.as_str(),
            self.address_line1.as_str(),
            self.address_line2.as_str(),
            town.as_str(),
        ]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// A local series with its ordered instances.
#[derive(Debug, Clone)]
pub struct LocalEvent {
    pub id: i64,
    pub label: String,
    /// Whether the series is published locally.
    pub published: bool,
    pub location: Location,
    /// Ticket capacity; absent or not positive means unlimited.
    pub capacity: Option<i64>,
    /// Ticket price; absent means free.
    pub price: Option<Amount>,
    /// Ticket shop link currently stored on the series.
    pub ticket_link: Option<String>,
    pub instances: Vec<LocalInstance>,
}

impl LocalEvent {
    #[must_use]
    pub const fn key(&self) -> EntityKey {
        EntityKey::series(self.id)
    }

    /// Trimmed label.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is blank.
    pub fn label(&self) -> Result<&str, SyncError> {
        let label = self.label.trim();
        if label.is_empty() {
            return Err(SyncError::Synchronize(format!(
                "Cannot get label for series {}",
                self.id
            )));
        }
        Ok(label)
    }

    /// Price to sell at.
    #[must_use]
    pub fn price(&self) -> Amount {
        self.price.unwrap_or(Amount::ZERO)
    }

    /// Quota size, `None` for unlimited.
    #[must_use]
    pub fn quota_size(&self) -> Option<i64> {
        self.capacity.filter(|c| *c > 0)
    }
}

/// One dated occurrence of a series.
#[derive(Debug, Clone)]
pub struct LocalInstance {
    pub id: i64,
    pub series_id: i64,
    /// Label override.
    pub label: Option<String>,
    pub start: Zoned,
    pub end: Option<Zoned>,
    /// Location override.
    pub location: Option<Location>,
    /// Capacity override.
    pub capacity: Option<i64>,
    /// Ticket shop link currently stored on the instance.
    pub ticket_link: Option<String>,
}

impl LocalInstance {
    #[must_use]
    pub const fn key(&self) -> EntityKey {
        EntityKey::instance(self.id)
    }

    /// Own label, or the series label.
    ///
    /// # Errors
    ///
    /// Returns an error if both are blank.
    pub fn label<'a>(&'a self, series: &'a LocalEvent) -> Result<&'a str, SyncError> {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => Ok(label),
            _ => series.label(),
        }
    }

    /// Own location, or the series location.
    #[must_use]
    pub fn location<'a>(&'a self, series: &'a LocalEvent) -> &'a Location {
        self.location.as_ref().unwrap_or(&series.location)
    }

    /// Quota size from the own capacity, or the series capacity.
    #[must_use]
    pub fn quota_size(&self, series: &LocalEvent) -> Option<i64> {
        match self.capacity {
            Some(capacity) => Some(capacity).filter(|c| *c > 0),
            None => series.quota_size(),
        }
    }
}

/// Host catalogue the engine reads series from and writes links back to.
#[async_trait]
pub trait LocalCatalogue: Send + Sync {
    /// Loads a fresh copy of a series with its ordered instances.
    async fn load_series(&self, id: i64) -> Result<LocalEvent, SyncError>;

    /// Stores the ticket shop link on a series or instance.
    async fn set_ticket_link(&self, key: EntityKey, url: &str) -> Result<(), SyncError>;

    /// Drops any cached rendering of the entity after its availability changed.
    async fn invalidate(&self, _key: EntityKey) -> Result<(), SyncError> {
        Ok(())
    }
}
