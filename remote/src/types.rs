// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::{Amount, Document};
use crate::error::RemoteError;

/// A remote entity hydrated from a JSON object.
///
/// Entities are immutable snapshots of what the service returned: the typed
/// fields are the ones callers branch on, and [`Entity::document`] holds the
/// whole payload.
pub trait Entity: DeserializeOwned + Send {
    /// Human readable kind, used in decode errors.
    const KIND: &'static str;

    /// The full payload the entity was hydrated from.
    fn document(&self) -> &Document;

    #[doc(hidden)]
    fn attach(&mut self, document: Document);

    /// Hydrates an entity from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the value is not an object or lacks required fields.
    fn hydrate(value: Value) -> Result<Self, RemoteError> {
        let document = Document::from_value(value, Self::KIND)?;
        let mut entity: Self = serde_json::from_value(document.to_value())
            .map_err(|e| RemoteError::decode(Self::KIND, e))?;
        entity.attach(document);
        Ok(entity)
    }
}

/// Organizer account.
#[derive(Debug, Clone, Deserialize)]
pub struct Organizer {
    /// Organizer slug.
    pub slug: String,
    /// Display name.
    #[serde(default)]
    pub name: String,

    #[serde(skip)]
    document: Document,
}

/// Event, the remote counterpart of a local series.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event slug, unique within the organizer.
    pub slug: String,
    /// Whether the event supports multiple dates (sub-events).
    #[serde(default)]
    pub has_subevents: bool,
    /// Whether the shop is live.
    #[serde(default)]
    pub live: bool,

    #[serde(skip)]
    document: Document,
}

impl Event {
    /// An event without multiple dates.
    #[must_use]
    pub const fn is_singular(&self) -> bool {
        !self.has_subevents
    }
}

/// Event settings object.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    #[serde(skip)]
    document: Document,
}

impl EventSettings {
    /// Returns a single setting.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.document.get(name)
    }
}

/// One date of an event.
#[derive(Debug, Clone, Deserialize)]
pub struct SubEvent {
    /// Sub-event id.
    pub id: i64,

    #[serde(skip)]
    document: Document,
}

/// Product variation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ItemVariation {
    /// Variation id.
    pub id: i64,
}

/// Product ("item") sold for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    /// Item id.
    pub id: i64,
    /// Default price.
    #[serde(default)]
    pub default_price: Option<Amount>,
    /// Whether the item is sold in variations.
    #[serde(default)]
    pub has_variations: bool,
    /// Variations, if any.
    #[serde(default)]
    pub variations: Vec<ItemVariation>,

    #[serde(skip)]
    document: Document,
}

impl Item {
    /// The first variation, used when a single variant has to be picked.
    #[must_use]
    pub fn first_variation(&self) -> Option<ItemVariation> {
        self.variations.first().copied()
    }
}

/// Inventory pool limiting sales of some items.
#[derive(Debug, Clone, Deserialize)]
pub struct Quota {
    /// Quota id.
    pub id: i64,
    /// Sub-event the quota applies to, if any.
    #[serde(default)]
    pub subevent: Option<i64>,
    /// Item ids covered by the quota.
    #[serde(default)]
    pub items: Vec<i64>,
    /// Variation ids covered by the quota.
    #[serde(default)]
    pub variations: Vec<i64>,
    /// Size; `None` means unlimited.
    #[serde(default)]
    pub size: Option<i64>,

    #[serde(skip)]
    document: Document,
}

/// Availability report of a quota.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaAvailability {
    /// Whether tickets can still be bought.
    pub available: bool,
    /// Remaining tickets; `None` means unlimited.
    #[serde(default)]
    pub available_number: Option<i64>,

    #[serde(skip)]
    document: Document,
}

/// Organizer-level webhook delivering notifications to a callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    /// Webhook id.
    pub id: i64,
    /// Callback URL.
    pub target_url: String,
    /// Whether notifications are delivered.
    #[serde(default)]
    pub enabled: bool,
    /// Whether notifications are sent for every event of the organizer.
    #[serde(default)]
    pub all_events: bool,
    /// Notification actions subscribed to.
    #[serde(default)]
    pub action_types: Vec<String>,

    #[serde(skip)]
    document: Document,
}

/// Customer order.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Order code.
    pub code: String,
    /// Order status code.
    #[serde(default)]
    pub status: String,
    /// Order lines.
    #[serde(default)]
    pub positions: Vec<OrderPosition>,

    #[serde(skip)]
    document: Document,
}

impl Order {
    /// Distinct sub-event ids referenced by the order lines, in line order.
    #[must_use]
    pub fn sub_event_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for id in self.positions.iter().filter_map(|p| p.subevent) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// One line of an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPosition {
    /// Position id.
    pub id: i64,
    /// Item id.
    pub item: i64,
    /// Sub-event id, for events with multiple dates.
    #[serde(default)]
    pub subevent: Option<i64>,
}

macro_rules! impl_entity {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl Entity for $ty {
                const KIND: &'static str = $kind;

                fn document(&self) -> &Document {
                    &self.document
                }

                fn attach(&mut self, document: Document) {
                    self.document = document;
                }
            }
        )*
    };
}

impl_entity! {
    Organizer => "organizer",
    Event => "event",
    EventSettings => "event settings",
    SubEvent => "sub-event",
    Item => "item",
    Quota => "quota",
    QuotaAvailability => "quota availability",
    Order => "order",
    Webhook => "webhook",
}
