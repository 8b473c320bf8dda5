// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client for the remote ticketing service that owns events, dates, quotas and products.
//!
//! Every operation is scoped to a single organizer namespace
//! (`organizers/{organizer}/...`). Responses are hydrated into typed entities
//! that keep the full server payload as a [`Document`], so fields this crate
//! does not model round-trip unchanged.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::module_name_repetitions,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod collection;
mod config;
mod document;
mod error;
mod http;
mod keys;
mod types;

pub use crate::client::TicketingClient;
pub use crate::collection::{Collection, FetchOptions};
pub use crate::config::{AuthMethod, RemoteConfig};
pub use crate::document::{Amount, Document, localized};
pub use crate::error::RemoteError;
pub use crate::keys::{IdRef, SlugRef};
pub use crate::types::{
    Entity, Event, EventSettings, Item, ItemVariation, Order, OrderPosition, Organizer, Quota,
    QuotaAvailability, SubEvent, Webhook,
};
