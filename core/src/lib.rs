// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Mirrors a local event catalogue onto a remote ticketing service.
//!
//! A [`Synchronizer`] maps each local series to a remote event cloned from a
//! template, and each of its instances to a sub-event with its own quota. The
//! mapping is kept in [`SyncRecord`]s, persisted by a [`RecordStore`].

mod availability;
mod config;
mod context;
mod engine;
mod error;
mod instances;
mod local;
mod payload;
mod record;
mod store;
mod template;

pub use crate::availability::OrderAction;
pub use crate::config::SyncConfig;
pub use crate::context::{FormTarget, FormValues, Notice, NoticeLevel, SyncContext};
pub use crate::engine::{SyncOutcome, SyncStatus, Synchronizer};
pub use crate::error::{SyncError, error_chain};
pub use crate::local::{EntityKey, EntityKind, LocalCatalogue, LocalEvent, LocalInstance, Location};
pub use crate::record::SyncRecord;
pub use crate::store::{RecordStore, SqliteRecordStore};
