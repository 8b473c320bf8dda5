// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request-scoped synchronization state.

use std::collections::HashMap;

use ticketsync_remote::Document;

use crate::engine::SyncOutcome;
use crate::local::{EntityKey, EntityKind};

/// Operator-supplied values to apply to a record before it is persisted.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pub maintain_copy: Option<bool>,
    pub template_reference: Option<String>,
    /// An empty string clears the code.
    pub accounting_code: Option<String>,
    pub custom_fields: Document,
}

/// Which entity pending form values belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormTarget {
    /// An existing entity.
    Entity(EntityKey),
    /// An entity of this kind that had no id yet when the form was submitted.
    New(EntityKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Status,
    Warning,
    Error,
}

/// Message for the operator who triggered the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// State of one request: processed entities, pending form values and notices.
///
/// Create one per request and pass it to every engine call of that request.
#[derive(Debug, Default)]
pub struct SyncContext {
    processed: HashMap<EntityKey, SyncOutcome>,
    form_values: HashMap<FormTarget, FormValues>,
    notices: Vec<Notice>,
}

impl SyncContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears everything, for reuse by the next request.
    pub fn reset(&mut self) {
        self.processed.clear();
        self.form_values.clear();
        self.notices.clear();
    }

    /// Result of an entity already synchronized in this request.
    #[must_use]
    pub fn processed(&self, key: EntityKey) -> Option<&SyncOutcome> {
        self.processed.get(&key)
    }

    pub(crate) fn mark_processed(&mut self, key: EntityKey, outcome: SyncOutcome) {
        self.processed.insert(key, outcome);
    }

    /// Queues form values for an entity.
    pub fn set_form_values(&mut self, target: FormTarget, values: FormValues) {
        self.form_values.insert(target, values);
    }

    /// Takes the form values of an entity, falling back to those of a new entity of its kind.
    pub fn take_form_values(&mut self, key: EntityKey) -> Option<FormValues> {
        self.form_values
            .remove(&FormTarget::Entity(key))
            .or_else(|| self.form_values.remove(&FormTarget::New(key.kind)))
    }

    pub(crate) fn status(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Status, message.into());
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message.into());
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    /// Notices collected so far.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drains the notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn push(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }
}
