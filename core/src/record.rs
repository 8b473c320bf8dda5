// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;
use ticketsync_remote::Document;

use crate::context::FormValues;
use crate::local::{EntityKey, EntityKind};

/// Persisted mapping between a local entity and its remote twin.
///
/// Snapshots hold the last payload the service returned and serve as the merge
/// base of the next update, so fields owned by someone else survive.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub key: EntityKey,

    /// Whether the entity is mirrored at all.
    pub maintain_copy: bool,
    /// Remote event cloned when creating.
    pub template_reference: Option<String>,
    pub accounting_code: Option<String>,
    /// Operator custom form values.
    pub custom_fields: Document,

    pub remote_service_url: Option<String>,
    pub remote_organizer: Option<String>,
    /// `None` until the remote event exists.
    pub remote_event_slug: Option<String>,
    /// Instances only.
    pub remote_sub_event_id: Option<i64>,

    pub event_snapshot: Option<Document>,
    pub sub_event_snapshot: Option<Document>,
    /// Products of the event (array).
    pub product_snapshot: Option<Value>,
    /// The instance's quota (object), or every quota of a singular event (array).
    pub quota_snapshot: Option<Value>,
    /// Quotas with availability, as last reported by the service.
    pub availability_snapshot: Option<Value>,
    /// Whether any ticket was still available at the last refresh.
    pub available: Option<bool>,
}

impl SyncRecord {
    /// An empty record, not mirrored.
    #[must_use]
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            maintain_copy: false,
            template_reference: None,
            accounting_code: None,
            custom_fields: Document::new(),
            remote_service_url: None,
            remote_organizer: None,
            remote_event_slug: None,
            remote_sub_event_id: None,
            event_snapshot: None,
            sub_event_snapshot: None,
            product_snapshot: None,
            quota_snapshot: None,
            availability_snapshot: None,
            available: None,
        }
    }

    /// Applies operator form values.
    pub fn apply(&mut self, values: &FormValues) {
        if let Some(maintain) = values.maintain_copy {
            self.maintain_copy = maintain;
        }
        if let Some(template) = &values.template_reference {
            self.template_reference = Some(template.trim().to_string()).filter(|t| !t.is_empty());
        }
        if let Some(code) = &values.accounting_code {
            self.accounting_code = Some(code.trim().to_string()).filter(|c| !c.is_empty());
        }
        self.custom_fields.merge(&values.custom_fields);
    }

    /// Whether the remote event exists.
    #[must_use]
    pub const fn is_mirrored(&self) -> bool {
        self.remote_event_slug.is_some()
    }

    /// Id of the quota in the snapshot, for instance records.
    #[must_use]
    pub fn quota_id(&self) -> Option<i64> {
        self.quota_snapshot.as_ref()?.get("id")?.as_i64()
    }

    /// Points the record at a remote event.
    pub fn bind_event(&mut self, service_url: &str, organizer: &str, slug: &str) {
        self.remote_service_url = Some(service_url.to_string());
        self.remote_organizer = Some(organizer.to_string());
        self.remote_event_slug = Some(slug.to_string());
    }

    /// Forgets every remote identifier and snapshot and stops mirroring.
    pub fn detach(&mut self) {
        *self = Self {
            template_reference: self.template_reference.take(),
            accounting_code: self.accounting_code.take(),
            custom_fields: std::mem::take(&mut self.custom_fields),
            ..Self::new(self.key)
        };
    }

    /// Public ticket shop URL.
    #[must_use]
    pub fn ticket_shop_url(&self) -> Option<String> {
        let base = self.event_base()?;
        match (self.key.kind, self.remote_sub_event_id) {
            (EntityKind::Instance, Some(id)) => Some(format!("{base}{id}/")),
            (EntityKind::Instance, None) => None,
            (EntityKind::Series, _) => Some(base),
        }
    }

    /// Back-office URL of the remote event.
    #[must_use]
    pub fn admin_url(&self) -> Option<String> {
        let url = self.remote_service_url.as_deref()?.trim_end_matches('/');
        let organizer = self.remote_organizer.as_deref()?;
        let slug = self.remote_event_slug.as_deref()?;
        Some(format!("{url}/control/event/{organizer}/{slug}/"))
    }

    fn event_base(&self) -> Option<String> {
        let url = self.remote_service_url.as_deref()?.trim_end_matches('/');
        let organizer = self.remote_organizer.as_deref()?;
        let slug = self.remote_event_slug.as_deref()?;
        Some(format!("{url}/{organizer}/{slug}/"))
    }
}
