// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Availability refresh driven by order notifications of the ticketing service.

use serde_json::Value;
use ticketsync_remote::{Document, Entity, FetchOptions, Webhook};

use crate::context::SyncContext;
use crate::engine::Synchronizer;
use crate::error::{RemoteContext, SyncError, error_chain};
use crate::local::EntityKind;

/// Order notification actions that change availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Paid,
    Canceled,
}

impl OrderAction {
    pub const PAID: &'static str = "pretix.event.order.paid";
    pub const CANCELED: &'static str = "pretix.event.order.canceled";

    /// Actions the notification webhook subscribes to.
    pub const SUBSCRIBED: [&'static str; 13] = [
        "pretix.event.order.placed",
        "pretix.event.order.placed.require_approval",
        Self::PAID,
        Self::CANCELED,
        "pretix.event.order.expired",
        "pretix.event.order.modified",
        "pretix.event.order.contact.changed",
        "pretix.event.order.changed.*",
        "pretix.event.order.refund.created.externally",
        "pretix.event.order.approved",
        "pretix.event.order.denied",
        "pretix.event.checkin",
        "pretix.event.checkin.reverted",
    ];

    /// Parses a notification action; other actions yield `None`.
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            Self::PAID => Some(OrderAction::Paid),
            Self::CANCELED => Some(OrderAction::Canceled),
            _ => None,
        }
    }
}

/// Quotas with their availability reports.
struct Availability {
    snapshot: Vec<Value>,
    available: bool,
}

impl Synchronizer {
    /// Refreshes the availability of the dates an order touches and of its event.
    ///
    /// Unknown actions and events that are not mirrored here are ignored.
    /// Failures are logged and reported as an error notice.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn on_order_notification(
        &self,
        ctx: &mut SyncContext,
        organizer: &str,
        event: &str,
        order_code: &str,
        action: &str,
    ) {
        let Some(action) = OrderAction::parse(action) else {
            tracing::debug!(action, "ignoring notification");
            return;
        };

        if let Err(err) = self.refresh_availability(organizer, event, order_code).await {
            let message = error_chain(&err);
            tracing::error!(event, order_code, ?action, error = %message, "refreshing availability failed");
            ctx.error(format!(
                "Refreshing availability of ticketing event {event} failed: {message}"
            ));
        }
    }

    /// Registers the webhook that delivers order notifications to `target_url`.
    ///
    /// A webhook already pointing at `target_url` is updated to the current
    /// settings, otherwise a new one is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is blank or the service rejects a request.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_webhook(&self, target_url: &str) -> Result<Webhook, SyncError> {
        let target_url = target_url.trim();
        if target_url.is_empty() {
            return Err(SyncError::Synchronize(
                "Webhook target URL not set".to_string(),
            ));
        }

        let webhooks = self
            .client
            .webhooks()
            .await
            .context(|| "Cannot get webhooks".to_string())?;
        let settings = Document::new()
            .with("target_url", target_url)
            .with("enabled", true)
            .with("all_events", true)
            .with("limit_events", Vec::<String>::new())
            .with("action_types", OrderAction::SUBSCRIBED.to_vec());

        match webhooks.into_iter().find(|w| w.target_url == target_url) {
            Some(existing) => {
                tracing::info!(webhook = existing.id, "updating webhook");
                self.client
                    .update_webhook(&existing, &settings)
                    .await
                    .context(|| format!("Cannot update webhook {}", existing.id))
            }
            None => {
                tracing::info!("creating webhook");
                self.client
                    .create_webhook(&settings)
                    .await
                    .context(|| format!("Cannot create webhook for {target_url}"))
            }
        }
    }

    async fn refresh_availability(
        &self,
        organizer: &str,
        slug: &str,
        order_code: &str,
    ) -> Result<(), SyncError> {
        let records = self.store.find_by_remote_event(organizer, slug).await?;
        let Some(mut series_record) = records
            .into_iter()
            .find(|r| r.key.kind == EntityKind::Series)
        else {
            tracing::debug!(organizer, slug, "event is not mirrored here");
            return Ok(());
        };

        let order = self
            .client
            .order(organizer, slug, order_code)
            .await
            .context(|| format!("Cannot get order {order_code}"))?;

        for sub_event in order.sub_event_ids() {
            let Some(mut record) = self.store.find_by_sub_event(slug, sub_event).await? else {
                tracing::debug!(slug, sub_event, "date is not mirrored here");
                continue;
            };

            let availability = self
                .quota_availability(slug, FetchOptions::all().query("subevent", sub_event))
                .await?;
            tracing::debug!(key = %record.key, available = availability.available, "date availability refreshed");
            record.availability_snapshot = Some(Value::Array(availability.snapshot));
            record.available = Some(availability.available);
            self.store.save(&record).await?;
            self.catalogue.invalidate(record.key).await?;
        }

        let availability = self.quota_availability(slug, FetchOptions::all()).await?;
        tracing::info!(slug, available = availability.available, "event availability refreshed");
        series_record.availability_snapshot = Some(Value::Array(availability.snapshot));
        series_record.available = Some(availability.available);
        self.store.save(&series_record).await?;
        self.catalogue.invalidate(series_record.key).await
    }

    async fn quota_availability(
        &self,
        slug: &str,
        options: FetchOptions,
    ) -> Result<Availability, SyncError> {
        let quotas = self
            .client
            .quotas(slug, &options)
            .await
            .context(|| format!("Cannot get quotas of {slug}"))?;

        let mut snapshot = Vec::with_capacity(quotas.len());
        let mut available = false;
        for quota in &quotas {
            let report = self
                .client
                .quota_availability(slug, quota)
                .await
                .context(|| format!("Cannot get availability of quota {}", quota.id))?;
            available |= report.available;

            let mut document = quota.document().clone();
            document.insert("availability", report.document().to_value());
            snapshot.push(document.into_value());
        }

        Ok(Availability {
            snapshot,
            available,
        })
    }
}
