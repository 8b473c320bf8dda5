// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of local instances with remote sub-events and their quotas.

use serde_json::{Value, json};
use ticketsync_remote::{Document, Entity, Event, FetchOptions, Item, Quota};

use crate::engine::{LinkUpdate, Synchronizer};
use crate::error::{RemoteContext, SyncError, error_chain};
use crate::local::{LocalEvent, LocalInstance};
use crate::payload;
use crate::record::SyncRecord;

/// Fields of the template sub-event never copied into a new sub-event.
const TEMPLATE_ONLY_FIELDS: [&str; 4] = [
    "id",
    "event",
    "item_price_overrides",
    "variation_price_overrides",
];

impl Synchronizer {
    /// Creates or updates the sub-event of every instance, in order, then
    /// deletes remote sub-events no instance maps to.
    ///
    /// The first failing instance stops the run; instances before it keep
    /// their remote state and the cleanup is skipped.
    pub(crate) async fn reconcile_instances(
        &self,
        series: &LocalEvent,
        template: &str,
        event: &Event,
        products: &[Item],
        parent: &SyncRecord,
    ) -> Result<Vec<LinkUpdate>, SyncError> {
        let mut run = Reconciler {
            sync: self,
            series,
            template,
            slug: &event.slug,
            products,
            parent,
            template_sub_event: None,
            template_quota: None,
        };

        let mut produced = Vec::with_capacity(series.instances.len());
        let mut links = Vec::new();
        for instance in &series.instances {
            let record = run
                .reconcile(instance)
                .await
                .map_err(|e| SyncError::Instance {
                    id: instance.id,
                    source: Box::new(e),
                })?;

            if let Some(id) = record.remote_sub_event_id {
                produced.push(id);
            }
            if let Some(url) = record.ticket_shop_url() {
                links.push(LinkUpdate {
                    key: instance.key(),
                    current: instance.ticket_link.clone(),
                    url,
                });
            }
        }

        run.remove_orphans(&produced).await;
        Ok(links)
    }
}

struct Reconciler<'a> {
    sync: &'a Synchronizer,
    series: &'a LocalEvent,
    template: &'a str,
    slug: &'a str,
    products: &'a [Item],
    parent: &'a SyncRecord,

    // fetched on first use
    template_sub_event: Option<Document>,
    template_quota: Option<Quota>,
}

impl Reconciler<'_> {
    async fn reconcile(&mut self, instance: &LocalInstance) -> Result<SyncRecord, SyncError> {
        let key = instance.key();
        let mut record = match self.sync.store.load(key).await? {
            Some(record) => record,
            None => SyncRecord::new(key),
        };

        if record.remote_event_slug.as_deref() != Some(self.slug) {
            // mapped to another remote event before, start over
            record.remote_sub_event_id = None;
            record.sub_event_snapshot = None;
            record.quota_snapshot = None;
        }
        record.bind_event(
            self.sync.client.base_url(),
            self.sync.client.organizer(),
            self.slug,
        );
        record.maintain_copy = self.parent.maintain_copy;
        record.template_reference.clone_from(&self.parent.template_reference);

        match record.remote_sub_event_id {
            None => self.create(instance, &mut record).await?,
            Some(sub_event) => self.update(instance, sub_event, &mut record).await?,
        }

        self.sync.store.save(&record).await?;
        Ok(record)
    }

    async fn create(
        &mut self,
        instance: &LocalInstance,
        record: &mut SyncRecord,
    ) -> Result<(), SyncError> {
        let template = self.template_sub_event().await?;
        let products = self.products;
        let product = products
            .first()
            .ok_or_else(|| SyncError::Synchronize(format!("Event {} has no products", self.slug)))?;

        let mut data = record.sub_event_snapshot.clone().unwrap_or_default();
        data.merge(&payload::sub_event_fields(
            &self.sync.config,
            self.series,
            instance,
            Some(product),
        )?);
        data.fill_missing(&template);
        data.remove("id");

        tracing::info!(instance = instance.id, slug = self.slug, "creating sub-event");
        let slug = self.slug;
        let sub_event = self
            .sync
            .client
            .create_sub_event(slug, &data)
            .await
            .context(|| format!("Cannot create date in {slug}"))?;

        // persist right away so a later failure never leads to a second date
        record.remote_sub_event_id = Some(sub_event.id);
        record.sub_event_snapshot = Some(sub_event.document().clone());
        record.quota_snapshot = None;
        self.sync.store.save(record).await?;

        self.ensure_quota(instance, sub_event.id, product, record)
            .await
    }

    async fn update(
        &mut self,
        instance: &LocalInstance,
        sub_event: i64,
        record: &mut SyncRecord,
    ) -> Result<(), SyncError> {
        let slug = self.slug;
        let products = self.products;
        let fields =
            payload::sub_event_fields(&self.sync.config, self.series, instance, products.first())?;
        let snapshot = record.sub_event_snapshot.clone().unwrap_or_default();
        let changes = fields.changes_against(&snapshot);

        if changes.is_empty() {
            tracing::debug!(instance = instance.id, sub_event, "sub-event unchanged");
        } else {
            tracing::info!(
                instance = instance.id,
                sub_event,
                fields = ?changes.keys().collect::<Vec<_>>(),
                "updating sub-event"
            );
            let updated = self
                .sync
                .client
                .update_sub_event(slug, &sub_event, &changes)
                .await
                .context(|| format!("Cannot update date {sub_event} of {slug}"))?;
            record.sub_event_snapshot = Some(updated.document().clone());
            self.sync.store.save(record).await?;
        }

        let Some(quota) = record.quota_id() else {
            tracing::warn!(instance = instance.id, sub_event, "quota snapshot missing");
            let product = products.first().ok_or_else(|| {
                SyncError::Synchronize(format!("Event {slug} has no products"))
            })?;
            return self.ensure_quota(instance, sub_event, product, record).await;
        };

        let size = instance.quota_size(self.series);
        let current = record
            .quota_snapshot
            .as_ref()
            .and_then(|q| q.get("size"))
            .cloned()
            .unwrap_or(Value::Null);
        if current == json!(size) {
            return Ok(());
        }

        tracing::info!(instance = instance.id, quota, ?size, "updating quota size");
        let updated = self
            .sync
            .client
            .update_quota(slug, &quota, &Document::new().with("size", size))
            .await
            .context(|| format!("Cannot update quota {quota} of {slug}"))?;
        record.quota_snapshot = Some(updated.document().to_value());
        Ok(())
    }

    /// Makes sure the sub-event has a quota, reusing one the service already has.
    async fn ensure_quota(
        &mut self,
        instance: &LocalInstance,
        sub_event: i64,
        product: &Item,
        record: &mut SyncRecord,
    ) -> Result<(), SyncError> {
        let slug = self.slug;
        let existing = self
            .sync
            .client
            .quotas(slug, &FetchOptions::all().query("subevent", sub_event))
            .await
            .context(|| format!("Cannot get quotas of date {sub_event}"))?;
        if let Some(quota) = existing.first() {
            tracing::debug!(instance = instance.id, quota = quota.id, "reusing quota");
            record.quota_snapshot = Some(quota.document().to_value());
            return Ok(());
        }

        let template = self.template_quota().await?;
        let variations = if template.variations.is_empty() {
            Vec::new()
        } else {
            let variation = product
                .first_variation()
                .filter(|_| product.has_variations)
                .ok_or_else(|| {
                    SyncError::Synchronize(format!(
                        "Product {} has no variation for the quota of date {sub_event}",
                        product.id
                    ))
                })?;
            vec![variation.id]
        };

        let data = payload::quota_from_template(
            template.document(),
            Some(sub_event),
            instance.quota_size(self.series),
            product.id,
            variations,
        );

        tracing::info!(instance = instance.id, sub_event, "creating quota");
        let quota = self
            .sync
            .client
            .create_quota(slug, &data)
            .await
            .context(|| format!("Cannot create quota for date {sub_event}"))?;
        record.quota_snapshot = Some(quota.document().to_value());
        Ok(())
    }

    async fn template_sub_event(&mut self) -> Result<Document, SyncError> {
        if let Some(document) = &self.template_sub_event {
            return Ok(document.clone());
        }

        let template = self.template;
        let sub_events = self
            .sync
            .client
            .sub_events(template)
            .await
            .context(|| format!("Cannot get dates of template event {template}"))?;
        let count = sub_events.len();
        let mut iter = sub_events.into_iter();
        let (Some(sub_event), None) = (iter.next(), iter.next()) else {
            return Err(SyncError::Synchronize(format!(
                "Template event {template} must have exactly one date, found {count}"
            )));
        };

        let mut document = sub_event.document().clone();
        for field in TEMPLATE_ONLY_FIELDS {
            document.remove(field);
        }
        self.template_sub_event = Some(document.clone());
        Ok(document)
    }

    async fn template_quota(&mut self) -> Result<Quota, SyncError> {
        if let Some(quota) = &self.template_quota {
            return Ok(quota.clone());
        }

        let template = self.template;
        let quotas = self
            .sync
            .client
            .quotas(template, &FetchOptions::all())
            .await
            .context(|| format!("Cannot get quotas of template event {template}"))?;
        let quota = quotas.into_iter().next().ok_or_else(|| {
            SyncError::Synchronize(format!("Template event {template} has no quota"))
        })?;
        self.template_quota = Some(quota.clone());
        Ok(quota)
    }

    /// Deletes remote sub-events that no instance produced in this run.
    ///
    /// Failures are logged and otherwise ignored.
    async fn remove_orphans(&self, produced: &[i64]) {
        let slug = self.slug;
        let sub_events = match self.sync.client.sub_events(slug).await {
            Ok(sub_events) => sub_events,
            Err(err) => {
                tracing::warn!(slug, error = %err, "cannot list dates for cleanup");
                return;
            }
        };

        for sub_event in sub_events.iter().filter(|s| !produced.contains(&s.id)) {
            tracing::info!(slug, sub_event = sub_event.id, "deleting orphaned sub-event");
            if let Err(err) = self.sync.client.delete_sub_event(slug, sub_event).await {
                tracing::warn!(slug, sub_event = sub_event.id, error = %err, "cannot delete orphaned sub-event");
                continue;
            }

            let forgotten = match self.sync.store.find_by_sub_event(slug, sub_event.id).await {
                Ok(Some(record)) => self.sync.store.delete(record.key).await.map(|_| ()),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            };
            if let Err(err) = forgotten {
                tracing::warn!(slug, sub_event = sub_event.id, error = %error_chain(&err), "cannot forget orphaned record");
            }
        }
    }
}
