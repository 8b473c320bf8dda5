// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use serde_json::Value;
use ticketsync_remote::{Document, Entity, Event, FetchOptions, Item, TicketingClient};

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::{RemoteContext, SyncError, error_chain};
use crate::local::{EntityKey, EntityKind, LocalCatalogue, LocalEvent};
use crate::payload;
use crate::record::SyncRecord;
use crate::store::RecordStore;

/// Whether the remote event was created or updated by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Created,
    Updated,
}

/// Result of synchronizing one series.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The remote event as left by the run.
    Synchronized { event: Event, status: SyncStatus },
    /// The series is not mirrored; nothing was sent.
    NotMirrored,
    /// The run stopped at a failed step; the message holds the cause chain.
    Failed { message: String },
}

impl SyncOutcome {
    #[must_use]
    pub const fn event(&self) -> Option<&Event> {
        match self {
            SyncOutcome::Synchronized { event, .. } => Some(event),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

/// Ticket shop link to write back to the catalogue.
#[derive(Debug, Clone)]
pub(crate) struct LinkUpdate {
    pub key: EntityKey,
    pub current: Option<String>,
    pub url: String,
}

/// Mirrors local series and their instances onto the ticketing service.
pub struct Synchronizer {
    pub(crate) client: TicketingClient,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) catalogue: Arc<dyn LocalCatalogue>,
    pub(crate) config: SyncConfig,
}

impl Synchronizer {
    /// Creates a synchronizer talking to the service of `config.remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RecordStore>,
        catalogue: Arc<dyn LocalCatalogue>,
    ) -> Result<Self, SyncError> {
        let client = TicketingClient::new(config.remote.clone())
            .map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(Self {
            client,
            store,
            catalogue,
            config,
        })
    }

    #[must_use]
    pub const fn client(&self) -> &TicketingClient {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronizes a series and its instances.
    ///
    /// Never fails: errors stop the run at the failed step, are logged with
    /// their cause chain and reported as an error notice and a
    /// [`SyncOutcome::Failed`]. A series already handled in this request
    /// returns its earlier outcome.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn synchronize(&self, ctx: &mut SyncContext, series_id: i64) -> SyncOutcome {
        let key = EntityKey::series(series_id);
        if let Some(outcome) = ctx.processed(key) {
            tracing::debug!(%key, "already processed in this request");
            return outcome.clone();
        }

        match self.run(ctx, key).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!(%key, error = %message, "synchronization failed");
                ctx.error(format!(
                    "Synchronizing series {series_id} with the ticketing service failed: {message}"
                ));
                let outcome = SyncOutcome::Failed { message };
                ctx.mark_processed(key, outcome.clone());
                outcome
            }
        }
    }

    async fn run(&self, ctx: &mut SyncContext, key: EntityKey) -> Result<SyncOutcome, SyncError> {
        let series = self.catalogue.load_series(key.id).await?;
        let mut record = self.load_record(key).await?;
        let form_values = ctx.take_form_values(key);
        if let Some(values) = &form_values {
            record.apply(values);
        }

        if !record.maintain_copy {
            if form_values.is_some() {
                self.store.save(&record).await?;
            }
            tracing::debug!(%key, "series is not mirrored");
            ctx.mark_processed(key, SyncOutcome::NotMirrored);
            return Ok(SyncOutcome::NotMirrored);
        }

        let template = record
            .template_reference
            .clone()
            .ok_or_else(|| SyncError::Synchronize("Template event not set".to_string()))?;

        let (event, status) = match record.remote_event_slug.clone() {
            None => (
                self.create_event(&series, &template, &mut record).await?,
                SyncStatus::Created,
            ),
            Some(slug) => (
                self.update_event(&series, &slug, &mut record).await?,
                SyncStatus::Updated,
            ),
        };

        let products = self.propagate_prices(&series, &event, &mut record).await?;
        if event.is_singular() {
            self.push_capacity(&series, &event, &mut record).await?;
        }

        let links = if event.has_subevents {
            self.reconcile_instances(&series, &template, &event, &products, &record)
                .await?
        } else {
            Vec::new()
        };

        let event = self.apply_live_state(ctx, &series, event).await?;
        record.event_snapshot = Some(event.document().clone());
        self.store.save(&record).await?;

        tracing::info!(%key, slug = %event.slug, ?status, "series synchronized");
        ctx.status(format!(
            "Series {} synchronized with ticketing event {}",
            key.id, event.slug
        ));
        let outcome = SyncOutcome::Synchronized { event, status };
        ctx.mark_processed(key, outcome.clone());

        if let Some(url) = record.ticket_shop_url() {
            self.write_back(LinkUpdate {
                key,
                current: series.ticket_link.clone(),
                url,
            })
            .await?;
        }
        for link in links {
            self.write_back(link).await?;
        }

        Ok(outcome)
    }

    async fn load_record(&self, key: EntityKey) -> Result<SyncRecord, SyncError> {
        Ok(match self.store.load(key).await? {
            Some(record) => record,
            None => {
                let mut record = SyncRecord::new(key);
                record.template_reference = self.config.template_event.clone();
                record
            }
        })
    }

    async fn create_event(
        &self,
        series: &LocalEvent,
        template: &str,
        record: &mut SyncRecord,
    ) -> Result<Event, SyncError> {
        let template_event = self
            .client
            .event(template)
            .await
            .context(|| format!("Cannot get template event {template}"))?;

        let slug = payload::event_slug(&self.config, series.id);
        let mut data =
            payload::event_fields(&self.config, series, record.accounting_code.as_deref(), None)?;
        data.insert("slug", slug.as_str());
        data.insert("has_subevents", template_event.has_subevents);
        data.insert("live", false);
        data.insert("testmode", false);

        tracing::info!(series = series.id, template, %slug, "cloning template event");
        let event = self
            .client
            .clone_event(&template_event, &data)
            .await
            .context(|| format!("Cannot clone template event {template}"))?;

        // persist right away so a later failure never leads to a second clone
        record.bind_event(self.client.base_url(), self.client.organizer(), &event.slug);
        record.event_snapshot = Some(event.document().clone());
        self.store.save(record).await?;
        Ok(event)
    }

    async fn update_event(
        &self,
        series: &LocalEvent,
        slug: &str,
        record: &mut SyncRecord,
    ) -> Result<Event, SyncError> {
        let snapshot = record.event_snapshot.clone().unwrap_or_default();
        let fields = payload::event_fields(
            &self.config,
            series,
            record.accounting_code.as_deref(),
            record.event_snapshot.as_ref(),
        )?;
        let changes = fields.changes_against(&snapshot);

        if changes.is_empty() {
            if let Ok(event) = Event::hydrate(snapshot.into_value()) {
                tracing::debug!(slug, "event unchanged");
                return Ok(event);
            }
            return self
                .client
                .event(slug)
                .await
                .context(|| format!("Cannot get event {slug}"));
        }

        tracing::info!(slug, fields = ?changes.keys().collect::<Vec<_>>(), "updating event");
        let event = self
            .client
            .update_event(slug, &changes)
            .await
            .context(|| format!("Cannot update event {slug}"))?;
        record.event_snapshot = Some(event.document().clone());
        self.store.save(record).await?;
        Ok(event)
    }

    async fn propagate_prices(
        &self,
        series: &LocalEvent,
        event: &Event,
        record: &mut SyncRecord,
    ) -> Result<Vec<Item>, SyncError> {
        let price = series.price();
        let items = self
            .client
            .items(event)
            .await
            .context(|| format!("Cannot get products of {}", event.slug))?;

        let mut products = Vec::with_capacity(items.len());
        for item in items {
            if item.default_price == Some(price) {
                products.push(item);
                continue;
            }

            tracing::info!(slug = %event.slug, item = item.id, %price, "updating product price");
            let data = Document::new().with("default_price", price);
            let updated = self
                .client
                .update_item(event, &item, &data)
                .await
                .context(|| format!("Cannot update price of product {}", item.id))?;
            products.push(updated);
        }

        record.product_snapshot = Some(Value::Array(
            products.iter().map(|p| p.document().to_value()).collect(),
        ));
        self.store.save(record).await?;
        Ok(products)
    }

    async fn push_capacity(
        &self,
        series: &LocalEvent,
        event: &Event,
        record: &mut SyncRecord,
    ) -> Result<(), SyncError> {
        let size = series.quota_size();
        let quotas = self
            .client
            .quotas(event, &FetchOptions::all())
            .await
            .context(|| format!("Cannot get quotas of {}", event.slug))?;

        let mut snapshot = Vec::with_capacity(quotas.len());
        for quota in quotas {
            if quota.size == size {
                snapshot.push(quota.document().to_value());
                continue;
            }

            tracing::info!(slug = %event.slug, quota = quota.id, ?size, "updating quota size");
            let updated = self
                .client
                .update_quota(event, &quota, &Document::new().with("size", size))
                .await
                .context(|| format!("Cannot update quota {}", quota.id))?;
            snapshot.push(updated.document().to_value());
        }

        record.quota_snapshot = Some(Value::Array(snapshot));
        self.store.save(record).await?;
        Ok(())
    }

    /// Sets the live flag from the publish flag.
    ///
    /// An event with multiple dates but no instance stays as it is: the
    /// service refuses to sell an event without dates.
    async fn apply_live_state(
        &self,
        ctx: &mut SyncContext,
        series: &LocalEvent,
        event: Event,
    ) -> Result<Event, SyncError> {
        let has_dates = event.is_singular() || !series.instances.is_empty();
        if series.published && !has_dates {
            tracing::warn!(slug = %event.slug, "event has no dates, not setting it live");
            ctx.warning(format!(
                "Ticketing event {} was not set live because it has no dates",
                event.slug
            ));
            return Ok(event);
        }

        let live = series.published;
        if event.live == live {
            return Ok(event);
        }

        tracing::info!(slug = %event.slug, live, "updating live state");
        self.client
            .update_event(&event, &Document::new().with("live", live))
            .await
            .context(|| format!("Cannot set live state of {}", event.slug))
    }

    async fn write_back(&self, link: LinkUpdate) -> Result<(), SyncError> {
        if link.current.as_deref() == Some(link.url.as_str()) {
            return Ok(());
        }
        tracing::debug!(key = %link.key, url = %link.url, "storing ticket link");
        self.catalogue.set_ticket_link(link.key, &link.url).await
    }

    /// Deletes the remote event of a series and forgets its records.
    ///
    /// Returns whether a remote event was deleted.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_remote(&self, ctx: &mut SyncContext, series_id: i64) -> bool {
        match self.try_delete_remote(series_id).await {
            Ok(Some(slug)) => {
                ctx.status(format!("Ticketing event {slug} deleted"));
                true
            }
            Ok(None) => false,
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!(series = series_id, error = %message, "deleting remote event failed");
                ctx.error(format!("Deleting the ticketing event of series {series_id} failed: {message}"));
                false
            }
        }
    }

    async fn try_delete_remote(&self, series_id: i64) -> Result<Option<String>, SyncError> {
        let key = EntityKey::series(series_id);
        let Some(record) = self.store.load(key).await? else {
            return Ok(None);
        };
        let (Some(organizer), Some(slug)) = (&record.remote_organizer, &record.remote_event_slug)
        else {
            return Ok(None);
        };

        tracing::info!(%key, %slug, "deleting event");
        self.client
            .delete_event(slug)
            .await
            .context(|| format!("Cannot delete event {slug}"))?;

        for related in self.store.find_by_remote_event(organizer, slug).await? {
            self.store.delete(related.key).await?;
        }
        self.store.delete(key).await?;
        Ok(Some(slug.clone()))
    }

    /// Deletes the remote date of an instance and forgets its record.
    ///
    /// Returns whether a remote date was deleted.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_remote_instance(&self, ctx: &mut SyncContext, instance_id: i64) -> bool {
        match self.try_delete_remote_instance(instance_id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!(instance = instance_id, error = %message, "deleting remote date failed");
                ctx.error(format!(
                    "Deleting the ticketing date of instance {instance_id} failed: {message}"
                ));
                false
            }
        }
    }

    async fn try_delete_remote_instance(&self, instance_id: i64) -> Result<bool, SyncError> {
        let key = EntityKey::instance(instance_id);
        let Some(record) = self.store.load(key).await? else {
            return Ok(false);
        };
        let (Some(slug), Some(sub_event)) = (&record.remote_event_slug, record.remote_sub_event_id)
        else {
            return Ok(false);
        };

        tracing::info!(%key, %slug, sub_event, "deleting sub-event");
        self.client
            .delete_sub_event(slug, &sub_event)
            .await
            .context(|| format!("Cannot delete date {sub_event} of {slug}"))?;
        self.store.delete(key).await?;
        Ok(true)
    }

    /// Stops mirroring a series without touching the remote side.
    ///
    /// Remote identifiers of the series and its instances are forgotten, so a
    /// later synchronization creates a fresh remote event.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn detach(&self, ctx: &mut SyncContext, series_id: i64) -> bool {
        match self.try_detach(series_id).await {
            Ok(detached) => {
                if detached {
                    ctx.status(format!("Series {series_id} detached from the ticketing service"));
                }
                detached
            }
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!(series = series_id, error = %message, "detaching failed");
                ctx.error(format!("Detaching series {series_id} failed: {message}"));
                false
            }
        }
    }

    async fn try_detach(&self, series_id: i64) -> Result<bool, SyncError> {
        let key = EntityKey::series(series_id);
        let Some(record) = self.store.load(key).await? else {
            return Ok(false);
        };
        if let (Some(organizer), Some(slug)) = (&record.remote_organizer, &record.remote_event_slug)
        {
            for related in self.store.find_by_remote_event(organizer, slug).await? {
                if related.key.kind == EntityKind::Instance {
                    self.store.detach(related.key).await?;
                }
            }
        }
        tracing::info!(%key, "detaching series");
        self.store.detach(key).await
    }
}
