// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Ticketing client for event, date, product, quota and order operations.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::collection::{Collection, FetchOptions, Page};
use crate::config::RemoteConfig;
use crate::document::Document;
use crate::error::RemoteError;
use crate::http::HttpClient;
use crate::keys::{IdRef, SlugRef};
use crate::types::{
    Entity, Event, EventSettings, Item, Order, OrderPosition, Organizer, Quota, QuotaAvailability,
    SubEvent, Webhook,
};

/// Client for the remote ticketing service.
///
/// # Example
///
/// ```ignore
/// use ticketsync_remote::{AuthMethod, RemoteConfig, TicketingClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RemoteConfig {
///     base_url: "https://tickets.example.com".to_string(),
///     organizer: "library".to_string(),
///     auth: AuthMethod::Token {
///         token: "secret".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let client = TicketingClient::new(config)?;
/// let event = client.event("concert-12").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TicketingClient {
    http: Arc<HttpClient>,
    config: RemoteConfig,
}

impl TicketingClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = HttpClient::new(config.clone())?;
        Ok(Self {
            http: Arc::new(http),
            config,
        })
    }

    /// The service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// The organizer all requests are scoped to.
    #[must_use]
    pub fn organizer(&self) -> &str {
        &self.config.organizer
    }

    /// Checks that the service is reachable with the configured credentials.
    pub async fn ping(&self) -> bool {
        match self.events(&FetchOptions::default()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(%err, "ticketing service ping failed");
                false
            }
        }
    }

    /// Lists organizers visible to the credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn organizers(&self) -> Result<Collection<Organizer>, RemoteError> {
        self.fetch_collection("organizers/", &FetchOptions::all())
            .await
    }

    /// Gets the configured organizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn get_organizer(&self) -> Result<Organizer, RemoteError> {
        self.fetch_entity(&format!("organizers/{}/", self.config.organizer))
            .await
    }

    /// Lists events.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn events(&self, options: &FetchOptions) -> Result<Collection<Event>, RemoteError> {
        self.fetch_collection(&format!("organizers/{}/events/", self.config.organizer), options)
            .await
    }

    /// Gets a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event doesn't exist or decoding fails.
    pub async fn event(&self, event: &(impl SlugRef + ?Sized)) -> Result<Event, RemoteError> {
        self.fetch_entity(&self.event_path(event)?).await
    }

    /// Creates an event from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub async fn create_event(&self, data: &Document) -> Result<Event, RemoteError> {
        self.create_entity(&format!("organizers/{}/events/", self.config.organizer), data)
            .await
    }

    /// Creates an event by cloning `template`, overriding fields with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if cloning fails.
    pub async fn clone_event(
        &self,
        template: &(impl SlugRef + ?Sized),
        data: &Document,
    ) -> Result<Event, RemoteError> {
        let path = format!("{}clone/", self.event_path(template)?);
        self.create_entity(&path, data).await
    }

    /// Updates an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_event(
        &self,
        event: &(impl SlugRef + ?Sized),
        data: &Document,
    ) -> Result<Event, RemoteError> {
        self.update_entity(&self.event_path(event)?, data).await
    }

    /// Deletes an event.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete_event(&self, event: &(impl SlugRef + ?Sized)) -> Result<(), RemoteError> {
        self.delete_entity(&self.event_path(event)?).await
    }

    /// Gets event settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn event_settings(
        &self,
        event: &(impl SlugRef + ?Sized),
    ) -> Result<EventSettings, RemoteError> {
        let path = format!("{}settings/", self.event_path(event)?);
        self.fetch_entity(&path).await
    }

    /// Updates event settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_event_settings(
        &self,
        event: &(impl SlugRef + ?Sized),
        settings: &Document,
    ) -> Result<EventSettings, RemoteError> {
        let path = format!("{}settings/", self.event_path(event)?);
        self.update_entity(&path, settings).await
    }

    /// Lists the products of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn items(&self, event: &(impl SlugRef + ?Sized)) -> Result<Collection<Item>, RemoteError> {
        let path = format!("{}items/", self.event_path(event)?);
        self.fetch_collection(&path, &FetchOptions::all()).await
    }

    /// Updates a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_item(
        &self,
        event: &(impl SlugRef + ?Sized),
        item: &(impl IdRef + ?Sized),
        data: &Document,
    ) -> Result<Item, RemoteError> {
        let path = format!("{}items/{}/", self.event_path(event)?, item.resolve_id()?);
        self.update_entity(&path, data).await
    }

    /// Lists the quotas of an event.
    ///
    /// Use `FetchOptions::query("subevent", id)` to restrict to one date.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn quotas(
        &self,
        event: &(impl SlugRef + ?Sized),
        options: &FetchOptions,
    ) -> Result<Collection<Quota>, RemoteError> {
        let path = format!("{}quotas/", self.event_path(event)?);
        self.fetch_collection(&path, options).await
    }

    /// Creates a quota.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub async fn create_quota(
        &self,
        event: &(impl SlugRef + ?Sized),
        data: &Document,
    ) -> Result<Quota, RemoteError> {
        let path = format!("{}quotas/", self.event_path(event)?);
        self.create_entity(&path, data).await
    }

    /// Updates a quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_quota(
        &self,
        event: &(impl SlugRef + ?Sized),
        quota: &(impl IdRef + ?Sized),
        data: &Document,
    ) -> Result<Quota, RemoteError> {
        let path = format!("{}quotas/{}/", self.event_path(event)?, quota.resolve_id()?);
        self.update_entity(&path, data).await
    }

    /// Gets the availability of a quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn quota_availability(
        &self,
        event: &(impl SlugRef + ?Sized),
        quota: &(impl IdRef + ?Sized),
    ) -> Result<QuotaAvailability, RemoteError> {
        let path = format!(
            "{}quotas/{}/availability/",
            self.event_path(event)?,
            quota.resolve_id()?
        );
        self.fetch_entity(&path).await
    }

    /// Lists every sub-event of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn sub_events(
        &self,
        event: &(impl SlugRef + ?Sized),
    ) -> Result<Collection<SubEvent>, RemoteError> {
        let path = format!("{}subevents/", self.event_path(event)?);
        self.fetch_collection(&path, &FetchOptions::all()).await
    }

    /// Creates a sub-event.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub async fn create_sub_event(
        &self,
        event: &(impl SlugRef + ?Sized),
        data: &Document,
    ) -> Result<SubEvent, RemoteError> {
        let path = format!("{}subevents/", self.event_path(event)?);
        self.create_entity(&path, data).await
    }

    /// Updates a sub-event.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_sub_event(
        &self,
        event: &(impl SlugRef + ?Sized),
        sub_event: &(impl IdRef + ?Sized),
        data: &Document,
    ) -> Result<SubEvent, RemoteError> {
        let path = format!(
            "{}subevents/{}/",
            self.event_path(event)?,
            sub_event.resolve_id()?
        );
        self.update_entity(&path, data).await
    }

    /// Deletes a sub-event.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete_sub_event(
        &self,
        event: &(impl SlugRef + ?Sized),
        sub_event: &(impl IdRef + ?Sized),
    ) -> Result<(), RemoteError> {
        let path = format!(
            "{}subevents/{}/",
            self.event_path(event)?,
            sub_event.resolve_id()?
        );
        self.delete_entity(&path).await
    }

    /// Gets an order.
    ///
    /// The organizer is explicit because notifications name their own.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not alphanumeric, or if the order
    /// doesn't exist or decoding fails.
    pub async fn order(
        &self,
        organizer: &(impl SlugRef + ?Sized),
        event: &(impl SlugRef + ?Sized),
        code: &str,
    ) -> Result<Order, RemoteError> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RemoteError::InvalidArgument(format!(
                "Alphanumeric order code expected, found {code:?}"
            )));
        }
        let path = format!(
            "organizers/{}/events/{}/orders/{}/",
            organizer.resolve_slug()?,
            event.resolve_slug()?,
            code
        );
        self.fetch_entity(&path).await
    }

    /// Lists order positions of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn order_positions(
        &self,
        event: &(impl SlugRef + ?Sized),
        options: &FetchOptions,
    ) -> Result<Vec<OrderPosition>, RemoteError> {
        let path = format!("{}orderpositions/", self.event_path(event)?);
        let mut positions = Vec::new();
        for value in self.fetch_pages(&path, options).await? {
            positions.push(
                serde_json::from_value(value)
                    .map_err(|e| RemoteError::decode("order position", e))?,
            );
        }
        Ok(positions)
    }

    /// Lists the webhooks of the organizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn webhooks(&self) -> Result<Collection<Webhook>, RemoteError> {
        self.fetch_collection(&self.webhooks_path(), &FetchOptions::all())
            .await
    }

    /// Creates a webhook.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    pub async fn create_webhook(&self, data: &Document) -> Result<Webhook, RemoteError> {
        self.create_entity(&self.webhooks_path(), data).await
    }

    /// Updates a webhook.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_webhook(
        &self,
        webhook: &(impl IdRef + ?Sized),
        data: &Document,
    ) -> Result<Webhook, RemoteError> {
        let path = format!("{}{}/", self.webhooks_path(), webhook.resolve_id()?);
        self.update_entity(&path, data).await
    }

    /// Fetches a single entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body doesn't hydrate.
    pub async fn fetch_entity<T: Entity>(&self, path: &str) -> Result<T, RemoteError> {
        tracing::debug!(path, kind = T::KIND, "GET entity");
        let req = self.http.build_request(Method::GET, path);
        let value = self.http.execute_json(req, T::KIND).await?;
        T::hydrate(value)
    }

    /// Fetches a collection, following `next` links when `options.fetch_all` is set.
    ///
    /// Pages are requested one after another. Any item that fails to hydrate
    /// aborts the whole fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails or any item doesn't hydrate.
    pub async fn fetch_collection<T: Entity>(
        &self,
        path: &str,
        options: &FetchOptions,
    ) -> Result<Collection<T>, RemoteError> {
        let items = self
            .fetch_pages(path, options)
            .await?
            .into_iter()
            .map(T::hydrate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Collection::new(items))
    }

    /// Creates an entity with POST.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body doesn't hydrate.
    pub async fn create_entity<T: Entity>(
        &self,
        path: &str,
        payload: &Document,
    ) -> Result<T, RemoteError> {
        self.send_entity(Method::POST, path, payload).await
    }

    /// Partially updates an entity with PATCH.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body doesn't hydrate.
    pub async fn update_entity<T: Entity>(
        &self,
        path: &str,
        payload: &Document,
    ) -> Result<T, RemoteError> {
        self.send_entity(Method::PATCH, path, payload).await
    }

    /// Deletes an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_entity(&self, path: &str) -> Result<(), RemoteError> {
        tracing::debug!(path, "DELETE entity");
        self.http
            .execute(self.http.build_request(Method::DELETE, path))
            .await?;
        Ok(())
    }

    async fn send_entity<T: Entity>(
        &self,
        method: Method,
        path: &str,
        payload: &Document,
    ) -> Result<T, RemoteError> {
        tracing::debug!(%method, path, kind = T::KIND, "sending entity");
        let req = HttpClient::json_body(
            self.http.build_request(method, path),
            &payload.to_value(),
        );
        let value = self.http.execute_json(req, T::KIND).await?;
        T::hydrate(value)
    }

    async fn fetch_pages(
        &self,
        path: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut req = self.http.build_request(Method::GET, path);
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }

        let mut page = self.fetch_page(req).await?;
        let mut results = std::mem::take(&mut page.results);
        let mut count = 1;
        while options.fetch_all {
            let Some(next) = page.next.take() else { break };
            tracing::debug!(path, page = count + 1, "following next page");
            page = self
                .fetch_page(self.http.build_request(Method::GET, &next))
                .await?;
            results.append(&mut page.results);
            count += 1;
        }

        tracing::debug!(path, pages = count, items = results.len(), "fetched collection");
        Ok(results)
    }

    async fn fetch_page(&self, req: reqwest::RequestBuilder) -> Result<Page, RemoteError> {
        let value = self.http.execute_json(req, "collection").await?;
        serde_json::from_value(value).map_err(|e| RemoteError::decode("collection", e))
    }

    fn webhooks_path(&self) -> String {
        format!("organizers/{}/webhooks/", self.config.organizer)
    }

    fn event_path(&self, event: &(impl SlugRef + ?Sized)) -> Result<String, RemoteError> {
        Ok(format!(
            "organizers/{}/events/{}/",
            self.config.organizer,
            event.resolve_slug()?
        ))
    }
}
