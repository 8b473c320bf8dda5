// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory ticketing service served by a wiremock catch-all responder.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ORGANIZER: &str = "library";
pub const TEMPLATE: &str = "template";

const PREFIX: [&str; 5] = ["api", "v1", "organizers", ORGANIZER, "events"];

/// Remote data keyed by event slug.
#[derive(Debug, Default)]
pub struct RemoteState {
    pub events: BTreeMap<String, Value>,
    pub items: BTreeMap<String, Vec<Value>>,
    pub sub_events: BTreeMap<String, Vec<Value>>,
    pub quotas: BTreeMap<String, Vec<Value>>,
    /// Orders keyed by event slug and order code.
    pub orders: BTreeMap<(String, String), Value>,
    /// Availability reports keyed by quota id; unlisted quotas are available.
    pub availability: BTreeMap<i64, Value>,
    /// Number of upcoming sub-event creations that come with a quota already.
    pub quotas_with_next_sub_events: usize,
    /// Every non-GET request as `METHOD path`, path relative to the events collection.
    pub writes: Vec<String>,
    next_id: i64,
    next_sub_event_id: i64,
}

impl RemoteState {
    pub fn new() -> Self {
        Self {
            next_id: 1000,
            next_sub_event_id: 101,
            ..Default::default()
        }
    }

    /// A template event with multiple dates: one date, one product, one quota.
    pub fn multi_date_template() -> Self {
        let mut state = Self::new();
        state.events.insert(
            TEMPLATE.to_string(),
            json!({
                "slug": TEMPLATE,
                "name": {"en": "Template"},
                "has_subevents": true,
                "live": false,
                "testmode": true,
                "is_public": false,
                "currency": "EUR",
                "meta_data": {},
            }),
        );
        state.items.insert(TEMPLATE.to_string(), vec![ticket_item()]);
        state.sub_events.insert(
            TEMPLATE.to_string(),
            vec![json!({
                "id": 50,
                "event": TEMPLATE,
                "name": {"en": "Template date"},
                "date_from": "2026-01-01T10:00:00+01:00",
                "active": false,
                "is_public": true,
                "presale_start": null,
                "frontpage_text": {"en": "Welcome"},
                "item_price_overrides": [{"item": 1, "price": "0.00"}],
            })],
        );
        state.quotas.insert(
            TEMPLATE.to_string(),
            vec![json!({
                "id": 60,
                "name": "Tickets",
                "size": 10,
                "items": [1],
                "variations": [],
                "subevent": 50,
                "close_when_sold_out": false,
            })],
        );
        state
    }

    /// A template event without dates: one product, one event-wide quota.
    pub fn singular_template() -> Self {
        let mut state = Self::new();
        state.events.insert(
            TEMPLATE.to_string(),
            json!({
                "slug": TEMPLATE,
                "name": {"en": "Template"},
                "has_subevents": false,
                "live": false,
                "testmode": true,
                "is_public": false,
                "currency": "EUR",
                "meta_data": {},
            }),
        );
        state.items.insert(TEMPLATE.to_string(), vec![ticket_item()]);
        state.quotas.insert(
            TEMPLATE.to_string(),
            vec![json!({
                "id": 60,
                "name": "Tickets",
                "size": 10,
                "items": [1],
                "variations": [],
                "subevent": null,
            })],
        );
        state
    }

    /// Ids of the sub-events of an event, in creation order.
    pub fn sub_event_ids(&self, slug: &str) -> Vec<i64> {
        self.sub_events
            .get(slug)
            .map(|list| list.iter().filter_map(|s| s["id"].as_i64()).collect())
            .unwrap_or_default()
    }

    /// Quotas of an event.
    pub fn quotas_of(&self, slug: &str) -> Vec<Value> {
        self.quotas.get(slug).cloned().unwrap_or_default()
    }

    fn handle(&mut self, request: &Request) -> ResponseTemplate {
        let method = request.method.as_str().to_string();
        let segments: Vec<&str> = request
            .url
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let Some(rest) = segments.strip_prefix(&PREFIX[..]) else {
            return not_found();
        };
        if method != "GET" {
            self.writes.push(format!("{method} {}", rest.join("/")));
        }

        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let sub_event_filter = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "subevent")
            .and_then(|(_, value)| value.parse::<i64>().ok());

        match (method.as_str(), rest) {
            ("GET", []) => page(self.events.values().cloned().collect()),
            ("GET", [slug]) => self.events.get(*slug).cloned().map_or_else(not_found, ok),
            ("PATCH", [slug]) => match self.events.get_mut(*slug) {
                Some(event) => {
                    merge(event, &body);
                    ok(event.clone())
                }
                None => not_found(),
            },
            ("DELETE", [slug]) => {
                if self.events.remove(*slug).is_none() {
                    return not_found();
                }
                self.items.remove(*slug);
                self.sub_events.remove(*slug);
                self.quotas.remove(*slug);
                ResponseTemplate::new(204)
            }
            ("POST", [slug, "clone"]) => self.clone_event(slug, &body),
            ("GET", [slug, "items"]) => page(self.items.get(*slug).cloned().unwrap_or_default()),
            ("PATCH", [slug, "items", id]) => patch_entry(self.items.get_mut(*slug), id, &body),
            ("GET", [slug, "subevents"]) => {
                page(self.sub_events.get(*slug).cloned().unwrap_or_default())
            }
            ("POST", [slug, "subevents"]) => self.create_sub_event(slug, body),
            ("PATCH", [slug, "subevents", id]) => {
                patch_entry(self.sub_events.get_mut(*slug), id, &body)
            }
            ("DELETE", [slug, "subevents", id]) => remove_entry(self.sub_events.get_mut(*slug), id),
            ("GET", [slug, "quotas"]) => page(
                self.quotas_of(slug)
                    .into_iter()
                    .filter(|q| sub_event_filter.is_none_or(|id| q["subevent"] == id))
                    .collect(),
            ),
            ("POST", [slug, "quotas"]) => self.create_quota(slug, body),
            ("PATCH", [slug, "quotas", id]) => patch_entry(self.quotas.get_mut(*slug), id, &body),
            ("GET", [_, "quotas", id, "availability"]) => {
                let id: i64 = id.parse().unwrap_or_default();
                ok(self
                    .availability
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| json!({"available": true, "available_number": null})))
            }
            ("GET", [slug, "orders", code]) => self
                .orders
                .get(&((*slug).to_string(), (*code).to_string()))
                .cloned()
                .map_or_else(not_found, ok),
            _ => not_found(),
        }
    }

    fn clone_event(&mut self, template: &str, body: &Value) -> ResponseTemplate {
        let Some(mut event) = self.events.get(template).cloned() else {
            return not_found();
        };
        merge(&mut event, body);
        let Some(slug) = event["slug"].as_str().map(str::to_string) else {
            return ResponseTemplate::new(400);
        };

        let mut item_ids = BTreeMap::new();
        let mut items = self.items.get(template).cloned().unwrap_or_default();
        for item in &mut items {
            let id = self.next_id();
            item_ids.insert(item["id"].as_i64().unwrap_or_default(), id);
            item["id"] = json!(id);
        }

        let mut quotas: Vec<Value> = self
            .quotas_of(template)
            .into_iter()
            .filter(|q| q["subevent"].is_null())
            .collect();
        for quota in &mut quotas {
            quota["id"] = json!(self.next_id());
            let remapped: Vec<i64> = quota["items"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_i64)
                .filter_map(|id| item_ids.get(&id).copied())
                .collect();
            quota["items"] = json!(remapped);
        }

        self.events.insert(slug.clone(), event.clone());
        self.items.insert(slug.clone(), items);
        self.quotas.insert(slug.clone(), quotas);
        self.sub_events.insert(slug, Vec::new());
        created(event)
    }

    fn create_sub_event(&mut self, slug: &str, mut sub_event: Value) -> ResponseTemplate {
        if !self.events.contains_key(slug) {
            return not_found();
        }
        let id = self.next_sub_event_id;
        self.next_sub_event_id += 1;
        sub_event["id"] = json!(id);
        sub_event["event"] = json!(slug);
        self.sub_events
            .entry(slug.to_string())
            .or_default()
            .push(sub_event.clone());

        if self.quotas_with_next_sub_events > 0 {
            self.quotas_with_next_sub_events -= 1;
            let item = self
                .items
                .get(slug)
                .and_then(|items| items.first())
                .map(|item| item["id"].clone())
                .unwrap_or(Value::Null);
            let quota = json!({
                "id": self.next_id(),
                "name": "Existing",
                "size": 5,
                "items": [item],
                "variations": [],
                "subevent": id,
            });
            self.quotas.entry(slug.to_string()).or_default().push(quota);
        }
        created(sub_event)
    }

    fn create_quota(&mut self, slug: &str, mut quota: Value) -> ResponseTemplate {
        if !self.events.contains_key(slug) {
            return not_found();
        }
        quota["id"] = json!(self.next_id());
        self.quotas
            .entry(slug.to_string())
            .or_default()
            .push(quota.clone());
        created(quota)
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn ticket_item() -> Value {
    json!({
        "id": 1,
        "name": {"en": "Ticket"},
        "default_price": "0.00",
        "active": true,
        "has_variations": false,
        "variations": [],
    })
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn patch_entry(list: Option<&mut Vec<Value>>, id: &str, patch: &Value) -> ResponseTemplate {
    let id: i64 = id.parse().unwrap_or_default();
    match list.and_then(|list| list.iter_mut().find(|entry| entry["id"] == id)) {
        Some(entry) => {
            merge(entry, patch);
            ok(entry.clone())
        }
        None => not_found(),
    }
}

fn remove_entry(list: Option<&mut Vec<Value>>, id: &str) -> ResponseTemplate {
    let id: i64 = id.parse().unwrap_or_default();
    let Some(list) = list else {
        return not_found();
    };
    let before = list.len();
    list.retain(|entry| entry["id"] != id);
    if list.len() == before {
        not_found()
    } else {
        ResponseTemplate::new(204)
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn created(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(body)
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."}))
}

fn page(results: Vec<Value>) -> ResponseTemplate {
    ok(json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    }))
}

struct Responder(Arc<Mutex<RemoteState>>);

impl Respond for Responder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.0.lock().unwrap().handle(request)
    }
}

/// Mock server backed by a [`RemoteState`].
pub struct FakeRemote {
    pub server: MockServer,
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub async fn start(state: RemoteState) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(state));
        Mock::given(any())
            .respond_with(Responder(Arc::clone(&state)))
            .mount(&server)
            .await;
        Self { server, state }
    }

    pub async fn multi_date() -> Self {
        Self::start(RemoteState::multi_date_template()).await
    }

    pub async fn singular() -> Self {
        Self::start(RemoteState::singular_template()).await
    }

    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    /// Number of requests received so far, reads included.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .len()
    }
}
