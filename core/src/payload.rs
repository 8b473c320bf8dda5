// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Remote payload fields computed from the local catalogue.

use jiff::Zoned;
use serde_json::{Value, json};
use ticketsync_remote::{Amount, Document, Item, localized};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::local::{LocalEvent, LocalInstance, Location};

/// Timestamp format used on the wire, e.g. `2026-03-01T10:00:00+01:00`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub(crate) fn format_timestamp(zoned: &Zoned) -> String {
    zoned.strftime(TIMESTAMP_FORMAT).to_string()
}

/// Slug for a new remote event.
pub(crate) fn event_slug(config: &SyncConfig, id: i64) -> String {
    let random: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    config
        .slug_template()
        .replace("{id}", &id.to_string())
        .replace("{random}", &random)
}

/// Event fields owned by the local catalogue.
///
/// `snapshot` is the last known remote event; it supplies dates when the series
/// has no instances, and the meta data entries owned by someone else.
pub(crate) fn event_fields(
    config: &SyncConfig,
    series: &LocalEvent,
    accounting_code: Option<&str>,
    snapshot: Option<&Document>,
) -> Result<Document, SyncError> {
    let lang = &config.default_language;
    let mut doc = Document::new()
        .with("name", localized(lang, series.label()?))
        .with("is_public", series.published)
        .with("location", location_value(lang, &series.location));

    let first = series.instances.iter().map(|i| &i.start).min();
    let last = series
        .instances
        .iter()
        .map(|i| i.end.as_ref().unwrap_or(&i.start))
        .max();
    match (first, last) {
        (Some(first), Some(last)) => {
            doc.insert("date_from", format_timestamp(first));
            doc.insert("date_to", format_timestamp(last));
        }
        _ => {
            let date_from = snapshot
                .and_then(|s| s.get("date_from"))
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(format_timestamp(&Zoned::now())));
            let date_to = snapshot
                .and_then(|s| s.get("date_to"))
                .cloned()
                .unwrap_or(Value::Null);
            doc.insert("date_from", date_from);
            doc.insert("date_to", date_to);
        }
    }

    if let Some(key) = &config.accounting_meta_key {
        let mut meta = snapshot
            .and_then(|s| s.get("meta_data"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        match accounting_code {
            Some(code) => meta.insert(key.clone(), Value::String(code.to_string())),
            None => meta.remove(key),
        };
        doc.insert("meta_data", Value::Object(meta));
    }

    Ok(doc)
}

/// Sub-event fields owned by the local catalogue.
pub(crate) fn sub_event_fields(
    config: &SyncConfig,
    series: &LocalEvent,
    instance: &LocalInstance,
    product: Option<&Item>,
) -> Result<Document, SyncError> {
    let lang = &config.default_language;
    let mut doc = Document::new()
        .with("name", localized(lang, instance.label(series)?))
        .with("date_from", format_timestamp(&instance.start))
        .with("location", location_value(lang, instance.location(series)))
        .with("active", true)
        .with("is_public", true);
    match &instance.end {
        Some(end) => doc.insert("date_to", format_timestamp(end)),
        None => doc.insert("date_to", Value::Null),
    };
    if let Some(product) = product {
        let (key, overrides) = price_overrides(product, series.price());
        doc.insert(key, overrides);
    }
    Ok(doc)
}

/// Price overrides of a sub-event for the chosen product.
fn price_overrides(product: &Item, price: Amount) -> (&'static str, Value) {
    if product.has_variations {
        let overrides = product
            .variations
            .iter()
            .map(|v| json!({"variation": v.id, "price": price}))
            .collect();
        ("variation_price_overrides", Value::Array(overrides))
    } else {
        (
            "item_price_overrides",
            json!([{"item": product.id, "price": price}]),
        )
    }
}

fn location_value(lang: &str, location: &Location) -> Value {
    let text = location.to_text();
    if text.is_empty() {
        Value::Null
    } else {
        localized(lang, text)
    }
}

/// Quota payload cloned from a template quota.
pub(crate) fn quota_from_template(
    template: &Document,
    sub_event: Option<i64>,
    size: Option<i64>,
    product: i64,
    variations: Vec<i64>,
) -> Document {
    let mut doc = template.clone();
    for key in ["id", "available", "available_number", "total_size", "pending_orders"] {
        doc.remove(key);
    }
    doc.insert("subevent", sub_event);
    doc.insert("size", size);
    doc.insert("items", vec![product]);
    doc.insert("variations", variations);
    doc
}
