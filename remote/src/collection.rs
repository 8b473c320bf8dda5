// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use serde_json::Value;

use crate::types::Entity;

/// Options for fetching a collection.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Follow `next` links until the last page.
    pub fetch_all: bool,
    /// Query parameters for the first request. Later pages carry their own.
    pub query: Vec<(String, String)>,
}

impl FetchOptions {
    /// Fetch every page.
    #[must_use]
    pub fn all() -> Self {
        Self {
            fetch_all: true,
            query: Vec::new(),
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }
}

/// One page of a collection response.
#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<Value>,
}

/// Hydrated entities of one collection fetch, in server order.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T: Entity> Collection<T> {
    /// Creates a collection from hydrated entities.
    #[must_use]
    pub const fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// The first entity, if any.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the entities.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Consumes the collection.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
