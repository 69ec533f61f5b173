//! Mutable configuration read by every query.
//!
//! # Design
//! `Configuration` is a passive value: it holds what the request should look
//! like and how the response should be shaped, and nothing else. A `Query`
//! owns one and mutates it only through its own setters, which also keep the
//! URL components in step with the path and query items. Deriving serde lets
//! callers keep store-wide defaults in a config file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::BodyValue;

/// How the transport may answer from its cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    UseProtocolCachePolicy,
    ReloadIgnoringLocalCacheData,
    ReturnCacheDataElseLoad,
    ReturnCacheDataDontLoad,
}

/// Whether the transport may store the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStoragePolicy {
    #[default]
    Allowed,
    AllowedInMemoryOnly,
    NotAllowed,
}

/// Shape the response bytes are decoded into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    RawData,
    String,
    StructuredObject,
    ModelList,
}

/// Headers, URL items, body items and response settings for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// URL scheme, e.g. `https`.
    pub http_protocol: String,
    pub host: String,
    pub headers: BTreeMap<String, String>,
    /// Path items in the order they were appended to the URL.
    pub path_items: Vec<(String, String)>,
    /// Query items in the order they were appended to the URL.
    pub query_items: Vec<(String, String)>,
    pub body_items: BTreeMap<String, BodyValue>,
    /// Dot path to the record array inside a JSON response.
    pub models_path: String,
    pub cache_policy: CachePolicy,
    pub cache_storage_policy: CacheStoragePolicy,
    pub response_type: ResponseType,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            http_protocol: "https".to_string(),
            host: String::new(),
            headers: BTreeMap::new(),
            path_items: Vec::new(),
            query_items: Vec::new(),
            body_items: BTreeMap::new(),
            models_path: String::new(),
            cache_policy: CachePolicy::default(),
            cache_storage_policy: CacheStoragePolicy::default(),
            response_type: ResponseType::default(),
        }
    }
}

impl Configuration {
    pub fn new(http_protocol: &str, host: &str) -> Self {
        Self {
            http_protocol: http_protocol.to_string(),
            host: host.to_string(),
            ..Self::default()
        }
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.merge_headers(headers);
        self
    }

    /// Merge `headers` into the existing ones; the last write wins.
    pub fn merge_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Append a path item. Items are never replaced, so they stay in step
    /// with the segments already appended to the URL.
    pub fn push_path_item(&mut self, key: &str, value: &str) {
        self.path_items.push((key.to_string(), value.to_string()));
    }

    /// Append a query item; same discipline as [`Self::push_path_item`].
    pub fn push_query_item(&mut self, key: &str, value: &str) {
        self.query_items.push((key.to_string(), value.to_string()));
    }
}
