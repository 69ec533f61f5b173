//! HTTP requests and responses as plain data, plus the transport seam.
//!
//! # Design
//! The core never touches a socket. It builds an `AssembledRequest`, hands it
//! to a `Transport` supplied by the host, and decodes the `Delivery` that
//! comes back. A transport honours the cache policies carried on the request
//! and reports a cache hit through `Delivery::cached`.

use async_trait::async_trait;
use url::Url;

use crate::config::{CachePolicy, CacheStoragePolicy};
use crate::endpoint::HttpMethod;
use crate::error::QueryError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// A fully built request, ready for one dispatch.
#[derive(Debug, Clone)]
pub struct AssembledRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub cache_policy: CachePolicy,
    pub cache_storage_policy: CacheStoragePolicy,
}

impl AssembledRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            cache_policy: CachePolicy::default(),
            cache_storage_policy: CacheStoragePolicy::default(),
        }
    }

    /// Set a header, replacing any existing value under the same name
    /// (compared case-insensitively).
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Bytes and metadata delivered by the transport for one request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of one dispatch: the terminal response, preceded by a cached one
/// when the transport answered from its cache first.
///
/// A transport whose cache hit replaces the network round-trip returns the
/// cached response in both slots.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub cached: Option<RawResponse>,
    pub response: RawResponse,
}

impl From<RawResponse> for Delivery {
    fn from(response: RawResponse) -> Self {
        Self {
            cached: None,
            response,
        }
    }
}

/// Sends assembled requests. Implemented by the host on top of its HTTP
/// library of choice.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: AssembledRequest) -> Result<Delivery, QueryError>;
}
