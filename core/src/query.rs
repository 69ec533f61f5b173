//! The `Query` facade: configure, then create/read/update/delete.
//!
//! # Design
//! A `Query` owns its `Configuration`, its `EndpointDescriptor` and the URL
//! under construction; nothing else aliases them. Path and query setters
//! update the configuration and the URL in the same call. Verb methods set
//! the HTTP method, assemble the request, await the transport and decode the
//! response. The returned future resolves exactly once with either the
//! decoded result or an error.
//!
//! Misconfiguration (a body on a GET, a multipart body without its image,
//! a model response without a models path, a malformed URL) is a bug in the
//! calling code, so verbs panic on it instead of returning an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use url::Url;

use crate::body::{BodyValue, BoundarySource, ClockBoundary, ImagePart, FILE_KEY, IMAGE_KEY};
use crate::config::{CachePolicy, CacheStoragePolicy, Configuration, ResponseType};
use crate::endpoint::{EndpointDescriptor, HttpMethod};
use crate::error::QueryError;
use crate::http::{AssembledRequest, RawResponse, Transport};
use crate::request::{self, UrlComponents};
use crate::response::{self, DecodedResponse};

/// Receives responses the transport served from its cache.
pub trait QueryDelegate: Send + Sync {
    fn cached_response(&self, url: &Url, data: Option<&DecodedResponse>);
}

/// Lifecycle of a query. A query returns to `Configured` once a verb call
/// completes and can then be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Configured,
    Dispatching,
    Completed,
}

pub type QueryResult = Result<Option<DecodedResponse>, QueryError>;

pub struct Query {
    config: Configuration,
    endpoint: EndpointDescriptor,
    components: UrlComponents,
    transport: Arc<dyn Transport>,
    delegate: Option<Arc<dyn QueryDelegate>>,
    boundaries: Arc<dyn BoundarySource>,
    state: QueryState,
}

impl Query {
    /// Create a query for `endpoint`. Path and query items already present in
    /// `config` are appended to the endpoint path in order.
    pub fn new(
        config: Configuration,
        endpoint: EndpointDescriptor,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut components = UrlComponents::new(&config.http_protocol, &config.host, &endpoint.path);
        for (_, value) in &config.path_items {
            components.push_path_segment(value);
        }
        for (key, value) in &config.query_items {
            components.push_query_pair(key, value);
        }
        Self {
            config,
            endpoint,
            components,
            transport,
            delegate: None,
            boundaries: Arc::new(ClockBoundary),
            state: QueryState::Configured,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.config.headers
    }

    pub fn path_items(&self) -> &[(String, String)] {
        &self.config.path_items
    }

    pub fn query_items(&self) -> &[(String, String)] {
        &self.config.query_items
    }

    pub fn body_items(&self) -> &BTreeMap<String, BodyValue> {
        &self.config.body_items
    }

    pub fn models_path(&self) -> &str {
        &self.config.models_path
    }

    pub fn response_type(&self) -> ResponseType {
        self.config.response_type
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.config.cache_policy
    }

    pub fn cache_storage_policy(&self) -> CacheStoragePolicy {
        self.config.cache_storage_policy
    }

    /// URL path built so far, endpoint path included.
    pub fn path(&self) -> &str {
        self.components.path()
    }

    /// Query string built so far, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.components.query()
    }

    pub fn url(&self) -> Result<Url, QueryError> {
        self.components.to_url()
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.config.merge_headers([(key, value)]);
        self
    }

    /// Merge `headers` into the configured ones; the last write wins.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.merge_headers(headers);
        self
    }

    /// Append `value` as the next path segment.
    pub fn set_path_item(&mut self, key: &str, value: &str) -> &mut Self {
        self.config.push_path_item(key, value);
        self.components.push_path_segment(value);
        self
    }

    pub fn set_path_items<I, K, V>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in items {
            self.set_path_item(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Append `key=value` to the query string.
    pub fn set_query_item(&mut self, key: &str, value: &str) -> &mut Self {
        self.config.push_query_item(key, value);
        self.components.push_query_pair(key, value);
        self
    }

    pub fn set_query_items<I, K, V>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in items {
            self.set_query_item(key.as_ref(), value.as_ref());
        }
        self
    }

    pub fn set_body_item(&mut self, key: &str, value: impl Into<BodyValue>) -> &mut Self {
        self.config.body_items.insert(key.to_string(), value.into());
        self
    }

    pub fn set_body_items<I, K, V>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BodyValue>,
    {
        self.config
            .body_items
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn clear_body_items(&mut self) -> &mut Self {
        self.config.body_items.clear();
        self
    }

    /// Attach the file sent by image and multipart bodies.
    pub fn set_file_data(&mut self, part: ImagePart) -> &mut Self {
        self.set_body_item(IMAGE_KEY, part)
    }

    /// Attach the payload sent by plain text bodies.
    pub fn set_text_body(&mut self, text: &str) -> &mut Self {
        self.set_body_item(FILE_KEY, text)
    }

    pub fn set_models_path(&mut self, path: &str) -> &mut Self {
        self.config.models_path = path.to_string();
        self
    }

    pub fn set_response_type(&mut self, response_type: ResponseType) -> &mut Self {
        self.config.response_type = response_type;
        self
    }

    pub fn set_cache_policy(&mut self, policy: CachePolicy) -> &mut Self {
        self.config.cache_policy = policy;
        self
    }

    pub fn set_cache_storage_policy(&mut self, policy: CacheStoragePolicy) -> &mut Self {
        self.config.cache_storage_policy = policy;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn QueryDelegate>) -> &mut Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn set_boundary_source(&mut self, boundaries: Arc<dyn BoundarySource>) -> &mut Self {
        self.boundaries = boundaries;
        self
    }

    // -----------------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------------

    /// POST the configured body.
    ///
    /// # Panics
    /// On misconfiguration, see the module documentation.
    pub async fn create(&mut self) -> QueryResult {
        self.dispatch(HttpMethod::Post).await
    }

    /// GET the endpoint.
    ///
    /// # Panics
    /// On misconfiguration, see the module documentation.
    pub async fn read(&mut self) -> QueryResult {
        self.dispatch(HttpMethod::Get).await
    }

    /// PUT the configured body.
    ///
    /// # Panics
    /// On misconfiguration, see the module documentation.
    pub async fn update(&mut self) -> QueryResult {
        self.dispatch(HttpMethod::Put).await
    }

    /// DELETE the endpoint.
    ///
    /// # Panics
    /// On misconfiguration, see the module documentation.
    pub async fn delete(&mut self) -> QueryResult {
        self.dispatch(HttpMethod::Delete).await
    }

    /// The request a verb would send for the endpoint's current method.
    pub fn assemble(&self) -> Result<AssembledRequest, QueryError> {
        let url = self.components.to_url()?;
        request::assemble(&self.endpoint, &self.config, url, self.boundaries.as_ref())
    }

    /// Decode `bytes` with the current response settings.
    pub fn response(&self, bytes: &[u8]) -> QueryResult {
        response::decode(
            self.config.response_type,
            &self.config.models_path,
            self.endpoint.model_type.as_ref(),
            bytes,
        )
    }

    async fn dispatch(&mut self, method: HttpMethod) -> QueryResult {
        self.endpoint.method = method;
        halt_on_precondition(self.check_response_settings())?;
        let request = halt_on_precondition(self.assemble())?;

        self.transition(QueryState::Dispatching);
        debug!(
            method = %request.method,
            url = %request.url,
            body_len = request.body.as_ref().map_or(0, Vec::len),
            "dispatching request"
        );
        let delivery = self.transport.send(request).await;
        self.transition(QueryState::Completed);

        let result = match delivery {
            Ok(delivery) => {
                if let Some(cached) = &delivery.cached {
                    self.notify_cached(cached);
                }
                if !delivery.response.is_success() {
                    debug!(status = delivery.response.status, "non-success status");
                }
                halt_on_precondition(self.response(&delivery.response.body))
            }
            Err(err) => {
                warn!(%err, "request failed");
                Err(err)
            }
        };
        self.transition(QueryState::Configured);
        result
    }

    fn check_response_settings(&self) -> Result<(), QueryError> {
        if self.config.response_type != ResponseType::ModelList {
            return Ok(());
        }
        if self.config.models_path.is_empty() {
            return Err(QueryError::MissingModelsPath);
        }
        if self.endpoint.model_type.is_none() {
            return Err(QueryError::MissingModelType);
        }
        Ok(())
    }

    fn notify_cached(&self, cached: &RawResponse) {
        let Some(delegate) = &self.delegate else {
            return;
        };
        debug!(url = %cached.url, "cached response");
        let decoded = halt_on_precondition(self.response(&cached.body)).ok().flatten();
        delegate.cached_response(&cached.url, decoded.as_ref());
    }

    fn transition(&mut self, next: QueryState) {
        trace!(from = ?self.state, to = ?next, "query state");
        self.state = next;
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("endpoint", &self.endpoint)
            .field("components", &self.components)
            .field("state", &self.state)
            .field("has_delegate", &self.delegate.is_some())
            .finish_non_exhaustive()
    }
}

#[track_caller]
fn halt_on_precondition<T>(result: Result<T, QueryError>) -> Result<T, QueryError> {
    match result {
        Err(err) if err.is_precondition() => panic!("misconfigured query: {err}"),
        other => other,
    }
}
