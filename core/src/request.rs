//! Request assembly: URL components plus descriptor and configuration in,
//! `AssembledRequest` out.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::{form_urlencoded, Url};

use crate::body::{self, BoundarySource};
use crate::config::Configuration;
use crate::endpoint::EndpointDescriptor;
use crate::error::QueryError;
use crate::http::{AssembledRequest, CONTENT_LENGTH, CONTENT_TYPE};

/// Bytes escaped inside one path segment: everything that would end the
/// segment or the path, start an escape, or is not allowed in a URL.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL under construction. Path segments and query pairs are appended one at
/// a time as the query is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    scheme: String,
    host: String,
    path: String,
    query: Option<String>,
}

impl UrlComponents {
    pub fn new(scheme: &str, host: &str, path: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: path.to_string(),
            query: None,
        }
    }

    /// Percent-encoded path built so far.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Append `segment` as one path segment, escaping any reserved bytes.
    pub fn push_path_segment(&mut self, segment: &str) {
        self.path.push('/');
        self.path.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }

    pub fn push_query_pair(&mut self, key: &str, value: &str) {
        let key: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
        self.query = Some(match self.query.take() {
            Some(query) if !query.is_empty() => format!("{query}&{key}={value}"),
            _ => format!("{key}={value}"),
        });
    }

    /// Join the components into a URL.
    pub fn to_url(&self) -> Result<Url, QueryError> {
        let mut raw = format!("{}://{}{}", self.scheme, self.host, self.path);
        if let Some(query) = &self.query {
            raw.push('?');
            raw.push_str(query);
        }
        if self.host.is_empty() {
            return Err(QueryError::MalformedUrl {
                url: raw,
                reason: "missing host".to_string(),
            });
        }
        Url::parse(&raw).map_err(|e| QueryError::MalformedUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}

/// Build the request for `endpoint` against `url`.
///
/// Header precedence, lowest first: the endpoint's content type, the
/// configured headers, then the content type required by the serialized body
/// (image mime type or multipart boundary).
pub fn assemble(
    endpoint: &EndpointDescriptor,
    config: &Configuration,
    url: Url,
    boundaries: &dyn BoundarySource,
) -> Result<AssembledRequest, QueryError> {
    let mut request = AssembledRequest::new(endpoint.method, url);
    request.cache_policy = config.cache_policy;
    request.cache_storage_policy = config.cache_storage_policy;

    request.set_header(CONTENT_TYPE, endpoint.content_type.mime());
    for (name, value) in &config.headers {
        request.set_header(name, value);
    }

    if !config.body_items.is_empty() {
        let body = body::serialize(
            endpoint.method,
            endpoint.content_type,
            &config.body_items,
            boundaries,
        )?;
        if let Some(content_type) = &body.content_type {
            request.set_header(CONTENT_TYPE, content_type);
        }
        request.set_header(CONTENT_LENGTH, &body.bytes.len().to_string());
        request.body = Some(body.bytes);
    }

    Ok(request)
}
