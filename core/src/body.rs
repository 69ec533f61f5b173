//! Body items and their wire encodings.
//!
//! # Design
//! `serialize` is a pure function of the method, content type and body items.
//! Multipart bodies are assembled as byte buffers so binary image data is
//! copied verbatim. The multipart boundary comes from a `BoundarySource`,
//! letting tests pin it while production code seeds it from the clock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::endpoint::{ContentType, HttpMethod};
use crate::error::QueryError;

/// Reserved body key holding the image part of image and multipart bodies.
pub const IMAGE_KEY: &str = "image_data";

/// Reserved body key holding the payload of plain text bodies.
pub const FILE_KEY: &str = "file_data";

/// A file destined for an image upload or a multipart form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePart {
    data: Vec<u8>,
    file_name: String,
    mime_type: String,
    name: String,
}

impl ImagePart {
    /// Build an image part. Every field is required.
    pub fn new(
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        name: &str,
    ) -> Result<Self, QueryError> {
        let part = Self {
            data,
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            name: name.to_string(),
        };
        part.validate()?;
        Ok(part)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Deserialized parts skip `new`, so serialization checks again.
    fn validate(&self) -> Result<(), QueryError> {
        if self.data.is_empty() {
            return Err(QueryError::IncompleteImagePart("data"));
        }
        if self.file_name.is_empty() {
            return Err(QueryError::IncompleteImagePart("file name"));
        }
        if self.mime_type.is_empty() {
            return Err(QueryError::IncompleteImagePart("mime type"));
        }
        if self.name.is_empty() {
            return Err(QueryError::IncompleteImagePart("name"));
        }
        Ok(())
    }
}

impl fmt::Debug for ImagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePart")
            .field("data", &format_args!("{} bytes", self.data.len()))
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("name", &self.name)
            .finish()
    }
}

/// Value of one body item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyValue {
    Text(String),
    /// Any JSON value, including nested mappings.
    Json(Value),
    Image(ImagePart),
}

impl BodyValue {
    /// The value when it is a string, `None` otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyValue::Text(text) => Some(text),
            BodyValue::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    fn to_json(&self, key: &str) -> Result<Value, QueryError> {
        match self {
            BodyValue::Text(text) => Ok(Value::String(text.clone())),
            BodyValue::Json(value) => Ok(value.clone()),
            BodyValue::Image(_) => Err(QueryError::SerializationError(format!(
                "body item `{key}` is an image part and has no JSON representation"
            ))),
        }
    }

    fn form_text(&self) -> String {
        match self {
            BodyValue::Text(text) => text.clone(),
            BodyValue::Json(Value::String(text)) => text.clone(),
            BodyValue::Json(value) => value.to_string(),
            BodyValue::Image(part) => part.file_name.clone(),
        }
    }
}

impl From<&str> for BodyValue {
    fn from(text: &str) -> Self {
        BodyValue::Text(text.to_string())
    }
}

impl From<String> for BodyValue {
    fn from(text: String) -> Self {
        BodyValue::Text(text)
    }
}

impl From<Value> for BodyValue {
    fn from(value: Value) -> Self {
        BodyValue::Json(value)
    }
}

impl From<ImagePart> for BodyValue {
    fn from(part: ImagePart) -> Self {
        BodyValue::Image(part)
    }
}

/// Source of multipart boundaries, unique per request.
pub trait BoundarySource: fmt::Debug + Send + Sync {
    fn boundary(&self) -> String;
}

/// Boundaries seeded from the wall clock plus a process-wide counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockBoundary;

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

impl BoundarySource for ClockBoundary {
    fn boundary(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let sequence = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!(
            "Boundary+{}.{:09}-{sequence}",
            now.as_secs(),
            now.subsec_nanos()
        )
    }
}

/// Always yields the same boundary.
#[derive(Debug, Clone)]
pub struct FixedBoundary(pub String);

impl BoundarySource for FixedBoundary {
    fn boundary(&self) -> String {
        self.0.clone()
    }
}

/// Encoded body plus the `Content-Type` it must be sent with, when that
/// differs from the endpoint's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl SerializedBody {
    fn plain(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }
}

/// Encode `items` for `content_type`.
///
/// Fails with `BodyNotAllowed` for GET and DELETE, and with the matching
/// precondition error when a reserved entry is missing.
pub fn serialize(
    method: HttpMethod,
    content_type: ContentType,
    items: &BTreeMap<String, BodyValue>,
    boundaries: &dyn BoundarySource,
) -> Result<SerializedBody, QueryError> {
    if !method.allows_body() {
        return Err(QueryError::BodyNotAllowed(method));
    }
    match content_type {
        ContentType::Json => json(items).map(SerializedBody::plain),
        ContentType::UrlEncodedForm => Ok(SerializedBody::plain(url_encoded(items).into_bytes())),
        ContentType::MultipartForm => {
            let boundary = boundaries.boundary();
            let bytes = multipart(items, &boundary)?;
            Ok(SerializedBody {
                bytes,
                content_type: Some(format!("{}; boundary={boundary}", content_type.mime())),
            })
        }
        ContentType::Image => {
            let part = image_part(items)?;
            Ok(SerializedBody {
                bytes: part.data.clone(),
                content_type: Some(part.mime_type.clone()),
            })
        }
        ContentType::PlainText => {
            let text = items
                .get(FILE_KEY)
                .and_then(BodyValue::as_text)
                .ok_or(QueryError::MissingFileData)?;
            Ok(SerializedBody::plain(text.as_bytes().to_vec()))
        }
    }
}

/// The whole item mapping as one pretty-printed JSON object.
pub fn json(items: &BTreeMap<String, BodyValue>) -> Result<Vec<u8>, QueryError> {
    let mut object = Map::with_capacity(items.len());
    for (key, value) in items {
        object.insert(key.clone(), value.to_json(key)?);
    }
    Ok(serde_json::to_vec_pretty(&Value::Object(object))?)
}

/// `key=value` pairs joined by `&`, values percent-encoded. Items that are
/// not strings are skipped.
pub fn url_encoded(items: &BTreeMap<String, BodyValue>) -> String {
    items
        .iter()
        .filter_map(|(key, value)| {
            value.as_text().map(|text| {
                let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
                format!("{key}={encoded}")
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `multipart/form-data` body delimited by `boundary`. Requires an image part
/// under [`IMAGE_KEY`].
pub fn multipart(items: &BTreeMap<String, BodyValue>, boundary: &str) -> Result<Vec<u8>, QueryError> {
    image_part(items)?;

    let mut body = Vec::new();
    for (key, value) in items {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match value {
            BodyValue::Image(part) => {
                part.validate()?;
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        quoted(&part.name),
                        quoted(&part.file_name),
                        part.mime_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&part.data);
            }
            other => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", quoted(key)).as_bytes(),
                );
                body.extend_from_slice(other.form_text().as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(body)
}

/// Escape a `Content-Disposition` parameter value: `"`, CR and LF become
/// `%22`, `%0D` and `%0A`.
fn quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn image_part(items: &BTreeMap<String, BodyValue>) -> Result<&ImagePart, QueryError> {
    match items.get(IMAGE_KEY) {
        Some(BodyValue::Image(part)) => {
            part.validate()?;
            Ok(part)
        }
        _ => Err(QueryError::MissingImagePart),
    }
}
