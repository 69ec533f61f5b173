//! Endpoint descriptors and the model capability used by model responses.
//!
//! # Design
//! An `EndpointDescriptor` names one logical API operation. Only `method` and
//! `content_type` change after construction; the `Query` facade overrides the
//! method on every verb call. Both are plain enums rather than options, so a
//! descriptor can always be assembled into a request.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE requests never carry a body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body encoding strategy of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Json,
    UrlEncodedForm,
    MultipartForm,
    Image,
    PlainText,
}

impl ContentType {
    /// Value written to the `Content-Type` header before any override.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::UrlEncodedForm => "application/x-www-form-urlencoded",
            ContentType::MultipartForm => "multipart/form-data",
            ContentType::Image => "application/octet-stream",
            ContentType::PlainText => "text/plain",
        }
    }
}

/// A record type that can be populated from one JSON object.
///
/// Implementors are built through a [`ModelType`] factory when a query asks
/// for `ResponseType::ModelList`.
pub trait Model: fmt::Debug + Send + Sync + 'static {
    /// Copy the fields of `fields` into `self`.
    fn fill(&mut self, fields: &Map<String, Value>);

    /// Upcast used by [`crate::DecodedResponse::models`] to recover the
    /// concrete type.
    fn as_any(&self) -> &dyn Any;
}

type ModelFactory = Arc<dyn Fn() -> Box<dyn Model> + Send + Sync>;

/// Type reference for the models an endpoint returns: a display name used in
/// endpoint keys plus a factory for fresh instances.
#[derive(Clone)]
pub struct ModelType {
    name: String,
    factory: ModelFactory,
}

impl ModelType {
    /// Model type for `T`, named after the last path segment of its type name
    /// with any generic arguments removed.
    pub fn of<T: Model + Default>() -> Self {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base).to_string();
        Self {
            name,
            factory: Arc::new(|| Box::new(T::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a fresh, unpopulated model.
    pub fn instantiate(&self) -> Box<dyn Model> {
        (self.factory)()
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType").field("name", &self.name).finish()
    }
}

/// One logical API operation: path, method, content type and optional model.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub content_type: ContentType,
    pub model_type: Option<ModelType>,
}

impl EndpointDescriptor {
    pub fn new(path: &str, content_type: ContentType, method: HttpMethod) -> Self {
        Self {
            path: path.to_string(),
            method,
            content_type,
            model_type: None,
        }
    }

    /// JSON endpoint returning records of `model_type`.
    pub fn json(path: &str, method: HttpMethod, model_type: ModelType) -> Self {
        Self::new(path, ContentType::Json, method).with_model(model_type)
    }

    pub fn with_model(mut self, model_type: ModelType) -> Self {
        self.model_type = Some(model_type);
        self
    }

    /// Identity of an endpoint: `"<model name>_<method>"`, with `none` when
    /// the endpoint has no model type.
    pub fn key_for(model_type: Option<&ModelType>, method: HttpMethod) -> String {
        let name = model_type.map(ModelType::name).unwrap_or("none");
        format!("{name}_{method}")
    }

    pub fn key(&self) -> String {
        Self::key_for(self.model_type.as_ref(), self.method)
    }
}
