//! Error types for request building, dispatch and response decoding.
//!
//! # Design
//! Two tiers share one enum. Precondition variants describe a misconfigured
//! query (a body on a GET, a multipart body without its image part, a model
//! response without a models path); the `Query` facade halts on them.
//! Runtime variants (serialization, transport) travel back to the caller
//! through the verb's `Result`.

use thiserror::Error;

use crate::endpoint::HttpMethod;

/// Errors produced while assembling, sending or decoding a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A body was attached to a method that must not carry one.
    #[error("body not allowed for {0} requests")]
    BodyNotAllowed(HttpMethod),

    /// Multipart and image bodies need the reserved image entry.
    #[error("missing image part: multipart body must contain an image part")]
    MissingImagePart,

    /// Plain text bodies need the reserved file data entry.
    #[error("missing file data: plain text body must contain a file data entry")]
    MissingFileData,

    /// An image part was built without one of its required fields.
    #[error("image part is missing its {0}")]
    IncompleteImagePart(&'static str),

    /// `ResponseType::ModelList` was selected without a models path.
    #[error("models path must be set")]
    MissingModelsPath,

    /// `ResponseType::ModelList` was selected on an endpoint without a model type.
    #[error("endpoint has no model type to build")]
    MissingModelType,

    /// The URL components do not form a valid URL.
    #[error("malformed url {url}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The body items could not be encoded for the declared content type.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The transport failed to deliver a response.
    #[error("transport error: {0}")]
    TransportError(String),
}

impl QueryError {
    /// Whether this error signals a misconfigured query rather than a
    /// runtime failure.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            QueryError::SerializationError(_) | QueryError::TransportError(_)
        )
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::SerializationError(err.to_string())
    }
}
