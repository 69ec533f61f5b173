//! Declarative HTTP request building and response mapping.
//!
//! # Overview
//! Describe an API operation once with an `EndpointDescriptor`, configure a
//! `Query` with headers, path, query and body items, then call one of its
//! create/read/update/delete verbs. The query assembles a wire-correct
//! request, hands it to a host-supplied `Transport`, and decodes the bytes
//! that come back into raw data, text, a JSON value or a list of models.
//!
//! # Design
//! - The core never performs I/O: `Transport` is the only seam to the network,
//!   keeping request assembly and response decoding deterministic.
//! - Body serialization, request assembly and response decoding are pure
//!   functions over plain data (`body`, `request`, `response`), usable and
//!   testable without a `Query`.
//! - A `Query` owns its configuration; `ApiStore` clones store-wide defaults
//!   into each query it creates.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use restkit_core::{Configuration, ContentType, EndpointDescriptor, HttpMethod, Query, ResponseType, Transport};
//! # async fn example(transport: Arc<dyn Transport>) -> Result<(), restkit_core::QueryError> {
//! let config = Configuration::new("https", "api.example.com");
//! let endpoint = EndpointDescriptor::new("/1/classes/Task", ContentType::Json, HttpMethod::Get);
//! let mut query = Query::new(config, endpoint, transport);
//! query
//!     .set_header("Authorization", "token123")
//!     .set_query_item("limit", "10")
//!     .set_response_type(ResponseType::StructuredObject);
//! let decoded = query.read().await?;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod query;
pub mod request;
pub mod response;
pub mod store;

pub use body::{BodyValue, BoundarySource, ClockBoundary, FixedBoundary, ImagePart, FILE_KEY, IMAGE_KEY};
pub use config::{CachePolicy, CacheStoragePolicy, Configuration, ResponseType};
pub use endpoint::{ContentType, EndpointDescriptor, HttpMethod, Model, ModelType};
pub use error::QueryError;
pub use http::{AssembledRequest, Delivery, RawResponse, Transport};
pub use query::{Query, QueryDelegate, QueryResult, QueryState};
pub use response::DecodedResponse;
pub use store::ApiStore;
