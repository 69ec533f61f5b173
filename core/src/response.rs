//! Response decoding into the shape selected by `ResponseType`.
//!
//! # Design
//! One decode function per response type, selected by a `match`. Decoding
//! never fails on malformed payloads: bytes that do not fit the requested
//! shape yield `Ok(None)`, and structured objects fall back to text. The only
//! errors are preconditions of `ModelList` (models path and model type).

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::config::ResponseType;
use crate::endpoint::{Model, ModelType};
use crate::error::QueryError;

/// Result of decoding one response.
pub enum DecodedResponse {
    Data(Vec<u8>),
    Text(String),
    Object(Value),
    Models(Vec<Box<dyn Model>>),
}

impl DecodedResponse {
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            DecodedResponse::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Value> {
        match self {
            DecodedResponse::Object(value) => Some(value),
            _ => None,
        }
    }

    /// The decoded models that are of type `T`, in source order.
    pub fn models<T: Model>(&self) -> Vec<&T> {
        match self {
            DecodedResponse::Models(models) => models
                .iter()
                .filter_map(|model| model.as_any().downcast_ref::<T>())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for DecodedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedResponse::Data(data) => write!(f, "Data({} bytes)", data.len()),
            DecodedResponse::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DecodedResponse::Object(value) => f.debug_tuple("Object").field(value).finish(),
            DecodedResponse::Models(models) => f.debug_tuple("Models").field(models).finish(),
        }
    }
}

/// Decode `bytes` according to `response_type`.
///
/// `models_path` and `model_type` are only consulted for
/// `ResponseType::ModelList`.
pub fn decode(
    response_type: ResponseType,
    models_path: &str,
    model_type: Option<&ModelType>,
    bytes: &[u8],
) -> Result<Option<DecodedResponse>, QueryError> {
    match response_type {
        ResponseType::RawData => Ok(Some(DecodedResponse::Data(bytes.to_vec()))),
        ResponseType::String => Ok(text(bytes).map(DecodedResponse::Text)),
        ResponseType::StructuredObject => Ok(structured(bytes)),
        ResponseType::ModelList => {
            if models_path.is_empty() {
                return Err(QueryError::MissingModelsPath);
            }
            let model_type = model_type.ok_or(QueryError::MissingModelType)?;
            Ok(models(models_path, model_type, bytes).map(DecodedResponse::Models))
        }
    }
}

fn text(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

fn structured(bytes: &[u8]) -> Option<DecodedResponse> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Some(DecodedResponse::Object(value)),
        Err(_) => text(bytes).map(DecodedResponse::Text),
    }
}

fn models(path: &str, model_type: &ModelType, bytes: &[u8]) -> Option<Vec<Box<dyn Model>>> {
    let root: Value = serde_json::from_slice(bytes).ok()?;
    if !root.is_object() {
        return None;
    }
    let Some(records) = value_at_path(&root, path).and_then(Value::as_array) else {
        warn!(path, "models path does not resolve to an array");
        return None;
    };

    let mut decoded = Vec::with_capacity(records.len());
    for record in records {
        match record.as_object() {
            Some(fields) => {
                let mut model = model_type.instantiate();
                model.fill(fields);
                decoded.push(model);
            }
            None => warn!(path, "skipping record that is not an object"),
        }
    }
    Some(decoded)
}

/// Follow a dot-delimited path of object keys.
pub fn value_at_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |value, key| value.as_object()?.get(key))
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use serde_json::{json, Map};

    use super::*;

    #[derive(Debug, Default)]
    struct Record {
        id: String,
    }

    impl Model for Record {
        fn fill(&mut self, fields: &Map<String, Value>) {
            if let Some(Value::String(id)) = fields.get("id") {
                self.id = id.clone();
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn record_type() -> ModelType {
        ModelType::of::<Record>()
    }

    #[test]
    fn raw_data_is_returned_unchanged() {
        let decoded = decode(ResponseType::RawData, "", None, &[0, 159, 146, 150]).unwrap().unwrap();
        assert_eq!(decoded.as_data(), Some(&[0u8, 159, 146, 150][..]));
    }

    #[test]
    fn string_decodes_utf8() {
        let decoded = decode(ResponseType::String, "", None, "héllo".as_bytes()).unwrap().unwrap();
        assert_eq!(decoded.as_text(), Some("héllo"));
    }

    #[test]
    fn string_with_invalid_utf8_is_absent() {
        assert!(decode(ResponseType::String, "", None, &[0xff, 0xfe]).unwrap().is_none());
    }

    #[test]
    fn structured_object_parses_json() {
        let decoded = decode(ResponseType::StructuredObject, "", None, br#"{"a":[1,2]}"#).unwrap().unwrap();
        assert_eq!(decoded.as_object(), Some(&json!({"a": [1, 2]})));
    }

    #[test]
    fn structured_object_is_idempotent() {
        let bytes = br#"{"results":[{"id":"1"}],"count":1}"#;
        let first = decode(ResponseType::StructuredObject, "", None, bytes).unwrap().unwrap();
        let second = decode(ResponseType::StructuredObject, "", None, bytes).unwrap().unwrap();
        assert_eq!(first.as_object(), second.as_object());
    }

    #[test]
    fn structured_object_falls_back_to_text() {
        let decoded = decode(ResponseType::StructuredObject, "", None, b"not json").unwrap().unwrap();
        assert_eq!(decoded.as_text(), Some("not json"));
    }

    #[test]
    fn model_list_builds_models_in_order() {
        let bytes = br#"{"results":[{"id":"1"},{"id":"2"}]}"#;
        let decoded = decode(ResponseType::ModelList, "results", Some(&record_type()), bytes)
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = decoded.models::<Record>().into_iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn model_list_follows_nested_path() {
        let bytes = br#"{"data":{"page":{"items":[{"id":"a"}]}}}"#;
        let decoded = decode(ResponseType::ModelList, "data.page.items", Some(&record_type()), bytes)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.models::<Record>()[0].id, "a");
    }

    #[test]
    fn model_list_without_array_is_absent() {
        let bytes = br#"{"results":{"id":"1"}}"#;
        assert!(decode(ResponseType::ModelList, "results", Some(&record_type()), bytes).unwrap().is_none());
        assert!(decode(ResponseType::ModelList, "missing", Some(&record_type()), bytes).unwrap().is_none());
        assert!(decode(ResponseType::ModelList, "results", Some(&record_type()), b"[]").unwrap().is_none());
        assert!(decode(ResponseType::ModelList, "results", Some(&record_type()), b"oops").unwrap().is_none());
    }

    #[test]
    fn model_list_requires_models_path() {
        let err = decode(ResponseType::ModelList, "", Some(&record_type()), b"{}").unwrap_err();
        assert!(matches!(err, QueryError::MissingModelsPath));
        assert_eq!(err.to_string(), "models path must be set");
    }

    #[test]
    fn model_list_requires_model_type() {
        let err = decode(ResponseType::ModelList, "results", None, b"{}").unwrap_err();
        assert!(matches!(err, QueryError::MissingModelType));
    }

    #[test]
    fn value_at_path_walks_objects() {
        let root = json!({"a": {"b": {"c": 1}}});
        assert_eq!(value_at_path(&root, "a.b.c"), Some(&json!(1)));
        assert_eq!(value_at_path(&root, "a.x"), None);
    }
}
