//! In-memory REST object store used to exercise the query core over real HTTP.
//!
//! Records are JSON objects grouped by class under `/1/classes/{class}`.
//! Bodies may be JSON or URL-encoded forms. `/echo` reports what it received.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub type Record = Map<String, Value>;

pub type Db = Arc<RwLock<HashMap<String, Vec<Record>>>>;

/// Envelope returned by list requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct Results {
    pub results: Vec<Record>,
}

/// What `/echo` saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub authorization: Option<String>,
    pub body_len: usize,
    pub body: Vec<u8>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/1/classes/{class}", get(list_records).post(create_record))
        .route(
            "/1/classes/{class}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Decode a JSON object or URL-encoded form body into a record.
pub fn parse_fields(headers: &HeaderMap, body: &[u8]) -> Option<Record> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return Some(
            url::form_urlencoded::parse(body)
                .into_owned()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        );
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

async fn list_records(State(db): State<Db>, Path(class): Path<String>) -> Json<Results> {
    let db = db.read().await;
    Json(Results {
        results: db.get(&class).cloned().unwrap_or_default(),
    })
}

async fn create_record(
    State(db): State<Db>,
    Path(class): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), StatusCode> {
    let mut record = parse_fields(&headers, &body).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let id = Uuid::new_v4().to_string();
    record.insert("objectId".to_string(), Value::String(id.clone()));
    debug!(%class, %id, "created record");
    db.write()
        .await
        .entry(class)
        .or_default()
        .push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
) -> Result<Json<Record>, StatusCode> {
    let db = db.read().await;
    db.get(&class)
        .and_then(|records| records.iter().find(|r| has_id(r, &id)))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_record(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Record>, StatusCode> {
    let fields = parse_fields(&headers, &body).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let mut db = db.write().await;
    let record = db
        .get_mut(&class)
        .and_then(|records| records.iter_mut().find(|r| has_id(r, &id)))
        .ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in fields {
        if key != "objectId" {
            record.insert(key, value);
        }
    }
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
) -> StatusCode {
    let mut db = db.write().await;
    let Some(records) = db.get_mut(&class) else {
        return StatusCode::NOT_FOUND;
    };
    let before = records.len();
    records.retain(|r| !has_id(r, &id));
    if records.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(Echo {
        method: method.to_string(),
        content_type: header_value(header::CONTENT_TYPE),
        content_length: header_value(header::CONTENT_LENGTH),
        authorization: header_value(header::AUTHORIZATION),
        body_len: body.len(),
        body: body.to_vec(),
    })
}

fn has_id(record: &Record, id: &str) -> bool {
    record.get("objectId").and_then(Value::as_str) == Some(id)
}
