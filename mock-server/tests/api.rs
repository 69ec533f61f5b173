use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Record, Results};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, content_type: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.to_string())
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- list ---

#[tokio::test]
async fn list_unknown_class_is_empty() {
    let resp = app().oneshot(empty("GET", "/1/classes/Task")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let results: Results = body_json(resp).await;
    assert!(results.results.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_from_form_returns_201_with_object_id() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/1/classes/Task",
            "application/x-www-form-urlencoded",
            "name=jorge",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: Record = body_json(resp).await;
    assert_eq!(record["name"], "jorge");
    assert!(record["objectId"].is_string());
}

#[tokio::test]
async fn create_from_json_keeps_nested_values() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/1/classes/Task",
            "application/json",
            r#"{"meta":{"priority":2}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: Record = body_json(resp).await;
    assert_eq!(record["meta"]["priority"], 2);
}

#[tokio::test]
async fn create_with_malformed_json_returns_422() {
    let resp = app()
        .oneshot(request("POST", "/1/classes/Task", "application/json", "[1]"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get / update / delete ---

#[tokio::test]
async fn get_unknown_record_returns_404() {
    let resp = app().oneshot(empty("GET", "/1/classes/Task/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_unknown_record_returns_404() {
    let resp = app()
        .oneshot(request("PUT", "/1/classes/Task/nope", "application/json", r#"{"a":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_record_returns_404() {
    let resp = app().oneshot(empty("DELETE", "/1/classes/Task/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- echo ---

#[tokio::test]
async fn echo_reports_headers_and_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .header(http::header::CONTENT_LENGTH, "5")
        .header(http::header::AUTHORIZATION, "token123")
        .body("hello".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.content_type.as_deref(), Some("text/plain"));
    assert_eq!(echo.content_length.as_deref(), Some("5"));
    assert_eq!(echo.authorization.as_deref(), Some("token123"));
    assert_eq!(echo.body, b"hello");
}

// --- full lifecycle ---

#[tokio::test]
async fn record_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request(
            "POST",
            "/1/classes/Task",
            "application/json",
            r#"{"title":"Walk dog"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Record = body_json(resp).await;
    let id = created["objectId"].as_str().unwrap().to_string();

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty("GET", "/1/classes/Task"))
        .await
        .unwrap();
    let results: Results = body_json(resp).await;
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0]["title"], "Walk dog");

    // update from a form, objectId is preserved
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request(
            "PUT",
            &format!("/1/classes/Task/{id}"),
            "application/x-www-form-urlencoded",
            "title=Walk+cat&objectId=forged",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Record = body_json(resp).await;
    assert_eq!(updated["title"], "Walk cat");
    assert_eq!(updated["objectId"], id.as_str());

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty("GET", &format!("/1/classes/Task/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Record = body_json(resp).await;
    assert_eq!(fetched["title"], "Walk cat");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty("DELETE", &format!("/1/classes/Task/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // list after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty("GET", "/1/classes/Task"))
        .await
        .unwrap();
    let results: Results = body_json(resp).await;
    assert!(results.results.is_empty());
}
