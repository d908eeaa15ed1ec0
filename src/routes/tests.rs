use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{cors_layer, router, AppState};
use crate::auth::PasswordHasher;
use crate::db::MemoryStore;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "s3cret-pass";

fn test_app(static_dir: &Path) -> Router {
    let hasher = PasswordHasher::with_params(1024, 1, 1).unwrap();
    let hash = hasher.hash(ADMIN_PASSWORD).unwrap();
    let store = MemoryStore::new().with_admin(ADMIN_EMAIL, hash);

    router(
        AppState {
            store: Arc::new(store),
            hasher,
        },
        static_dir,
    )
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn quotation_body() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@example.com",
        "gender": "female",
        "domain": "Biology",
        "date": "2024-10-05",
        "total": 1500,
        "totalDiscount": 250,
        "finalAmount": 1250,
        "totalService": 3,
        "inputCount": 3,
        "services": [
            { "service": "Editing", "price": 500, "discount": 50, "grandTotal": 450 },
            { "service": "Review", "price": 500, "discount": 100, "grandTotal": 400 },
            { "service": "Formatting", "price": "500", "discount": "100", "grandTotal": "400" }
        ],
        "installments": [
            { "label": "Advance", "dueWhen": "On signing", "installmentAmount": 625 },
            { "label": "Final", "dueWhen": "On delivery", "installmentAmount": 625 }
        ]
    })
}

#[tokio::test]
async fn login_accepts_the_admin_password() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["LoginStatus"], true);
    assert_eq!(body["message"], "Login successful.");
}

#[tokio::test]
async fn login_rejects_bad_or_missing_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["LoginStatus"], false);
    assert_eq!(body["Error"], "Invalid email or password.");

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "email": "nobody@example.com", "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "email": ADMIN_EMAIL, "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["Error"], "Email and password are required.");
}

#[tokio::test]
async fn create_then_list_and_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send(&app, Method::POST, "/create", Some(quotation_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quotationId"], 1);
    assert_eq!(body["services"], 3);
    assert_eq!(body["installments"], 2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/create",
        Some(json!({ "name": "No children" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quotationId"], 2);

    let (status, list) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["name"], "Jane Doe");
    assert_eq!(list[0]["totalServices"], 3);
    assert_eq!(list[0]["totalInstallment"], 2);
    assert_eq!(list[1]["name"], "No children");
    assert_eq!(list[1]["services"], json!([]));

    let (status, detail) = send(&app, Method::GET, "/pdf/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["date"], "2024-10-05");
    assert_eq!(detail["finalAmount"], 1250.0);
    assert_eq!(detail["services"][2]["serviceName"], "Formatting");
    assert_eq!(detail["services"][2]["price"], 500.0);
    assert_eq!(detail["installments"][1]["dueWhen"], "On delivery");
}

#[tokio::test]
async fn update_reconciles_services_and_installments() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let (_, before) = send(&app, Method::GET, "/pdf/1", None).await;
    let first_service = before["services"][0]["id"].as_i64().unwrap();
    let first_installment = before["installments"][0]["id"].as_i64().unwrap();

    let mut body = quotation_body();
    body["name"] = json!("Jane Smith");
    body["services"] = json!([
        { "id": first_service, "service": "Editing (extended)", "price": 800, "discount": 0, "grandTotal": 800 },
        { "service": "Indexing", "price": 100, "discount": 0, "grandTotal": 100 }
    ]);
    body["installments"] = json!([
        { "id": first_installment, "label": "Advance", "dueWhen": "Today", "installmentAmount": 450 }
    ]);

    let (status, outcome) = send(&app, Method::PUT, "/update/1", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["quotationId"], 1);
    assert_eq!(
        outcome["services"],
        json!({ "deleted": 2, "inserted": 1, "updated": 1 })
    );
    assert_eq!(
        outcome["installments"],
        json!({ "deleted": 1, "inserted": 0, "updated": 1 })
    );

    let (_, after) = send(&app, Method::GET, "/pdf/1", None).await;
    assert_eq!(after["name"], "Jane Smith");
    assert_eq!(after["totalServices"], 2);
    assert_eq!(after["services"][0]["id"], first_service);
    assert_eq!(after["services"][0]["serviceName"], "Editing (extended)");
    assert_eq!(after["services"][1]["serviceName"], "Indexing");
    assert_eq!(after["installments"][0]["id"], first_installment);
    assert_eq!(after["installments"][0]["dueWhen"], "Today");
}

#[tokio::test]
async fn update_without_row_ids_replaces_children() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let (status, outcome) = send(&app, Method::PUT, "/update/1", Some(quotation_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        outcome["services"],
        json!({ "deleted": 3, "inserted": 3, "updated": 0 })
    );
    let (_, after) = send(&app, Method::GET, "/pdf/1", None).await;
    assert_eq!(after["services"][0]["id"], 4);
}

#[tokio::test]
async fn update_rejects_bad_input_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let mut body = quotation_body();
    body["name"] = json!("Changed");
    body["services"] = json!([{ "id": 1 }, { "id": 1 }]);
    let (status, error) = send(&app, Method::PUT, "/update/1", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "services");

    let mut body = quotation_body();
    body["installments"] = json!([{ "installmentAmount": "lots" }]);
    let (status, error) = send(&app, Method::PUT, "/update/1", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "installments[0].installmentAmount");

    let mut body = quotation_body();
    body["services"] = json!([{ "service": "Editing", "price": true }]);
    let (status, error) = send(&app, Method::PUT, "/update/1", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");
    assert_eq!(error["field"], "services[0].price");

    let (_, after) = send(&app, Method::GET, "/pdf/1", None).await;
    assert_eq!(after["name"], "Jane Doe");
    assert_eq!(after["totalServices"], 3);
}

#[tokio::test]
async fn create_rejects_wrongly_typed_values() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let mut body = quotation_body();
    body["installments"] = json!({ "label": "Advance" });
    let (status, error) = send(&app, Method::POST, "/create", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], "installments");

    let (_, list) = send(&app, Method::GET, "/", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn update_with_an_unowned_id_adds_a_new_row() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let mut body = quotation_body();
    body["services"] = json!([{ "id": 2147483647, "service": "Edge", "price": 1 }]);
    let (status, outcome) = send(&app, Method::PUT, "/update/1", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        outcome["services"],
        json!({ "deleted": 3, "inserted": 1, "updated": 0 })
    );

    body["services"] = json!([{ "service": "Fresh", "price": 2 }]);
    let (status, _) = send(&app, Method::PUT, "/update/1", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = send(&app, Method::GET, "/pdf/1", None).await;
    assert_eq!(after["services"][0]["id"], 5);
    assert_eq!(after["services"][0]["serviceName"], "Fresh");
}

#[tokio::test]
async fn missing_quotations_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send(&app, Method::PUT, "/update/42", Some(quotation_body())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Quotation not found");

    let (status, _) = send(&app, Method::GET, "/pdf/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/delete/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_quotation_and_children() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let (status, body) = send(&app, Method::DELETE, "/delete/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Quotation, installments, and services deleted successfully"
    );

    let (_, list) = send(&app, Method::GET, "/", None).await;
    assert_eq!(list, json!([]));
    let (status, _) = send(&app, Method::DELETE, "/delete/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pdf_renders_markdown_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    send(&app, Method::POST, "/create", Some(quotation_body())).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/pdf/1?format=markdown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let markdown = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(markdown.contains("# Quotation #1"));
    assert!(markdown.contains("| Editing | 500.00 | 50.00 | 450.00 |"));
}

#[tokio::test]
async fn unknown_paths_fall_back_to_the_front_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>app shell</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
    let app = test_app(dir.path());

    let (status, bytes) = send_raw(&app, Method::GET, "/app.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"console.log('hi');");

    let (status, bytes) = send_raw(&app, Method::GET, "/dashboard/quotes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"<html>app shell</html>");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).layer(cors_layer(&["https://quotes.example.com".to_string()]));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/update/1")
                .header(header::ORIGIN, "https://quotes.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://quotes.example.com"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}
