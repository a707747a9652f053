//! Integration tests for the mbrick-api HTTP endpoints
//!
//! The router runs over an in-memory SQLite database and an in-memory catalog,
//! so these tests cover routing, status mapping and the JSON contract end to
//! end without network access.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mbrick_api::db::Stores;
use mbrick_api::services::memory_catalog::{catalog_set, catalog_set_part, InMemoryCatalog};
use mbrick_api::{build_router, AppState};
use mbrick_common::db::init_memory_database;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a fresh database, with 75192-1 and 10497-1 in the catalog
async fn setup_app() -> (Router, Arc<InMemoryCatalog>) {
    let pool = init_memory_database().await.unwrap();

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_set(
        catalog_set("75192-1", "Millennium Falcon", 7541),
        vec![
            catalog_set_part("3001", 0, 4, false),
            catalog_set_part("3001", 72, 2, false),
            catalog_set_part("3023", 72, 12, true),
        ],
    );
    catalog.insert_set(
        catalog_set("10497-1", "Galaxy Explorer", 1254),
        vec![catalog_set_part("3001", 1, 6, false)],
    );

    let state = AppState::new(Stores::sqlite(pool), catalog.clone());
    (build_router(state), catalog)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request, returning status and parsed JSON body (Null when empty)
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

async fn create_set(app: &Router, set_num: &str) -> Value {
    let (status, body) = send(
        app,
        json_request("POST", "/api/v1/sets", json!({ "set_num": set_num })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

// =============================================================================
// Health and CORS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mbrick-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_options_short_circuits_with_204() {
    let (app, _) = setup_app().await;

    for uri in ["/api/v1/sets", "/api/v1/missing-parts", "/no/such/route"] {
        let response = app
            .clone()
            .oneshot(test_request("OPTIONS", uri))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{}", uri);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("DELETE"));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    }
}

#[tokio::test]
async fn test_cors_header_on_regular_response() {
    let (app, _) = setup_app().await;

    let request = Request::builder()
        .uri("/api/v1/sets")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// =============================================================================
// Sets
// =============================================================================

#[tokio::test]
async fn test_create_set_imports_parts() {
    let (app, _) = setup_app().await;

    let set = create_set(&app, "75192-1").await;
    assert_eq!(set["set_num"], "75192-1");
    assert_eq!(set["name"], "Millennium Falcon");
    assert_eq!(set["num_parts"], 7541);
    assert!(set["last_modified_dt"].as_str().unwrap().starts_with("2023-08-14"));
    assert!(set.get("deleted_at").is_none());

    let id = set["id"].as_i64().unwrap();
    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/with-parts", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set_num"], "75192-1");
    let set_parts = body["set_parts"].as_array().unwrap();
    assert_eq!(set_parts.len(), 3);
    assert_eq!(set_parts[0]["part"]["part_num"], "3001");
    assert_eq!(set_parts[0]["color_hex"], "C91A09");
    assert_eq!(set_parts[2]["is_spare"], true);

    let (status, body) = send(&app, test_request("GET", "/api/v1/parts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_duplicate_set_is_409() {
    let (app, _) = setup_app().await;
    create_set(&app, "75192-1").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/v1/sets", json!({ "set_num": "75192-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("75192-1"));
}

#[tokio::test]
async fn test_create_unknown_set_is_502() {
    let (app, _) = setup_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/v1/sets", json!({ "set_num": "00000-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_set_rejects_bad_bodies() {
    let (app, _) = setup_app().await;

    let (status, _) = send(&app, json_request("POST", "/api/v1/sets", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, json_request("POST", "/api/v1/sets", json!({ "set_num": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/sets")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_set_survives_part_list_failure() {
    let (app, catalog) = setup_app().await;
    catalog.fail_part_list("10497-1", true);

    let set = create_set(&app, "10497-1").await;

    let id = set["id"].as_i64().unwrap();
    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/parts", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["set_parts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_list_and_lookup_by_num() {
    let (app, _) = setup_app().await;
    let set = create_set(&app, "75192-1").await;
    create_set(&app, "10497-1").await;

    let (status, body) = send(&app, test_request("GET", "/api/v1/sets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sets"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}", set["id"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set_num"], "75192-1");

    let (status, body) = send(&app, test_request("GET", "/api/v1/sets/by-num/10497-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Galaxy Explorer");

    let (status, _) = send(&app, test_request("GET", "/api/v1/sets/by-num/1-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, test_request("GET", "/api/v1/sets/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, test_request("GET", "/api/v1/sets/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_update_set_keeps_set_num() {
    let (app, _) = setup_app().await;
    let set = create_set(&app, "75192-1").await;
    let uri = format!("/api/v1/sets/{}", set["id"]);

    let (status, body) = send(
        &app,
        json_request("PUT", &uri, json!({ "name": "UCS Falcon", "set_num": "1-1", "year": 2018 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "UCS Falcon");
    assert_eq!(body["year"], 2018);
    assert_eq!(body["set_num"], "75192-1");
    assert_eq!(body["num_parts"], 7541);

    let (status, _) = send(&app, json_request("PUT", "/api/v1/sets/999", json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_set() {
    let (app, _) = setup_app().await;
    let set = create_set(&app, "75192-1").await;
    let uri = format!("/api/v1/sets/{}", set["id"]);

    let (status, body) = send(&app, test_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Set deleted successfully");

    let (status, _) = send(&app, test_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, test_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The code can be used again
    create_set(&app, "75192-1").await;
}

#[tokio::test]
async fn test_sync_endpoint_creates_then_refreshes() {
    let (app, catalog) = setup_app().await;

    let (status, created) = send(
        &app,
        json_request("POST", "/api/v1/sets/sync", json!({ "set_num": "10497-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    catalog.insert_set(catalog_set("10497-1", "Galaxy Explorer 2022", 1255), vec![]);
    let (status, refreshed) = send(
        &app,
        json_request("POST", "/api/v1/sets/sync", json!({ "set_num": "10497-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["id"], created["id"]);
    assert_eq!(refreshed["name"], "Galaxy Explorer 2022");
}

#[tokio::test]
async fn test_sync_parts_replaces_list() {
    let (app, catalog) = setup_app().await;
    let set = create_set(&app, "10497-1").await;
    let id = set["id"].as_i64().unwrap();

    catalog.set_parts(
        "10497-1",
        vec![
            catalog_set_part("3001", 1, 6, false),
            catalog_set_part("3069b", 15, 4, false),
        ],
    );

    // No body: the set's own code is used
    let (status, body) = send(&app, test_request("POST", &format!("/api/v1/sets/{}/sync-parts", id))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/parts", id))).await;
    assert_eq!(body["set_parts"].as_array().unwrap().len(), 2);

    // Explicit code from the body
    let (status, _) = send(
        &app,
        json_request("POST", &format!("/api/v1/sets/{}/sync-parts", id), json!({ "set_num": "75192-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/parts", id))).await;
    assert_eq!(body["set_parts"].as_array().unwrap().len(), 3);

    // Catalog failure keeps current rows
    catalog.fail_part_list("10497-1", true);
    let (status, _) = send(&app, test_request("POST", &format!("/api/v1/sets/{}/sync-parts", id))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/parts", id))).await;
    assert_eq!(body["set_parts"].as_array().unwrap().len(), 3);
}

// =============================================================================
// Missing parts
// =============================================================================

/// Create 75192-1 and return (set id, set part ids)
async fn set_with_parts(app: &Router) -> (i64, Vec<i64>) {
    let set = create_set(app, "75192-1").await;
    let id = set["id"].as_i64().unwrap();
    let (_, body) = send(app, test_request("GET", &format!("/api/v1/sets/{}/parts", id))).await;
    let set_part_ids = body["set_parts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|sp| sp["id"].as_i64().unwrap())
        .collect();
    (id, set_part_ids)
}

#[tokio::test]
async fn test_assign_missing_parts() {
    let (app, _) = setup_app().await;
    let (set_id, sp) = set_with_parts(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/missing-parts",
            json!({
                "set_id": set_id,
                "part_requests": [
                    { "set_part_id": sp[0] },
                    { "set_part_id": sp[2], "quantity": 5 }
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let created = body.as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["quantity"], 4);
    assert_eq!(created[0]["is_missing"], true);
    assert_eq!(created[0]["notes"], "");
    assert_eq!(created[1]["quantity"], 5);
    assert_eq!(created[1]["color_id"], 72);

    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/missing-parts/{}", set_id))).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["part"]["part_num"], "3001");

    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/sets/{}/missing-parts", set_id))).await;
    assert_eq!(body["set_num"], "75192-1");
    assert_eq!(body["missing_parts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_assign_rejects_excess_quantity_without_writing() {
    let (app, _) = setup_app().await;
    let (set_id, sp) = set_with_parts(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/missing-parts",
            json!({
                "set_id": set_id,
                "part_requests": [
                    { "set_part_id": sp[0], "quantity": 1 },
                    { "set_part_id": sp[1], "quantity": 3 }
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds"));

    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/missing-parts/{}", set_id))).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_assign_error_statuses() {
    let (app, _) = setup_app().await;
    let (set_id, sp) = set_with_parts(&app).await;
    let other = create_set(&app, "10497-1").await;

    let cases = [
        (json!({ "set_id": set_id, "part_requests": [{ "set_part_id": 9999 }] }), StatusCode::NOT_FOUND),
        (json!({ "set_id": other["id"], "part_requests": [{ "set_part_id": sp[0] }] }), StatusCode::BAD_REQUEST),
        (json!({ "set_id": set_id, "part_requests": [{ "set_part_id": sp[0], "quantity": 0 }] }), StatusCode::BAD_REQUEST),
        (json!({ "set_id": set_id, "part_requests": [] }), StatusCode::BAD_REQUEST),
        (json!({ "part_requests": [{ "set_part_id": sp[0] }] }), StatusCode::BAD_REQUEST),
    ];

    for (body, expected) in cases {
        let (status, _) = send(&app, json_request("POST", "/api/v1/missing-parts", body.clone())).await;
        assert_eq!(status, expected, "{}", body);
    }
}

#[tokio::test]
async fn test_found_missing_and_delete_flow() {
    let (app, _) = setup_app().await;
    let (set_id, sp) = set_with_parts(&app).await;

    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/missing-parts",
            json!({ "set_id": set_id, "part_requests": [{ "set_part_id": sp[0] }, { "set_part_id": sp[0] }] }),
        ),
    )
    .await;
    let id = body[0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, test_request("PUT", &format!("/api/v1/missing-parts/{}/found", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (_, body) = send(
        &app,
        test_request("GET", &format!("/api/v1/missing-parts/{}?missing_only=true", set_id)),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, test_request("PUT", &format!("/api/v1/missing-parts/{}/missing", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, test_request("DELETE", &format!("/api/v1/missing-parts/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, test_request("GET", &format!("/api/v1/missing-parts/{}", set_id))).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, test_request("PUT", &format!("/api/v1/missing-parts/{}/found", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Parts and set parts
// =============================================================================

#[tokio::test]
async fn test_parts_search_and_get() {
    let (app, _) = setup_app().await;
    create_set(&app, "75192-1").await;

    let (status, body) = send(&app, test_request("GET", "/api/v1/parts?q=302")).await;
    assert_eq!(status, StatusCode::OK);
    let parts = body["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0]["part_num"], "3023");
    assert_eq!(parts[0]["external_ids"], r#"{"BrickLink":["3023"]}"#);

    let id = parts[0]["id"].as_i64().unwrap();
    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/parts/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Part 3023");

    let (status, _) = send(&app, test_request("GET", "/api/v1/parts/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_set_part_create_and_delete() {
    let (app, _) = setup_app().await;
    let set = create_set(&app, "10497-1").await;
    let set_id = set["id"].as_i64().unwrap();
    let (_, body) = send(&app, test_request("GET", "/api/v1/parts")).await;
    let part_id = body["parts"][0]["id"].as_i64().unwrap();

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/set-parts",
            json!({ "set_id": set_id, "part_id": part_id, "color_id": 0, "quantity": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["color_name"], "");
    assert_eq!(created["is_spare"], false);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/set-parts",
            json!({ "set_id": set_id, "part_id": part_id, "color_id": 0, "quantity": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/set-parts",
            json!({ "set_id": 9999, "part_id": part_id, "color_id": 0, "quantity": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/set-parts/{}", created["id"]);
    let (status, _) = send(&app, test_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, test_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
