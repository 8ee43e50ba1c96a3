use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use stockroom_api::app::services::AppServices;
use stockroom_infra::ApplyMode;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(mode: ApplyMode) -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let app = stockroom_api::app::build_app(Arc::new(AppServices::in_memory(mode)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_item(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    quantity: i64,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/api/items", base_url))
        .json(&json!({ "name": name, "quantity": quantity }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn submit_checkout(
    client: &reqwest::Client,
    base_url: &str,
    item: &serde_json::Value,
    selected: i64,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/api/requests", base_url))
        .json(&json!({
            "user_id": "user-1",
            "purpose": "field work",
            "duration_days": 7,
            "lines": [{
                "id": item["id"],
                "name": item["name"],
                "image_url": null,
                "quantity": item["quantity"],
                "selected_quantity": selected,
            }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn set_status(
    client: &reqwest::Client,
    base_url: &str,
    collection: &str,
    request_id: &str,
    status: &str,
) -> reqwest::Response {
    client
        .patch(format!(
            "{}/api/{}/{}/status",
            base_url, collection, request_id
        ))
        .json(&json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

async fn item_quantity(client: &reqwest::Client, base_url: &str, id: i64) -> i64 {
    let res = client
        .get(format!("{}/api/items/{}", base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_crud_lifecycle() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    // Create
    let created = create_item(&client, &srv.base_url, "Multimeter", 12).await;
    assert_eq!(created["status"], "In Stock");
    let id = created["id"].as_i64().unwrap();

    // Read back
    let res = client
        .get(format!("{}/api/items/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["name"], "Multimeter");
    assert_eq!(fetched["quantity"], 12);

    // Patch quantity; status must follow the merged quantity.
    let res = client
        .patch(format!("{}/api/items/{}", srv.base_url, id))
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["quantity"], 3);
    assert_eq!(updated["status"], "Low Stock");
    assert_eq!(updated["name"], "Multimeter");

    // List contains it
    let res = client
        .get(format!("{}/api/items", srv.base_url))
        .send()
        .await
        .unwrap();
    let items: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(items.len(), 1);

    // Delete, then 404
    let res = client
        .delete(format!("{}/api/items/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client
        .get(format!("{}/api/items/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client
        .delete(format!("{}/api/items/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_item_id_is_bad_request() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/items/abc", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn create_item_validates_input() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/items", srv.base_url))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "name");

    let res = client
        .post(format!("{}/api/items", srv.base_url))
        .json(&json!({ "name": "Widget", "quantity": -4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_are_bad_request_with_envelope() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    // Missing required field.
    let res = client
        .post(format!("{}/api/items", srv.base_url))
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
    assert!(body["message"].is_string());

    // Wrong field type on patch.
    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let res = client
        .patch(format!("{}/api/items/{}", srv.base_url, item["id"]))
        .json(&json!({ "quantity": "lots" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    // Syntactically broken JSON.
    let res = client
        .post(format!("{}/api/requests", srv.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn unknown_status_value_is_bad_request() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let item_id = item["id"].as_i64().unwrap();
    let request = submit_checkout(&client, &srv.base_url, &item, 3).await;
    let request_id = request["request_id"].as_str().unwrap();

    let res = set_status(&client, &srv.base_url, "requests", request_id, "frobnicate").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    // Request untouched by the rejected decision.
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 5);
    let res = client
        .get(format!("{}/api/requests/{}", srv.base_url, request_id))
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["status"], "pending");
}

#[tokio::test]
async fn checkout_approval_deducts_and_guards_replay() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let item_id = item["id"].as_i64().unwrap();
    let request = submit_checkout(&client, &srv.base_url, &item, 3).await;
    assert_eq!(request["status"], "pending");
    let request_id = request["request_id"].as_str().unwrap();

    // Approve: 3 units leave stock.
    let res = set_status(&client, &srv.base_url, "requests", request_id, "approved").await;
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["request"]["status"], "approved");
    assert_eq!(outcome["lines"][0]["outcome"], "applied");
    assert_eq!(outcome["lines"][0]["new_quantity"], 2);
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 2);

    // Replay: conflict, no second deduction.
    let res = set_status(&client, &srv.base_url, "requests", request_id, "approved").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 2);
}

#[tokio::test]
async fn atomic_mode_rejects_shortage() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let item_id = item["id"].as_i64().unwrap();
    let request = submit_checkout(&client, &srv.base_url, &item, 8).await;
    let request_id = request["request_id"].as_str().unwrap();

    let res = set_status(&client, &srv.base_url, "requests", request_id, "approved").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    // Stock untouched, request still pending.
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 5);
    let res = client
        .get(format!("{}/api/requests/{}", srv.base_url, request_id))
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["status"], "pending");
}

#[tokio::test]
async fn best_effort_mode_approves_and_skips_short_lines() {
    let srv = TestServer::spawn(ApplyMode::BestEffort).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let item_id = item["id"].as_i64().unwrap();
    let request = submit_checkout(&client, &srv.base_url, &item, 8).await;
    let request_id = request["request_id"].as_str().unwrap();

    let res = set_status(&client, &srv.base_url, "requests", request_id, "approved").await;
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["request"]["status"], "approved");
    assert_eq!(outcome["lines"][0]["outcome"], "skipped");
    assert_eq!(outcome["lines"][0]["reason"], "insufficient_stock");
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 5);
}

#[tokio::test]
async fn return_approval_restocks() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Clamp", 1).await;
    let item_id = item["id"].as_i64().unwrap();

    let res = client
        .post(format!("{}/api/returns", srv.base_url))
        .json(&json!({
            "user_id": "user-2",
            "lines": [{
                "id": item_id,
                "name": "Clamp",
                "image_url": null,
                "quantity": 1,
                "selected_quantity": 4,
            }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let request: serde_json::Value = res.json().await.unwrap();
    let request_id = request["request_id"].as_str().unwrap();

    let res = set_status(&client, &srv.base_url, "returns", request_id, "approved").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 5);
}

#[tokio::test]
async fn decline_leaves_inventory_alone() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 5).await;
    let item_id = item["id"].as_i64().unwrap();
    let request = submit_checkout(&client, &srv.base_url, &item, 3).await;
    let request_id = request["request_id"].as_str().unwrap();

    let res = set_status(&client, &srv.base_url, "requests", request_id, "declined").await;
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["request"]["status"], "declined");
    assert!(outcome["lines"].as_array().unwrap().is_empty());
    assert_eq!(item_quantity(&client, &srv.base_url, item_id).await, 5);
}

#[tokio::test]
async fn status_listings_partition_requests() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let item = create_item(&client, &srv.base_url, "Drill", 50).await;
    let approved = submit_checkout(&client, &srv.base_url, &item, 1).await;
    let declined = submit_checkout(&client, &srv.base_url, &item, 1).await;
    let pending = submit_checkout(&client, &srv.base_url, &item, 1).await;

    set_status(
        &client,
        &srv.base_url,
        "requests",
        approved["request_id"].as_str().unwrap(),
        "approved",
    )
    .await;
    set_status(
        &client,
        &srv.base_url,
        "requests",
        declined["request_id"].as_str().unwrap(),
        "declined",
    )
    .await;

    let res = client
        .get(format!("{}/api/requests/pending", srv.base_url))
        .send()
        .await
        .unwrap();
    let records: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["request_id"], pending["request_id"]);

    // Processed = approved partition then declined partition.
    let res = client
        .get(format!("{}/api/requests/processed", srv.base_url))
        .send()
        .await
        .unwrap();
    let records: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["status"], "approved");
    assert_eq!(records[1]["status"], "declined");
}

#[tokio::test]
async fn submit_request_validates_lines() {
    let srv = TestServer::spawn(ApplyMode::Atomic).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/requests", srv.base_url))
        .json(&json!({ "user_id": "user-1", "lines": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .patch(format!("{}/api/requests/not-a-uuid/status", srv.base_url))
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = set_status(
        &client,
        &srv.base_url,
        "requests",
        "00000000-0000-0000-0000-000000000000",
        "approved",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
