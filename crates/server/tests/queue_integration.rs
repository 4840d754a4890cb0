use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::sleep;

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a config with database path
fn config_with_db(port: u16, db_path: &str) -> String {
    format!(
        r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        port, db_path
    )
}

/// Create a config with API key auth on the staff routes
fn config_with_api_key(port: u16, db_path: &str, api_key: &str) -> String {
    format!(
        r#"
[auth]
method = "api_key"
api_key = "{}"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        api_key, port, db_path
    )
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_figaro"))
        .env("FIGARO_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Helper to start a server for testing
async fn start_test_server() -> (u16, tokio::process::Child, TempDir) {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let server = spawn_server(temp_file.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    // Give a moment for initialization
    sleep(Duration::from_millis(100)).await;

    (port, server, temp_dir)
}

fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api/v1", port)
}

async fn join(client: &Client, port: u16, name: &str, phone: &str, services: &[&str]) -> Value {
    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": name,
            "phone_number": phone,
            "services": services,
        }))
        .send()
        .await
        .expect("Failed to send join request");

    assert_eq!(response.status(), 201, "join should succeed");
    response.json().await.expect("Failed to parse JSON")
}

#[tokio::test]
async fn test_join_returns_receipt() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Alice",
            "phone_number": "+15551230001",
            "services": ["Haircut"],
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let receipt: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(receipt["queue_number"], 1);
    assert_eq!(receipt["position"], 1);
    assert_eq!(receipt["estimated_wait_minutes"], 0);
    assert_eq!(receipt["price"], 120);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_second_join_waits_behind_the_first() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;
    let bob = join(&client, port, "Bob", "+15551230002", &["Haircut"]).await;

    assert_eq!(bob["queue_number"], 2);
    assert_eq!(bob["position"], 2);
    // One 30-minute haircut ahead of him
    assert_eq!(bob["estimated_wait_minutes"], 30);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_priority_join_pays_the_surcharge() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let response = Client::new()
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Vip",
            "phone_number": "+15551230009",
            "services": ["Haircut"],
            "is_priority": true,
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let receipt: Value = response.json().await.unwrap();
    assert_eq!(receipt["price"], 220);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_duplicate_join_is_rejected_with_existing_ticket() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;

    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Alice again",
            "phone_number": "+15551230001",
            "services": ["Facial"],
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["queue_number"], 1);
    assert_eq!(body["position"], 1);
    assert!(body["error"].as_str().unwrap().contains("already"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_join_requires_name_and_services() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();

    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "   ",
            "phone_number": "+15551230001",
            "services": ["Haircut"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Alice",
            "phone_number": "+15551230001",
            "services": [],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_position_lookup() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;
    join(&client, port, "Bob", "+15551230002", &["Facial"]).await;

    let response = client
        .get(format!("{}/queue/position/+15551230002", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["queue_number"], 2);
    assert_eq!(view["customer_name"], "Bob");
    assert_eq!(view["position"], 2);
    assert_eq!(view["status"], "waiting");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_position_unknown_phone_is_404() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let response = Client::new()
        .get(format!("{}/queue/position/+15559999999", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_serving_then_complete_flow() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;

    let response = client
        .patch(format!("{}/queue/serving/1", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let ticket: Value = response.json().await.unwrap();
    assert_eq!(ticket["status"], "serving");
    assert!(ticket["served_at"].is_string());

    let response = client
        .patch(format!("{}/queue/complete/1", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let ticket: Value = response.json().await.unwrap();
    assert_eq!(ticket["status"], "completed");

    // Completed tickets no longer show up in position lookups
    let response = client
        .get(format!("{}/queue/position/+15551230001", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_serving_unknown_number_is_404() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let response = Client::new()
        .patch(format!("{}/queue/serving/42", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_completion_rebuilds_wait_estimates() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;
    join(&client, port, "Bob", "+15551230002", &["Haircut"]).await;
    join(&client, port, "Carol", "+15551230003", &["Haircut"]).await;

    client
        .patch(format!("{}/queue/serving/1", base_url(port)))
        .send()
        .await
        .unwrap();
    let response = client
        .patch(format!("{}/queue/complete/1", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The rebuild happens in the background, so poll for it
    let mut bob_estimate = None;
    for _ in 0..100 {
        let view: Value = client
            .get(format!("{}/queue/position/+15551230002", base_url(port)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if view["estimated_wait_minutes"] == 15 {
            bob_estimate = Some(view);
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }

    let bob = bob_estimate.expect("Bob's estimate was never rebuilt");
    assert_eq!(bob["position"], 1);

    let carol: Value = client
        .get(format!("{}/queue/position/+15551230003", base_url(port)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(carol["estimated_wait_minutes"], 30);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_cancel_removes_the_ticket() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;

    let response = client
        .delete(format!("{}/queue/cancel/+15551230001", base_url(port)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let ticket: Value = response.json().await.unwrap();
    assert_eq!(ticket["status"], "cancelled");

    // Nothing left to cancel
    let response = client
        .delete(format!("{}/queue/cancel/+15551230001", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_closed_shop_rejects_joins() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();

    let response = client
        .post(format!("{}/queue/shop-status", base_url(port)))
        .json(&json!({ "is_open": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["is_open"], false);
    assert_eq!(status["last_updated_by"], "anonymous");

    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Alice",
            "phone_number": "+15551230001",
            "services": ["Haircut"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // The public gate endpoint reflects it
    let status: Value = client
        .get(format!("{}/queue/shop-status", base_url(port)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["is_open"], false);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_stats_mask_customer_names() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "John Doe", "+15551230001", &["Haircut"]).await;

    let stats: Value = client
        .get(format!("{}/queue/stats", base_url(port)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["active_count"], 1);
    assert_eq!(stats["waiting_count"], 1);
    assert_eq!(stats["is_open"], true);
    assert_eq!(stats["active"][0]["customer_name"], "John D.");
    assert_eq!(stats["active"][0]["services"], "Haircut");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_dashboard_lists_todays_tickets() {
    let (port, mut server, _temp_dir) = start_test_server().await;

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;
    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Vip",
            "phone_number": "+15551230002",
            "services": ["Haircut"],
            "is_priority": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    client
        .patch(format!("{}/queue/serving/1", base_url(port)))
        .send()
        .await
        .unwrap();
    client
        .patch(format!("{}/queue/complete/1", base_url(port)))
        .send()
        .await
        .unwrap();

    let dashboard: Value = client
        .get(format!("{}/queue/active", base_url(port)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(dashboard["tickets"].as_array().unwrap().len(), 2);
    // Priority customers sort first for staff
    assert_eq!(dashboard["tickets"][0]["customer_name"], "Vip");
    assert_eq!(dashboard["served_count"], 1);
    assert_eq!(dashboard["total_earnings"], 120);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_staff_routes_require_api_key() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_content = config_with_api_key(port, db_path.to_str().unwrap(), "barber-secret");

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();

    // Customers join without credentials
    let response = client
        .post(format!("{}/queue/join", base_url(port)))
        .json(&json!({
            "customer_name": "Alice",
            "phone_number": "+15551230001",
            "services": ["Haircut"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Staff dashboard does not open without the key
    let response = client
        .get(format!("{}/queue/active", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/queue/active", base_url(port)))
        .header("Authorization", "Bearer wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/queue/active", base_url(port)))
        .header("Authorization", "Bearer barber-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The gate records who flipped it
    let response = client
        .post(format!("{}/queue/shop-status", base_url(port)))
        .header("Authorization", "Bearer barber-secret")
        .json(&json!({ "is_open": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["last_updated_by"], "staff");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_tickets_survive_a_restart() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    join(&client, port, "Alice", "+15551230001", &["Haircut"]).await;

    server.kill().await.ok();
    sleep(Duration::from_millis(100)).await;

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not restart in time"
    );

    let response = client
        .get(format!("{}/queue/position/+15551230001", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["queue_number"], 1);

    // Numbering continues from where it left off
    let bob = join(&client, port, "Bob", "+15551230002", &["Haircut"]).await;
    assert_eq!(bob["queue_number"], 2);

    server.kill().await.ok();
}
