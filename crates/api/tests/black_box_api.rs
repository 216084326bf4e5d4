use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::post, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};

use ridepool_api::app::{build_app, services::AppServices};
use ridepool_api::config::Settings;
use ridepool_api::middleware::{self, Controller};
use ridepool_infra::{InMemoryUserService, StaticDistanceService};
use ridepool_observability::{Category, Interceptable, MemorySink, Severity};

struct TestServer {
    base_url: String,
    sink: Arc<MemorySink>,
    handle: tokio::task::JoinHandle<()>,
}

/// Stand-in for a credentials endpoint; its payload must never be logged.
struct LoginController;

impl Interceptable for LoginController {
    fn target(&self) -> &str {
        "LoginController"
    }
}

impl Controller for LoginController {
    fn routes(self: Arc<Self>) -> Router {
        Router::new().route("/login", post(|body: String| async move { body.len().to_string() }))
    }
}

fn distances() -> StaticDistanceService {
    StaticDistanceService::new()
        .with_route("Herndon, VA", "1 Near St Reston, VA", 2_000)
        .with_route("Herndon, VA", "9 Far Rd Leesburg, VA", 30_000)
        .with_route("Herndon, VA", "5 Mid Ave Vienna, VA", 12_000)
}

impl TestServer {
    async fn spawn() -> Self {
        let sink = Arc::new(MemorySink::new());
        let services = AppServices::compose(
            sink.clone(),
            &Settings::default(),
            InMemoryUserService::new(),
            distances(),
        )
        .expect("default settings are valid");

        // Same router as prod, plus a sensitive controller, on an ephemeral port.
        let app = build_app(&services).merge(middleware::intercepted(
            Arc::new(LoginController),
            services.interceptor.clone(),
            services.body_limit,
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url,
            sink,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn user_body(user_name: &str, is_driver: bool, street: &str, city: &str) -> Value {
    json!({
        "userName": user_name,
        "batch": { "batchNumber": 2004, "batchLocation": "Reston" },
        "firstName": "Alex",
        "lastName": "Morgan",
        "email": format!("{user_name}@example.com"),
        "phoneNumber": "703-555-0100",
        "isDriver": is_driver,
        "isActive": true,
        "isAcceptingRides": is_driver,
        "hAddress": { "street": street, "city": city, "state": "VA", "zip": "20190" }
    })
}

async fn create_user(client: &reqwest::Client, server: &TestServer, body: &Value) -> Value {
    let res = client
        .post(server.url("/users"))
        .json(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_not_intercepted() {
    let server = TestServer::spawn().await;

    let res = reqwest::get(server.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(server.sink.is_empty());
}

#[tokio::test]
async fn create_logs_access_payload_and_timing() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let body = user_body("alex", false, "1 Near St", "Reston");

    let created = create_user(&client, &server, &body).await;
    assert_eq!(created["userId"], 1);
    assert_eq!(created["userName"], "alex");
    assert_eq!(created["batch"]["batchLocation"], "Reston");

    let access = server.sink.by_category(Category::Access);
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].severity, Severity::Trace);
    assert!(
        access[0]
            .message
            .starts_with("127.0.0.1 made a POST request to /users at "),
        "unexpected access line: {}",
        access[0].message
    );

    let payload = server.sink.by_category(Category::Payload);
    assert_eq!(payload.len(), 1);
    assert_eq!(
        payload[0].message,
        format!(
            "UserController invoked add_user with payload {}",
            serde_json::to_string(&body).unwrap()
        )
    );

    let perf = server.sink.by_category(Category::Performance);
    assert_eq!(perf.len(), 1);
    assert!(perf[0].message.starts_with("UserService invoked add_user taking "));
    assert!(server.sink.by_category(Category::Exception).is_empty());
}

#[tokio::test]
async fn login_payload_is_never_logged() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/login"))
        .body(r#"{"user":"x"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    // The handler still sees the whole body.
    assert_eq!(res.text().await.unwrap(), "12");
    assert_eq!(server.sink.by_category(Category::Access).len(), 1);
    assert!(server.sink.by_category(Category::Payload).is_empty());
}

#[tokio::test]
async fn controller_failure_is_logged_once_and_forced_to_500() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .delete(server.url("/users/42"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let exceptions = server.sink.by_category(Category::Exception);
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].severity, Severity::Warn);
    assert_eq!(
        exceptions[0].message,
        "UserController invoked delete_user_by_id throwing: not found"
    );
    assert!(exceptions[0].error.is_some());
}

#[tokio::test]
async fn validation_rejects_before_the_controller_runs() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let mut body = user_body("a!", false, "1 Near St", "Reston");
    body["phoneNumber"] = json!("5550100");

    let res = client
        .post(server.url("/users"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let out: Value = res.json().await.unwrap();
    assert_eq!(out["error"], "validation_error");
    let messages: Vec<&str> = out["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Number of characters must be between 3 and 12.",
            "Username may only have letters and numbers.",
            "Phone number format is incorrect.",
        ]
    );

    assert_eq!(server.sink.by_category(Category::Access).len(), 1);
    assert!(server.sink.by_category(Category::Exception).is_empty());
    assert!(server.sink.by_category(Category::Performance).is_empty());
}

#[tokio::test]
async fn get_by_id_validates_and_reports_missing() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/users/0")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(server.url("/users/7")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    create_user(&client, &server, &user_body("kim", false, "1 Near St", "Reston")).await;
    let res = client.get(server.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["userName"], "kim");

    assert!(server.sink.by_category(Category::Exception).is_empty());
}

#[tokio::test]
async fn update_replaces_the_record() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_user(&client, &server, &user_body("kim", false, "1 Near St", "Reston")).await;

    let mut changed = user_body("kim", true, "1 Near St", "Reston");
    changed["lastName"] = json!("Lee-Park");
    let res = client
        .put(server.url("/users/1"))
        .json(&changed)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["userId"], 1);
    assert_eq!(user["lastName"], "Lee-Park");
    assert_eq!(user["isDriver"], true);
}

#[tokio::test]
async fn delete_confirms_with_text() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_user(&client, &server, &user_body("kim", false, "1 Near St", "Reston")).await;

    let res = client.delete(server.url("/users/1")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "User with id: 1 was deleted");
}

#[tokio::test]
async fn list_filters_by_query() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_user(&client, &server, &user_body("rider", false, "1 Near St", "Reston")).await;
    create_user(&client, &server, &user_body("driver", true, "5 Mid Ave", "Vienna")).await;

    let all: Vec<Value> = client
        .get(server.url("/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let drivers: Vec<Value> = client
        .get(server.url("/users?is-driver=true&location=reston"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["userName"], "driver");

    let by_name: Vec<Value> = client
        .get(server.url("/users?username=rider"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);

    let res = client
        .get(server.url("/users?username=rider%3Bdrop"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nearest_drivers_are_ranked_by_distance() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_user(&client, &server, &user_body("far", true, "9 Far Rd", "Leesburg")).await;
    create_user(&client, &server, &user_body("near", true, "1 Near St", "Reston")).await;
    create_user(&client, &server, &user_body("mid", true, "5 Mid Ave", "Vienna")).await;
    create_user(&client, &server, &user_body("walker", false, "1 Near St", "Reston")).await;
    create_user(&client, &server, &user_body("lost", true, "0 Nowhere Ln", "Atlantis")).await;

    let res = client
        .get(server.url("/users/driver/Herndon,%20VA"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let drivers: Vec<Value> = res.json().await.unwrap();
    let names: Vec<&str> = drivers
        .iter()
        .map(|d| d["userName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["near", "mid", "far"]);

    let perf = server.sink.by_category(Category::Performance);
    assert!(
        perf.iter()
            .any(|e| e.source == "DistanceService::distance_matrix")
    );
}
