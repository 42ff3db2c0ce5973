//! End-to-end tests of the approval endpoint state machine.
//!
//! Jenkins is played by a wiremock server; the store is a throwaway SQLite
//! file. Call-count expectations (`.expect(n)`) verify the at-most-once
//! trigger contract, including under concurrent redemptions.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certflow::config::{Config, JenkinsConfig};
use certflow::models::approval::{ApprovalStatus, NewApproval};
use certflow::store::sqlite::SqliteStore;
use certflow::trigger::jenkins::JenkinsClient;
use certflow::{api, AppState};

const CRUMB_PATH: &str = "/crumbIssuer/api/xml";
const BUILD_PATH: &str = "/job/ssl-automation-deploy/build";

async fn temp_store() -> SqliteStore {
    let url = format!(
        "sqlite://{}/certflow-test-{}.db",
        std::env::temp_dir().display(),
        uuid::Uuid::new_v4().simple()
    );
    let store = SqliteStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    store
}

fn jenkins_config(base_url: &str) -> JenkinsConfig {
    JenkinsConfig {
        base_url: base_url.to_string(),
        user: "ci".into(),
        api_token: "s3cret".into(),
        job: "ssl-automation-deploy".into(),
        trigger_token: None,
    }
}

fn test_app(store: SqliteStore, jenkins_url: &str) -> axum::Router {
    let jenkins = JenkinsClient::new(jenkins_config(jenkins_url));
    let config = Config {
        port: 0,
        database_url: String::new(),
        jenkins: jenkins_config(jenkins_url),
    };
    api::router(Arc::new(AppState {
        db: store,
        jenkins,
        config,
    }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn pending(token: &str, ttl: i64) -> NewApproval {
    let now = chrono::Utc::now().timestamp();
    NewApproval {
        token: token.into(),
        domain: "shop.example.org".into(),
        owner: "ops".into(),
        created: now,
        expires_at: now + ttl,
    }
}

async fn status_of(store: &SqliteStore, token: &str) -> ApprovalStatus {
    store.get_approval(token).await.unwrap().unwrap().status
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let jenkins = MockServer::start().await;
    let app = test_app(temp_store().await, &jenkins.uri());

    let (status, body) = get(app.clone(), "/approve").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing token");

    let (status, body) = get(app, "/approve?token=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing token");
}

#[tokio::test]
async fn unknown_token_returns_not_found() {
    let jenkins = MockServer::start().await;
    let app = test_app(temp_store().await, &jenkins.uri());

    let (status, body) = get(app, "/approve?token=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Token not found");
}

#[tokio::test]
async fn expired_token_is_reclassified_and_never_triggers() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;
    store.insert_approval(&pending("abc", -1)).await.unwrap();
    let app = test_app(store.clone(), &jenkins.uri());

    let (status, body) = get(app.clone(), "/approve?token=abc").await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body, "Token expired");
    assert_eq!(status_of(&store, "abc").await, ApprovalStatus::Expired);

    // Repeat redemption is idempotent: still gone, still EXPIRED.
    let (status, _) = get(app, "/approve?token=abc").await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(status_of(&store, "abc").await, ApprovalStatus::Expired);
}

#[tokio::test]
async fn already_decided_token_reports_current_status() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;

    store.insert_approval(&pending("done", 3600)).await.unwrap();
    store
        .set_status("done", ApprovalStatus::Approved)
        .await
        .unwrap();

    store
        .insert_approval(&pending("broken", 3600))
        .await
        .unwrap();
    store
        .set_status("broken", ApprovalStatus::TriggerFailed)
        .await
        .unwrap();

    let app = test_app(store.clone(), &jenkins.uri());

    let (status, body) = get(app.clone(), "/approve?token=done").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, "Token already APPROVED");
    assert_eq!(status_of(&store, "done").await, ApprovalStatus::Approved);

    let (status, body) = get(app, "/approve?token=broken").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, "Token already TRIGGER_FAILED");
}

#[tokio::test]
async fn pending_token_is_approved_and_triggers_jenkins() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("Jenkins-Crumb:17fa5c"))
        .expect(1)
        .mount(&jenkins)
        .await;
    Mock::given(method("POST"))
        .and(path(BUILD_PATH))
        .and(header("Jenkins-Crumb", "17fa5c"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;
    store.insert_approval(&pending("abc", 3600)).await.unwrap();
    let app = test_app(store.clone(), &jenkins.uri());

    let (status, body) = get(app, "/approve?token=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Approved"), "unexpected body: {body}");
    assert_eq!(status_of(&store, "abc").await, ApprovalStatus::Approved);
}

#[tokio::test]
async fn build_failure_marks_record_trigger_failed() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("Jenkins-Crumb:17fa5c"))
        .expect(1)
        .mount(&jenkins)
        .await;
    Mock::given(method("POST"))
        .and(path(BUILD_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;
    store.insert_approval(&pending("abc", 3600)).await.unwrap();
    let app = test_app(store.clone(), &jenkins.uri());

    let (status, body) = get(app.clone(), "/approve?token=abc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to trigger Jenkins: 500");
    assert_eq!(
        status_of(&store, "abc").await,
        ApprovalStatus::TriggerFailed
    );

    // The token is spent even though the trigger failed: no second attempt.
    let (status, body) = get(app, "/approve?token=abc").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, "Token already TRIGGER_FAILED");
}

#[tokio::test]
async fn crumb_failure_skips_build_submission() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&jenkins)
        .await;
    Mock::given(method("POST"))
        .and(path(BUILD_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;
    store.insert_approval(&pending("abc", 3600)).await.unwrap();
    let app = test_app(store.clone(), &jenkins.uri());

    let (status, body) = get(app, "/approve?token=abc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.starts_with("Failed to trigger Jenkins"),
        "unexpected body: {body}"
    );
    assert_eq!(
        status_of(&store, "abc").await,
        ApprovalStatus::TriggerFailed
    );
}

#[tokio::test]
async fn concurrent_redemptions_trigger_exactly_once() {
    let jenkins = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CRUMB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("Jenkins-Crumb:17fa5c"))
        .expect(1)
        .mount(&jenkins)
        .await;
    Mock::given(method("POST"))
        .and(path(BUILD_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&jenkins)
        .await;

    let store = temp_store().await;
    store.insert_approval(&pending("abc", 3600)).await.unwrap();
    let app = test_app(store.clone(), &jenkins.uri());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(
            async move { get(app, "/approve?token=abc").await },
        ));
    }

    let mut approved = 0;
    let mut conflicts = 0;
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        match status {
            StatusCode::OK => approved += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status: {other}"),
        }
    }

    assert_eq!(approved, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(status_of(&store, "abc").await, ApprovalStatus::Approved);
}
