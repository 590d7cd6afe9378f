//! End-to-end exchange tests
//!
//! Runs `ChatSession` against wiremock-backed services and an in-memory
//! SQLite store.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use nandi_chat::config::{RequestConfig, ServiceConfig};
use nandi_chat::error::{AppError, NETWORK_MESSAGE};
use nandi_chat::remote::NandiClient;
use nandi_chat::storage::{
    KeyValueStore, SqliteKeyValueStore, TOTAL_POINTS_KEY, TOTAL_QUESTIONS_KEY,
};
use nandi_chat::{ChatSession, Origin, Persona, SessionOptions};

type TestSession = ChatSession<NandiClient, NandiClient, Arc<SqliteKeyValueStore>>;

fn client_for(base_url: &str) -> NandiClient {
    let config = ServiceConfig {
        ai_service_url: base_url.to_string(),
        api_service_url: base_url.to_string(),
        catalog_url: format!("{}/api", base_url),
        api_key: "test-api-key".to_string(),
    };
    NandiClient::new(&config, RequestConfig { timeout_ms: 5000 }).expect("client")
}

async fn create_store() -> Arc<SqliteKeyValueStore> {
    Arc::new(
        SqliteKeyValueStore::new_in_memory()
            .await
            .expect("Failed to create in-memory storage"),
    )
}

async fn open_session(base_url: &str, store: Arc<SqliteKeyValueStore>) -> TestSession {
    let client = client_for(base_url);
    ChatSession::new(
        SessionOptions::new(Persona::Karma).with_session_id("sess-e2e"),
        client.clone(),
        client,
        store,
    )
    .await
    .expect("session")
}

async fn mount_chat(server: &MockServer, reply: &str, score: u8) {
    Mock::given(method("POST"))
        .and(path("/api/chat/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": reply,
            "quality_score": score
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scored_exchange_shows_total_and_badge() {
    let server = MockServer::start().await;
    mount_chat(&server, "Every action returns to you.", 8).await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .and(body_partial_json(json!({
            "quality_scores": [8],
            "total_questions_count": 1,
            "session_id": "sess-e2e"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalPoints": 100,
            "pointsEarned": 100,
            "breakdown": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store().await;
    let mut session = open_session(&server.uri(), store.clone()).await;

    let report = session.submit("What is karma?").await.unwrap();

    assert_eq!(report.points.as_ref().unwrap().total_points, 100);
    assert_eq!(session.metrics().total_points, 100);
    assert_eq!(
        session.metrics().last_quality_score.as_ref().unwrap().badge(),
        "8/10"
    );
    assert_eq!(
        store.get(TOTAL_POINTS_KEY).await.unwrap(),
        Some("100".to_string())
    );
    assert_eq!(
        store.get(TOTAL_QUESTIONS_KEY).await.unwrap(),
        Some("1".to_string())
    );
}

#[tokio::test]
async fn test_camel_case_reply_is_scored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Every action returns to you.",
            "id": "chat-response-1",
            "timestamp": "2026-10-19T09:30:00Z",
            "qualityScore": 8,
            "scoreReason": "Thoughtful"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .and(body_partial_json(json!({"quality_scores": [8]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalPoints": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = open_session(&server.uri(), create_store().await).await;
    session.submit("What is karma?").await.unwrap();

    assert_eq!(session.metrics().total_points, 100);
    assert_eq!(
        session.metrics().last_quality_score.as_ref().unwrap().badge(),
        "8/10"
    );
}

#[tokio::test]
async fn test_unreachable_chat_service() {
    let store = create_store().await;
    store.set(TOTAL_POINTS_KEY, "20").await.unwrap();
    let mut session = open_session("http://127.0.0.1:9", store.clone()).await;

    let err = session.submit("hello").await.unwrap_err();

    assert!(matches!(err, AppError::Remote(_)));
    let errors: Vec<_> = session
        .transcript()
        .snapshot()
        .iter()
        .filter(|m| m.origin() == Origin::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].text(), NETWORK_MESSAGE);
    assert_eq!(session.metrics().total_points, 20);
    assert_eq!(
        store.get(TOTAL_POINTS_KEY).await.unwrap(),
        Some("20".to_string())
    );
}

#[tokio::test]
async fn test_cumulative_totals_are_not_summed() {
    let server = MockServer::start().await;
    mount_chat(&server, "Reflect.", 6).await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .and(body_partial_json(json!({"total_questions_count": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalPoints": 10})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .and(body_partial_json(json!({"total_questions_count": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalPoints": 25})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = open_session(&server.uri(), create_store().await).await;
    session.submit("first").await.unwrap();
    session.submit("second").await.unwrap();

    assert_eq!(session.metrics().total_points, 25);
}

#[tokio::test]
async fn test_points_failure_keeps_reply_and_total() {
    let server = MockServer::start().await;
    mount_chat(&server, "Be still.", 7).await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Error calculating points"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = create_store().await;
    store.set(TOTAL_POINTS_KEY, "5").await.unwrap();
    let mut session = open_session(&server.uri(), store.clone()).await;

    assert!(session.submit("How do I meditate?").await.is_err());

    let snapshot = session.transcript().snapshot();
    assert!(snapshot
        .iter()
        .any(|m| m.origin() == Origin::System && m.text() == "Be still."));
    assert_eq!(snapshot.last().unwrap().text(), "Error calculating points");
    assert_eq!(snapshot.iter().filter(|m| m.is_error()).count(), 1);
    assert_eq!(session.metrics().total_points, 5);
    assert_eq!(
        store.get(TOTAL_POINTS_KEY).await.unwrap(),
        Some("5".to_string())
    );
    assert_eq!(store.get(TOTAL_QUESTIONS_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_whitespace_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = open_session(&server.uri(), create_store().await).await;
    let before = session.transcript().len();

    assert!(matches!(
        session.submit("   ").await,
        Err(AppError::Validation { .. })
    ));
    assert_eq!(session.transcript().len(), before);
}

#[tokio::test]
async fn test_sessions_share_durable_total() {
    let server = MockServer::start().await;
    mount_chat(&server, "ok", 9).await;
    Mock::given(method("POST"))
        .and(path("/api/points/calculate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalPoints": 30})))
        .mount(&server)
        .await;

    let store = create_store().await;
    let mut first = open_session(&server.uri(), store.clone()).await;
    first.submit("question").await.unwrap();

    let second = open_session(&server.uri(), store).await;
    assert_eq!(second.metrics().total_points, 30);
    assert_eq!(second.transcript().len(), 1);
}
