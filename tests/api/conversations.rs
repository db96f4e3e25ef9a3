use axum::{
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::support::{serve, Recorder, UNREACHABLE};
use rag_chat::api::{ApiClient, ConversationClient};
use rag_chat::core::transcript::Role;
use rag_chat::ClientError;

#[tokio::test]
async fn test_list_and_messages() {
    let router = Router::new()
        .route(
            "/api/conversations/",
            get(|| async {
                Json(json!([
                    {"id": 2, "title": "Pinned one", "user_id": 7, "created_at": "2025-03-02T10:00:00", "is_pinned": true},
                    {"id": 3, "title": "Newest", "user_id": 7, "created_at": "2025-03-04T10:00:00", "is_pinned": false}
                ]))
            }),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(|| async {
                Json(json!([
                    {"id": 10, "sender": "user", "content": "hi", "created_at": "2025-03-02T10:00:00"},
                    {"id": 11, "sender": "ai", "content": "hello", "created_at": "2025-03-02T10:00:01"}
                ]))
            }),
        );
    let base = serve(router).await;
    let client = ConversationClient::new(ApiClient::new(format!("{base}/api")).with_token("jwt"));

    let conversations = client.list().await.unwrap();
    assert_eq!(conversations.len(), 2);
    assert!(conversations[0].is_pinned);
    assert_eq!(conversations[1].title, "Newest");

    let messages = client.messages(2).await.unwrap();
    assert_eq!(messages[0].sender, Role::User);
    assert_eq!(messages[1].sender, Role::Assistant);
}

#[tokio::test]
async fn test_rename_and_pin() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new()
        .route(
            "/api/conversations/{id}/rename",
            put(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.record(body.clone());
                    Json(json!({"id": 4, "title": body["title"], "is_pinned": false}))
                }
            }),
        )
        .route(
            "/api/conversations/{id}/pin",
            put(|| async { Json(json!({"id": 4, "title": "Trip notes", "is_pinned": true})) }),
        );
    let base = serve(router).await;
    let client = ConversationClient::new(ApiClient::new(format!("{base}/api")).with_token("jwt"));

    let renamed = client.rename(4, "  Trip notes ").await.unwrap();
    assert_eq!(renamed.title, "Trip notes");
    assert_eq!(recorder.bodies(), vec![json!({"title": "Trip notes"})]);

    let pinned = client.toggle_pin(4).await.unwrap();
    assert!(pinned.is_pinned);
}

#[tokio::test]
async fn test_blank_title_is_rejected_locally() {
    let client = ConversationClient::new(ApiClient::new(UNREACHABLE).with_token("jwt"));
    let error = client.rename(4, "   ").await.unwrap_err();
    assert!(matches!(error, ClientError::Validation(_)), "{error:?}");
}

#[tokio::test]
async fn test_missing_conversation() {
    let router = Router::new().route(
        "/api/conversations/{id}",
        axum::routing::delete(|| async {
            (StatusCode::NOT_FOUND, Json(json!({"message": "Conversation not found"})))
        }),
    );
    let base = serve(router).await;
    let client = ConversationClient::new(ApiClient::new(format!("{base}/api")).with_token("jwt"));

    let error = client.delete(99).await.unwrap_err();
    assert!(matches!(error, ClientError::NotFound(ref message) if message == "Conversation not found"));
}
