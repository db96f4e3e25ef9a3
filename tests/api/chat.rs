use axum::{
    body::{Body, Bytes},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::support::{serve, Recorder};
use rag_chat::api::{ApiClient, AssistantClient, ConversationClient, UploadPolicy};
use rag_chat::cli::exchange;
use rag_chat::core::chat::ERROR_MODE;
use rag_chat::core::transcript::{ChatMessage, Role};
use rag_chat::core::{ChatSession, ChatSettings, StreamOutcome};
use rag_chat::render::{SyntaxHighlighter, TranscriptPrinter};
use rag_chat::{ClientError, Config, StreamEvent};

const ANSWER_BODY: &str = concat!(
    "data: {\"type\": \"mode\", \"value\": \"RAG\"}\n\n",
    "data: {\"type\": \"token\", \"value\": \"Caf\u{e9} \"}\n\n",
    "data: {not valid json}\n\n",
    "data: {\"type\": \"token\", \"value\": \"au lait\"}\n\n",
    "data: {\"type\": \"done\", \"full_response\": \"Caf\u{e9} au lait.\"}\n\n",
);

/// Splits the body at awkward offsets: inside a frame prefix, inside the
/// two-byte `é`, and inside a JSON string.
fn awkward_chunks(body: &'static str) -> Vec<Bytes> {
    let bytes = body.as_bytes();
    let e_acute = body.find('\u{e9}').unwrap();
    let mut cuts = vec![3, e_acute + 1, e_acute + 30, bytes.len() - 7];
    cuts.sort_unstable();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(Bytes::from_static(&bytes[start..cut]));
        start = cut;
    }
    chunks.push(Bytes::from_static(&bytes[start..]));
    chunks
}

fn streamed_body(chunks: Vec<Bytes>) -> Body {
    let stream = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, std::io::Error>(chunk)
    });
    Body::from_stream(stream)
}

struct MockServices {
    base: String,
    asks: Recorder,
    created: Recorder,
    appended: Recorder,
}

async fn mock_services(ask_status: StatusCode) -> MockServices {
    let asks = Recorder::default();
    let created = Recorder::default();
    let appended = Recorder::default();
    let (seen_asks, seen_created, seen_appended) = (asks.clone(), created.clone(), appended.clone());

    let router = Router::new()
        .route(
            "/ask",
            post(move |Json(body): Json<Value>| {
                let seen = seen_asks.clone();
                async move {
                    seen.record(body);
                    if ask_status.is_success() {
                        (ask_status, streamed_body(awkward_chunks(ANSWER_BODY)))
                    } else {
                        (ask_status, Body::from(r#"{"detail": "index unavailable"}"#))
                    }
                }
            }),
        )
        .route(
            "/api/conversations/",
            post(move |Json(body): Json<Value>| {
                let seen = seen_created.clone();
                async move {
                    seen.record(body);
                    (
                        StatusCode::CREATED,
                        Json(json!({"id": 5, "title": "Coffee", "user_id": 7, "is_pinned": false})),
                    )
                }
            }),
        )
        .route(
            "/api/conversations/{id}/messages",
            post(move |Json(body): Json<Value>| {
                let seen = seen_appended.clone();
                async move {
                    seen.record(body);
                    Json(json!({"message": "Messages added"}))
                }
            }),
        );

    MockServices {
        base: serve(router).await,
        asks,
        created,
        appended,
    }
}

fn session_for(services: &MockServices) -> ChatSession {
    let config = Config::default();
    let assistant = AssistantClient::new(
        ApiClient::new(services.base.as_str()).with_token("jwt-123"),
        UploadPolicy::from(&config),
    );
    let conversations =
        ConversationClient::new(ApiClient::new(format!("{}/api", services.base)).with_token("jwt-123"));
    ChatSession::new(
        Box::new(assistant),
        Box::new(conversations),
        ChatSettings::from(&config),
    )
}

#[tokio::test]
async fn test_event_stream_over_http() {
    let services = mock_services(StatusCode::OK).await;
    let client = AssistantClient::new(
        ApiClient::new(services.base.as_str()),
        UploadPolicy::from(&Config::default()),
    );

    let events: Vec<StreamEvent> = client
        .ask("What is a latte?", &[])
        .await
        .unwrap()
        .map(|event| event.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Mode { value: "RAG".into() },
            StreamEvent::Token { value: "Caf\u{e9} ".into() },
            StreamEvent::Token { value: "au lait".into() },
            StreamEvent::Done { full_response: "Caf\u{e9} au lait.".into() },
        ]
    );
    assert_eq!(
        services.asks.bodies(),
        vec![json!({"question": "What is a latte?", "history": []})]
    );
}

#[tokio::test]
async fn test_chat_exchanges_are_streamed_and_saved() {
    let services = mock_services(StatusCode::OK).await;
    let mut chat = session_for(&services);
    let mut printer = TranscriptPrinter::new(SyntaxHighlighter::default(), "info");
    let mut output = Vec::new();
    let cancel = CancellationToken::new();

    let outcome = exchange(&mut chat, &mut printer, "What is a latte?", &cancel, &mut output)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StreamOutcome::Completed { ref response, ref mode } if response == "Caf\u{e9} au lait." && mode == "RAG"
    ));
    assert_eq!(
        chat.transcript().last(),
        Some(&ChatMessage::assistant("Caf\u{e9} au lait.", Some("RAG".to_string())))
    );
    assert_eq!(chat.active_conversation(), Some(5));
    assert_eq!(
        services.created.bodies(),
        vec![json!({"message": "What is a latte?", "ai_response": "Caf\u{e9} au lait."})]
    );

    let printed = strip_ansi_escapes::strip_str(String::from_utf8_lossy(&output));
    assert!(printed.starts_with("Assistant [RAG]\n"), "{printed}");
    assert!(printed.contains("Caf\u{e9} au lait."), "{printed}");

    exchange(&mut chat, &mut printer, "And a flat white?", &cancel, &mut output)
        .await
        .unwrap();
    assert_eq!(
        services.appended.bodies(),
        vec![json!({"user_message": "And a flat white?", "ai_response": "Caf\u{e9} au lait."})]
    );
    assert_eq!(
        services.asks.bodies()[1]["history"],
        json!([["user", "What is a latte?"], ["assistant", "Caf\u{e9} au lait."]])
    );
    assert_eq!(chat.transcript().len(), 4);
}

#[tokio::test]
async fn test_server_error_before_stream() {
    let services = mock_services(StatusCode::SERVICE_UNAVAILABLE).await;
    let mut chat = session_for(&services);

    let outcome = chat
        .send("What is a latte?", &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!(
        matches!(outcome, StreamOutcome::Failed(ClientError::ServerError(ref message)) if message == "index unavailable"),
        "{outcome:?}"
    );
    let messages = chat.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].mode.as_deref(), Some(ERROR_MODE));
    assert!(services.created.bodies().is_empty());
}

#[tokio::test]
async fn test_unauthorized_ask_fails_without_events() {
    let router = Router::new().route(
        "/ask",
        post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))) }),
    );
    let base = serve(router).await;
    let client = AssistantClient::new(ApiClient::new(base), UploadPolicy::from(&Config::default()));

    let error = match client.ask("hi", &[]).await {
        Ok(_) => panic!("expected an authentication error"),
        Err(error) => error,
    };
    assert!(error.is_authentication(), "{error:?}");
}

#[tokio::test]
async fn test_body_cut_off_mid_stream() {
    let router = Router::new().route(
        "/ask",
        post(|| async {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(
                    b"data: {\"type\": \"token\", \"value\": \"partial\"}\n",
                )),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "upstream went away",
                )),
            ];
            let stream = futures::stream::iter(chunks).then(|chunk| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                chunk
            });
            Body::from_stream(stream)
        }),
    );
    let base = serve(router).await;
    let client = AssistantClient::new(ApiClient::new(base), UploadPolicy::from(&Config::default()));

    let items: Vec<Result<StreamEvent, ClientError>> =
        client.ask("q", &[]).await.unwrap().collect().await;

    assert_eq!(
        items.first().map(|item| item.as_ref().ok()),
        Some(Some(&StreamEvent::Token { value: "partial".into() }))
    );
    assert!(
        matches!(items.last(), Some(Err(ClientError::StreamError(_)))),
        "{items:?}"
    );
}
