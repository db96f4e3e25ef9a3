use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::support::{serve, Recorder, UNREACHABLE};
use rag_chat::api::{ApiClient, AuthClient, LoginOutcome, Registration};
use rag_chat::core::session::PendingVerification;
use rag_chat::ClientError;

fn user_json() -> Value {
    json!({"id": 7, "username": "alice", "email": "alice@example.com", "role": "user", "status": 1})
}

#[tokio::test]
async fn test_login_on_trusted_device() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new().route(
        "/api/auth/login",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.record(body);
                Json(json!({"token": "jwt-123", "user": user_json(), "sessionId": 31}))
            }
        }),
    );
    let base = serve(router).await;

    let client = AuthClient::new(ApiClient::new(format!("{base}/api")));
    let outcome = client.login("  alice ", "Secret1!").await.unwrap();

    match outcome {
        LoginOutcome::Authenticated(session) => {
            assert_eq!(session.token, "jwt-123");
            assert_eq!(session.user.username, "alice");
            assert_eq!(session.session_id, Some(31));
        }
        other => panic!("expected a token, got {other:?}"),
    }
    assert_eq!(
        recorder.bodies(),
        vec![json!({"identifier": "alice", "password": "Secret1!"})]
    );
}

#[tokio::test]
async fn test_login_from_new_device_then_verify() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new()
        .route(
            "/api/auth/login",
            post(|| async {
                (
                    StatusCode::ACCEPTED,
                    Json(json!({
                        "message": "Verification required",
                        "user": {"id": 7, "device_fingerprint": "fp-abc", "email": "a***@example.com"}
                    })),
                )
            }),
        )
        .route(
            "/api/verification/verify-device",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.record(body);
                    Json(json!({"token": "jwt-456", "user": user_json(), "sessionId": 32}))
                }
            }),
        );
    let base = serve(router).await;
    let client = AuthClient::new(ApiClient::new(format!("{base}/api")));

    let pending = match client.login("alice", "Secret1!").await.unwrap() {
        LoginOutcome::VerificationRequired {
            verification,
            masked_email,
        } => {
            assert_eq!(masked_email, "a***@example.com");
            verification
        }
        other => panic!("expected verification, got {other:?}"),
    };
    assert_eq!(
        pending,
        PendingVerification {
            user_id: 7,
            fingerprint: "fp-abc".to_string()
        }
    );

    let session = client.verify_device(&pending, " 123456 ").await.unwrap();
    assert_eq!(session.token, "jwt-456");
    assert_eq!(
        recorder.bodies(),
        vec![json!({"userId": 7, "fingerprint": "fp-abc", "code": "123456"})]
    );
}

#[tokio::test]
async fn test_rejected_credentials() {
    let router = Router::new().route(
        "/api/auth/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid credentials"})),
            )
        }),
    );
    let base = serve(router).await;
    let client = AuthClient::new(ApiClient::new(format!("{base}/api")));

    let error = client.login("alice", "wrong").await.unwrap_err();
    assert!(
        matches!(error, ClientError::Authentication(ref message) if message == "Invalid credentials"),
        "{error:?}"
    );
}

#[tokio::test]
async fn test_profile_sends_bearer_token() {
    let router = Router::new().route(
        "/api/auth/profile",
        get(|headers: HeaderMap| async move {
            match headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) {
                Some("Bearer jwt-123") => (StatusCode::OK, Json(json!({"user": user_json()}))),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "Missing token"})),
                ),
            }
        }),
    );
    let base = serve(router).await;

    let anonymous = AuthClient::new(ApiClient::new(format!("{base}/api")));
    assert!(anonymous.profile().await.unwrap_err().is_authentication());

    let client = AuthClient::new(ApiClient::new(format!("{base}/api")).with_token("jwt-123"));
    let user = client.profile().await.unwrap();
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
async fn test_invalid_registration_is_rejected_before_sending() {
    let client = AuthClient::new(ApiClient::new(UNREACHABLE));
    let error = client
        .register(&Registration {
            email: "alice@example.com",
            username: "alice",
            password: "weakpass",
            confirm_password: "weakpass",
        })
        .await
        .unwrap_err();

    assert!(matches!(error, ClientError::Validation(_)), "{error:?}");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new()
        .route(
            "/api/auth/reset-password/initiate",
            post(|| async {
                Json(json!({"message": "Reset email sent", "token": "reset-789"}))
            }),
        )
        .route(
            "/api/auth/reset-password",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.record(body);
                    Json(json!({"message": "Password updated"}))
                }
            }),
        );
    let base = serve(router).await;
    let client = AuthClient::new(ApiClient::new(format!("{base}/api")));

    let initiation = client.initiate_reset("alice@example.com").await.unwrap();
    assert_eq!(initiation.token.as_deref(), Some("reset-789"));

    let message = client
        .reset_password("reset-789", "NewSecret1!", "NewSecret1!")
        .await
        .unwrap();
    assert_eq!(message, "Password updated");
    assert_eq!(
        recorder.bodies(),
        vec![json!({"token": "reset-789", "newPassword": "NewSecret1!", "confirmPassword": "NewSecret1!"})]
    );
}

#[tokio::test]
async fn test_logout_sends_session_id() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new().route(
        "/api/auth/logout",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                let has_session = body.get("sessionId").is_some_and(|id| !id.is_null());
                seen.record(body);
                if has_session {
                    (StatusCode::OK, Json(json!({"message": "Logout successful"})))
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": "Bad Request", "message": "Session ID is required"})),
                    )
                }
            }
        }),
    );
    let base = serve(router).await;
    let client = AuthClient::new(ApiClient::new(format!("{base}/api")).with_token("jwt-123"));

    assert_eq!(client.logout(Some(31)).await.unwrap(), "Logout successful");
    assert_eq!(recorder.bodies(), vec![json!({"sessionId": 31})]);
}

#[tokio::test]
async fn test_logout_without_session_id_is_not_sent() {
    let client = AuthClient::new(ApiClient::new(UNREACHABLE).with_token("jwt-123"));
    let error = client.logout(None).await.unwrap_err();
    assert!(matches!(error, ClientError::SessionError(_)), "{error:?}");
}

#[tokio::test]
async fn test_resend_code_identifies_device() {
    let recorder = Recorder::default();
    let seen = recorder.clone();
    let router = Router::new().route(
        "/api/verification/resend-code",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.record(body);
                Json(json!({"message": "Verification code sent"}))
            }
        }),
    );
    let base = serve(router).await;
    let client = AuthClient::new(ApiClient::new(format!("{base}/api")));

    let pending = PendingVerification {
        user_id: 7,
        fingerprint: "fp-abc".to_string(),
    };
    assert_eq!(client.resend_code(&pending).await.unwrap(), "Verification code sent");
    assert_eq!(
        recorder.bodies(),
        vec![json!({"userId": 7, "fingerprint": "fp-abc"})]
    );
}
