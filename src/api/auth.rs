use log::debug;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::http::{Ack, ApiClient};
use crate::core::session::{PendingVerification, User};
use crate::core::{validation, ClientError};

/// Token and account returned once a device is trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedSession {
    pub token: String,
    pub user: User,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    /// The auth service does not know this device yet; a code was sent to
    /// the (masked) email address.
    VerificationRequired {
        verification: PendingVerification,
        masked_email: String,
    },
}

/// Active login of the current user on some device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSession {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub last_accessed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetInitiation {
    #[serde(default)]
    pub message: String,
    /// Only present while the service runs without an email backend.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct PendingUser {
    id: i64,
    device_fingerprint: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct PendingLogin {
    user: PendingUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyDeviceRequest<'a> {
    user_id: i64,
    fingerprint: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResendCodeRequest<'a> {
    user_id: i64,
    fingerprint: &'a str,
}

#[derive(Serialize)]
struct ResetInitiationRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    new_password: &'a str,
    confirm_password: &'a str,
}

#[derive(Serialize)]
struct LogoutRequest {
    #[serde(rename = "sessionId")]
    session_id: i64,
}

#[derive(Deserialize)]
struct ProfileResponse {
    user: User,
}

#[derive(Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<DeviceSession>,
}

/// Client for the account endpoints of the auth service.
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register(&self, registration: &Registration<'_>) -> Result<String, ClientError> {
        validation::validate_email(registration.email)?;
        validation::validate_username(registration.username)?;
        validation::validate_password_strength(registration.password)?;
        validation::validate_confirmation(registration.password, registration.confirm_password)?;

        let request = RegisterRequest {
            email: registration.email.trim(),
            username: registration.username.trim(),
            password: registration.password,
            confirm_password: registration.confirm_password,
        };
        let ack: Ack = self.api.post_json("/auth/register", &request).await?;
        Ok(ack.message)
    }

    /// Logs in with a username or email. A `202 Accepted` means the device
    /// has to be verified before a token is issued.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        validation::require("Identifier", identifier)?;
        validation::require("Password", password)?;

        let request = LoginRequest {
            identifier: identifier.trim(),
            password,
        };
        let response = self
            .api
            .send(self.api.request(Method::POST, "/auth/login").json(&request))
            .await?;

        if response.status() == StatusCode::ACCEPTED {
            let pending: PendingLogin = response.json().await?;
            debug!("[Auth] device verification required for user {}", pending.user.id);
            return Ok(LoginOutcome::VerificationRequired {
                verification: PendingVerification {
                    user_id: pending.user.id,
                    fingerprint: pending.user.device_fingerprint,
                },
                masked_email: pending.user.email,
            });
        }

        Ok(LoginOutcome::Authenticated(response.json().await?))
    }

    pub async fn verify_device(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AuthenticatedSession, ClientError> {
        validation::require("Verification code", code)?;
        let request = VerifyDeviceRequest {
            user_id: pending.user_id,
            fingerprint: &pending.fingerprint,
            code: code.trim(),
        };
        self.api
            .post_json("/verification/verify-device", &request)
            .await
    }

    pub async fn resend_code(&self, pending: &PendingVerification) -> Result<String, ClientError> {
        let request = ResendCodeRequest {
            user_id: pending.user_id,
            fingerprint: &pending.fingerprint,
        };
        let ack: Ack = self
            .api
            .post_json("/verification/resend-code", &request)
            .await?;
        Ok(ack.message)
    }

    pub async fn initiate_reset(&self, email: &str) -> Result<ResetInitiation, ClientError> {
        validation::validate_email(email)?;
        self.api
            .post_json(
                "/auth/reset-password/initiate",
                &ResetInitiationRequest {
                    email: email.trim(),
                },
            )
            .await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<String, ClientError> {
        validation::require("Reset token", token)?;
        validation::validate_password_strength(new_password)?;
        validation::validate_confirmation(new_password, confirm_password)?;

        let request = ResetPasswordRequest {
            token: token.trim(),
            new_password,
            confirm_password,
        };
        let ack: Ack = self.api.post_json("/auth/reset-password", &request).await?;
        Ok(ack.message)
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        let profile: ProfileResponse = self.api.get_json("/auth/profile").await?;
        Ok(profile.user)
    }

    pub async fn sessions(&self) -> Result<Vec<DeviceSession>, ClientError> {
        let response: SessionsResponse = self.api.get_json("/auth/sessions").await?;
        Ok(response.sessions)
    }

    /// Revokes the server-side session. The auth service needs the id it
    /// handed out at login.
    pub async fn logout(&self, session_id: Option<i64>) -> Result<String, ClientError> {
        let session_id = session_id.ok_or_else(|| {
            ClientError::SessionError("No session id stored for this login".to_string())
        })?;
        let ack: Ack = self
            .api
            .post_json("/auth/logout", &LogoutRequest { session_id })
            .await?;
        Ok(ack.message)
    }
}
