use log::debug;
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::core::ClientError;

/// JSON error payload. The auth service sends `message` or `error`, the
/// assistant service `detail`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

/// Acknowledgement returned by endpoints that only report success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

/// Thin wrapper over `reqwest::Client` bound to one service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{base}/{path}",
            base = self.base_url.trim_end_matches('/'),
            path = path.trim_start_matches('/')
        )
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("[HTTP] {method} {url}");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Sends the request and turns any non-2xx status into an error.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        check_status(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::PUT, path).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::DELETE, path)).await?;
        Ok(response.json().await?)
    }
}

pub async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("[HTTP] {status}: {body}");
    Err(ClientError::from_status(status, error_message(&body, status)))
}

fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed.detail.map(|detail| match detail {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    });

    parsed
        .message
        .or(detail)
        .or(parsed.error)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
