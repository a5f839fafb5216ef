use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::token::TokenStore;

/// Outcome of one backend call. Network errors, timeouts and non-2xx statuses
/// are all `Failure` values; callers never see a panic or an `Err` for them.
#[derive(Debug, Clone)]
pub enum ApiResponse<T> {
    Success {
        data: Option<T>,
        message: String,
        /// Only the auth endpoints populate this.
        token: Option<String>,
    },
    Failure {
        message: String,
        error: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse::Failure {
            message: message.into(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    /// Success payload, if any.
    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResponse::Success { data, .. } => data,
            ApiResponse::Failure { .. } => None,
        }
    }
}

/// Wire envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    data: Option<T>,
    error: Option<String>,
    token: Option<String>,
}

/// The one place envelope fields are interpreted. `data` is the payload,
/// `message` is always human-readable text; the backend's legacy habit of
/// shipping payloads under `message` is not honored here.
fn normalize<T>(envelope: Envelope<T>) -> ApiResponse<T> {
    let message = envelope.message.filter(|m| !m.is_empty());

    if envelope.success {
        ApiResponse::Success {
            data: envelope.data,
            message: message.unwrap_or_default(),
            token: envelope.token,
        }
    } else {
        ApiResponse::Failure {
            message: message.unwrap_or_else(|| "Request failed".to_string()),
            error: envelope.error,
        }
    }
}

/// Single chokepoint for all HTTP traffic to the backend: base URLs, bearer
/// header, timeout race, envelope normalization, 401 credential eviction.
pub struct Gateway {
    http: reqwest::Client,
    config: ApiConfig,
    tokens: Arc<TokenStore>,
}

impl Gateway {
    pub fn new(config: ApiConfig, tokens: Arc<TokenStore>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(Method::GET, self.courier_url(path), None, true)
            .await
    }

    /// GET against the resource-scoped orders base instead of the
    /// courier-scoped one. Single-order detail lives there so the detail view
    /// also works for orders the courier has not claimed.
    pub async fn get_resource<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(Method::GET, self.resource_url(path), None, true)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match to_body(body) {
            Ok(body) => {
                self.request(Method::POST, self.courier_url(path), Some(body), true)
                    .await
            }
            Err(failure) => failure,
        }
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(Method::POST, self.courier_url(path), None, true)
            .await
    }

    /// POST without the bearer header, for login/register.
    pub async fn post_public<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match to_body(body) {
            Ok(body) => {
                self.request(Method::POST, self.courier_url(path), Some(body), false)
                    .await
            }
            Err(failure) => failure,
        }
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match to_body(body) {
            Ok(body) => {
                self.request(Method::PUT, self.courier_url(path), Some(body), true)
                    .await
            }
            Err(failure) => failure,
        }
    }

    fn courier_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}{}", self.config.orders_base_url, path)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
        include_auth: bool,
    ) -> ApiResponse<T> {
        debug!(method = %method, %url, "api request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if include_auth {
            // A missing token is the caller's problem: the header is simply
            // omitted and the backend answers 401 if the endpoint needed it.
            if let Some(token) = self.tokens.current() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = match timeout(self.config.timeout, builder.send()).await {
            Err(_) => {
                warn!(method = %method, %url, "request timed out");
                return ApiResponse::failure("Request timeout");
            }
            Ok(Err(err)) => {
                warn!(method = %method, %url, error = %err, "network error");
                return ApiResponse::Failure {
                    message: "Network error".to_string(),
                    error: Some(err.to_string()),
                };
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                warn!(%url, "unauthorized response; clearing stored credential");
                self.tokens.clear().await;
            }

            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| "Request failed".to_string());
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);

            warn!(method = %method, %url, status = %status, %message, "api request failed");
            return ApiResponse::Failure { message, error };
        }

        match response.json::<Envelope<T>>().await {
            Ok(envelope) => normalize(envelope),
            Err(err) => {
                warn!(method = %method, %url, error = %err, "unreadable response body");
                ApiResponse::Failure {
                    message: "Invalid response body".to_string(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn to_body<T, B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiResponse<T>> {
    serde_json::to_value(body).map_err(|err| ApiResponse::Failure {
        message: "Invalid request body".to_string(),
        error: Some(err.to_string()),
    })
}
