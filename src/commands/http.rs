//! HTTP Transport
//!
//! Shared request plumbing for the platform commands: endpoint building,
//! bearer attachment and the status-to-error mapping.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::{ApiError, ApiResult};

/// reqwest-backed implementation of the platform contracts
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Whether a 401/403/422 means the credential was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Bearer,
    Anonymous,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(transport)?;
        Ok(Self::with_client(client, config.api_base_url.clone()))
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
    ) -> ApiResult<T> {
        tracing::debug!("GET {}", path);
        let response = self
            .client
            .get(self.endpoint(path))
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response, Auth::Bearer).await?;
        decode(response).await
    }

    /// POST a JSON body; the bearer is attached when a credential is given
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        credential: Option<&Credential>,
        body: &B,
    ) -> ApiResult<Response> {
        tracing::debug!("POST {}", path);
        let mut request = self.client.post(self.endpoint(path)).json(body);
        let auth = match credential {
            Some(credential) => {
                request = request.bearer_auth(credential.token());
                Auth::Bearer
            }
            None => Auth::Anonymous,
        };
        let response = request.send().await.map_err(transport)?;
        check_status(response, auth).await
    }
}

pub(crate) async fn check_status(response: Response, auth: Auth) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if auth == Auth::Bearer && is_rejection(status) {
        tracing::warn!("Credential rejected with {}", status);
        return Err(ApiError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

// The platform's JWT layer answers 422 for malformed tokens
fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY
    )
}

/// `error` (platform) or `msg` (JWT layer) field of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("msg"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

pub(crate) fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}
