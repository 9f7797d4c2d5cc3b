//! Account Commands
//!
//! Login, registration and the identity request.

use serde::Deserialize;

use super::http::{decode, HttpBackend};
use crate::credential::Credential;
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginRequest, Profile, SignupRequest};

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

pub(super) async fn login(api: &HttpBackend, request: &LoginRequest) -> ApiResult<String> {
    let response = api.post_json("/api/login", None, request).await?;
    let body: LoginResponse = decode(response).await?;
    if body.access_token.trim().is_empty() {
        return Err(ApiError::Decode("empty access token".to_string()));
    }
    Ok(body.access_token)
}

pub(super) async fn register(api: &HttpBackend, request: &SignupRequest) -> ApiResult<()> {
    api.post_json("/api/register", None, request).await?;
    Ok(())
}

pub(super) async fn fetch_identity(api: &HttpBackend, credential: &Credential) -> ApiResult<Profile> {
    api.get_json("/api/protected", credential).await
}
