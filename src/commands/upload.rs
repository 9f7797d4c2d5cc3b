//! Upload Commands
//!
//! Upload authorization from the platform and the direct transfer to
//! object storage.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use super::http::{check_status, decode, transport, Auth, HttpBackend};
use crate::credential::Credential;
use crate::error::ApiResult;
use crate::models::{Artifact, UploadAuthorization};

#[derive(Serialize)]
struct PresignArgs<'a> {
    file_name: &'a str,
}

pub(super) async fn generate_presigned_url(
    api: &HttpBackend,
    credential: &Credential,
    file_name: &str,
) -> ApiResult<UploadAuthorization> {
    let response = api
        .post_json(
            "/api/generate-presigned-url",
            Some(credential),
            &PresignArgs { file_name },
        )
        .await?;
    decode(response).await
}

/// PUT to the presigned target. A 403 here is the storage refusing the
/// signature, not the session being rejected.
pub(super) async fn put_object(
    api: &HttpBackend,
    target_url: &str,
    artifact: &Artifact,
) -> ApiResult<()> {
    tracing::debug!(
        "PUT {} bytes ({}) to storage",
        artifact.bytes.len(),
        artifact.content_type
    );
    let response = api
        .client()
        .put(target_url)
        .header(CONTENT_TYPE, artifact.content_type.as_str())
        .body(artifact.bytes.clone())
        .send()
        .await
        .map_err(transport)?;
    check_status(response, Auth::Anonymous).await?;
    Ok(())
}
