//! Platform Commands
//!
//! Async bindings to the platform API, organized by domain. The `Backend`
//! trait is the seam the orchestration layer talks to; `HttpBackend` is the
//! reqwest implementation.

mod auth;
mod feed;
mod http;
mod tasks;
mod teams;
mod upload;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::ApiResult;
use crate::models::{
    Artifact, CompletedTask, LoginRequest, PendingTask, Profile, SignupRequest, TeamScore,
    UploadAuthorization,
};

pub use feed::{OpenNotifyFeed, PositionFeed};
pub use http::HttpBackend;

/// Collaborator contracts consumed by the client core
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn authenticate(&self, request: &LoginRequest) -> ApiResult<String>;

    async fn register(&self, request: &SignupRequest) -> ApiResult<()>;

    /// The identity request; its rejection invalidates the session
    async fn fetch_identity(&self, credential: &Credential) -> ApiResult<Profile>;

    async fn fetch_pending_tasks(&self, credential: &Credential) -> ApiResult<Vec<PendingTask>>;

    async fn fetch_recent_completions(
        &self,
        credential: &Credential,
        count: u32,
    ) -> ApiResult<Vec<CompletedTask>>;

    async fn request_upload_authorization(
        &self,
        credential: &Credential,
        file_name: &str,
    ) -> ApiResult<UploadAuthorization>;

    /// Send the artifact to the authorized target. Not a platform call, no bearer.
    async fn transfer_artifact(&self, target_url: &str, artifact: &Artifact) -> ApiResult<()>;

    async fn confirm_task_completion(
        &self,
        credential: &Credential,
        task_id: u32,
        file_key: &str,
    ) -> ApiResult<()>;

    async fn fetch_leaderboard(&self, credential: &Credential) -> ApiResult<Vec<TeamScore>>;
}

#[async_trait]
impl Backend for HttpBackend {
    async fn authenticate(&self, request: &LoginRequest) -> ApiResult<String> {
        auth::login(self, request).await
    }

    async fn register(&self, request: &SignupRequest) -> ApiResult<()> {
        auth::register(self, request).await
    }

    async fn fetch_identity(&self, credential: &Credential) -> ApiResult<Profile> {
        auth::fetch_identity(self, credential).await
    }

    async fn fetch_pending_tasks(&self, credential: &Credential) -> ApiResult<Vec<PendingTask>> {
        tasks::list_not_completed(self, credential).await
    }

    async fn fetch_recent_completions(
        &self,
        credential: &Credential,
        count: u32,
    ) -> ApiResult<Vec<CompletedTask>> {
        tasks::list_recent_completions(self, credential, count).await
    }

    async fn request_upload_authorization(
        &self,
        credential: &Credential,
        file_name: &str,
    ) -> ApiResult<UploadAuthorization> {
        upload::generate_presigned_url(self, credential, file_name).await
    }

    async fn transfer_artifact(&self, target_url: &str, artifact: &Artifact) -> ApiResult<()> {
        upload::put_object(self, target_url, artifact).await
    }

    async fn confirm_task_completion(
        &self,
        credential: &Credential,
        task_id: u32,
        file_key: &str,
    ) -> ApiResult<()> {
        tasks::complete_task(self, credential, task_id, file_key).await
    }

    async fn fetch_leaderboard(&self, credential: &Credential) -> ApiResult<Vec<TeamScore>> {
        teams::team_points(self, credential).await
    }
}
