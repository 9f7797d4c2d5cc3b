//! Task Commands
//!
//! Pending tasks, recent completions and completion confirmation.

use serde::Serialize;

use super::http::HttpBackend;
use crate::credential::Credential;
use crate::error::ApiResult;
use crate::models::{CompletedTask, PendingTask};

#[derive(Serialize)]
struct CompleteTaskArgs<'a> {
    file_key: &'a str,
}

pub(super) async fn list_not_completed(
    api: &HttpBackend,
    credential: &Credential,
) -> ApiResult<Vec<PendingTask>> {
    api.get_json("/api/tasks/not-completed", credential).await
}

pub(super) async fn list_recent_completions(
    api: &HttpBackend,
    credential: &Credential,
    count: u32,
) -> ApiResult<Vec<CompletedTask>> {
    api.get_json(&format!("/api/user-tasks/recent/{}", count), credential)
        .await
}

/// Ack only; the response body is ignored
pub(super) async fn complete_task(
    api: &HttpBackend,
    credential: &Credential,
    task_id: u32,
    file_key: &str,
) -> ApiResult<()> {
    api.post_json(
        &format!("/api/tasks/{}/complete", task_id),
        Some(credential),
        &CompleteTaskArgs { file_key },
    )
    .await?;
    Ok(())
}
