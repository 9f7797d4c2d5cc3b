//! Upload Transaction
//!
//! Three strictly sequential phases: obtain an upload authorization,
//! transfer the artifact to the authorized target, confirm completion with
//! the artifact key. Each attempt starts from the authorization phase; an
//! authorization is consumed by its transfer and never kept around.

use thiserror::Error;

use crate::commands::Backend;
use crate::credential::Credential;
use crate::error::ApiError;
use crate::models::{Artifact, UploadAuthorization};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionPhase {
    #[default]
    Idle,
    AuthorizingUpload,
    TransferringArtifact,
    ConfirmingCompletion,
    Succeeded,
    Failed(FailedPhase),
}

impl TransactionPhase {
    /// A phase is awaiting its response
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TransactionPhase::AuthorizingUpload
                | TransactionPhase::TransferringArtifact
                | TransactionPhase::ConfirmingCompletion
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedPhase {
    Authorizing,
    Transfer,
    Confirm,
}

impl std::fmt::Display for FailedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailedPhase::Authorizing => write!(f, "upload authorization"),
            FailedPhase::Transfer => write!(f, "artifact transfer"),
            FailedPhase::Confirm => write!(f, "completion confirmation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{phase} failed: {source}")]
pub struct TransactionError {
    pub phase: FailedPhase,
    #[source]
    pub source: ApiError,
}

impl TransactionError {
    /// The platform rejected the credential. The storage target refusing a
    /// transfer says nothing about the session.
    pub fn is_session_failure(&self) -> bool {
        self.phase != FailedPhase::Transfer && self.source.is_authorization_failure()
    }

    /// Whether the artifact is stored while the task is still pending
    pub fn is_inconsistent(&self) -> bool {
        self.phase == FailedPhase::Confirm
    }

    pub fn user_message(&self) -> String {
        let detail = self.source.user_message();
        match self.phase {
            FailedPhase::Authorizing => format!("Could not start upload: {}", detail),
            FailedPhase::Transfer => format!("Upload failed: {}", detail),
            FailedPhase::Confirm => format!("File uploaded but confirmation failed: {}", detail),
        }
    }
}

/// Acknowledged completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub task_id: u32,
    pub file_key: String,
}

pub struct UploadTransaction<'a> {
    backend: &'a dyn Backend,
    credential: &'a Credential,
}

impl<'a> UploadTransaction<'a> {
    pub fn new(backend: &'a dyn Backend, credential: &'a Credential) -> Self {
        Self {
            backend,
            credential,
        }
    }

    /// Run one attempt for `task_id`, reporting every phase entered to `on_phase`
    pub async fn run<F>(
        &self,
        task_id: u32,
        artifact: &Artifact,
        mut on_phase: F,
    ) -> Result<CompletionReceipt, TransactionError>
    where
        F: FnMut(TransactionPhase) + Send,
    {
        on_phase(TransactionPhase::AuthorizingUpload);
        tracing::info!("Task {}: requesting upload authorization for {}", task_id, artifact.file_name);
        let authorization = match self
            .backend
            .request_upload_authorization(self.credential, &artifact.file_name)
            .await
        {
            Ok(authorization) => authorization,
            Err(source) => return Err(fail(&mut on_phase, task_id, FailedPhase::Authorizing, source)),
        };

        // Moved out here so no later step can reach the authorization again
        let UploadAuthorization { url, file_key } = authorization;

        on_phase(TransactionPhase::TransferringArtifact);
        tracing::info!("Task {}: transferring {} bytes", task_id, artifact.bytes.len());
        if let Err(source) = self.backend.transfer_artifact(&url, artifact).await {
            return Err(fail(&mut on_phase, task_id, FailedPhase::Transfer, source));
        }

        on_phase(TransactionPhase::ConfirmingCompletion);
        tracing::info!("Task {}: confirming completion with {}", task_id, file_key);
        if let Err(source) = self
            .backend
            .confirm_task_completion(self.credential, task_id, &file_key)
            .await
        {
            tracing::error!(
                "Task {}: artifact {} stored but completion not recorded",
                task_id,
                file_key
            );
            return Err(fail(&mut on_phase, task_id, FailedPhase::Confirm, source));
        }

        on_phase(TransactionPhase::Succeeded);
        tracing::info!("Task {}: completed", task_id);
        Ok(CompletionReceipt { task_id, file_key })
    }
}

fn fail<F: FnMut(TransactionPhase)>(
    on_phase: &mut F,
    task_id: u32,
    phase: FailedPhase,
    source: ApiError,
) -> TransactionError {
    tracing::warn!("Task {}: {} failed: {}", task_id, phase, source);
    on_phase(TransactionPhase::Failed(phase));
    TransactionError { phase, source }
}
