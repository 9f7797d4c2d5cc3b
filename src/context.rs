//! Dashboard Controller
//!
//! Owns the view store and is the only place its transitions happen:
//! mounting through the session gate, task selection, the completion
//! transaction and the teardown that follows any rejected credential.

use std::sync::Arc;

use tokio::sync::watch;

use crate::aggregate::{AggregateOutcome, DataAggregator, FetchPlan, Slot};
use crate::commands::Backend;
use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::{ClientError, UserInputError};
use crate::models::Artifact;
use crate::session::{Admission, SessionGate, View};
use crate::store::{
    new_view_store, store_commit_snapshot, store_fail_transaction, store_finish_completion,
    store_set_phase, store_sign_out, LoadStatus, Selection, StatusMessage, ViewState, ViewStore,
};
use crate::upload::{CompletionReceipt, TransactionPhase, UploadTransaction};

pub const COMPLETION_SUCCESS: &str = "Task completed successfully!";

pub struct Dashboard {
    backend: Arc<dyn Backend>,
    gate: SessionGate,
    aggregator: DataAggregator,
    store: ViewStore,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn Backend>, gate: SessionGate, config: &ClientConfig) -> Self {
        Self::with_completion_count(backend, gate, config.recent_completions)
    }

    pub fn with_completion_count(
        backend: Arc<dyn Backend>,
        gate: SessionGate,
        completion_count: u32,
    ) -> Self {
        Self {
            aggregator: DataAggregator::new(backend.clone(), completion_count),
            backend,
            gate,
            store: new_view_store(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.store.borrow().clone()
    }

    fn epoch(&self) -> u64 {
        self.store.borrow().epoch
    }

    // ========================
    // Loading
    // ========================

    /// Gate the dashboard and load every slot
    pub async fn mount(&self) -> LoadStatus {
        let Some((credential, epoch)) = self.admitted() else {
            return LoadStatus::SignedOut;
        };
        // A running submission keeps its status line
        self.store.send_modify(|state| {
            state.status = LoadStatus::Loading;
            if !state.is_submitting() {
                state.message = None;
            }
        });

        let outcome = self
            .aggregator
            .load_all(&credential, &FetchPlan::dashboard())
            .await;
        self.apply(epoch, outcome)
    }

    /// Re-fetch both task lists, keeping the profile
    pub async fn reload(&self) -> LoadStatus {
        let Some((credential, epoch)) = self.admitted() else {
            return LoadStatus::SignedOut;
        };
        let outcome = self
            .aggregator
            .refresh(&credential, &[Slot::Pending, Slot::Completed])
            .await;
        self.apply(epoch, outcome)
    }

    fn admitted(&self) -> Option<(Credential, u64)> {
        match self.gate.admit(View::Dashboard) {
            Admission::Allow(Some(credential)) => Some((credential, self.epoch())),
            _ => {
                store_sign_out(&self.store);
                None
            }
        }
    }

    fn apply(&self, epoch: u64, outcome: AggregateOutcome) -> LoadStatus {
        if epoch != self.epoch() {
            tracing::info!("Session ended while loading, dropping the result");
            return LoadStatus::SignedOut;
        }
        match outcome {
            AggregateOutcome::Ready(snapshot) => {
                tracing::info!(
                    "Dashboard ready ({} degraded slot(s))",
                    snapshot.degraded.len()
                );
                store_commit_snapshot(&self.store, epoch, snapshot);
                LoadStatus::Ready
            }
            AggregateOutcome::SessionInvalid => {
                self.teardown(epoch);
                LoadStatus::SignedOut
            }
            AggregateOutcome::IdentityUnavailable(error) => {
                let text = format!("Could not load your profile: {}", error.user_message());
                self.store.send_modify(|state| {
                    state.status = LoadStatus::Unavailable;
                    if !state.is_submitting() {
                        state.message = Some(StatusMessage::error(text));
                    }
                });
                LoadStatus::Unavailable
            }
        }
    }

    /// Clear the credential and every piece of session-derived state.
    /// A teardown for an epoch that already ended must not touch a newer session.
    fn teardown(&self, epoch: u64) {
        if epoch != self.epoch() {
            return;
        }
        let redirect = self.gate.reject();
        tracing::warn!("Session rejected, redirecting to {:?}", redirect);
        store_sign_out(&self.store);
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.gate.revoke()?;
        store_sign_out(&self.store);
        Ok(())
    }

    // ========================
    // Selection
    // ========================

    pub fn select_task(&self, task_id: u32) -> Result<(), UserInputError> {
        let mut result = Ok(());
        self.store.send_if_modified(|state| {
            if state.is_submitting() {
                result = Err(UserInputError::TransactionInFlight);
                return false;
            }
            let Some(task) = state.find_pending(task_id).cloned() else {
                result = Err(UserInputError::UnknownTask(task_id));
                return false;
            };
            state.selection = Some(Selection {
                task,
                artifact: None,
            });
            state.phase = TransactionPhase::Idle;
            state.message = None;
            true
        });
        result
    }

    pub fn attach_file(&self, artifact: Artifact) -> Result<(), UserInputError> {
        let mut result = Ok(());
        self.store.send_if_modified(|state| {
            if state.is_submitting() {
                result = Err(UserInputError::TransactionInFlight);
                return false;
            }
            match state.selection.as_mut() {
                Some(selection) => {
                    selection.artifact = Some(artifact);
                    true
                }
                None => {
                    result = Err(UserInputError::NoTaskSelected);
                    false
                }
            }
        });
        result
    }

    /// Close the selection; refused while a phase is in flight
    pub fn close_selection(&self) -> bool {
        let mut closed = false;
        self.store.send_if_modified(|state| {
            if state.is_submitting() || state.selection.is_none() {
                return false;
            }
            state.selection = None;
            state.phase = TransactionPhase::Idle;
            closed = true;
            true
        });
        closed
    }

    // ========================
    // Completion
    // ========================

    /// Run the upload transaction for the current selection
    pub async fn submit_completion(&self) -> Result<CompletionReceipt, ClientError> {
        let Some(credential) = self.gate.credential() else {
            store_sign_out(&self.store);
            return Err(UserInputError::NotSignedIn.into());
        };
        let (task_id, artifact, epoch) = self.begin_submission()?;

        let transaction = UploadTransaction::new(self.backend.as_ref(), &credential);
        let result = transaction
            .run(task_id, &artifact, |phase| {
                // Outcomes are committed below together with their message
                if phase.is_in_flight() {
                    store_set_phase(&self.store, epoch, phase);
                }
            })
            .await;

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(error) if error.is_session_failure() => {
                self.teardown(epoch);
                return Err(error.into());
            }
            Err(error) => {
                store_fail_transaction(&self.store, epoch, error.phase, &error.user_message());
                return Err(error.into());
            }
        };

        if epoch != self.epoch() {
            tracing::info!("Session ended during task {} completion, skipping refresh", task_id);
            return Ok(receipt);
        }
        store_set_phase(&self.store, epoch, TransactionPhase::Succeeded);
        match self
            .aggregator
            .refresh(&credential, &[Slot::Pending, Slot::Completed])
            .await
        {
            AggregateOutcome::Ready(snapshot) => {
                store_finish_completion(&self.store, epoch, snapshot, COMPLETION_SUCCESS);
            }
            AggregateOutcome::SessionInvalid => self.teardown(epoch),
            AggregateOutcome::IdentityUnavailable(_) => {
                tracing::error!("Refresh plan unexpectedly included identity");
            }
        }
        Ok(receipt)
    }

    /// Check preconditions and enter AuthorizingUpload in one step
    fn begin_submission(&self) -> Result<(u32, Artifact, u64), UserInputError> {
        let mut outcome = Err(UserInputError::NoTaskSelected);
        self.store.send_if_modified(|state| {
            if state.is_submitting() {
                outcome = Err(UserInputError::TransactionInFlight);
                return false;
            }
            let ready = state
                .selection
                .as_ref()
                .map(|s| (s.task.task_id, s.artifact.clone()));
            match ready {
                None => {
                    state.message = Some(StatusMessage::error(
                        UserInputError::NoTaskSelected.to_string(),
                    ));
                    outcome = Err(UserInputError::NoTaskSelected);
                }
                Some((_, None)) => {
                    state.message = Some(StatusMessage::error(
                        UserInputError::NoFileSelected.to_string(),
                    ));
                    outcome = Err(UserInputError::NoFileSelected);
                }
                Some((task_id, Some(artifact))) => {
                    state.phase = TransactionPhase::AuthorizingUpload;
                    state.message = Some(StatusMessage::info("Uploading..."));
                    outcome = Ok((task_id, artifact, state.epoch));
                }
            }
            true
        });
        outcome
    }
}
