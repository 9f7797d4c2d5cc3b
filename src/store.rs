//! View State Store
//!
//! Single source of truth for the dashboard, published through a
//! `tokio::sync::watch` channel so observers always see whole snapshots.

use tokio::sync::watch;

use crate::aggregate::Snapshot;
use crate::models::{Artifact, CompletedTask, PendingTask, Profile};
use crate::upload::{FailedPhase, TransactionPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    /// Identity could not be fetched; nothing was committed
    Unavailable,
    /// Session gone; the view must redirect to login
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Task chosen for completion, with the proof once attached
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub task: PendingTask,
    pub artifact: Option<Artifact>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub status: LoadStatus,
    pub profile: Option<Profile>,
    pub pending: Vec<PendingTask>,
    /// Newest first
    pub completed: Vec<CompletedTask>,
    pub selection: Option<Selection>,
    pub phase: TransactionPhase,
    pub message: Option<StatusMessage>,
    /// Bumped on every sign-out; writes tagged with an older epoch are dropped
    pub epoch: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitting(&self) -> bool {
        self.phase.is_in_flight()
    }

    pub fn find_pending(&self, task_id: u32) -> Option<&PendingTask> {
        self.pending.iter().find(|t| t.task_id == task_id)
    }

    pub fn total_pending_points(&self) -> i64 {
        self.pending.iter().map(|t| t.points as i64).sum()
    }
}

pub type ViewStore = watch::Sender<ViewState>;

pub fn new_view_store() -> ViewStore {
    watch::Sender::new(ViewState::new())
}

// ========================
// Store Helper Functions
// ========================

/// Commit a settled aggregate in one update. Slots absent from the snapshot keep their value.
pub fn store_commit_snapshot(store: &ViewStore, epoch: u64, snapshot: Snapshot) -> bool {
    store.send_if_modified(|state| {
        if state.epoch != epoch {
            return false;
        }
        apply_snapshot(state, snapshot);
        true
    })
}

/// Commit the post-completion refresh together with closing the selection
pub fn store_finish_completion(store: &ViewStore, epoch: u64, snapshot: Snapshot, message: &str) {
    store.send_if_modified(|state| {
        if state.epoch != epoch {
            return false;
        }
        apply_snapshot(state, snapshot);
        state.selection = None;
        state.phase = TransactionPhase::Idle;
        state.message = Some(StatusMessage::success(message));
        true
    });
}

/// Drop everything derived from the session and start a new epoch
pub fn store_sign_out(store: &ViewStore) {
    store.send_modify(|state| {
        *state = ViewState {
            status: LoadStatus::SignedOut,
            epoch: state.epoch + 1,
            ..ViewState::default()
        };
    });
}

/// Record a failed phase; the selection stays open for a retry
pub fn store_fail_transaction(store: &ViewStore, epoch: u64, phase: FailedPhase, message: &str) {
    store.send_if_modified(|state| {
        if state.epoch != epoch {
            return false;
        }
        state.phase = TransactionPhase::Failed(phase);
        state.message = Some(StatusMessage::error(message));
        true
    });
}

/// Set the phase; a no-op or stale write does not wake observers
pub fn store_set_phase(store: &ViewStore, epoch: u64, phase: TransactionPhase) {
    store.send_if_modified(|state| {
        if state.epoch != epoch || state.phase == phase {
            return false;
        }
        state.phase = phase;
        true
    });
}

fn apply_snapshot(state: &mut ViewState, snapshot: Snapshot) {
    if let Some(profile) = snapshot.profile {
        state.profile = Some(profile);
    }
    if let Some(pending) = snapshot.pending {
        state.pending = pending;
    }
    if let Some(completed) = snapshot.completed {
        state.completed = completed;
    }
    state.status = LoadStatus::Ready;

    // A selected task the server no longer reports cannot be completed
    if !state.is_submitting() {
        let stale = state
            .selection
            .as_ref()
            .is_some_and(|s| !state.pending.iter().any(|t| t.task_id == s.task.task_id));
        if stale {
            state.selection = None;
        }
    }
}
