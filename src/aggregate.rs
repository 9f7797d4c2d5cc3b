//! Dashboard Aggregate
//!
//! Issues the identity, pending and completed fetches concurrently and
//! settles them under one partial-failure policy:
//!
//! - an authorization failure on any member invalidates the session
//! - a failed identity fetch leaves nothing to commit
//! - any other failed member degrades to an empty list

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use crate::commands::Backend;
use crate::credential::Credential;
use crate::error::{ApiError, ApiResult};
use crate::models::{CompletedTask, PendingTask, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Identity,
    Pending,
    Completed,
}

/// Members requested by one load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    slots: BTreeSet<Slot>,
}

impl FetchPlan {
    /// Full dashboard load
    pub fn dashboard() -> Self {
        Self {
            slots: [Slot::Identity, Slot::Pending, Slot::Completed].into_iter().collect(),
        }
    }

    /// Post-completion refresh; identity is never re-fetched here
    pub fn refresh(subset: &[Slot]) -> Self {
        Self {
            slots: subset.iter().copied().filter(|s| *s != Slot::Identity).collect(),
        }
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.contains(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Settled values. `None` marks a member that was not part of the plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub profile: Option<Profile>,
    pub pending: Option<Vec<PendingTask>>,
    pub completed: Option<Vec<CompletedTask>>,
    /// Members that failed and were replaced by an empty list
    pub degraded: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    Ready(Snapshot),
    /// The credential was rejected by at least one member
    SessionInvalid,
    /// Identity failed for a reason other than authorization
    IdentityUnavailable(ApiError),
}

enum Settled<T> {
    Value(Option<T>),
    Rejected,
    Failed(ApiError),
}

impl<T> Settled<T> {
    fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected)
    }

    fn into_value(self) -> Option<T> {
        match self {
            Settled::Value(value) => value,
            Settled::Rejected | Settled::Failed(_) => None,
        }
    }
}

pub struct DataAggregator {
    backend: Arc<dyn Backend>,
    completion_count: u32,
}

impl DataAggregator {
    pub fn new(backend: Arc<dyn Backend>, completion_count: u32) -> Self {
        Self {
            backend,
            completion_count,
        }
    }

    /// Fetch every member of `plan` concurrently and settle the results
    pub async fn load_all(&self, credential: &Credential, plan: &FetchPlan) -> AggregateOutcome {
        let backend = self.backend.as_ref();
        let (identity, pending, completed) = tokio::join!(
            when(plan.contains(Slot::Identity), backend.fetch_identity(credential)),
            when(plan.contains(Slot::Pending), backend.fetch_pending_tasks(credential)),
            when(
                plan.contains(Slot::Completed),
                backend.fetch_recent_completions(credential, self.completion_count)
            ),
        );

        let completed = completed.map(|result| {
            result.map(|records| most_recent(records, self.completion_count as usize))
        });
        settle(identity, pending, completed)
    }

    pub async fn refresh(&self, credential: &Credential, subset: &[Slot]) -> AggregateOutcome {
        self.load_all(credential, &FetchPlan::refresh(subset)).await
    }
}

async fn when<T, F>(enabled: bool, fetch: F) -> Option<ApiResult<T>>
where
    F: Future<Output = ApiResult<T>>,
{
    if enabled {
        Some(fetch.await)
    } else {
        None
    }
}

fn settle(
    identity: Option<ApiResult<Profile>>,
    pending: Option<ApiResult<Vec<PendingTask>>>,
    completed: Option<ApiResult<Vec<CompletedTask>>>,
) -> AggregateOutcome {
    let mut degraded = Vec::new();
    let identity = settle_member(Slot::Identity, identity, true, &mut degraded);
    let pending = settle_member(Slot::Pending, pending, false, &mut degraded);
    let completed = settle_member(Slot::Completed, completed, false, &mut degraded);

    if identity.is_rejected() || pending.is_rejected() || completed.is_rejected() {
        tracing::warn!("Aggregate load rejected; session invalid");
        return AggregateOutcome::SessionInvalid;
    }
    if let Settled::Failed(error) = identity {
        return AggregateOutcome::IdentityUnavailable(error);
    }

    AggregateOutcome::Ready(Snapshot {
        profile: identity.into_value(),
        pending: pending.into_value(),
        completed: completed.into_value(),
        degraded,
    })
}

fn settle_member<T: Default>(
    slot: Slot,
    result: Option<ApiResult<T>>,
    required: bool,
    degraded: &mut Vec<Slot>,
) -> Settled<T> {
    match result {
        None => Settled::Value(None),
        Some(Ok(value)) => Settled::Value(Some(value)),
        Some(Err(error)) if error.is_authorization_failure() => Settled::Rejected,
        Some(Err(error)) if required => {
            tracing::error!("{:?} fetch failed: {}", slot, error);
            Settled::Failed(error)
        }
        Some(Err(error)) => {
            tracing::warn!("{:?} fetch failed, showing empty: {}", slot, error);
            degraded.push(slot);
            Settled::Value(Some(T::default()))
        }
    }
}

/// Newest first, at most `limit`
fn most_recent(mut records: Vec<CompletedTask>, limit: usize) -> Vec<CompletedTask> {
    records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    records.truncate(limit);
    records
}
