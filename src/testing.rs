//! Test Support
//!
//! In-memory `Backend` that behaves like the platform plus its storage
//! target, with per-endpoint failure injection and a call log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use crate::commands::Backend;
use crate::credential::Credential;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Artifact, CompletedTask, LoginRequest, PendingTask, Profile, SignupRequest, TeamScore,
    UploadAuthorization,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Endpoint {
    Authenticate,
    Register,
    Identity,
    Pending,
    Completions,
    Authorize,
    Transfer,
    Confirm,
    Leaderboard,
}

#[derive(Default)]
struct Platform {
    pending: Vec<PendingTask>,
    completed: Vec<CompletedTask>,
    teams: Vec<TeamScore>,
    issued: HashMap<String, String>,
    used_targets: HashSet<String>,
    stored_keys: Vec<String>,
    transfer_targets: Vec<String>,
    confirmed: Vec<(u32, String)>,
}

pub(crate) struct FakeBackend {
    calls: Mutex<Vec<Endpoint>>,
    failures: Mutex<HashMap<Endpoint, VecDeque<ApiError>>>,
    platform: Mutex<Platform>,
    next_id: AtomicU32,
    transfer_hold: Mutex<Option<Arc<Notify>>>,
}

pub(crate) fn pending_task(task_id: u32, name: &str, points: i32) -> PendingTask {
    PendingTask {
        task_id,
        task_name: name.to_string(),
        description: Some(format!("{} for the crew", name)),
        points,
        user_id: None,
    }
}

impl FakeBackend {
    /// Two pending tasks, one past completion, two teams
    pub fn new() -> Self {
        let completed_at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        let platform = Platform {
            pending: vec![
                pending_task(1, "Spacewalk", 10),
                pending_task(2, "Moon photo", 20),
            ],
            completed: vec![CompletedTask {
                user_task_id: 100,
                task_id: Some(9),
                task_name: "Launch".to_string(),
                completed_at,
                photo_url: Some("https://bucket.test/launch.png".to_string()),
                user_id: Some(1),
            }],
            teams: vec![
                TeamScore {
                    team_name: "Apollo".to_string(),
                    total_points: 15,
                },
                TeamScore {
                    team_name: "Gemini".to_string(),
                    total_points: 40,
                },
            ],
            ..Default::default()
        };

        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            platform: Mutex::new(platform),
            next_id: AtomicU32::new(1),
            transfer_hold: Mutex::new(None),
        }
    }

    /// Queue a failure for the next call to `endpoint`
    pub fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    /// Park every transfer until the returned handle is notified
    pub fn hold_transfers(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.transfer_hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls().iter().filter(|c| **c == endpoint).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.platform.lock().unwrap().stored_keys.clone()
    }

    pub fn transfer_targets(&self) -> Vec<String> {
        self.platform.lock().unwrap().transfer_targets.clone()
    }

    pub fn confirmed(&self) -> Vec<(u32, String)> {
        self.platform.lock().unwrap().confirmed.clone()
    }

    pub fn set_teams(&self, teams: Vec<TeamScore>) {
        self.platform.lock().unwrap().teams = teams;
    }

    fn enter(&self, endpoint: Endpoint) -> ApiResult<()> {
        self.calls.lock().unwrap().push(endpoint);
        let queued = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|q| q.pop_front());
        match queued {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn authenticate(&self, request: &LoginRequest) -> ApiResult<String> {
        self.enter(Endpoint::Authenticate)?;
        Ok(format!("token-for-{}", request.email))
    }

    async fn register(&self, _request: &SignupRequest) -> ApiResult<()> {
        self.enter(Endpoint::Register)
    }

    async fn fetch_identity(&self, _credential: &Credential) -> ApiResult<Profile> {
        self.enter(Endpoint::Identity)?;
        Ok(Profile {
            email: String::new(),
            message: "Hello user 1".to_string(),
            user_since: "2024-01-01 00:00:00".to_string(),
        })
    }

    async fn fetch_pending_tasks(&self, _credential: &Credential) -> ApiResult<Vec<PendingTask>> {
        self.enter(Endpoint::Pending)?;
        Ok(self.platform.lock().unwrap().pending.clone())
    }

    async fn fetch_recent_completions(
        &self,
        _credential: &Credential,
        count: u32,
    ) -> ApiResult<Vec<CompletedTask>> {
        self.enter(Endpoint::Completions)?;
        let platform = self.platform.lock().unwrap();
        Ok(platform.completed.iter().take(count as usize).cloned().collect())
    }

    async fn request_upload_authorization(
        &self,
        _credential: &Credential,
        file_name: &str,
    ) -> ApiResult<UploadAuthorization> {
        self.enter(Endpoint::Authorize)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let authorization = UploadAuthorization {
            url: format!("https://storage.test/upload/{}", id),
            file_key: format!("{}_{}", id, file_name),
        };
        self.platform
            .lock()
            .unwrap()
            .issued
            .insert(authorization.url.clone(), authorization.file_key.clone());
        Ok(authorization)
    }

    async fn transfer_artifact(&self, target_url: &str, _artifact: &Artifact) -> ApiResult<()> {
        // Every attempt is recorded, including ones that fail below
        self.platform
            .lock()
            .unwrap()
            .transfer_targets
            .push(target_url.to_string());
        self.enter(Endpoint::Transfer)?;
        let hold = self.transfer_hold.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }

        let mut platform = self.platform.lock().unwrap();
        let key = platform.issued.get(target_url).cloned().ok_or(ApiError::Status {
            status: 403,
            message: "unknown upload target".to_string(),
        })?;
        if !platform.used_targets.insert(target_url.to_string()) {
            return Err(ApiError::Status {
                status: 403,
                message: "upload target already used".to_string(),
            });
        }
        platform.stored_keys.push(key);
        Ok(())
    }

    async fn confirm_task_completion(
        &self,
        _credential: &Credential,
        task_id: u32,
        file_key: &str,
    ) -> ApiResult<()> {
        self.enter(Endpoint::Confirm)?;
        let mut platform = self.platform.lock().unwrap();
        if !platform.stored_keys.iter().any(|k| k == file_key) {
            return Err(ApiError::Status {
                status: 400,
                message: "File key is required".to_string(),
            });
        }
        let index = platform
            .pending
            .iter()
            .position(|t| t.task_id == task_id)
            .ok_or(ApiError::Status {
                status: 404,
                message: "Task not found".to_string(),
            })?;
        let task = platform.pending.remove(index);
        let completed_at = NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(12, 0, task_id % 60))
            .unwrap();
        let user_task_id = 200 + platform.confirmed.len() as u32;
        platform.completed.insert(
            0,
            CompletedTask {
                user_task_id,
                task_id: Some(task.task_id),
                task_name: task.task_name,
                completed_at,
                photo_url: Some(format!("https://bucket.test/{}", file_key)),
                user_id: Some(1),
            },
        );
        platform.confirmed.push((task_id, file_key.to_string()));
        Ok(())
    }

    async fn fetch_leaderboard(&self, _credential: &Credential) -> ApiResult<Vec<TeamScore>> {
        self.enter(Endpoint::Leaderboard)?;
        Ok(self.platform.lock().unwrap().teams.clone())
    }
}
