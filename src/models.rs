//! Client Models
//!
//! Data structures matching the platform API payloads.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp format used by the platform for every date field
pub const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Profile returned by the identity endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Not echoed by the identity endpoint; empty unless a deployment adds it
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_since: String,
}

/// A task the current user has not completed yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub task_id: u32,
    pub task_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub points: i32,
    /// Author of the task, when the server reports one
    #[serde(default)]
    pub user_id: Option<u32>,
}

/// Immutable record of a past completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub user_task_id: u32,
    #[serde(default)]
    pub task_id: Option<u32>,
    #[serde(default)]
    pub task_name: String,
    #[serde(deserialize_with = "deserialize_server_time")]
    pub completed_at: NaiveDateTime,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<u32>,
}

/// Single-use upload target handed out by the platform
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadAuthorization {
    pub url: String,
    pub file_key: String,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team_name: String,
    #[serde(default)]
    pub total_points: i64,
}

/// Position report from the tracking feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Login form
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration form
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub team_name: String,
}

/// Proof-of-completion file attached by the user
#[derive(Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Build an artifact, guessing the content type from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read an artifact from disk
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
            })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, bytes))
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Accepts the platform's `%Y-%m-%d %H:%M:%S` as well as RFC 3339
fn deserialize_server_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_server_time(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized timestamp: {}", raw))
    })
}

pub fn parse_server_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, SERVER_TIME_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}
