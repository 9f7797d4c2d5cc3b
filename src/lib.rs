//! Snapstronaut Client
//!
//! Session gating, concurrent dashboard loading and the three-phase proof
//! upload, plus the view state they keep in step with the platform.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod session;
pub mod store;
pub mod track;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{Backend, HttpBackend, OpenNotifyFeed, PositionFeed};
pub use config::ClientConfig;
pub use context::Dashboard;
pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{ApiError, ClientError};
pub use session::SessionGate;
pub use store::ViewState;
pub use track::Tracker;
