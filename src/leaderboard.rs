//! Team Leaderboard
//!
//! Protected view listing every team's total points, highest first.

use crate::commands::Backend;
use crate::error::{ClientError, UserInputError};
use crate::models::TeamScore;
use crate::session::{Admission, SessionGate, View};

/// Fetch and rank the leaderboard. A rejected credential is cleared.
pub async fn load_leaderboard(
    backend: &dyn Backend,
    gate: &SessionGate,
) -> Result<Vec<TeamScore>, ClientError> {
    let credential = match gate.admit(View::Leaderboard) {
        Admission::Allow(Some(credential)) => credential,
        _ => return Err(UserInputError::NotSignedIn.into()),
    };

    match backend.fetch_leaderboard(&credential).await {
        Ok(teams) => Ok(rank_teams(teams)),
        Err(e) if e.is_authorization_failure() => {
            gate.reject();
            Err(e.into())
        }
        Err(e) => {
            tracing::warn!("Failed to fetch team scores: {}", e);
            Err(e.into())
        }
    }
}

/// Highest total first; ties keep alphabetical order
pub fn rank_teams(mut teams: Vec<TeamScore>) -> Vec<TeamScore> {
    teams.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
    teams
}
