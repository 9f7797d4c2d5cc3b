//! Team Commands

use super::http::HttpBackend;
use crate::credential::Credential;
use crate::error::ApiResult;
use crate::models::TeamScore;

pub(super) async fn team_points(
    api: &HttpBackend,
    credential: &Credential,
) -> ApiResult<Vec<TeamScore>> {
    api.get_json("/api/teams/points", credential).await
}
