use axum::{
    Json,
    extract::{Path, State},
};

use nothingfeed_types::api::ProfileResponse;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};

const RECENT_DELETIONS: u32 = 20;

/// GET /api/profile/{handle}: public identity, lifetime totals and the most
/// recent deletions. Totals read as zero until the first deletion.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let handle = handle.trim().to_lowercase();

    let found = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_handle(&handle)? else {
            return Ok(None);
        };
        let stats = db.get_stats(&user.id)?;
        let deletions = db.get_deletions_by_author(&user.id, RECENT_DELETIONS)?;
        Ok(Some((user, stats, deletions)))
    })
    .await?;

    let (user, stats, deletions) =
        found.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        user: convert::profile_user(user),
        stats: stats.map(convert::totals).unwrap_or_default(),
        deletions: deletions.into_iter().map(convert::deletion).collect(),
    }))
}
