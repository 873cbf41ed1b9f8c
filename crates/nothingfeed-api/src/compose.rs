use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use nothingfeed_analysis::{analyze_submission, format_deletion_summary};
use nothingfeed_db::format_timestamp;
use nothingfeed_types::api::{Claims, ComposeRequest, ComposeResponse};

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};
use crate::validation;

/// POST /api/compose: measure the post, throw it away, keep the counts.
///
/// The request body is dropped as soon as it has been analyzed; only the
/// counts reach the store and the logs.
pub async fn compose(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ComposeRequest>, ApiError>,
) -> ApiResult<Json<ComposeResponse>> {
    validation::compose(&req, state.max_text_length)?;

    let analysis = analyze_submission(&req.text, &req.images, &req.links)?;
    drop(req);

    let deletion_id = Uuid::new_v4();
    let author_id = claims.sub;
    let created_at = format_timestamp(chrono::Utc::now());

    // A session can outlive its account.
    let row = run_db(&state, move |db| {
        db.record_deletion(&deletion_id.to_string(), &author_id.to_string(), &analysis, &created_at)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    info!(
        deletion_id = %deletion_id,
        user_id = %author_id,
        chars = analysis.char_count,
        words = analysis.word_count,
        images = analysis.image_count,
        links = analysis.link_count,
        "Deletion recorded"
    );

    Ok(Json(ComposeResponse {
        message: format_deletion_summary(&analysis),
        deletion: convert::feed_item(row),
    }))
}
