use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use nothingfeed_types::api::FeedResponse;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Id of the last item of the previous page.
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Requested page size, clamped to `1..=MAX_PAGE_SIZE`.
pub fn page_size(requested: Option<i64>) -> u32 {
    requested.map_or(DEFAULT_PAGE_SIZE, |n| {
        u32::try_from(n.clamp(1, i64::from(MAX_PAGE_SIZE))).unwrap_or(DEFAULT_PAGE_SIZE)
    })
}

/// GET /api/feed: newest deletions first, cursor-paginated.
pub async fn get_feed(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, ApiError>,
) -> ApiResult<Json<FeedResponse>> {
    let limit = page_size(query.limit);
    let cursor = query.cursor.filter(|c| !c.is_empty());

    // One extra row tells us whether another page exists.
    let mut rows = run_db(&state, move |db| db.get_feed(cursor.as_deref(), limit + 1))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid cursor".to_string()))?;

    let has_more = rows.len() > limit as usize;
    rows.truncate(limit as usize);

    let items: Vec<_> = rows.into_iter().map(convert::feed_item).collect();
    let next_cursor = if has_more {
        items.last().map(|item| item.deletion.id)
    } else {
        None
    };

    Ok(Json(FeedResponse {
        items,
        has_more,
        next_cursor,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_and_clamps() {
        assert_eq!(page_size(None), 20);
        assert_eq!(page_size(Some(10)), 10);
        assert_eq!(page_size(Some(500)), 50);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(-3)), 1);
    }
}
