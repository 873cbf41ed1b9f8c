use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use nothingfeed_analysis::NoContent;
use nothingfeed_types::api::{ErrorResponse, FieldIssue};

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a handler can fail with. Rendered as `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input")]
    InvalidInput(Vec<FieldIssue>),

    #[error("{0}")]
    BadRequest(String),

    /// The submission had nothing measurable in it.
    #[error("Please add some content to delete")]
    NoContent,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests. Please try again later.")]
    TooManyRequests,

    /// Store or runtime failure. Details are logged, never sent.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::BadRequest(_) | Self::NoContent => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NoContent> for ApiError {
    fn from(_: NoContent) -> Self {
        Self::NoContent
    }
}

/// Malformed, mistyped or incomplete JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        Self::InvalidInput(vec![FieldIssue {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Rejected query string: {}", rejection.body_text());
        Self::InvalidInput(vec![FieldIssue {
            field: "query".to_string(),
            message: rejection.body_text(),
        }])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("Request failed: {:#}", e);
        }

        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            details: match self {
                Self::InvalidInput(issues) => Some(issues),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NoContent.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TooManyRequests.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("UNIQUE constraint failed: users.email"));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn no_content_converts() {
        let err: ApiError = NoContent.into();
        assert_eq!(err.to_string(), "Please add some content to delete");
    }
}
