use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::approval::ApprovalStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing token")]
    MissingToken,

    #[error("token not found")]
    TokenNotFound,

    #[error("token expired")]
    TokenExpired,

    #[error("token already {0}")]
    AlreadyDecided(ApprovalStatus),

    #[error("failed to trigger jenkins: {detail}")]
    TriggerFailed {
        status: Option<u16>,
        detail: String,
    },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingToken => (StatusCode::BAD_REQUEST, "Missing token".to_string()),
            AppError::TokenNotFound => (StatusCode::NOT_FOUND, "Token not found".to_string()),
            AppError::TokenExpired => (StatusCode::GONE, "Token expired".to_string()),
            AppError::AlreadyDecided(current) => {
                (StatusCode::CONFLICT, format!("Token already {current}"))
            }
            AppError::TriggerFailed { status, detail } => {
                // Prefer the downstream status code in the body; transport
                // failures have no code, so the diagnostic stands in.
                let code = status.map(|c| c.to_string()).unwrap_or(detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to trigger Jenkins: {code}"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, body).into_response()
    }
}
