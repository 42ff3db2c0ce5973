use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::approval::ApprovalStatus;
use crate::AppState;

#[derive(Deserialize)]
pub struct ApproveParams {
    pub token: Option<String>,
}

const APPROVED_PAGE: &str = "<h3>✅ Approved — Jenkins job triggered.</h3><p>Thank you.</p>";

/// GET /approve?token=... — redeem an approval token.
///
/// Validation order matters: expiry is checked before current status, so a
/// stale PENDING record is reclassified as EXPIRED on first access instead
/// of staying approvable. The PENDING→APPROVED transition is a conditional
/// update, so concurrent redemptions of one token cannot both reach Jenkins.
/// APPROVED is written before the trigger call and corrected to
/// TRIGGER_FAILED on failure; the token is spent either way.
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApproveParams>,
) -> Result<Html<&'static str>, AppError> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingToken)?;

    let record = state
        .db
        .get_approval(&token)
        .await?
        .ok_or(AppError::TokenNotFound)?;

    let now = chrono::Utc::now().timestamp();
    if now > record.expires_at {
        state.db.set_status(&token, ApprovalStatus::Expired).await?;
        tracing::info!(domain = %record.domain, "redemption of expired token");
        return Err(AppError::TokenExpired);
    }

    if !state.db.claim_pending(&token).await? {
        // Already decided, or a concurrent redemption won the claim.
        // Re-read so the conflict reports the status the winner left.
        let current = state
            .db
            .get_approval(&token)
            .await?
            .map(|r| r.status)
            .unwrap_or(record.status);
        return Err(AppError::AlreadyDecided(current));
    }

    tracing::info!(
        domain = %record.domain,
        owner = %record.owner,
        "token approved, triggering Jenkins"
    );

    let outcome = state.jenkins.trigger_build().await;
    if !outcome.ok {
        state
            .db
            .set_status(&token, ApprovalStatus::TriggerFailed)
            .await?;
        tracing::warn!(domain = %record.domain, detail = %outcome.detail, "Jenkins trigger failed");
        return Err(AppError::TriggerFailed {
            status: outcome.status,
            detail: outcome.detail,
        });
    }

    tracing::info!(domain = %record.domain, detail = %outcome.detail, "Jenkins job triggered");
    Ok(Html(APPROVED_PAGE))
}
