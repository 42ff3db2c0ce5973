use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::approval::{ApprovalRecord, ApprovalStatus, NewApproval};

/// Durable store of approval records.
///
/// Lookups use `fetch_optional` so a missing token is `None`, not an error;
/// only real storage failures propagate. Status writes report whether a row
/// was touched via `rows_affected`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Insert a freshly issued record in `PENDING` state.
    /// Fails on a duplicate token: tokens are never reused.
    pub async fn insert_approval(&self, rec: &NewApproval) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO approvals (token, domain, owner, created, expires_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING')",
        )
        .bind(&rec.token)
        .bind(&rec.domain)
        .bind(&rec.owner)
        .bind(rec.created)
        .bind(rec.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_approval(&self, token: &str) -> anyhow::Result<Option<ApprovalRecord>> {
        let row = sqlx::query_as::<_, ApprovalRecord>(
            "SELECT token, domain, owner, created, expires_at, status
             FROM approvals WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Unconditional status write. The caller must already have validated
    /// the transition; the one transition that has to be race-free goes
    /// through [`SqliteStore::claim_pending`] instead.
    pub async fn set_status(&self, token: &str, status: ApprovalStatus) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE approvals SET status = ?1 WHERE token = ?2")
            .bind(status)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim a `PENDING` record for approval.
    ///
    /// Conditional update: of N concurrent redemptions of the same token,
    /// exactly one sees `rows_affected == 1` and may proceed to the trigger.
    pub async fn claim_pending(&self, token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE approvals SET status = 'APPROVED'
             WHERE token = ?1 AND status = 'PENDING'",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_approvals(&self) -> anyhow::Result<Vec<ApprovalRecord>> {
        let rows = sqlx::query_as::<_, ApprovalRecord>(
            "SELECT token, domain, owner, created, expires_at, status
             FROM approvals ORDER BY created DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
