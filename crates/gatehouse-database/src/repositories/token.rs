//! Refresh-token repository implementation.

use chrono::Utc;
use sqlx::PgPool;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::{NewToken, Token};

/// Repository for refresh-token rows. Deletion is soft.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Create a new token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a live token by id.
    pub async fn find_live_by_id(&self, id: i64) -> AppResult<Option<Token>> {
        sqlx::query_as::<_, Token>(
            "SELECT * FROM user_tokens WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find token", e))
    }

    /// Insert a token row.
    pub async fn create(&self, data: &NewToken) -> AppResult<Token> {
        sqlx::query_as::<_, Token>(
            r#"INSERT INTO user_tokens (user_id, device, remark, hash, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *"#,
        )
        .bind(data.user_id)
        .bind(&data.device)
        .bind(&data.remark)
        .bind(&data.hash)
        .bind(data.issued_at)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create token", e))
    }

    /// Soft-delete every live token for a `(user, device)` pair.
    pub async fn soft_delete(&self, user_id: i64, device: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_tokens SET deleted_at = $3 WHERE user_id = $1 AND device = $2 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(device)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete tokens", e))?;
        Ok(result.rows_affected())
    }
}
