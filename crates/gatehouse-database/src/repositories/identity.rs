//! Provider identity repository implementation.

use sqlx::PgPool;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::UserIdentity;

use super::map_write_error;

/// Repository for `(provider, open_id)` links.
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    /// Create a new identity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an identity by its composite key.
    pub async fn find(&self, provider: &str, open_id: &str) -> AppResult<Option<UserIdentity>> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT user_id, provider, open_id, data FROM user_identities WHERE provider = $1 AND open_id = $2",
        )
        .bind(provider)
        .bind(open_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find identity", e))
    }

    /// Insert an identity link.
    pub async fn create(&self, identity: &UserIdentity) -> AppResult<UserIdentity> {
        sqlx::query_as::<_, UserIdentity>(
            r#"INSERT INTO user_identities (user_id, provider, open_id, data)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, provider, open_id, data"#,
        )
        .bind(identity.user_id)
        .bind(&identity.provider)
        .bind(&identity.open_id)
        .bind(&identity.data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create identity"))
    }

    /// Replace an identity's payload. Returns the number of rows touched.
    pub async fn update_data(
        &self,
        provider: &str,
        open_id: &str,
        data: &serde_json::Value,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_identities SET data = $3 WHERE provider = $1 AND open_id = $2",
        )
        .bind(provider)
        .bind(open_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update identity", e))?;
        Ok(result.rows_affected())
    }
}
