use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::TokenRecord;
use crate::error::{ExchangeError, Result};

/// Persistence for issued tokens. Owned by the token service and the expiry
/// sweeper; nothing else writes `user_token`.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, record: &TokenRecord) -> Result<()>;

    /// Replaces every field of the row identified by `record.id`.
    async fn update(&self, record: &TokenRecord) -> Result<()>;

    async fn get_by_fingerprint(&self, user_id: Uuid, user_agent: &str)
        -> Result<Option<TokenRecord>>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<TokenRecord>>;

    /// Rows whose expiration instant lies strictly before `now_ms`.
    async fn find_expired(&self, now_ms: i64) -> Result<Vec<TokenRecord>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64>;

    async fn delete_by_fingerprint(&self, user_id: Uuid, user_agent: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenStore {
    async fn create(&self, record: &TokenRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_token (id, user_id, token, expires_at_ms, user_agent, user_role)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at_ms)
        .bind(&record.user_agent)
        .bind(&record.user_role)
        .execute(&self.pool)
        .await
        .map_err(ExchangeError::during("token.create"))?;

        log::debug!("Created token {} for user {}", record.id, record.user_id);
        Ok(())
    }

    async fn update(&self, record: &TokenRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_token
            SET user_id = ?, token = ?, expires_at_ms = ?, user_agent = ?, user_role = ?
            WHERE id = ?
            "#,
        )
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at_ms)
        .bind(&record.user_agent)
        .bind(&record.user_role)
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(ExchangeError::during("token.update"))?;

        if result.rows_affected() == 0 {
            return Err(ExchangeError::NotFound(format!("token {}", record.id)));
        }

        log::debug!("Updated token {} for user {}", record.id, record.user_id);
        Ok(())
    }

    async fn get_by_fingerprint(
        &self,
        user_id: Uuid,
        user_agent: &str,
    ) -> Result<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM user_token WHERE user_id = ? AND user_agent = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(user_agent)
        .fetch_optional(&self.pool)
        .await
        .map_err(ExchangeError::during("token.get_by_fingerprint"))?;
        Ok(row)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<TokenRecord>> {
        let rows = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM user_token WHERE user_id = ? ORDER BY expires_at_ms",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ExchangeError::during("token.find_by_user"))?;
        Ok(rows)
    }

    async fn find_expired(&self, now_ms: i64) -> Result<Vec<TokenRecord>> {
        let rows = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM user_token WHERE expires_at_ms < ?",
        )
        .bind(now_ms)
        .fetch_all(&self.pool)
        .await
        .map_err(ExchangeError::during("token.find_expired"))?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_token WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("token.delete"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_token WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("token.delete_by_user"))?;
        Ok(result.rows_affected())
    }

    async fn delete_by_fingerprint(&self, user_id: Uuid, user_agent: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_token WHERE user_id = ? AND user_agent = ?")
            .bind(user_id)
            .bind(user_agent)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("token.delete_by_fingerprint"))?;
        Ok(result.rows_affected())
    }
}
