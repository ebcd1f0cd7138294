use std::collections::HashSet;

use common::UserRole;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::models::{ItemRecord, UserRecord};
use crate::error::{ExchangeError, Result};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(ExchangeError::during("user.create"))?;

        log::info!("Created user {} ({})", user.id, user.email);
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ExchangeError::during("user.find_by_id"))?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(ExchangeError::during("user.find_by_email"))?;
        Ok(user)
    }

    pub async fn find_all(&self) -> Result<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(ExchangeError::during("user.find_all"))?;
        Ok(users)
    }

    pub async fn update_role(&self, id: Uuid, role: UserRole) -> Result<()> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("user.update_role"))?;

        if result.rows_affected() == 0 {
            return Err(ExchangeError::NotFound(format!("user {id}")));
        }

        log::info!("User {} role set to {}", id, role);
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("user.delete"))?;

        if result.rows_affected() == 0 {
            return Err(ExchangeError::NotFound(format!("user {id}")));
        }

        log::info!("Deleted user {}", id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct ItemStore {
    pool: SqlitePool,
}

impl ItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, item: &ItemRecord) -> Result<()> {
        sqlx::query("INSERT INTO item (id, name, rarity, description) VALUES (?, ?, ?, ?)")
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.rarity)
            .bind(&item.description)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("item.create"))?;

        log::info!("Created item {} ({})", item.id, item.name);
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ItemRecord>> {
        let item = sqlx::query_as::<_, ItemRecord>("SELECT * FROM item WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ExchangeError::during("item.find_by_id"))?;
        Ok(item)
    }

    pub async fn find_all(&self) -> Result<Vec<ItemRecord>> {
        let items = sqlx::query_as::<_, ItemRecord>("SELECT * FROM item ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(ExchangeError::during("item.find_all"))?;
        Ok(items)
    }

    /// Returns the ids from `ids` that have no item row, in input order.
    pub async fn missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM item WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: HashSet<Uuid> = query
            .build_query_scalar::<Uuid>()
            .fetch_all(&self.pool)
            .await
            .map_err(ExchangeError::during("item.missing"))?
            .into_iter()
            .collect();

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("item.delete"))?;

        if result.rows_affected() == 0 {
            return Err(ExchangeError::NotFound(format!("item {id}")));
        }

        log::info!("Deleted item {}", id);
        Ok(())
    }
}
