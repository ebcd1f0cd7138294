use chrono::{DateTime, TimeZone, Utc};
use common::{Item, UserProfile, UserRole};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ExchangeError, Result};

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: String, email: String, password: &str, role: UserRole) -> Result<Self> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

        Ok(Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }

    pub fn role(&self) -> Result<UserRole> {
        self.role.parse().map_err(|_| {
            ExchangeError::Internal(format!("user {} has unknown role '{}'", self.id, self.role))
        })
    }

    pub fn to_profile(&self) -> Result<UserProfile> {
        Ok(UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRecord {
    pub id: Uuid,
    pub name: String,
    pub rarity: String,
    pub description: Option<String>,
}

impl ItemRecord {
    pub fn new(name: String, rarity: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            rarity,
            description,
        }
    }
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        Item {
            id: record.id,
            name: record.name,
            rarity: record.rarity,
            description: record.description,
        }
    }
}

/// One persisted bearer credential, current for a (user, client) pair.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at_ms: i64,
    pub user_agent: String,
    pub user_role: String,
}

impl TokenRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.expires_at_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = UserRecord::new(
            "trader".to_string(),
            "trader@example.com".to_string(),
            "password123",
            UserRole::User,
        )
        .unwrap();
        assert_eq!(user.username, "trader");
        assert_ne!(user.password_hash, "password123");
        assert_eq!(user.role().unwrap(), UserRole::User);
    }

    #[test]
    fn test_verify_password_correct() {
        let user = UserRecord::new(
            "trader".to_string(),
            "trader@example.com".to_string(),
            "password123",
            UserRole::User,
        )
        .unwrap();
        assert!(user.verify_password("password123").unwrap());
        assert!(!user.verify_password("wrongpassword").unwrap());
    }

    #[test]
    fn test_profile_hides_hash() {
        let user = UserRecord::new(
            "root".to_string(),
            "root@example.com".to_string(),
            "password123",
            UserRole::Admin,
        )
        .unwrap();
        let profile = user.to_profile().unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_token_expiry_instant() {
        let record = TokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            expires_at_ms: 1_700_000_000_000,
            user_agent: "curl/8".to_string(),
            user_role: "user".to_string(),
        };
        assert_eq!(record.expires_at().timestamp_millis(), 1_700_000_000_000);
    }
}
