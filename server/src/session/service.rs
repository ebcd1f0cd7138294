use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::UserRole;
use uuid::Uuid;

use crate::auth_token::{TokenClaims, TokenError, TokenSigner};
use crate::db::{TokenRecord, TokenRepository};
use crate::error::{ExchangeError, Result};

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Whether an existing row for this client was refreshed instead of a new one inserted.
    pub reused: bool,
}

/// Issues, validates and revokes bearer tokens.
///
/// Validation is purely cryptographic and never reads storage; a token
/// removed by logout stays acceptable to [`TokenService::validate`] until it
/// expires.
#[derive(Clone)]
pub struct TokenService {
    signer: TokenSigner,
    repo: Arc<dyn TokenRepository>,
}

impl TokenService {
    pub fn new(signer: TokenSigner, repo: Arc<dyn TokenRepository>) -> Self {
        Self { signer, repo }
    }

    pub async fn issue(&self, user_id: Uuid, role: UserRole, fingerprint: &str) -> Result<IssuedToken> {
        self.issue_at(user_id, role, fingerprint, now_ms()).await
    }

    pub async fn issue_at(
        &self,
        user_id: Uuid,
        role: UserRole,
        fingerprint: &str,
        now_ms: i64,
    ) -> Result<IssuedToken> {
        let claims = self
            .signer
            .claims_for(user_id, role.as_str(), fingerprint, now_ms);
        let token = self
            .signer
            .sign(&claims)
            .map_err(|err| ExchangeError::Internal(format!("Failed to sign token: {err}")))?;

        let existing = self.repo.get_by_fingerprint(user_id, fingerprint).await?;
        let reused = existing.is_some();

        let record = TokenRecord {
            id: existing.map(|row| row.id).unwrap_or_else(Uuid::new_v4),
            user_id,
            token: token.clone(),
            expires_at_ms: claims.expires_at_ms,
            user_agent: fingerprint.to_string(),
            user_role: role.as_str().to_string(),
        };

        if reused {
            self.repo.update(&record).await?;
        } else {
            self.repo.create(&record).await?;
        }

        log::info!(
            "Issued token {} for user {} ({}, reused: {})",
            record.id,
            user_id,
            role,
            reused
        );

        Ok(IssuedToken {
            token,
            token_id: record.id,
            user_id,
            expires_at: record.expires_at(),
            reused,
        })
    }

    pub fn validate(&self, token: &str) -> std::result::Result<TokenClaims, TokenError> {
        self.validate_at(token, now_ms())
    }

    pub fn validate_at(
        &self,
        token: &str,
        now_ms: i64,
    ) -> std::result::Result<TokenClaims, TokenError> {
        self.signer.verify(token, now_ms)
    }

    /// Drops every token of `user_id` (sign out on all clients).
    pub async fn revoke_user(&self, user_id: Uuid) -> Result<u64> {
        let removed = self.repo.delete_by_user(user_id).await?;
        log::info!("Revoked {} token(s) for user {}", removed, user_id);
        Ok(removed)
    }

    /// Drops the token of one client of `user_id`.
    pub async fn revoke_fingerprint(&self, user_id: Uuid, fingerprint: &str) -> Result<u64> {
        let removed = self.repo.delete_by_fingerprint(user_id, fingerprint).await?;
        log::info!("Revoked {} token(s) for user {} on one client", removed, user_id);
        Ok(removed)
    }
}
