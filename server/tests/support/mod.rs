#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::UserRole;
use exchange_server::auth_token::TokenSigner;
use exchange_server::db::{Database, ItemRecord, TokenRepository, UserRecord};
use exchange_server::middleware::AccessPolicy;
use exchange_server::session::TokenService;
use uuid::Uuid;

pub const SIGNING_KEY: &[u8] = b"integration-signing-key-0123456789abcdef";
pub const TTL: Duration = Duration::from_secs(12 * 3600);

pub async fn database() -> Database {
    Database::in_memory().await.expect("in-memory database")
}

pub fn signer() -> TokenSigner {
    TokenSigner::new(SIGNING_KEY.to_vec(), TTL).expect("signer")
}

pub fn token_service(db: &Database) -> TokenService {
    let repo: Arc<dyn TokenRepository> = Arc::new(db.tokens());
    TokenService::new(signer(), repo)
}

pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new(vec!["/api/admin".to_string()])
}

pub async fn seed_item(db: &Database, name: &str) -> Uuid {
    let item = ItemRecord::new(name.to_string(), "common".to_string(), None);
    db.items().create(&item).await.expect("seed item");
    item.id
}

pub async fn seed_items(db: &Database, count: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        ids.push(seed_item(db, &format!("item-{n}")).await);
    }
    ids
}

/// Inserts a user without paying for a bcrypt hash; such users cannot log in.
pub async fn seed_user(db: &Database, role: UserRole) -> Uuid {
    let id = Uuid::new_v4();
    let user = UserRecord {
        id,
        username: format!("user-{}", id.simple()),
        email: format!("{}@example.test", id.simple()),
        password_hash: "not-a-hash".to_string(),
        role: role.as_str().to_string(),
        created_at: Utc::now(),
    };
    db.users().create(&user).await.expect("seed user");
    id
}

pub fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}
