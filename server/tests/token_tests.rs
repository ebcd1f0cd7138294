mod support;

use std::time::Duration;

use common::UserRole;
use exchange_server::auth_token::{TokenError, TokenSigner};
use exchange_server::db::TokenRepository;
use exchange_server::session::now_ms;
use support::{database, seed_user, token_service, TTL};

const WINDOW_MS: i64 = TTL.as_millis() as i64;

#[tokio::test]
async fn test_issue_then_validate() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::Admin).await;

    let issued = service.issue(user, UserRole::Admin, "cli/1.0").await.unwrap();
    assert!(!issued.reused);

    let claims = service.validate(&issued.token).unwrap();
    assert_eq!(claims.user_id, user);
    assert_eq!(claims.role, "admin");
    assert_eq!(claims.user_agent, "cli/1.0");

    let stored = db.tokens().find_by_user(user).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, issued.token_id);
    assert_eq!(stored[0].token, issued.token);
    assert_eq!(stored[0].user_role, "admin");
}

#[tokio::test]
async fn test_same_client_reuses_row() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;
    let start = now_ms();

    let first = service
        .issue_at(user, UserRole::User, "browser", start)
        .await
        .unwrap();
    let second = service
        .issue_at(user, UserRole::User, "browser", start + 1_000)
        .await
        .unwrap();

    assert!(second.reused);
    assert_eq!(first.token_id, second.token_id);
    assert_ne!(first.token, second.token);

    let stored = db.tokens().find_by_user(user).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token, second.token);
    assert_eq!(stored[0].expires_at_ms, start + 1_000 + WINDOW_MS);
}

#[tokio::test]
async fn test_other_client_gets_own_row() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;

    let desktop = service.issue(user, UserRole::User, "desktop").await.unwrap();
    let phone = service.issue(user, UserRole::User, "phone").await.unwrap();

    assert!(!phone.reused);
    assert_ne!(desktop.token_id, phone.token_id);
    assert_eq!(db.tokens().find_by_user(user).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_validity_window_boundary() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;
    let issued_at = 1_700_000_000_000;

    let issued = service
        .issue_at(user, UserRole::User, "edge", issued_at)
        .await
        .unwrap();

    assert!(service
        .validate_at(&issued.token, issued_at + WINDOW_MS - 1)
        .is_ok());
    assert_eq!(
        service.validate_at(&issued.token, issued_at + WINDOW_MS),
        Err(TokenError::Expired)
    );
    assert_eq!(
        service.validate_at(&issued.token, issued_at + WINDOW_MS + 1),
        Err(TokenError::Expired)
    );
}

#[tokio::test]
async fn test_revocation_does_not_affect_validation() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;

    let issued = service.issue(user, UserRole::User, "laptop").await.unwrap();
    assert_eq!(service.revoke_user(user).await.unwrap(), 1);
    assert!(db.tokens().find_by_user(user).await.unwrap().is_empty());

    // validation is a signature check only
    assert!(service.validate(&issued.token).is_ok());
}

#[tokio::test]
async fn test_revoke_fingerprint_keeps_other_clients() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;

    service.issue(user, UserRole::User, "desktop").await.unwrap();
    let phone = service.issue(user, UserRole::User, "phone").await.unwrap();

    assert_eq!(service.revoke_fingerprint(user, "desktop").await.unwrap(), 1);
    assert_eq!(service.revoke_fingerprint(user, "desktop").await.unwrap(), 0);

    let remaining = db.tokens().find_by_user(user).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, phone.token_id);
}

#[tokio::test]
async fn test_token_from_other_key_is_rejected() {
    let db = database().await;
    let service = token_service(&db);
    let user = seed_user(&db, UserRole::User).await;

    let foreign = TokenSigner::new(
        b"a-completely-different-signing-key-0000".to_vec(),
        Duration::from_secs(3600),
    )
    .unwrap();
    let token = foreign
        .sign(&foreign.claims_for(user, "admin", "forged", now_ms()))
        .unwrap();

    assert_eq!(service.validate(&token), Err(TokenError::InvalidSignature));
}
