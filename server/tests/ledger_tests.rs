mod support;

use common::{TradeStatus, UserRole};
use exchange_server::error::ExchangeError;
use exchange_server::ledger::IntegrityError;
use support::{database, seed_items, seed_user, sorted};
use uuid::Uuid;

#[tokio::test]
async fn test_create_then_find_returns_both_sets() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 3).await;
    let ledger = db.trades();

    let trade_id = ledger
        .create(user, &items[..2], &items[2..])
        .await
        .unwrap();
    let trade = ledger.find_by_id(trade_id).await.unwrap();

    assert_eq!(trade.id, trade_id);
    assert_eq!(trade.user_id, user);
    assert_eq!(trade.status, TradeStatus::Pending);
    assert_eq!(sorted(trade.offered_items), sorted(items[..2].to_vec()));
    assert_eq!(trade.requested_items, vec![items[2]]);
    assert_eq!(ledger.association_count(trade_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_trade_without_items_reads_back_empty() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[], &[]).await.unwrap();
    let trade = ledger.find_by_id(trade_id).await.unwrap();

    assert!(trade.offered_items.is_empty());
    assert!(trade.requested_items.is_empty());
}

#[tokio::test]
async fn test_failed_association_rolls_back_create() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 1).await;
    let ledger = db.trades();

    // the second requested item does not exist, so its insert is rejected
    let result = ledger.create(user, &items, &[Uuid::new_v4()]).await;
    assert!(matches!(
        result,
        Err(ExchangeError::PersistenceRejected { op: "trade.create", .. })
    ));

    assert!(ledger.find_all().await.unwrap().is_empty());
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trade_item")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_update_replaces_associations() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 4).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[items[0]], &[items[1]]).await.unwrap();
    ledger
        .update(trade_id, &[items[2]], &[items[3], items[1]])
        .await
        .unwrap();

    let trade = ledger.find_by_id(trade_id).await.unwrap();
    assert_eq!(trade.offered_items, vec![items[2]]);
    assert_eq!(sorted(trade.requested_items.clone()), sorted(vec![items[3], items[1]]));
    assert!(!trade.offered_items.contains(&items[0]));
    assert!(!trade.requested_items.contains(&items[0]));
    assert_eq!(trade.status, TradeStatus::Pending);
    assert_eq!(ledger.association_count(trade_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_update_keeps_previous_associations() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 2).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[items[0]], &[items[1]]).await.unwrap();
    let result = ledger.update(trade_id, &[Uuid::new_v4()], &[]).await;
    assert!(matches!(result, Err(ExchangeError::PersistenceRejected { .. })));

    let trade = ledger.find_by_id(trade_id).await.unwrap();
    assert_eq!(trade.offered_items, vec![items[0]]);
    assert_eq!(trade.requested_items, vec![items[1]]);
}

#[tokio::test]
async fn test_update_unknown_trade_is_not_found() {
    let db = database().await;
    let items = seed_items(&db, 1).await;

    let result = db.trades().update(Uuid::new_v4(), &items, &[]).await;
    assert!(matches!(result, Err(ExchangeError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_trade_and_associations() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 2).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[items[0]], &[items[1]]).await.unwrap();
    ledger.delete(trade_id).await.unwrap();

    assert_eq!(ledger.association_count(trade_id).await.unwrap(), 0);
    assert!(matches!(
        ledger.find_by_id(trade_id).await,
        Err(ExchangeError::NotFound(_))
    ));
    assert!(matches!(
        ledger.delete(trade_id).await,
        Err(ExchangeError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_find_by_item_matches_either_role() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 4).await;
    let (shared, a, b, c) = (items[0], items[1], items[2], items[3]);
    let ledger = db.trades();

    let offering = ledger.create(user, &[shared, a], &[b]).await.unwrap();
    let requesting = ledger.create(user, &[c], &[shared]).await.unwrap();
    let unrelated = ledger.create(user, &[a], &[c]).await.unwrap();

    let trades = ledger.find_by_item_id(shared).await.unwrap();
    let ids: Vec<Uuid> = trades.iter().map(|t| t.id).collect();
    assert_eq!(sorted(ids), sorted(vec![offering, requesting]));
    assert!(!trades.iter().any(|t| t.id == unrelated));

    // whole trades come back, not only the matching association
    let offering_trade = trades.iter().find(|t| t.id == offering).unwrap();
    assert_eq!(sorted(offering_trade.offered_items.clone()), sorted(vec![shared, a]));
    assert_eq!(offering_trade.requested_items, vec![b]);
}

#[tokio::test]
async fn test_find_by_user_and_all() {
    let db = database().await;
    let alice = seed_user(&db, UserRole::User).await;
    let bob = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 2).await;
    let ledger = db.trades();

    let first = ledger.create(alice, &[items[0]], &[]).await.unwrap();
    let second = ledger.create(alice, &[], &[items[1]]).await.unwrap();
    ledger.create(bob, &[items[1]], &[items[0]]).await.unwrap();

    let alice_trades = ledger.find_by_user_id(alice).await.unwrap();
    assert_eq!(
        sorted(alice_trades.iter().map(|t| t.id).collect()),
        sorted(vec![first, second])
    );
    assert_eq!(ledger.find_all().await.unwrap().len(), 3);
    assert!(ledger.find_by_user_id(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_role_tag_aborts_read() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 2).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[items[0]], &[]).await.unwrap();
    sqlx::query("INSERT INTO trade_item (trade_id, item_id, role) VALUES (?, ?, 'wanted')")
        .bind(trade_id)
        .bind(items[1])
        .execute(db.pool())
        .await
        .unwrap();

    match ledger.find_by_id(trade_id).await {
        Err(ExchangeError::Integrity(IntegrityError::UnknownRoleTag { trade_id: t, tag, .. })) => {
            assert_eq!(t, trade_id);
            assert_eq!(tag, "wanted");
        }
        other => panic!("expected integrity failure, got {:?}", other),
    }
    assert!(matches!(
        ledger.find_all().await,
        Err(ExchangeError::Integrity(_))
    ));
}

#[tokio::test]
async fn test_unknown_status_aborts_read() {
    let db = database().await;
    let user = seed_user(&db, UserRole::User).await;
    let ledger = db.trades();

    let trade_id = ledger.create(user, &[], &[]).await.unwrap();
    sqlx::query("UPDATE trade SET status = 'frozen' WHERE id = ?")
        .bind(trade_id)
        .execute(db.pool())
        .await
        .unwrap();

    assert!(matches!(
        ledger.find_by_id(trade_id).await,
        Err(ExchangeError::Integrity(IntegrityError::UnknownStatus { .. }))
    ));
}

#[tokio::test]
async fn test_trade_lifecycle() {
    let db = database().await;
    let owner = seed_user(&db, UserRole::User).await;
    let items = seed_items(&db, 3).await;
    let ledger = db.trades();

    let trade_id = ledger.create(owner, &[items[0]], &[items[1]]).await.unwrap();
    assert_eq!(ledger.find_by_item_id(items[1]).await.unwrap().len(), 1);

    ledger.update(trade_id, &[items[0]], &[items[2]]).await.unwrap();
    assert!(ledger.find_by_item_id(items[1]).await.unwrap().is_empty());
    assert_eq!(ledger.find_by_item_id(items[2]).await.unwrap()[0].id, trade_id);

    ledger.delete(trade_id).await.unwrap();
    assert!(ledger.find_by_user_id(owner).await.unwrap().is_empty());

    // items are free to delete once no trade references them
    for item in items {
        db.items().delete(item).await.unwrap();
    }
}

#[tokio::test]
async fn test_missing_items_keep_input_order() {
    let db = database().await;
    let items = seed_items(&db, 2).await;
    let ghost_a = Uuid::new_v4();
    let ghost_b = Uuid::new_v4();

    let missing = db
        .items()
        .missing(&[ghost_b, items[0], ghost_a, items[1]])
        .await
        .unwrap();
    assert_eq!(missing, vec![ghost_b, ghost_a]);

    assert!(db.items().missing(&items).await.unwrap().is_empty());
    assert!(db.items().missing(&[]).await.unwrap().is_empty());
}
