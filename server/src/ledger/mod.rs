//! Trade ledger: the `trade` row plus its `trade_item` association rows,
//! always written together inside one transaction.

mod aggregate;

pub use aggregate::{aggregate_rows, aggregate_stream, AssociationRow, IntegrityError, TradeAccumulator};

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{ItemRole, Trade, TradeStatus};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{ExchangeError, Result};

const SELECT_TRADES: &str = r#"
    SELECT t.id AS trade_id, t.user_id, t.status, t.created_at, ti.item_id, ti.role
    FROM trade t
    LEFT JOIN trade_item ti ON ti.trade_id = t.id
"#;

/// One row of the trade/association outer join.
#[derive(Debug, Clone, FromRow)]
pub struct TradeJoinRow {
    pub trade_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub item_id: Option<Uuid>,
    pub role: Option<String>,
}

impl AssociationRow for TradeJoinRow {
    fn trade_id(&self) -> Uuid {
        self.trade_id
    }

    fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn association(&self) -> Option<(Uuid, &str)> {
        // a missing tag on a present item still has to fail classification
        self.item_id
            .map(|item_id| (item_id, self.role.as_deref().unwrap_or("")))
    }
}

enum TradeFilter {
    All,
    Id(Uuid),
    Item(Uuid),
    User(Uuid),
}

impl TradeFilter {
    fn clause(&self) -> &'static str {
        match self {
            TradeFilter::All => "",
            TradeFilter::Id(_) => "WHERE t.id = ?",
            // whole trades, not just the matching association row
            TradeFilter::Item(_) => {
                "WHERE t.id IN (SELECT trade_id FROM trade_item WHERE item_id = ?)"
            }
            TradeFilter::User(_) => "WHERE t.user_id = ?",
        }
    }

    fn param(&self) -> Option<Uuid> {
        match self {
            TradeFilter::All => None,
            TradeFilter::Id(id) | TradeFilter::Item(id) | TradeFilter::User(id) => Some(*id),
        }
    }
}

#[derive(Clone)]
pub struct TradeLedger {
    pool: SqlitePool,
    deadline: Duration,
}

impl TradeLedger {
    pub fn new(pool: SqlitePool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// Inserts a pending trade and all of its associations atomically.
    pub async fn create(
        &self,
        user_id: Uuid,
        offered: &[Uuid],
        requested: &[Uuid],
    ) -> Result<Uuid> {
        const OP: &str = "trade.create";

        let trade_id = Uuid::new_v4();
        self.within_deadline(OP, async {
            let mut tx = self.pool.begin().await.map_err(ExchangeError::during(OP))?;

            sqlx::query("INSERT INTO trade (id, user_id, status, created_at) VALUES (?, ?, ?, ?)")
                .bind(trade_id)
                .bind(user_id)
                .bind(TradeStatus::Pending.as_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(ExchangeError::during(OP))?;

            insert_associations(&mut tx, OP, trade_id, ItemRole::Offered, offered).await?;
            insert_associations(&mut tx, OP, trade_id, ItemRole::Requested, requested).await?;

            tx.commit().await.map_err(ExchangeError::during(OP))
        })
        .await?;

        log::info!(
            "Created trade {} for user {} ({} offered, {} requested)",
            trade_id,
            user_id,
            offered.len(),
            requested.len()
        );
        Ok(trade_id)
    }

    pub async fn find_by_id(&self, trade_id: Uuid) -> Result<Trade> {
        self.select("trade.find_by_id", TradeFilter::Id(trade_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::NotFound(format!("trade {trade_id}")))
    }

    pub async fn find_all(&self) -> Result<Vec<Trade>> {
        self.select("trade.find_all", TradeFilter::All).await
    }

    /// Trades in which `item_id` is either offered or requested.
    pub async fn find_by_item_id(&self, item_id: Uuid) -> Result<Vec<Trade>> {
        self.select("trade.find_by_item_id", TradeFilter::Item(item_id))
            .await
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Trade>> {
        self.select("trade.find_by_user_id", TradeFilter::User(user_id))
            .await
    }

    /// Replaces the whole item association of a trade.
    pub async fn update(&self, trade_id: Uuid, offered: &[Uuid], requested: &[Uuid]) -> Result<()> {
        const OP: &str = "trade.update";

        self.within_deadline(OP, async {
            let mut tx = self.pool.begin().await.map_err(ExchangeError::during(OP))?;

            let touched = sqlx::query("UPDATE trade SET status = ? WHERE id = ?")
                .bind(TradeStatus::Pending.as_str())
                .bind(trade_id)
                .execute(&mut *tx)
                .await
                .map_err(ExchangeError::during(OP))?;
            if touched.rows_affected() == 0 {
                return Err(ExchangeError::NotFound(format!("trade {trade_id}")));
            }

            sqlx::query("DELETE FROM trade_item WHERE trade_id = ?")
                .bind(trade_id)
                .execute(&mut *tx)
                .await
                .map_err(ExchangeError::during(OP))?;

            insert_associations(&mut tx, OP, trade_id, ItemRole::Offered, offered).await?;
            insert_associations(&mut tx, OP, trade_id, ItemRole::Requested, requested).await?;

            tx.commit().await.map_err(ExchangeError::during(OP))
        })
        .await?;

        log::info!(
            "Updated trade {} ({} offered, {} requested)",
            trade_id,
            offered.len(),
            requested.len()
        );
        Ok(())
    }

    /// Removes the associations, then the trade itself, in one transaction.
    pub async fn delete(&self, trade_id: Uuid) -> Result<()> {
        const OP: &str = "trade.delete";

        self.within_deadline(OP, async {
            let mut tx = self.pool.begin().await.map_err(ExchangeError::during(OP))?;

            sqlx::query("DELETE FROM trade_item WHERE trade_id = ?")
                .bind(trade_id)
                .execute(&mut *tx)
                .await
                .map_err(ExchangeError::during(OP))?;

            let removed = sqlx::query("DELETE FROM trade WHERE id = ?")
                .bind(trade_id)
                .execute(&mut *tx)
                .await
                .map_err(ExchangeError::during(OP))?;
            if removed.rows_affected() == 0 {
                return Err(ExchangeError::NotFound(format!("trade {trade_id}")));
            }

            tx.commit().await.map_err(ExchangeError::during(OP))
        })
        .await?;

        log::info!("Deleted trade {}", trade_id);
        Ok(())
    }

    /// Number of association rows stored for `trade_id`.
    pub async fn association_count(&self, trade_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM trade_item WHERE trade_id = ?")
            .bind(trade_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ExchangeError::during("trade.association_count"))
    }

    async fn select(&self, op: &'static str, filter: TradeFilter) -> Result<Vec<Trade>> {
        let sql = format!("{SELECT_TRADES} {}", filter.clause());

        let mut trades = self
            .within_deadline(op, async {
                let query = sqlx::query_as::<_, TradeJoinRow>(&sql);
                let query = match filter.param() {
                    Some(id) => query.bind(id),
                    None => query,
                };
                aggregate_stream(op, query.fetch(&self.pool)).await
            })
            .await?;

        trades.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(trades)
    }

    /// Runs one unit of work under the storage deadline. On expiry the
    /// future is dropped, and with it any open transaction, which rolls back.
    async fn within_deadline<T, F>(&self, op: &'static str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                log::error!("{}: exceeded storage deadline of {:?}", op, self.deadline);
                Err(ExchangeError::Timeout { op })
            }
        }
    }
}

async fn insert_associations(
    conn: &mut SqliteConnection,
    op: &'static str,
    trade_id: Uuid,
    role: ItemRole,
    items: &[Uuid],
) -> Result<()> {
    for item_id in items {
        sqlx::query("INSERT INTO trade_item (trade_id, item_id, role) VALUES (?, ?, ?)")
            .bind(trade_id)
            .bind(*item_id)
            .bind(role.as_str())
            .execute(&mut *conn)
            .await
            .map_err(ExchangeError::during(op))?;
    }
    Ok(())
}
