//! Folding flat trade/association rows into nested [`Trade`] values.
//!
//! Every read path of the ledger goes through [`TradeAccumulator`], so role
//! tag classification (and its refusal of unknown tags) lives here only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{ItemRole, Trade, TradeStatus};
use futures_util::{Stream, TryStreamExt};
use uuid::Uuid;

use crate::error::{ExchangeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("trade {trade_id}: item {item_id} carries unknown role tag '{tag}'")]
    UnknownRoleTag {
        trade_id: Uuid,
        item_id: Uuid,
        tag: String,
    },

    #[error("trade {trade_id}: unknown status '{status}'")]
    UnknownStatus { trade_id: Uuid, status: String },
}

/// Shape of one joined row: a trade header plus at most one association.
pub trait AssociationRow {
    fn trade_id(&self) -> Uuid;
    fn user_id(&self) -> Uuid;
    fn status(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    /// `None` for a trade without associations (outer-join filler row).
    fn association(&self) -> Option<(Uuid, &str)>;
}

#[derive(Debug, Default)]
pub struct TradeAccumulator {
    trades: HashMap<Uuid, Trade>,
}

impl TradeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<R: AssociationRow>(&mut self, row: &R) -> std::result::Result<(), IntegrityError> {
        let trade_id = row.trade_id();

        if !self.trades.contains_key(&trade_id) {
            let status: TradeStatus =
                row.status()
                    .parse()
                    .map_err(|_| IntegrityError::UnknownStatus {
                        trade_id,
                        status: row.status().to_string(),
                    })?;
            self.trades.insert(
                trade_id,
                Trade::header(trade_id, row.user_id(), status, row.created_at()),
            );
        }

        let Some((item_id, tag)) = row.association() else {
            return Ok(());
        };
        let role: ItemRole = tag.parse().map_err(|_| IntegrityError::UnknownRoleTag {
            trade_id,
            item_id,
            tag: tag.to_string(),
        })?;

        if let Some(trade) = self.trades.get_mut(&trade_id) {
            trade.items_mut(role).push(item_id);
        }
        Ok(())
    }

    /// Emits every accumulated trade. Order is unspecified.
    pub fn finish(self) -> Vec<Trade> {
        self.trades.into_values().collect()
    }
}

pub fn aggregate_rows<R, I>(rows: I) -> std::result::Result<Vec<Trade>, IntegrityError>
where
    R: AssociationRow,
    I: IntoIterator<Item = R>,
{
    let mut acc = TradeAccumulator::new();
    for row in rows {
        acc.push(&row)?;
    }
    Ok(acc.finish())
}

/// Same as [`aggregate_rows`], consuming rows straight off a database cursor.
pub async fn aggregate_stream<R, S>(op: &'static str, rows: S) -> Result<Vec<Trade>>
where
    R: AssociationRow,
    S: Stream<Item = std::result::Result<R, sqlx::Error>>,
{
    let mut rows = std::pin::pin!(rows);
    let mut acc = TradeAccumulator::new();
    while let Some(row) = rows.try_next().await.map_err(ExchangeError::during(op))? {
        acc.push(&row).map_err(|err| {
            log::error!("{}: {}", op, err);
            ExchangeError::Integrity(err)
        })?;
    }
    Ok(acc.finish())
}
