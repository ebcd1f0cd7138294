pub mod models;
pub mod repository;
pub mod tokens;

pub use models::{ItemRecord, TokenRecord, UserRecord};
pub use repository::{ItemStore, UserStore};
pub use tokens::{SqliteTokenStore, TokenRepository};

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::StorageConfig;
use crate::error::{ExchangeError, Result};
use crate::ledger::TradeLedger;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            BLOB PRIMARY KEY,
        username      TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL DEFAULT 'user',
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item (
        id          BLOB PRIMARY KEY,
        name        TEXT NOT NULL,
        rarity      TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trade (
        id         BLOB PRIMARY KEY,
        user_id    BLOB NOT NULL,
        status     TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_trade_user ON trade (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS trade_item (
        trade_id BLOB NOT NULL REFERENCES trade (id),
        item_id  BLOB NOT NULL REFERENCES item (id),
        role     TEXT NOT NULL,
        PRIMARY KEY (trade_id, item_id, role)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_trade_item_item ON trade_item (item_id)",
    r#"
    CREATE TABLE IF NOT EXISTS user_token (
        id            BLOB PRIMARY KEY,
        user_id       BLOB NOT NULL,
        token         TEXT NOT NULL,
        expires_at_ms INTEGER NOT NULL,
        user_agent    TEXT NOT NULL,
        user_role     TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_user_token_expiry ON user_token (expires_at_ms)",
    "CREATE INDEX IF NOT EXISTS idx_user_token_client ON user_token (user_id, user_agent)",
];

/// Handle on the relational store. Cheap to clone; every repository it hands
/// out shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl Database {
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let in_memory = is_in_memory(&config.url);

        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| ExchangeError::Config(format!("invalid storage url: {}", e)))?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            // every connection to :memory: is its own database
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(config.max_connections.max(1));
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(ExchangeError::during("storage.connect"))?;

        log::info!("Connected to storage at {}", config.url);

        Ok(Self {
            pool,
            query_timeout: config.query_timeout(),
        })
    }

    /// Fresh, migrated in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect(&StorageConfig::in_memory()).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(ExchangeError::during("storage.migrate"))?;
        }

        log::info!("Database schema ready");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(ExchangeError::during("storage.ping"))?;
        Ok(())
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn items(&self) -> ItemStore {
        ItemStore::new(self.pool.clone())
    }

    pub fn tokens(&self) -> SqliteTokenStore {
        SqliteTokenStore::new(self.pool.clone())
    }

    pub fn trades(&self) -> TradeLedger {
        TradeLedger::new(self.pool.clone(), self.query_timeout)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
