//! SQL implementation of every repository trait, on one shared [`DbClient`].
//!
//! Storage conventions: timestamps are Unix seconds in `INTEGER` columns,
//! booleans are `0`/`1`, availability intervals are JSON text. Placeholders
//! are numbered `$1..$N` in order of first appearance in each statement.

mod audit;
mod availability;
mod calendar_account;
mod meeting;
mod operator;
mod rate_limit;
mod rows;
mod schema;
mod settings;
mod time_off;

use crate::client::DbClient;
use crate::error::DbError;
use opsdesk_config::DatabaseConfig;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SqlStore {
    db_client: DbClient,
}

impl SqlStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Connects and creates any missing tables.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let store = Self::new(DbClient::from_config(config).await?);
        store.init_schema().await?;
        Ok(store)
    }

    /// Creates tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        for statement in schema::STATEMENTS {
            self.db_client.execute(statement).await?;
        }
        info!("Scheduling schema initialized successfully");
        Ok(())
    }

    pub fn client(&self) -> &DbClient {
        &self.db_client
    }

    pub async fn is_healthy(&self) -> bool {
        self.db_client.is_healthy().await
    }
}
