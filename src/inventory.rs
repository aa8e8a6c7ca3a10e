//! Ingredient inventory snapshot.
//!
//! The assistant script reads the same table on its own; this side only
//! takes a read-only snapshot for the duration of one request.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;

/// Lower-cased ingredient name -> units in stock.
pub type InventoryMap = HashMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InventoryItem {
    pub name: String,
    pub current_stock: Option<i64>,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::Query(err.to_string())
    }
}

/// Read side of the ingredients store.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Every item, unfiltered.
    async fn list_items(&self) -> Result<Vec<InventoryItem>, InventoryError>;
}

/// Missing stock counts as zero. Later rows win on a name collision.
pub fn build_inventory_map(items: impl IntoIterator<Item = InventoryItem>) -> InventoryMap {
    items
        .into_iter()
        .map(|item| (item.name.to_lowercase(), item.current_stock.unwrap_or(0)))
        .collect()
}

pub async fn fetch_inventory(store: &dyn InventoryStore) -> Result<InventoryMap, InventoryError> {
    let items = store.list_items().await?;
    Ok(build_inventory_map(items))
}

/// PostgreSQL implementation of the InventoryStore port.
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The pool connects on first query, so the server can start while the
    /// database is still down.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, InventoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT name, current_stock FROM ingredients",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
