//! Persistence boundary. Rows are JSON objects keyed by camelCase attribute names.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::EntityDescriptor;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

/// Zero-based page window for list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        self.index as u64 * self.size as u64
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_by_primary_key(&self, entity: &EntityDescriptor, key: i64) -> Result<Option<Row>, AppError>;

    async fn find_by_field(&self, entity: &EntityDescriptor, field: &str, value: &str) -> Result<Option<Row>, AppError>;

    /// Insert and return the stored row (primary key assigned).
    async fn insert(&self, entity: &EntityDescriptor, attributes: &Row) -> Result<Row, AppError>;

    /// Update by primary key; `None` when no row matched.
    async fn update(&self, entity: &EntityDescriptor, key: i64, attributes: &Row) -> Result<Option<Row>, AppError>;

    /// Delete by primary key; false when no row matched.
    async fn delete(&self, entity: &EntityDescriptor, key: i64) -> Result<bool, AppError>;

    /// Rows matching every equality filter, ordered by primary key.
    async fn list(
        &self,
        entity: &EntityDescriptor,
        filters: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Row>, AppError>;
}

/// Primary key of a stored row, when it is an integer.
pub fn primary_key_of(entity: &EntityDescriptor, row: &Row) -> Option<i64> {
    match row.get(&entity.primary_key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
