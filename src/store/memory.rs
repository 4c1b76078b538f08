//! In-process store with auto-increment keys. Used by tests and local runs without a database.

use super::{EntityStore, Page, Row};
use crate::config::EntityDescriptor;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_key(entity: &EntityDescriptor) -> String {
        format!("{}.{}", entity.schema_name, entity.table_name)
    }

    fn read<T>(&self, entity: &EntityDescriptor, f: impl FnOnce(Option<&Table>) -> T) -> Result<T, AppError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))?;
        Ok(f(tables.get(&Self::table_key(entity))))
    }

    fn write<T>(&self, entity: &EntityDescriptor, f: impl FnOnce(&mut Table) -> T) -> Result<T, AppError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))?;
        Ok(f(tables.entry(Self::table_key(entity)).or_default()))
    }
}

/// Equality that tolerates query-string values (always strings) against typed values.
fn loosely_equal(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (stored, wanted) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => n.to_string() == *s,
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            let digit = if *b { "1" } else { "0" };
            s.as_str() == digit || s.eq_ignore_ascii_case(&b.to_string())
        }
        _ => false,
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_by_primary_key(&self, entity: &EntityDescriptor, key: i64) -> Result<Option<Row>, AppError> {
        self.read(entity, |t| t.and_then(|t| t.rows.get(&key).cloned()))
    }

    async fn find_by_field(&self, entity: &EntityDescriptor, field: &str, value: &str) -> Result<Option<Row>, AppError> {
        let wanted = Value::String(value.to_string());
        self.read(entity, |t| {
            t.and_then(|t| {
                t.rows
                    .values()
                    .find(|row| row.get(field).map(|v| loosely_equal(v, &wanted)).unwrap_or(false))
                    .cloned()
            })
        })
    }

    async fn insert(&self, entity: &EntityDescriptor, attributes: &Row) -> Result<Row, AppError> {
        let pk = entity.primary_key.clone();
        self.write(entity, |t| {
            let id = match attributes.get(&pk).and_then(Value::as_i64) {
                Some(explicit) => explicit,
                None => t.next_id + 1,
            };
            t.next_id = t.next_id.max(id);
            let mut row = attributes.clone();
            row.insert(pk, Value::from(id));
            t.rows.insert(id, row.clone());
            row
        })
    }

    async fn update(&self, entity: &EntityDescriptor, key: i64, attributes: &Row) -> Result<Option<Row>, AppError> {
        let pk = entity.primary_key.clone();
        self.write(entity, |t| {
            t.rows.get_mut(&key).map(|row| {
                for (k, v) in attributes {
                    if *k != pk {
                        row.insert(k.clone(), v.clone());
                    }
                }
                row.clone()
            })
        })
    }

    async fn delete(&self, entity: &EntityDescriptor, key: i64) -> Result<bool, AppError> {
        self.write(entity, |t| t.rows.remove(&key).is_some())
    }

    async fn list(
        &self,
        entity: &EntityDescriptor,
        filters: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Row>, AppError> {
        self.read(entity, |t| {
            let Some(t) = t else { return Vec::new() };
            let matching = t.rows.values().filter(|row| {
                filters.iter().all(|(col, wanted)| {
                    let stored = row.get(col).unwrap_or(&Value::Null);
                    loosely_equal(stored, wanted)
                })
            });
            match page {
                Some(p) => matching
                    .skip(p.offset() as usize)
                    .take(p.size as usize)
                    .cloned()
                    .collect(),
                None => matching.cloned().collect(),
            }
        })
    }
}
