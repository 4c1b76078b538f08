//! PostgreSQL store over a `PgPool`, using the parameterized SQL builder.

use super::{EntityStore, Page, Row};
use crate::case::to_camel_case;
use crate::config::EntityDescriptor;
use crate::error::AppError;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn prepare(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        q.params.iter().fold(sqlx::query(&q.sql), bind_value)
    }

    async fn fetch_optional(&self, q: QueryBuf) -> Result<Option<Row>, AppError> {
        let row = Self::prepare(&q).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(decode_row))
    }
}

fn bind_value<'q>(query: Query<'q, Postgres, PgArguments>, v: &Value) -> Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(v.clone()),
    }
}

fn decode_row(row: &PgRow) -> Row {
    let mut out = Map::new();
    for col in row.columns() {
        let value = decode_cell(row, col.ordinal(), col.type_info().name());
        out.insert(to_camel_case(col.name()), value);
    }
    out
}

fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> Value {
    let decoded: Result<Option<Value>, sqlx::Error> = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx).map(|v| v.map(Value::from)),
        "INT4" => row.try_get::<Option<i32>, _>(idx).map(|v| v.map(Value::from)),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(Value::from)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx).map(|v| v.map(Value::from)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx).map(|v| v.map(Value::from)),
        "BOOL" => row.try_get::<Option<bool>, _>(idx).map(|v| v.map(Value::from)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx),
        _ => row.try_get::<Option<String>, _>(idx).map(|v| v.map(Value::String)),
    };
    match decoded {
        Ok(v) => v.unwrap_or(Value::Null),
        Err(e) => {
            tracing::warn!(column = idx, pg_type = type_name, error = %e, "undecodable column");
            Value::Null
        }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn find_by_primary_key(&self, entity: &EntityDescriptor, key: i64) -> Result<Option<Row>, AppError> {
        self.fetch_optional(sql::select_by_primary_key(entity, key)).await
    }

    async fn find_by_field(&self, entity: &EntityDescriptor, field: &str, value: &str) -> Result<Option<Row>, AppError> {
        self.fetch_optional(sql::select_by_field(entity, field, value)).await
    }

    async fn insert(&self, entity: &EntityDescriptor, attributes: &Row) -> Result<Row, AppError> {
        self.fetch_optional(sql::insert(entity, attributes))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, entity: &EntityDescriptor, key: i64, attributes: &Row) -> Result<Option<Row>, AppError> {
        self.fetch_optional(sql::update(entity, key, attributes)).await
    }

    async fn delete(&self, entity: &EntityDescriptor, key: i64) -> Result<bool, AppError> {
        Ok(self.fetch_optional(sql::delete(entity, key)).await?.is_some())
    }

    async fn list(
        &self,
        entity: &EntityDescriptor,
        filters: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(entity, filters, page);
        let rows = Self::prepare(&q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }
}
