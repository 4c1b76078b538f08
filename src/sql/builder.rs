//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a registered entity.
//! Identifiers come from config only; values are always bound.

use crate::case::to_snake_case;
use crate::config::EntityDescriptor;
use crate::store::{Page, Row};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(entity: &EntityDescriptor) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

fn column(attribute: &str) -> String {
    quoted(&to_snake_case(attribute))
}

/// Left side of an equality test. Untyped string values (query-string input) compare as text.
fn comparable(entity: &EntityDescriptor, attribute: &str, v: &Value) -> String {
    let typed = entity.attribute(attribute).and_then(|a| a.pg_type.as_deref()).is_some();
    match v {
        Value::String(_) if !typed => format!("{}::text", column(attribute)),
        _ => column(attribute),
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast when the attribute declares a type.
    fn bind(&mut self, entity: &EntityDescriptor, attribute: &str, v: Value) -> String {
        self.params.push(v);
        let n = self.params.len();
        match entity.attribute(attribute).and_then(|a| a.pg_type.as_deref()) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// Returned columns; custom enums (schema.type) and numeric come back as text.
fn returning_list(entity: &EntityDescriptor) -> String {
    entity
        .attributes
        .iter()
        .map(|a| {
            let col = column(&a.name);
            match a.pg_type.as_deref() {
                Some(t) if t.contains('.') || t == "numeric" => format!("{}::text AS {}", col, col),
                _ => col,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attributes that may be written: declared, not the primary key.
fn writable<'a>(entity: &'a EntityDescriptor, attrs: &'a Row) -> impl Iterator<Item = (&'a String, &'a Value)> {
    attrs
        .iter()
        .filter(move |(k, _)| **k != entity.primary_key && entity.has_attribute(k))
}

pub fn select_by_primary_key(entity: &EntityDescriptor, key: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(entity, &entity.primary_key, Value::from(key));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        returning_list(entity),
        qualified_table(entity),
        column(&entity.primary_key),
        ph
    );
    q
}

pub fn select_by_field(entity: &EntityDescriptor, field: &str, value: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let value = Value::String(value.to_string());
    let lhs = comparable(entity, field, &value);
    let ph = q.bind(entity, field, value);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        returning_list(entity),
        qualified_table(entity),
        lhs,
        ph
    );
    q
}

pub fn insert(entity: &EntityDescriptor, attrs: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in writable(entity, attrs) {
        cols.push(column(k));
        placeholders.push(q.bind(entity, k, v.clone()));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(entity),
            returning_list(entity)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(entity),
            cols.join(", "),
            placeholders.join(", "),
            returning_list(entity)
        )
    };
    q
}

/// UPDATE by primary key. With nothing to set this degrades to a plain select.
pub fn update(entity: &EntityDescriptor, key: i64, attrs: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in writable(entity, attrs) {
        let ph = q.bind(entity, k, v.clone());
        sets.push(format!("{} = {}", column(k), ph));
    }
    if sets.is_empty() {
        return select_by_primary_key(entity, key);
    }
    let key_ph = q.bind(entity, &entity.primary_key, Value::from(key));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        column(&entity.primary_key),
        key_ph,
        returning_list(entity)
    );
    q
}

pub fn delete(entity: &EntityDescriptor, key: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(entity, &entity.primary_key, Value::from(key));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        column(&entity.primary_key),
        ph,
        column(&entity.primary_key)
    );
    q
}

pub fn select_list(entity: &EntityDescriptor, filters: &[(String, Value)], page: Option<Page>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (attr, val) in filters {
        if entity.has_attribute(attr) {
            let lhs = comparable(entity, attr, val);
            let ph = q.bind(entity, attr, val.clone());
            where_parts.push(format!("{} = {}", lhs, ph));
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let window = match page {
        Some(p) => format!(" LIMIT {} OFFSET {}", p.size, p.offset()),
        None => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        returning_list(entity),
        qualified_table(entity),
        where_clause,
        column(&entity.primary_key),
        window
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse, resolve, EntityRegistry};
    use serde_json::json;

    fn registry() -> EntityRegistry {
        let raw = r#"{ "entities": [{
            "typeName": "UserProfile",
            "table": "user_profile",
            "schema": "app",
            "attributes": ["nickname", { "name": "birthday", "pgType": "date" }, { "name": "level", "pgType": "app.level" }]
        }] }"#;
        resolve(&parse(raw).unwrap()).unwrap()
    }

    const COLS: &str = "\"nickname\", \"birthday\", \"level\"::text AS \"level\", \"id\", \"sid\"";

    #[test]
    fn select_by_key_uses_snake_case_columns() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let q = select_by_primary_key(e, 42);
        assert_eq!(q.sql, format!("SELECT {} FROM \"app\".\"user_profile\" WHERE \"id\" = $1", COLS));
        assert_eq!(q.params, vec![json!(42)]);
    }

    #[test]
    fn insert_skips_unknown_and_primary_key() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let attrs = json!({ "id": 5, "nickname": "bo", "birthday": "2000-01-01", "hacker": true });
        let q = insert(e, attrs.as_object().unwrap());
        assert_eq!(
            q.sql,
            format!(
                "INSERT INTO \"app\".\"user_profile\" (\"birthday\", \"nickname\") VALUES ($1::date, $2) RETURNING {}",
                COLS
            )
        );
        assert_eq!(q.params, vec![json!("2000-01-01"), json!("bo")]);
    }

    #[test]
    fn update_binds_key_last() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let q = update(e, 3, json!({ "nickname": "x" }).as_object().unwrap());
        assert!(q.sql.starts_with("UPDATE \"app\".\"user_profile\" SET \"nickname\" = $1 WHERE \"id\" = $2 RETURNING"));
        assert_eq!(q.params, vec![json!("x"), json!(3)]);

        let q = update(e, 3, &Row::new());
        assert!(q.sql.starts_with("SELECT"));
    }

    #[test]
    fn list_with_filters_and_page() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let q = select_list(e, &[("nickname".into(), json!("bo")), ("nope".into(), json!(1))], Some(Page { index: 2, size: 10 }));
        assert!(q.sql.ends_with("WHERE \"nickname\"::text = $1 ORDER BY \"id\" LIMIT 10 OFFSET 20"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn alias_lookup_compares_as_text() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let q = select_by_field(e, "sid", "abc123");
        assert!(q.sql.ends_with("WHERE \"sid\"::text = $1 LIMIT 1"));
        assert_eq!(q.params, vec![json!("abc123")]);
    }

    #[test]
    fn delete_returns_key() {
        let reg = registry();
        let e = reg.by_type("UserProfile").unwrap();
        let q = delete(e, 9);
        assert_eq!(q.sql, "DELETE FROM \"app\".\"user_profile\" WHERE \"id\" = $1 RETURNING \"id\"");
    }
}
