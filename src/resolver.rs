//! Find an entity by id-or-alias.
//!
//! An identifier matching `^-?[0-9]+$` is a primary key; anything else (including the
//! empty string, padded numbers, decimals and exponents) is looked up through the
//! entity's alias attribute. Leading zeros are allowed: `"007"` is key 7. A numeric
//! identifier outside the `i64` range cannot match any row and resolves to not-found
//! without touching the store.

use crate::config::EntityDescriptor;
use crate::error::AppError;
use crate::extractors::RequestParams;
use crate::response::{single, Envelope};
use crate::store::{primary_key_of, EntityStore, Row};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupStrategy {
    PrimaryKey,
    Alias,
}

pub fn is_numeric_id(identifier: &str) -> bool {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    NUMERIC
        .get_or_init(|| Regex::new(r"^-?[0-9]+$").expect("numeric id pattern is a valid regex"))
        .is_match(identifier)
}

pub fn lookup_strategy(identifier: &str) -> LookupStrategy {
    if is_numeric_id(identifier) {
        LookupStrategy::PrimaryKey
    } else {
        LookupStrategy::Alias
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<T = Row> {
    Found(T),
    /// A value was supplied but nothing matches it.
    NotFound { identifier: String, field: String },
    /// The request did not carry the field at all.
    Absent { field: String },
}

impl<T> Resolution<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(t) => Some(t),
            _ => None,
        }
    }

    /// Human-readable failure, `None` when found.
    pub fn message(&self) -> Option<String> {
        match self {
            Resolution::Found(_) => None,
            Resolution::NotFound { field, .. } => Some(format!("{} target object does not exist", field)),
            Resolution::Absent { field } => Some(format!("missing {} parameter", field)),
        }
    }

    /// The entity, or the invalid-parameter envelope to answer with.
    pub fn require(self) -> Result<T, Envelope> {
        let message = self.message();
        self.found()
            .ok_or_else(|| Envelope::failed_with_wrong_param(message.as_deref()))
    }
}

pub struct EntityResolver<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        EntityResolver { store }
    }

    /// One read at most. `field` is only echoed back in failure messages.
    pub async fn resolve(
        &self,
        entity: &EntityDescriptor,
        field: &str,
        identifier: Option<&str>,
    ) -> Result<Resolution, AppError> {
        let Some(identifier) = identifier else {
            return Ok(Resolution::Absent { field: field.to_string() });
        };
        let strategy = lookup_strategy(identifier);
        tracing::debug!(entity = %entity.type_name, field, identifier, ?strategy, "resolving entity");

        let found = match strategy {
            LookupStrategy::PrimaryKey => match identifier.parse::<i64>() {
                Ok(key) => self.store.find_by_primary_key(entity, key).await?,
                Err(_) => None,
            },
            LookupStrategy::Alias => {
                self.store
                    .find_by_field(entity, &entity.alias_attribute, identifier)
                    .await?
            }
        };

        Ok(match found {
            Some(row) => Resolution::Found(row),
            None => Resolution::NotFound {
                identifier: identifier.to_string(),
                field: field.to_string(),
            },
        })
    }

    /// Resolve the identifier carried by request field `field`.
    pub async fn resolve_param(
        &self,
        params: &RequestParams,
        field: &str,
        entity: &EntityDescriptor,
    ) -> Result<Resolution, AppError> {
        let identifier = params.param_str(field);
        self.resolve(entity, field, identifier.as_deref()).await
    }

    /// Resolve through the conventional field name, e.g. `clerkSid` for `Clerk`.
    pub async fn resolve_classic(&self, params: &RequestParams, entity: &EntityDescriptor) -> Result<Resolution, AppError> {
        self.resolve_param(params, &entity.names.lookup_field, entity).await
    }

    /// Resolve `xxxSid` and, when found, inject the primary key as `xxxId` into the request.
    pub async fn update_object_param(
        &self,
        params: &mut RequestParams,
        entity: &EntityDescriptor,
    ) -> Result<Resolution, AppError> {
        let resolution = self.resolve_classic(params, entity).await?;
        if let Resolution::Found(row) = &resolution {
            let key = primary_key_of(entity, row)
                .map(Value::from)
                .or_else(|| row.get(&entity.primary_key).cloned())
                .unwrap_or(Value::Null);
            params.update_params(single(&entity.names.companion_field, key));
        }
        Ok(resolution)
    }
}
