//! Entity CRUD handlers: index, view, create, update, delete.
//!
//! Every outcome is an envelope with HTTP 200 except routing-level rejections (unknown
//! path segment, operation not enabled), which stay transport errors.

use crate::config::{EntityDescriptor, Operation};
use crate::error::{AppError, TransportError};
use crate::extractors::{AuthUser, RequestParams};
use crate::resolver::{EntityResolver, Resolution};
use crate::response::{single, Envelope};
use crate::service::{AttributeValidator, ValidationErrors};
use crate::state::AppState;
use crate::store::{primary_key_of, Page, Row};
use axum::extract::{Path, State};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "pageSize";
/// Path ids are reported under this field name.
pub const ID_FIELD: &str = "id";
pub const FOREIGN_OWNER_MESSAGE: &str = "cannot modify data owned by another user";

fn entity_for(state: &AppState, path_segment: &str, op: Operation) -> Result<Arc<EntityDescriptor>, AppError> {
    let entity = state
        .registry
        .by_path(path_segment)
        .cloned()
        .ok_or_else(|| TransportError::not_found(format!("no entity at /{}", path_segment)))?;
    if !entity.allows(op) {
        return Err(TransportError::method_not_allowed(format!(
            "{} not allowed on {}",
            op.as_str(),
            path_segment
        ))
        .into());
    }
    Ok(entity)
}

/// Pagination applies only when `page` or `pageSize` is a number. `page` is zero-based.
pub fn page_from(params: &RequestParams, max_page_size: u32) -> Option<Page> {
    let number = |key: &str| params.param_str(key).and_then(|v| v.trim().parse::<u32>().ok());
    let index = number(PAGE_PARAM);
    let size = number(PAGE_SIZE_PARAM);
    if index.is_none() && size.is_none() {
        return None;
    }
    Some(Page {
        index: index.unwrap_or(0),
        size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max_page_size.max(1)),
    })
}

fn is_soft_deleted(entity: &EntityDescriptor, row: &Row) -> bool {
    let Some(attr) = &entity.soft_delete_attribute else {
        return false;
    };
    match row.get(attr) {
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(true),
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

/// Rows without an owner value are open to every authenticated user.
fn owned_by(entity: &EntityDescriptor, row: &Row, user: AuthUser) -> bool {
    let Some(attr) = &entity.owner_attribute else {
        return true;
    };
    match row.get(attr) {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_i64() == Some(user.0),
        Some(Value::String(s)) => s.parse::<i64>().ok() == Some(user.0),
        _ => false,
    }
}

/// Declared attributes from the request, minus the ones clients never write directly.
fn writable_attributes(entity: &EntityDescriptor, params: &RequestParams) -> Row {
    let source = if params.uses_body() { params.body() } else { params.query() };
    source
        .iter()
        .filter(|(k, _)| entity.has_attribute(k))
        .filter(|(k, _)| **k != entity.primary_key)
        .filter(|(k, _)| Some(*k) != entity.owner_attribute.as_ref())
        .filter(|(k, _)| Some(*k) != entity.soft_delete_attribute.as_ref())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn invalid_attributes(errors: &ValidationErrors) -> Envelope {
    let first = Value::Object(errors.first_errors()).to_string();
    Envelope::failed_with_wrong_param(Some(&first))
}

fn keyed(entity: &EntityDescriptor, row: Row) -> Envelope {
    Envelope::success(Some(single(&entity.names.collection_key, Value::Object(row))))
}

/// Resolve `xxxSid` for every referenced type, injecting `xxxId`. Returns the failure envelope
/// when a supplied reference does not exist.
async fn resolve_references(
    state: &AppState,
    entity: &EntityDescriptor,
    params: &mut RequestParams,
) -> Result<Option<Envelope>, AppError> {
    let resolver = EntityResolver::new(state.store.as_ref());
    for reference in &entity.references {
        let target = state
            .registry
            .by_type(reference)
            .ok_or_else(|| AppError::Internal(format!("unregistered reference type {}", reference)))?;
        if let resolution @ Resolution::NotFound { .. } = resolver.update_object_param(params, target).await? {
            return Ok(Some(Envelope::failed_with_wrong_param(resolution.message().as_deref())));
        }
    }
    Ok(None)
}

/// Row for the path id, or the envelope to answer with. Soft-deleted rows count as missing.
async fn find_target(state: &AppState, entity: &EntityDescriptor, id: &str) -> Result<Result<Row, Envelope>, AppError> {
    let resolution = EntityResolver::new(state.store.as_ref())
        .resolve(entity, ID_FIELD, Some(id))
        .await?;
    let resolution = match resolution {
        Resolution::Found(row) if is_soft_deleted(entity, &row) => Resolution::NotFound {
            identifier: id.to_string(),
            field: ID_FIELD.to_string(),
        },
        other => other,
    };
    Ok(resolution.require())
}

async fn reread(state: &AppState, entity: &EntityDescriptor, row: Row) -> Result<Row, AppError> {
    match primary_key_of(entity, &row) {
        Some(key) => Ok(state.store.find_by_primary_key(entity, key).await?.unwrap_or(row)),
        None => Ok(row),
    }
}

fn key_of(entity: &EntityDescriptor, row: &Row) -> Result<i64, AppError> {
    primary_key_of(entity, row)
        .ok_or_else(|| AppError::Internal(format!("{} row without integer primary key", entity.type_name)))
}

pub async fn index(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    params: RequestParams,
) -> Result<Envelope, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Index)?;
    let page = page_from(&params, state.settings.max_page_size);

    let mut filters: Vec<(String, Value)> = params
        .query()
        .iter()
        .filter(|(k, _)| k.as_str() != PAGE_PARAM && k.as_str() != PAGE_SIZE_PARAM)
        .filter(|(k, _)| entity.has_attribute(k))
        .filter(|(k, _)| Some(*k) != entity.soft_delete_attribute.as_ref())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(attr) = &entity.soft_delete_attribute {
        filters.push((attr.clone(), Value::from(0)));
    }

    let rows = state.store.list(&entity, &filters, page).await?;
    tracing::debug!(entity = %entity.type_name, count = rows.len(), ?page, "index");
    Ok(Envelope::collection(
        &entity.names.plural_collection_key,
        rows.into_iter().map(Value::Object).collect(),
    ))
}

pub async fn view(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<Envelope, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::View)?;
    Ok(match find_target(&state, &entity, &id).await? {
        Ok(row) => keyed(&entity, row),
        Err(envelope) => envelope,
    })
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    user: AuthUser,
    mut params: RequestParams,
) -> Result<Envelope, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Create)?;
    if let Some(failure) = resolve_references(&state, &entity, &mut params).await? {
        return Ok(failure);
    }

    let mut attributes = writable_attributes(&entity, &params);
    let errors = AttributeValidator::validate(&attributes, &entity.validation);
    if errors.has_errors() {
        return Ok(invalid_attributes(&errors));
    }
    if let Some(owner) = &entity.owner_attribute {
        attributes.insert(owner.clone(), Value::from(user.0));
    }
    if let Some(flag) = &entity.soft_delete_attribute {
        attributes.insert(flag.clone(), Value::from(0));
    }

    let inserted = state.store.insert(&entity, &attributes).await?;
    tracing::info!(entity = %entity.type_name, key = ?primary_key_of(&entity, &inserted), "created");
    let row = reread(&state, &entity, inserted).await?;
    Ok(keyed(&entity, row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    user: AuthUser,
    mut params: RequestParams,
) -> Result<Envelope, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Update)?;
    let existing = match find_target(&state, &entity, &id).await? {
        Ok(row) => row,
        Err(envelope) => return Ok(envelope),
    };
    if !owned_by(&entity, &existing, user) {
        tracing::warn!(entity = %entity.type_name, id = %id, user = user.0, "update rejected: foreign owner");
        return Ok(Envelope::failed_with_privilege(Some(FOREIGN_OWNER_MESSAGE)));
    }
    if let Some(failure) = resolve_references(&state, &entity, &mut params).await? {
        return Ok(failure);
    }

    let attributes = writable_attributes(&entity, &params);
    let errors = AttributeValidator::validate_partial(&attributes, &entity.validation);
    if errors.has_errors() {
        return Ok(invalid_attributes(&errors));
    }

    let key = key_of(&entity, &existing)?;
    let Some(updated) = state.store.update(&entity, key, &attributes).await? else {
        return Ok(Envelope::failed_with_not_exist());
    };
    let row = reread(&state, &entity, updated).await?;
    Ok(keyed(&entity, row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    user: AuthUser,
) -> Result<Envelope, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Delete)?;
    let existing = match find_target(&state, &entity, &id).await? {
        Ok(row) => row,
        Err(envelope) => return Ok(envelope),
    };
    if !owned_by(&entity, &existing, user) {
        tracing::warn!(entity = %entity.type_name, id = %id, user = user.0, "delete rejected: foreign owner");
        return Ok(Envelope::failed_with_privilege(Some(FOREIGN_OWNER_MESSAGE)));
    }

    let key = key_of(&entity, &existing)?;
    let deleted = match &entity.soft_delete_attribute {
        Some(flag) => state
            .store
            .update(&entity, key, &single(flag, Value::from(1)))
            .await?
            .is_some(),
        None => state.store.delete(&entity, key).await?,
    };
    if !deleted {
        return Ok(Envelope::failed_when_delete(&entity.names.short_name, None, None));
    }
    tracing::info!(entity = %entity.type_name, key, soft = entity.soft_delete_attribute.is_some(), "deleted");
    Ok(Envelope::success(None))
}
