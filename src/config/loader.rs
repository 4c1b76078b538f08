//! Load the entity config file and build the registry.

use crate::config::resolved::{AttributeInfo, EntityDescriptor, EntityRegistry, Operation};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::naming::EntityNames;
use std::path::Path;

/// Build the registry from config (validates first).
pub fn resolve(config: &ConfigFile) -> Result<EntityRegistry, ConfigError> {
    validate(config)?;

    let mut descriptors = Vec::with_capacity(config.entities.len());
    for entity in &config.entities {
        let names = EntityNames::derive(&entity.type_name);
        let mut attributes: Vec<AttributeInfo> = entity
            .attributes
            .iter()
            .map(|a| AttributeInfo {
                name: a.name().to_string(),
                pg_type: a.pg_type().map(str::to_string),
            })
            .collect();
        // Referenced types write their resolved key into `xxxId`.
        let companions: Vec<String> = entity
            .references
            .iter()
            .map(|r| EntityNames::derive(r).companion_field)
            .collect();
        for implied in [
            Some(&entity.primary_key),
            Some(&entity.alias_attribute),
            entity.owner_attribute.as_ref(),
            entity.soft_delete_attribute.as_ref(),
        ]
        .into_iter()
        .flatten()
        .chain(companions.iter())
        {
            if !attributes.iter().any(|a| &a.name == implied) {
                attributes.push(AttributeInfo {
                    name: implied.clone(),
                    pg_type: None,
                });
            }
        }
        let operations = entity
            .operations
            .iter()
            .map(|op| {
                op.parse::<Operation>().map_err(|operation| ConfigError::UnknownOperation {
                    entity: entity.type_name.clone(),
                    operation,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(entity = %entity.type_name, path = ?entity.path_segment, "entity registered");
        descriptors.push(EntityDescriptor {
            type_name: entity.type_name.clone(),
            path_segment: entity
                .path_segment
                .clone()
                .unwrap_or_else(|| names.plural_collection_key.clone()),
            names,
            schema_name: entity.schema.clone(),
            table_name: entity.table.clone(),
            primary_key: entity.primary_key.clone(),
            alias_attribute: entity.alias_attribute.clone(),
            owner_attribute: entity.owner_attribute.clone(),
            soft_delete_attribute: entity.soft_delete_attribute.clone(),
            attributes,
            references: entity.references.clone(),
            operations,
            validation: entity.validation.clone(),
        });
    }

    Ok(EntityRegistry::from_descriptors(descriptors))
}

/// Read and parse the JSON config file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse(&raw)
}

pub fn parse(raw: &str) -> Result<ConfigFile, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "entities": [
            { "typeName": "common\\models\\Clerk", "table": "clerk", "attributes": ["name"] },
            {
                "typeName": "UserProfile",
                "table": "user_profile",
                "ownerAttribute": "kuserId",
                "softDeleteAttribute": "deleted",
                "attributes": ["nickname", { "name": "birthday", "pgType": "date" }],
                "references": ["common\\models\\Clerk"],
                "operations": ["index", "view"]
            }
        ],
        "users": [{ "username": "alice", "password": "s3cret", "userId": 7 }]
    }"#;

    #[test]
    fn resolves_descriptors_with_derived_names() {
        let config = parse(SAMPLE).unwrap();
        let registry = resolve(&config).unwrap();
        assert_eq!(registry.len(), 2);

        let clerk = registry.by_type("common\\models\\Clerk").unwrap();
        assert_eq!(clerk.path_segment, "clerks");
        assert_eq!(clerk.names.lookup_field, "clerkSid");
        assert!(clerk.has_attribute("id"));
        assert!(clerk.has_attribute("sid"));
        assert!(clerk.allows(Operation::Delete));

        let profile = registry.by_path("userprofiles").unwrap();
        assert_eq!(profile.type_name, "UserProfile");
        assert_eq!(profile.schema_name, "public");
        assert!(profile.has_attribute("kuserId"));
        assert!(profile.has_attribute("deleted"));
        assert!(profile.has_attribute("clerkId"));
        assert_eq!(profile.attribute("birthday").unwrap().pg_type.as_deref(), Some("date"));
        assert!(profile.allows(Operation::View));
        assert!(!profile.allows(Operation::Create));
        assert_eq!(config.users[0].user_id, 7);
    }

    #[test]
    fn parse_error_is_load_error() {
        assert!(matches!(parse("{ not json"), Err(ConfigError::Load(_))));
    }
}
