//! Config validation: unique names, known references and operations.

use crate::config::{ConfigFile, Operation};
use crate::error::ConfigError;
use crate::naming::EntityNames;
use std::collections::HashSet;

pub fn validate(config: &ConfigFile) -> Result<(), ConfigError> {
    let mut type_names = HashSet::new();
    let mut path_segments = HashSet::new();

    for entity in &config.entities {
        if !type_names.insert(entity.type_name.as_str()) {
            return Err(ConfigError::DuplicateType(entity.type_name.clone()));
        }
        let segment = entity
            .path_segment
            .clone()
            .unwrap_or_else(|| EntityNames::derive(&entity.type_name).plural_collection_key);
        if !path_segments.insert(segment.clone()) {
            return Err(ConfigError::DuplicatePathSegment(segment));
        }
        for op in &entity.operations {
            if op.parse::<Operation>().is_err() {
                return Err(ConfigError::UnknownOperation {
                    entity: entity.type_name.clone(),
                    operation: op.clone(),
                });
            }
        }
    }

    for entity in &config.entities {
        for reference in &entity.references {
            if !type_names.contains(reference.as_str()) {
                return Err(ConfigError::UnknownReference {
                    entity: entity.type_name.clone(),
                    reference: reference.clone(),
                });
            }
        }
    }

    Ok(())
}
