//! Resolved entity registry: config validated, names derived, built once at startup.

use crate::config::ValidationRule;
use crate::naming::EntityNames;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Index,
    View,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Index => "index",
            Operation::View => "view",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Operation::Index),
            "view" => Ok(Operation::View),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttributeInfo {
    /// camelCase API name.
    pub name: String,
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub names: EntityNames,
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub primary_key: String,
    pub alias_attribute: String,
    pub owner_attribute: Option<String>,
    pub soft_delete_attribute: Option<String>,
    /// Declared attributes, primary key included.
    pub attributes: Vec<AttributeInfo>,
    /// Type names resolved from `xxxSid` request fields before writes.
    pub references: Vec<String>,
    pub operations: Vec<Operation>,
    pub validation: HashMap<String, ValidationRule>,
}

impl EntityDescriptor {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Immutable lookup table {type name -> descriptor}, also indexed by path segment.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    by_type: HashMap<String, Arc<EntityDescriptor>>,
    by_path: HashMap<String, Arc<EntityDescriptor>>,
}

impl EntityRegistry {
    pub(crate) fn from_descriptors(descriptors: Vec<EntityDescriptor>) -> Self {
        let mut registry = EntityRegistry::default();
        for d in descriptors {
            let d = Arc::new(d);
            registry.by_path.insert(d.path_segment.clone(), d.clone());
            registry.by_type.insert(d.type_name.clone(), d);
        }
        registry
    }

    pub fn by_type(&self, type_name: &str) -> Option<&Arc<EntityDescriptor>> {
        self.by_type.get(type_name)
    }

    pub fn by_path(&self, path_segment: &str) -> Option<&Arc<EntityDescriptor>> {
        self.by_path.get(path_segment)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityDescriptor>> {
        self.by_type.values()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
