//! Raw config types as read from the entity config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-attribute validation rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeConfig {
    Name(String),
    Typed {
        name: String,
        /// PostgreSQL type used to cast bound values (e.g. "timestamptz").
        #[serde(default, rename = "pgType")]
        pg_type: Option<String>,
    },
}

impl AttributeConfig {
    pub fn name(&self) -> &str {
        match self {
            AttributeConfig::Name(n) => n,
            AttributeConfig::Typed { name, .. } => name,
        }
    }

    pub fn pg_type(&self) -> Option<&str> {
        match self {
            AttributeConfig::Name(_) => None,
            AttributeConfig::Typed { pg_type, .. } => pg_type.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    /// Type name, optionally namespaced (`common\models\Clerk`, `shop::Order`).
    pub type_name: String,
    pub table: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// URL segment; defaults to the plural collection key.
    #[serde(default)]
    pub path_segment: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default = "default_alias_attribute")]
    pub alias_attribute: String,
    /// Attribute holding the owning user's id; mutation by other users is refused.
    #[serde(default)]
    pub owner_attribute: Option<String>,
    /// Attribute set to 1 instead of deleting the row.
    #[serde(default)]
    pub soft_delete_attribute: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
    /// Types whose `xxxSid` request field is resolved into `xxxId` before create/update.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    pub user_id: i64,
}

/// Contents of the entity config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

fn default_schema() -> String {
    "public".into()
}

fn default_primary_key() -> String {
    "id".into()
}

fn default_alias_attribute() -> String {
    "sid".into()
}

fn default_operations() -> Vec<String> {
    ["index", "view", "create", "update", "delete"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
