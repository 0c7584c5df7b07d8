//! Core authorization types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{AuthzError, Result};

/// Unique user identifier
pub type UserId = i64;

/// Unique resource identifier
pub type ResourceId = i64;

/// Unique action identifier
pub type ActionId = i64;

/// Unique role identifier
pub type RoleId = i64;

/// Unique permission (grant) identifier
pub type PermissionId = i64;

/// Id recorded in audit entries when a name could not be resolved
pub const UNRESOLVED_ID: i64 = 0;

/// Typed key/value facts about one owner
pub type AttributeMap = HashMap<String, AttributeValue>;

/// Caller-supplied request environment (time, IP, channel, ...)
pub type Environment = HashMap<String, AttributeValue>;

/// User known to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Protectable entity, optionally nested under a parent resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,

    /// Unique resource name (e.g., "article")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ResourceId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resource creation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ResourceId>,
}

impl NewResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: ResourceId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Named operation performable on a resource (flat namespace)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,

    /// Unique action name (e.g., "read", "delete")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Action creation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAction {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Role lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Active,
    Inactive,
}

impl RoleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleStatus::Active => "active",
            RoleStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(RoleStatus::Active),
            "inactive" => Ok(RoleStatus::Inactive),
            other => Err(AuthzError::Validation(format!("unknown role status '{}'", other))),
        }
    }
}

/// Role that permissions are granted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: RoleStatus,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn is_active(&self) -> bool {
        self.status == RoleStatus::Active
    }
}

/// Role creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_role_status")]
    pub status: RoleStatus,
}

fn default_role_status() -> RoleStatus {
    RoleStatus::Active
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            status: RoleStatus::Active,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: RoleStatus) -> Self {
        self.status = status;
        self
    }
}

/// Directed parent -> child edge between two roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleInheritance {
    pub parent_id: RoleId,
    pub child_id: RoleId,
}

/// Grant lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Active,
    Inactive,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Active => "active",
            PermissionStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(PermissionStatus::Active),
            "inactive" => Ok(PermissionStatus::Inactive),
            other => Err(AuthzError::Validation(format!(
                "unknown permission status '{}'",
                other
            ))),
        }
    }
}

/// Stored grant binding (role, resource, action)
///
/// At most one grant exists per triple. `condition` holds the serialized
/// [`Condition`](crate::condition::Condition) and `priority` is inert metadata:
/// the checker never orders candidates by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    pub action_id: ActionId,
    pub status: PermissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn is_active(&self) -> bool {
        self.status == PermissionStatus::Active
    }

    /// Whether this grant targets the given resource/action pair
    pub fn targets(&self, resource_id: ResourceId, action_id: ActionId) -> bool {
        self.resource_id == resource_id && self.action_id == action_id
    }
}

/// Grant insertion request as handed to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    pub action_id: ActionId,
    pub status: PermissionStatus,
    pub condition: Option<String>,
    pub priority: i32,
}

/// Kind of subject an attribute is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeOwner {
    User,
    Resource,
}

impl AttributeOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeOwner::User => "user",
            AttributeOwner::Resource => "resource",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "user" => Ok(AttributeOwner::User),
            "resource" => Ok(AttributeOwner::Resource),
            other => Err(AuthzError::Validation(format!("unknown attribute owner '{}'", other))),
        }
    }
}

impl fmt::Display for AttributeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value-type tag stored next to every attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Boolean,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::Boolean => "boolean",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "string" => Ok(AttributeType::String),
            "integer" => Ok(AttributeType::Integer),
            "float" => Ok(AttributeType::Float),
            "boolean" => Ok(AttributeType::Boolean),
            other => Err(AuthzError::Validation(format!("unknown attribute type '{}'", other))),
        }
    }
}

/// Typed attribute value
///
/// Serialized untagged, so JSON `"5"` is a string and `5` is an integer.
/// Equality is exact: `Integer(5)` never equals `String("5")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn value_type(&self) -> AttributeType {
        match self {
            AttributeValue::Boolean(_) => AttributeType::Boolean,
            AttributeValue::Integer(_) => AttributeType::Integer,
            AttributeValue::Float(_) => AttributeType::Float,
            AttributeValue::String(_) => AttributeType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form handed to the expression engine
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Boolean(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Text column encoding; the type tag is stored separately
    pub fn encode(&self) -> String {
        match self {
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::String(s) => s.clone(),
        }
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(value_type: AttributeType, raw: &str) -> Result<Self> {
        let invalid = || {
            AuthzError::Validation(format!(
                "value '{}' is not a valid {}",
                raw,
                value_type.as_str()
            ))
        };

        match value_type {
            AttributeType::String => Ok(AttributeValue::String(raw.to_string())),
            AttributeType::Integer => raw.parse().map(AttributeValue::Integer).map_err(|_| invalid()),
            AttributeType::Float => raw.parse().map(AttributeValue::Float).map_err(|_| invalid()),
            AttributeType::Boolean => raw.parse().map(AttributeValue::Boolean).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

/// Stored attribute row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub owner: AttributeOwner,
    pub owner_id: i64,
    pub key: String,
    pub value: AttributeValue,
    pub value_type: AttributeType,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of one authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: UserId,
    pub resource_id: ResourceId,
    pub action_id: ActionId,

    /// Always "check" for entries written by the checker
    pub operation: String,

    pub result: bool,
    pub reason: String,

    /// Serialized environment snapshot, absent when serialization failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Audit entry as handed to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub resource_id: ResourceId,
    pub action_id: ActionId,
    pub operation: String,
    pub result: bool,
    pub reason: String,
    pub context: Option<String>,
}
