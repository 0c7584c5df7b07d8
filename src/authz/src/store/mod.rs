//! Persistence interfaces for the engine
//!
//! Each component talks to its own trait. A backend implements all of them
//! and is shared through one `Arc`, so that every integrity rule that has to
//! be atomic (grant uniqueness, delete protection, edge cycles) is enforced by
//! the backend itself rather than by a read-then-write in the service layer.
//!
//! Services perform input validation (blank names and the like) before
//! calling in; stores assume well-formed input.

use async_trait::async_trait;

use crate::audit::{AuditQuery, AuditStats};
use crate::error::Result;
use crate::types::{
    Action, ActionId, Attribute, AttributeOwner, AttributeValue, AuditLogEntry, NewAction,
    NewAuditEntry, NewPermission, NewResource, NewRole, Permission, PermissionId,
    PermissionStatus, Resource, ResourceId, Role, RoleId, RoleInheritance, RoleStatus, User,
    UserId,
};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// Minimal user registry
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user (`Conflict` on duplicate username)
    async fn insert_user(&self, username: &str) -> Result<User>;

    async fn user(&self, id: UserId) -> Result<Option<User>>;
}

/// Resource and action registries
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// `Conflict` on duplicate name, `NotFound` if the parent is absent
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource>;

    /// Replace name/description/parent
    ///
    /// `NotFound` for an unknown id or parent, `Conflict` on a taken name,
    /// `Validation` if the new parent is the resource itself or a descendant.
    async fn update_resource(&self, id: ResourceId, resource: NewResource) -> Result<Resource>;

    /// `Constraint` while child resources or permissions reference it
    async fn delete_resource(&self, id: ResourceId) -> Result<()>;

    async fn resource(&self, id: ResourceId) -> Result<Option<Resource>>;

    async fn resource_by_name(&self, name: &str) -> Result<Option<Resource>>;

    async fn list_resources(&self) -> Result<Vec<Resource>>;

    async fn child_resources(&self, id: ResourceId) -> Result<Vec<Resource>>;

    /// `Conflict` on duplicate name
    async fn insert_action(&self, action: NewAction) -> Result<Action>;

    async fn update_action(&self, id: ActionId, action: NewAction) -> Result<Action>;

    /// `Constraint` while permissions reference it
    async fn delete_action(&self, id: ActionId) -> Result<()>;

    async fn action(&self, id: ActionId) -> Result<Option<Action>>;

    async fn action_by_name(&self, name: &str) -> Result<Option<Action>>;

    async fn list_actions(&self) -> Result<Vec<Action>>;
}

/// Roles, user-role links and the role hierarchy
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// `Conflict` on duplicate name
    async fn insert_role(&self, role: NewRole) -> Result<Role>;

    async fn set_role_status(&self, id: RoleId, status: RoleStatus) -> Result<Role>;

    /// `Constraint` while permissions reference it; drops links and edges
    async fn delete_role(&self, id: RoleId) -> Result<()>;

    async fn role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>>;

    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// `NotFound` if either side is absent, `Conflict` if already linked
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()>;

    /// Roles linked to the user, in assignment order, regardless of status
    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>>;

    /// `NotFound` for unknown roles, `Conflict` for an existing edge or one
    /// that would close a cycle, `Validation` for a self-edge
    async fn insert_role_edge(&self, edge: RoleInheritance) -> Result<()>;

    async fn delete_role_edge(&self, edge: RoleInheritance) -> Result<()>;

    async fn role_edges(&self) -> Result<Vec<RoleInheritance>>;
}

/// Grant storage
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// `NotFound` for an unknown role/resource/action, `Conflict` if the
    /// triple is already granted
    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission>;

    /// `NotFound` if no grant exists for the triple
    async fn delete_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action_id: ActionId,
    ) -> Result<()>;

    async fn set_permission_status(
        &self,
        id: PermissionId,
        status: PermissionStatus,
    ) -> Result<Permission>;

    async fn permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    /// All grants of a role, any status, oldest first
    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>>;
}

/// Typed attributes per owner
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Insert or replace `(owner, owner_id, key)`; `NotFound` if the owner is absent
    async fn upsert_attribute(
        &self,
        owner: AttributeOwner,
        owner_id: i64,
        key: &str,
        value: AttributeValue,
    ) -> Result<Attribute>;

    async fn attributes(&self, owner: AttributeOwner, owner_id: i64) -> Result<Vec<Attribute>>;
}

/// Append-only decision log
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLogEntry>;

    /// Entries matching the query, newest first
    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>>;

    async fn audit_stats(&self) -> Result<AuditStats>;
}

/// Everything the engine needs from one backend
pub trait AuthzStore:
    UserStore + CatalogStore + RoleStore + PermissionStore + AttributeStore + AuditStore
{
}

impl<T> AuthzStore for T where
    T: UserStore + CatalogStore + RoleStore + PermissionStore + AttributeStore + AuditStore
{
}
