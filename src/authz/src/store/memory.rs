//! In-memory store implementation
//!
//! All tables live behind a single `RwLock`. Every mutation runs its checks
//! and its write under one write guard, which gives the same atomicity the
//! PostgreSQL backend gets from unique and foreign-key constraints.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AttributeStore, AuditStore, CatalogStore, PermissionStore, RoleStore, UserStore};
use crate::audit::{AuditQuery, AuditStats};
use crate::error::{AuthzError, Result};
use crate::hierarchy::RoleGraph;
use crate::types::{
    Action, ActionId, Attribute, AttributeOwner, AttributeValue, AuditLogEntry, NewAction,
    NewAuditEntry, NewPermission, NewResource, NewRole, Permission, PermissionId,
    PermissionStatus, Resource, ResourceId, Role, RoleId, RoleInheritance, RoleStatus, User,
    UserId,
};

#[derive(Debug, Default)]
struct Tables {
    /// Shared id sequence; 0 is never handed out
    last_id: i64,

    users: BTreeMap<UserId, User>,
    resources: BTreeMap<ResourceId, Resource>,
    actions: BTreeMap<ActionId, Action>,
    roles: BTreeMap<RoleId, Role>,

    /// (user, role) links in assignment order
    user_roles: Vec<(UserId, RoleId)>,

    role_edges: Vec<RoleInheritance>,
    permissions: BTreeMap<PermissionId, Permission>,

    /// (owner, owner id) -> key -> attribute
    attributes: BTreeMap<(AttributeOwner, i64), BTreeMap<String, Attribute>>,

    audit: Vec<AuditLogEntry>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn resource_name_taken(&self, name: &str, except: Option<ResourceId>) -> bool {
        self.resources
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }

    fn action_name_taken(&self, name: &str, except: Option<ActionId>) -> bool {
        self.actions
            .values()
            .any(|a| a.name == name && Some(a.id) != except)
    }

    /// Whether `candidate` is `id` or lies beneath it in the resource tree
    fn is_same_or_descendant(&self, id: ResourceId, candidate: ResourceId) -> bool {
        let mut cursor = Some(candidate);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            steps += 1;
            if steps > self.resources.len() {
                return false;
            }
            cursor = self.resources.get(&current).and_then(|r| r.parent_id);
        }
        false
    }

    fn owner_exists(&self, owner: AttributeOwner, owner_id: i64) -> bool {
        match owner {
            AttributeOwner::User => self.users.contains_key(&owner_id),
            AttributeOwner::Resource => self.resources.contains_key(&owner_id),
        }
    }
}

/// In-memory store for tests, embedding and single-process deployments
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, username: &str) -> Result<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == username) {
            return Err(AuthzError::Conflict(format!("user '{}' already exists", username)));
        }

        let user = User {
            id: t.next_id(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource> {
        let mut t = self.tables.write().await;
        if t.resource_name_taken(&resource.name, None) {
            return Err(AuthzError::Conflict(format!("resource '{}' already exists", resource.name)));
        }
        if let Some(parent_id) = resource.parent_id {
            if !t.resources.contains_key(&parent_id) {
                return Err(AuthzError::not_found("parent resource", parent_id));
            }
        }

        let now = Utc::now();
        let created = Resource {
            id: t.next_id(),
            name: resource.name,
            description: resource.description,
            parent_id: resource.parent_id,
            created_at: now,
            updated_at: now,
        };
        t.resources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_resource(&self, id: ResourceId, resource: NewResource) -> Result<Resource> {
        let mut t = self.tables.write().await;
        if !t.resources.contains_key(&id) {
            return Err(AuthzError::not_found("resource", id));
        }
        if t.resource_name_taken(&resource.name, Some(id)) {
            return Err(AuthzError::Conflict(format!("resource '{}' already exists", resource.name)));
        }
        if let Some(parent_id) = resource.parent_id {
            if !t.resources.contains_key(&parent_id) {
                return Err(AuthzError::not_found("parent resource", parent_id));
            }
            if t.is_same_or_descendant(id, parent_id) {
                return Err(AuthzError::Validation(format!(
                    "resource {} cannot be nested under itself or a descendant",
                    id
                )));
            }
        }

        let entry = t
            .resources
            .get_mut(&id)
            .ok_or_else(|| AuthzError::not_found("resource", id))?;
        entry.name = resource.name;
        entry.description = resource.description;
        entry.parent_id = resource.parent_id;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_resource(&self, id: ResourceId) -> Result<()> {
        let mut t = self.tables.write().await;
        if !t.resources.contains_key(&id) {
            return Err(AuthzError::not_found("resource", id));
        }
        if t.resources.values().any(|r| r.parent_id == Some(id)) {
            return Err(AuthzError::Constraint(format!("resource {} has child resources", id)));
        }
        if t.permissions.values().any(|p| p.resource_id == id) {
            return Err(AuthzError::Constraint(format!(
                "resource {} is referenced by permissions",
                id
            )));
        }

        t.resources.remove(&id);
        t.attributes.remove(&(AttributeOwner::Resource, id));
        Ok(())
    }

    async fn resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.tables.read().await.resources.get(&id).cloned())
    }

    async fn resource_by_name(&self, name: &str) -> Result<Option<Resource>> {
        let t = self.tables.read().await;
        Ok(t.resources.values().find(|r| r.name == name).cloned())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        Ok(self.tables.read().await.resources.values().cloned().collect())
    }

    async fn child_resources(&self, id: ResourceId) -> Result<Vec<Resource>> {
        let t = self.tables.read().await;
        Ok(t.resources
            .values()
            .filter(|r| r.parent_id == Some(id))
            .cloned()
            .collect())
    }

    async fn insert_action(&self, action: NewAction) -> Result<Action> {
        let mut t = self.tables.write().await;
        if t.action_name_taken(&action.name, None) {
            return Err(AuthzError::Conflict(format!("action '{}' already exists", action.name)));
        }

        let now = Utc::now();
        let created = Action {
            id: t.next_id(),
            name: action.name,
            description: action.description,
            created_at: now,
            updated_at: now,
        };
        t.actions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_action(&self, id: ActionId, action: NewAction) -> Result<Action> {
        let mut t = self.tables.write().await;
        if !t.actions.contains_key(&id) {
            return Err(AuthzError::not_found("action", id));
        }
        if t.action_name_taken(&action.name, Some(id)) {
            return Err(AuthzError::Conflict(format!("action '{}' already exists", action.name)));
        }

        let entry = t
            .actions
            .get_mut(&id)
            .ok_or_else(|| AuthzError::not_found("action", id))?;
        entry.name = action.name;
        entry.description = action.description;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_action(&self, id: ActionId) -> Result<()> {
        let mut t = self.tables.write().await;
        if !t.actions.contains_key(&id) {
            return Err(AuthzError::not_found("action", id));
        }
        if t.permissions.values().any(|p| p.action_id == id) {
            return Err(AuthzError::Constraint(format!(
                "action {} is referenced by permissions",
                id
            )));
        }

        t.actions.remove(&id);
        Ok(())
    }

    async fn action(&self, id: ActionId) -> Result<Option<Action>> {
        Ok(self.tables.read().await.actions.get(&id).cloned())
    }

    async fn action_by_name(&self, name: &str) -> Result<Option<Action>> {
        let t = self.tables.read().await;
        Ok(t.actions.values().find(|a| a.name == name).cloned())
    }

    async fn list_actions(&self) -> Result<Vec<Action>> {
        Ok(self.tables.read().await.actions.values().cloned().collect())
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn insert_role(&self, role: NewRole) -> Result<Role> {
        let mut t = self.tables.write().await;
        if t.roles.values().any(|r| r.name == role.name) {
            return Err(AuthzError::Conflict(format!("role '{}' already exists", role.name)));
        }

        let created = Role {
            id: t.next_id(),
            name: role.name,
            description: role.description,
            status: role.status,
            created_at: Utc::now(),
        };
        t.roles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_role_status(&self, id: RoleId, status: RoleStatus) -> Result<Role> {
        let mut t = self.tables.write().await;
        let role = t
            .roles
            .get_mut(&id)
            .ok_or_else(|| AuthzError::not_found("role", id))?;
        role.status = status;
        Ok(role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        let mut t = self.tables.write().await;
        if !t.roles.contains_key(&id) {
            return Err(AuthzError::not_found("role", id));
        }
        if t.permissions.values().any(|p| p.role_id == id) {
            return Err(AuthzError::Constraint(format!("role {} is referenced by permissions", id)));
        }

        t.roles.remove(&id);
        t.user_roles.retain(|(_, role_id)| *role_id != id);
        t.role_edges.retain(|e| e.parent_id != id && e.child_id != id);
        Ok(())
    }

    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let t = self.tables.read().await;
        Ok(t.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user_id) {
            return Err(AuthzError::not_found("user", user_id));
        }
        if !t.roles.contains_key(&role_id) {
            return Err(AuthzError::not_found("role", role_id));
        }
        if t.user_roles.contains(&(user_id, role_id)) {
            return Err(AuthzError::Conflict(format!(
                "user {} already has role {}",
                user_id, role_id
            )));
        }

        t.user_roles.push((user_id, role_id));
        Ok(())
    }

    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut t = self.tables.write().await;
        let before = t.user_roles.len();
        t.user_roles.retain(|link| *link != (user_id, role_id));
        if t.user_roles.len() == before {
            return Err(AuthzError::NotFound(format!(
                "user {} does not have role {}",
                user_id, role_id
            )));
        }
        Ok(())
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let t = self.tables.read().await;
        Ok(t.user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, role_id)| t.roles.get(role_id).cloned())
            .collect())
    }

    async fn insert_role_edge(&self, edge: RoleInheritance) -> Result<()> {
        let mut t = self.tables.write().await;
        for id in [edge.parent_id, edge.child_id] {
            if !t.roles.contains_key(&id) {
                return Err(AuthzError::not_found("role", id));
            }
        }
        if edge.parent_id == edge.child_id {
            return Err(AuthzError::Validation(format!(
                "role {} cannot inherit from itself",
                edge.parent_id
            )));
        }
        if t.role_edges.contains(&edge) {
            return Err(AuthzError::Conflict(format!(
                "role {} already inherits from role {}",
                edge.child_id, edge.parent_id
            )));
        }
        if RoleGraph::from_edges(&t.role_edges).would_create_cycle(edge.parent_id, edge.child_id) {
            return Err(AuthzError::Conflict(format!(
                "edge {} -> {} would create a cycle",
                edge.parent_id, edge.child_id
            )));
        }

        t.role_edges.push(edge);
        Ok(())
    }

    async fn delete_role_edge(&self, edge: RoleInheritance) -> Result<()> {
        let mut t = self.tables.write().await;
        let before = t.role_edges.len();
        t.role_edges.retain(|e| *e != edge);
        if t.role_edges.len() == before {
            return Err(AuthzError::NotFound(format!(
                "no inheritance edge {} -> {}",
                edge.parent_id, edge.child_id
            )));
        }
        Ok(())
    }

    async fn role_edges(&self) -> Result<Vec<RoleInheritance>> {
        Ok(self.tables.read().await.role_edges.clone())
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        let mut t = self.tables.write().await;
        if !t.roles.contains_key(&permission.role_id) {
            return Err(AuthzError::not_found("role", permission.role_id));
        }
        if !t.resources.contains_key(&permission.resource_id) {
            return Err(AuthzError::not_found("resource", permission.resource_id));
        }
        if !t.actions.contains_key(&permission.action_id) {
            return Err(AuthzError::not_found("action", permission.action_id));
        }
        if t.permissions.values().any(|p| {
            p.role_id == permission.role_id && p.targets(permission.resource_id, permission.action_id)
        }) {
            return Err(AuthzError::Conflict(format!(
                "role {} already has action {} on resource {}",
                permission.role_id, permission.action_id, permission.resource_id
            )));
        }

        let created = Permission {
            id: t.next_id(),
            role_id: permission.role_id,
            resource_id: permission.resource_id,
            action_id: permission.action_id,
            status: permission.status,
            condition: permission.condition,
            priority: permission.priority,
            created_at: Utc::now(),
        };
        t.permissions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action_id: ActionId,
    ) -> Result<()> {
        let mut t = self.tables.write().await;
        let id = t
            .permissions
            .values()
            .find(|p| p.role_id == role_id && p.targets(resource_id, action_id))
            .map(|p| p.id)
            .ok_or_else(|| {
                AuthzError::NotFound(format!(
                    "no permission for role {} on resource {} action {}",
                    role_id, resource_id, action_id
                ))
            })?;

        t.permissions.remove(&id);
        Ok(())
    }

    async fn set_permission_status(
        &self,
        id: PermissionId,
        status: PermissionStatus,
    ) -> Result<Permission> {
        let mut t = self.tables.write().await;
        let permission = t
            .permissions
            .get_mut(&id)
            .ok_or_else(|| AuthzError::not_found("permission", id))?;
        permission.status = status;
        Ok(permission.clone())
    }

    async fn permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.tables.read().await.permissions.get(&id).cloned())
    }

    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        let t = self.tables.read().await;
        Ok(t.permissions
            .values()
            .filter(|p| p.role_id == role_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttributeStore for InMemoryStore {
    async fn upsert_attribute(
        &self,
        owner: AttributeOwner,
        owner_id: i64,
        key: &str,
        value: AttributeValue,
    ) -> Result<Attribute> {
        let mut t = self.tables.write().await;
        if !t.owner_exists(owner, owner_id) {
            return Err(AuthzError::not_found(owner.as_str(), owner_id));
        }

        let attribute = Attribute {
            owner,
            owner_id,
            key: key.to_string(),
            value_type: value.value_type(),
            value,
            updated_at: Utc::now(),
        };
        t.attributes
            .entry((owner, owner_id))
            .or_default()
            .insert(key.to_string(), attribute.clone());
        Ok(attribute)
    }

    async fn attributes(&self, owner: AttributeOwner, owner_id: i64) -> Result<Vec<Attribute>> {
        let t = self.tables.read().await;
        Ok(t.attributes
            .get(&(owner, owner_id))
            .map(|by_key| by_key.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
        let mut t = self.tables.write().await;
        let stored = AuditLogEntry {
            id: t.next_id(),
            user_id: entry.user_id,
            resource_id: entry.resource_id,
            action_id: entry.action_id,
            operation: entry.operation,
            result: entry.result,
            reason: entry.reason,
            context: entry.context,
            created_at: Utc::now(),
        };
        t.audit.push(stored.clone());
        Ok(stored)
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        let t = self.tables.read().await;
        Ok(t.audit
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn audit_stats(&self) -> Result<AuditStats> {
        let t = self.tables.read().await;
        let allowed = t.audit.iter().filter(|e| e.result).count();
        Ok(AuditStats {
            total_decisions: t.audit.len(),
            allowed_decisions: allowed,
            denied_decisions: t.audit.len() - allowed,
        })
    }
}
