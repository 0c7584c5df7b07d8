//! Grant administration and resolved permission listings

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::condition::Condition;
use crate::error::{AuthzError, Result};
use crate::store::{CatalogStore, PermissionStore, RoleStore, UserStore};
use crate::types::{
    Action, ActionId, NewPermission, Permission, PermissionId, PermissionStatus, Resource,
    ResourceId, RoleId, UserId,
};

/// Grant request builder
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGrant {
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    pub action_id: ActionId,
    pub condition: Option<Condition>,
    pub priority: i32,
    pub status: PermissionStatus,
}

impl PermissionGrant {
    pub fn new(role_id: RoleId, resource_id: ResourceId, action_id: ActionId) -> Self {
        Self {
            role_id,
            resource_id,
            action_id,
            condition: None,
            priority: 0,
            status: PermissionStatus::Active,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Stored and reported, never used to order evaluation
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: PermissionStatus) -> Self {
        self.status = status;
        self
    }
}

/// Active grant with its resource and action resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDetail {
    pub permission_id: PermissionId,
    pub role_id: RoleId,
    pub resource: Resource,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub priority: i32,
}

/// Grant administration over injected stores
pub struct PermissionService {
    permissions: Arc<dyn PermissionStore>,
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl PermissionService {
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            permissions,
            roles,
            users,
            catalog,
        }
    }

    /// Grant `action_id` on `resource_id` to `role_id`
    ///
    /// # Errors
    /// `NotFound` if the role, resource or action is absent, `Conflict` if
    /// the triple is already granted.
    pub async fn grant_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action_id: ActionId,
        condition: Option<Condition>,
    ) -> Result<Permission> {
        let mut grant = PermissionGrant::new(role_id, resource_id, action_id);
        grant.condition = condition;
        self.grant(grant).await
    }

    /// Grant with full options
    pub async fn grant(&self, grant: PermissionGrant) -> Result<Permission> {
        let condition = grant.condition.as_ref().map(Condition::to_json).transpose()?;

        // Existence and uniqueness are checked by the store in one atomic step
        let permission = self
            .permissions
            .insert_permission(NewPermission {
                role_id: grant.role_id,
                resource_id: grant.resource_id,
                action_id: grant.action_id,
                status: grant.status,
                condition,
                priority: grant.priority,
            })
            .await?;

        info!(
            "Granted action {} on resource {} to role {} (permission {})",
            permission.action_id, permission.resource_id, permission.role_id, permission.id
        );
        Ok(permission)
    }

    /// Remove the grant for a triple (`NotFound` if there is none)
    pub async fn revoke_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action_id: ActionId,
    ) -> Result<()> {
        self.permissions
            .delete_permission(role_id, resource_id, action_id)
            .await?;
        info!(
            "Revoked action {} on resource {} from role {}",
            action_id, resource_id, role_id
        );
        Ok(())
    }

    pub async fn set_permission_status(
        &self,
        id: PermissionId,
        status: PermissionStatus,
    ) -> Result<Permission> {
        let permission = self.permissions.set_permission_status(id, status).await?;
        info!("Permission {} is now {}", id, status.as_str());
        Ok(permission)
    }

    pub async fn get_permission(&self, id: PermissionId) -> Result<Permission> {
        self.permissions
            .permission(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("permission", id))
    }

    /// Active grants of one role
    pub async fn get_role_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionDetail>> {
        if self.roles.role(role_id).await?.is_none() {
            return Err(AuthzError::not_found("role", role_id));
        }
        self.resolve_active(self.permissions.role_permissions(role_id).await?)
            .await
    }

    /// Active grants across the user's directly-assigned active roles
    ///
    /// Roles inherited through the hierarchy are not included. When two roles
    /// grant the same pair, both entries are returned.
    pub async fn get_user_permissions(&self, user_id: UserId) -> Result<Vec<PermissionDetail>> {
        if self.users.user(user_id).await?.is_none() {
            return Err(AuthzError::not_found("user", user_id));
        }

        let mut details = Vec::new();
        for role in self.roles.user_roles(user_id).await? {
            if !role.is_active() {
                debug!("Skipping inactive role '{}'", role.name);
                continue;
            }
            let grants = self.permissions.role_permissions(role.id).await?;
            details.extend(self.resolve_active(grants).await?);
        }
        Ok(details)
    }

    async fn resolve_active(&self, grants: Vec<Permission>) -> Result<Vec<PermissionDetail>> {
        let mut details = Vec::with_capacity(grants.len());
        for grant in grants.into_iter().filter(Permission::is_active) {
            let resource = self
                .catalog
                .resource(grant.resource_id)
                .await?
                .ok_or_else(|| AuthzError::not_found("resource", grant.resource_id))?;
            let action = self
                .catalog
                .action(grant.action_id)
                .await?
                .ok_or_else(|| AuthzError::not_found("action", grant.action_id))?;
            let condition = grant.condition.as_deref().map(Condition::from_json).transpose()?;

            details.push(PermissionDetail {
                permission_id: grant.id,
                role_id: grant.role_id,
                resource,
                action,
                condition,
                priority: grant.priority,
            });
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::{NewAction, NewResource, NewRole};

    #[tokio::test]
    async fn test_grant_serializes_condition() {
        let store = Arc::new(InMemoryStore::new());
        let service = PermissionService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let role = store.insert_role(NewRole::new("editor")).await.unwrap();
        let resource = store.insert_resource(NewResource::new("article")).await.unwrap();
        let action = store.insert_action(NewAction::new("edit")).await.unwrap();

        let condition = Condition::expression("resource.status == 'draft'");
        let permission = service
            .grant(
                PermissionGrant::new(role.id, resource.id, action.id)
                    .with_condition(condition.clone())
                    .with_priority(10),
            )
            .await
            .unwrap();

        assert_eq!(permission.priority, 10);
        let stored = Condition::from_json(permission.condition.as_deref().unwrap()).unwrap();
        assert_eq!(stored, condition);

        let details = service.get_role_permissions(role.id).await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].resource.name, "article");
        assert_eq!(details[0].action.name, "edit");
        assert_eq!(details[0].condition, Some(condition));
        assert_eq!(details[0].priority, 10);
    }

    #[tokio::test]
    async fn test_inactive_grants_are_hidden() {
        let store = Arc::new(InMemoryStore::new());
        let service = PermissionService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let role = store.insert_role(NewRole::new("viewer")).await.unwrap();
        let resource = store.insert_resource(NewResource::new("report")).await.unwrap();
        let action = store.insert_action(NewAction::new("read")).await.unwrap();

        service
            .grant(PermissionGrant::new(role.id, resource.id, action.id).with_status(PermissionStatus::Inactive))
            .await
            .unwrap();

        assert!(service.get_role_permissions(role.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_permissions_of_unknown_role() {
        let store = Arc::new(InMemoryStore::new());
        let service = PermissionService::new(store.clone(), store.clone(), store.clone(), store);

        let result = service.get_role_permissions(77).await;
        assert!(matches!(result, Err(AuthzError::NotFound(_))));
    }
}
