//! Roles, user-role assignments and role inheritance

use std::sync::Arc;
use tracing::info;

use crate::catalog::required_name;
use crate::error::{AuthzError, Result};
use crate::hierarchy::RoleGraph;
use crate::store::{RoleStore, UserStore};
use crate::types::{NewRole, Role, RoleId, RoleInheritance, RoleStatus, User, UserId};

/// Role administration
///
/// The inheritance edges managed here are administrative metadata: the
/// permission checker only consults a user's directly-assigned roles.
pub struct RoleRegistry {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

impl RoleRegistry {
    pub fn new(roles: Arc<dyn RoleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { roles, users }
    }

    pub async fn create_user(&self, username: &str) -> Result<User> {
        let username = required_name("user", username)?;
        let user = self.users.insert_user(&username).await?;
        info!("Created user '{}' ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.users
            .user(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("user", id))
    }

    /// Create a role (`Conflict` if the name is taken)
    pub async fn create_role(&self, mut role: NewRole) -> Result<Role> {
        role.name = required_name("role", &role.name)?;
        let created = self.roles.insert_role(role).await?;
        info!("Created role '{}' ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_role_status(&self, id: RoleId, status: RoleStatus) -> Result<Role> {
        let role = self.roles.set_role_status(id, status).await?;
        info!("Role '{}' is now {}", role.name, status.as_str());
        Ok(role)
    }

    /// Delete a role (`Constraint` while permissions reference it)
    pub async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.roles.delete_role(id).await?;
        info!("Deleted role {}", id);
        Ok(())
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Role> {
        self.roles
            .role(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("role", id))
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Role> {
        self.roles
            .role_by_name(name)
            .await?
            .ok_or_else(|| AuthzError::not_found("role", name))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.list_roles().await
    }

    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.roles.assign_role(user_id, role_id).await?;
        info!("Assigned role {} to user {}", role_id, user_id);
        Ok(())
    }

    pub async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.roles.unassign_role(user_id, role_id).await?;
        info!("Removed role {} from user {}", role_id, user_id);
        Ok(())
    }

    /// Active roles directly assigned to a user, in assignment order
    pub async fn get_user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        self.get_user(user_id).await?;
        let roles = self.roles.user_roles(user_id).await?;
        Ok(roles.into_iter().filter(Role::is_active).collect())
    }

    /// Declare that `child_id` inherits from `parent_id`
    ///
    /// # Errors
    /// `NotFound` if either role is absent, `Conflict` if the edge exists or
    /// would close a cycle, `Validation` for a self-edge.
    pub async fn add_role_inheritance(&self, parent_id: RoleId, child_id: RoleId) -> Result<()> {
        self.roles
            .insert_role_edge(RoleInheritance { parent_id, child_id })
            .await?;
        info!("Role {} now inherits from role {}", child_id, parent_id);
        Ok(())
    }

    pub async fn remove_role_inheritance(&self, parent_id: RoleId, child_id: RoleId) -> Result<()> {
        self.roles
            .delete_role_edge(RoleInheritance { parent_id, child_id })
            .await?;
        info!("Role {} no longer inherits from role {}", child_id, parent_id);
        Ok(())
    }

    /// All ancestors of a role, nearest first
    pub async fn get_role_hierarchy(&self, role_id: RoleId) -> Result<Vec<Role>> {
        self.get_role(role_id).await?;
        let graph = RoleGraph::from_edges(&self.roles.role_edges().await?);
        self.resolve(graph.ancestors(role_id)).await
    }

    /// Direct descendants of a role
    pub async fn get_role_children(&self, role_id: RoleId) -> Result<Vec<Role>> {
        self.get_role(role_id).await?;
        let graph = RoleGraph::from_edges(&self.roles.role_edges().await?);
        self.resolve(graph.children(role_id)).await
    }

    async fn resolve(&self, ids: Vec<RoleId>) -> Result<Vec<Role>> {
        let mut roles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(role) = self.roles.role(id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}
