//! Resource and action registries

use std::sync::Arc;
use tracing::info;

use crate::error::{AuthzError, Result};
use crate::store::CatalogStore;
use crate::types::{Action, ActionId, NewAction, NewResource, Resource, ResourceId};

/// Trimmed, non-empty name or `Validation`
pub(crate) fn required_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthzError::Validation(format!("{} name cannot be empty", kind)));
    }
    Ok(trimmed.to_string())
}

/// Administrative and lookup operations over resources and actions
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Register a resource
    ///
    /// # Errors
    /// `Validation` for a blank name, `Conflict` if the name is taken,
    /// `NotFound` if the parent does not exist.
    pub async fn create_resource(&self, mut resource: NewResource) -> Result<Resource> {
        resource.name = required_name("resource", &resource.name)?;
        let created = self.store.insert_resource(resource).await?;
        info!("Created resource '{}' ({})", created.name, created.id);
        Ok(created)
    }

    /// Rename, re-describe or re-parent a resource
    pub async fn update_resource(&self, id: ResourceId, mut resource: NewResource) -> Result<Resource> {
        resource.name = required_name("resource", &resource.name)?;
        let updated = self.store.update_resource(id, resource).await?;
        info!("Updated resource '{}' ({})", updated.name, updated.id);
        Ok(updated)
    }

    /// Delete a resource
    ///
    /// # Errors
    /// `Constraint` while child resources exist or any permission references it.
    pub async fn delete_resource(&self, id: ResourceId) -> Result<()> {
        self.store.delete_resource(id).await?;
        info!("Deleted resource {}", id);
        Ok(())
    }

    pub async fn get_resource(&self, id: ResourceId) -> Result<Resource> {
        self.store
            .resource(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("resource", id))
    }

    pub async fn get_resource_by_name(&self, name: &str) -> Result<Resource> {
        self.store
            .resource_by_name(name)
            .await?
            .ok_or_else(|| AuthzError::not_found("resource", name))
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        self.store.list_resources().await
    }

    /// Direct children of a resource
    pub async fn get_resource_children(&self, id: ResourceId) -> Result<Vec<Resource>> {
        self.get_resource(id).await?;
        self.store.child_resources(id).await
    }

    /// Register an action
    ///
    /// # Errors
    /// `Validation` for a blank name, `Conflict` if the name is taken.
    pub async fn create_action(&self, mut action: NewAction) -> Result<Action> {
        action.name = required_name("action", &action.name)?;
        let created = self.store.insert_action(action).await?;
        info!("Created action '{}' ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_action(&self, id: ActionId, mut action: NewAction) -> Result<Action> {
        action.name = required_name("action", &action.name)?;
        let updated = self.store.update_action(id, action).await?;
        info!("Updated action '{}' ({})", updated.name, updated.id);
        Ok(updated)
    }

    /// Delete an action (`Constraint` while any permission references it)
    pub async fn delete_action(&self, id: ActionId) -> Result<()> {
        self.store.delete_action(id).await?;
        info!("Deleted action {}", id);
        Ok(())
    }

    pub async fn get_action(&self, id: ActionId) -> Result<Action> {
        self.store
            .action(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("action", id))
    }

    pub async fn get_action_by_name(&self, name: &str) -> Result<Action> {
        self.store
            .action_by_name(name)
            .await?
            .ok_or_else(|| AuthzError::not_found("action", name))
    }

    pub async fn list_actions(&self) -> Result<Vec<Action>> {
        self.store.list_actions().await
    }
}
