//! Typed attributes attached to users and resources

use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::store::AttributeStore;
use crate::types::{Attribute, AttributeMap, AttributeOwner, AttributeValue, ResourceId, UserId};

/// Upsert-by-key attribute access
pub struct AttributeService {
    store: Arc<dyn AttributeStore>,
}

impl AttributeService {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    /// Insert or replace a user attribute (`NotFound` if the user is absent)
    pub async fn set_user_attribute(
        &self,
        user_id: UserId,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Attribute> {
        self.set(AttributeOwner::User, user_id, key, value.into()).await
    }

    /// Insert or replace a resource attribute (`NotFound` if the resource is absent)
    pub async fn set_resource_attribute(
        &self,
        resource_id: ResourceId,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Attribute> {
        self.set(AttributeOwner::Resource, resource_id, key, value.into()).await
    }

    /// All attributes of a user (empty if none)
    pub async fn get_user_attributes(&self, user_id: UserId) -> Result<AttributeMap> {
        self.get(AttributeOwner::User, user_id).await
    }

    /// All attributes of a resource (empty if none)
    pub async fn get_resource_attributes(&self, resource_id: ResourceId) -> Result<AttributeMap> {
        self.get(AttributeOwner::Resource, resource_id).await
    }

    async fn set(
        &self,
        owner: AttributeOwner,
        owner_id: i64,
        key: &str,
        value: AttributeValue,
    ) -> Result<Attribute> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthzError::Validation("attribute key cannot be empty".to_string()));
        }

        let attribute = self.store.upsert_attribute(owner, owner_id, key, value).await?;
        debug!(
            "Set {} {} attribute '{}' = {} ({})",
            owner,
            owner_id,
            attribute.key,
            attribute.value,
            attribute.value_type.as_str()
        );
        Ok(attribute)
    }

    async fn get(&self, owner: AttributeOwner, owner_id: i64) -> Result<AttributeMap> {
        Ok(self
            .store
            .attributes(owner, owner_id)
            .await?
            .into_iter()
            .map(|attribute| (attribute.key, attribute.value))
            .collect())
    }
}
