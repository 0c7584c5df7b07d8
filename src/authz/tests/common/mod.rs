//! Shared fixtures for integration tests

#![allow(dead_code)]

use grantwise_authz::{
    AuthzEngine, Condition, Environment, NewAction, NewResource, NewRole, Permission, Role, User,
};

/// Engine with one user holding one role, plus one resource and one action
pub struct Fixture {
    pub engine: AuthzEngine,
    pub user: User,
    pub role: Role,
    pub resource_id: i64,
    pub action_id: i64,
}

impl Fixture {
    pub async fn new(role: &str, resource: &str, action: &str) -> anyhow::Result<Self> {
        let engine = AuthzEngine::in_memory();
        let user = engine.roles().create_user("alice").await?;
        let role = engine.roles().create_role(NewRole::new(role)).await?;
        let resource = engine.catalog().create_resource(NewResource::new(resource)).await?;
        let action = engine.catalog().create_action(NewAction::new(action)).await?;
        engine.roles().assign_role(user.id, role.id).await?;

        Ok(Self {
            engine,
            user,
            role,
            resource_id: resource.id,
            action_id: action.id,
        })
    }

    /// Grant the fixture's pair to the fixture's role
    pub async fn grant(&self, condition: Option<Condition>) -> anyhow::Result<Permission> {
        Ok(self
            .engine
            .permissions()
            .grant_permission(self.role.id, self.resource_id, self.action_id, condition)
            .await?)
    }
}

pub fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), (*v).into()))
        .collect()
}
