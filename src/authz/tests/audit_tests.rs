//! Audit trail tests: one entry per decision, never blocking the decision

mod common;

use async_trait::async_trait;
use common::{env, Fixture};
use grantwise_authz::audit::{AuditQuery, AuditStats};
use grantwise_authz::store::{
    AttributeStore, AuditStore, CatalogStore, PermissionStore, RoleStore, UserStore,
};
use grantwise_authz::types::{
    Action, Attribute, AttributeOwner, AttributeValue, NewAuditEntry, NewPermission, Permission,
    PermissionStatus, RoleInheritance,
};
use grantwise_authz::{
    AuditLogEntry, AuthzEngine, AuthzError, EngineConfig, Environment, InMemoryStore, NewAction,
    NewResource, NewRole, Resource, Result, Role, RoleStatus, User,
};
use grantwise_authz::{ActionId, PermissionId, ResourceId, RoleId, UserId};
use std::sync::Arc;

// ============================================================================
// RECORDED DECISIONS
// ============================================================================

#[tokio::test]
async fn test_each_outcome_is_recorded() {
    let fixture = Fixture::new("editor", "article", "edit").await.unwrap();
    let engine = &fixture.engine;
    let checker = engine.checker();

    // Deny: grant condition not met
    fixture
        .grant(Some(grantwise_authz::Condition::new().require_env("channel", "web")))
        .await
        .unwrap();
    assert!(!checker
        .check_permission(fixture.user.id, "article", "edit", &Environment::new())
        .await
        .unwrap());

    // Allow
    let web = env(&[("channel", "web")]);
    assert!(checker.check_permission(fixture.user.id, "article", "edit", &web).await.unwrap());

    // Deny: no roles
    let outsider = engine.roles().create_user("outsider").await.unwrap();
    assert!(!checker
        .check_permission(outsider.id, "article", "edit", &Environment::new())
        .await
        .unwrap());

    let entries = engine.audit().recent_entries(&AuditQuery::recent(10)).await.unwrap();
    let reasons: Vec<_> = entries.iter().map(|e| e.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec!["User has no roles", "Permission granted", "No matching permission found"]
    );

    let granted = &entries[1];
    assert!(granted.result);
    assert_eq!(granted.user_id, fixture.user.id);
    assert_eq!(granted.resource_id, fixture.resource_id);
    assert_eq!(granted.action_id, fixture.action_id);
    assert_eq!(granted.context.as_deref(), Some(r#"{"channel":"web"}"#));

    assert_eq!(
        engine.audit().stats().await.unwrap(),
        AuditStats {
            total_decisions: 3,
            allowed_decisions: 1,
            denied_decisions: 2,
        }
    );
}

#[tokio::test]
async fn test_query_by_user_and_limit() {
    let fixture = Fixture::new("editor", "article", "edit").await.unwrap();
    fixture.grant(None).await.unwrap();
    let engine = &fixture.engine;
    let other = engine.roles().create_user("other").await.unwrap();

    for _ in 0..3 {
        engine
            .check_permission(fixture.user.id, "article", "edit", &Environment::new())
            .await
            .unwrap();
    }
    engine
        .check_permission(other.id, "article", "edit", &Environment::new())
        .await
        .unwrap();

    let audit = engine.audit();
    let mine = audit
        .recent_entries(&AuditQuery::for_user(fixture.user.id, 10))
        .await
        .unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|e| e.user_id == fixture.user.id));
    assert!(mine.windows(2).all(|w| w[0].id > w[1].id), "newest first");

    let limited = audit.recent_entries(&AuditQuery::recent(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].user_id, other.id);
}

#[tokio::test]
async fn test_resolution_errors_are_not_audited() {
    let fixture = Fixture::new("editor", "article", "edit").await.unwrap();
    let engine = &fixture.engine;

    let result = engine
        .check_permission(fixture.user.id, "missing", "edit", &Environment::new())
        .await;
    assert!(matches!(result, Err(AuthzError::NotFound(_))));
    assert_eq!(engine.audit().stats().await.unwrap().total_decisions, 0);
}

// ============================================================================
// FAILING AUDIT BACKEND
// ============================================================================

/// Delegates everything to an in-memory store except audit writes, which fail
struct BrokenAudit {
    inner: InMemoryStore,
}

#[async_trait]
impl UserStore for BrokenAudit {
    async fn insert_user(&self, username: &str) -> Result<User> {
        self.inner.insert_user(username).await
    }
    async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.inner.user(id).await
    }
}

#[async_trait]
impl CatalogStore for BrokenAudit {
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource> {
        self.inner.insert_resource(resource).await
    }
    async fn update_resource(&self, id: ResourceId, resource: NewResource) -> Result<Resource> {
        self.inner.update_resource(id, resource).await
    }
    async fn delete_resource(&self, id: ResourceId) -> Result<()> {
        self.inner.delete_resource(id).await
    }
    async fn resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        self.inner.resource(id).await
    }
    async fn resource_by_name(&self, name: &str) -> Result<Option<Resource>> {
        self.inner.resource_by_name(name).await
    }
    async fn list_resources(&self) -> Result<Vec<Resource>> {
        self.inner.list_resources().await
    }
    async fn child_resources(&self, id: ResourceId) -> Result<Vec<Resource>> {
        self.inner.child_resources(id).await
    }
    async fn insert_action(&self, action: NewAction) -> Result<Action> {
        self.inner.insert_action(action).await
    }
    async fn update_action(&self, id: ActionId, action: NewAction) -> Result<Action> {
        self.inner.update_action(id, action).await
    }
    async fn delete_action(&self, id: ActionId) -> Result<()> {
        self.inner.delete_action(id).await
    }
    async fn action(&self, id: ActionId) -> Result<Option<Action>> {
        self.inner.action(id).await
    }
    async fn action_by_name(&self, name: &str) -> Result<Option<Action>> {
        self.inner.action_by_name(name).await
    }
    async fn list_actions(&self) -> Result<Vec<Action>> {
        self.inner.list_actions().await
    }
}

#[async_trait]
impl RoleStore for BrokenAudit {
    async fn insert_role(&self, role: NewRole) -> Result<Role> {
        self.inner.insert_role(role).await
    }
    async fn set_role_status(&self, id: RoleId, status: RoleStatus) -> Result<Role> {
        self.inner.set_role_status(id, status).await
    }
    async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.inner.delete_role(id).await
    }
    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        self.inner.role(id).await
    }
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.inner.role_by_name(name).await
    }
    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.inner.list_roles().await
    }
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.inner.assign_role(user_id, role_id).await
    }
    async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.inner.unassign_role(user_id, role_id).await
    }
    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        self.inner.user_roles(user_id).await
    }
    async fn insert_role_edge(&self, edge: RoleInheritance) -> Result<()> {
        self.inner.insert_role_edge(edge).await
    }
    async fn delete_role_edge(&self, edge: RoleInheritance) -> Result<()> {
        self.inner.delete_role_edge(edge).await
    }
    async fn role_edges(&self) -> Result<Vec<RoleInheritance>> {
        self.inner.role_edges().await
    }
}

#[async_trait]
impl PermissionStore for BrokenAudit {
    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        self.inner.insert_permission(permission).await
    }
    async fn delete_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action_id: ActionId,
    ) -> Result<()> {
        self.inner.delete_permission(role_id, resource_id, action_id).await
    }
    async fn set_permission_status(
        &self,
        id: PermissionId,
        status: PermissionStatus,
    ) -> Result<Permission> {
        self.inner.set_permission_status(id, status).await
    }
    async fn permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.inner.permission(id).await
    }
    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        self.inner.role_permissions(role_id).await
    }
}

#[async_trait]
impl AttributeStore for BrokenAudit {
    async fn upsert_attribute(
        &self,
        owner: AttributeOwner,
        owner_id: i64,
        key: &str,
        value: AttributeValue,
    ) -> Result<Attribute> {
        self.inner.upsert_attribute(owner, owner_id, key, value).await
    }
    async fn attributes(&self, owner: AttributeOwner, owner_id: i64) -> Result<Vec<Attribute>> {
        self.inner.attributes(owner, owner_id).await
    }
}

#[async_trait]
impl AuditStore for BrokenAudit {
    async fn append_audit(&self, _entry: NewAuditEntry) -> Result<AuditLogEntry> {
        Err(AuthzError::Database("audit log is read-only".to_string()))
    }
    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        self.inner.audit_entries(query).await
    }
    async fn audit_stats(&self) -> Result<AuditStats> {
        self.inner.audit_stats().await
    }
}

#[tokio::test]
async fn test_audit_failure_never_changes_decision() {
    let store = Arc::new(BrokenAudit {
        inner: InMemoryStore::new(),
    });
    let engine = AuthzEngine::new(store, EngineConfig::default());

    let user = engine.roles().create_user("alice").await.unwrap();
    let role = engine.roles().create_role(NewRole::new("editor")).await.unwrap();
    let resource = engine.catalog().create_resource(NewResource::new("article")).await.unwrap();
    let action = engine.catalog().create_action(NewAction::new("edit")).await.unwrap();
    engine.roles().assign_role(user.id, role.id).await.unwrap();
    engine
        .permissions()
        .grant_permission(role.id, resource.id, action.id, None)
        .await
        .unwrap();

    let env = Environment::new();
    assert!(engine.check_permission(user.id, "article", "edit", &env).await.unwrap());
    assert_eq!(engine.audit().stats().await.unwrap().total_decisions, 0);
}
