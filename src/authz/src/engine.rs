//! Authorization engine facade
//!
//! Wires every service over one injected store:
//!
//! ```text
//! AuthzEngine ─┬─ Catalog            (resources, actions)
//!              ├─ RoleRegistry       (users, roles, assignments, hierarchy)
//!              ├─ PermissionService  (grants)
//!              ├─ AttributeService   (user/resource attributes)
//!              ├─ PermissionChecker ── ConditionEvaluator ── CEL program cache
//!              └─ AuditLogger
//! ```
//!
//! The engine holds no authorization state of its own; every check re-reads
//! the store.

use std::sync::Arc;
use tracing::info;

use crate::attributes::AttributeService;
use crate::audit::AuditLogger;
use crate::catalog::Catalog;
use crate::cel::Engine as CelEngine;
use crate::checker::PermissionChecker;
use crate::condition::ConditionEvaluator;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::permissions::PermissionService;
use crate::roles::RoleRegistry;
use crate::store::{AuthzStore, InMemoryStore};
use crate::types::{Environment, UserId};

/// Authorization engine
pub struct AuthzEngine {
    catalog: Catalog,
    roles: RoleRegistry,
    permissions: PermissionService,
    attributes: AttributeService,
    checker: PermissionChecker,
    audit: Arc<AuditLogger>,
    cel: Arc<CelEngine>,
    config: EngineConfig,
}

impl AuthzEngine {
    /// Engine over a fresh in-memory store with default configuration
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), EngineConfig::default())
    }

    /// Engine over an injected store
    pub fn new<S: AuthzStore + 'static>(store: Arc<S>, config: EngineConfig) -> Self {
        let cel = Arc::new(CelEngine::with_caching(config.cache_expressions));

        let audit = if config.enable_audit {
            AuditLogger::new(store.clone(), store.clone())
        } else {
            AuditLogger::disabled(store.clone(), store.clone())
        };
        let audit = Arc::new(audit);

        let checker = PermissionChecker::new(
            store.clone(),
            ConditionEvaluator::new(cel.clone()),
            audit.clone(),
        );

        info!(
            "AuthzEngine initialized with audit={}, expression_cache={}",
            config.enable_audit, config.cache_expressions
        );

        Self {
            catalog: Catalog::new(store.clone()),
            roles: RoleRegistry::new(store.clone(), store.clone()),
            permissions: PermissionService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            attributes: AttributeService::new(store),
            checker,
            audit,
            cel,
            config,
        }
    }

    /// Engine over PostgreSQL at `config.database_url`, with migrations applied
    ///
    /// # Errors
    /// `Validation` if no database URL is configured, `Database` if the
    /// connection or a migration fails.
    #[cfg(feature = "postgres")]
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        use crate::error::AuthzError;
        use crate::store::PostgresStore;

        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| AuthzError::Validation("database_url is not configured".to_string()))?;
        let store = PostgresStore::connect(url, config.max_connections).await?;
        store.run_migrations().await?;

        Ok(Self::new(Arc::new(store), config))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    pub fn attributes(&self) -> &AttributeService {
        &self.attributes
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shortcut for [`PermissionChecker::check_permission`]
    pub async fn check_permission(
        &self,
        user_id: UserId,
        resource_name: &str,
        action_name: &str,
        env: &Environment,
    ) -> Result<bool> {
        self.checker
            .check_permission(user_id, resource_name, action_name, env)
            .await
    }

    /// Drop compiled condition programs
    pub fn clear_expression_cache(&self) {
        self.cel.clear_cache();
    }

    /// Number of compiled condition programs held
    pub fn expression_cache_size(&self) -> usize {
        self.cel.cache_stats().size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::condition::Condition;
    use crate::types::{NewAction, NewResource, NewRole};

    #[tokio::test]
    async fn test_engine_wires_services() {
        let engine = AuthzEngine::in_memory();

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

        let stats = engine.audit().stats().await.unwrap();
        assert_eq!(stats.total_decisions, 1);
        assert_eq!(stats.allowed_decisions, 1);
    }

    #[tokio::test]
    async fn test_audit_can_be_disabled() {
        let config = EngineConfig::default().with_audit(false);
        let engine = AuthzEngine::new(Arc::new(InMemoryStore::new()), config);

        let user = engine.roles().create_user("bob").await.unwrap();
        engine.catalog().create_resource(NewResource::new("article")).await.unwrap();
        engine.catalog().create_action(NewAction::new("edit")).await.unwrap();

        let env = Environment::new();
        assert!(!engine.check_permission(user.id, "article", "edit", &env).await.unwrap());

        let entries = engine.audit().recent_entries(&AuditQuery::recent(10)).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_expression_cache_follows_config() {
        let engine = AuthzEngine::new(
            Arc::new(InMemoryStore::new()),
            EngineConfig::default().with_expression_cache(false),
        );

        let user = engine.roles().create_user("carol").await.unwrap();
        let role = engine.roles().create_role(NewRole::new("viewer")).await.unwrap();
        let resource = engine.catalog().create_resource(NewResource::new("doc")).await.unwrap();
        let action = engine.catalog().create_action(NewAction::new("read")).await.unwrap();
        engine.roles().assign_role(user.id, role.id).await.unwrap();
        engine
            .permissions()
            .grant_permission(
                role.id,
                resource.id,
                action.id,
                Some(Condition::expression("env.channel == 'web'")),
            )
            .await
            .unwrap();

        let mut env = Environment::new();
        env.insert("channel".to_string(), "web".into());
        assert!(engine.check_permission(user.id, "doc", "read", &env).await.unwrap());
        assert_eq!(engine.expression_cache_size(), 0);
    }
}
