//! Permission checks
//!
//! A check resolves the user, resource and action, then walks the user's
//! directly-assigned active roles in assignment order. Within each role the
//! active grants for the requested pair are tried in turn and the first one
//! whose condition holds decides. Inherited roles and grant priority play no
//! part in the decision.
//!
//! Missing entities are returned as errors. Condition failures of any kind
//! only remove the grant they belong to from consideration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::condition::{ConditionEvaluator, ConditionInputs};
use crate::error::{AuthzError, Result};
use crate::store::{AttributeStore, AuthzStore, CatalogStore, PermissionStore, RoleStore, UserStore};
use crate::types::{AttributeOwner, AttributeMap, Environment, PermissionId, RoleId, UserId};

/// Why a check ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// A grant matched and its condition (if any) held
    PermissionGranted,

    /// The user has no active directly-assigned roles
    NoRoles,

    /// No grant of any role matched
    NoMatchingPermission,
}

impl DecisionReason {
    /// Reason text recorded in the audit log
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::PermissionGranted => "Permission granted",
            DecisionReason::NoRoles => "User has no roles",
            DecisionReason::NoMatchingPermission => "No matching permission found",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one permission check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,

    /// Whether the action is permitted
    pub allowed: bool,

    pub reason: DecisionReason,

    /// Grant that decided an allow
    pub permission_id: Option<PermissionId>,

    /// Role holding that grant
    pub role_id: Option<RoleId>,

    pub decided_at: DateTime<Utc>,
}

impl Decision {
    fn allow(permission_id: PermissionId, role_id: RoleId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed: true,
            reason: DecisionReason::PermissionGranted,
            permission_id: Some(permission_id),
            role_id: Some(role_id),
            decided_at: Utc::now(),
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed: false,
            reason,
            permission_id: None,
            role_id: None,
            decided_at: Utc::now(),
        }
    }
}

/// Decides whether a user may perform an action on a resource
pub struct PermissionChecker {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    attributes: Arc<dyn AttributeStore>,
    evaluator: ConditionEvaluator,
    audit: Arc<AuditLogger>,
}

impl PermissionChecker {
    pub fn new<S: AuthzStore + 'static>(
        store: Arc<S>,
        evaluator: ConditionEvaluator,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            roles: store.clone(),
            permissions: store.clone(),
            attributes: store,
            evaluator,
            audit,
        }
    }

    /// Whether `user_id` may perform `action_name` on `resource_name`
    ///
    /// # Errors
    /// `NotFound` if the user, resource or action does not exist, or a store
    /// error. Condition failures never surface here.
    pub async fn check_permission(
        &self,
        user_id: UserId,
        resource_name: &str,
        action_name: &str,
        env: &Environment,
    ) -> Result<bool> {
        Ok(self.check(user_id, resource_name, action_name, env).await?.allowed)
    }

    /// Full decision for one check; every decision is audited
    pub async fn check(
        &self,
        user_id: UserId,
        resource_name: &str,
        action_name: &str,
        env: &Environment,
    ) -> Result<Decision> {
        let user = self
            .users
            .user(user_id)
            .await?
            .ok_or_else(|| AuthzError::not_found("user", user_id))?;
        let resource = self
            .catalog
            .resource_by_name(resource_name)
            .await?
            .ok_or_else(|| AuthzError::not_found("resource", resource_name))?;
        let action = self
            .catalog
            .action_by_name(action_name)
            .await?
            .ok_or_else(|| AuthzError::not_found("action", action_name))?;

        let roles: Vec<_> = self
            .roles
            .user_roles(user.id)
            .await?
            .into_iter()
            .filter(|role| role.is_active())
            .collect();

        if roles.is_empty() {
            let decision = Decision::deny(DecisionReason::NoRoles);
            return Ok(self.finish(user.id, resource_name, action_name, env, decision).await);
        }

        let user_attrs = self.attribute_map(AttributeOwner::User, user.id).await?;
        let resource_attrs = self.attribute_map(AttributeOwner::Resource, resource.id).await?;
        let inputs = ConditionInputs {
            user: &user_attrs,
            resource: &resource_attrs,
            env,
        };

        for role in &roles {
            let grants = self.permissions.role_permissions(role.id).await?;
            for grant in grants
                .iter()
                .filter(|grant| grant.is_active() && grant.targets(resource.id, action.id))
            {
                let satisfied = match grant.condition.as_deref() {
                    None => true,
                    Some(raw) => self.evaluator.is_satisfied_raw(raw, inputs),
                };

                if satisfied {
                    debug!("Permission {} of role '{}' matched", grant.id, role.name);
                    let decision = Decision::allow(grant.id, role.id);
                    return Ok(self.finish(user.id, resource_name, action_name, env, decision).await);
                }
                debug!("Condition of permission {} not satisfied", grant.id);
            }
        }

        let decision = Decision::deny(DecisionReason::NoMatchingPermission);
        Ok(self.finish(user.id, resource_name, action_name, env, decision).await)
    }

    async fn attribute_map(&self, owner: AttributeOwner, owner_id: i64) -> Result<AttributeMap> {
        Ok(self
            .attributes
            .attributes(owner, owner_id)
            .await?
            .into_iter()
            .map(|attribute| (attribute.key, attribute.value))
            .collect())
    }

    async fn finish(
        &self,
        user_id: UserId,
        resource_name: &str,
        action_name: &str,
        env: &Environment,
        decision: Decision,
    ) -> Decision {
        info!(
            "Decision {} for user {} on {}/{}: allowed={} ({})",
            decision.id, user_id, resource_name, action_name, decision.allowed, decision.reason
        );
        self.audit
            .log_permission_check(
                user_id,
                resource_name,
                action_name,
                decision.allowed,
                decision.reason.as_str(),
                env,
            )
            .await;
        decision
    }
}
