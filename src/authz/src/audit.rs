//! Append-only audit trail for permission checks
//!
//! Audit writes sit on the decision path but may never change its outcome:
//! name resolution falls back to [`UNRESOLVED_ID`], context serialization
//! falls back to no context, and store failures are logged and dropped.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{AuditStore, CatalogStore};
use crate::types::{AuditLogEntry, Environment, NewAuditEntry, UserId, UNRESOLVED_ID};

/// Operation recorded for permission checks
pub const CHECK_OPERATION: &str = "check";

/// Audit log filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Only entries for this user
    #[serde(default)]
    pub user_id: Option<UserId>,

    /// Maximum number of entries returned
    pub limit: usize,
}

impl AuditQuery {
    /// Most recent entries across all users
    pub fn recent(limit: usize) -> Self {
        Self { user_id: None, limit }
    }

    /// Most recent entries for one user
    pub fn for_user(user_id: UserId, limit: usize) -> Self {
        Self {
            user_id: Some(user_id),
            limit,
        }
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.map_or(true, |id| entry.user_id == id)
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_decisions: usize,
    pub allowed_decisions: usize,
    pub denied_decisions: usize,
}

/// Audit logger over an injected store
pub struct AuditLogger {
    audit: Arc<dyn AuditStore>,
    catalog: Arc<dyn CatalogStore>,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(audit: Arc<dyn AuditStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            audit,
            catalog,
            enabled: true,
        }
    }

    /// Logger that records nothing
    pub fn disabled(audit: Arc<dyn AuditStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            enabled: false,
            ..Self::new(audit, catalog)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one permission check (never fails)
    pub async fn log_permission_check(
        &self,
        user_id: UserId,
        resource_name: &str,
        action_name: &str,
        result: bool,
        reason: &str,
        context: &Environment,
    ) {
        if !self.enabled {
            return;
        }

        let resource_id = match self.catalog.resource_by_name(resource_name).await {
            Ok(Some(resource)) => resource.id,
            _ => UNRESOLVED_ID,
        };
        let action_id = match self.catalog.action_by_name(action_name).await {
            Ok(Some(action)) => action.id,
            _ => UNRESOLVED_ID,
        };

        let entry = NewAuditEntry {
            user_id,
            resource_id,
            action_id,
            operation: CHECK_OPERATION.to_string(),
            result,
            reason: reason.to_string(),
            context: serde_json::to_string(context).ok(),
        };

        match self.audit.append_audit(entry).await {
            Ok(stored) => debug!("Audit entry {} recorded", stored.id),
            Err(e) => warn!("Failed to write audit entry for user {}: {}", user_id, e),
        }
    }

    /// Query recorded entries, newest first
    pub async fn recent_entries(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        self.audit.audit_entries(query).await
    }

    /// Get audit statistics
    pub async fn stats(&self) -> Result<AuditStats> {
        self.audit.audit_stats().await
    }
}
