//! # Grantwise Authorization Engine
//!
//! Role-based grants refined by attribute conditions.
//!
//! ## Features
//!
//! - **Role × resource × action grants** with at most one grant per triple
//! - **Attribute conditions**: exact-match clauses plus CEL expressions over
//!   `user.*`, `resource.*` and `env.*`, evaluated fail-closed
//! - **Role hierarchy** with cycle detection (administrative only)
//! - **Audit trail** of every decision
//! - **Injected stores**: in-memory, or PostgreSQL with the `postgres` feature
//!
//! ## Example
//!
//! ```rust
//! use grantwise_authz::{AuthzEngine, Condition, Environment, NewAction, NewResource, NewRole};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AuthzEngine::in_memory();
//!
//!     let user = engine.roles().create_user("alice").await?;
//!     let editor = engine.roles().create_role(NewRole::new("editor")).await?;
//!     let article = engine.catalog().create_resource(NewResource::new("article")).await?;
//!     let edit = engine.catalog().create_action(NewAction::new("edit")).await?;
//!
//!     engine.roles().assign_role(user.id, editor.id).await?;
//!     engine
//!         .permissions()
//!         .grant_permission(
//!             editor.id,
//!             article.id,
//!             edit.id,
//!             Some(Condition::expression("resource.status == 'draft'")),
//!         )
//!         .await?;
//!     engine.attributes().set_resource_attribute(article.id, "status", "draft").await?;
//!
//!     let env = Environment::new();
//!     if engine.check_permission(user.id, "article", "edit", &env).await? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod telemetry;
pub mod cel;  // CEL expression engine
pub mod condition;
pub mod hierarchy;
pub mod store;
pub mod catalog;
pub mod roles;
pub mod permissions;
pub mod attributes;
pub mod audit;
pub mod checker;
pub mod engine;

// Re-export commonly used types
pub use types::{
    Action, ActionId, Attribute, AttributeMap, AttributeOwner, AttributeType, AttributeValue,
    AuditLogEntry, Environment, NewAction, NewResource, NewRole, Permission, PermissionId,
    PermissionStatus, Resource, ResourceId, Role, RoleId, RoleInheritance, RoleStatus, User,
    UserId,
};
pub use condition::{Condition, ConditionEvaluator};
pub use checker::{Decision, DecisionReason, PermissionChecker};
pub use permissions::{PermissionDetail, PermissionGrant};
pub use audit::{AuditQuery, AuditStats};
pub use config::EngineConfig;
pub use engine::AuthzEngine;
pub use store::{AuthzStore, InMemoryStore};
#[cfg(feature = "postgres")]
pub use store::PostgresStore;
pub use error::{AuthzError, ErrorKind, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
