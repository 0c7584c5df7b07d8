//! Grant conditions and their fail-closed evaluator
//!
//! A [`Condition`] carries up to four clauses, all of which must hold:
//!
//! 1. `resource` - exact-match set against the resource's attributes
//! 2. `user` - exact-match set against the user's attributes
//! 3. `environment` - exact-match set against the caller's environment
//! 4. `expression` - CEL boolean over `user.*`, `resource.*`, `env.*`
//!
//! The exact-match clauses run first and short-circuit. The expression is
//! only compiled when they pass. Any anomaly in the expression (syntax error,
//! runtime error, non-boolean result) means "not satisfied".

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cel::{CelError, Engine as CelEngine, EvalContext};
use crate::error::{AuthzError, Result};
use crate::types::{AttributeMap, AttributeValue, Environment};

/// Condition attached to a grant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Required resource attribute values
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub resource: AttributeMap,

    /// Required user attribute values
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub user: AttributeMap,

    /// Required environment values
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub environment: AttributeMap,

    /// Optional CEL expression (blank is vacuously true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Condition consisting of a single expression
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::new().with_expression(expr)
    }

    pub fn with_expression(mut self, expr: impl Into<String>) -> Self {
        self.expression = Some(expr.into());
        self
    }

    pub fn require_resource(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.resource.insert(key.into(), value.into());
        self
    }

    pub fn require_user(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.user.insert(key.into(), value.into());
        self
    }

    pub fn require_env(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Whether the condition has no clauses at all
    pub fn is_empty(&self) -> bool {
        self.resource.is_empty()
            && self.user.is_empty()
            && self.environment.is_empty()
            && self.expression_source().is_none()
    }

    /// The expression text, if present and not blank
    pub fn expression_source(&self) -> Option<&str> {
        self.expression
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
    }

    /// Serialize for storage
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored condition
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Check that the expression compiles
    ///
    /// Grants are accepted with invalid expressions (they never match); this
    /// lets administrative tooling reject them up front.
    pub fn validate_expression(&self) -> Result<()> {
        match self.expression_source() {
            None => Ok(()),
            Some(expr) => cel_interpreter::Program::compile(expr)
                .map(|_| ())
                .map_err(|e| AuthzError::Validation(format!("invalid condition expression: {:?}", e))),
        }
    }
}

/// Attribute sources a condition is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct ConditionInputs<'a> {
    pub user: &'a AttributeMap,
    pub resource: &'a AttributeMap,
    pub env: &'a Environment,
}

/// Evaluates grant conditions, never propagating evaluation failures
pub struct ConditionEvaluator {
    cel: Arc<CelEngine>,
}

impl ConditionEvaluator {
    pub fn new(cel: Arc<CelEngine>) -> Self {
        Self { cel }
    }

    /// Evaluate a condition, reporting expression anomalies as
    /// [`AuthzError::Evaluation`]
    pub fn evaluate(&self, condition: &Condition, inputs: ConditionInputs<'_>) -> Result<bool> {
        if !matches_all(&condition.resource, inputs.resource) {
            debug!("Resource attribute clause not satisfied");
            return Ok(false);
        }
        if !matches_all(&condition.user, inputs.user) {
            debug!("User attribute clause not satisfied");
            return Ok(false);
        }
        if !matches_all(&condition.environment, inputs.env) {
            debug!("Environment clause not satisfied");
            return Ok(false);
        }

        let Some(expr) = condition.expression_source() else {
            return Ok(true);
        };

        let ctx = EvalContext::from_attributes(inputs.user, inputs.resource, inputs.env);
        self.cel.evaluate_expression(expr, &ctx).map_err(|e| match e {
            CelError::NonBooleanResult => {
                AuthzError::Evaluation(format!("expression '{}' did not return a boolean", expr))
            }
            other => AuthzError::Evaluation(other.to_string()),
        })
    }

    /// Fail-closed evaluation: any failure counts as "not satisfied"
    pub fn is_satisfied(&self, condition: &Condition, inputs: ConditionInputs<'_>) -> bool {
        match self.evaluate(condition, inputs) {
            Ok(satisfied) => satisfied,
            Err(e) => {
                warn!("Condition rejected: {}", e);
                false
            }
        }
    }

    /// Fail-closed evaluation of a serialized condition
    pub fn is_satisfied_raw(&self, raw: &str, inputs: ConditionInputs<'_>) -> bool {
        match Condition::from_json(raw) {
            Ok(condition) => self.is_satisfied(&condition, inputs),
            Err(e) => {
                warn!("Stored condition is unreadable: {}", e);
                false
            }
        }
    }
}

/// Every expected key must be present with an exactly equal value
fn matches_all(expected: &AttributeMap, actual: &AttributeMap) -> bool {
    expected
        .iter()
        .all(|(key, value)| actual.get(key).is_some_and(|found| found == value))
}
