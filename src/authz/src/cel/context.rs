//! Evaluation context for CEL expressions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::AttributeMap;

/// Variables visible to a condition expression
///
/// Exposed to CEL as three maps: `user.<key>`, `resource.<key>` and
/// `env.<key>`. Nothing else is in scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalContext {
    /// User attributes
    pub user: HashMap<String, Value>,

    /// Resource attributes
    pub resource: HashMap<String, Value>,

    /// Caller-supplied environment
    pub env: HashMap<String, Value>,
}

impl EvalContext {
    /// Create an empty evaluation context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from the three attribute sources of a check
    pub fn from_attributes(user: &AttributeMap, resource: &AttributeMap, env: &AttributeMap) -> Self {
        Self {
            user: to_json_map(user),
            resource: to_json_map(resource),
            env: to_json_map(env),
        }
    }

    pub fn with_user(mut self, user: HashMap<String, Value>) -> Self {
        self.user = user;
        self
    }

    pub fn with_resource(mut self, resource: HashMap<String, Value>) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, Value>) -> Self {
        self.env = env;
        self
    }

    /// Get all namespaces as top-level variables for CEL evaluation
    pub fn to_variables(&self) -> HashMap<String, Value> {
        let mut vars = HashMap::with_capacity(3);
        vars.insert("user".to_string(), Value::Object(self.user.clone().into_iter().collect()));
        vars.insert(
            "resource".to_string(),
            Value::Object(self.resource.clone().into_iter().collect()),
        );
        vars.insert("env".to_string(), Value::Object(self.env.clone().into_iter().collect()));
        vars
    }
}

fn to_json_map(attributes: &AttributeMap) -> HashMap<String, Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}
