//! CEL expression engine with compiled program caching

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use dashmap::DashMap;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

use crate::cel::{
    context::EvalContext,
    convert::json_to_cel,
    error::{CelError, Result},
};

/// CEL engine for compiling and evaluating expressions
pub struct Engine {
    /// Compiled program cache (thread-safe), keyed by expression source
    program_cache: Arc<DashMap<String, Arc<Program>>>,

    /// Whether compiled programs are kept between evaluations
    caching: bool,
}

impl Engine {
    /// Create a new CEL engine with program caching enabled
    pub fn new() -> Self {
        Self::with_caching(true)
    }

    /// Create a CEL engine, optionally caching compiled programs
    pub fn with_caching(caching: bool) -> Self {
        Self {
            program_cache: Arc::new(DashMap::new()),
            caching,
        }
    }

    /// Compile a CEL expression and cache the result
    ///
    /// # Errors
    /// Returns error if expression cannot be compiled
    pub fn compile(&self, expr: &str) -> Result<Arc<Program>> {
        if let Some(prog) = self.program_cache.get(expr) {
            return Ok(prog.clone());
        }

        let program = Program::compile(expr)
            .map_err(|e| CelError::CompilationError(format!("{:?}", e)))?;

        let arc_program = Arc::new(program);
        if self.caching {
            self.program_cache.insert(expr.to_string(), arc_program.clone());
        }

        Ok(arc_program)
    }

    /// Evaluate a compiled program with the given context
    ///
    /// # Errors
    /// Returns error if evaluation fails or result is not boolean
    pub fn evaluate(&self, program: &Program, ctx: &EvalContext) -> Result<bool> {
        let mut cel_context = Context::default();

        for (key, value) in ctx.to_variables() {
            let cel_value = json_to_cel(&value);
            if let Err(e) = cel_context.add_variable(key.as_str(), cel_value) {
                warn!(namespace = %key, error = ?e, "Failed to bind CEL namespace");
            }
        }

        // Integer arithmetic in the interpreter panics on division by zero and overflow
        let result = panic::catch_unwind(AssertUnwindSafe(|| program.execute(&cel_context)))
            .map_err(|payload| CelError::EvaluationError(panic_message(payload.as_ref())))?
            .map_err(|e| CelError::EvaluationError(format!("{:?}", e)))?;

        Self::to_bool(&result)
    }

    /// Compile and evaluate an expression in one call
    pub fn evaluate_expression(&self, expr: &str, ctx: &EvalContext) -> Result<bool> {
        let program = self.compile(expr)?;
        self.evaluate(&program, ctx)
    }

    /// Clear the compiled program cache
    pub fn clear_cache(&self) {
        self.program_cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.program_cache.len(),
        }
    }

    fn to_bool(value: &CelValue) -> Result<bool> {
        match value {
            CelValue::Bool(b) => Ok(*b),
            _ => Err(CelError::NonBooleanResult),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached programs
    pub size: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("interpreter panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn create_test_context() -> EvalContext {
        let mut user = HashMap::new();
        user.insert("id".to_string(), json!("42"));
        user.insert("level".to_string(), json!(5));

        let mut resource = HashMap::new();
        resource.insert("owner_id".to_string(), json!("42"));
        resource.insert("status".to_string(), json!("draft"));

        let mut env = HashMap::new();
        env.insert("channel".to_string(), json!("web"));

        EvalContext::new()
            .with_user(user)
            .with_resource(resource)
            .with_env(env)
    }

    #[test]
    fn test_simple_expression() {
        let engine = Engine::new();
        let ctx = create_test_context();

        assert!(engine.evaluate_expression("true", &ctx).unwrap());
        assert!(!engine.evaluate_expression("false", &ctx).unwrap());
    }

    #[test]
    fn test_namespace_access() {
        let engine = Engine::new();
        let ctx = create_test_context();

        assert!(engine.evaluate_expression("resource.owner_id == user.id", &ctx).unwrap());
        assert!(engine.evaluate_expression("resource.status == \"draft\"", &ctx).unwrap());
        assert!(engine.evaluate_expression("env.channel == 'web' && user.level >= 3", &ctx).unwrap());
        assert!(!engine.evaluate_expression("user.level > 5", &ctx).unwrap());
    }

    #[test]
    fn test_missing_key_never_evaluates_true() {
        let engine = Engine::new();
        let ctx = create_test_context();

        let result = engine.evaluate_expression("resource.region == 'eu'", &ctx);
        assert!(!matches!(result, Ok(true)));
    }

    #[test]
    fn test_arithmetic_faults_are_evaluation_errors() {
        let engine = Engine::new();
        let mut user = HashMap::new();
        user.insert("zero".to_string(), json!(0));
        user.insert("big".to_string(), json!(i64::MAX));
        let ctx = EvalContext::new().with_user(user);

        for expr in ["10 / user.zero == 1", "10 % user.zero == 1", "user.big + 1 > 0"] {
            let result = engine.evaluate_expression(expr, &ctx);
            assert!(
                matches!(result, Err(CelError::EvaluationError(_))),
                "{} should fail to evaluate",
                expr
            );
        }
    }

    #[test]
    fn test_program_caching() {
        let engine = Engine::new();
        let ctx = create_test_context();

        let _ = engine.evaluate_expression("true", &ctx).unwrap();
        assert_eq!(engine.cache_stats().size, 1);

        let _ = engine.evaluate_expression("true", &ctx).unwrap();
        assert_eq!(engine.cache_stats().size, 1);

        let _ = engine.evaluate_expression("false", &ctx).unwrap();
        assert_eq!(engine.cache_stats().size, 2);

        engine.clear_cache();
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[test]
    fn test_caching_disabled() {
        let engine = Engine::with_caching(false);
        let ctx = create_test_context();

        assert!(engine.evaluate_expression("true", &ctx).unwrap());
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[test]
    fn test_compilation_error() {
        let engine = Engine::new();

        let result = engine.compile("invalid syntax @#$");
        assert!(matches!(result, Err(CelError::CompilationError(_))));
    }

    #[test]
    fn test_non_boolean_result() {
        let engine = Engine::new();
        let ctx = create_test_context();

        let result = engine.evaluate_expression("'hello'", &ctx);
        assert!(matches!(result, Err(CelError::NonBooleanResult)));
    }
}
