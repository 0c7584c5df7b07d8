//! CEL (Common Expression Language) expression engine for grant conditions
//!
//! Expressions are pure: they read the `user`, `resource` and `env`
//! namespaces and cannot reach anything else. Compiled programs are cached
//! by source text.

pub mod context;
pub mod convert;
pub mod engine;
pub mod error;

pub use context::EvalContext;
pub use engine::{CacheStats, Engine};
pub use error::{CelError, Result};
