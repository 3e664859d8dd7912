//! Error module orchestrator.
//!
//! Every fallible operation in the crate resolves to one of the enums
//! defined in `types`.

mod types;

pub use types::{ConfigError, ModuleFailure, PromptError, Result};
