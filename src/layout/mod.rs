//! Layout module orchestrator.
//!
//! Callers import layout types from here while the width fitting lives in
//! the private `core` module.

mod core;

pub use self::core::{Layout, LayoutEngine, LayoutLine, PromptTarget};
