//! Registry module orchestrator.
//!
//! Modules are registered once at startup; each render evaluates them
//! against the current snapshot and returns outcomes in registration order.

pub mod builtin;
mod core;

pub use self::core::{
    Fragment, FnModule, Module, ModuleOutcome, ModuleRegistry, ModuleResult, ModuleSettings,
    RenderOptions,
};
