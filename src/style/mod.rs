//! Style module orchestrator.
//!
//! Modules only name a semantic tag ("error", "git-dirty"); the resolver maps
//! tags to descriptors and the dialect turns descriptors into markers.

mod core;
mod markup;

pub use self::core::{StyleDescriptor, StyleResolver, StyleSheet};
pub use self::markup::MarkupDialect;
