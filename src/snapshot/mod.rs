//! Snapshot module orchestrator.
//!
//! The shell gathers facts once per prompt and hands them to the engine as a
//! [`FactSnapshot`]; nothing in the engine mutates or refreshes them.

mod core;

pub use self::core::{FactSnapshot, FactSnapshotBuilder, GitStatus, VcsState};
