//! Render module orchestrator.
//!
//! `RenderPipeline` ties the registry, layout engine and style resolver
//! together for each prompt target.

pub mod audit;
mod cancel;
mod core;

pub use self::audit::{
    BufferedRenderAudit, NullRenderAudit, RenderAudit, RenderAuditEvent, RenderAuditEventBuilder,
    RenderAuditStage,
};
pub use self::cancel::CancelToken;
pub use self::core::{RenderOutput, RenderPipeline, RenderPipelineBuilder};
