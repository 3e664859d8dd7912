//! Shell prompt composition engine.
//!
//! The shell gathers a [`FactSnapshot`] once per prompt; the engine renders
//! every configured module, fits the fragments into the terminal width and
//! resolves style tags into the shell's markup. The modules follow the
//! `<module>/mod.rs` orchestrator pattern with implementation kept in a
//! private `core` module.

pub mod config;
pub mod driver;
pub mod error;
pub mod fields;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod render;
pub mod snapshot;
pub mod style;
pub mod width;

pub use config::{ModuleConfig, PromptConfig};
pub use error::{ConfigError, ModuleFailure, PromptError, Result};
pub use fields::{PromptFields, PromptTemplates};
pub use layout::{Layout, LayoutEngine, LayoutLine, PromptTarget};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, RenderMetrics};
pub use registry::{
    FnModule, Fragment, Module, ModuleOutcome, ModuleRegistry, ModuleResult, ModuleSettings,
    RenderOptions,
};
pub use render::{
    BufferedRenderAudit, CancelToken, NullRenderAudit, RenderAudit, RenderAuditEvent,
    RenderAuditEventBuilder, RenderAuditStage, RenderOutput, RenderPipeline,
    RenderPipelineBuilder,
};
pub use snapshot::{FactSnapshot, FactSnapshotBuilder, GitStatus, VcsState};
pub use style::{MarkupDialect, StyleDescriptor, StyleResolver, StyleSheet};
pub use width::display_width;
