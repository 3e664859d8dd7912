use std::path::PathBuf;

use thiserror::Error;

/// Unified result type for the prompt engine.
pub type Result<T> = std::result::Result<T, PromptError>;

/// Failures that surface to the caller of a render.
///
/// Module failures never appear here; they are isolated inside the registry.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("render cancelled")]
    Cancelled,
}

/// Problems found while loading the prompt configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid style `{style}`: {reason}")]
    InvalidStyle { style: String, reason: String },
}

/// Reason a single module produced no fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleFailure {
    #[error("module `{module}` failed: {reason}")]
    Render { module: String, reason: String },
    #[error("module `{module}` panicked")]
    Panicked { module: String },
    #[error("module `{module}` exceeded its {budget_ms}ms budget")]
    TimedOut { module: String, budget_ms: u64 },
}

impl ModuleFailure {
    pub fn render(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            module: module.into(),
            reason: reason.into(),
        }
    }

    pub fn module(&self) -> &str {
        match self {
            Self::Render { module, .. }
            | Self::Panicked { module }
            | Self::TimedOut { module, .. } => module,
        }
    }
}
