//! Render lifecycle audit hooks.
//!
//! Records capture a stage identifier plus structured details so callers can
//! log, buffer, or inspect how a render progressed.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints emitted by `RenderPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAuditStage {
    RenderStarted,
    /// A module produced a fragment.
    ModuleRendered,
    /// A module produced nothing, was disabled, or is not registered.
    ModuleSkipped,
    /// A module failed, panicked, or ran out of time.
    ModuleFailed,
    LayoutComposed,
    RenderCommitted,
    RenderCancelled,
}

#[derive(Debug, Clone)]
pub struct RenderAuditEvent {
    pub timestamp: SystemTime,
    pub stage: RenderAuditStage,
    pub details: Vec<(String, Value)>,
}

impl RenderAuditEvent {
    fn new(stage: RenderAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct RenderAuditEventBuilder {
    event: RenderAuditEvent,
}

impl RenderAuditEventBuilder {
    pub fn new(stage: RenderAuditStage) -> Self {
        Self {
            event: RenderAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> RenderAuditEvent {
        self.event
    }
}

pub trait RenderAudit: Send + Sync {
    fn record(&self, event: RenderAuditEvent);
}

/// Default no-op sink.
#[derive(Debug, Default)]
pub struct NullRenderAudit;

impl RenderAudit for NullRenderAudit {
    fn record(&self, _event: RenderAuditEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct BufferedRenderAudit {
    events: Mutex<Vec<RenderAuditEvent>>,
}

impl BufferedRenderAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderAuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    pub fn stages(&self) -> Vec<RenderAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }
}

impl RenderAudit for BufferedRenderAudit {
    fn record(&self, event: RenderAuditEvent) {
        self.events.lock().expect("audit mutex poisoned").push(event);
    }
}
