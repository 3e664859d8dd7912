use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Running counters across renders of one pipeline.
#[derive(Debug, Default, Clone)]
pub struct RenderMetrics {
    renders: u64,
    cancelled: u64,
    modules_rendered: u64,
    module_failures: u64,
    module_timeouts: u64,
    fragments_dropped: u64,
    overflow_lines: u64,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_render(&mut self) {
        self.renders = self.renders.saturating_add(1);
    }

    pub fn record_cancelled(&mut self) {
        self.cancelled = self.cancelled.saturating_add(1);
    }

    pub fn record_modules(&mut self, rendered: usize, failed: usize, timed_out: usize) {
        self.modules_rendered = self.modules_rendered.saturating_add(rendered as u64);
        self.module_failures = self.module_failures.saturating_add(failed as u64);
        self.module_timeouts = self.module_timeouts.saturating_add(timed_out as u64);
    }

    pub fn record_layout(&mut self, dropped: usize, overflow: bool) {
        self.fragments_dropped = self.fragments_dropped.saturating_add(dropped as u64);
        if overflow {
            self.overflow_lines = self.overflow_lines.saturating_add(1);
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            renders: self.renders,
            cancelled: self.cancelled,
            modules_rendered: self.modules_rendered,
            module_failures: self.module_failures,
            module_timeouts: self.module_timeouts,
            fragments_dropped: self.fragments_dropped,
            overflow_lines: self.overflow_lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub renders: u64,
    pub cancelled: u64,
    pub modules_rendered: u64,
    pub module_failures: u64,
    pub module_timeouts: u64,
    pub fragments_dropped: u64,
    pub overflow_lines: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "render_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("renders".to_string(), json!(self.renders));
        map.insert("cancelled".to_string(), json!(self.cancelled));
        map.insert("modules_rendered".to_string(), json!(self.modules_rendered));
        map.insert("module_failures".to_string(), json!(self.module_failures));
        map.insert("module_timeouts".to_string(), json!(self.module_timeouts));
        map.insert("fragments_dropped".to_string(), json!(self.fragments_dropped));
        map.insert("overflow_lines".to_string(), json!(self.overflow_lines));
        map
    }
}
