use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::config::PromptConfig;
use crate::error::{ModuleFailure, PromptError, Result};
use crate::layout::{Layout, LayoutEngine, LayoutLine, PromptTarget};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, RenderMetrics};
use crate::registry::{ModuleOutcome, ModuleRegistry, RenderOptions};
use crate::render::audit::{NullRenderAudit, RenderAudit, RenderAuditEventBuilder, RenderAuditStage};
use crate::render::CancelToken;
use crate::snapshot::FactSnapshot;
use crate::style::{StyleResolver, StyleSheet};

const LOG_TARGET: &str = "prompt::render";

/// Final strings handed back to the shell.
///
/// `right` and `bottom` are `None` when no module is configured for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub left: String,
    pub right: Option<String>,
    pub bottom: Option<String>,
}

impl RenderOutput {
    /// Rendered line for `target`, empty when the target is not configured.
    pub fn line(&self, target: PromptTarget) -> &str {
        match target {
            PromptTarget::Left => &self.left,
            PromptTarget::Right => self.right.as_deref().unwrap_or(""),
            PromptTarget::Bottom => self.bottom.as_deref().unwrap_or(""),
        }
    }
}

pub struct RenderPipelineBuilder {
    config: PromptConfig,
    registry: Option<ModuleRegistry>,
    logger: Option<Logger>,
    audit: Option<Arc<dyn RenderAudit>>,
    metrics: Option<Arc<Mutex<RenderMetrics>>>,
}

impl RenderPipelineBuilder {
    /// Use a custom registry instead of the builtin modules.
    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn RenderAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn metrics(mut self, metrics: Arc<Mutex<RenderMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> RenderPipeline {
        let Self {
            config,
            registry,
            logger,
            audit,
            metrics,
        } = self;

        let (sheet, style_errors) = StyleSheet::with_overrides(&config.styles);
        if let Some(logger) = &logger {
            for err in style_errors {
                let _ = logger.log_event(event_with_fields(
                    LogLevel::Error,
                    "prompt::config",
                    "style_invalid",
                    [json_kv("error", json!(err.to_string()))],
                ));
            }
        }

        let mut registry = registry.unwrap_or_else(|| ModuleRegistry::with_builtins(&config));
        registry.configure(&config);
        registry.set_logger(logger.clone());

        RenderPipeline {
            layout: LayoutEngine::new(config.separator.clone()),
            styles: StyleResolver::new(sheet, config.dialect),
            options: RenderOptions::from_config(&config),
            digest: config.digest(),
            registry,
            logger,
            audit: audit.unwrap_or_else(|| Arc::new(NullRenderAudit)),
            metrics,
            config,
        }
    }
}

/// Snapshot → modules → layout → styles, once per prompt target.
///
/// Everything here is fixed at construction; `render` only reads the
/// snapshot it is given.
pub struct RenderPipeline {
    config: PromptConfig,
    registry: ModuleRegistry,
    layout: LayoutEngine,
    styles: StyleResolver,
    options: RenderOptions,
    logger: Option<Logger>,
    audit: Arc<dyn RenderAudit>,
    metrics: Option<Arc<Mutex<RenderMetrics>>>,
    digest: String,
}

impl RenderPipeline {
    pub fn builder(config: PromptConfig) -> RenderPipelineBuilder {
        RenderPipelineBuilder {
            config,
            registry: None,
            logger: None,
            audit: None,
            metrics: None,
        }
    }

    pub fn from_config(config: PromptConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn is_configured(&self, target: PromptTarget) -> bool {
        !self.config.modules_for(target).is_empty()
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    pub fn render(&self, snapshot: &FactSnapshot) -> Result<RenderOutput> {
        self.render_with_cancel(snapshot, &CancelToken::new())
    }

    /// Render, falling back to an empty prompt if the orchestration fails.
    pub fn render_or_empty(&self, snapshot: &FactSnapshot) -> RenderOutput {
        match self.render(snapshot) {
            Ok(output) => output,
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    "render_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                RenderOutput::default()
            }
        }
    }

    pub fn render_with_cancel(
        &self,
        snapshot: &FactSnapshot,
        cancel: &CancelToken,
    ) -> Result<RenderOutput> {
        self.audit.record(
            RenderAuditEventBuilder::new(RenderAuditStage::RenderStarted)
                .detail("config", json!(self.digest))
                .detail("term_width", json!(snapshot.term_width()))
                .finish(),
        );

        let layout = match self.compose_layout(snapshot, cancel) {
            Ok(layout) => layout,
            Err(err) => {
                if matches!(err, PromptError::Cancelled) {
                    self.audit.record(
                        RenderAuditEventBuilder::new(RenderAuditStage::RenderCancelled).finish(),
                    );
                    self.with_metrics(RenderMetrics::record_cancelled);
                    self.log(LogLevel::Debug, "render_cancelled", std::iter::empty());
                }
                return Err(err);
            }
        };

        let output = RenderOutput {
            left: self.paint(layout.line(PromptTarget::Left)),
            right: self
                .is_configured(PromptTarget::Right)
                .then(|| self.paint(layout.line(PromptTarget::Right))),
            bottom: self
                .is_configured(PromptTarget::Bottom)
                .then(|| self.paint(layout.line(PromptTarget::Bottom))),
        };

        self.with_metrics(RenderMetrics::record_render);
        self.audit.record(
            RenderAuditEventBuilder::new(RenderAuditStage::RenderCommitted)
                .detail("left_width", json!(layout.line(PromptTarget::Left).width))
                .finish(),
        );
        self.log(
            LogLevel::Debug,
            "render_committed",
            [
                json_kv("config", json!(self.digest)),
                json_kv("left_width", json!(layout.line(PromptTarget::Left).width)),
            ],
        );
        Ok(output)
    }

    /// Evaluate and fit every configured target without styling.
    pub fn compose_layout(&self, snapshot: &FactSnapshot, cancel: &CancelToken) -> Result<Layout> {
        let mut layout = Layout::default();
        for target in PromptTarget::ALL {
            if let Some(line) = self.compose_target(target, snapshot, cancel)? {
                layout.set_line(target, line);
            }
        }
        Ok(layout)
    }

    /// Render a single target. Unconfigured targets render as an empty string.
    pub fn render_line(&self, snapshot: &FactSnapshot, target: PromptTarget) -> Result<String> {
        let line = self.compose_target(target, snapshot, &CancelToken::new())?;
        Ok(line.map(|line| self.paint(&line)).unwrap_or_default())
    }

    fn compose_target(
        &self,
        target: PromptTarget,
        snapshot: &FactSnapshot,
        cancel: &CancelToken,
    ) -> Result<Option<LayoutLine>> {
        let names = self.config.modules_for(target);
        if names.is_empty() {
            return Ok(None);
        }

        let outcomes = self
            .registry
            .evaluate(names, snapshot, &self.options, cancel)?;
        self.record_outcomes(&outcomes);

        let fragments = outcomes
            .into_iter()
            .filter_map(ModuleOutcome::into_fragment)
            .collect();
        let line = self.layout.compose(fragments, snapshot.term_width());
        self.record_line(target, &line);
        Ok(Some(line))
    }

    fn paint(&self, line: &LayoutLine) -> String {
        line.fragments
            .iter()
            .map(|fragment| self.styles.paint(&fragment.text, fragment.style_tag.as_deref()))
            .collect::<Vec<_>>()
            .join(self.layout.separator())
    }

    fn record_outcomes(&self, outcomes: &[ModuleOutcome]) {
        let (mut rendered, mut failed, mut timed_out) = (0, 0, 0);
        for outcome in outcomes {
            let stage = match outcome {
                ModuleOutcome::Rendered(_) => {
                    rendered += 1;
                    RenderAuditStage::ModuleRendered
                }
                ModuleOutcome::Failed(ModuleFailure::TimedOut { .. }) => {
                    timed_out += 1;
                    RenderAuditStage::ModuleFailed
                }
                ModuleOutcome::Failed(_) => {
                    failed += 1;
                    RenderAuditStage::ModuleFailed
                }
                _ => RenderAuditStage::ModuleSkipped,
            };
            self.audit.record(
                RenderAuditEventBuilder::new(stage)
                    .detail("module", json!(outcome.module()))
                    .finish(),
            );
        }
        self.with_metrics(|metrics| metrics.record_modules(rendered, failed, timed_out));
    }

    fn record_line(&self, target: PromptTarget, line: &LayoutLine) {
        self.audit.record(
            RenderAuditEventBuilder::new(RenderAuditStage::LayoutComposed)
                .detail("target", json!(target.as_str()))
                .detail("width", json!(line.width))
                .detail("dropped", json!(line.dropped))
                .detail("overflow", json!(line.overflow))
                .finish(),
        );
        self.with_metrics(|metrics| metrics.record_layout(line.dropped.len(), line.overflow));

        if line.overflow {
            self.log(
                LogLevel::Warn,
                "width_overflow",
                [
                    json_kv("target", json!(target.as_str())),
                    json_kv("width", json!(line.width)),
                ],
            );
        }
        if !line.dropped.is_empty() {
            self.log(
                LogLevel::Debug,
                "fragments_dropped",
                [
                    json_kv("target", json!(target.as_str())),
                    json_kv("modules", json!(line.dropped)),
                ],
            );
        }
    }

    fn with_metrics(&self, update: impl FnOnce(&mut RenderMetrics)) {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = &self.logger {
            let _ = logger.log_event(event_with_fields(level, LOG_TARGET, message, fields));
        }
    }
}
