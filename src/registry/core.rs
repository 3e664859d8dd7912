use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::{ModuleConfig, PromptConfig};
use crate::error::{ModuleFailure, PromptError, Result};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::registry::builtin;
use crate::render::CancelToken;
use crate::snapshot::FactSnapshot;
use crate::width::display_width;

const LOG_TARGET: &str = "prompt::registry";

/// How often a waiting render re-checks its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One piece of prompt text produced by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub style_tag: Option<String>,
    /// Lower values are dropped first when the line is too wide.
    pub priority: i32,
    /// Name of the module that produced the fragment, stamped by the registry.
    pub module: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style_tag: None,
            priority: 0,
            module: String::new(),
        }
    }

    pub fn with_style(mut self, tag: impl Into<String>) -> Self {
        self.style_tag = Some(tag.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn width(&self) -> usize {
        display_width(&self.text)
    }
}

pub type ModuleResult = std::result::Result<Option<Fragment>, ModuleFailure>;

/// A pure unit deriving at most one fragment from a snapshot.
///
/// Implementations must not perform I/O; every fact they need is already in
/// the snapshot.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult;
}

/// Module backed by a closure, for slots registered ahead of time.
pub struct FnModule<F> {
    name: String,
    render: F,
}

impl<F> FnModule<F>
where
    F: Fn(&FactSnapshot) -> ModuleResult + Send + Sync,
{
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }
}

impl<F> Module for FnModule<F>
where
    F: Fn(&FactSnapshot) -> ModuleResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        (self.render)(snapshot)
    }
}

/// Configuration applied to a module's output by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSettings {
    pub enabled: bool,
    pub style: Option<String>,
    pub priority: Option<i32>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            style: None,
            priority: None,
        }
    }
}

impl From<&ModuleConfig> for ModuleSettings {
    fn from(config: &ModuleConfig) -> Self {
        Self {
            enabled: config.enabled,
            style: config.style.clone(),
            priority: config.priority,
        }
    }
}

/// What happened to a single module during one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    Rendered(Fragment),
    Empty { module: String },
    Disabled { module: String },
    Unknown { module: String },
    Failed(ModuleFailure),
}

impl ModuleOutcome {
    pub fn module(&self) -> &str {
        match self {
            Self::Rendered(fragment) => &fragment.module,
            Self::Empty { module } | Self::Disabled { module } | Self::Unknown { module } => module,
            Self::Failed(failure) => failure.module(),
        }
    }

    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Rendered(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            Self::Rendered(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Execution knobs for one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Evaluate modules on worker threads.
    pub parallel: bool,
    /// Per-module budget. `None` waits for every module.
    pub module_timeout: Option<Duration>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            module_timeout: Some(Duration::from_millis(200)),
        }
    }
}

impl RenderOptions {
    /// A zero timeout in the config disables the budget.
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            parallel: config.parallel,
            module_timeout: (config.module_timeout_ms > 0).then(|| config.module_timeout()),
        }
    }
}

struct Entry {
    module: Arc<dyn Module>,
    settings: ModuleSettings,
}

impl Entry {
    fn name(&self) -> &str {
        self.module.name()
    }
}

/// Ordered, named collection of modules.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
    logger: Option<Logger>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin modules, configured from `config`.
    pub fn with_builtins(config: &PromptConfig) -> Self {
        let mut registry = Self::new();
        for module in builtin::builtin_modules(config) {
            registry.register_arc(module);
        }
        registry.configure(config);
        registry
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_logger(&mut self, logger: Option<Logger>) {
        self.logger = logger;
    }

    pub fn register<M>(&mut self, module: M) -> &mut Self
    where
        M: Module + 'static,
    {
        self.register_arc(Arc::new(module))
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, render: F) -> &mut Self
    where
        F: Fn(&FactSnapshot) -> ModuleResult + Send + Sync + 'static,
    {
        self.register(FnModule::new(name, render))
    }

    /// Append a module. A module reusing an existing name replaces it in place.
    pub fn register_arc(&mut self, module: Arc<dyn Module>) -> &mut Self {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.name() == module.name())
        {
            Some(entry) => entry.module = module,
            None => self.entries.push(Entry {
                module,
                settings: ModuleSettings::default(),
            }),
        }
        self
    }

    /// Apply per-module settings from the config to registered modules.
    pub fn configure(&mut self, config: &PromptConfig) {
        for entry in &mut self.entries {
            if let Some(module_config) = config.module(entry.module.name()) {
                entry.settings = module_config.into();
            }
        }
    }

    pub fn set_settings(&mut self, name: &str, settings: ModuleSettings) -> bool {
        match self.entries.iter_mut().find(|entry| entry.name() == name) {
            Some(entry) => {
                entry.settings = settings;
                true
            }
            None => false,
        }
    }

    pub fn settings(&self, name: &str) -> Option<&ModuleSettings> {
        self.entry(name).map(|entry| &entry.settings)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render every registered module with default options.
    pub fn render_all(&self, snapshot: &FactSnapshot) -> Vec<Fragment> {
        self.evaluate_all(snapshot, &RenderOptions::default(), &CancelToken::new())
            .map(|outcomes| {
                outcomes
                    .into_iter()
                    .filter_map(ModuleOutcome::into_fragment)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn evaluate_all(
        &self,
        snapshot: &FactSnapshot,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<ModuleOutcome>> {
        let names: Vec<String> = self.names().into_iter().map(String::from).collect();
        self.evaluate(&names, snapshot, options, cancel)
    }

    /// Evaluate `names` in order. Outcomes follow the order of `names`
    /// regardless of which module finishes first.
    pub fn evaluate(
        &self,
        names: &[String],
        snapshot: &FactSnapshot,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<ModuleOutcome>> {
        let mut outcomes: Vec<Option<ModuleOutcome>> = Vec::with_capacity(names.len());
        let mut runnable: Vec<(usize, &Entry)> = Vec::new();

        for (slot, name) in names.iter().enumerate() {
            match self.entry(name) {
                None => {
                    self.log(
                        LogLevel::Warn,
                        "module_unknown",
                        [json_kv("module", json!(name))],
                    );
                    outcomes.push(Some(ModuleOutcome::Unknown {
                        module: name.clone(),
                    }));
                }
                Some(entry) if !entry.settings.enabled => {
                    outcomes.push(Some(ModuleOutcome::Disabled {
                        module: name.clone(),
                    }));
                }
                Some(entry) => {
                    outcomes.push(None);
                    runnable.push((slot, entry));
                }
            }
        }

        // Both paths run modules off the calling thread so the budget and
        // the cancel token hold even for a single module.
        let results = if options.parallel {
            self.run_parallel(&runnable, snapshot, options, cancel)?
        } else {
            self.run_sequential(&runnable, snapshot, options, cancel)?
        };

        for ((slot, entry), result) in runnable.iter().zip(results) {
            outcomes[*slot] = Some(self.settle(entry, result));
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Runs the chain on one worker thread so a module that never returns
    /// can be abandoned. When the current module overruns its budget the
    /// chain restarts on a fresh worker from the next module.
    fn run_sequential(
        &self,
        runnable: &[(usize, &Entry)],
        snapshot: &FactSnapshot,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<ModuleResult>> {
        let shared = Arc::new(snapshot.clone());
        let mut results: Vec<Option<ModuleResult>> = (0..runnable.len()).map(|_| None).collect();
        let mut next = 0usize;

        'chain: while next < runnable.len() {
            if cancel.is_cancelled() {
                return Err(PromptError::Cancelled);
            }

            let chain: Vec<(usize, Arc<dyn Module>)> = runnable
                .iter()
                .enumerate()
                .skip(next)
                .map(|(idx, (_, entry))| (idx, Arc::clone(&entry.module)))
                .collect();
            let (tx, rx) = mpsc::channel::<(usize, ModuleResult)>();
            let snapshot = Arc::clone(&shared);
            let budget = options.module_timeout;
            let spawned = thread::Builder::new()
                .name(format!("prompt-module-chain-{}", runnable[next].1.name()))
                .spawn(move || {
                    for (idx, module) in chain {
                        let started = Instant::now();
                        let result = guarded_render(module.as_ref(), &snapshot);
                        let result = match budget {
                            Some(budget) if started.elapsed() > budget => {
                                Err(timed_out(module.name(), budget))
                            }
                            _ => result,
                        };
                        if tx.send((idx, result)).is_err() {
                            break;
                        }
                    }
                });

            if let Err(err) = spawned {
                for (idx, (_, entry)) in runnable.iter().enumerate().skip(next) {
                    results[idx] = Some(Err(ModuleFailure::render(
                        entry.name(),
                        format!("worker spawn failed: {err}"),
                    )));
                }
                break;
            }

            let mut deadline = options.module_timeout.map(|budget| Instant::now() + budget);
            while next < runnable.len() {
                if cancel.is_cancelled() {
                    return Err(PromptError::Cancelled);
                }

                let Some(wait) = next_wait(deadline) else {
                    if let Some(budget) = options.module_timeout {
                        results[next] = Some(Err(timed_out(runnable[next].1.name(), budget)));
                    }
                    next += 1;
                    continue 'chain;
                };

                match rx.recv_timeout(wait) {
                    Ok((idx, result)) => {
                        results[idx] = Some(result);
                        next = idx + 1;
                        deadline = options.module_timeout.map(|budget| Instant::now() + budget);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break 'chain,
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(PromptError::Cancelled);
        }

        Ok(results
            .into_iter()
            .zip(runnable)
            .map(|(result, (_, entry))| {
                result.unwrap_or_else(|| {
                    Err(ModuleFailure::Panicked {
                        module: entry.name().to_string(),
                    })
                })
            })
            .collect())
    }

    fn run_parallel(
        &self,
        runnable: &[(usize, &Entry)],
        snapshot: &FactSnapshot,
        options: &RenderOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<ModuleResult>> {
        let shared = Arc::new(snapshot.clone());
        let (tx, rx) = mpsc::channel::<(usize, ModuleResult)>();
        let mut results: Vec<Option<ModuleResult>> = (0..runnable.len()).map(|_| None).collect();
        let mut pending = 0usize;

        for (idx, (_, entry)) in runnable.iter().enumerate() {
            let tx = tx.clone();
            let module = Arc::clone(&entry.module);
            let snapshot = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("prompt-module-{}", entry.name()))
                .spawn(move || {
                    let result = guarded_render(module.as_ref(), &snapshot);
                    // The receiver is gone once the render gave up on us.
                    let _ = tx.send((idx, result));
                });

            match spawned {
                Ok(_) => pending += 1,
                Err(err) => {
                    results[idx] = Some(Err(ModuleFailure::render(
                        entry.name(),
                        format!("worker spawn failed: {err}"),
                    )));
                }
            }
        }
        drop(tx);

        let deadline = options.module_timeout.map(|budget| Instant::now() + budget);
        let mut expired = false;
        while pending > 0 {
            if cancel.is_cancelled() {
                return Err(PromptError::Cancelled);
            }

            let Some(wait) = next_wait(deadline) else {
                expired = true;
                break;
            };

            match rx.recv_timeout(wait) {
                Ok((idx, result)) => {
                    results[idx] = Some(result);
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if cancel.is_cancelled() {
            return Err(PromptError::Cancelled);
        }

        Ok(results
            .into_iter()
            .zip(runnable)
            .map(|(result, (_, entry))| {
                result.unwrap_or_else(|| match (expired, options.module_timeout) {
                    (true, Some(budget)) => Err(timed_out(entry.name(), budget)),
                    _ => Err(ModuleFailure::Panicked {
                        module: entry.name().to_string(),
                    }),
                })
            })
            .collect())
    }

    fn settle(&self, entry: &Entry, result: ModuleResult) -> ModuleOutcome {
        match result {
            Ok(Some(mut fragment)) if !fragment.text.is_empty() => {
                fragment.module = entry.name().to_string();
                if let Some(style) = &entry.settings.style {
                    fragment.style_tag = Some(style.clone());
                }
                if let Some(priority) = entry.settings.priority {
                    fragment.priority = priority;
                }
                ModuleOutcome::Rendered(fragment)
            }
            Ok(_) => ModuleOutcome::Empty {
                module: entry.name().to_string(),
            },
            Err(failure) => {
                self.log(
                    LogLevel::Warn,
                    "module_failed",
                    [
                        json_kv("module", json!(entry.name())),
                        json_kv("error", json!(failure.to_string())),
                    ],
                );
                ModuleOutcome::Failed(failure)
            }
        }
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_event(event_with_fields(level, LOG_TARGET, message, fields));
        }
    }
}

fn guarded_render(module: &dyn Module, snapshot: &FactSnapshot) -> ModuleResult {
    panic::catch_unwind(AssertUnwindSafe(|| module.render(snapshot))).unwrap_or_else(|_| {
        Err(ModuleFailure::Panicked {
            module: module.name().to_string(),
        })
    })
}

/// How long to block on a worker channel before re-checking the cancel
/// token, or `None` once `deadline` has passed.
fn next_wait(deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        Some(deadline) => {
            let now = Instant::now();
            (now < deadline).then(|| (deadline - now).min(POLL_INTERVAL))
        }
        None => Some(POLL_INTERVAL),
    }
}

fn timed_out(module: &str, budget: Duration) -> ModuleFailure {
    ModuleFailure::TimedOut {
        module: module.to_string(),
        budget_ms: budget.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn snapshot() -> FactSnapshot {
        FactSnapshot::builder().term_width(80).build().unwrap()
    }

    fn delayed(
        text: &'static str,
        delay_ms: u64,
    ) -> impl Fn(&FactSnapshot) -> ModuleResult + Send + Sync + 'static {
        move |_| {
            thread::sleep(Duration::from_millis(delay_ms));
            Ok(Some(Fragment::new(text)))
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parallel_output_follows_registration_order() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("slow", delayed("a", 60))
            .register_fn("medium", delayed("b", 30))
            .register_fn("fast", delayed("c", 0));

        let fragments = registry.render_all(&snapshot());
        let texts: Vec<_> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(fragments[0].module, "slow");
    }

    #[test]
    fn failing_and_panicking_modules_are_isolated() {
        let sink = MemorySink::new();
        let mut registry = ModuleRegistry::new().with_logger(Logger::new(sink.clone()));
        registry
            .register_fn("ok_first", |_| Ok(Some(Fragment::new("one"))))
            .register_fn("broken", |_| Err(ModuleFailure::render("broken", "boom")))
            .register_fn("panicky", |_| panic!("module exploded"))
            .register_fn("ok_last", |_| Ok(Some(Fragment::new("two"))));

        for parallel in [true, false] {
            let options = RenderOptions {
                parallel,
                ..RenderOptions::default()
            };
            let outcomes = registry
                .evaluate_all(&snapshot(), &options, &CancelToken::new())
                .unwrap();

            assert_eq!(outcomes.len(), 4);
            assert_eq!(outcomes[0].fragment().unwrap().text, "one");
            assert!(matches!(outcomes[1], ModuleOutcome::Failed(ModuleFailure::Render { .. })));
            assert!(matches!(outcomes[2], ModuleOutcome::Failed(ModuleFailure::Panicked { .. })));
            assert_eq!(outcomes[3].fragment().unwrap().text, "two");
        }

        let failures = sink
            .events()
            .into_iter()
            .filter(|event| event.message == "module_failed")
            .count();
        assert_eq!(failures, 4);
    }

    #[test]
    fn slow_module_is_skipped_after_budget() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("quick", delayed("q", 0))
            .register_fn("stuck", delayed("s", 1_000))
            .register_fn("also_quick", delayed("r", 0));

        let options = RenderOptions {
            parallel: true,
            module_timeout: Some(Duration::from_millis(50)),
        };
        let started = Instant::now();
        let outcomes = registry
            .evaluate_all(&snapshot(), &options, &CancelToken::new())
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(900));
        assert_eq!(outcomes[0].fragment().unwrap().text, "q");
        assert!(matches!(
            &outcomes[1],
            ModuleOutcome::Failed(ModuleFailure::TimedOut { module, budget_ms: 50 }) if module == "stuck"
        ));
        assert_eq!(outcomes[2].fragment().unwrap().text, "r");
    }

    #[test]
    fn sequential_mode_discards_late_results() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("late", delayed("l", 40))
            .register_fn("quick", delayed("q", 0));

        let options = RenderOptions {
            parallel: false,
            module_timeout: Some(Duration::from_millis(10)),
        };
        let outcomes = registry
            .evaluate_all(&snapshot(), &options, &CancelToken::new())
            .unwrap();

        assert!(matches!(outcomes[0], ModuleOutcome::Failed(ModuleFailure::TimedOut { .. })));
        assert_eq!(outcomes[1].fragment().unwrap().text, "q");
    }

    #[test]
    fn cancelled_render_discards_results() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("a", delayed("a", 0))
            .register_fn("b", delayed("b", 0));

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = registry
            .evaluate_all(&snapshot(), &RenderOptions::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, PromptError::Cancelled));
    }

    #[test]
    fn cancel_interrupts_in_flight_modules() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("hang", delayed("h", 2_000))
            .register_fn("hang_too", delayed("h", 2_000));

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });

        let options = RenderOptions {
            parallel: true,
            module_timeout: None,
        };
        let started = Instant::now();
        let err = registry
            .evaluate_all(&snapshot(), &options, &cancel)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, PromptError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(1_500));
    }

    #[test]
    fn lone_module_is_bounded_by_budget_in_both_modes() {
        let mut registry = ModuleRegistry::new();
        registry.register_fn("clock", delayed("c", 1_500));

        for parallel in [true, false] {
            let options = RenderOptions {
                parallel,
                module_timeout: Some(Duration::from_millis(50)),
            };
            let started = Instant::now();
            let outcomes = registry
                .evaluate_all(&snapshot(), &options, &CancelToken::new())
                .unwrap();

            assert!(started.elapsed() < Duration::from_millis(500));
            assert!(matches!(
                &outcomes[0],
                ModuleOutcome::Failed(ModuleFailure::TimedOut { module, .. }) if module == "clock"
            ));
        }
    }

    #[test]
    fn lone_module_is_cancellable_in_both_modes() {
        let mut registry = ModuleRegistry::new();
        registry.register_fn("hang", delayed("h", 2_000));

        for parallel in [true, false] {
            let cancel = CancelToken::new();
            let trigger = cancel.clone();
            let canceller = thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                trigger.cancel();
            });

            let options = RenderOptions {
                parallel,
                module_timeout: None,
            };
            let started = Instant::now();
            let err = registry
                .evaluate_all(&snapshot(), &options, &cancel)
                .unwrap_err();
            canceller.join().unwrap();

            assert!(matches!(err, PromptError::Cancelled));
            assert!(started.elapsed() < Duration::from_millis(500));
        }
    }

    #[test]
    fn sequential_mode_abandons_stuck_module_and_continues() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("first", delayed("a", 0))
            .register_fn("stuck", delayed("s", 1_500))
            .register_fn("last", delayed("z", 0));

        let options = RenderOptions {
            parallel: false,
            module_timeout: Some(Duration::from_millis(50)),
        };
        let started = Instant::now();
        let outcomes = registry
            .evaluate_all(&snapshot(), &options, &CancelToken::new())
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(outcomes[0].fragment().unwrap().text, "a");
        assert!(matches!(
            &outcomes[1],
            ModuleOutcome::Failed(ModuleFailure::TimedOut { module, budget_ms: 50 }) if module == "stuck"
        ));
        assert_eq!(outcomes[2].fragment().unwrap().text, "z");
    }

    #[test]
    fn settings_hide_and_restyle_modules() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("shown", |_| {
                Ok(Some(Fragment::new("x").with_style("muted").with_priority(1)))
            })
            .register_fn("hidden", |_| Ok(Some(Fragment::new("y"))));

        registry.set_settings(
            "shown",
            ModuleSettings {
                enabled: true,
                style: Some("error".to_string()),
                priority: Some(9),
            },
        );
        registry.set_settings(
            "hidden",
            ModuleSettings {
                enabled: false,
                ..ModuleSettings::default()
            },
        );

        let outcomes = registry
            .evaluate_all(&snapshot(), &RenderOptions::default(), &CancelToken::new())
            .unwrap();
        let shown = outcomes[0].fragment().unwrap();
        assert_eq!(shown.style_tag.as_deref(), Some("error"));
        assert_eq!(shown.priority, 9);
        assert!(matches!(&outcomes[1], ModuleOutcome::Disabled { module } if module == "hidden"));
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("a", |_| Ok(Some(Fragment::new("old"))))
            .register_fn("b", |_| Ok(Some(Fragment::new("b"))))
            .register_fn("a", |_| Ok(Some(Fragment::new("new"))));

        assert_eq!(registry.names(), vec!["a", "b"]);
        let texts: Vec<_> = registry
            .render_all(&snapshot())
            .into_iter()
            .map(|f| f.text)
            .collect();
        assert_eq!(texts, vec!["new".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_and_empty_modules_produce_no_fragment() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_fn("blank", |_| Ok(Some(Fragment::new(""))))
            .register_fn("nothing", |_| Ok(None));

        let outcomes = registry
            .evaluate(
                &names(&["blank", "missing", "nothing"]),
                &snapshot(),
                &RenderOptions::default(),
                &CancelToken::new(),
            )
            .unwrap();

        assert!(matches!(outcomes[0], ModuleOutcome::Empty { .. }));
        assert!(matches!(&outcomes[1], ModuleOutcome::Unknown { module } if module == "missing"));
        assert!(matches!(outcomes[2], ModuleOutcome::Empty { .. }));
    }

    #[test]
    fn builtins_pick_up_config() {
        let config = PromptConfig::from_json_str(
            r#"{ "modules": { "jobs": { "enabled": false }, "status": { "priority": 7 } } }"#,
        )
        .unwrap();
        let registry = ModuleRegistry::with_builtins(&config);

        assert!(registry.contains("directory"));
        assert!(!registry.settings("jobs").unwrap().enabled);
        assert_eq!(registry.settings("status").unwrap().priority, Some(7));
    }
}
