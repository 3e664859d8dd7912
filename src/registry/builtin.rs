//! Builtin prompt modules.
//!
//! Each module reads only the snapshot. Options come from the module's
//! config entry and are fixed at construction.

use std::path::Component;
use std::sync::Arc;

use crate::config::{ModuleConfig, PromptConfig};
use crate::registry::{Fragment, Module, ModuleResult};
use crate::snapshot::{FactSnapshot, GitStatus, VcsState};

pub const DIRECTORY: &str = "directory";
pub const VCS: &str = "vcs";
pub const STATUS: &str = "status";
pub const DURATION: &str = "duration";
pub const JOBS: &str = "jobs";
pub const CHARACTER: &str = "character";

/// All builtin modules in declaration order.
pub fn builtin_modules(config: &PromptConfig) -> Vec<Arc<dyn Module>> {
    let defaults = ModuleConfig::default();
    let options = |name: &str| config.module(name).unwrap_or(&defaults);

    let modules: [Arc<dyn Module>; 6] = [
        Arc::new(DirectoryModule::from_config(options(DIRECTORY))),
        Arc::new(VcsModule),
        Arc::new(StatusModule::from_config(options(STATUS))),
        Arc::new(DurationModule::from_config(options(DURATION))),
        Arc::new(JobsModule::from_config(options(JOBS))),
        Arc::new(CharacterModule::from_config(options(CHARACTER))),
    ];
    modules.into()
}

/// Working directory, home contracted to `~`, trimmed to the last components.
#[derive(Debug, Clone)]
pub struct DirectoryModule {
    truncation_length: usize,
}

impl DirectoryModule {
    pub fn new(truncation_length: usize) -> Self {
        Self { truncation_length }
    }

    pub fn from_config(config: &ModuleConfig) -> Self {
        Self::new(config.option_u64("truncation_length").unwrap_or(3) as usize)
    }

    fn format(&self, snapshot: &FactSnapshot) -> String {
        let cwd = snapshot.cwd();
        let (prefix, relative) = match snapshot.home().and_then(|home| cwd.strip_prefix(home).ok()) {
            Some(rest) => ("~", rest),
            None if cwd.has_root() => ("/", cwd),
            None => ("", cwd),
        };

        let parts: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            return if prefix.is_empty() { ".".to_string() } else { prefix.to_string() };
        }

        let limit = self.truncation_length;
        if limit > 0 && parts.len() > limit {
            return parts[parts.len() - limit..].join("/");
        }

        match prefix {
            "~" => format!("~/{}", parts.join("/")),
            "/" => format!("/{}", parts.join("/")),
            _ => parts.join("/"),
        }
    }
}

impl Module for DirectoryModule {
    fn name(&self) -> &str {
        DIRECTORY
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        Ok(Some(
            Fragment::new(self.format(snapshot))
                .with_style("path")
                .with_priority(70),
        ))
    }
}

/// Branch and working-tree markers for the current checkout.
#[derive(Debug, Clone, Default)]
pub struct VcsModule;

impl VcsModule {
    fn git(status: &GitStatus) -> Fragment {
        let mut text = match (&status.branch, &status.commit) {
            (Some(branch), _) => branch.clone(),
            (None, Some(commit)) => format!(":{commit}"),
            (None, None) => "HEAD".to_string(),
        };

        if status.dirty {
            text.push('*');
        }
        if status.staged > 0 {
            text.push_str(&format!("+{}", status.staged));
        }
        if status.untracked > 0 {
            text.push_str(&format!("?{}", status.untracked));
        }
        if status.ahead > 0 {
            text.push_str(&format!("⇡{}", status.ahead));
        }
        if status.behind > 0 {
            text.push_str(&format!("⇣{}", status.behind));
        }

        let changed = status.dirty || status.staged > 0 || status.untracked > 0;
        Fragment::new(text).with_style(if changed { "git-dirty" } else { "git-clean" })
    }
}

impl Module for VcsModule {
    fn name(&self) -> &str {
        VCS
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        let fragment = match snapshot.vcs() {
            Some(VcsState::Git(status)) => Self::git(status),
            Some(VcsState::Mercurial { branch }) => Fragment::new(branch.clone()).with_style("git-clean"),
            None => return Ok(None),
        };
        Ok(Some(fragment.with_priority(50)))
    }
}

/// Exit status of the previous command.
#[derive(Debug, Clone, Default)]
pub struct StatusModule {
    show_success: bool,
}

impl StatusModule {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            show_success: config.option_bool("show_success").unwrap_or(false),
        }
    }
}

impl Module for StatusModule {
    fn name(&self) -> &str {
        STATUS
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        let fragment = if !snapshot.succeeded() {
            Fragment::new(format!("✘ {}", snapshot.exit_code())).with_style("error")
        } else if self.show_success {
            Fragment::new("✔").with_style("success")
        } else {
            return Ok(None);
        };
        Ok(Some(fragment.with_priority(80)))
    }
}

/// Wall time of the previous command, once it crosses a threshold.
#[derive(Debug, Clone)]
pub struct DurationModule {
    min_time_ms: u64,
}

impl DurationModule {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            min_time_ms: config.option_u64("min_time_ms").unwrap_or(2_000),
        }
    }
}

impl Module for DurationModule {
    fn name(&self) -> &str {
        DURATION
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        let elapsed = snapshot.duration_ms();
        if elapsed < self.min_time_ms || elapsed == 0 {
            return Ok(None);
        }
        Ok(Some(
            Fragment::new(format_duration(elapsed))
                .with_style("duration")
                .with_priority(30),
        ))
    }
}

pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1_000;
    let (hours, minutes, seconds) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Background job counter.
#[derive(Debug, Clone)]
pub struct JobsModule {
    threshold: u32,
    symbol: String,
}

impl JobsModule {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            threshold: config
                .option_u64("threshold")
                .map(|raw| u32::try_from(raw).unwrap_or(u32::MAX))
                .unwrap_or(1)
                .max(1),
            symbol: config.option_str("symbol").unwrap_or("✦").to_string(),
        }
    }
}

impl Module for JobsModule {
    fn name(&self) -> &str {
        JOBS
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        let jobs = snapshot.job_count();
        if jobs < self.threshold {
            return Ok(None);
        }
        let text = if jobs == 1 {
            self.symbol.clone()
        } else {
            format!("{}{jobs}", self.symbol)
        };
        Ok(Some(Fragment::new(text).with_style("jobs").with_priority(20)))
    }
}

/// Input marker coloured by the previous exit status.
#[derive(Debug, Clone)]
pub struct CharacterModule {
    symbol: String,
}

impl CharacterModule {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            symbol: config.option_str("symbol").unwrap_or("❯").to_string(),
        }
    }
}

impl Module for CharacterModule {
    fn name(&self) -> &str {
        CHARACTER
    }

    fn render(&self, snapshot: &FactSnapshot) -> ModuleResult {
        let style = if snapshot.succeeded() { "success" } else { "error" };
        Ok(Some(
            Fragment::new(self.symbol.clone())
                .with_style(style)
                .with_priority(100),
        ))
    }
}
