use std::path::{Path, PathBuf};

use crate::error::{PromptError, Result};

/// Working-tree state reported by the shell for the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsState {
    Git(GitStatus),
    Mercurial { branch: String },
}

/// Summary of a git checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    /// Branch name, `None` when HEAD is detached.
    pub branch: Option<String>,
    /// Abbreviated commit used when no branch is checked out.
    pub commit: Option<String>,
    pub dirty: bool,
    pub staged: u32,
    pub untracked: u32,
    pub ahead: u32,
    pub behind: u32,
}

impl GitStatus {
    pub fn on_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
            ..Self::default()
        }
    }

    pub fn detached(commit: impl Into<String>) -> Self {
        Self {
            commit: Some(commit.into()),
            ..Self::default()
        }
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_counts(mut self, staged: u32, untracked: u32) -> Self {
        self.staged = staged;
        self.untracked = untracked;
        self
    }

    pub fn with_divergence(mut self, ahead: u32, behind: u32) -> Self {
        self.ahead = ahead;
        self.behind = behind;
        self
    }
}

/// Immutable facts about the shell state for a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactSnapshot {
    exit_code: i32,
    duration_ms: u64,
    job_count: u32,
    term_width: u16,
    cwd: PathBuf,
    home: Option<PathBuf>,
    vcs: Option<VcsState>,
}

impl FactSnapshot {
    pub fn builder() -> FactSnapshotBuilder {
        FactSnapshotBuilder::default()
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn job_count(&self) -> u32 {
        self.job_count
    }

    pub fn term_width(&self) -> u16 {
        self.term_width
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn vcs(&self) -> Option<&VcsState> {
        self.vcs.as_ref()
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builder collecting facts before the snapshot is frozen.
#[derive(Debug, Clone)]
pub struct FactSnapshotBuilder {
    exit_code: i32,
    duration_ms: u64,
    job_count: u32,
    term_width: u16,
    cwd: PathBuf,
    home: Option<PathBuf>,
    vcs: Option<VcsState>,
}

impl Default for FactSnapshotBuilder {
    fn default() -> Self {
        Self {
            exit_code: 0,
            duration_ms: 0,
            job_count: 0,
            term_width: 80,
            cwd: PathBuf::from("/"),
            home: None,
            vcs: None,
        }
    }
}

impl FactSnapshotBuilder {
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn job_count(mut self, jobs: u32) -> Self {
        self.job_count = jobs;
        self
    }

    pub fn term_width(mut self, width: u16) -> Self {
        self.term_width = width;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn vcs(mut self, vcs: VcsState) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Freeze the snapshot. A zero terminal width cannot host any prompt.
    pub fn build(self) -> Result<FactSnapshot> {
        if self.term_width == 0 {
            return Err(PromptError::InvalidSnapshot(
                "terminal width must be greater than zero".to_string(),
            ));
        }

        Ok(FactSnapshot {
            exit_code: self.exit_code,
            duration_ms: self.duration_ms,
            job_count: self.job_count,
            term_width: self.term_width,
            cwd: self.cwd,
            home: self.home,
            vcs: self.vcs,
        })
    }
}
