use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use thiserror::Error;

use crate::config::{PromptConfig, expand_tilde};
use crate::error::PromptError;
use crate::layout::PromptTarget;
use crate::logging::{FileSink, LogLevel, Logger, event_with_fields, json_kv};
use crate::render::RenderPipeline;
use crate::snapshot::{FactSnapshot, GitStatus, VcsState};
use crate::style::MarkupDialect;

pub const CONFIG_ENV: &str = "PROMPT_ENGINE_CONFIG";
const LOG_MAX_BYTES: u64 = 1024 * 1024;
const FALLBACK_WIDTH: u16 = 80;

pub type DriverResult<T> = std::result::Result<T, CliDriverError>;

#[derive(Debug, Error)]
pub enum CliDriverError {
    #[error("render error: {0}")]
    Render(#[from] PromptError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "prompt-engine")]
#[command(about = "Compose shell prompt lines from facts gathered by the shell", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one rendered prompt line
    Prompt(PromptArgs),
    /// Print a fresh session key
    Session,
}

#[derive(Debug, Clone, Args)]
pub struct PromptArgs {
    /// Exit status of the previous command
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub status: i32,

    /// Duration of the previous command in milliseconds
    #[arg(long = "cmd-duration", default_value_t = 0)]
    pub cmd_duration: u64,

    /// Number of background jobs
    #[arg(long, default_value_t = 0)]
    pub jobs: u32,

    /// Terminal width; detected from the terminal when omitted
    #[arg(long = "terminal-width")]
    pub terminal_width: Option<u16>,

    #[arg(long, value_enum, default_value_t = TargetArg::Left)]
    pub target: TargetArg,

    /// JSON config path, defaults to $PROMPT_ENGINE_CONFIG
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub dialect: Option<DialectArg>,

    /// Append JSON-lines diagnostics to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long)]
    pub git_branch: Option<String>,

    #[arg(long)]
    pub git_commit: Option<String>,

    #[arg(long)]
    pub git_dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Left,
    Right,
    Bottom,
}

impl From<TargetArg> for PromptTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Left => PromptTarget::Left,
            TargetArg::Right => PromptTarget::Right,
            TargetArg::Bottom => PromptTarget::Bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Plain,
    Ansi,
    Xonsh,
}

impl From<DialectArg> for MarkupDialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Plain => MarkupDialect::Plain,
            DialectArg::Ansi => MarkupDialect::Ansi,
            DialectArg::Xonsh => MarkupDialect::Xonsh,
        }
    }
}

/// Facts only the calling process can know.
#[derive(Debug, Clone)]
pub struct ShellEnv {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub detected_width: Option<u16>,
    pub config_env: Option<String>,
}

impl ShellEnv {
    pub fn detect() -> DriverResult<Self> {
        Ok(Self {
            cwd: env::current_dir()?,
            home: env::var_os("HOME").map(PathBuf::from),
            detected_width: crossterm::terminal::size().ok().map(|(width, _)| width),
            config_env: env::var(CONFIG_ENV).ok().filter(|value| !value.is_empty()),
        })
    }
}

pub fn run(cli: Cli) -> DriverResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Prompt(args) => run_prompt(&args, &ShellEnv::detect()?, &mut out),
        Command::Session => {
            writeln!(out, "{}", session_key())?;
            Ok(())
        }
    }
}

/// Render the requested line and write it without a trailing newline.
///
/// Render failures degrade to an empty line so the shell never loses its
/// prompt.
pub fn run_prompt(args: &PromptArgs, shell: &ShellEnv, out: &mut impl Write) -> DriverResult<()> {
    let logger = args.log_file.as_ref().and_then(|path| {
        FileSink::new(path, LOG_MAX_BYTES)
            .ok()
            .map(|sink| Logger::new(sink).with_min_level(LogLevel::Info))
    });

    let config_path = args
        .config
        .clone()
        .or_else(|| shell.config_env.clone())
        .map(|raw| expand_tilde(&raw, shell.home.as_deref()));
    let mut config = PromptConfig::load_or_default(config_path.as_deref(), logger.as_ref());
    if let Some(dialect) = args.dialect {
        config.dialect = dialect.into();
    }

    let mut builder = RenderPipeline::builder(config);
    if let Some(logger) = &logger {
        builder = builder.logger(logger.clone());
    }
    let pipeline = builder.build();

    let line = snapshot_from_args(args, shell)
        .and_then(|snapshot| pipeline.render_line(&snapshot, args.target.into()))
        .unwrap_or_else(|err| {
            if let Some(logger) = &logger {
                let _ = logger.log_event(event_with_fields(
                    LogLevel::Error,
                    "prompt::cli",
                    "render_failed",
                    [json_kv("error", json!(err.to_string()))],
                ));
            }
            String::new()
        });

    write!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

pub fn snapshot_from_args(args: &PromptArgs, shell: &ShellEnv) -> crate::Result<FactSnapshot> {
    let width = args
        .terminal_width
        .or(shell.detected_width)
        .unwrap_or(FALLBACK_WIDTH);

    let mut builder = FactSnapshot::builder()
        .exit_code(args.status)
        .duration_ms(args.cmd_duration)
        .job_count(args.jobs)
        .term_width(width)
        .cwd(shell.cwd.clone());
    if let Some(home) = &shell.home {
        builder = builder.home(home.clone());
    }
    if args.git_branch.is_some() || args.git_commit.is_some() {
        let status = GitStatus {
            branch: args.git_branch.clone(),
            commit: args.git_commit.clone(),
            dirty: args.git_dirty,
            ..GitStatus::default()
        };
        builder = builder.vcs(VcsState::Git(status));
    }
    builder.build()
}

/// Short random-looking key identifying one shell session.
pub fn session_key() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    let mut hasher = blake3::Hasher::new();
    hasher.update(&process::id().to_le_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn shell() -> ShellEnv {
        ShellEnv {
            cwd: PathBuf::from("/home/dev/src/app"),
            home: Some(PathBuf::from("/home/dev")),
            detected_width: None,
            config_env: None,
        }
    }

    fn prompt_args(argv: &[&str]) -> PromptArgs {
        let mut full = vec!["prompt-engine", "prompt"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Prompt(args) => args,
            Command::Session => panic!("expected prompt command"),
        }
    }

    fn render(args: &PromptArgs, shell: &ShellEnv) -> String {
        let mut out = Vec::new();
        run_prompt(args, shell, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_shell_style_flags() {
        let args = prompt_args(&[
            "--status=-1",
            "--cmd-duration",
            "2500",
            "--jobs",
            "2",
            "--terminal-width",
            "120",
            "--target",
            "right",
        ]);
        assert_eq!(args.status, -1);
        assert_eq!(args.cmd_duration, 2500);
        assert_eq!(args.jobs, 2);
        assert_eq!(args.terminal_width, Some(120));
        assert_eq!(args.target, TargetArg::Right);
    }

    #[test]
    fn snapshot_prefers_explicit_width_then_detected_then_fallback() {
        let mut env = shell();
        let explicit = prompt_args(&["--terminal-width", "50"]);
        assert_eq!(snapshot_from_args(&explicit, &env).unwrap().term_width(), 50);

        let implicit = prompt_args(&[]);
        assert_eq!(snapshot_from_args(&implicit, &env).unwrap().term_width(), FALLBACK_WIDTH);

        env.detected_width = Some(64);
        assert_eq!(snapshot_from_args(&implicit, &env).unwrap().term_width(), 64);
    }

    #[test]
    fn renders_plain_prompt_line() {
        let args = prompt_args(&[
            "--status",
            "2",
            "--dialect",
            "plain",
            "--git-branch",
            "main",
            "--git-dirty",
        ]);
        assert_eq!(render(&args, &shell()), "~/src/app main* ✘ 2 ❯");
    }

    #[test]
    fn unconfigured_target_prints_nothing() {
        let args = prompt_args(&["--target", "bottom", "--dialect", "plain"]);
        assert_eq!(render(&args, &shell()), "");
    }

    #[test]
    fn zero_width_degrades_to_empty_output() {
        let args = prompt_args(&["--terminal-width", "0"]);
        assert_eq!(render(&args, &shell()), "");
    }

    #[test]
    fn config_comes_from_env_and_missing_path_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("prompt.json");
        fs::write(&config, r#"{ "left": ["character"], "dialect": "plain" }"#).unwrap();

        let mut env = shell();
        env.config_env = Some(config.display().to_string());
        assert_eq!(render(&prompt_args(&[]), &env), "❯");

        let log = dir.path().join("prompt.log");
        let missing = dir.path().join("nope.json");
        let args = prompt_args(&[
            "--config",
            missing.to_str().unwrap(),
            "--dialect",
            "plain",
            "--log-file",
            log.to_str().unwrap(),
        ]);
        assert_eq!(render(&args, &shell()), "~/src/app ❯");
        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.contains("config_path_missing"));
        assert!(Path::new(&log).exists());
    }

    #[test]
    fn session_keys_are_short_hex() {
        let key = session_key();
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
