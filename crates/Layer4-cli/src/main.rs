//! cmtr CLI - Main entry point

mod auth;
mod commit;
mod config_cmd;
mod hook_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmtr_foundation::SettingsPatch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// cmtr - commit messages generated from your staged changes
#[derive(Parser, Debug)]
#[command(name = "cmtr")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Install the prepare-commit-msg hook
    #[arg(long)]
    hook: bool,

    /// Remove the cmtr hook
    #[arg(long)]
    uninstall_hook: bool,

    /// Overwrite an existing hook
    #[arg(long)]
    force: bool,

    /// Print the generated commit message and exit
    #[arg(long)]
    dry_run: bool,

    /// Do not open the editor after generating the message
    #[arg(long)]
    no_edit: bool,

    #[command(flatten)]
    overrides: OverrideArgs,

    /// Extra arguments passed through to `git commit`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    git_args: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage cmtr configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Auth status and helpers
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Entry point invoked by the installed git hook
    #[command(name = "prepare-commit-msg", hide = true)]
    PrepareCommitMsg {
        /// Commit message file git is about to open
        message_path: PathBuf,

        /// Commit source (message, template, merge, squash, commit)
        source: Option<String>,

        /// Commit object name, when amending
        sha: Option<String>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the user config file path
    Path,

    /// List effective settings and where each comes from
    List,

    /// Print a value from the user config file
    Get { key: String },

    /// Write a value to the user config file
    Set { key: String, value: String },

    /// Remove a value from the user config file
    Unset { key: String },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Report which backend would generate and why
    Status,
}

/// Per-invocation settings overrides, the highest config layer
#[derive(clap::Args, Debug, Default)]
struct OverrideArgs {
    /// Override the model
    #[arg(long)]
    model: Option<String>,

    /// Max diff bytes sent to the model
    #[arg(long)]
    max_diff_bytes: Option<usize>,

    /// Max diff lines sent to the model
    #[arg(long)]
    max_patch_lines: Option<usize>,

    /// Max git log entries per path
    #[arg(long)]
    max_log_entries: Option<usize>,

    /// Max paths to include in git log context
    #[arg(long)]
    max_log_paths: Option<usize>,

    /// Max commit body lines to include per log entry
    #[arg(long)]
    max_log_body_lines: Option<usize>,

    /// Request timeout in seconds
    #[arg(long = "timeout")]
    timeout_seconds: Option<f64>,

    /// Reasoning effort hint (e.g. none, low, medium)
    #[arg(long)]
    reasoning_effort: Option<String>,

    /// Text verbosity hint (e.g. low, medium, high)
    #[arg(long)]
    text_verbosity: Option<String>,

    /// Override the OpenAI API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Override the OpenAI organization ID
    #[arg(long)]
    organization: Option<String>,

    /// Prefer Codex CLI when available
    #[arg(long)]
    prefer_codex: bool,

    /// Never prefer Codex, even when configured to
    #[arg(long, conflicts_with = "prefer_codex")]
    no_prefer_codex: bool,
}

impl OverrideArgs {
    fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            model: self.model.clone(),
            max_diff_bytes: self.max_diff_bytes,
            max_patch_lines: self.max_patch_lines,
            max_log_entries: self.max_log_entries,
            max_log_paths: self.max_log_paths,
            max_log_body_lines: self.max_log_body_lines,
            timeout_seconds: self.timeout_seconds,
            reasoning_effort: self.reasoning_effort.clone(),
            text_verbosity: self.text_verbosity.clone(),
            prefer_codex: if self.prefer_codex {
                Some(true)
            } else if self.no_prefer_codex {
                Some(false)
            } else {
                None
            },
            base_url: self.base_url.clone(),
            organization: self.organization.clone(),
            api_key: None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let args = Args::parse();
    std::process::exit(run(args).await);
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: Args) -> i32 {
    let result = match &args.command {
        // The hook entry point reports failures as commit template comments
        // and must never block the commit itself.
        Some(Command::PrepareCommitMsg {
            message_path,
            source,
            sha,
            overrides,
        }) => {
            return hook_cmd::run_prepare_commit_msg(
                message_path,
                source.as_deref(),
                sha.as_deref(),
                &overrides.to_patch(),
            )
            .await;
        }
        Some(Command::Config(command)) => config_cmd::run(command),
        Some(Command::Auth(AuthCommand::Status)) => auth::status(),
        None => commit::run(&args).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("cmtr error: {err}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_override_args_to_patch() {
        let args = Args::parse_from([
            "cmtr",
            "--dry-run",
            "--model",
            "gpt-5.2-mini",
            "--max-diff-bytes",
            "4096",
            "--timeout",
            "2.5",
            "--prefer-codex",
        ]);
        let patch = args.overrides.to_patch();
        assert_eq!(patch.model.as_deref(), Some("gpt-5.2-mini"));
        assert_eq!(patch.max_diff_bytes, Some(4096));
        assert_eq!(patch.timeout_seconds, Some(2.5));
        assert_eq!(patch.prefer_codex, Some(true));
        assert_eq!(patch.api_key, None);
        assert!(args.dry_run);
    }

    #[test]
    fn test_no_prefer_codex_flag() {
        let args = Args::parse_from(["cmtr", "--no-prefer-codex"]);
        assert_eq!(args.overrides.to_patch().prefer_codex, Some(false));

        let args = Args::parse_from(["cmtr"]);
        assert_eq!(args.overrides.to_patch().prefer_codex, None);
    }

    #[test]
    fn test_git_args_pass_through() {
        let args = Args::parse_from(["cmtr", "--no-edit", "-a", "--amend"]);
        assert!(args.no_edit);
        assert_eq!(args.git_args, vec!["-a", "--amend"]);
    }

    #[test]
    fn test_hook_subcommand_parses_positionals() {
        let args = Args::parse_from([
            "cmtr",
            "prepare-commit-msg",
            ".git/COMMIT_EDITMSG",
            "template",
        ]);
        match args.command {
            Some(Command::PrepareCommitMsg {
                message_path,
                source,
                sha,
                ..
            }) => {
                assert_eq!(message_path, PathBuf::from(".git/COMMIT_EDITMSG"));
                assert_eq!(source.as_deref(), Some("template"));
                assert_eq!(sha, None);
            }
            other => panic!("expected prepare-commit-msg, got {other:?}"),
        }
    }
}
