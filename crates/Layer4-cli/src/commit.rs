//! Default command: generate a message for the staged changes and commit.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use cmtr_backend::{run_backend, select_backend, BackendChoice, CodexStatus};
use cmtr_core::{collect_context, install_hook, uninstall_hook, GitOps};
use cmtr_foundation::{Error, Result, Settings};
use tracing::warn;

use crate::Args;

/// `git commit` options that would supply their own message.
const RESERVED_GIT_ARGS: [&str; 7] = [
    "-m",
    "--message",
    "-F",
    "--file",
    "--reuse-message",
    "-c",
    "-C",
];

pub async fn run(args: &Args) -> Result<i32> {
    let repo = GitOps::new(std::env::current_dir()?)?;

    if args.hook {
        return install(&repo, args.force);
    }
    if args.uninstall_hook {
        let path = uninstall_hook(&repo.hooks_dir()?)?;
        println!("Hook removed from {}", path.display());
        return Ok(0);
    }

    let settings = Settings::load(repo.root(), args.overrides.to_patch())?;
    let codex = CodexStatus::detect();
    let selection = select_backend(&settings, &codex)?;

    eprintln!("Analyzing staged changes...");
    let context = collect_context(&repo, &settings)?;

    match selection.choice {
        BackendChoice::Codex => eprintln!("Generating commit message (codex)..."),
        BackendChoice::Api => eprintln!("Generating commit message..."),
    }
    let message = run_backend(selection, &settings, &codex, repo.root(), &context).await?;

    if args.dry_run {
        println!("{message}");
        return Ok(0);
    }

    let extra = filtered_git_args(&args.git_args)?;
    run_git_commit(repo.root(), message.as_str(), &extra, args.no_edit)
}

fn install(repo: &GitOps, force: bool) -> Result<i32> {
    let hooks_dir = repo.hooks_dir()?;
    for entry in repo.hooks_path_overrides()? {
        warn!(
            "core.hooksPath = {} (from {}); installing into {}",
            entry.path,
            entry.origin,
            hooks_dir.display()
        );
    }
    let path = install_hook(&hooks_dir, force)?;
    println!("Hook installed at {}", path.display());
    Ok(0)
}

fn filtered_git_args(args: &[String]) -> Result<Vec<String>> {
    if args
        .iter()
        .any(|arg| RESERVED_GIT_ARGS.contains(&arg.as_str()))
    {
        return Err(Error::usage(
            "Do not pass -m/-F/-C/-c options; cmtr supplies the message.",
        ));
    }
    Ok(args.to_vec())
}

/// Run `git commit -v -F <tempfile>` with the generated message, returning
/// git's exit code. The temp file stays alive until git (and any editor it
/// spawns) has exited.
fn run_git_commit(root: &Path, message: &str, extra: &[String], no_edit: bool) -> Result<i32> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "{}", message.trim())?;
    file.flush()?;

    let mut command = Command::new("git");
    command.arg("commit").arg("-v").arg("-F").arg(file.path());
    if !no_edit {
        command.arg("--edit");
    }
    command.args(extra).current_dir(root);

    let status = command.status()?;
    Ok(status.code().unwrap_or(1))
}
