//! Git command execution wrappers.
//!
//! Provides a thin wrapper around `git` subprocess invocation so that the
//! rest of the codebase does not need to deal with `std::process::Command`
//! directly. The sync orchestrator drives everything -- including the
//! temporary-index plumbing for divergent-branch commits -- through these
//! two functions.

use std::path::Path;
use std::process::Command;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when running git commands.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be found or spawned.
    #[error("failed to execute git: {0}")]
    SpawnError(#[from] std::io::Error),

    /// The git command exited with a non-zero status.
    #[error("git command failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        /// The content of stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepo,
}

/// A specialized `Result` type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Execute a `git` command with the given arguments and working directory.
///
/// Returns the trimmed contents of stdout on success.
pub fn git_command(args: &[&str], cwd: &Path) -> Result<String> {
    git_command_with_env(args, cwd, &[])
}

/// Execute a `git` command with additional environment variables.
///
/// Used by the divergent-branch commit path, which points `GIT_INDEX_FILE`
/// at a temporary index so the working tree and the real index stay
/// untouched.
pub fn git_command_with_env(args: &[&str], cwd: &Path, env: &[(&str, &str)]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(cwd);
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::CommandFailed {
            code: output.status.code(),
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(stdout)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_command_version() {
        // `git --version` should succeed on any system with git installed.
        let result = git_command(&["--version"], Path::new("."));
        assert!(result.is_ok(), "git --version failed: {result:?}");
        let output = result.unwrap();
        assert!(
            output.starts_with("git version"),
            "unexpected output: {output}"
        );
    }

    #[test]
    fn test_git_command_failure() {
        // An invalid git subcommand should fail.
        let result = git_command(&["not-a-real-subcommand"], Path::new("."));
        assert!(result.is_err());
        match result.unwrap_err() {
            GitError::CommandFailed { code, stderr } => {
                assert!(code.is_some());
                assert!(!stderr.is_empty());
            }
            other => panic!("expected CommandFailed, got: {other:?}"),
        }
    }

    #[test]
    fn test_git_command_bad_cwd() {
        // Running git in a nonexistent directory should fail.
        let result = git_command(&["status"], Path::new("/nonexistent/directory/xyz"));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_passthrough() {
        // GIT_AUTHOR_NAME flows through to the child process.
        let dir = tempfile::tempdir().unwrap();
        git_command(&["init", "-q"], dir.path()).unwrap();
        let out = git_command_with_env(
            &["var", "GIT_AUTHOR_IDENT"],
            dir.path(),
            &[
                ("GIT_AUTHOR_NAME", "beads-test"),
                ("GIT_AUTHOR_EMAIL", "beads@example.invalid"),
            ],
        )
        .unwrap();
        assert!(out.contains("beads-test"));
    }
}
