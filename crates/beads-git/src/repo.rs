//! Repository-level sync operations built on [`git_command`].
//!
//! The sync orchestrator needs three things from git: branch inspection,
//! conflict detection, and committing the journal files -- either to the
//! checked-out branch, or to a divergent sync branch without ever touching
//! the working tree (temporary-index plumbing).

use std::path::Path;

use tracing::debug;

use crate::commands::{git_command, git_command_with_env, GitError, Result};

/// Returns `true` when `cwd` is inside a git work tree.
pub fn is_repo(cwd: &Path) -> bool {
    git_command(&["rev-parse", "--is-inside-work-tree"], cwd)
        .map(|out| out == "true")
        .unwrap_or(false)
}

/// Name of the checked-out branch.
pub fn current_branch(cwd: &Path) -> Result<String> {
    let branch = git_command(&["rev-parse", "--abbrev-ref", "HEAD"], cwd)?;
    if branch.is_empty() {
        return Err(GitError::NotARepo);
    }
    Ok(branch)
}

/// Paths currently in the unmerged (conflicted) state.
pub fn conflicted_paths(cwd: &Path) -> Result<Vec<String>> {
    let out = git_command(&["diff", "--name-only", "--diff-filter=U"], cwd)?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Commits the given paths.
///
/// When `branch` is empty or names the checked-out branch, this is a plain
/// `git add` + `git commit`. When it names a different branch, the commit is
/// built with plumbing against a temporary index so neither the working tree
/// nor the real index moves.
///
/// Returns `false` when there was nothing to commit.
pub fn commit_paths(cwd: &Path, paths: &[&str], message: &str, branch: &str) -> Result<bool> {
    let checked_out = current_branch(cwd)?;
    if branch.is_empty() || branch == checked_out {
        commit_on_current_branch(cwd, paths, message)
    } else {
        commit_on_other_branch(cwd, paths, message, branch)
    }
}

fn commit_on_current_branch(cwd: &Path, paths: &[&str], message: &str) -> Result<bool> {
    let mut add_args = vec!["add", "--"];
    add_args.extend_from_slice(paths);
    git_command(&add_args, cwd)?;

    // Anything staged for these paths?
    let mut diff_args = vec!["diff", "--cached", "--quiet", "--"];
    diff_args.extend_from_slice(paths);
    if git_command(&diff_args, cwd).is_ok() {
        debug!("nothing to commit");
        return Ok(false);
    }

    let mut commit_args = vec!["commit", "-m", message, "--"];
    commit_args.extend_from_slice(paths);
    git_command(&commit_args, cwd)?;
    Ok(true)
}

/// Builds a commit on `branch` from its tip plus the on-disk content of
/// `paths`, using hash-object / read-tree / update-index / write-tree /
/// commit-tree against a temporary index.
fn commit_on_other_branch(cwd: &Path, paths: &[&str], message: &str, branch: &str) -> Result<bool> {
    let branch_ref = format!("refs/heads/{branch}");
    let parent = git_command(&["rev-parse", "--verify", "--quiet", &branch_ref], cwd).ok();

    let tmp = tempfile::Builder::new()
        .prefix("beads-index-")
        .tempfile_in(cwd.join(".git"))
        .map_err(GitError::SpawnError)?;
    let index_path = tmp.path().to_string_lossy().to_string();
    let env: &[(&str, &str)] = &[("GIT_INDEX_FILE", &index_path)];

    // Seed the temp index from the branch tip (empty index for a new branch).
    if let Some(ref parent_sha) = parent {
        git_command_with_env(&["read-tree", parent_sha], cwd, env)?;
    } else {
        git_command_with_env(&["read-tree", "--empty"], cwd, env)?;
    }

    // Stage each path's current on-disk content.
    for path in paths {
        let file = cwd.join(path);
        if !file.exists() {
            continue;
        }
        let blob = git_command(&["hash-object", "-w", "--", path], cwd)?;
        let cacheinfo = format!("100644,{blob},{path}");
        git_command_with_env(&["update-index", "--add", "--cacheinfo", &cacheinfo], cwd, env)?;
    }

    let tree = git_command_with_env(&["write-tree"], cwd, env)?;

    // Skip the commit when the tree is unchanged from the parent.
    if let Some(ref parent_sha) = parent {
        let parent_tree = git_command(&["rev-parse", &format!("{parent_sha}^{{tree}}")], cwd)?;
        if parent_tree == tree {
            debug!(branch, "sync branch already up to date");
            return Ok(false);
        }
    }

    let commit = match parent {
        Some(ref parent_sha) => {
            git_command(&["commit-tree", &tree, "-p", parent_sha, "-m", message], cwd)?
        }
        None => git_command(&["commit-tree", &tree, "-m", message], cwd)?,
    };

    git_command(&["update-ref", &branch_ref, &commit], cwd)?;
    debug!(branch, %commit, "committed journal to sync branch");
    Ok(true)
}
