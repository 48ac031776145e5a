//! Execution context and collaborator traits
//!
//! Operations never spawn processes or touch the filesystem directly. They
//! go through a [`Runner`] and a [`FileSystem`], so the binary can plug in
//! real implementations and tests can plug in recording mocks.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Subprocess collaborator: git, shell scripts and HTTP downloads
///
/// Implementations apply their own per-call timeouts and surface captured
/// standard error through [`crate::Error::Command`] on failure.
pub trait Runner {
    /// Clone `url` into `destination`.
    fn git_clone(&self, url: &str, destination: &Path) -> Result<()>;

    /// Fetch refs and tags into the repository at `repo`.
    fn git_fetch(&self, repo: &Path) -> Result<()>;

    /// Check out `ref_name` in the repository at `repo`.
    fn git_checkout(&self, repo: &Path, ref_name: &str) -> Result<()>;

    /// Whether `ref_name` resolves to a commit in `repo`.
    fn git_ref_exists(&self, repo: &Path, ref_name: &str) -> Result<bool>;

    /// Commit hash of HEAD in `repo`.
    fn git_head_commit(&self, repo: &Path) -> Result<String>;

    /// Tag and branch names known to `repo`.
    fn git_list_refs(&self, repo: &Path) -> Result<Vec<String>>;

    /// Run `script` with `shell -c` inside `cwd`.
    fn run_shell(&self, shell: &str, script: &str, cwd: &Path) -> Result<()>;

    /// Download `url` into `destination_dir`, returning the written file.
    fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf>;
}

/// Filesystem mutator
pub trait FileSystem {
    /// Move `from` to `to`, creating the parent of `to` if needed.
    fn move_path(&self, from: &Path, to: &Path) -> Result<()>;

    /// Make `link` a symlink pointing at `target`, replacing anything there.
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Remove a file or symlink. Returns `false` if nothing was there.
    fn remove_file(&self, path: &Path) -> Result<bool>;

    /// Recursively remove a directory that must exist.
    fn remove_dir(&self, path: &Path) -> Result<()>;

    /// Remove every non-directory entry of `dir` whose name starts with
    /// `prefix`. Returns the number of entries removed.
    fn remove_files_with_prefix(&self, dir: &Path, prefix: &str) -> Result<usize>;
}

/// Collaborators handed to every executing operation
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    pub runner: &'a dyn Runner,
    pub fs: &'a dyn FileSystem,
}

impl<'a> ExecContext<'a> {
    /// Create a new execution context
    pub fn new(runner: &'a dyn Runner, fs: &'a dyn FileSystem) -> Self {
        Self { runner, fs }
    }
}
