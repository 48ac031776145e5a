//! Recording collaborators for unit tests

use crate::context::{FileSystem, Runner};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

fn record(calls: &RefCell<Vec<String>>, fail_on: Option<&str>, call: String) -> Result<()> {
    let failing = fail_on.is_some_and(|f| call.starts_with(f));
    calls.borrow_mut().push(call.clone());
    if failing {
        return Err(Error::Command {
            command: call,
            status: Some(1),
            stderr: "mock failure".to_string(),
        });
    }
    Ok(())
}

/// Runner that records every call and fails on a chosen call prefix
#[derive(Default)]
pub(crate) struct MockRunner {
    pub calls: RefCell<Vec<String>>,
    pub head: RefCell<String>,
    pub fail_on: Option<&'static str>,
}

impl MockRunner {
    pub fn with_head(head: &str) -> Self {
        Self {
            head: RefCell::new(head.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_on(prefix: &'static str) -> Self {
        Self {
            fail_on: Some(prefix),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Runner for MockRunner {
    fn git_clone(&self, url: &str, destination: &Path) -> Result<()> {
        record(
            &self.calls,
            self.fail_on,
            format!("clone {url} {}", destination.display()),
        )
    }

    fn git_fetch(&self, repo: &Path) -> Result<()> {
        record(&self.calls, self.fail_on, format!("fetch {}", repo.display()))
    }

    fn git_checkout(&self, repo: &Path, ref_name: &str) -> Result<()> {
        record(
            &self.calls,
            self.fail_on,
            format!("checkout {ref_name} {}", repo.display()),
        )
    }

    fn git_ref_exists(&self, _repo: &Path, _ref_name: &str) -> Result<bool> {
        Ok(true)
    }

    fn git_head_commit(&self, repo: &Path) -> Result<String> {
        record(&self.calls, self.fail_on, format!("head {}", repo.display()))?;
        Ok(self.head.borrow().clone())
    }

    fn git_list_refs(&self, _repo: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn run_shell(&self, shell: &str, script: &str, cwd: &Path) -> Result<()> {
        record(
            &self.calls,
            self.fail_on,
            format!("shell {shell} {script} {}", cwd.display()),
        )
    }

    fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf> {
        record(
            &self.calls,
            self.fail_on,
            format!("download {url} {}", destination_dir.display()),
        )?;
        Ok(destination_dir.join("download"))
    }
}

/// Filesystem that records every call without touching the disk
#[derive(Default)]
pub(crate) struct MockFs {
    pub calls: RefCell<Vec<String>>,
    pub fail_on: Option<&'static str>,
}

impl MockFs {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl FileSystem for MockFs {
    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        record(
            &self.calls,
            self.fail_on,
            format!("move {} {}", from.display(), to.display()),
        )
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        record(
            &self.calls,
            self.fail_on,
            format!("symlink {} {}", target.display(), link.display()),
        )
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        record(&self.calls, self.fail_on, format!("rm {}", path.display()))?;
        Ok(true)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        record(&self.calls, self.fail_on, format!("rmdir {}", path.display()))
    }

    fn remove_files_with_prefix(&self, dir: &Path, prefix: &str) -> Result<usize> {
        record(
            &self.calls,
            self.fail_on,
            format!("sweep {} {prefix}", dir.display()),
        )?;
        Ok(0)
    }
}
