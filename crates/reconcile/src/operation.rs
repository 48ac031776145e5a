//! Units of work
//!
//! [`Operation`] is a closed set of primitive steps plus one meta step,
//! [`Operation::IfCommitChanged`], which defers a rebuild decision from plan
//! time to the moment right after fetch and checkout have run.
//!
//! Operations are plain values: two operations with the same fields are
//! equal, and each carries everything it needs to describe and execute
//! itself through an [`ExecContext`].

use crate::context::ExecContext;
use crate::error::Result;
use crate::spec::VERSION_PLACEHOLDER;
use std::fmt;
use std::path::PathBuf;

/// What a delete step removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    BinaryLink,
    LibraryLink,
    Artifacts,
    Source,
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinaryLink => write!(f, "binary link"),
            Self::LibraryLink => write!(f, "library link"),
            Self::Artifacts => write!(f, "built artifacts"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// A single step of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Clone a repository.
    GitClone {
        repo_url: String,
        destination: PathBuf,
    },
    /// Download a versioned archive.
    FetchFromWeb {
        url_template: String,
        version: String,
        destination_dir: PathBuf,
    },
    /// Check out a ref in an existing checkout.
    GitCheckout { repo_path: PathBuf, ref_name: String },
    /// Refresh refs and tags.
    GitFetch { repo_path: PathBuf },
    /// Run a build script inside the source tree.
    BuildWithScript {
        source_path: PathBuf,
        shell: String,
        script: String,
    },
    /// Move the built artifact out of the source tree.
    MoveArtifact { from: PathBuf, to: PathBuf },
    /// Point the binary symlink `to` at `from`.
    LinkArtifact { from: PathBuf, to: PathBuf },
    /// Point the library symlink `to` at `from`.
    LinkLibrary { from: PathBuf, to: PathBuf },
    /// Delete a file or symlink; absence is success.
    DeleteFile { kind: DeleteTarget, path: PathBuf },
    /// Recursively delete a directory that must exist.
    DeleteDir { kind: DeleteTarget, path: PathBuf },
    /// Delete every file in `dir` whose name starts with `prefix`.
    DeleteFilesWithPrefix {
        kind: DeleteTarget,
        dir: PathBuf,
        prefix: String,
    },
    /// A step that was considered and deliberately skipped.
    NoOp { label: String, reason: String },
    /// Run `then` only if HEAD in `repo_path` moved away from `baseline_commit`.
    IfCommitChanged {
        repo_path: PathBuf,
        baseline_commit: Option<String>,
        then: Vec<Operation>,
    },
}

/// Human-readable description of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDescription {
    pub top_line: String,
    pub context_lines: Vec<String>,
}

impl OpDescription {
    fn new(top_line: impl Into<String>) -> Self {
        Self {
            top_line: top_line.into(),
            context_lines: Vec::new(),
        }
    }

    fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.context_lines.push(format!("{key}: {value}"));
        self
    }

    /// Render at a nesting depth, four spaces per level.
    ///
    /// Non-verbose output is the top line only.
    pub fn render(&self, verbose: bool, depth: usize) -> String {
        let indent = "    ".repeat(depth);
        let mut out = format!("{indent}{}", self.top_line);
        if verbose {
            for line in &self.context_lines {
                out.push('\n');
                out.push_str(&format!("{indent}  {line}"));
            }
        }
        out
    }
}

impl Operation {
    /// Build step for apps that have nothing to build.
    pub fn no_build() -> Self {
        Self::NoOp {
            label: "build".to_string(),
            reason: "This application does not need to be built".to_string(),
        }
    }

    /// Source step when the source already exists.
    pub fn skip_obtain_source() -> Self {
        Self::NoOp {
            label: "obtaining source".to_string(),
            reason: "Source already present".to_string(),
        }
    }

    /// Short stable name of the step.
    pub fn label(&self) -> &str {
        match self {
            Self::GitClone { .. } => "clone",
            Self::FetchFromWeb { .. } => "download",
            Self::GitCheckout { .. } => "checkout",
            Self::GitFetch { .. } => "fetch",
            Self::BuildWithScript { .. } => "build",
            Self::MoveArtifact { .. } => "move",
            Self::LinkArtifact { .. } => "link",
            Self::LinkLibrary { .. } => "link-lib",
            Self::DeleteFile { .. } | Self::DeleteDir { .. } => "delete",
            Self::DeleteFilesWithPrefix { .. } => "sweep",
            Self::NoOp { label, .. } => label.as_str(),
            Self::IfCommitChanged { .. } => "if-changed",
        }
    }

    /// Nested operations of a meta step.
    pub fn inner(&self) -> &[Operation] {
        match self {
            Self::IfCommitChanged { then, .. } => then.as_slice(),
            _ => &[],
        }
    }

    pub fn describe(&self) -> OpDescription {
        match self {
            Self::GitClone {
                repo_url,
                destination,
            } => OpDescription::new("Clone git repository")
                .with("repository", repo_url)
                .with("destination", destination.display()),
            Self::FetchFromWeb {
                url_template,
                version,
                destination_dir,
            } => OpDescription::new(format!("Fetch version {version} from the web"))
                .with("url", resolve_url(url_template, version))
                .with("destination", destination_dir.display()),
            Self::GitCheckout {
                repo_path,
                ref_name,
            } => OpDescription::new(format!("Check out {ref_name}"))
                .with("repository", repo_path.display()),
            Self::GitFetch { repo_path } => OpDescription::new("Fetch updates from remote")
                .with("repository", repo_path.display()),
            Self::BuildWithScript {
                source_path,
                shell,
                script,
            } => OpDescription::new("Build with script")
                .with("shell", shell)
                .with("script", script)
                .with("working directory", source_path.display()),
            Self::MoveArtifact { from, to } => OpDescription::new("Move built artifact")
                .with("from", from.display())
                .with("to", to.display()),
            Self::LinkArtifact { from, to } => {
                OpDescription::new("Link artifact into binary directory")
                    .with("link", to.display())
                    .with("target", from.display())
            }
            Self::LinkLibrary { from, to } => {
                OpDescription::new("Link source into library directory")
                    .with("link", to.display())
                    .with("target", from.display())
            }
            Self::DeleteFile { kind, path } => {
                OpDescription::new(format!("Delete {kind}")).with("path", path.display())
            }
            Self::DeleteDir { kind, path } => {
                OpDescription::new(format!("Delete {kind} directory")).with("path", path.display())
            }
            Self::DeleteFilesWithPrefix { kind, dir, prefix } => {
                OpDescription::new(format!("Delete {kind}"))
                    .with("directory", dir.display())
                    .with("prefix", prefix)
            }
            Self::NoOp { label, reason } => {
                OpDescription::new(format!("Skip {label}")).with("reason", reason)
            }
            Self::IfCommitChanged {
                repo_path,
                baseline_commit,
                then,
            } => OpDescription::new(format!(
                "If the commit changed, run {} step(s)",
                then.len()
            ))
            .with("repository", repo_path.display())
            .with(
                "baseline commit",
                baseline_commit.as_deref().unwrap_or("(unknown)"),
            ),
        }
    }

    /// Execute the step, returning a short message on success.
    pub fn execute(&self, ctx: &ExecContext<'_>) -> Result<String> {
        match self {
            Self::GitClone {
                repo_url,
                destination,
            } => {
                ctx.runner
                    .git_clone(repo_url, destination)
                    .map_err(|e| e.during("Git clone failed"))?;
                Ok(format!("Cloned into {}", destination.display()))
            }
            Self::FetchFromWeb {
                url_template,
                version,
                destination_dir,
            } => {
                let url = resolve_url(url_template, version);
                let file = ctx
                    .runner
                    .download(&url, destination_dir)
                    .map_err(|e| e.during("Fetch from web failed"))?;
                Ok(format!("Downloaded {}", file.display()))
            }
            Self::GitCheckout {
                repo_path,
                ref_name,
            } => {
                ctx.runner
                    .git_checkout(repo_path, ref_name)
                    .map_err(|e| e.during("Git checkout failed"))?;
                Ok(format!("Checked out {ref_name}"))
            }
            Self::GitFetch { repo_path } => {
                ctx.runner
                    .git_fetch(repo_path)
                    .map_err(|e| e.during("Git fetch failed"))?;
                Ok("Fetched refs and tags".to_string())
            }
            Self::BuildWithScript {
                source_path,
                shell,
                script,
            } => {
                ctx.runner
                    .run_shell(shell, script, source_path)
                    .map_err(|e| e.during("Build with script failed"))?;
                Ok("Build script finished".to_string())
            }
            Self::MoveArtifact { from, to } => {
                ctx.fs
                    .move_path(from, to)
                    .map_err(|e| e.during("Move artifact failed"))?;
                Ok(format!("Moved to {}", to.display()))
            }
            Self::LinkArtifact { from, to } => {
                ctx.fs
                    .symlink(from, to)
                    .map_err(|e| e.during("Link artifact failed"))?;
                Ok(format!("Linked {}", to.display()))
            }
            Self::LinkLibrary { from, to } => {
                ctx.fs
                    .symlink(from, to)
                    .map_err(|e| e.during("Link library failed"))?;
                Ok(format!("Linked {}", to.display()))
            }
            Self::DeleteFile { kind, path } => {
                let existed = ctx
                    .fs
                    .remove_file(path)
                    .map_err(|e| e.during(format!("Delete {kind} failed")))?;
                if existed {
                    Ok("Deleted file".to_string())
                } else {
                    Ok("Deleted file (already gone)".to_string())
                }
            }
            Self::DeleteDir { kind, path } => {
                ctx.fs
                    .remove_dir(path)
                    .map_err(|e| e.during(format!("Delete {kind} directory failed")))?;
                Ok("Deleted directory".to_string())
            }
            Self::DeleteFilesWithPrefix { kind, dir, prefix } => {
                let count = ctx
                    .fs
                    .remove_files_with_prefix(dir, prefix)
                    .map_err(|e| e.during(format!("Delete {kind} failed")))?;
                Ok(format!("Deleted {count} file(s)"))
            }
            Self::NoOp { .. } => Ok("Successfully did nothing".to_string()),
            Self::IfCommitChanged {
                repo_path,
                baseline_commit,
                then,
            } => {
                let current = ctx
                    .runner
                    .git_head_commit(repo_path)
                    .map_err(|e| e.during("Reading current commit failed"))?;

                if baseline_commit.as_deref() == Some(current.as_str()) {
                    log::debug!("HEAD still at {current}, skipping {} step(s)", then.len());
                    return Ok(
                        "Current and original commit hashes match, successfully did nothing"
                            .to_string(),
                    );
                }

                log::info!(
                    "HEAD moved from {} to {current}",
                    baseline_commit.as_deref().unwrap_or("(unknown)")
                );
                for op in then {
                    let message = op.execute(ctx)?;
                    log::info!("{}: {message}", op.label());
                }
                Ok(format!("Commit changed, ran {} step(s)", then.len()))
            }
        }
    }
}

fn resolve_url(template: &str, version: &str) -> String {
    template.replace(VERSION_PLACEHOLDER, version)
}
