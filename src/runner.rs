//! Subprocess runner: git, build scripts and HTTP downloads
//!
//! Every child gets its stdout and stderr drained on reader threads while
//! the parent polls for exit against an optional deadline. A child that
//! outlives its deadline is killed.

use reconcile::{Error, Result, Runner};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::Timeouts;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on a downloaded archive (2 GiB)
const MAX_DOWNLOAD_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Suffix of a download still in progress
pub const PARTIAL_SUFFIX: &str = ".part";

const USER_AGENT: &str = concat!("selfman/", env!("CARGO_PKG_VERSION"));

/// Output of a finished child process
#[derive(Debug)]
struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// [`Runner`] backed by real processes and an HTTP agent
pub struct SystemRunner {
    timeouts: Timeouts,
    agent: ureq::Agent,
}

impl SystemRunner {
    pub fn new(timeouts: Timeouts) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeouts.download_timeout()))
            .build()
            .into();
        Self { timeouts, agent }
    }

    /// Spawn, drain and wait for a command.
    fn exec(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Captured> {
        let rendered = render_command(program, args);
        log::debug!("Running `{rendered}`");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::MissingExecutable(program.to_string())
            } else {
                Error::io(program, e)
            }
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, timeout).map_err(|e| Error::io(program, e))?;
        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            // Grandchildren may still hold the pipes, so the readers are left detached
            return Err(Error::Timeout {
                command: rendered,
                seconds: timeout.map_or(0, |t| t.as_secs()),
            });
        };

        Ok(Captured {
            status,
            stdout: join(stdout),
            stderr: join(stderr),
        })
    }

    /// Run a command and return its trimmed stdout, failing on non-zero exit.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let captured = self.exec(program, args, cwd, timeout)?;
        if captured.status.success() {
            if !captured.stdout.trim().is_empty() {
                log::trace!("{}", captured.stdout.trim());
            }
            Ok(captured.stdout.trim().to_string())
        } else {
            Err(Error::Command {
                command: render_command(program, args),
                status: captured.status.code(),
                stderr: captured.stderr.trim().to_string(),
            })
        }
    }

    fn git(&self, repo: &Path, args: &[&str], timeout: Option<Duration>) -> Result<String> {
        let repo = repo.to_string_lossy();
        let mut full = vec!["-C", &*repo];
        full.extend_from_slice(args);
        self.run("git", &full, None, timeout)
    }
}

impl Runner for SystemRunner {
    fn git_clone(&self, url: &str, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let dest = destination.to_string_lossy();
        self.run(
            "git",
            &["clone", url, &*dest],
            None,
            Some(self.timeouts.clone_timeout()),
        )?;
        Ok(())
    }

    fn git_fetch(&self, repo: &Path) -> Result<()> {
        self.git(repo, &["fetch", "--tags"], Some(self.timeouts.fetch_timeout()))?;
        Ok(())
    }

    fn git_checkout(&self, repo: &Path, ref_name: &str) -> Result<()> {
        self.git(
            repo,
            &["checkout", ref_name],
            Some(self.timeouts.checkout_timeout()),
        )?;
        Ok(())
    }

    fn git_ref_exists(&self, repo: &Path, ref_name: &str) -> Result<bool> {
        let repo = repo.to_string_lossy();
        let spec = format!("{ref_name}^{{commit}}");
        let captured = self.exec(
            "git",
            &["-C", &*repo, "rev-parse", "--verify", "--quiet", spec.as_str()],
            None,
            Some(self.timeouts.checkout_timeout()),
        )?;
        Ok(captured.status.success())
    }

    fn git_head_commit(&self, repo: &Path) -> Result<String> {
        self.git(
            repo,
            &["rev-parse", "HEAD"],
            Some(self.timeouts.checkout_timeout()),
        )
    }

    fn git_list_refs(&self, repo: &Path) -> Result<Vec<String>> {
        let out = self.git(
            repo,
            &[
                "for-each-ref",
                "--format=%(refname:short)",
                "refs/tags",
                "refs/heads",
                "refs/remotes",
            ],
            Some(self.timeouts.checkout_timeout()),
        )?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.ends_with("/HEAD"))
            .map(String::from)
            .collect())
    }

    fn run_shell(&self, shell: &str, script: &str, cwd: &Path) -> Result<()> {
        self.run(shell, &["-c", script], Some(cwd), None)?;
        Ok(())
    }

    fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        fs::create_dir_all(destination_dir).map_err(|e| Error::io(destination_dir, e))?;
        let dest = destination_dir.join(&file_name);

        log::debug!("Downloading {url} to {}", dest.display());
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| http_error(url, e))?;

        let mut reader = response
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_SIZE)
            .reader();

        // Removed on drop unless persisted
        let mut partial = tempfile::Builder::new()
            .prefix(".")
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(destination_dir)
            .map_err(|e| Error::io(destination_dir, e))?;

        io::copy(&mut reader, &mut partial).map_err(|e| Error::Http {
            url: url.to_string(),
            message: e.to_string(),
            status: None,
        })?;

        partial.persist(&dest).map_err(|e| Error::io(&dest, e.error))?;
        Ok(dest)
    }
}

/// Fail with a precondition error if `name` is not on PATH
pub fn require_executable(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::MissingExecutable(name.to_string()))
}

fn http_error(url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(code) => Error::Http {
            url: url.to_string(),
            message: format!("HTTP {code}"),
            status: Some(code),
        },
        other => Error::Http {
            url: url.to_string(),
            message: other.to_string(),
            status: None,
        },
    }
}

/// Last path segment of a URL, without query or fragment
fn file_name_from_url(url: &str) -> Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    without_scheme
        .split_once('/')
        .and_then(|(_, rest)| rest.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::Other(format!("cannot determine a file name from URL {url}")))
}

fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() > timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner() -> SystemRunner {
        SystemRunner::new(Timeouts::default())
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://ziglang.org/download/0.13.0/zig-0.13.0.tar.xz").unwrap(),
            "zig-0.13.0.tar.xz"
        );
        assert_eq!(
            file_name_from_url("https://x.dev/a/b.tgz?token=1#frag").unwrap(),
            "b.tgz"
        );
        assert!(file_name_from_url("https://x.dev/").is_err());
        assert!(file_name_from_url("nonsense").is_err());
    }

    #[test]
    fn test_render_command() {
        assert_eq!(
            render_command("git", &["-C", "/src", "fetch", "--tags"]),
            "git -C /src fetch --tags"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_failure_carries_stderr_and_code() {
        let tmp = TempDir::new().unwrap();
        let err = runner()
            .run_shell("/bin/sh", "echo boom >&2; exit 3", tmp.path())
            .unwrap_err();
        match err {
            Error::Command { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected command error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runs_in_working_directory() {
        let tmp = TempDir::new().unwrap();
        runner()
            .run_shell("/bin/sh", "echo built > artifact", tmp.path())
            .unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("artifact")).unwrap(),
            "built\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = runner()
            .run("sleep", &["5"], None, Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let err = runner()
            .run("selfman-no-such-program", &[], None, None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingExecutable(_)));
        assert!(require_executable("selfman-no-such-program").is_err());
    }

    #[test]
    fn test_git_head_and_refs() {
        if which::which("git").is_err() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path();
        let r = runner();
        r.git(repo, &["init", "--quiet"], None).unwrap();
        r.git(
            repo,
            &[
                "-c",
                "user.name=selfman",
                "-c",
                "user.email=selfman@localhost",
                "commit",
                "--allow-empty",
                "--quiet",
                "-m",
                "init",
            ],
            None,
        )
        .unwrap();
        r.git(repo, &["tag", "v1.0.0"], None).unwrap();

        let head = r.git_head_commit(repo).unwrap();
        assert_eq!(head.len(), 40);
        assert!(r.git_ref_exists(repo, "v1.0.0").unwrap());
        assert!(!r.git_ref_exists(repo, "v9.9.9").unwrap());
        assert!(r.git_list_refs(repo).unwrap().contains(&"v1.0.0".to_string()));
    }
}
