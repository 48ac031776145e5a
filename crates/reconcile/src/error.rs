//! Error types for reconciliation.
//!
//! Every error maps to one [`ErrorKind`], which tells the caller at which
//! stage things went wrong: loading specs, checking prerequisites, planning,
//! or executing a plan.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stage-level classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced application has no loaded spec.
    Configuration,
    /// A spec violates one of its invariants (surfaced at load time).
    Validation,
    /// A required external executable is absent.
    Precondition,
    /// A planner was invoked on a state it cannot act on.
    State,
    /// An operation's subprocess or filesystem call failed.
    Execution,
}

impl ErrorKind {
    /// Short user-facing description of the kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Unknown application",
            Self::Validation => "Invalid application spec",
            Self::Precondition => "Missing prerequisite",
            Self::State => "Cannot act on current state",
            Self::Execution => "Operation failed",
        }
    }

    /// Actionable advice for resolving this kind of error.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Check the app name against `selfman list`",
            Self::Validation => "Fix the listed fields in the app config files",
            Self::Precondition => "Install the missing executable and make sure it is on PATH",
            Self::State => "Run `selfman check <app>` to inspect what is present",
            Self::Execution => "Steps before the failing one remain applied; fix the cause and re-run",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while loading, planning or applying.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No spec is loaded under this name.
    #[error("could not find a configured application with name \"{0}\"")]
    NotConfigured(String),

    /// One or more spec invariants were violated. All violations are kept.
    #[error("invalid application config:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// An executable the operation depends on is not on PATH.
    #[error("cannot find a \"{0}\" executable on PATH")]
    MissingExecutable(String),

    /// The planner cannot act on the observed state.
    #[error("cannot {verb} \"{app}\": {reason}")]
    InvalidState {
        /// Verb being planned.
        verb: String,
        /// Application name.
        app: String,
        /// Why the state is unsuitable.
        reason: String,
    },

    /// A subprocess exited unsuccessfully.
    #[error("command `{command}` failed ({})\n{stderr}", status_text(.status))]
    Command {
        /// Rendered command line.
        command: String,
        /// Exit code, if the process exited normally.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// A subprocess ran past its timeout and was killed.
    #[error("command `{command}` timed out after {seconds}s")]
    Timeout {
        /// Rendered command line.
        command: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// An HTTP download failed.
    #[error("fetching {url} failed: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// IO error during a filesystem call.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A plan step failed; wraps the underlying error.
    #[error("{context}: {source}")]
    Operation {
        /// What the step was doing.
        context: String,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Several independent failures from one step.
    #[error("{}", join_errors(.0))]
    Multiple(Vec<Error>),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a state error for a planner verb.
    pub fn invalid_state(
        verb: impl Into<String>,
        app: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            verb: verb.into(),
            app: app.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error as the failure of a plan step.
    #[must_use]
    pub fn during(self, context: impl Into<String>) -> Self {
        Self::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get the stage-level kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotConfigured(_) => ErrorKind::Configuration,
            Error::Validation(_) => ErrorKind::Validation,
            Error::MissingExecutable(_) => ErrorKind::Precondition,
            Error::InvalidState { .. } => ErrorKind::State,
            Error::Command { .. }
            | Error::Timeout { .. }
            | Error::Http { .. }
            | Error::Io { .. }
            | Error::Operation { .. }
            | Error::Multiple(_)
            | Error::Other(_) => ErrorKind::Execution,
        }
    }

    /// Captured standard error of the innermost failing command, if any.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Command { stderr, .. } => Some(stderr),
            Error::Operation { source, .. } => source.stderr(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::NotConfigured("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::Validation(vec!["bad".into()]).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::MissingExecutable("git".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::invalid_state("update", "x", "no source").kind(),
            ErrorKind::State
        );
        assert_eq!(
            Error::Other("boom".into()).during("build").kind(),
            ErrorKind::Execution
        );
    }

    #[test]
    fn test_validation_joins_all_violations() {
        let err = Error::Validation(vec!["first".into(), "second".into()]);
        let display = err.to_string();
        assert!(display.contains("first\nsecond"));
    }

    #[test]
    fn test_command_error_carries_stderr() {
        let err = Error::Command {
            command: "git checkout nope".into(),
            status: Some(1),
            stderr: "error: pathspec 'nope' did not match".into(),
        };
        let display = err.to_string();
        assert!(display.contains("exit code 1"));
        assert!(display.contains("pathspec 'nope'"));
    }

    #[test]
    fn test_stderr_through_operation_wrapper() {
        let err = Error::Command {
            command: "make".into(),
            status: None,
            stderr: "killed".into(),
        }
        .during("Build with script failed");
        assert_eq!(err.stderr(), Some("killed"));
        assert!(err.to_string().starts_with("Build with script failed: "));
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_multiple_joins_lines() {
        let err = Error::Multiple(vec![Error::Other("a".into()), Error::Other("b".into())]);
        assert_eq!(err.to_string(), "a\nb");
    }

    #[test]
    fn test_kind_advice_not_empty() {
        for kind in [
            ErrorKind::Configuration,
            ErrorKind::Validation,
            ErrorKind::Precondition,
            ErrorKind::State,
            ErrorKind::Execution,
        ] {
            assert!(!kind.advice().is_empty());
            assert_eq!(kind.to_string(), kind.description());
        }
    }
}
