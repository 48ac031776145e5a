//! # Reconcile
//!
//! The reconciliation core for self-built command-line tools.
//!
//! Given the desired state of one application and a freshly probed
//! observed state, a planner computes an ordered list of idempotent
//! operations; the executor then previews or applies that list.
//!
//! ## Core Concepts
//!
//! - **AppSpec**: validated desired state, with derived paths and operation factories
//! - **AppStatus**: observed-state facts, classified by [`AppStatus::label`]
//! - **Operation**: a primitive step, or [`Operation::IfCommitChanged`] wrapping
//!   a rebuild that only runs if fetch and checkout moved HEAD
//! - **OperationPlan**: the output of one planner call
//! - **Executor**: dry run or apply, stopping at the first failure
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{AppSet, ExecContext, ExecuteOptions, LocalFs, TextReporter, Verb, execute};
//!
//! let apps = AppSet::from_definitions(definitions, layout)?;
//! let app = apps.require("ripgrep")?;
//! let status = probe.probe(app)?;
//!
//! let plan = Verb::MakeItSo.plan(app, &status)?;
//! let ctx = ExecContext::new(&runner, &LocalFs);
//! let mut reporter = TextReporter::new(std::io::stdout());
//! execute(plan, ExecuteOptions { dry_run: true, verbose: true }, &ctx, &mut reporter)?;
//! ```
//!
//! ## Collaborator Traits
//!
//! - [`Runner`]: git, shell and HTTP subprocess calls
//! - [`FileSystem`]: moves, symlinks and deletions
//! - [`StatusProbe`]: produces [`AppStatus`]
//! - [`Reporter`]: receives progress updates

pub mod context;
pub mod error;
pub mod executor;
pub mod fs;
pub mod operation;
pub mod planner;
pub mod spec;
pub mod status;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{ExecContext, FileSystem, Runner};
pub use error::{Error, ErrorKind, Result};
pub use executor::{
    ExecuteOptions, ExecuteSummary, NoReporter, Outcome, Reporter, TextReporter, execute,
};
pub use fs::LocalFs;
pub use operation::{DeleteTarget, OpDescription, Operation};
pub use planner::{
    OperationPlan, Verb, plan_install, plan_reconcile, plan_remove, plan_update,
};
pub use spec::{
    AppDefinition, AppSet, AppSpec, BuildAction, Flavor, Layout, SourceLocator, escape_version,
    unescape_version,
};
pub use status::{AppStatus, StatusLabel, StatusProbe};
