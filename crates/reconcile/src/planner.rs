//! Planners - diff desired vs observed state into an ordered plan
//!
//! Every planner is a pure function of an [`AppSpec`] and a fresh
//! [`AppStatus`]. Planners never execute anything; a planning error leaves
//! the system untouched.

use crate::error::{Error, Result};
use crate::operation::{DeleteTarget, Operation};
use crate::spec::{AppSpec, Flavor};
use crate::status::AppStatus;
use std::fmt;

/// The verbs that produce a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Install,
    Update,
    MakeItSo,
    Remove { remove_source: bool },
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::MakeItSo => "make-it-so",
            Self::Remove { .. } => "remove",
        }
    }

    /// Plan this verb for one app.
    pub fn plan(&self, app: &AppSpec, status: &AppStatus) -> Result<OperationPlan> {
        match *self {
            Self::Install => plan_install(app, status),
            Self::Update => plan_update(app, status),
            Self::MakeItSo => plan_reconcile(app, status),
            Self::Remove { remove_source } => plan_remove(app, status, remove_source),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered list of operations for one app, consumed once by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    /// Application the plan targets
    pub app: String,
    /// Verb that produced the plan
    pub verb: Verb,
    /// Steps in execution order
    pub operations: Vec<Operation>,
}

impl OperationPlan {
    /// Create a new empty plan
    pub fn new(app: impl Into<String>, verb: Verb) -> Self {
        Self {
            app: app.into(),
            verb,
            operations: Vec::new(),
        }
    }

    /// Append a step.
    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Append a step only if it applies to this app.
    pub fn push_applicable(&mut self, op: Option<Operation>) {
        if let Some(op) = op {
            self.operations.push(op);
        }
    }

    /// Number of top-level steps
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn require_configured(app: &AppSpec, status: &AppStatus) -> Result<()> {
    if status.is_configured {
        Ok(())
    } else {
        Err(Error::NotConfigured(app.name().to_string()))
    }
}

fn require_source(verb: Verb, app: &AppSpec, status: &AppStatus) -> Result<()> {
    if status.source_present {
        Ok(())
    } else {
        Err(Error::invalid_state(
            verb.as_str(),
            app.name(),
            format!(
                "no source at {}; install it first",
                app.source_path().display()
            ),
        ))
    }
}

/// Plan a first-time install.
///
/// Always builds and links; only the clone is skipped when source exists.
pub fn plan_install(app: &AppSpec, status: &AppStatus) -> Result<OperationPlan> {
    require_configured(app, status)?;

    let mut plan = OperationPlan::new(app.name(), Verb::Install);
    if status.source_present {
        plan.push(Operation::skip_obtain_source());
    } else {
        plan.push(app.obtain_source());
    }
    plan.push_applicable(app.select_version());
    plan.push(app.build());
    plan.push_applicable(app.move_artifact());
    plan.push(app.link_artifact());

    log::debug!("install plan for {}: {} step(s)", app.name(), plan.len());
    Ok(plan)
}

/// Plan an unconditional refresh: fetch, checkout, rebuild, relink.
pub fn plan_update(app: &AppSpec, status: &AppStatus) -> Result<OperationPlan> {
    require_configured(app, status)?;
    require_source(Verb::Update, app, status)?;

    let mut plan = OperationPlan::new(app.name(), Verb::Update);
    plan.push_applicable(app.fetch_updates());
    plan.push_applicable(app.select_version());
    plan.push(app.build());
    plan.push_applicable(app.move_artifact());
    plan.push(app.link_artifact());

    log::debug!("update plan for {}: {} step(s)", app.name(), plan.len());
    Ok(plan)
}

/// Plan the minimal steps that bring an app to its desired state.
///
/// A git app whose artifact already exists gets its rebuild wrapped in
/// [`Operation::IfCommitChanged`], with the HEAD observed before planning as
/// baseline. Whether fetch and checkout moved HEAD is only known once they
/// have run.
pub fn plan_reconcile(app: &AppSpec, status: &AppStatus) -> Result<OperationPlan> {
    require_configured(app, status)?;

    let mut plan = OperationPlan::new(app.name(), Verb::MakeItSo);

    if !status.source_present {
        plan.push(app.obtain_source());
    } else {
        plan.push_applicable(app.fetch_updates());
    }
    plan.push_applicable(app.select_version());

    let mut rebuild = vec![app.build()];
    rebuild.extend(app.move_artifact());

    if !status.target_present {
        plan.operations.extend(rebuild);
    } else if app.flavor() == Flavor::Git {
        plan.push(Operation::IfCommitChanged {
            repo_path: app.source_path(),
            baseline_commit: status.current_commit.clone(),
            then: rebuild,
        });
    }

    plan.push(app.link_artifact());
    if app.link_as_library() {
        plan.push(app.link_library());
    }

    log::debug!("make-it-so plan for {}: {} step(s)", app.name(), plan.len());
    Ok(plan)
}

/// Plan removal of links and artifacts, plus the source when asked.
pub fn plan_remove(app: &AppSpec, status: &AppStatus, remove_source: bool) -> Result<OperationPlan> {
    let verb = Verb::Remove { remove_source };
    require_configured(app, status)?;
    require_source(verb, app, status)?;

    let mut plan = OperationPlan::new(app.name(), verb);
    plan.push(Operation::DeleteFile {
        kind: DeleteTarget::BinaryLink,
        path: app.binary_path(),
    });
    plan.push(Operation::DeleteFile {
        kind: DeleteTarget::LibraryLink,
        path: app.lib_path(),
    });
    plan.push(Operation::DeleteFilesWithPrefix {
        kind: DeleteTarget::Artifacts,
        dir: app.layout().artifacts_dir.clone(),
        prefix: app.artifact_prefix(),
    });
    if remove_source {
        plan.push(Operation::DeleteDir {
            kind: DeleteTarget::Source,
            path: app.source_path(),
        });
    }

    log::debug!("remove plan for {}: {} step(s)", app.name(), plan.len());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::BuildAction;
    use crate::spec::tests::{git_def, spec, web_def};
    use std::path::PathBuf;

    fn observed(source: bool, version: bool, target: bool, link: bool) -> AppStatus {
        AppStatus {
            is_configured: true,
            source_present: source,
            version_present: version,
            target_present: target,
            link_present: link,
            lib_link_present: false,
            available_versions: Vec::new(),
            current_commit: source.then(|| "abc123".to_string()),
        }
    }

    fn install_tail(app: &AppSpec) -> Vec<Operation> {
        vec![
            Operation::GitCheckout {
                repo_path: app.source_path(),
                ref_name: "main".to_string(),
            },
            Operation::BuildWithScript {
                source_path: app.source_path(),
                shell: "/bin/sh".to_string(),
                script: "make build".to_string(),
            },
            Operation::MoveArtifact {
                from: app.build_target_path(),
                to: app.artifact_path(),
            },
            Operation::LinkArtifact {
                from: app.artifact_path(),
                to: app.binary_path(),
            },
        ]
    }

    #[test]
    fn test_install_git_without_source() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_install(&app, &observed(false, false, false, false)).unwrap();

        let mut expected = vec![Operation::GitClone {
            repo_url: "git@github.com:github/gitignore.git".to_string(),
            destination: PathBuf::from("/tmp/selfman-test/data/sources/tool"),
        }];
        expected.extend(install_tail(&app));
        assert_eq!(plan.operations, expected);
        assert_eq!(plan.verb, Verb::Install);
    }

    #[test]
    fn test_install_git_with_source_skips_clone() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_install(&app, &observed(true, true, false, false)).unwrap();

        let mut expected = vec![Operation::skip_obtain_source()];
        expected.extend(install_tail(&app));
        assert_eq!(plan.operations, expected);
    }

    #[test]
    fn test_install_web_archive_has_no_checkout() {
        let app = spec(web_def("zig", "0.13.0"));
        let plan = plan_install(&app, &observed(false, false, false, false)).unwrap();

        assert_eq!(plan.len(), 4);
        assert!(matches!(plan.operations[0], Operation::FetchFromWeb { .. }));
        assert!(
            plan.operations
                .iter()
                .all(|op| !matches!(op, Operation::GitCheckout { .. }))
        );
    }

    #[test]
    fn test_install_keep_bin_with_source_skips_move() {
        let mut def = git_def("tool", "main");
        def.keep_bin_with_source = true;
        def.build_action = BuildAction::None;
        def.build_cmd = None;
        let app = spec(def);
        let plan = plan_install(&app, &observed(false, false, false, false)).unwrap();

        assert_eq!(
            plan.operations.last(),
            Some(&Operation::LinkArtifact {
                from: app.build_target_path(),
                to: app.binary_path(),
            })
        );
        assert!(plan.operations.contains(&Operation::no_build()));
        assert!(
            plan.operations
                .iter()
                .all(|op| !matches!(op, Operation::MoveArtifact { .. }))
        );
    }

    #[test]
    fn test_unconfigured_fails_every_verb() {
        let app = spec(git_def("tool", "main"));
        let status = AppStatus::unconfigured();
        for verb in [
            Verb::Install,
            Verb::Update,
            Verb::MakeItSo,
            Verb::Remove {
                remove_source: false,
            },
        ] {
            let err = verb.plan(&app, &status).unwrap_err();
            assert!(matches!(err, Error::NotConfigured(_)), "{verb}");
        }
    }

    #[test]
    fn test_update_requires_source() {
        let app = spec(git_def("tool", "main"));
        let err = plan_update(&app, &observed(false, false, false, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_update_always_refreshes() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_update(&app, &observed(true, true, true, true)).unwrap();

        let mut expected = vec![Operation::GitFetch {
            repo_path: app.source_path(),
        }];
        expected.extend(install_tail(&app));
        assert_eq!(plan.operations, expected);
    }

    #[test]
    fn test_update_web_archive() {
        let app = spec(web_def("zig", "0.13.0"));
        let plan = plan_update(&app, &observed(true, true, true, true)).unwrap();
        let labels: Vec<_> = plan.operations.iter().map(Operation::label).collect();
        assert_eq!(labels, vec!["build", "move", "link"]);
    }

    #[test]
    fn test_reconcile_web_archive_fully_present_only_links() {
        let app = spec(web_def("zig", "0.13.0"));
        let plan = plan_reconcile(&app, &observed(true, true, true, true)).unwrap();

        assert_eq!(plan.operations, vec![app.link_artifact()]);
    }

    #[test]
    fn test_reconcile_web_archive_missing_source() {
        let app = spec(web_def("zig", "0.13.0"));
        let plan = plan_reconcile(&app, &observed(false, false, false, false)).unwrap();
        let labels: Vec<_> = plan.operations.iter().map(Operation::label).collect();
        assert_eq!(labels, vec!["download", "build", "move", "link"]);
    }

    #[test]
    fn test_reconcile_git_with_target_gates_rebuild() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_reconcile(&app, &observed(true, true, true, true)).unwrap();

        assert_eq!(
            plan.operations,
            vec![
                Operation::GitFetch {
                    repo_path: app.source_path(),
                },
                Operation::GitCheckout {
                    repo_path: app.source_path(),
                    ref_name: "main".to_string(),
                },
                Operation::IfCommitChanged {
                    repo_path: app.source_path(),
                    baseline_commit: Some("abc123".to_string()),
                    then: vec![app.build(), app.move_artifact().unwrap()],
                },
                app.link_artifact(),
            ]
        );
    }

    #[test]
    fn test_reconcile_git_without_target_builds_directly() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_reconcile(&app, &observed(false, false, false, false)).unwrap();
        let labels: Vec<_> = plan.operations.iter().map(Operation::label).collect();
        assert_eq!(labels, vec!["clone", "checkout", "build", "move", "link"]);
    }

    #[test]
    fn test_reconcile_links_library() {
        let mut def = git_def("lib", "main");
        def.link_as_library = true;
        def.keep_bin_with_source = true;
        let app = spec(def);
        let plan = plan_reconcile(&app, &observed(true, true, true, true)).unwrap();

        assert_eq!(plan.operations.last(), Some(&app.link_library()));
        match &plan.operations[2] {
            Operation::IfCommitChanged { then, .. } => assert_eq!(then, &vec![app.build()]),
            other => panic!("expected commit gate, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_keeps_source_by_default() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_remove(&app, &observed(true, true, true, true), false).unwrap();

        assert_eq!(
            plan.operations,
            vec![
                Operation::DeleteFile {
                    kind: DeleteTarget::BinaryLink,
                    path: app.binary_path(),
                },
                Operation::DeleteFile {
                    kind: DeleteTarget::LibraryLink,
                    path: app.lib_path(),
                },
                Operation::DeleteFilesWithPrefix {
                    kind: DeleteTarget::Artifacts,
                    dir: PathBuf::from("/tmp/selfman-test/data/artifacts"),
                    prefix: "tool---".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_remove_with_source_appends_dir_delete() {
        let app = spec(git_def("tool", "main"));
        let plan = plan_remove(&app, &observed(true, true, true, true), true).unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(
            plan.operations[3],
            Operation::DeleteDir {
                kind: DeleteTarget::Source,
                path: app.source_path(),
            }
        );
    }

    #[test]
    fn test_remove_requires_source() {
        let app = spec(git_def("tool", "main"));
        let err = plan_remove(&app, &observed(false, false, false, true), true).unwrap_err();
        assert!(err.to_string().contains("cannot remove \"tool\""));
    }
}
