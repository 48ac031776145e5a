//! Desired-state model
//!
//! An [`AppDefinition`] is what a config file says; an [`AppSpec`] is the
//! validated, defaulted declaration every planner works from. All paths are
//! derived on demand from the spec fields and the shared [`Layout`], so the
//! same spec always yields the same paths.

use crate::error::{Error, Result};
use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Placeholder in `web-url` replaced by the app version.
pub const VERSION_PLACEHOLDER: &str = "%VERSION%";

/// Token that stands in for a path separator inside a version label.
pub const SLASH_ESCAPE: &str = "%SLASH%";

/// Separator between app name and version in flat file names.
pub const NAME_VERSION_SEPARATOR: &str = "---";

/// How an application's source is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    /// A git repository, checked out in place.
    Git,
    /// A versioned archive downloaded over HTTP.
    WebArchive,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Git => write!(f, "git"),
            Flavor::WebArchive => write!(f, "web-archive"),
        }
    }
}

/// How an application is built once its source is present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildAction {
    /// Nothing to build, the source already contains the artifact.
    #[default]
    None,
    /// Run `build-cmd` through the configured shell.
    Script,
}

/// One application as written in its config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AppDefinition {
    #[serde(default)]
    pub name: String,
    pub flavor: Option<Flavor>,
    #[serde(default)]
    pub version: String,
    pub remote_repo: Option<String>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub build_action: BuildAction,
    pub build_cmd: Option<String>,
    pub build_target: Option<String>,
    #[serde(default)]
    pub keep_bin_with_source: bool,
    #[serde(default)]
    pub link_as_library: bool,
}

/// Directories and settings shared by every app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Where sources are cloned or unpacked.
    pub sources_dir: PathBuf,
    /// Flat directory of moved build artifacts.
    pub artifacts_dir: PathBuf,
    /// Directory holding binary symlinks (usually on PATH).
    pub bin_dir: PathBuf,
    /// Directory holding library symlinks.
    pub lib_dir: PathBuf,
    /// Shell used to run build scripts.
    pub shell: String,
}

impl Layout {
    /// Layout rooted at a single data directory.
    pub fn under(data_dir: &Path, bin_dir: &Path, lib_dir: &Path, shell: &str) -> Self {
        Self {
            sources_dir: data_dir.join("sources"),
            artifacts_dir: data_dir.join("artifacts"),
            bin_dir: bin_dir.to_path_buf(),
            lib_dir: lib_dir.to_path_buf(),
            shell: shell.to_string(),
        }
    }
}

/// Where the source comes from, tied to the flavor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Remote repository URL.
    Git { remote_repo: String },
    /// Download URL template containing [`VERSION_PLACEHOLDER`].
    WebArchive { web_url: String },
}

/// Validated desired state for one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    name: String,
    version: String,
    source: SourceLocator,
    build_cmd: Option<String>,
    build_target: String,
    keep_bin_with_source: bool,
    link_as_library: bool,
    layout: Arc<Layout>,
}

impl AppSpec {
    /// Apply defaults and validate a definition.
    ///
    /// Returns every violation found rather than stopping at the first one.
    pub fn from_definition(
        def: AppDefinition,
        layout: Arc<Layout>,
    ) -> std::result::Result<Self, Vec<String>> {
        let label = if def.name.is_empty() {
            "(unnamed app)".to_string()
        } else {
            format!("(app {})", def.name)
        };
        let mut violations = Vec::new();

        if def.name.is_empty() {
            violations.push(format!("{label} application name cannot be empty"));
        }
        if def.version.is_empty() {
            violations.push(format!("{label} version cannot be empty"));
        }

        let source = match def.flavor {
            None => {
                violations.push(format!("{label} flavor must be one of: git, web-archive"));
                None
            }
            Some(Flavor::Git) => match def.remote_repo {
                Some(remote_repo) if !remote_repo.is_empty() => {
                    Some(SourceLocator::Git { remote_repo })
                }
                _ => {
                    violations.push(format!(
                        "{label} remote-repo must be specified for apps of flavor git"
                    ));
                    None
                }
            },
            Some(Flavor::WebArchive) => match def.web_url {
                Some(web_url) if !web_url.is_empty() => {
                    Some(SourceLocator::WebArchive { web_url })
                }
                _ => {
                    violations.push(format!(
                        "{label} web-url must be specified for apps of flavor web-archive"
                    ));
                    None
                }
            },
        };

        let build_cmd = match (def.build_action, def.build_cmd) {
            (BuildAction::Script, Some(cmd)) if !cmd.trim().is_empty() => Some(cmd),
            (BuildAction::Script, _) => {
                violations.push(format!(
                    "{label} build-cmd must be specified when build-action is script"
                ));
                None
            }
            (BuildAction::None, Some(_)) => {
                violations.push(format!(
                    "{label} build-cmd is only allowed when build-action is script"
                ));
                None
            }
            (BuildAction::None, None) => None,
        };

        let build_target = def
            .build_target
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| def.name.to_lowercase());

        match source {
            Some(source) if violations.is_empty() => Ok(Self {
                name: def.name,
                version: def.version,
                source,
                build_cmd,
                build_target,
                keep_bin_with_source: def.keep_bin_with_source,
                link_as_library: def.link_as_library,
                layout,
            }),
            _ => Err(violations),
        }
    }

    // =========================================================================
    // Fields
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn flavor(&self) -> Flavor {
        match self.source {
            SourceLocator::Git { .. } => Flavor::Git,
            SourceLocator::WebArchive { .. } => Flavor::WebArchive,
        }
    }

    pub fn source(&self) -> &SourceLocator {
        &self.source
    }

    pub fn build_action(&self) -> BuildAction {
        if self.build_cmd.is_some() {
            BuildAction::Script
        } else {
            BuildAction::None
        }
    }

    pub fn build_cmd(&self) -> Option<&str> {
        self.build_cmd.as_deref()
    }

    pub fn build_target(&self) -> &str {
        &self.build_target
    }

    pub fn keep_bin_with_source(&self) -> bool {
        self.keep_bin_with_source
    }

    pub fn link_as_library(&self) -> bool {
        self.link_as_library
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Download URL with the version substituted (web-archive only).
    pub fn resolved_web_url(&self) -> Option<String> {
        match &self.source {
            SourceLocator::WebArchive { web_url } => {
                Some(web_url.replace(VERSION_PLACEHOLDER, &self.version))
            }
            SourceLocator::Git { .. } => None,
        }
    }

    // =========================================================================
    // Derived paths
    // =========================================================================

    /// Source directory.
    ///
    /// git apps have one checkout that is moved between versions in place;
    /// web-archive apps get one directory per version.
    pub fn source_path(&self) -> PathBuf {
        match self.source {
            SourceLocator::Git { .. } => self.layout.sources_dir.join(&self.name),
            SourceLocator::WebArchive { .. } => {
                self.layout.sources_dir.join(self.versioned_file_name())
            }
        }
    }

    /// Path of the built artifact inside the source tree.
    pub fn build_target_path(&self) -> PathBuf {
        self.source_path().join(&self.build_target)
    }

    /// Where the artifact lives once built (and moved, unless kept in place).
    pub fn artifact_path(&self) -> PathBuf {
        if self.keep_bin_with_source {
            self.build_target_path()
        } else {
            self.layout.artifacts_dir.join(self.versioned_file_name())
        }
    }

    /// Stable symlink location for the binary.
    pub fn binary_path(&self) -> PathBuf {
        self.layout.bin_dir.join(&self.name)
    }

    /// Stable symlink location for the library tree.
    pub fn lib_path(&self) -> PathBuf {
        self.layout.lib_dir.join(&self.name)
    }

    /// File-name prefix shared by every artifact of this app.
    pub fn artifact_prefix(&self) -> String {
        format!("{}{}", self.name, NAME_VERSION_SEPARATOR)
    }

    fn versioned_file_name(&self) -> String {
        format!("{}{}", self.artifact_prefix(), escape_version(&self.version))
    }

    // =========================================================================
    // Operation factories
    // =========================================================================

    /// Get the source onto disk.
    pub fn obtain_source(&self) -> Operation {
        match &self.source {
            SourceLocator::Git { remote_repo } => Operation::GitClone {
                repo_url: remote_repo.clone(),
                destination: self.source_path(),
            },
            SourceLocator::WebArchive { web_url } => Operation::FetchFromWeb {
                url_template: web_url.clone(),
                version: self.version.clone(),
                destination_dir: self.source_path(),
            },
        }
    }

    /// Move the source to the desired version. Not applicable to web-archive apps.
    pub fn select_version(&self) -> Option<Operation> {
        match self.source {
            SourceLocator::Git { .. } => Some(Operation::GitCheckout {
                repo_path: self.source_path(),
                ref_name: self.version.clone(),
            }),
            SourceLocator::WebArchive { .. } => None,
        }
    }

    /// Refresh refs and tags. Not applicable to web-archive apps.
    pub fn fetch_updates(&self) -> Option<Operation> {
        match self.source {
            SourceLocator::Git { .. } => Some(Operation::GitFetch {
                repo_path: self.source_path(),
            }),
            SourceLocator::WebArchive { .. } => None,
        }
    }

    /// Build the artifact.
    pub fn build(&self) -> Operation {
        match &self.build_cmd {
            Some(script) => Operation::BuildWithScript {
                source_path: self.source_path(),
                shell: self.layout.shell.clone(),
                script: script.clone(),
            },
            None => Operation::no_build(),
        }
    }

    /// Move the built artifact out of the source tree, unless it stays there.
    pub fn move_artifact(&self) -> Option<Operation> {
        if self.keep_bin_with_source {
            return None;
        }
        Some(Operation::MoveArtifact {
            from: self.build_target_path(),
            to: self.artifact_path(),
        })
    }

    /// Point the binary symlink at the artifact.
    pub fn link_artifact(&self) -> Operation {
        Operation::LinkArtifact {
            from: self.artifact_path(),
            to: self.binary_path(),
        }
    }

    /// Point the library symlink at the source tree.
    pub fn link_library(&self) -> Operation {
        Operation::LinkLibrary {
            from: self.source_path(),
            to: self.lib_path(),
        }
    }
}

/// Replace every path separator in a version label so it stays one file name.
pub fn escape_version(version: &str) -> String {
    version.replace(['/', '\\'], SLASH_ESCAPE)
}

/// Inverse of [`escape_version`] for '/'-separated refs.
pub fn unescape_version(escaped: &str) -> String {
    escaped.replace(SLASH_ESCAPE, "/")
}

/// The full set of loaded applications, keyed (and ordered) by name
#[derive(Debug, Clone, Default)]
pub struct AppSet {
    apps: BTreeMap<String, AppSpec>,
}

impl AppSet {
    /// Validate a batch of definitions.
    ///
    /// Any violation in any definition (including duplicate names) rejects
    /// the whole batch, with every violation listed.
    pub fn from_definitions(defs: Vec<AppDefinition>, layout: Arc<Layout>) -> Result<Self> {
        let mut apps = BTreeMap::new();
        let mut violations = Vec::new();

        for def in defs {
            match AppSpec::from_definition(def, Arc::clone(&layout)) {
                Ok(spec) => {
                    if apps.contains_key(spec.name()) {
                        violations.push(format!(
                            "(app {}) application name is defined more than once",
                            spec.name()
                        ));
                    } else {
                        apps.insert(spec.name().to_string(), spec);
                    }
                }
                Err(errs) => violations.extend(errs),
            }
        }

        if violations.is_empty() {
            log::debug!("Loaded {} application spec(s)", apps.len());
            Ok(Self { apps })
        } else {
            Err(Error::Validation(violations))
        }
    }

    /// Look up an app by name.
    pub fn get(&self, name: &str) -> Option<&AppSpec> {
        self.apps.get(name)
    }

    /// Look up an app, failing with a configuration error when absent.
    pub fn require(&self, name: &str) -> Result<&AppSpec> {
        self.get(name)
            .ok_or_else(|| Error::NotConfigured(name.to_string()))
    }

    /// Apps sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &AppSpec> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
