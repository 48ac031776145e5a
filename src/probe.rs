//! On-disk status probe
//!
//! Builds an [`AppStatus`] from the filesystem and, for git apps, from the
//! checkout itself. Nothing here mutates state.

use reconcile::{AppSpec, AppStatus, Error, Flavor, Result, Runner, StatusProbe, unescape_version};
use std::fs;
use std::path::Path;

use crate::runner::PARTIAL_SUFFIX;

/// [`StatusProbe`] reading the real filesystem
pub struct DiskProbe<'a> {
    runner: &'a dyn Runner,
}

impl<'a> DiskProbe<'a> {
    pub fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }

    fn probe_git(&self, app: &AppSpec, status: &mut AppStatus) -> Result<()> {
        let repo = app.source_path();
        status.source_present = repo.join(".git").is_dir();
        if !status.source_present {
            return Ok(());
        }

        status.version_present = self.runner.git_ref_exists(&repo, app.version())?;

        match self.runner.git_head_commit(&repo) {
            Ok(commit) => status.current_commit = Some(commit),
            // A fresh clone of an empty repository has no HEAD yet
            Err(e) => log::warn!("{}: cannot read HEAD: {e}", app.name()),
        }

        match self.runner.git_list_refs(&repo) {
            Ok(refs) => status.available_versions = refs,
            Err(e) => log::warn!("{}: cannot list refs: {e}", app.name()),
        }
        Ok(())
    }

    fn probe_web_archive(app: &AppSpec, status: &mut AppStatus) -> Result<()> {
        status.source_present = has_source_files(&app.source_path())?;
        status.version_present = status.source_present;
        status.available_versions =
            downloaded_versions(&app.layout().sources_dir, &app.artifact_prefix())?;
        Ok(())
    }
}

impl StatusProbe for DiskProbe<'_> {
    fn probe(&self, app: &AppSpec) -> Result<AppStatus> {
        let mut status = AppStatus {
            is_configured: true,
            ..Default::default()
        };

        match app.flavor() {
            Flavor::Git => self.probe_git(app, &mut status)?,
            Flavor::WebArchive => Self::probe_web_archive(app, &mut status)?,
        }

        status.target_present = is_executable(&app.artifact_path());
        status.link_present = is_symlink(&app.binary_path());
        status.lib_link_present = is_symlink(&app.lib_path());

        log::debug!(
            "{}: source={} version={} target={} link={} lib-link={} commit={:?}",
            app.name(),
            status.source_present,
            status.version_present,
            status.target_present,
            status.link_present,
            status.lib_link_present,
            status.current_commit,
        );
        Ok(status)
    }
}

/// Whether `path` holds anything besides unfinished downloads
fn has_source_files(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        if !entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Version labels of the `<name>---<version>` directories under `sources`
fn downloaded_versions(sources: &Path, prefix: &str) -> Result<Vec<String>> {
    let Ok(entries) = fs::read_dir(sources) else {
        return Ok(Vec::new());
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(sources, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(escaped) = name.strip_prefix(prefix).filter(|v| !v.is_empty()) {
            versions.push(unescape_version(escaped));
        }
    }
    versions.sort();
    Ok(versions)
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Regular file with an execute bit that the current user may run
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;

    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() || meta.permissions().mode() & 0o111 == 0 {
        return false;
    }
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };

    // SAFETY: access only reads the NUL-terminated path we own.
    unsafe { libc::access(c_path.as_ptr(), libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
