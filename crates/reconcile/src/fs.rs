//! Local filesystem implementation of [`FileSystem`]

use crate::context::FileSystem;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        Ok(())
    }
}

impl FileSystem for LocalFs {
    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        Self::ensure_parent(to)?;

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                log::debug!(
                    "Rename {} -> {} crosses devices, copying instead",
                    from.display(),
                    to.display()
                );
                copy_then_delete(from, to)
            }
            Err(e) => Err(Error::io(from, e)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        Self::ensure_parent(link)?;

        // Replace whatever is at the link location, but never a real directory
        match fs::symlink_metadata(link) {
            Ok(meta) if meta.is_dir() => {
                return Err(Error::Other(format!(
                    "{} is a directory, refusing to replace it with a link",
                    link.display()
                )));
            }
            Ok(_) => fs::remove_file(link).map_err(|e| Error::io(link, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(link, e)),
        }

        make_symlink(target, link).map_err(|e| Error::io(link, e))
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => Err(Error::Other(format!(
                "{} is a directory, not a file",
                path.display()
            ))),
            Ok(_) => {
                fs::remove_file(path).map_err(|e| Error::io(path, e))?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
        if !meta.is_dir() {
            return Err(Error::Other(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))
    }

    fn remove_files_with_prefix(&self, dir: &Path, prefix: &str) -> Result<usize> {
        let meta = match fs::metadata(dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist, nothing to sweep", dir.display());
                return Ok(0);
            }
            Err(e) => return Err(Error::io(dir, e)),
        };
        if !meta.is_dir() {
            return Err(Error::Other(format!("{} is not a directory", dir.display())));
        }

        let mut removed = 0;
        let mut errors = Vec::new();

        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(Error::io(dir, e));
                    continue;
                }
            };
            if !entry.file_name().to_string_lossy().starts_with(prefix) {
                continue;
            }
            let path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => continue,
                Ok(_) => match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => errors.push(Error::io(&path, e)),
                },
                Err(e) => errors.push(Error::io(&path, e)),
            }
        }

        if errors.is_empty() {
            Ok(removed)
        } else {
            Err(Error::Multiple(errors))
        }
    }
}

/// Move by copying, for renames across devices. Links are recreated, not
/// followed. A failed copy removes what it wrote and keeps the source.
fn copy_then_delete(from: &Path, to: &Path) -> Result<()> {
    let preexisting = fs::symlink_metadata(to).is_ok();
    if let Err(e) = copy_tree(from, to) {
        if !preexisting && let Err(cleanup) = remove_any(to) {
            log::warn!("Failed to clean up {}: {cleanup}", to.display());
        }
        return Err(e);
    }
    remove_any(from).map_err(|e| Error::io(from, e))
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false).follow_root_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            Error::io(path, e.into())
        })?;
        let path = entry.path();
        let rel = path.strip_prefix(from).map_err(|_| {
            Error::Other(format!("{} is outside {}", path.display(), from.display()))
        })?;
        let dest = if rel.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(rel)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|e| Error::io(path, e))?;
            make_symlink(&target, &dest).map_err(|e| Error::io(&dest, e))?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
        } else {
            fs::copy(path, &dest).map_err(|e| Error::io(&dest, e))?;
        }
    }
    Ok(())
}

fn remove_any(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let resolved = link
        .parent()
        .map_or_else(|| target.to_path_buf(), |parent| parent.join(target));
    if resolved.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn make_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Symlinks not supported on this platform",
    ))
}
