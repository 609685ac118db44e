//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::core::errors::{CrossError, CrossResult};

/// Recursively copy a directory, preserving symlinks.
pub fn copy_dir_all(src: &Path, dst: &Path) -> CrossResult<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            CrossError::io(
                format!("failed to walk {}", src.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walkdir loop")),
            )
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        let ty = entry.file_type();

        if ty.is_dir() {
            ensure_dir(&target)?;
        } else if ty.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                CrossError::io(
                    format!(
                        "failed to copy {} to {}",
                        entry.path().display(),
                        target.display()
                    ),
                    e,
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> CrossResult<()> {
    let link = fs::read_link(src)
        .map_err(|e| CrossError::io(format!("failed to read link {}", src.display()), e))?;
    std::os::unix::fs::symlink(&link, dst)
        .map_err(|e| CrossError::io(format!("failed to create link {}", dst.display()), e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> CrossResult<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| CrossError::io(format!("failed to copy {}", src.display()), e))
}

/// Move a directory, falling back to copy + delete across filesystems.
pub fn move_dir(src: &Path, dst: &Path) -> CrossResult<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    copy_dir_all(src, dst)?;
    remove_dir_all_if_exists(src)
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> CrossResult<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .map_err(|e| CrossError::io(format!("failed to remove {}", path.display()), e))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> CrossResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| CrossError::io(format!("failed to create directory {}", path.display()), e))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> CrossResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .map_err(|e| CrossError::io(format!("failed to write {}", path.display()), e))
}

/// True if `path` is a directory with at least one entry.
pub fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Entries of a directory sorted by file name.
pub fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

/// First subdirectory of `dir` in file name order.
pub fn first_subdir(dir: &Path) -> Option<PathBuf> {
    sorted_entries(dir).into_iter().find(|p| p.is_dir())
}

/// First entry of `dir` whose file name matches a glob pattern.
pub fn find_by_pattern(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let pattern = Pattern::new(pattern).ok()?;
    sorted_entries(dir).into_iter().find(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| pattern.matches(n))
    })
}

/// Whether `path` is a regular file the current user can execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Mark a file executable (0755). No-op on non-unix hosts.
pub fn set_executable(path: &Path) -> CrossResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| CrossError::io(format!("failed to chmod {}", path.display()), e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("bin/gcc"), "#!/bin/sh\n").unwrap();

        copy_dir_all(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("bin/gcc")).unwrap(), "#!/bin/sh\n");
    }

    #[test]
    fn test_move_dir() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("staging");
        let dst = tmp.path().join("final");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("file"), "x").unwrap();

        move_dir(&src, &dst).unwrap();
        assert!(!src.exists());
        assert!(dst.join("file").exists());
    }

    #[test]
    fn test_first_subdir_is_name_ordered() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("MacOSX26.2.sdk")).unwrap();
        fs::create_dir_all(tmp.path().join("MacOSX15.0.sdk")).unwrap();
        fs::write(tmp.path().join("AAA.txt"), "").unwrap();

        let first = first_subdir(tmp.path()).unwrap();
        assert_eq!(first.file_name().unwrap(), "MacOSX15.0.sdk");
    }

    #[test]
    fn test_find_by_pattern() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x86_64-apple-darwin24-clang"), "").unwrap();
        fs::write(tmp.path().join("x86_64-apple-darwin24-clang++"), "").unwrap();

        let found = find_by_pattern(tmp.path(), "x86_64-apple-darwin*-clang").unwrap();
        assert_eq!(found.file_name().unwrap(), "x86_64-apple-darwin24-clang");
        assert!(find_by_pattern(tmp.path(), "aarch64-*").is_none());
    }

    #[test]
    fn test_non_empty_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_non_empty_dir(tmp.path()));
        assert!(!is_non_empty_dir(&tmp.path().join("missing")));
        fs::write(tmp.path().join("f"), "").unwrap();
        assert!(is_non_empty_dir(tmp.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_bits() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cc");
        fs::write(&path, "").unwrap();
        assert!(!is_executable(&path));
        set_executable(&path).unwrap();
        assert!(is_executable(&path));
    }
}
