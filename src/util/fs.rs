//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use walkdir::WalkDir;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Find files below `root` whose file name matches `pattern`.
///
/// The search is recursive; returned paths are relative to `root` and
/// sorted. A missing root yields no matches. Symlinks to files count as
/// files.
pub fn find_matching(root: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let pattern = Pattern::new(pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }
        let matched = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.matches(name));
        if matched {
            results.push(relative_path(root, path));
        }
    }

    results.sort();
    Ok(results)
}

/// Copy a single file, creating the destination's parent directories.
///
/// Symlinks are resolved and copied as regular files.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Replace the first occurrence of `find` in a text file.
///
/// Returns `false` when the text is absent, which callers may treat as an
/// already-applied patch.
pub fn replace_in_file(path: &Path, find: &str, replace: &str) -> io::Result<bool> {
    let contents = fs::read_to_string(path)?;
    if contents.contains(replace) || !contents.contains(find) {
        return Ok(false);
    }
    fs::write(path, contents.replacen(find, replace, 1))?;
    Ok(true)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}
