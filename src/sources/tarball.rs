//! Source downloaded as a gzipped tarball.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::core::errors::PackageError;
use crate::core::recipe::Recipe;
use crate::sources::{unavailable, SourceProvider};
use crate::util::hash::sha256_bytes;

/// Downloads the recipe's source archive, caching it under `cache_dir`.
///
/// `file://` URLs are read directly. In offline mode only cached archives
/// and local files are used.
pub struct TarballSource {
    cache_dir: PathBuf,
    offline: bool,
}

impl TarballSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        TarballSource {
            cache_dir: cache_dir.into(),
            offline: false,
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Where the archive for `url` is cached.
    pub fn cache_path(&self, recipe: &Recipe, url: &Url) -> PathBuf {
        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}.tar.gz", recipe.name, recipe.version));
        self.cache_dir.join(&recipe.name).join(file_name)
    }

    fn archive_bytes(&self, recipe: &Recipe, url: &Url) -> Result<Vec<u8>, PackageError> {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| unavailable(recipe, format!("invalid file url {}", url)))?;
            return std::fs::read(&path)
                .map_err(|e| unavailable(recipe, format!("failed to read {}: {}", path.display(), e)));
        }

        let cached = self.cache_path(recipe, url);
        if cached.is_file() {
            tracing::debug!("using cached archive {}", cached.display());
            return std::fs::read(&cached)
                .map_err(|e| PackageError::io(format!("failed to read {}", cached.display()), e));
        }

        if self.offline {
            return Err(unavailable(
                recipe,
                format!("offline and {} is not cached", cached.display()),
            ));
        }

        let bytes = download(url).map_err(|e| unavailable(recipe, format!("{:#}", e)))?;

        if let Some(parent) = cached.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PackageError::io(format!("failed to create {}", parent.display()), e))?;
        }
        std::fs::write(&cached, &bytes)
            .map_err(|e| PackageError::io(format!("failed to write {}", cached.display()), e))?;
        Ok(bytes)
    }
}

impl SourceProvider for TarballSource {
    fn name(&self) -> &str {
        "tarball"
    }

    fn fetch_into(&self, recipe: &Recipe, dest: &Path) -> Result<(), PackageError> {
        let raw_url = recipe
            .source
            .url
            .as_deref()
            .ok_or_else(|| unavailable(recipe, "recipe declares no source url"))?;
        let expanded = recipe.expand(raw_url);
        let url = Url::parse(&expanded)
            .map_err(|e| unavailable(recipe, format!("invalid url `{}`: {}", expanded, e)))?;

        let bytes = self.archive_bytes(recipe, &url)?;

        if let Some(ref expected) = recipe.source.sha256 {
            let actual = sha256_bytes(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(unavailable(
                    recipe,
                    format!(
                        "hash mismatch for {}\n  expected: {}\n  actual:   {}",
                        url, expected, actual
                    ),
                ));
            }
            tracing::debug!("archive hash verified: {}", &actual[..16]);
        }

        let parent = dest.parent().unwrap_or(Path::new("."));
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(parent)
            .map_err(|e| PackageError::io(format!("failed to create a directory in {}", parent.display()), e))?;

        let strip = recipe
            .source
            .extracted_dir
            .as_deref()
            .map(|dir| recipe.expand(dir));
        extract_tarball(&bytes, staging.path(), strip.as_deref())
            .map_err(|e| unavailable(recipe, format!("{:#}", e)))?;

        // Only a complete extraction becomes the source subfolder.
        std::fs::rename(staging.path(), dest)
            .map_err(|e| PackageError::io(format!("failed to move source to {}", dest.display()), e))?;

        tracing::info!("extracted {} to {}", url, dest.display());
        Ok(())
    }
}

fn download(url: &Url) -> Result<Vec<u8>> {
    tracing::info!("downloading {}", url);

    let response = reqwest::blocking::get(url.as_str())
        .with_context(|| format!("failed to download {}", url))?;
    if !response.status().is_success() {
        bail!("failed to download {}: HTTP {}", url, response.status());
    }

    let bytes = response
        .bytes()
        .context("failed to read response body")?;
    Ok(bytes.to_vec())
}

/// Extract a `.tar.gz` archive into `dest`.
///
/// With `strip_prefix`, that leading directory is removed from every entry;
/// entries outside it are kept unchanged. Entries that would land outside
/// `dest` are rejected.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        let entry_path = entry.path().context("failed to read entry path")?.into_owned();
        let normalized = entry_path.to_string_lossy().replace('\\', "/");

        let relative = match strip_prefix.map(|p| p.trim_end_matches('/')) {
            Some(prefix) if normalized.trim_end_matches('/') == prefix => continue,
            Some(prefix) => normalized
                .strip_prefix(&format!("{}/", prefix))
                .unwrap_or(&normalized)
                .to_string(),
            None => normalized,
        };
        if relative.is_empty() {
            continue;
        }

        let relative = PathBuf::from(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!(
                "archive entry escapes destination directory: {}",
                entry_path.display()
            );
        }
        let output_path = dest.join(&relative);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::Link => {
                entry
                    .unpack(&output_path)
                    .with_context(|| format!("failed to extract {}", output_path.display()))?;
            }
            tar::EntryType::Symlink => {
                #[cfg(unix)]
                {
                    if let Some(target) = entry.link_name()? {
                        std::os::unix::fs::symlink(target.as_ref(), &output_path).with_context(
                            || format!("failed to create symlink: {}", output_path.display()),
                        )?;
                    }
                }
                #[cfg(windows)]
                {
                    tracing::debug!("skipping symlink {}", entry_path.display());
                }
            }
            _ => {
                tracing::debug!(
                    "skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}
