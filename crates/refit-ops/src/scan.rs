//! Component discovery under the source root.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{OpsError, OpsResult};

/// Include and exclude filters compiled once per run.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl ScanFilter {
    /// Compile glob lists. Patterns are matched against `/`-separated paths
    /// relative to the source root.
    pub fn new(include: &[String], exclude: &[String]) -> OpsResult<Self> {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Whether a relative path belongs to the batch.
    pub fn accepts(&self, relative: &Path) -> bool {
        let normalized = normalize(relative);
        self.include.is_match(&normalized) && !self.exclude.is_match(&normalized)
    }
}

fn build_set(patterns: &[String]) -> OpsResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| OpsError::glob(pattern, e.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| OpsError::glob(patterns.join(","), e.to_string()))
}

fn normalize(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan `root` and return matching files relative to it, sorted.
pub fn discover(root: &Path, filter: &ScanFilter) -> OpsResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(OpsError::SourceNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && !is_blacklisted(e)))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if filter.accepts(relative) {
            files.push(relative.to_path_buf());
        }
    }
    files.sort();

    debug!(root = %root.display(), files = files.len(), "Discovered components");
    Ok(files)
}

/// Check if entry is hidden (starts with .).
fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Check if entry is a dependency or build output directory.
fn is_blacklisted(entry: &walkdir::DirEntry) -> bool {
    const BLACKLIST: &[&str] = &[
        "node_modules",
        "dist",
        "build",
        "coverage",
        "vendor",
        "out",
        "storybook-static",
        "__snapshots__",
        "__mocks__",
    ];

    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|s| BLACKLIST.contains(&s))
            .unwrap_or(false)
}
