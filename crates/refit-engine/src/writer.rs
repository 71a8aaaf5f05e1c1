//! All-or-nothing persistence of an artifact set.
//!
//! Every artifact is first staged as a hidden temp file next to its final
//! path, synced and checked. Only when the whole set is staged are the temps
//! renamed into place. Any failure restores the directory to the state it
//! had before the call.

use crate::error::{EngineResult, MigrationError};
use refit_core::GeneratedArtifact;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// Content validation
// =============================================================================

/// Check run on staged content before anything is committed.
pub trait ContentValidator: Send + Sync {
    /// Return the reason the content must not be written.
    fn check(&self, path: &Path, content: &str) -> Result<(), String>;
}

/// Rejects sources whose brackets do not balance. Non-source files pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedDelimiters;

impl ContentValidator for BalancedDelimiters {
    fn check(&self, path: &Path, content: &str) -> Result<(), String> {
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "ts" | "tsx" | "js" | "jsx"));
        if !is_source {
            return Ok(());
        }
        balanced(content)
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ContentValidator for AcceptAll {
    fn check(&self, _path: &Path, _content: &str) -> Result<(), String> {
        Ok(())
    }
}

fn balanced(content: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = content.chars().peekable();
    let mut line = 1;
    let mut quote: Option<char> = None;
    let mut previous = ' ';
    while let Some(c) = chars.next() {
        let before = std::mem::replace(&mut previous, c);
        if c == '\n' {
            line += 1;
        }
        if let Some(q) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            // apostrophes inside JSX text (`Don't`) do not open a string
            '\'' if before.is_alphanumeric() => {}
            '"' | '\'' | '`' => quote = Some(c),
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = ' ';
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                    }
                    if last == '*' && next == '/' {
                        break;
                    }
                    last = next;
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, at)) => {
                        return Err(format!(
                            "`{c}` on line {line} closes `{open}` opened on line {at}"
                        ))
                    }
                    None => return Err(format!("unmatched `{c}` on line {line}")),
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some((open, at)) => Err(format!("`{open}` opened on line {at} is never closed")),
        None => Ok(()),
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Summary of a committed write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Final paths, in artifact order.
    pub written: Vec<PathBuf>,
    /// Files that replaced an existing one.
    pub replaced: usize,
    /// Directories the call created.
    pub created_dirs: Vec<PathBuf>,
    /// Total bytes written.
    pub bytes: u64,
}

struct Staged {
    temp: PathBuf,
    target: PathBuf,
    backup: Option<PathBuf>,
    committed: bool,
}

/// Writes artifact sets under an output root.
pub struct AtomicWriter {
    root: PathBuf,
    validator: Box<dyn ContentValidator>,
    fail_at_commit: Option<usize>,
}

impl std::fmt::Debug for AtomicWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicWriter")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl AtomicWriter {
    /// Writer rooted at `root` with the [`BalancedDelimiters`] check.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            validator: Box::new(BalancedDelimiters),
            fail_at_commit: None,
        }
    }

    /// Replace the staged-content check.
    pub fn with_validator(mut self, validator: impl ContentValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Fail the commit phase just before renaming the artifact at `index`.
    #[doc(hidden)]
    pub fn fail_at_commit(mut self, index: usize) -> Self {
        self.fail_at_commit = Some(index);
        self
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist every artifact or none of them.
    pub fn write_all(&self, artifacts: &[GeneratedArtifact]) -> EngineResult<WriteReport> {
        let mut created_dirs = Vec::new();
        let mut staged = Vec::with_capacity(artifacts.len());

        if let Err(e) = self.stage(artifacts, &mut staged, &mut created_dirs) {
            warn!(error = %e, "Staging failed, discarding temp files");
            self.rollback(&mut staged, &created_dirs);
            return Err(e);
        }
        if let Err(e) = self.commit(&mut staged) {
            warn!(error = %e, "Commit failed, restoring previous files");
            self.rollback(&mut staged, &created_dirs);
            return Err(e);
        }

        let mut report = WriteReport {
            created_dirs,
            ..Default::default()
        };
        for (item, artifact) in staged.iter().zip(artifacts) {
            if let Some(backup) = &item.backup {
                if let Err(e) = fs::remove_file(backup) {
                    warn!(path = %backup.display(), error = %e, "Failed to remove backup");
                }
                report.replaced += 1;
            }
            report.written.push(item.target.clone());
            report.bytes += artifact.content.len() as u64;
        }
        info!(
            files = report.written.len(),
            replaced = report.replaced,
            bytes = report.bytes,
            "Committed artifacts"
        );
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Phases
    // -------------------------------------------------------------------------

    fn stage(
        &self,
        artifacts: &[GeneratedArtifact],
        staged: &mut Vec<Staged>,
        created_dirs: &mut Vec<PathBuf>,
    ) -> EngineResult<()> {
        for artifact in artifacts {
            let target = self.target_path(&artifact.path)?;
            let parent = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone());
            self.create_dirs(&parent, created_dirs)?;

            let file_name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let temp = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
            staged.push(Staged {
                temp: temp.clone(),
                target: target.clone(),
                backup: None,
                committed: false,
            });

            write_synced(&temp, artifact.content.as_bytes())?;
            self.validator
                .check(&target, &artifact.content)
                .map_err(|reason| MigrationError::ContentRejected {
                    path: target.clone(),
                    reason,
                })?;
            debug!(path = %target.display(), bytes = artifact.content.len(), "Staged artifact");
        }
        Ok(())
    }

    fn commit(&self, staged: &mut [Staged]) -> EngineResult<()> {
        for (index, item) in staged.iter_mut().enumerate() {
            if self.fail_at_commit == Some(index) {
                return Err(MigrationError::write_failed(
                    &item.target,
                    "commit interrupted",
                ));
            }
            if item.target.exists() {
                let backup = sibling(&item.target, "bak");
                fs::rename(&item.target, &backup)
                    .map_err(|e| MigrationError::write_failed(&item.target, e.to_string()))?;
                item.backup = Some(backup);
            }
            fs::rename(&item.temp, &item.target)
                .map_err(|e| MigrationError::write_failed(&item.target, e.to_string()))?;
            item.committed = true;
        }
        Ok(())
    }

    /// Undo committed renames, restore backups, drop temps and created directories.
    fn rollback(&self, staged: &mut [Staged], created_dirs: &[PathBuf]) {
        for item in staged.iter_mut().rev() {
            if item.committed {
                if let Err(e) = fs::remove_file(&item.target) {
                    warn!(path = %item.target.display(), error = %e, "Failed to remove committed file");
                }
                item.committed = false;
            }
            if let Some(backup) = item.backup.take() {
                if let Err(e) = fs::rename(&backup, &item.target) {
                    warn!(path = %item.target.display(), error = %e, "Failed to restore backup");
                }
            }
            if item.temp.exists() {
                if let Err(e) = fs::remove_file(&item.temp) {
                    warn!(path = %item.temp.display(), error = %e, "Failed to remove temp file");
                }
            }
        }
        for dir in created_dirs.iter().rev() {
            if let Err(e) = fs::remove_dir(dir) {
                warn!(path = %dir.display(), error = %e, "Failed to remove created directory");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Paths
    // -------------------------------------------------------------------------

    fn target_path(&self, relative: &Path) -> EngineResult<PathBuf> {
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(MigrationError::write_failed(
                relative,
                "artifact path must be relative to the output root",
            ));
        }
        Ok(self.root.join(relative))
    }

    /// Create `dir` and its missing ancestors, recording them outermost first.
    fn create_dirs(&self, dir: &Path, created: &mut Vec<PathBuf>) -> EngineResult<()> {
        let mut missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|d| !d.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        for d in missing {
            fs::create_dir(&d).map_err(|e| MigrationError::write_failed(&d, e.to_string()))?;
            created.push(d);
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let mut file =
        fs::File::create(path).map_err(|e| MigrationError::write_failed(path, e.to_string()))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| MigrationError::write_failed(path, e.to_string()))
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.{suffix}", Uuid::new_v4()))
}
