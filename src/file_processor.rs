use crate::error_helpers;
use crate::patch::{OptionsPatch, PatchOutcome};
use anyhow::{Context, Result};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeType {
    Unchanged,
    Added,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffLine {
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub content: String,
    pub change_type: ChangeType,
}

impl DiffLine {
    /// Line number shown in previews: the new position, or the old one for deletions
    pub fn display_line(&self) -> usize {
        self.new_line.or(self.old_line).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct FileDiff {
    pub file_path: String,
    pub replacements: usize,
    pub lines: Vec<DiffLine>,
}

impl FileDiff {
    pub fn has_changes(&self) -> bool {
        self.replacements > 0
    }

    pub fn count(&self, change_type: ChangeType) -> usize {
        self.lines.iter().filter(|l| l.change_type == change_type).count()
    }
}

/// A target file read into memory together with its patched content
#[derive(Debug)]
pub struct PatchedFile {
    pub path: PathBuf,
    pub original: String,
    pub outcome: PatchOutcome,
}

impl PatchedFile {
    pub fn replacements(&self) -> usize {
        self.outcome.replacements
    }

    /// Line diff between the original and patched content
    pub fn diff(&self) -> FileDiff {
        FileDiff {
            file_path: self.path.display().to_string(),
            replacements: self.outcome.replacements,
            lines: compute_diff(&self.original, &self.outcome.content),
        }
    }

    /// Write the patched content back over the original path
    ///
    /// Returns false without touching the file when nothing was replaced.
    /// The target must still be writable in that case.
    pub fn write(&self) -> Result<bool> {
        if self.outcome.is_noop() {
            ensure_writable(&self.path)?;
            debug!(path = %self.path.display(), "no replacements, leaving file untouched");
            return Ok(false);
        }

        write_atomic(&self.path, &self.outcome.content)?;
        info!(
            path = %self.path.display(),
            replacements = self.outcome.replacements,
            "patched file"
        );
        Ok(true)
    }
}

pub struct FileProcessor {
    patch: OptionsPatch,
}

impl FileProcessor {
    pub fn new(patch: OptionsPatch) -> Self {
        Self { patch }
    }

    /// Read `file_path` and run the patch over it in memory
    pub fn load(&self, file_path: &Path) -> Result<PatchedFile> {
        let original = fs::read_to_string(file_path)
            .map_err(|e| error_helpers::io_error(e, file_path, "reading patch target"))?;

        let outcome = self.patch.apply(&original);
        debug!(
            path = %file_path.display(),
            replacements = outcome.replacements,
            "computed patch"
        );

        Ok(PatchedFile {
            path: file_path.to_path_buf(),
            original,
            outcome,
        })
    }

    /// Read, patch and write back `file_path`, returning the replacement count
    pub fn apply_to_file(&self, file_path: &Path) -> Result<usize> {
        let patched = self.load(file_path)?;
        patched.write()?;
        Ok(patched.replacements())
    }
}

fn compute_diff(original: &str, modified: &str) -> Vec<DiffLine> {
    let diff = TextDiff::from_lines(original, modified);

    diff.iter_all_changes()
        .map(|change| DiffLine {
            old_line: change.old_index().map(|i| i + 1),
            new_line: change.new_index().map(|i| i + 1),
            content: change.value().trim_end_matches(['\r', '\n']).to_string(),
            change_type: match change.tag() {
                ChangeTag::Equal => ChangeType::Unchanged,
                ChangeTag::Insert => ChangeType::Added,
                ChangeTag::Delete => ChangeType::Deleted,
            },
        })
        .collect()
}

/// Fail unless `file_path` exists and is not read-only
///
/// rename() only needs directory permissions, so the file itself is checked.
fn ensure_writable(file_path: &Path) -> Result<fs::Metadata> {
    let metadata = fs::metadata(file_path)
        .map_err(|e| error_helpers::io_error(e, file_path, "writing patch target"))?;

    if metadata.permissions().readonly() {
        anyhow::bail!(error_helpers::permission_error(file_path, "writing"));
    }

    Ok(metadata)
}

/// Replace the contents of `file_path` without ever exposing a partial write
///
/// The content goes to a temp file in the same directory which is then renamed
/// over the target. The target's permissions are carried over.
pub fn write_atomic(file_path: &Path, content: &str) -> Result<()> {
    let metadata = ensure_writable(file_path)?;

    let parent_dir = file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temp file in {}", parent_dir.display()))?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temp file for {}", file_path.display()))?;
    temp_file.flush()?;

    fs::set_permissions(temp_file.path(), metadata.permissions())
        .with_context(|| format!("Failed to copy permissions of {}", file_path.display()))?;

    temp_file
        .persist(file_path)
        .map_err(|e| error_helpers::io_error(e.error, file_path, "replacing patch target"))?;

    Ok(())
}
