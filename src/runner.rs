//! One patch run over a set of targets
//!
//! Everything is read and patched in memory first. Nothing is written until
//! every target loaded and `--strict` passed.

use crate::backup_manager::BackupManager;
use crate::config::Config;
use crate::diff_formatter::DiffFormatter;
use crate::file_processor::{FileProcessor, PatchedFile};
use crate::patch::{OptionsPatch, SUCCESS_MESSAGE};
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line choices for a patch run; `None` falls back to the config
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    pub files: Vec<String>,
    pub dry_run: bool,
    pub strict: bool,
    pub helper: Option<String>,
    pub context: Option<usize>,
    pub no_backup: bool,
    pub backup_dir: Option<String>,
}

/// Open the backup store: `--backup-dir`, then `[backup] backup_dir`, then the default
pub fn open_backup_manager(backup_dir: Option<String>, config: &Config) -> Result<BackupManager> {
    let backup_manager = match backup_dir.or_else(|| config.backup.backup_dir.clone()) {
        Some(dir) => BackupManager::with_directory(dir)?,
        None => BackupManager::new()?,
    };
    Ok(backup_manager.with_max_backups(config.max_backups()))
}

/// Patch every target, printing previews and the result message to `out`
///
/// Returns the backup ID when one was taken.
pub fn execute_patch<W: Write>(
    options: PatchOptions,
    config: &Config,
    formatter: &DiffFormatter,
    out: &mut W,
) -> Result<Option<String>> {
    let patch = OptionsPatch::new(options.helper.as_deref().unwrap_or(config.helper()))?;
    let helper = patch.helper().to_string();
    let processor = FileProcessor::new(patch);

    let targets: Vec<PathBuf> = if options.files.is_empty() {
        vec![PathBuf::from(config.target())]
    } else {
        options.files.iter().map(PathBuf::from).collect()
    };

    let mut patched: Vec<PatchedFile> = Vec::with_capacity(targets.len());
    for target in &targets {
        patched.push(processor.load(target)?);
    }

    let unmatched: Vec<&PatchedFile> = patched.iter().filter(|p| p.outcome.is_noop()).collect();
    for file in &unmatched {
        warn!(path = %file.path.display(), "no inlined OPTIONS handlers matched");
        eprintln!(
            "Note: no inlined OPTIONS handlers matched in {}",
            file.path.display()
        );
    }

    if options.strict && !unmatched.is_empty() {
        anyhow::bail!(
            "{} of {} target(s) contained no inlined OPTIONS handler (--strict); nothing was written",
            unmatched.len(),
            patched.len()
        );
    }

    if options.dry_run {
        let context = options.context.unwrap_or(config.context_lines());
        write!(out, "{}", formatter.format_dry_run_header(&helper))?;
        for file in &patched {
            write!(out, "{}", formatter.format_diff_with_context(&file.diff(), context))?;
        }
        return Ok(None);
    }

    let changed: Vec<PathBuf> = patched
        .iter()
        .filter(|p| !p.outcome.is_noop())
        .map(|p| p.path.clone())
        .collect();

    let backup_id = if options.no_backup || changed.is_empty() {
        None
    } else {
        let mut backup_manager = open_backup_manager(options.backup_dir, config)?;
        Some(backup_manager.create_backup(&format!("{} extraction", helper), &changed)?)
    };

    for file in &patched {
        file.write()?;
    }

    let total: usize = patched.iter().map(PatchedFile::replacements).sum();
    info!(files = patched.len(), replacements = total, "run complete");

    writeln!(out, "{}", SUCCESS_MESSAGE)?;

    if let Some(id) = &backup_id {
        write!(out, "{}", formatter.format_backup_hint(id))?;
    }

    Ok(backup_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const HANDLER: &str = "if (\"OPTIONS\".equals(exchange.getRequestMethod())) {\n    \
        exchange.sendResponseHeaders(200, -1);\n    \
        exchange.close();\n    \
        return;\n}\n";

    const PLAIN: &str = "class Plain {}\n";

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn file(&self, name: &str, content: &str) -> String {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path.display().to_string()
        }

        fn backups_dir(&self) -> PathBuf {
            self.dir.path().join("backups")
        }

        fn options(&self, files: Vec<String>) -> PatchOptions {
            PatchOptions {
                files,
                backup_dir: Some(self.backups_dir().display().to_string()),
                ..PatchOptions::default()
            }
        }

        fn backup_count(&self) -> usize {
            BackupManager::with_directory(self.backups_dir())
                .unwrap()
                .list_backups()
                .unwrap()
                .len()
        }
    }

    fn run(options: PatchOptions) -> (Result<Option<String>>, String) {
        let mut out = Vec::new();
        let result = execute_patch(options, &Config::default(), &DiffFormatter::plain(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn read(path: &str) -> String {
        fs::read_to_string(Path::new(path)).unwrap()
    }

    #[test]
    fn test_patches_and_backs_up() {
        let ws = Workspace::new();
        let target = ws.file("RestServer.java", HANDLER);

        let (result, output) = run(ws.options(vec![target.clone()]));
        let backup_id = result.unwrap();

        assert!(backup_id.is_some());
        assert!(read(&target).contains("handleOptions(exchange);"));
        assert!(output.starts_with(SUCCESS_MESSAGE));
        assert!(output.contains("optpatch rollback"));
        assert_eq!(ws.backup_count(), 1);
    }

    #[test]
    fn test_zero_matches_still_reports_success() {
        let ws = Workspace::new();
        let target = ws.file("Plain.java", PLAIN);

        let (result, output) = run(ws.options(vec![target.clone()]));

        assert_eq!(result.unwrap(), None);
        assert_eq!(output, format!("{}\n", SUCCESS_MESSAGE));
        assert_eq!(read(&target), PLAIN);
        assert_eq!(ws.backup_count(), 0, "Nothing changed, so nothing is backed up");
    }

    #[test]
    fn test_strict_fails_before_any_write() {
        let ws = Workspace::new();
        let matched = ws.file("RestServer.java", HANDLER);
        let unmatched = ws.file("Plain.java", PLAIN);

        let mut options = ws.options(vec![matched.clone(), unmatched]);
        options.strict = true;
        let (result, output) = run(options);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("--strict"));
        assert!(output.is_empty());
        assert_eq!(read(&matched), HANDLER);
        assert_eq!(ws.backup_count(), 0);
    }

    #[test]
    fn test_missing_target_aborts_before_any_write() {
        let ws = Workspace::new();
        let present = ws.file("RestServer.java", HANDLER);
        let missing = ws.dir.path().join("Missing.java").display().to_string();

        let (result, output) = run(ws.options(vec![present.clone(), missing]));

        assert!(result.is_err());
        assert!(output.is_empty());
        assert_eq!(read(&present), HANDLER);
        assert_eq!(ws.backup_count(), 0);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let ws = Workspace::new();
        let target = ws.file("RestServer.java", HANDLER);

        let mut options = ws.options(vec![target.clone()]);
        options.dry_run = true;
        let (result, output) = run(options);

        assert_eq!(result.unwrap(), None);
        assert!(output.starts_with("Dry run: extract inlined OPTIONS handlers into handleOptions(exchange)"));
        assert!(output.contains("+ "));
        assert!(!output.contains(SUCCESS_MESSAGE));
        assert_eq!(read(&target), HANDLER);
        assert_eq!(ws.backup_count(), 0);
    }

    #[test]
    fn test_no_backup_skips_backup() {
        let ws = Workspace::new();
        let target = ws.file("RestServer.java", HANDLER);

        let mut options = ws.options(vec![target.clone()]);
        options.no_backup = true;
        let (result, output) = run(options);

        assert_eq!(result.unwrap(), None);
        assert!(read(&target).contains("handleOptions(exchange);"));
        assert!(!output.contains("rollback"));
        assert_eq!(ws.backup_count(), 0);
    }

    #[test]
    fn test_helper_option_overrides_config() {
        let ws = Workspace::new();
        let target = ws.file("RestServer.java", HANDLER);

        let mut options = ws.options(vec![target.clone()]);
        options.helper = Some("handlePreflight".to_string());
        options.no_backup = true;
        run(options).0.unwrap();

        assert!(read(&target).contains("handlePreflight(exchange);"));
    }
}
