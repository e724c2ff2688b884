//! End-to-end rewrite of a RestServer-shaped source file

use std::fs;
use tempfile::TempDir;

use optpatch::{BackupManager, ChangeType, FileProcessor, OptionsPatch, DEFAULT_HELPER};

const UNPATCHED: &str = include_str!("fixtures/RestServer.java");
const PATCHED: &str = include_str!("fixtures/RestServer.patched.java");

fn processor() -> FileProcessor {
    FileProcessor::new(OptionsPatch::new(DEFAULT_HELPER).unwrap())
}

fn stage(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("RestServer.java");
    fs::write(&path, UNPATCHED).unwrap();
    path
}

#[test]
fn rewrites_every_inlined_handler() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(&temp_dir);

    let count = processor().apply_to_file(&path).unwrap();

    assert_eq!(count, 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), PATCHED);
}

#[test]
fn leaves_identical_bodies_under_other_methods() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(&temp_dir);

    processor().apply_to_file(&path).unwrap();
    let patched = fs::read_to_string(&path).unwrap();

    // The GET branch in GetProfileHandler has the same two statements
    assert_eq!(patched.matches("exchange.sendResponseHeaders(200, -1);").count(), 1);
    assert!(patched.contains("private void handleOptions(HttpExchange exchange)"));
}

#[test]
fn patched_file_is_a_fixed_point() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("RestServer.java");
    fs::write(&path, PATCHED).unwrap();

    let count = processor().apply_to_file(&path).unwrap();

    assert_eq!(count, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), PATCHED);
}

#[test]
fn preview_matches_written_result() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(&temp_dir);

    let patched = processor().load(&path).unwrap();
    let diff = patched.diff();

    assert_eq!(diff.replacements, 3);
    assert_eq!(diff.count(ChangeType::Deleted), 5);
    assert_eq!(diff.count(ChangeType::Added), 5);
    assert_eq!(fs::read_to_string(&path).unwrap(), UNPATCHED);

    assert!(patched.write().unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), PATCHED);
}

#[test]
fn rollback_restores_unpatched_source() {
    let temp_dir = TempDir::new().unwrap();
    let path = stage(&temp_dir);

    let mut backups = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();
    let id = backups
        .create_backup("handleOptions extraction", std::slice::from_ref(&path))
        .unwrap();

    processor().apply_to_file(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), PATCHED);

    backups.restore_backup(&id).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), UNPATCHED);
    assert!(backups.list_backups().unwrap().is_empty());
}
