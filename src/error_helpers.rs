//! Error helper functions for creating actionable error messages

use std::io;
use std::path::Path;

/// Check if an IO error is a permission denied error
pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

/// Check if an IO error is a "not found" error
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Create an enhanced error message for file permission issues
pub fn permission_error(path: &Path, operation: &str) -> String {
    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Make the file writable: chmod u+w '{}'\n\
         3. If the file is checked out read-only, unlock it in your VCS first",
        operation,
        path.display(),
        path.display(),
        path.display()
    )
}

/// Create an enhanced error message for a missing patch target
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Run optpatch from the repository root (the default target is relative)\n\
         2. Pass the file explicitly: optpatch path/to/RestServer.java\n\
         3. Set [patch] target in ~/.optpatch/config.toml",
        path.display(),
        context,
    )
}

/// Map an IO error on `path` to an actionable `anyhow::Error`
pub fn io_error(err: io::Error, path: &Path, operation: &str) -> anyhow::Error {
    if is_not_found(&err) {
        anyhow::anyhow!(not_found_error(path, operation))
    } else if is_permission_denied(&err) {
        anyhow::anyhow!(permission_error(path, operation))
    } else {
        anyhow::Error::new(err).context(format!("Failed {}: {}", operation, path.display()))
    }
}

/// Create an enhanced error message for directory creation failures
pub fn dir_create_error(path: &Path, underlying_err: &io::Error) -> String {
    let base = format!("Failed to create directory: '{}'", path.display());
    let parent = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    if is_permission_denied(underlying_err) {
        format!(
            "{}\n\n\
             Cause: Permission denied\n\n\
             Possible fixes:\n\
             1. Check write permissions on '{}'\n\
             2. Use --backup-dir to specify a different location\n\
             3. Skip backups entirely: --no-backup --force",
            base, parent
        )
    } else {
        format!("{}\n\nUnderlying error: {}", base, underlying_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_is_permission_denied() {
        let perm_err = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        assert!(is_permission_denied(&perm_err));

        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(!is_permission_denied(&not_found_err));
    }

    #[test]
    fn test_is_not_found() {
        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(is_not_found(&not_found_err));

        let perm_err = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        assert!(!is_not_found(&perm_err));
    }

    #[test]
    fn test_not_found_error_formatting() {
        let path = Path::new("backend/src/main/java/com/whatsapp/RestServer.java");
        let msg = not_found_error(path, "reading patch target");
        assert!(msg.contains("File not found"));
        assert!(msg.contains("RestServer.java"));
        assert!(msg.contains("reading patch target"));
        assert!(msg.contains("Possible fixes"));
    }

    #[test]
    fn test_io_error_classification() {
        let path = Path::new("/tmp/Server.java");

        let err = io_error(io::Error::new(ErrorKind::NotFound, "gone"), path, "reading");
        assert!(err.to_string().contains("File not found"));

        let err = io_error(io::Error::new(ErrorKind::PermissionDenied, "no"), path, "writing");
        assert!(err.to_string().contains("Permission denied when writing"));

        let err = io_error(io::Error::new(ErrorKind::InvalidData, "bad utf-8"), path, "reading");
        assert!(err.to_string().contains("Failed reading: /tmp/Server.java"));
    }

    #[test]
    fn test_dir_create_error_permission() {
        let err = io::Error::new(ErrorKind::PermissionDenied, "denied");
        let msg = dir_create_error(Path::new("/root/backups"), &err);
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("--backup-dir"));
    }
}
