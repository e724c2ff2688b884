//! optpatch: extract inlined HTTP OPTIONS handlers into a helper call
//!
//! The library holds everything the binary does so the rewrite can be driven
//! from tests. The main binary is at src/main.rs.

pub mod backup_manager;
pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod error_helpers;
pub mod file_processor;
pub mod logger;
pub mod patch;
pub mod runner;

// Re-export commonly used types for convenience
pub use backup_manager::{BackupManager, BackupMetadata, FileBackup};
pub use config::Config;
pub use diff_formatter::DiffFormatter;
pub use file_processor::{ChangeType, DiffLine, FileDiff, FileProcessor, PatchedFile};
pub use patch::{OptionsPatch, PatchOutcome, DEFAULT_HELPER, SUCCESS_MESSAGE};
pub use runner::{execute_patch, PatchOptions};
