use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::ffi::OsString;

#[derive(Parser)]
#[command(name = "optpatch")]
#[command(about = "Extract inlined HTTP OPTIONS handlers into a helper call")]
#[command(long_about = "optpatch rewrites every inlined CORS preflight handler of the form

  if (\"OPTIONS\".equals(exchange.getRequestMethod())) {
      exchange.sendResponseHeaders(200, -1);
      exchange.close();
      return;

into a call to an extracted helper:

  if (\"OPTIONS\".equals(exchange.getRequestMethod())) {
      handleOptions(exchange);
      return;

The match is purely textual. Running it again on a patched file changes nothing.
The helper itself must already exist in the target class.

With no FILE, the target is backend/src/main/java/com/whatsapp/RestServer.java
(or [patch] target from ~/.optpatch/config.toml).

EXAMPLES:
  optpatch                                 Patch the default target
  optpatch --dry-run                       Preview without writing
  optpatch src/RestServer.java             Patch a specific file
  optpatch --helper handlePreflight        Extract into a different helper
  optpatch --strict                        Fail if nothing matched
  optpatch rollback                        Undo the last run")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_precedence_over_arg = true)]
struct Cli {
    /// Java files to patch
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Preview changes without modifying files
    #[arg(short = 'd', long = "dry-run")]
    dry_run: bool,

    /// Fail when a target contains no inlined OPTIONS handler
    #[arg(long)]
    #[arg(help = "Fail when a target contains no inlined OPTIONS handler\nBy default a file without matches is left untouched and reported as a warning")]
    strict: bool,

    /// Helper method to extract into
    #[arg(long, value_name = "NAME")]
    helper: Option<String>,

    /// Number of context lines to show in previews
    #[arg(short = 'n', long = "context", value_name = "NUM")]
    context: Option<usize>,

    /// No context (show only changed lines)
    #[arg(long = "no-context", conflicts_with = "context")]
    no_context: bool,

    /// Skip backup creation (requires --force)
    #[arg(long = "no-backup", requires = "force")]
    #[arg(help = "Skip creating a backup (requires --force)\n⚠️  USE WITH CAUTION: Changes cannot be rolled back!")]
    no_backup: bool,

    /// Confirms --no-backup
    #[arg(long = "force", requires = "no_backup")]
    force: bool,

    /// Custom backup directory (default: ~/.optpatch/backups)
    #[arg(long, value_name = "DIR", global = true)]
    backup_dir: Option<String>,

    /// Write a debug log to ~/.optpatch/optpatch.log
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// Patch-only arguments that were given explicitly
    fn patch_arguments(&self) -> Vec<&'static str> {
        [
            (!self.files.is_empty(), "[FILE]..."),
            (self.dry_run, "--dry-run"),
            (self.strict, "--strict"),
            (self.helper.is_some(), "--helper"),
            (self.context.is_some(), "--context"),
            (self.no_context, "--no-context"),
            (self.no_backup, "--no-backup"),
            (self.force, "--force"),
        ]
        .into_iter()
        .filter_map(|(given, name)| given.then_some(name))
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Restore files from a backup (defaults to the last run)
    Rollback {
        /// Backup ID to rollback
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Show the backups of previous runs
    History,

    /// Show backup directory and last run
    Status,

    /// Manage backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Edit or show the configuration file
    Config {
        /// Show current configuration without editing
        #[arg(long = "show")]
        show: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Rollback { .. } => "rollback",
            Commands::History => "history",
            Commands::Status => "status",
            Commands::Backup { .. } => "backup",
            Commands::Config { .. } => "config",
        }
    }
}

#[derive(Subcommand)]
enum BackupAction {
    /// Remove old backups, keeping only the most recent ones
    Prune {
        /// Number of recent backups to keep
        #[arg(long, value_name = "N", default_value_t = 10)]
        keep: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    Patch {
        files: Vec<String>,
        dry_run: bool,
        strict: bool,
        helper: Option<String>,
        context: Option<usize>,
        no_backup: bool,
        backup_dir: Option<String>,
    },
    Rollback {
        id: Option<String>,
        backup_dir: Option<String>,
    },
    History {
        backup_dir: Option<String>,
    },
    Status {
        backup_dir: Option<String>,
    },
    BackupPrune {
        keep: usize,
        backup_dir: Option<String>,
    },
    Config {
        show: bool,
    },
}

/// Parsed command line: the action plus flags shared by every action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Args,
    pub debug: bool,
}

/// Parse the process arguments, exiting with clap's message on error or --help
pub fn parse_args() -> Invocation {
    parse_args_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

/// Parse an explicit argument list; the first item is the program name
pub fn parse_args_from<I, T>(iter: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(iter)?;

    if let Some(command) = &cli.command {
        let ignored = cli.patch_arguments();
        if !ignored.is_empty() {
            return Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                format!(
                    "{} cannot be used with the '{}' subcommand",
                    ignored.join(", "),
                    command.name()
                ),
            ));
        }
    }

    let args = match cli.command {
        Some(Commands::Rollback { id }) => Args::Rollback {
            id,
            backup_dir: cli.backup_dir,
        },
        Some(Commands::History) => Args::History {
            backup_dir: cli.backup_dir,
        },
        Some(Commands::Status) => Args::Status {
            backup_dir: cli.backup_dir,
        },
        Some(Commands::Config { show }) => Args::Config { show },
        Some(Commands::Backup { action }) => match action {
            BackupAction::Prune { keep } => Args::BackupPrune {
                keep,
                backup_dir: cli.backup_dir,
            },
        },
        None => {
            // None means "use the configured default"
            let context = if cli.no_context { Some(0) } else { cli.context };

            Args::Patch {
                files: cli.files,
                dry_run: cli.dry_run,
                strict: cli.strict,
                helper: cli.helper,
                context,
                no_backup: cli.no_backup && cli.force,
                backup_dir: cli.backup_dir,
            }
        }
    };

    Ok(Invocation {
        args,
        debug: cli.debug,
    })
}
