use anyhow::Result;
use optpatch::cli::{parse_args, Args};
use optpatch::runner::open_backup_manager;
use optpatch::{config, execute_patch, logger, Config, DiffFormatter, PatchOptions};
use tracing::{debug, warn};

fn main() -> Result<()> {
    let invocation = parse_args();

    // Config errors are reported once logging is up
    let (config, config_error) = match config::load_config() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let debug_enabled = invocation.debug || config.debug();
    if let Some(log_path) = logger::init_debug_logging(debug_enabled, config.log_level())? {
        debug!(log = %log_path.display(), "debug logging enabled");
    }

    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "using default configuration");
        eprintln!("Warning: Could not load configuration ({:#}). Using defaults.", e);
    }

    let formatter = DiffFormatter::detect(config.color());

    match invocation.args {
        Args::Patch {
            files,
            dry_run,
            strict,
            helper,
            context,
            no_backup,
            backup_dir,
        } => {
            let options = PatchOptions {
                files,
                dry_run,
                strict,
                helper,
                context,
                no_backup,
                backup_dir,
            };
            execute_patch(options, &config, &formatter, &mut std::io::stdout().lock())?;
        }
        Args::Rollback { id, backup_dir } => {
            rollback(id, backup_dir, &config)?;
        }
        Args::History { backup_dir } => {
            let backup_manager = open_backup_manager(backup_dir, &config)?;
            let backups = backup_manager.list_backups()?;
            print!("{}", formatter.format_history(&backups));
        }
        Args::Status { backup_dir } => {
            show_status(backup_dir, &config)?;
        }
        Args::BackupPrune { keep, backup_dir } => {
            let backup_manager = open_backup_manager(backup_dir, &config)?;
            let removed = backup_manager.prune_backups(keep)?;
            println!("Removed {} backup(s), kept at most {}", removed, keep);
        }
        Args::Config { show } => {
            if show {
                print!("{}", config::show_config(&config)?);
            } else {
                config::edit_config()?;
            }
        }
    }

    Ok(())
}

fn rollback(id: Option<String>, backup_dir: Option<String>, config: &Config) -> Result<()> {
    let backup_manager = open_backup_manager(backup_dir, config)?;

    let backup_id = match id {
        Some(id) => id,
        None => match backup_manager.get_last_backup_id()? {
            Some(id) => {
                println!("Rolling back last operation: {}\n", id);
                id
            }
            None => {
                anyhow::bail!("No backups found to rollback");
            }
        },
    };

    backup_manager.restore_backup(&backup_id)?;
    println!("\n✅ Rollback complete");

    Ok(())
}

fn show_status(backup_dir: Option<String>, config: &Config) -> Result<()> {
    let backup_manager = open_backup_manager(backup_dir, config)?;
    let backups = backup_manager.list_backups()?;

    println!("Current backup status:\n");
    println!("Backup directory: {}", backup_manager.backups_dir().display());
    println!("Total backups: {} (max {})\n", backups.len(), config.max_backups());

    if let Some(last) = backups.last() {
        println!("Last operation:");
        println!("  ID: {}", last.id);
        println!("  Time: {}", last.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("  Operation: {}", last.label);
    }

    Ok(())
}
