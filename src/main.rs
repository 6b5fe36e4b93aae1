use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use propdesk::cli::{handle_audit_command, handle_backup_command, handle_stats_command};
use propdesk::config::{paths::PropdeskPaths, settings::Settings};
use propdesk::models::EntityType;
use propdesk::storage::Storage;

/// Environment variable holding the log filter directive
const LOG_ENV: &str = "PROPDESK_LOG";

#[derive(Parser)]
#[command(
    name = "propdesk",
    version,
    about = "Backup and restore for the Propdesk real-estate CRM store",
    long_about = "Propdesk takes redacted, versioned snapshots of every CRM entity \
                  (users, properties, customers, leads, appointments, ...) and \
                  restores them atomically, in dependency order, with per-type \
                  conflict policies and an audit trail."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot management commands
    #[command(subcommand)]
    Backup(propdesk::cli::BackupCommands),

    /// Show record counts per entity type
    Stats,

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        count: usize,

        /// Only show entries for this entity type (e.g. users, siteSettings)
        #[arg(short, long)]
        entity: Option<EntityType>,
    },

    /// Initialize an empty store
    Init,

    /// Show current configuration and paths
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = PropdeskPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let storage = Storage::new(paths.clone())?;
    storage.load()?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &settings, &storage, cmd)?;
        }
        Some(Commands::Stats) => {
            handle_stats_command(&storage)?;
        }
        Some(Commands::Audit { count, entity }) => {
            handle_audit_command(&paths, count, entity)?;
        }
        Some(Commands::Init) => {
            println!("Initializing Propdesk at: {}", paths.base_dir().display());
            if storage.is_initialized() {
                println!("Store already exists: {}", paths.store_file().display());
            } else {
                storage.save()?;
                println!("Created empty store: {}", paths.store_file().display());
            }
            settings.save(&paths)?;
            println!("Initialization complete!");
        }
        Some(Commands::Config) => {
            println!("Propdesk Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Store file:       {}", paths.store_file().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Snapshot format:       {}", settings.backup.format);
            println!(
                "  Retention:             {} daily, {} monthly",
                settings.backup.retention.daily_count, settings.backup.retention.monthly_count
            );
            println!("  Max upload size:       {} bytes", settings.backup.max_upload_bytes);
            println!(
                "  Fatal error threshold: {}",
                settings.backup.fatal_error_threshold
            );
            println!("  Snapshot author:       {}", settings.backup.resolve_created_by());
        }
        None => {
            println!("Propdesk - CRM backup and restore");
            println!();
            println!("Run 'propdesk --help' for usage information.");
        }
    }

    Ok(())
}
