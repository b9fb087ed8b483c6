use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{clear, config, daemon, stats, sync};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "mediastat")]
#[command(about = "MediaStat - Catalog statistics and missing episodes for your Emby server")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the catalog from the media server (one-time run)
    #[command(long_about = "Fetch libraries, movies and shows from the media server, detect missing episodes through the metadata provider and recompute the statistics cache. Press Ctrl-C to cancel a running sync.")]
    Sync {
        /// Skip the statistics recomputation for this run
        #[arg(long, action = ArgAction::SetTrue)]
        no_statistics: bool,
    },
    /// Run as a daemon with the internal scheduler
    #[command(long_about = "Keep running and sync on the configured cron schedule. A scheduled run that fires while another is still active is skipped.")]
    Daemon {
        /// Cron schedule expression with seconds (e.g. '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the initial sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
    /// Show cached statistics
    #[command(long_about = "Read a statistic computed by the last sync. The row is selected by the exact set of library ids given with --library; no --library selects the unfiltered view over every library.")]
    Stats {
        /// Statistic kind
        #[arg(long, value_enum, default_value = "movie")]
        kind: StatKind,

        /// Library id to include (repeat for several)
        #[arg(long = "library", value_name = "ID")]
        libraries: Vec<String>,

        /// List the known libraries instead of a statistic
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "libraries")]
        list_libraries: bool,
    },
    /// Configure the server, metadata provider and sync options
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear stored data
    #[command(long_about = "Remove the catalog snapshot, stored credentials or the metadata watermark. Clearing the watermark makes the next sync ask the provider for every show again.")]
    Clear {
        /// Clear everything
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["catalog", "credentials", "watermark"])]
        all: bool,

        /// Remove the catalog snapshot (movies, shows, statistics)
        #[arg(long, action = ArgAction::SetTrue)]
        catalog: bool,

        /// Remove stored API keys
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,

        /// Reset the metadata watermark
        #[arg(long, action = ArgAction::SetTrue)]
        watermark: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatKind {
    Movie,
    Show,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks API keys)
    Show {
        /// Show API keys unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure the media server connection
    #[command(long_about = "Set the media server address and user. The API key is read from --api-key or prompted for without echo and stored in the credentials file.")]
    Server {
        /// Server address, e.g. http://localhost:8096
        #[arg(long)]
        url: String,

        /// User whose libraries are synchronized
        #[arg(long)]
        user_id: String,

        /// API key (prompted when omitted)
        #[arg(long)]
        api_key: Option<String>,

        /// Abort a sync when the server does not answer the liveness check
        #[arg(long)]
        abort_on_unreachable: Option<bool>,
    },

    /// Configure the episode metadata provider
    Metadata {
        /// Enable missing-episode detection
        #[arg(long)]
        enabled: Option<bool>,

        /// Provider API address
        #[arg(long)]
        base_url: Option<String>,

        /// API key (prompted when enabling without a stored key)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Configure sync options
    Sync {
        /// Items requested per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Maximum children fetched per box set
        #[arg(long)]
        box_set_limit: Option<u32>,

        /// Recompute statistics after each sync
        #[arg(long)]
        statistics: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let logging_config = commands::load_logging_config();
    let log_file = match &cli.command {
        Commands::Daemon { .. } => Some(
            logging_config
                .file
                .clone()
                .unwrap_or_else(|| media_stat_config::PathManager::default().daemon_log_file()),
        ),
        _ => logging_config.file.clone(),
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, &logging_config, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync { no_statistics } => sync::run_sync(no_statistics, &output).await,
        Commands::Daemon { schedule, no_startup_sync } => {
            daemon::run_daemon(schedule, no_startup_sync, &output).await
        }
        Commands::Stats { kind, libraries, list_libraries } => {
            stats::run_stats(kind, libraries, list_libraries, &output)
        }
        Commands::Config { cmd } => config::run_config(cmd, &output),
        Commands::Clear { all, catalog, credentials, watermark } => {
            clear::run_clear(all, catalog, credentials, watermark, &output)
        }
    }
}
