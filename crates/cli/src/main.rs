use clap::{Parser, Subcommand};

mod bootstrap;
mod commands;

#[derive(Parser)]
#[command(name = "tema")]
#[command(about = "Theme ranking and forward-return server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web API server
    Serve {
        /// Listen address override (host:port); defaults to the config
        #[arg(short, long)]
        addr: Option<String>,
        /// Config profile overlay (config/Config.<profile>.toml)
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print the ranked themes for a snapshot day
    Themes {
        /// Snapshot day (yymmdd); defaults to the latest
        #[arg(long)]
        date: Option<String>,
        /// Number of themes to print
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Exclude dominant instruments from aggregation
        #[arg(long)]
        exclude_dominant: bool,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print hottest and rising themes over a lookback window
    Insights {
        /// Snapshot days to look back over
        #[arg(long, default_value_t = 20)]
        lookback: i64,
        /// Top-N cut applied per day
        #[arg(long, default_value_t = 10)]
        top_n: i64,
        /// Exclude dominant instruments from aggregation
        #[arg(long)]
        exclude_dominant: bool,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Run one snapshot ingestion in the foreground
    Refresh {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Backfill empty forward-return columns across the whole ledger
    FixLedger {
        #[arg(long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve { addr, profile } => commands::serve::run(addr, profile.as_deref()).await,
        Commands::Themes {
            date,
            limit,
            exclude_dominant,
            profile,
        } => commands::themes::run(date, limit, exclude_dominant, profile.as_deref()).await,
        Commands::Insights {
            lookback,
            top_n,
            exclude_dominant,
            profile,
        } => commands::insights::run(lookback, top_n, exclude_dominant, profile.as_deref()).await,
        Commands::Refresh { profile } => commands::refresh::run(profile.as_deref()).await,
        Commands::FixLedger { profile } => commands::fix_ledger::run(profile.as_deref()).await,
    }
}
