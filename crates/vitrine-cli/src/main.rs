use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vitrine_core::VitrineConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "vitrine", version, about = "Vitrine public dashboards CLI")]
struct Cli {
    /// Configuration file (YAML). Defaults apply when omitted.
    #[arg(long, short, global = true, env = "VITRINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the queries and anonymous permissions a dashboard would be served with
    Inspect {
        /// Dashboard JSON (the model itself, or an export wrapping it in "dashboard")
        file: PathBuf,

        /// Only this panel, with its queries grouped by datasource
        #[arg(long)]
        panel: Option<i64>,
    },

    /// Check that a dashboard can be published
    Validate {
        /// Dashboard JSON
        file: PathBuf,
    },

    /// Compute the interval and max data points an anonymous query is clamped to
    SafeInterval {
        #[arg(long, default_value = "now-6h")]
        from: String,

        #[arg(long, default_value = "now")]
        to: String,

        /// Requested interval in milliseconds (0 = unset)
        #[arg(long, default_value_t = 0)]
        interval_ms: i64,

        /// Requested max data points (0 = unset)
        #[arg(long, default_value_t = 0)]
        max_data_points: i64,
    },

    /// Generate a public dashboard uid and access token
    Token {
        /// Number of pairs to generate
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Create the Postgres tables used by the public dashboard store
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VitrineConfig::from_file(path)?,
        None => VitrineConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(config = ?cli.config, "Loaded configuration");

    match cli.cmd {
        Command::Inspect { file, panel } => commands::inspect::run(&file, panel)?,
        Command::Validate { file } => commands::validate::run(&file)?,
        Command::SafeInterval {
            from,
            to,
            interval_ms,
            max_data_points,
        } => commands::safe_interval::run(&config, &from, &to, interval_ms, max_data_points)?,
        Command::Token { count } => commands::token::run(&config, count)?,
        Command::Migrate => commands::migrate::run(&config).await?,
    }

    Ok(())
}
