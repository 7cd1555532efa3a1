//! trowel - ICE currency history ingestion
//!
//! Exit codes: 0 success, 2 some sources failed, 1 load failed or the run
//! could not start.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};
use trowel_common::config::{load_env_file, ConfigOverrides};
use trowel_common::IngestConfig;
use trowel_ingest::services::IceApiClient;
use trowel_ingest::{pipeline, RunResult, SourceCatalog};

/// Command-line arguments for trowel
#[derive(Parser, Debug)]
#[command(name = "trowel")]
#[command(about = "Incremental ICE currency history ingestion")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true, env = "TROWEL_CONFIG")]
    config: Option<PathBuf>,

    /// Database connection URL (sqlite://...)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Target table name
    #[arg(long, global = true)]
    table: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every catalog source and load new records
    Run {
        /// Records per page request
        #[arg(long)]
        page_size: Option<u64>,

        /// Sources fetched in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Rows per transaction
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Load the price cards of a rendered landing page
    Snapshot {
        /// Rendered HTML file
        #[arg(long)]
        html: PathBuf,

        /// Rows per transaction
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// List the configured sources
    Catalog,
    /// Print the resolved configuration (credentials masked)
    Config,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            config_path: self.config.clone(),
            database_url: self.database_url.clone(),
            table_name: self.table.clone(),
            log_level: self.log_level.clone(),
            ..Default::default()
        };
        match &self.command {
            Command::Run {
                page_size,
                concurrency,
                batch_size,
            } => {
                overrides.page_size = *page_size;
                overrides.concurrency = *concurrency;
                overrides.batch_size = *batch_size;
            }
            Command::Snapshot { batch_size, .. } => {
                overrides.batch_size = *batch_size;
            }
            Command::Catalog | Command::Config => {}
        }
        overrides
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("trowel_ingest={level},trowel_common={level},trowel={level}").into())
}

fn log_subscriber<W>(
    bootstrap_level: &str,
    writer: W,
) -> (impl tracing::Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(level_filter(bootstrap_level));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Install the subscriber before configuration is read; the filter is
/// swapped once the configured level is known
fn init_tracing(bootstrap_level: &str) -> FilterHandle {
    let (subscriber, handle) = log_subscriber(bootstrap_level, std::io::stderr);
    subscriber.init();
    handle
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    // RUST_LOG may have arrived through .env
    if let Err(e) = handle.reload(level_filter(level)) {
        warn!("Failed to apply log level {}: {}", level, e);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_filter = init_tracing(args.log_level.as_deref().unwrap_or("info"));
    load_env_file();
    let config = IngestConfig::load(&args.overrides()).context("Failed to load configuration")?;
    apply_log_level(&log_filter, &config.logging.level);

    let catalog = SourceCatalog::from_config(&config);

    match &args.command {
        Command::Catalog => {
            for source in catalog.sources() {
                println!(
                    "{:>4}  {:<4} {:<13} {}",
                    source.id,
                    source.symbol,
                    source.category.english(),
                    source.name
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            print!("{}", config.redacted().to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { .. } => {
            info!(version = env!("CARGO_PKG_VERSION"), "trowel starting");
            let pool = trowel_common::db::init_pool(&config.database)
                .await
                .context("Failed to open database")?;
            let client = IceApiClient::new(&config.api).context("Failed to create API client")?;

            let result = pipeline::run_incremental(&config, &pool, client, &catalog).await;
            pool.close().await;
            report(&result)
        }
        Command::Snapshot { html, .. } => {
            let page = std::fs::read_to_string(html)
                .with_context(|| format!("Failed to read {}", html.display()))?;
            let pool = trowel_common::db::init_pool(&config.database)
                .await
                .context("Failed to open database")?;

            let result = pipeline::run_snapshot(&config, &pool, &page, &catalog).await;
            pool.close().await;
            report(&result)
        }
    }
}

/// Print the run result as JSON and map its status to the exit code
fn report(result: &RunResult) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(ExitCode::from(result.status.exit_code()))
}
