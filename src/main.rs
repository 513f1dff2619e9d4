use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use the library instead of redeclaring modules
use epg_unifier::{
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    errors::AppResult,
    services::{GapFinder, GuideMerger},
    utils::StandardHttpClient,
};

/// Exit status when `--fail-on-missing` is set and channels lack guide data
const MISSING_CHANNELS_EXIT_CODE: u8 = 6;

#[derive(Parser)]
#[command(name = "epg-unifier")]
#[command(version)]
#[command(about = "Merge XMLTV guide fragments and find playlist channels without guide data")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download fragments, merge them and inject playlist-only channels
    Merge {
        /// Unified guide output path (overrides config file)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Directory for downloaded chunks (overrides config file)
        #[arg(short, long, value_name = "DIR")]
        work_dir: Option<PathBuf>,
    },
    /// List playlist channels with no programme in the forward window
    FindMissing {
        /// Unified guide to check (overrides config file)
        #[arg(short, long, value_name = "PATH")]
        guide: Option<PathBuf>,

        /// Forward window in days (overrides config file)
        #[arg(short = 'd', long, value_name = "DAYS")]
        horizon_days: Option<u32>,

        /// Exit non-zero when any channel is missing
        #[arg(long)]
        fail_on_missing: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays clean
    let log_filter = format!("epg_unifier={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting EPG Unifier v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> AppResult<ExitCode> {
    let mut config = Config::load(&cli.config)?;
    let client = StandardHttpClient::new()?;

    match cli.command {
        Command::Merge { output, work_dir } => {
            if let Some(output) = output {
                config.output_path = output;
            }
            if let Some(work_dir) = work_dir {
                config.merge.work_dir = work_dir;
            }

            let summary = GuideMerger::new(&client, &config).run().await?;
            println!(
                "Unified EPG written to {} ({} channels, {} programmes, {} injected)",
                summary.output_path.display(),
                summary.channels,
                summary.programmes,
                summary.channels_injected
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::FindMissing {
            guide,
            horizon_days,
            fail_on_missing,
        } => {
            if let Some(days) = horizon_days {
                config.gaps.horizon_days = days;
            }
            let guide_path = guide.unwrap_or_else(|| config.output_path.clone());

            let report = GapFinder::new(&client, &config)
                .run(&guide_path, Utc::now())
                .await?;
            print!("{report}");

            if fail_on_missing && report.has_missing() {
                Ok(ExitCode::from(MISSING_CHANNELS_EXIT_CODE))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
