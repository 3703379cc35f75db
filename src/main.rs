use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use anomalyscan::config::{AppConfig, LogFormat};
use anomalyscan::detect::DetectorKind;
use anomalyscan::runner::{self, RunReport};

#[derive(Parser)]
#[command(
    name = "anomalyscan",
    about = "Batch anomaly detection for CPU utilization and login-attempt logs",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for output files (overrides output.dir)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// JSON output for machine parsing
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag CPU samples above 90% and grade them Normal / Warning / Critical
    Cpu {
        /// CSV with `timestamp` and `cpu_usage` columns
        input: PathBuf,
    },

    /// Flag login records ending a streak of 3 or more consecutive failures
    Login {
        /// CSV with `timestamp` and `status` columns
        input: PathBuf,
    },

    /// Run the CPU and login detectors concurrently on separate files
    Scan {
        /// CPU log to analyze
        #[arg(long)]
        cpu: Option<PathBuf>,

        /// Login log to analyze
        #[arg(long)]
        login: Option<PathBuf>,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Stderr subscriber used while the config is still being resolved, so
/// fallback warnings from that step are not lost.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", anomalyscan::report::format_details(report));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // An explicit --config must load; ANOMALYSCAN_CONFIG and ./anomalyscan.toml
    // fall back to defaults.
    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        AppConfig::resolve(cli.config.as_deref())
    })?;
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }
    init_tracing(&config);

    let mut jobs = Vec::new();
    match cli.command {
        Commands::Cpu { input } => jobs.push((DetectorKind::Cpu, input)),
        Commands::Login { input } => jobs.push((DetectorKind::Login, input)),
        Commands::Scan { cpu, login } => {
            if let Some(input) = cpu {
                jobs.push((DetectorKind::Cpu, input));
            }
            if let Some(input) = login {
                jobs.push((DetectorKind::Login, input));
            }
            if jobs.is_empty() {
                bail!("scan needs at least one of --cpu or --login");
            }
        }
    }

    let requests = jobs
        .into_iter()
        .map(|(kind, input)| anomalyscan::request(&config, kind, input))
        .collect::<Result<Vec<_>>>()?;

    if let [a, b] = requests.as_slice() {
        if a.output == b.output {
            bail!(
                "cpu and login runs would both write {}; set distinct output.cpu_file and output.login_file",
                a.output.display()
            );
        }
    }

    let mut failed = 0usize;
    for result in runner::run_all(requests).await {
        match result {
            Ok(report) => print_report(&report, cli.json)?,
            Err(e) => {
                eprintln!("Error: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} run(s) failed");
    }
    Ok(())
}
