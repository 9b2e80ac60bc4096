//! Pi Logger - periodic host metrics log binary
//!
//! Samples CPU temperature, memory usage and network counters and writes
//! consolidated records to a text log for a fixed run duration.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pi_logger::{
    sample_once, FailurePolicy, LoggerConfig, Orchestrator, RawMetricReader, RoundPolicy,
    SourceKind,
};
use std::path::PathBuf;
use std::process::ExitCode;
use sysinfo::System;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_logger")]
#[command(about = "Periodic Raspberry Pi host metrics logger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Austin Couch")]
#[command(
    long_about = "Samples CPU temperature, memory usage and network counters on independent schedules and logs one record per completed round"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Run duration in milliseconds
    #[arg(long, global = true)]
    duration: Option<u64>,

    /// Temperature sampling interval in milliseconds
    #[arg(long, global = true)]
    temp_interval: Option<u64>,

    /// Memory sampling interval in milliseconds
    #[arg(long, global = true)]
    mem_interval: Option<u64>,

    /// Network sampling interval in milliseconds
    #[arg(long, global = true)]
    net_interval: Option<u64>,

    /// Network interface to report
    #[arg(long, global = true)]
    interface: Option<String>,

    /// What to do when a metric source cannot be read
    #[arg(long, value_enum, global = true)]
    failure_policy: Option<FailureArg>,

    /// What completes a round
    #[arg(long, value_enum, global = true)]
    round_policy: Option<RoundArg>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the logger (default)
    Run,

    /// Read every source once and print a record
    Sample,

    /// Show host information and source paths
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FailureArg {
    /// Mark the source unavailable and keep running
    Isolate,
    /// Stop the whole run
    Abort,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RoundArg {
    /// Flush after every third arrival
    Arrivals,
    /// Flush once every source has reported
    Distinct,
}

impl From<FailureArg> for FailurePolicy {
    fn from(arg: FailureArg) -> Self {
        match arg {
            FailureArg::Isolate => FailurePolicy::Isolate,
            FailureArg::Abort => FailurePolicy::Abort,
        }
    }
}

impl From<RoundArg> for RoundPolicy {
    fn from(arg: RoundArg) -> Self {
        match arg {
            RoundArg::Arrivals => RoundPolicy::Arrivals,
            RoundArg::Distinct => RoundPolicy::DistinctSources,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }

    match dispatch(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;

    match &cli.command {
        Some(Commands::Run) | None => run_command(config).await,
        Some(Commands::Sample) => sample_command(&config),
        Some(Commands::Info) => {
            info_command(&config);
            Ok(())
        }
    }
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Filter used when `RUST_LOG` is not set.
fn default_filter(cli: &Cli) -> EnvFilter {
    EnvFilter::new(log_level(cli).as_str().to_lowercase())
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(cli));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<LoggerConfig> {
    let mut config = match &cli.config {
        Some(path) => LoggerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => LoggerConfig::default(),
    };

    if let Some(path) = &cli.log_file {
        config = config.with_log_path(path.clone());
    }
    if let Some(ms) = cli.duration {
        config = config.with_run_duration_ms(ms);
    }
    if let Some(ms) = cli.temp_interval {
        config = config.with_interval_ms(SourceKind::Temperature, ms);
    }
    if let Some(ms) = cli.mem_interval {
        config = config.with_interval_ms(SourceKind::Memory, ms);
    }
    if let Some(ms) = cli.net_interval {
        config = config.with_interval_ms(SourceKind::Network, ms);
    }
    if let Some(interface) = &cli.interface {
        config = config.with_interface(interface.clone());
    }
    if let Some(policy) = cli.failure_policy {
        config = config.with_failure_policy(policy.into());
    }
    if let Some(policy) = cli.round_policy {
        config = config.with_round_policy(policy.into());
    }

    config.validate()?;
    Ok(config)
}

async fn run_command(config: LoggerConfig) -> anyhow::Result<()> {
    println!("Pi Logger v{}", env!("CARGO_PKG_VERSION"));
    println!("   Logging to {}", config.log_path.display());
    println!();

    info!("Logger configuration:");
    info!("  - Log file: {}", config.log_path.display());
    info!("  - Run duration: {}ms", config.run_duration_ms);
    for source in SourceKind::ALL {
        info!("  - {} interval: {}ms", source, config.interval(source).as_millis());
    }
    info!("  - Interface: {}", config.interface);
    info!("  - Failure policy: {:?}", config.failure_policy);
    info!("  - Round policy: {:?}", config.round_policy);

    let orchestrator = Orchestrator::new(config)?;

    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping sources");
            shutdown.cancel();
        }
    });

    let report = orchestrator.run().await?;

    for source in SourceKind::ALL {
        let failures = report.failures_for(source);
        if failures > 0 {
            println!("   {} source failed {} time(s)", source, failures);
        }
    }
    println!(
        "   {} arrivals, {} records written",
        report.arrivals, report.flushes
    );

    Ok(())
}

fn sample_command(config: &LoggerConfig) -> anyhow::Result<()> {
    let reader = config.reader();
    let record = sample_once(&reader, reader.interface())?;
    print!("{}", record);
    Ok(())
}

fn info_command(config: &LoggerConfig) {
    println!("Pi Logger System Information");
    println!("============================");
    println!();

    println!("System Details:");
    println!(
        "  Hostname: {}",
        System::host_name().unwrap_or_else(|| "unknown".to_string())
    );
    println!(
        "  OS: {} {}",
        System::name().unwrap_or_else(|| "unknown".to_string()),
        System::os_version().unwrap_or_else(|| "unknown".to_string())
    );
    println!(
        "  Kernel: {}",
        System::kernel_version().unwrap_or_else(|| "unknown".to_string())
    );
    println!("  Uptime: {} seconds", System::uptime());
    println!();

    let reader = config.reader();
    println!("Metric Sources:");
    for source in SourceKind::ALL {
        let status = match reader.read_raw(source) {
            Ok(_) => "readable".to_string(),
            Err(e) => e.to_string(),
        };
        println!(
            "  {}: {} ({}, every {}ms)",
            source,
            reader.path_for(source).display(),
            status,
            config.interval(source).as_millis()
        );
    }
    println!("  Interface: {}", config.interface);
    println!();

    println!("Log file: {}", config.log_path.display());
    println!("Run duration: {}ms", config.run_duration_ms);
}
