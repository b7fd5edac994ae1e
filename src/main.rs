use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use sysgauge::config::{Config, ValidatedConfig, load_config, load_config_from_path};
use sysgauge::format::{
    format_frequency, format_memory_gb, format_rate, format_uptime, pad_unicode,
};
use sysgauge::system::fake::FakeSource;
use sysgauge::system::sampler::{DEFAULT_STOP_TIMEOUT, block_on_bounded};
use sysgauge::system::{
    MetricsSource, ProcessEntry, ProcessQueryEngine, SamplingLoop, Snapshot, SortKey,
    SysinfoSource,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "sysgauge",
    about = "Live CPU, memory, network and process readouts"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between samples (0.5 to 5.0)
    #[arg(long)]
    refresh_interval: Option<f64>,

    /// Number of points kept in each history series
    #[arg(long)]
    history: Option<usize>,

    /// Maximum rows in the process table
    #[arg(long)]
    limit: Option<usize>,

    /// Process table order: cpu, memory, name
    #[arg(long)]
    sort: Option<SortKey>,

    /// Case-insensitive process name filter
    #[arg(long, default_value = "")]
    filter: String,

    /// Log level: error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Stop after this many snapshots (runs until Ctrl-C otherwise)
    #[arg(long)]
    ticks: Option<u64>,

    /// Print snapshots as JSON lines
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print the process table once and exit
    #[arg(long, default_value_t = false)]
    processes: bool,

    /// Send a termination request to this pid and exit
    #[arg(long)]
    kill: Option<u32>,

    /// Use scripted readings instead of the OS
    #[arg(long, default_value_t = false)]
    demo: bool,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli)?.validate()?;
    init_tracing(&config.log_level)?;

    block_on_bounded(run_cli(cli, config), DEFAULT_STOP_TIMEOUT)?
}

async fn run_cli(cli: Cli, config: ValidatedConfig) -> Result<ExitCode> {
    if let Some(pid) = cli.kill {
        let mut engine = ProcessQueryEngine::new(make_source(cli.demo));
        return Ok(match engine.terminate(pid) {
            Ok(()) => {
                println!("Sent termination request to PID {pid}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Cannot terminate process: {err}");
                ExitCode::FAILURE
            }
        });
    }

    if cli.processes {
        let mut engine =
            ProcessQueryEngine::new(make_source(cli.demo)).with_default_limit(config.list_limit);
        let sort = cli.sort.unwrap_or(config.default_sort);
        print_process_table(&engine.list_default(&cli.filter, sort));
        return Ok(ExitCode::SUCCESS);
    }

    run(&cli, &config).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: &Cli, config: &ValidatedConfig) -> Result<()> {
    let mut handle = SamplingLoop::new(make_source(cli.demo), config.sampler).spawn();
    let mut reader = handle.reader();
    let mut seen = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            next = reader.changed() => {
                let Some(snapshot) = next else { break };
                print_snapshot(&snapshot, cli.json)?;
                seen += 1;
                if cli.ticks.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }

    if let Err(err) = handle.shutdown(DEFAULT_STOP_TIMEOUT).await {
        warn!(error = %err, "sampling loop did not stop cleanly");
    }
    Ok(())
}

fn make_source(demo: bool) -> Box<dyn MetricsSource> {
    if demo {
        Box::new(FakeSource::demo())
    } else {
        Box::new(SysinfoSource::new())
    }
}

fn load_config_for_cli(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => load_config()?,
    };

    if let Some(secs) = cli.refresh_interval {
        config.sampling.refresh_interval_secs = secs;
    }
    if let Some(capacity) = cli.history {
        config.sampling.history_capacity = capacity;
    }
    if let Some(limit) = cli.limit {
        config.processes.list_limit = limit;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    Ok(config)
}

fn init_tracing(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .map_err(|e| eyre!("invalid log level `{level}`: {e}"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    println!(
        "[{:>4}] CPU {:5.1}% @ {} | MEM {:5.1}% ({}) | NET {} (\u{2193} {} \u{2191} {}) | up {}",
        snapshot.tick,
        snapshot.cpu_percent,
        format_frequency(snapshot.cpu_frequency_mhz),
        snapshot.memory_percent,
        format_memory_gb(snapshot.memory_used_bytes, snapshot.memory_total_bytes),
        format_rate(snapshot.network_total_kbs()),
        format_rate(snapshot.network_receive_kbs),
        format_rate(snapshot.network_send_kbs),
        format_uptime(snapshot.uptime),
    );
    Ok(())
}

fn print_process_table(entries: &[ProcessEntry]) {
    println!(
        "{:>8}  {}  {:>6}  {:>6}  STATUS",
        "PID",
        pad_unicode("NAME", 24),
        "CPU%",
        "MEM%"
    );
    for entry in entries {
        println!(
            "{:>8}  {}  {:>6.1}  {:>6.1}  {}",
            entry.pid,
            pad_unicode(&entry.name, 24),
            entry.cpu_percent,
            entry.memory_percent,
            entry.status
        );
    }
}
